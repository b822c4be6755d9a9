use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_catalog_tables::Migration),
            Box::new(m20240101_000002_create_stock_tables::Migration),
            Box::new(m20240101_000003_create_transfer_tables::Migration),
            Box::new(m20240101_000004_create_settings_tables::Migration),
        ]
    }
}

mod m20240101_000001_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Branches::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Branches::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Branches::TenantId).big_integer().not_null())
                        .col(ColumnDef::new(Branches::Name).string().not_null())
                        .col(ColumnDef::new(Branches::BranchType).string().not_null())
                        .col(ColumnDef::new(Branches::IsActive).boolean().not_null())
                        .col(
                            ColumnDef::new(Branches::IsProductionEnabled)
                                .boolean()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Branches::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Products::TenantId).big_integer().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Unit).string().not_null())
                        .col(
                            ColumnDef::new(Products::StandardCost)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Products::IsActive).boolean().not_null())
                        .col(
                            ColumnDef::new(Products::IsInventoryTracked)
                                .boolean()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_branches_tenant")
                        .table(Branches::Table)
                        .col(Branches::TenantId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_products_tenant")
                        .table(Products::Table)
                        .col(Products::TenantId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Branches::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Branches {
        Table,
        Id,
        TenantId,
        Name,
        BranchType,
        IsActive,
        IsProductionEnabled,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        TenantId,
        Name,
        Unit,
        StandardCost,
        IsActive,
        IsInventoryTracked,
        CreatedAt,
    }
}

mod m20240101_000002_create_stock_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_stock_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockLevels::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockLevels::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(StockLevels::TenantId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLevels::BranchId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLevels::ProductId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLevels::CurrentStock)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLevels::ReservedStock)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLevels::LastMovementAt).timestamp_with_time_zone(),
                        )
                        .col(
                            ColumnDef::new(StockLevels::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLevels::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // One row per (tenant, branch, product); apply_delta upserts rely on it.
            manager
                .create_index(
                    Index::create()
                        .name("uq_stock_levels_key")
                        .table(StockLevels::Table)
                        .col(StockLevels::TenantId)
                        .col(StockLevels::BranchId)
                        .col(StockLevels::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMovements::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::TenantId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::BranchId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::ProductId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::MovementType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::Quantity)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::QuantityBefore)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::QuantityAfter)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::ReferenceType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::ReferenceId).big_integer())
                        .col(
                            ColumnDef::new(StockMovements::CreatedBy)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::Notes).string())
                        .col(
                            ColumnDef::new(StockMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_movements_key")
                        .table(StockMovements::Table)
                        .col(StockMovements::TenantId)
                        .col(StockMovements::BranchId)
                        .col(StockMovements::ProductId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_movements_reference")
                        .table(StockMovements::Table)
                        .col(StockMovements::ReferenceType)
                        .col(StockMovements::ReferenceId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SequenceCounters::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SequenceCounters::TenantId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SequenceCounters::SeqType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SequenceCounters::LastNo)
                                .big_integer()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(SequenceCounters::TenantId)
                                .col(SequenceCounters::SeqType),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ReorderLevels::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ReorderLevels::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ReorderLevels::TenantId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReorderLevels::BranchId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReorderLevels::ProductId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReorderLevels::ReorderLevel)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ReorderLevels::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SequenceCounters::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockMovements::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockLevels::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockLevels {
        Table,
        Id,
        TenantId,
        BranchId,
        ProductId,
        CurrentStock,
        ReservedStock,
        LastMovementAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StockMovements {
        Table,
        Id,
        TenantId,
        BranchId,
        ProductId,
        MovementType,
        Quantity,
        QuantityBefore,
        QuantityAfter,
        ReferenceType,
        ReferenceId,
        CreatedBy,
        Notes,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum SequenceCounters {
        Table,
        TenantId,
        SeqType,
        LastNo,
    }

    #[derive(DeriveIden)]
    enum ReorderLevels {
        Table,
        Id,
        TenantId,
        BranchId,
        ProductId,
        ReorderLevel,
    }
}

mod m20240101_000003_create_transfer_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_transfer_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Transfers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Transfers::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Transfers::TenantId).big_integer().not_null())
                        .col(
                            ColumnDef::new(Transfers::TransferNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Transfers::FromBranchId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transfers::ToBranchId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transfers::Status).string().not_null())
                        .col(ColumnDef::new(Transfers::TransferType).string().not_null())
                        .col(ColumnDef::new(Transfers::Notes).string())
                        .col(ColumnDef::new(Transfers::ScheduledDate).date())
                        .col(ColumnDef::new(Transfers::TotalItems).integer().not_null())
                        .col(
                            ColumnDef::new(Transfers::StockReserved)
                                .boolean()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transfers::CreatedBy)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transfers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transfers::ShippedBy).big_integer())
                        .col(ColumnDef::new(Transfers::ShippedAt).timestamp_with_time_zone())
                        .col(ColumnDef::new(Transfers::ReceivedBy).big_integer())
                        .col(ColumnDef::new(Transfers::ReceivedAt).timestamp_with_time_zone())
                        .col(ColumnDef::new(Transfers::CancelledBy).big_integer())
                        .col(ColumnDef::new(Transfers::CancelledAt).timestamp_with_time_zone())
                        .col(ColumnDef::new(Transfers::CancellationReason).string())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_transfers_tenant_status")
                        .table(Transfers::Table)
                        .col(Transfers::TenantId)
                        .col(Transfers::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TransferItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransferItems::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(TransferItems::TransferId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferItems::ProductId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferItems::ProductName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferItems::QuantityRequested)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferItems::QuantityShipped)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferItems::QuantityReceived)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferItems::UnitCost)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferItems::TotalCost)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transfer_items_transfer")
                                .from(TransferItems::Table, TransferItems::TransferId)
                                .to(Transfers::Table, Transfers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_transfer_items_transfer")
                        .table(TransferItems::Table)
                        .col(TransferItems::TransferId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TransferItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Transfers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Transfers {
        Table,
        Id,
        TenantId,
        TransferNumber,
        FromBranchId,
        ToBranchId,
        Status,
        TransferType,
        Notes,
        ScheduledDate,
        TotalItems,
        StockReserved,
        CreatedBy,
        CreatedAt,
        ShippedBy,
        ShippedAt,
        ReceivedBy,
        ReceivedAt,
        CancelledBy,
        CancelledAt,
        CancellationReason,
    }

    #[derive(DeriveIden)]
    enum TransferItems {
        Table,
        Id,
        TransferId,
        ProductId,
        ProductName,
        QuantityRequested,
        QuantityShipped,
        QuantityReceived,
        UnitCost,
        TotalCost,
    }
}

mod m20240101_000004_create_settings_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_settings_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TenantSettings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TenantSettings::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(TenantSettings::TenantId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TenantSettings::SettingKey)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TenantSettings::SettingValue)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TenantSettings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_tenant_settings_key")
                        .table(TenantSettings::Table)
                        .col(TenantSettings::TenantId)
                        .col(TenantSettings::SettingKey)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PermissionRules::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PermissionRules::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(PermissionRules::TenantId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PermissionRules::RoleKey).string().not_null())
                        .col(
                            ColumnDef::new(PermissionRules::PermissionKey)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PermissionRules::Allowed)
                                .boolean()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_permission_rules_key")
                        .table(PermissionRules::Table)
                        .col(PermissionRules::TenantId)
                        .col(PermissionRules::RoleKey)
                        .col(PermissionRules::PermissionKey)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(UserBranches::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(UserBranches::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(UserBranches::TenantId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(UserBranches::UserId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(UserBranches::BranchId)
                                .big_integer()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_user_branches_user")
                        .table(UserBranches::Table)
                        .col(UserBranches::TenantId)
                        .col(UserBranches::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(UserBranches::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PermissionRules::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(TenantSettings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum TenantSettings {
        Table,
        Id,
        TenantId,
        SettingKey,
        SettingValue,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PermissionRules {
        Table,
        Id,
        TenantId,
        RoleKey,
        PermissionKey,
        Allowed,
    }

    #[derive(DeriveIden)]
    enum UserBranches {
        Table,
        Id,
        TenantId,
        UserId,
        BranchId,
    }
}
