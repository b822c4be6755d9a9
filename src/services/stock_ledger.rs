//! Stock ledger and level store.
//!
//! `apply_delta` is the only way stock changes: it upserts the level row and
//! appends the matching movement row on whatever connection the caller
//! provides. Multi-delta operations (a transfer's out + in legs) wrap their
//! calls in one outer transaction so a failure rolls everything back.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use tracing::debug;
use utoipa::ToSchema;

use crate::auth;
use crate::context::OperationContext;
use crate::entities::{
    stock_level,
    stock_movement::{self, MovementType, ReferenceType},
    StockLevel, StockMovement,
};
use crate::errors::ServiceError;

/// Outcome of a single ledger delta.
#[derive(Debug, Clone, PartialEq)]
pub struct StockDelta {
    pub previous_stock: Decimal,
    pub new_stock: Decimal,
    pub quantity_changed: Decimal,
}

/// Loads the level row for a key, if it exists.
pub async fn get_level<C: ConnectionTrait>(
    db: &C,
    ctx: &OperationContext,
    branch_id: i64,
    product_id: i64,
) -> Result<Option<stock_level::Model>, ServiceError> {
    StockLevel::find()
        .filter(stock_level::Column::TenantId.eq(ctx.tenant_id))
        .filter(stock_level::Column::BranchId.eq(branch_id))
        .filter(stock_level::Column::ProductId.eq(product_id))
        .one(db)
        .await
        .map_err(ServiceError::db_error)
}

/// Current minus reserved for a key; zero when no level row exists yet.
pub async fn available_stock<C: ConnectionTrait>(
    db: &C,
    ctx: &OperationContext,
    branch_id: i64,
    product_id: i64,
) -> Result<Decimal, ServiceError> {
    Ok(get_level(db, ctx, branch_id, product_id)
        .await?
        .map(|level| level.available_stock())
        .unwrap_or(Decimal::ZERO))
}

/// Applies a signed quantity delta and appends the ledger row.
///
/// No clamping happens here: a negative result is recorded as-is (oversell
/// is a fact worth keeping, and availability checks upstream are expected
/// to prevent it in normal operation). The reason/notes text lands on the
/// movement row in the same write; movements are never updated afterwards.
#[allow(clippy::too_many_arguments)]
pub async fn apply_delta<C: ConnectionTrait>(
    db: &C,
    ctx: &OperationContext,
    branch_id: i64,
    product_id: i64,
    quantity_delta: Decimal,
    movement_type: MovementType,
    reference_type: ReferenceType,
    reference_id: Option<i64>,
    notes: Option<String>,
) -> Result<StockDelta, ServiceError> {
    let now = Utc::now();
    let existing = get_level(db, ctx, branch_id, product_id).await?;

    let previous_stock = existing
        .as_ref()
        .map(|level| level.current_stock)
        .unwrap_or(Decimal::ZERO);
    let new_stock = previous_stock + quantity_delta;

    match existing {
        Some(level) => {
            let mut active: stock_level::ActiveModel = level.into();
            active.current_stock = Set(new_stock);
            active.last_movement_at = Set(Some(now));
            active.updated_at = Set(now);
            active.update(db).await.map_err(ServiceError::db_error)?;
        }
        None => {
            let active = stock_level::ActiveModel {
                tenant_id: Set(ctx.tenant_id),
                branch_id: Set(branch_id),
                product_id: Set(product_id),
                current_stock: Set(new_stock),
                reserved_stock: Set(Decimal::ZERO),
                last_movement_at: Set(Some(now)),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            active.insert(db).await.map_err(ServiceError::db_error)?;
        }
    }

    let movement = stock_movement::ActiveModel {
        tenant_id: Set(ctx.tenant_id),
        branch_id: Set(branch_id),
        product_id: Set(product_id),
        movement_type: Set(movement_type.to_string()),
        quantity: Set(quantity_delta),
        quantity_before: Set(previous_stock),
        quantity_after: Set(new_stock),
        reference_type: Set(reference_type.to_string()),
        reference_id: Set(reference_id),
        created_by: Set(ctx.user_id),
        notes: Set(notes),
        created_at: Set(now),
        ..Default::default()
    };
    movement.insert(db).await.map_err(ServiceError::db_error)?;

    debug!(
        tenant_id = ctx.tenant_id,
        branch_id,
        product_id,
        %quantity_delta,
        %new_stock,
        movement_type = %movement_type,
        "stock delta applied"
    );

    Ok(StockDelta {
        previous_stock,
        new_stock,
        quantity_changed: quantity_delta,
    })
}

/// Earmarks quantity against a pending transfer. Creates the level row when
/// absent so a reservation on untouched stock is representable.
pub async fn reserve<C: ConnectionTrait>(
    db: &C,
    ctx: &OperationContext,
    branch_id: i64,
    product_id: i64,
    quantity: Decimal,
) -> Result<(), ServiceError> {
    let now = Utc::now();
    match get_level(db, ctx, branch_id, product_id).await? {
        Some(level) => {
            let reserved = level.reserved_stock + quantity;
            let mut active: stock_level::ActiveModel = level.into();
            active.reserved_stock = Set(reserved);
            active.updated_at = Set(now);
            active.update(db).await.map_err(ServiceError::db_error)?;
        }
        None => {
            let active = stock_level::ActiveModel {
                tenant_id: Set(ctx.tenant_id),
                branch_id: Set(branch_id),
                product_id: Set(product_id),
                current_stock: Set(Decimal::ZERO),
                reserved_stock: Set(quantity),
                last_movement_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            active.insert(db).await.map_err(ServiceError::db_error)?;
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LevelListQuery {
    pub branch_id: Option<i64>,
    pub product_id: Option<i64>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MovementListQuery {
    pub branch_id: Option<i64>,
    pub product_id: Option<i64>,
    #[schema(value_type = Option<String>)]
    pub movement_type: Option<MovementType>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    50
}

/// Paginated level rows restricted to the actor's visible branches.
pub async fn list_levels(
    db: &sea_orm::DatabaseConnection,
    ctx: &OperationContext,
    query: LevelListQuery,
) -> Result<(Vec<stock_level::Model>, u64), ServiceError> {
    let mut find = StockLevel::find()
        .filter(stock_level::Column::TenantId.eq(ctx.tenant_id))
        .order_by_asc(stock_level::Column::BranchId)
        .order_by_asc(stock_level::Column::ProductId);
    if let Some(branch_id) = query.branch_id {
        find = find.filter(stock_level::Column::BranchId.eq(branch_id));
    }
    if let Some(product_id) = query.product_id {
        find = find.filter(stock_level::Column::ProductId.eq(product_id));
    }
    if let Some(visible) = auth::visible_branches(db, ctx).await? {
        let ids: Vec<i64> = visible.into_iter().collect();
        find = find.filter(stock_level::Column::BranchId.is_in(ids));
    }

    let limit = query.limit.clamp(1, 200);
    let page = query.page.max(1);
    let paginator = find.paginate(db, limit);
    let total = paginator
        .num_items()
        .await
        .map_err(ServiceError::db_error)?;
    let rows = paginator
        .fetch_page(page - 1)
        .await
        .map_err(ServiceError::db_error)?;
    Ok((rows, total))
}

/// Paginated ledger rows, newest first, restricted to visible branches.
pub async fn list_movements(
    db: &sea_orm::DatabaseConnection,
    ctx: &OperationContext,
    query: MovementListQuery,
) -> Result<(Vec<stock_movement::Model>, u64), ServiceError> {
    let mut find = StockMovement::find()
        .filter(stock_movement::Column::TenantId.eq(ctx.tenant_id))
        .order_by_desc(stock_movement::Column::Id);
    if let Some(branch_id) = query.branch_id {
        find = find.filter(stock_movement::Column::BranchId.eq(branch_id));
    }
    if let Some(product_id) = query.product_id {
        find = find.filter(stock_movement::Column::ProductId.eq(product_id));
    }
    if let Some(movement_type) = query.movement_type {
        find = find.filter(stock_movement::Column::MovementType.eq(movement_type.to_string()));
    }
    if let Some(visible) = auth::visible_branches(db, ctx).await? {
        let ids: Vec<i64> = visible.into_iter().collect();
        find = find.filter(stock_movement::Column::BranchId.is_in(ids));
    }

    let limit = query.limit.clamp(1, 200);
    let page = query.page.max(1);
    let paginator = find.paginate(db, limit);
    let total = paginator
        .num_items()
        .await
        .map_err(ServiceError::db_error)?;
    let rows = paginator
        .fetch_page(page - 1)
        .await
        .map_err(ServiceError::db_error)?;
    Ok((rows, total))
}

/// Releases a reservation, flooring at zero. Double release is a no-op, not
/// an error.
pub async fn release<C: ConnectionTrait>(
    db: &C,
    ctx: &OperationContext,
    branch_id: i64,
    product_id: i64,
    quantity: Decimal,
) -> Result<(), ServiceError> {
    if let Some(level) = get_level(db, ctx, branch_id, product_id).await? {
        let reserved = (level.reserved_stock - quantity).max(Decimal::ZERO);
        let mut active: stock_level::ActiveModel = level.into();
        active.reserved_stock = Set(reserved);
        active.updated_at = Set(Utc::now());
        active.update(db).await.map_err(ServiceError::db_error)?;
    }
    Ok(())
}
