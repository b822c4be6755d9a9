//! Read-only reporting projections.
//!
//! Reports are computed from the ledger and level tables at request time;
//! nothing here writes. Aggregation happens in Rust over filtered row sets,
//! which keeps the queries portable across the supported backends.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use crate::auth;
use crate::context::OperationContext;
use crate::db::DbPool;
use crate::entities::{
    branch, product, reorder_level, stock_level, stock_movement, transfer, Branch, Product,
    ReorderLevel, StockLevel, StockMovement, Transfer,
};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MovementReportQuery {
    pub branch_id: Option<i64>,
    pub product_id: Option<i64>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MovementTotals {
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub net_change: Decimal,
    /// Quantities priced at the product's current standard cost.
    pub value_in: Decimal,
    pub value_out: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovementHistoryReport {
    pub movements: Vec<stock_movement::Model>,
    pub totals: MovementTotals,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransferReportQuery {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransferStatsReport {
    pub total_transfers: u64,
    pub by_status: HashMap<String, u64>,
    pub by_type: HashMap<String, u64>,
    pub average_items_per_transfer: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LowStockRow {
    pub branch_id: i64,
    pub branch_name: String,
    pub product_id: i64,
    pub product_name: String,
    pub current_stock: Decimal,
    pub reorder_level: Decimal,
    pub out_of_stock: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BranchThroughputRow {
    pub branch_id: i64,
    pub branch_name: String,
    pub quantity_in: Decimal,
    pub quantity_out: Decimal,
    pub movement_count: u64,
}

#[derive(Clone)]
pub struct ReportService {
    db: Arc<DbPool>,
}

impl ReportService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Movement ledger slice with running in/out/value totals.
    #[instrument(skip(self, query), fields(tenant_id = ctx.tenant_id))]
    pub async fn movement_history(
        &self,
        ctx: &OperationContext,
        query: MovementReportQuery,
    ) -> Result<MovementHistoryReport, ServiceError> {
        let db = self.db.as_ref();

        let mut find = StockMovement::find()
            .filter(stock_movement::Column::TenantId.eq(ctx.tenant_id))
            .order_by_desc(stock_movement::Column::Id);
        if let Some(branch_id) = query.branch_id {
            find = find.filter(stock_movement::Column::BranchId.eq(branch_id));
        }
        if let Some(product_id) = query.product_id {
            find = find.filter(stock_movement::Column::ProductId.eq(product_id));
        }
        if let Some(from) = query.from_date {
            find = find.filter(
                stock_movement::Column::CreatedAt.gte(from.and_time(NaiveTime::MIN).and_utc()),
            );
        }
        if let Some(to) = query.to_date {
            let end = to
                .succ_opt()
                .unwrap_or(to)
                .and_time(NaiveTime::MIN)
                .and_utc();
            find = find.filter(stock_movement::Column::CreatedAt.lt(end));
        }
        if let Some(visible) = auth::visible_branches(db, ctx).await? {
            let ids: Vec<i64> = visible.into_iter().collect();
            find = find.filter(stock_movement::Column::BranchId.is_in(ids));
        }

        let movements = find.all(db).await.map_err(ServiceError::db_error)?;
        let costs = self.standard_costs(ctx, &movements).await?;

        let mut totals = MovementTotals {
            total_in: Decimal::ZERO,
            total_out: Decimal::ZERO,
            net_change: Decimal::ZERO,
            value_in: Decimal::ZERO,
            value_out: Decimal::ZERO,
        };
        for movement in &movements {
            let cost = costs
                .get(&movement.product_id)
                .copied()
                .unwrap_or(Decimal::ZERO);
            if movement.quantity >= Decimal::ZERO {
                totals.total_in += movement.quantity;
                totals.value_in += movement.quantity * cost;
            } else {
                totals.total_out += -movement.quantity;
                totals.value_out += -movement.quantity * cost;
            }
            totals.net_change += movement.quantity;
        }

        Ok(MovementHistoryReport { movements, totals })
    }

    /// Transfer counts and averages grouped by status and type.
    #[instrument(skip(self, query), fields(tenant_id = ctx.tenant_id))]
    pub async fn transfer_stats(
        &self,
        ctx: &OperationContext,
        query: TransferReportQuery,
    ) -> Result<TransferStatsReport, ServiceError> {
        let db = self.db.as_ref();

        let mut find = Transfer::find().filter(transfer::Column::TenantId.eq(ctx.tenant_id));
        if let Some(from) = query.from_date {
            find = find
                .filter(transfer::Column::CreatedAt.gte(from.and_time(NaiveTime::MIN).and_utc()));
        }
        if let Some(to) = query.to_date {
            let end = to
                .succ_opt()
                .unwrap_or(to)
                .and_time(NaiveTime::MIN)
                .and_utc();
            find = find.filter(transfer::Column::CreatedAt.lt(end));
        }
        if let Some(visible) = auth::visible_branches(db, ctx).await? {
            let ids: Vec<i64> = visible.into_iter().collect();
            find = find.filter(
                Condition::any()
                    .add(transfer::Column::FromBranchId.is_in(ids.clone()))
                    .add(transfer::Column::ToBranchId.is_in(ids)),
            );
        }

        let transfers = find.all(db).await.map_err(ServiceError::db_error)?;

        let mut by_status: HashMap<String, u64> = HashMap::new();
        let mut by_type: HashMap<String, u64> = HashMap::new();
        let mut item_total: i64 = 0;
        for row in &transfers {
            *by_status.entry(row.status.clone()).or_default() += 1;
            *by_type.entry(row.transfer_type.clone()).or_default() += 1;
            item_total += i64::from(row.total_items);
        }

        let total = transfers.len() as u64;
        let average_items_per_transfer = if total == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(item_total) / Decimal::from(total)
        };

        Ok(TransferStatsReport {
            total_transfers: total,
            by_status,
            by_type,
            average_items_per_transfer,
        })
    }

    /// Products at or below their reorder threshold.
    #[instrument(skip(self), fields(tenant_id = ctx.tenant_id))]
    pub async fn low_stock(
        &self,
        ctx: &OperationContext,
        branch_id: Option<i64>,
    ) -> Result<Vec<LowStockRow>, ServiceError> {
        let db = self.db.as_ref();

        let mut thresholds =
            ReorderLevel::find().filter(reorder_level::Column::TenantId.eq(ctx.tenant_id));
        if let Some(branch_id) = branch_id {
            thresholds = thresholds.filter(reorder_level::Column::BranchId.eq(branch_id));
        }
        let visible = auth::visible_branches(db, ctx).await?;
        let thresholds = thresholds.all(db).await.map_err(ServiceError::db_error)?;

        let levels = StockLevel::find()
            .filter(stock_level::Column::TenantId.eq(ctx.tenant_id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let level_by_key: HashMap<(i64, i64), Decimal> = levels
            .into_iter()
            .map(|row| ((row.branch_id, row.product_id), row.current_stock))
            .collect();

        let branch_names = self.branch_names(ctx).await?;
        let product_names = self.product_names(ctx).await?;

        let mut rows = Vec::new();
        for threshold in thresholds {
            if let Some(visible) = &visible {
                if !visible.contains(&threshold.branch_id) {
                    continue;
                }
            }
            let current = level_by_key
                .get(&(threshold.branch_id, threshold.product_id))
                .copied()
                .unwrap_or(Decimal::ZERO);
            if current > threshold.reorder_level {
                continue;
            }
            rows.push(LowStockRow {
                branch_id: threshold.branch_id,
                branch_name: branch_names
                    .get(&threshold.branch_id)
                    .cloned()
                    .unwrap_or_default(),
                product_id: threshold.product_id,
                product_name: product_names
                    .get(&threshold.product_id)
                    .cloned()
                    .unwrap_or_default(),
                current_stock: current,
                reorder_level: threshold.reorder_level,
                out_of_stock: current <= Decimal::ZERO,
            });
        }
        rows.sort_by(|a, b| a.current_stock.cmp(&b.current_stock));
        Ok(rows)
    }

    /// Inbound/outbound movement volume per branch over a date window.
    #[instrument(skip(self, query), fields(tenant_id = ctx.tenant_id))]
    pub async fn branch_throughput(
        &self,
        ctx: &OperationContext,
        query: MovementReportQuery,
    ) -> Result<Vec<BranchThroughputRow>, ServiceError> {
        let history = self.movement_history(ctx, query).await?;
        let branch_names = self.branch_names(ctx).await?;

        let mut per_branch: HashMap<i64, BranchThroughputRow> = HashMap::new();
        for movement in &history.movements {
            let entry = per_branch
                .entry(movement.branch_id)
                .or_insert_with(|| BranchThroughputRow {
                    branch_id: movement.branch_id,
                    branch_name: branch_names
                        .get(&movement.branch_id)
                        .cloned()
                        .unwrap_or_default(),
                    quantity_in: Decimal::ZERO,
                    quantity_out: Decimal::ZERO,
                    movement_count: 0,
                });
            if movement.quantity >= Decimal::ZERO {
                entry.quantity_in += movement.quantity;
            } else {
                entry.quantity_out += -movement.quantity;
            }
            entry.movement_count += 1;
        }

        let mut rows: Vec<BranchThroughputRow> = per_branch.into_values().collect();
        rows.sort_by_key(|row| row.branch_id);
        Ok(rows)
    }

    async fn standard_costs(
        &self,
        ctx: &OperationContext,
        movements: &[stock_movement::Model],
    ) -> Result<HashMap<i64, Decimal>, ServiceError> {
        let product_ids: HashSet<i64> = movements.iter().map(|m| m.product_id).collect();
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let products = Product::find()
            .filter(product::Column::TenantId.eq(ctx.tenant_id))
            .filter(product::Column::Id.is_in(product_ids))
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(products
            .into_iter()
            .map(|p| (p.id, p.standard_cost))
            .collect())
    }

    async fn branch_names(
        &self,
        ctx: &OperationContext,
    ) -> Result<HashMap<i64, String>, ServiceError> {
        let branches = Branch::find()
            .filter(branch::Column::TenantId.eq(ctx.tenant_id))
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(branches.into_iter().map(|b| (b.id, b.name)).collect())
    }

    async fn product_names(
        &self,
        ctx: &OperationContext,
    ) -> Result<HashMap<i64, String>, ServiceError> {
        let products = Product::find()
            .filter(product::Column::TenantId.eq(ctx.tenant_id))
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(products.into_iter().map(|p| (p.id, p.name)).collect())
    }
}
