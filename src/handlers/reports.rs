//! Reporting endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::{consts as perm, PermissionChecker};
use crate::context::OperationContext;
use crate::services::reports::{
    BranchThroughputRow, LowStockRow, MovementHistoryReport, MovementReportQuery,
    TransferReportQuery, TransferStatsReport,
};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LowStockQuery {
    pub branch_id: Option<i64>,
}

pub async fn movement_history(
    State(state): State<AppState>,
    ctx: OperationContext,
    Query(query): Query<MovementReportQuery>,
) -> ApiResult<MovementHistoryReport> {
    let mut checker = PermissionChecker::new();
    checker
        .ensure(state.db.as_ref(), &ctx, perm::REPORTS_VIEW)
        .await?;
    let report = state.services.reports.movement_history(&ctx, query).await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn transfer_stats(
    State(state): State<AppState>,
    ctx: OperationContext,
    Query(query): Query<TransferReportQuery>,
) -> ApiResult<TransferStatsReport> {
    let mut checker = PermissionChecker::new();
    checker
        .ensure(state.db.as_ref(), &ctx, perm::REPORTS_VIEW)
        .await?;
    let report = state.services.reports.transfer_stats(&ctx, query).await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn low_stock(
    State(state): State<AppState>,
    ctx: OperationContext,
    Query(query): Query<LowStockQuery>,
) -> ApiResult<Vec<LowStockRow>> {
    let mut checker = PermissionChecker::new();
    checker
        .ensure(state.db.as_ref(), &ctx, perm::REPORTS_VIEW)
        .await?;
    let rows = state
        .services
        .reports
        .low_stock(&ctx, query.branch_id)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}

pub async fn branch_throughput(
    State(state): State<AppState>,
    ctx: OperationContext,
    Query(query): Query<MovementReportQuery>,
) -> ApiResult<Vec<BranchThroughputRow>> {
    let mut checker = PermissionChecker::new();
    checker
        .ensure(state.db.as_ref(), &ctx, perm::REPORTS_VIEW)
        .await?;
    let rows = state
        .services
        .reports
        .branch_throughput(&ctx, query)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}
