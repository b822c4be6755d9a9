//! Stock level and movement listing endpoints.

use axum::{
    extract::{Query, State},
    Json,
};

use crate::auth::{consts as perm, PermissionChecker};
use crate::context::OperationContext;
use crate::entities::{stock_level, stock_movement};
use crate::services::stock_ledger::{self, LevelListQuery, MovementListQuery};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

pub async fn list_stock_levels(
    State(state): State<AppState>,
    ctx: OperationContext,
    Query(query): Query<LevelListQuery>,
) -> ApiResult<PaginatedResponse<stock_level::Model>> {
    let mut checker = PermissionChecker::new();
    checker
        .ensure(state.db.as_ref(), &ctx, perm::STOCK_VIEW)
        .await?;

    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 200);
    let (items, total) = stock_ledger::list_levels(state.db.as_ref(), &ctx, query).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

pub async fn list_stock_movements(
    State(state): State<AppState>,
    ctx: OperationContext,
    Query(query): Query<MovementListQuery>,
) -> ApiResult<PaginatedResponse<stock_movement::Model>> {
    let mut checker = PermissionChecker::new();
    checker
        .ensure(state.db.as_ref(), &ctx, perm::STOCK_VIEW)
        .await?;

    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 200);
    let (items, total) = stock_ledger::list_movements(state.db.as_ref(), &ctx, query).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}
