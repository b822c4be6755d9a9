//! Manual adjustment endpoint.

use axum::{extract::State, Json};

use crate::auth::{consts as perm, PermissionChecker};
use crate::context::OperationContext;
use crate::services::adjustments::{AdjustStockInput, AdjustmentOutcome};
use crate::{ApiResponse, ApiResult, AppState};

pub async fn adjust_stock(
    State(state): State<AppState>,
    ctx: OperationContext,
    Json(input): Json<AdjustStockInput>,
) -> ApiResult<AdjustmentOutcome> {
    let mut checker = PermissionChecker::new();
    checker
        .ensure(state.db.as_ref(), &ctx, perm::STOCK_ADJUST)
        .await?;
    let outcome = state.services.adjustments.adjust(&ctx, input).await?;
    Ok(Json(ApiResponse::success(outcome)))
}
