//! Production recording endpoint.

use axum::{extract::State, Json};

use crate::auth::{consts as perm, PermissionChecker};
use crate::context::OperationContext;
use crate::services::production::RecordProductionInput;
use crate::services::transfers::TransferDetail;
use crate::{ApiResponse, ApiResult, AppState};

pub async fn record_production(
    State(state): State<AppState>,
    ctx: OperationContext,
    Json(input): Json<RecordProductionInput>,
) -> ApiResult<TransferDetail> {
    let mut checker = PermissionChecker::new();
    checker
        .ensure(state.db.as_ref(), &ctx, perm::STOCK_PRODUCE)
        .await?;
    let detail = state.services.production.produce(&ctx, input).await?;
    Ok(Json(ApiResponse::success(detail)))
}
