//! Transfer endpoints.
//!
//! Handlers stay thin: resolve the base permission, delegate to the
//! service, wrap the result. Workflow-specific gates (separation of
//! duties, ship-on-create) are enforced inside the service where the
//! transfer's stamps are at hand.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{consts as perm, PermissionChecker};
use crate::context::OperationContext;
use crate::services::transfers::{
    CreateTransferInput, ReceiveItemInput, TransferDetail, TransferItemInput, TransferListQuery,
    UpdateTransferInput,
};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReceiveTransferRequest {
    /// Per-item received quantities; omitted items default to the shipped
    /// quantity.
    #[serde(default)]
    pub items: Vec<ReceiveItemInput>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CancelTransferRequest {
    #[validate(length(min = 1, message = "reason is required"))]
    pub reason: String,
}

pub async fn list_transfers(
    State(state): State<AppState>,
    ctx: OperationContext,
    Query(query): Query<TransferListQuery>,
) -> ApiResult<PaginatedResponse<crate::entities::transfer::Model>> {
    let mut checker = PermissionChecker::new();
    checker
        .ensure(state.db.as_ref(), &ctx, perm::TRANSFERS_VIEW)
        .await?;

    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let (items, total) = state.services.transfers.list(&ctx, query).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

pub async fn get_transfer(
    State(state): State<AppState>,
    ctx: OperationContext,
    Path(id): Path<i64>,
) -> ApiResult<TransferDetail> {
    let mut checker = PermissionChecker::new();
    checker
        .ensure(state.db.as_ref(), &ctx, perm::TRANSFERS_VIEW)
        .await?;
    let detail = state.services.transfers.get(&ctx, id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

pub async fn create_transfer(
    State(state): State<AppState>,
    ctx: OperationContext,
    Json(input): Json<CreateTransferInput>,
) -> ApiResult<TransferDetail> {
    let mut checker = PermissionChecker::new();
    checker
        .ensure(state.db.as_ref(), &ctx, perm::TRANSFERS_CREATE)
        .await?;
    let detail = state.services.transfers.create(&ctx, input).await?;
    Ok(Json(ApiResponse::success(detail)))
}

pub async fn update_transfer(
    State(state): State<AppState>,
    ctx: OperationContext,
    Path(id): Path<i64>,
    Json(input): Json<UpdateTransferInput>,
) -> ApiResult<TransferDetail> {
    let mut checker = PermissionChecker::new();
    checker
        .ensure(state.db.as_ref(), &ctx, perm::TRANSFERS_EDIT)
        .await?;
    let detail = state.services.transfers.update(&ctx, id, input).await?;
    Ok(Json(ApiResponse::success(detail)))
}

pub async fn ship_transfer(
    State(state): State<AppState>,
    ctx: OperationContext,
    Path(id): Path<i64>,
) -> ApiResult<TransferDetail> {
    let detail = state.services.transfers.ship(&ctx, id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

pub async fn receive_transfer(
    State(state): State<AppState>,
    ctx: OperationContext,
    Path(id): Path<i64>,
    Json(request): Json<ReceiveTransferRequest>,
) -> ApiResult<TransferDetail> {
    let detail = state
        .services
        .transfers
        .receive(&ctx, id, request.items)
        .await?;
    Ok(Json(ApiResponse::success(detail)))
}

pub async fn cancel_transfer(
    State(state): State<AppState>,
    ctx: OperationContext,
    Path(id): Path<i64>,
    Json(request): Json<CancelTransferRequest>,
) -> ApiResult<TransferDetail> {
    request.validate()?;
    let mut checker = PermissionChecker::new();
    checker
        .ensure(state.db.as_ref(), &ctx, perm::TRANSFERS_CANCEL)
        .await?;
    let detail = state
        .services
        .transfers
        .cancel(&ctx, id, &request.reason)
        .await?;
    Ok(Json(ApiResponse::success(detail)))
}

pub async fn add_transfer_item(
    State(state): State<AppState>,
    ctx: OperationContext,
    Path(id): Path<i64>,
    Json(item): Json<TransferItemInput>,
) -> ApiResult<TransferDetail> {
    let mut checker = PermissionChecker::new();
    checker
        .ensure(state.db.as_ref(), &ctx, perm::TRANSFERS_EDIT)
        .await?;
    let detail = state.services.transfers.add_item(&ctx, id, item).await?;
    Ok(Json(ApiResponse::success(detail)))
}

pub async fn remove_transfer_item(
    State(state): State<AppState>,
    ctx: OperationContext,
    Path((id, item_id)): Path<(i64, i64)>,
) -> ApiResult<TransferDetail> {
    let mut checker = PermissionChecker::new();
    checker
        .ensure(state.db.as_ref(), &ctx, perm::TRANSFERS_EDIT)
        .await?;
    let detail = state
        .services
        .transfers
        .remove_item(&ctx, id, item_id)
        .await?;
    Ok(Json(ApiResponse::success(detail)))
}
