//! OpenAPI document assembly.
//!
//! Components only for now; the raw document is served at
//! `/api-docs/openapi.json` for client generators.

use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BranchStock API",
        version = "0.3.0",
        description = "Multi-tenant, multi-branch stock control: transfers, \
                       adjustments, production intake and reporting over an \
                       append-only stock ledger."
    ),
    servers((url = "http://localhost:8080/api/v1", description = "Local development")),
    tags(
        (name = "Transfers", description = "Inter-branch transfer workflow"),
        (name = "Stock", description = "Stock levels and movement ledger"),
        (name = "Adjustments", description = "Manual stock adjustments"),
        (name = "Production", description = "Production output intake"),
        (name = "Reports", description = "Reporting projections"),
        (name = "Health", description = "Health check endpoints")
    ),
    components(
        schemas(
            crate::ListQuery,
            crate::services::transfers::TransferItemInput,
            crate::services::transfers::CreateTransferInput,
            crate::services::transfers::UpdateTransferInput,
            crate::services::transfers::ReceiveItemInput,
            crate::services::transfers::TransferListQuery,
            crate::handlers::transfers::ReceiveTransferRequest,
            crate::handlers::transfers::CancelTransferRequest,
            crate::services::adjustments::AdjustmentType,
            crate::services::adjustments::AdjustStockInput,
            crate::services::adjustments::AdjustmentOutcome,
            crate::services::production::ProductionItemInput,
            crate::services::production::RecordProductionInput,
            crate::services::stock_ledger::LevelListQuery,
            crate::services::stock_ledger::MovementListQuery,
            crate::services::reports::MovementReportQuery,
            crate::services::reports::MovementTotals,
            crate::services::reports::TransferReportQuery,
            crate::services::reports::TransferStatsReport,
            crate::services::reports::LowStockRow,
            crate::services::reports::BranchThroughputRow,
            crate::handlers::reports::LowStockQuery,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated document.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}
