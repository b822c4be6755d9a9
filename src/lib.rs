//! BranchStock API Library
//!
//! Multi-tenant, multi-branch stock control core: an append-only stock
//! ledger, transfer workflows driven by per-tenant policy, manual
//! adjustments, production intake and reporting projections.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::{extract::State, response::Json, routing::{delete, get, post, put}, Router};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let services = handlers::AppServices::new(db.clone(), event_sender.clone());
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

// Common query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

// Common response wrappers
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        // Transfers
        .route("/transfers", get(handlers::transfers::list_transfers))
        .route("/transfers", post(handlers::transfers::create_transfer))
        .route("/transfers/:id", get(handlers::transfers::get_transfer))
        .route("/transfers/:id", put(handlers::transfers::update_transfer))
        .route(
            "/transfers/:id/ship",
            post(handlers::transfers::ship_transfer),
        )
        .route(
            "/transfers/:id/receive",
            post(handlers::transfers::receive_transfer),
        )
        .route(
            "/transfers/:id/cancel",
            post(handlers::transfers::cancel_transfer),
        )
        .route(
            "/transfers/:id/items",
            post(handlers::transfers::add_transfer_item),
        )
        .route(
            "/transfers/:id/items/:item_id",
            delete(handlers::transfers::remove_transfer_item),
        )
        // Stock
        .route("/stock/levels", get(handlers::stock::list_stock_levels))
        .route(
            "/stock/movements",
            get(handlers::stock::list_stock_movements),
        )
        // Adjustments and production
        .route("/adjustments", post(handlers::adjustments::adjust_stock))
        .route("/production", post(handlers::production::record_production))
        // Reports
        .route("/reports/movements", get(handlers::reports::movement_history))
        .route("/reports/transfers", get(handlers::reports::transfer_stats))
        .route("/reports/low-stock", get(handlers::reports::low_stock))
        .route(
            "/reports/throughput",
            get(handlers::reports::branch_throughput),
        )
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "service": "branchstock-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(health_data)))
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn success_response_carries_data() {
        let response = ApiResponse::success("ok");
        assert!(response.success);
        assert_eq!(response.data, Some("ok"));
    }

    #[test]
    fn pagination_rounds_total_pages_up() {
        let page: PaginatedResponse<i64> = PaginatedResponse::new(vec![], 101, 1, 20);
        assert_eq!(page.total_pages, 6);
    }
}
