// Shared across integration test binaries; not every binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

use branchstock_api::{
    auth::consts as perm,
    config::AppConfig,
    context::OperationContext,
    db,
    entities::{branch, permission_rule, product, reorder_level, tenant_setting, user_branch},
    events::{self, EventSender},
    AppState,
};

pub const TENANT: i64 = 1;
pub const MAIN_BRANCH: i64 = 1;
pub const OUTLET_BRANCH: i64 = 2;
pub const INACTIVE_BRANCH: i64 = 3;
pub const FLOUR: i64 = 1;
pub const SUGAR: i64 = 2;
pub const UNTRACKED_SERVICE_FEE: i64 = 3;
pub const MANAGER_A: i64 = 10;
pub const MANAGER_B: i64 = 11;
pub const OUTSIDER: i64 = 12;

/// Application harness backed by a throwaway SQLite database.
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    _event_task: tokio::task::JoinHandle<()>,
    _tmp: tempfile::TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let db_path = tmp.path().join("branchstock_test.db");

        let cfg = AppConfig {
            database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
            host: "127.0.0.1".to_string(),
            port: 18_080,
            environment: "test".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            auto_migrate: true,
            db_max_connections: 1,
            db_min_connections: 1,
        };

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(db_arc, cfg, event_sender);
        let router = Router::new()
            .nest("/api/v1", branchstock_api::api_v1_routes())
            .with_state(state.clone());

        let app = Self {
            state,
            router,
            _event_task: event_task,
            _tmp: tmp,
        };
        app.seed().await;
        app
    }

    async fn seed(&self) {
        let db = self.state.db.as_ref();
        let now = Utc::now();

        for (id, name, production) in [
            (MAIN_BRANCH, "Main Kitchen", true),
            (OUTLET_BRANCH, "Downtown Outlet", false),
        ] {
            branch::ActiveModel {
                id: Set(id),
                tenant_id: Set(TENANT),
                name: Set(name.to_string()),
                branch_type: Set("store".to_string()),
                is_active: Set(true),
                is_production_enabled: Set(production),
                created_at: Set(now),
            }
            .insert(db)
            .await
            .expect("seed branch");
        }
        branch::ActiveModel {
            id: Set(INACTIVE_BRANCH),
            tenant_id: Set(TENANT),
            name: Set("Closed Outlet".to_string()),
            branch_type: Set("store".to_string()),
            is_active: Set(false),
            is_production_enabled: Set(false),
            created_at: Set(now),
        }
        .insert(db)
        .await
        .expect("seed inactive branch");

        for (id, name, cost, tracked) in [
            (FLOUR, "Flour 25kg", Decimal::new(250, 1), true),
            (SUGAR, "Sugar 10kg", Decimal::new(120, 1), true),
            (UNTRACKED_SERVICE_FEE, "Delivery Fee", Decimal::ZERO, false),
        ] {
            product::ActiveModel {
                id: Set(id),
                tenant_id: Set(TENANT),
                name: Set(name.to_string()),
                unit: Set("bag".to_string()),
                standard_cost: Set(cost),
                is_active: Set(true),
                is_inventory_tracked: Set(tracked),
                created_at: Set(now),
            }
            .insert(db)
            .await
            .expect("seed product");
        }

        // Global defaults: managers can do everything.
        for key in [
            perm::TRANSFERS_VIEW,
            perm::TRANSFERS_CREATE,
            perm::TRANSFERS_EDIT,
            perm::TRANSFERS_SHIP,
            perm::TRANSFERS_RECEIVE,
            perm::TRANSFERS_CANCEL,
            perm::STOCK_VIEW,
            perm::STOCK_ADJUST,
            perm::STOCK_PRODUCE,
            perm::REPORTS_VIEW,
        ] {
            permission_rule::ActiveModel {
                tenant_id: Set(0),
                role_key: Set("manager".to_string()),
                permission_key: Set(key.to_string()),
                allowed: Set(true),
                ..Default::default()
            }
            .insert(db)
            .await
            .expect("seed permission rule");
        }

        for user_id in [MANAGER_A, MANAGER_B] {
            for branch_id in [MAIN_BRANCH, OUTLET_BRANCH, INACTIVE_BRANCH] {
                user_branch::ActiveModel {
                    tenant_id: Set(TENANT),
                    user_id: Set(user_id),
                    branch_id: Set(branch_id),
                    ..Default::default()
                }
                .insert(db)
                .await
                .expect("seed branch grant");
            }
        }
    }

    pub fn ctx(&self, user_id: i64) -> OperationContext {
        OperationContext::new(TENANT, user_id, "manager")
    }

    /// Books opening stock through a regular adjustment.
    pub async fn seed_stock(&self, branch_id: i64, product_id: i64, quantity: Decimal) {
        use branchstock_api::services::adjustments::{AdjustStockInput, AdjustmentType};
        self.state
            .services
            .adjustments
            .adjust(
                &self.ctx(MANAGER_A),
                AdjustStockInput {
                    branch_id,
                    product_id,
                    adjustment_type: AdjustmentType::Increase,
                    quantity,
                    reason: "opening stock".to_string(),
                },
            )
            .await
            .expect("seed stock");
    }

    pub async fn stock_level(
        &self,
        branch_id: i64,
        product_id: i64,
    ) -> Option<branchstock_api::entities::stock_level::Model> {
        branchstock_api::services::stock_ledger::get_level(
            self.state.db.as_ref(),
            &self.ctx(MANAGER_A),
            branch_id,
            product_id,
        )
        .await
        .expect("load stock level")
    }

    pub async fn current_stock(&self, branch_id: i64, product_id: i64) -> Decimal {
        self.stock_level(branch_id, product_id)
            .await
            .map(|level| level.current_stock)
            .unwrap_or(Decimal::ZERO)
    }

    pub async fn reserved_stock(&self, branch_id: i64, product_id: i64) -> Decimal {
        self.stock_level(branch_id, product_id)
            .await
            .map(|level| level.reserved_stock)
            .unwrap_or(Decimal::ZERO)
    }

    /// Writes or overwrites a tenant setting.
    pub async fn set_setting(&self, key: &str, value: &str) {
        use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
        let db = self.state.db.as_ref();
        let existing = branchstock_api::entities::TenantSetting::find()
            .filter(tenant_setting::Column::TenantId.eq(TENANT))
            .filter(tenant_setting::Column::SettingKey.eq(key))
            .one(db)
            .await
            .expect("query setting");
        match existing {
            Some(row) => {
                let mut active: tenant_setting::ActiveModel = row.into();
                active.setting_value = Set(value.to_string());
                active.updated_at = Set(Utc::now());
                active.update(db).await.expect("update setting");
            }
            None => {
                tenant_setting::ActiveModel {
                    tenant_id: Set(TENANT),
                    setting_key: Set(key.to_string()),
                    setting_value: Set(value.to_string()),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(db)
                .await
                .expect("insert setting");
            }
        }
    }

    pub async fn set_reorder_level(&self, branch_id: i64, product_id: i64, level: Decimal) {
        reorder_level::ActiveModel {
            tenant_id: Set(TENANT),
            branch_id: Set(branch_id),
            product_id: Set(product_id),
            reorder_level: Set(level),
            ..Default::default()
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed reorder level");
    }

    /// Sends an authenticated JSON request through the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user_id: i64,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-tenant-id", TENANT.to_string())
            .header("x-user-id", user_id.to_string())
            .header("x-role", "manager");
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .expect("build request"),
            None => {
                builder = builder.header("content-length", "0");
                builder.body(Body::empty()).expect("build request")
            }
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("parse json body")
        };
        (status, json)
    }
}
