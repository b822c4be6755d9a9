//! Per-tenant workflow configuration.
//!
//! Settings are stored as strings in `tenant_settings` and coerced here.
//! A [`WorkflowSettings`] value is a snapshot loaded once per logical
//! operation; changes apply to transfers created afterwards.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::context::OperationContext;
use crate::entities::{tenant_setting, transfer, TenantSetting};
use crate::errors::ServiceError;

pub mod keys {
    pub const WORKFLOW_MODE: &str = "inventory.workflow_mode";
    pub const ALLOW_SHIP_ON_CREATE: &str = "inventory.allow_ship_on_create";
    pub const SEPARATION_OF_DUTIES: &str = "inventory.separation_of_duties";
    pub const RESERVE_ON_PENDING: &str = "inventory.reserve_on_pending";
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkflowMode {
    OneStep,
    TwoStep,
}

/// Workflow-relevant transfer actions subject to policy gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAction {
    Ship,
    Receive,
    ShipOnCreate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSettings {
    pub mode: WorkflowMode,
    pub allow_ship_on_create: bool,
    pub separation_of_duties: bool,
    pub reserve_on_pending: bool,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            mode: WorkflowMode::TwoStep,
            allow_ship_on_create: false,
            separation_of_duties: false,
            reserve_on_pending: false,
        }
    }
}

impl WorkflowSettings {
    /// Loads the tenant's workflow settings, falling back to defaults for
    /// missing or unparseable values.
    pub async fn load<C: ConnectionTrait>(
        db: &C,
        ctx: &OperationContext,
    ) -> Result<Self, ServiceError> {
        let rows = TenantSetting::find()
            .filter(tenant_setting::Column::TenantId.eq(ctx.tenant_id))
            .filter(
                tenant_setting::Column::SettingKey.is_in([
                    keys::WORKFLOW_MODE,
                    keys::ALLOW_SHIP_ON_CREATE,
                    keys::SEPARATION_OF_DUTIES,
                    keys::RESERVE_ON_PENDING,
                ]),
            )
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut settings = Self::default();
        for row in rows {
            match row.setting_key.as_str() {
                keys::WORKFLOW_MODE => {
                    settings.mode = coerce_mode(&row.setting_value).unwrap_or(settings.mode)
                }
                keys::ALLOW_SHIP_ON_CREATE => {
                    settings.allow_ship_on_create = coerce_bool(&row.setting_value)
                }
                keys::SEPARATION_OF_DUTIES => {
                    settings.separation_of_duties = coerce_bool(&row.setting_value)
                }
                keys::RESERVE_ON_PENDING => {
                    settings.reserve_on_pending = coerce_bool(&row.setting_value)
                }
                _ => {}
            }
        }
        Ok(settings)
    }

    /// Pure policy decision for workflow actions on a transfer.
    ///
    /// Separation of duties, when enforced, refuses the actor who already
    /// performed the opposite leg of the same transfer. The base permission
    /// itself is resolved by the authorization boundary and passed in.
    pub fn can_perform_action(
        &self,
        action: TransferAction,
        transfer: &transfer::Model,
        actor_user_id: i64,
        has_base_permission: bool,
    ) -> bool {
        if !has_base_permission {
            return false;
        }
        match action {
            TransferAction::Ship => {
                !(self.separation_of_duties && transfer.received_by == Some(actor_user_id))
            }
            TransferAction::Receive => {
                !(self.separation_of_duties && transfer.shipped_by == Some(actor_user_id))
            }
            TransferAction::ShipOnCreate => {
                self.mode == WorkflowMode::TwoStep && self.allow_ship_on_create
            }
        }
    }
}

/// Settings are stored boolean-as-integer or as strings; coerce explicitly.
fn coerce_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn coerce_mode(raw: &str) -> Option<WorkflowMode> {
    raw.trim().to_ascii_lowercase().parse().ok()
}
