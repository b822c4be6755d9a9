use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transfer header. Lifecycle: pending -> shipped -> received, or
/// pending -> cancelled. One-step mode creates rows directly in `received`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transfers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub tenant_id: i64,
    #[sea_orm(unique)]
    pub transfer_number: String,
    pub from_branch_id: i64,
    pub to_branch_id: i64,
    /// See [`TransferStatus`].
    pub status: String,
    /// See [`TransferType`].
    pub transfer_type: String,
    pub notes: Option<String>,
    pub scheduled_date: Option<Date>,
    /// Recomputed from a live item count on every item mutation.
    pub total_items: i32,
    /// Whether this transfer's quantities were earmarked at create time.
    /// Release on ship/cancel keys on this, not on the tenant's current
    /// policy, so a mid-lifecycle settings flip cannot strand or steal a
    /// reservation.
    pub stock_reserved: bool,
    pub created_by: i64,
    pub created_at: DateTimeUtc,
    pub shipped_by: Option<i64>,
    pub shipped_at: Option<DateTimeUtc>,
    pub received_by: Option<i64>,
    pub received_at: Option<DateTimeUtc>,
    pub cancelled_by: Option<i64>,
    pub cancelled_at: Option<DateTimeUtc>,
    pub cancellation_reason: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transfer_item::Entity")]
    TransferItem,
}

impl Related<super::transfer_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransferItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

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
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Shipped,
    Received,
    Cancelled,
}

impl TransferStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Received | Self::Cancelled)
    }
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
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransferType {
    InterBranchTransfer,
    ProductionTransfer,
    ReturnTransfer,
}

impl TransferType {
    /// Document number prefix for this transfer type.
    pub fn doc_prefix(&self) -> &'static str {
        match self {
            Self::InterBranchTransfer => "TRF",
            Self::ProductionTransfer => "PRD",
            Self::ReturnTransfer => "RTN",
        }
    }
}
