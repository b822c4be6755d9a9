use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Monotonic per-tenant counter backing human-readable document numbers.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sequence_counters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: i64,
    /// Document type prefix (TRF, PRD, RTN).
    #[sea_orm(primary_key, auto_increment = false)]
    pub seq_type: String,
    pub last_no: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
