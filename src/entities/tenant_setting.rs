use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-tenant key/value configuration. Values are stored as strings and
/// coerced at read time (workflow settings and friends).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tenant_settings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub tenant_id: i64,
    pub setting_key: String,
    pub setting_value: String,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
