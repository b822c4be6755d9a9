use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role/permission grant. Tenant 0 rows are the global defaults used when a
/// tenant has no rule of its own; absence of both means deny.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "permission_rules")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub tenant_id: i64,
    pub role_key: String,
    pub permission_key: String,
    pub allowed: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
