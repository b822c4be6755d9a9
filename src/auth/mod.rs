//! Authorization boundary: permission rules and branch visibility.
//!
//! Permission resolution is two-tier: a tenant-specific rule wins, a
//! tenant-0 global rule is the fallback, and absence of both is a deny.
//! Lookups are memoized per [`PermissionChecker`] instance; a checker lives
//! for exactly one logical operation, so rule changes are picked up by the
//! next request instead of lingering in a process-wide cache.

use std::collections::{HashMap, HashSet};

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::context::OperationContext;
use crate::entities::{permission_rule, user_branch, PermissionRule, UserBranch};
use crate::errors::ServiceError;

/// Tenant id holding the global default permission rules.
pub const GLOBAL_TENANT: i64 = 0;

/// Permission keys understood by the platform.
pub mod consts {
    pub const TRANSFERS_VIEW: &str = "transfers.view";
    pub const TRANSFERS_CREATE: &str = "transfers.create";
    pub const TRANSFERS_EDIT: &str = "transfers.edit";
    pub const TRANSFERS_SHIP: &str = "transfers.ship";
    pub const TRANSFERS_RECEIVE: &str = "transfers.receive";
    pub const TRANSFERS_CANCEL: &str = "transfers.cancel";
    pub const STOCK_VIEW: &str = "stock.view";
    pub const STOCK_ADJUST: &str = "stock.adjust";
    pub const STOCK_PRODUCE: &str = "stock.produce";
    pub const REPORTS_VIEW: &str = "reports.view";
}

/// Operation-scoped permission resolver.
#[derive(Debug, Default)]
pub struct PermissionChecker {
    cache: HashMap<(i64, String, String), bool>,
}

impl PermissionChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a permission for the context's role, memoizing the answer
    /// for the lifetime of this checker.
    pub async fn has_permission<C: ConnectionTrait>(
        &mut self,
        db: &C,
        ctx: &OperationContext,
        permission: &str,
    ) -> Result<bool, ServiceError> {
        let key = (
            ctx.tenant_id,
            ctx.role_key.clone(),
            permission.to_string(),
        );
        if let Some(allowed) = self.cache.get(&key) {
            return Ok(*allowed);
        }

        let allowed = lookup_rule(db, ctx.tenant_id, &ctx.role_key, permission).await?;
        self.cache.insert(key, allowed);
        Ok(allowed)
    }

    /// Rejects with `Forbidden` when the permission is not granted.
    pub async fn ensure<C: ConnectionTrait>(
        &mut self,
        db: &C,
        ctx: &OperationContext,
        permission: &str,
    ) -> Result<(), ServiceError> {
        if self.has_permission(db, ctx, permission).await? {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "role '{}' lacks permission '{}'",
                ctx.role_key, permission
            )))
        }
    }
}

async fn lookup_rule<C: ConnectionTrait>(
    db: &C,
    tenant_id: i64,
    role_key: &str,
    permission: &str,
) -> Result<bool, ServiceError> {
    let tenant_rule = PermissionRule::find()
        .filter(permission_rule::Column::TenantId.eq(tenant_id))
        .filter(permission_rule::Column::RoleKey.eq(role_key))
        .filter(permission_rule::Column::PermissionKey.eq(permission))
        .one(db)
        .await
        .map_err(ServiceError::db_error)?;

    if let Some(rule) = tenant_rule {
        return Ok(rule.allowed);
    }

    let global_rule = PermissionRule::find()
        .filter(permission_rule::Column::TenantId.eq(GLOBAL_TENANT))
        .filter(permission_rule::Column::RoleKey.eq(role_key))
        .filter(permission_rule::Column::PermissionKey.eq(permission))
        .one(db)
        .await
        .map_err(ServiceError::db_error)?;

    // Default deny.
    Ok(global_rule.map(|rule| rule.allowed).unwrap_or(false))
}

/// Branch ids visible to the actor; `None` means unrestricted.
pub async fn visible_branches<C: ConnectionTrait>(
    db: &C,
    ctx: &OperationContext,
) -> Result<Option<HashSet<i64>>, ServiceError> {
    if ctx.all_branches {
        return Ok(None);
    }

    let grants = UserBranch::find()
        .filter(user_branch::Column::TenantId.eq(ctx.tenant_id))
        .filter(user_branch::Column::UserId.eq(ctx.user_id))
        .all(db)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(Some(grants.into_iter().map(|g| g.branch_id).collect()))
}

/// Rejects when the actor cannot see the given branch.
pub async fn ensure_branch_access<C: ConnectionTrait>(
    db: &C,
    ctx: &OperationContext,
    branch_id: i64,
) -> Result<(), ServiceError> {
    match visible_branches(db, ctx).await? {
        None => Ok(()),
        Some(branches) if branches.contains(&branch_id) => Ok(()),
        Some(_) => Err(ServiceError::Forbidden(format!(
            "user {} has no access to branch {}",
            ctx.user_id, branch_id
        ))),
    }
}
