//! Catalog lookups with tenant-ownership and activity checks.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::context::OperationContext;
use crate::entities::{branch, product, Branch, Product};
use crate::errors::ServiceError;

/// Tenant-owned branch lookup.
pub async fn get_branch<C: ConnectionTrait>(
    db: &C,
    ctx: &OperationContext,
    branch_id: i64,
) -> Result<branch::Model, ServiceError> {
    Branch::find_by_id(branch_id)
        .filter(branch::Column::TenantId.eq(ctx.tenant_id))
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Branch {branch_id} not found")))
}

/// Tenant-owned, active branch; inactive branches reject the operation.
pub async fn get_active_branch<C: ConnectionTrait>(
    db: &C,
    ctx: &OperationContext,
    branch_id: i64,
) -> Result<branch::Model, ServiceError> {
    let branch = get_branch(db, ctx, branch_id).await?;
    if !branch.is_active {
        return Err(ServiceError::ValidationError(format!(
            "Branch '{}' is inactive",
            branch.name
        )));
    }
    Ok(branch)
}

/// Tenant-owned product lookup.
pub async fn get_product<C: ConnectionTrait>(
    db: &C,
    ctx: &OperationContext,
    product_id: i64,
) -> Result<product::Model, ServiceError> {
    Product::find_by_id(product_id)
        .filter(product::Column::TenantId.eq(ctx.tenant_id))
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {product_id} not found")))
}

/// Active, inventory-tracked product; anything else cannot move stock.
pub async fn get_tracked_product<C: ConnectionTrait>(
    db: &C,
    ctx: &OperationContext,
    product_id: i64,
) -> Result<product::Model, ServiceError> {
    let product = get_product(db, ctx, product_id).await?;
    if !product.is_active {
        return Err(ServiceError::ValidationError(format!(
            "Product '{}' is inactive",
            product.name
        )));
    }
    if !product.is_inventory_tracked {
        return Err(ServiceError::ValidationError(format!(
            "Product '{}' is not inventory-tracked",
            product.name
        )));
    }
    Ok(product)
}
