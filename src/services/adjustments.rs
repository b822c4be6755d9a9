//! Manual stock adjustments.
//!
//! Three modes: `increase`, `decrease` (clamped so stock never goes below
//! zero) and `set_to` (absolute target, negative targets clamp to zero).
//! Every applied adjustment leaves exactly one ledger row carrying the
//! mandatory reason; a computed delta of zero applies nothing and appends
//! nothing.

use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::auth;
use crate::context::OperationContext;
use crate::db::DbPool;
use crate::entities::stock_movement::{MovementType, ReferenceType};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::{catalog, stock_ledger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AdjustmentType {
    Increase,
    Decrease,
    SetTo,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AdjustStockInput {
    pub branch_id: i64,
    pub product_id: i64,
    pub adjustment_type: AdjustmentType,
    pub quantity: Decimal,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdjustmentOutcome {
    pub branch_id: i64,
    pub product_id: i64,
    pub adjustment_type: AdjustmentType,
    pub previous_stock: Decimal,
    pub new_stock: Decimal,
    pub quantity_changed: Decimal,
    /// True when nothing needed to change and no movement was recorded.
    pub skipped: bool,
}

#[derive(Clone)]
pub struct AdjustmentService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl AdjustmentService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Applies one adjustment. The current level is read inside the same
    /// transaction that writes the delta, so concurrent adjustments cannot
    /// interleave between read and write.
    #[instrument(skip(self, input), fields(tenant_id = ctx.tenant_id))]
    pub async fn adjust(
        &self,
        ctx: &OperationContext,
        input: AdjustStockInput,
    ) -> Result<AdjustmentOutcome, ServiceError> {
        let db = self.db.as_ref();

        let reason = input.reason.trim().to_string();
        if reason.is_empty() {
            return Err(ServiceError::ValidationError(
                "An adjustment reason is required".into(),
            ));
        }
        if input.quantity < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Adjustment quantity cannot be negative".into(),
            ));
        }
        if input.adjustment_type != AdjustmentType::SetTo && input.quantity == Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Adjustment quantity must be positive".into(),
            ));
        }

        catalog::get_active_branch(db, ctx, input.branch_id).await?;
        auth::ensure_branch_access(db, ctx, input.branch_id).await?;
        catalog::get_tracked_product(db, ctx, input.product_id).await?;

        let ctx2 = ctx.clone();
        let outcome = db
            .transaction::<_, AdjustmentOutcome, ServiceError>(move |txn| {
                Box::pin(async move {
                    let current = stock_ledger::get_level(
                        txn,
                        &ctx2,
                        input.branch_id,
                        input.product_id,
                    )
                    .await?
                    .map(|level| level.current_stock)
                    .unwrap_or(Decimal::ZERO);

                    let delta = match input.adjustment_type {
                        AdjustmentType::Increase => input.quantity,
                        // Never drive stock below zero; the clamped delta is
                        // what the ledger records.
                        AdjustmentType::Decrease => -input.quantity.min(current.max(Decimal::ZERO)),
                        AdjustmentType::SetTo => input.quantity.max(Decimal::ZERO) - current,
                    };

                    if delta == Decimal::ZERO {
                        return Ok(AdjustmentOutcome {
                            branch_id: input.branch_id,
                            product_id: input.product_id,
                            adjustment_type: input.adjustment_type,
                            previous_stock: current,
                            new_stock: current,
                            quantity_changed: Decimal::ZERO,
                            skipped: true,
                        });
                    }

                    let applied = stock_ledger::apply_delta(
                        txn,
                        &ctx2,
                        input.branch_id,
                        input.product_id,
                        delta,
                        MovementType::Adjustment,
                        ReferenceType::Adjustment,
                        None,
                        Some(reason),
                    )
                    .await?;

                    Ok(AdjustmentOutcome {
                        branch_id: input.branch_id,
                        product_id: input.product_id,
                        adjustment_type: input.adjustment_type,
                        previous_stock: applied.previous_stock,
                        new_stock: applied.new_stock,
                        quantity_changed: applied.quantity_changed,
                        skipped: false,
                    })
                })
            })
            .await
            .map_err(ServiceError::from)?;

        if !outcome.skipped {
            info!(
                branch_id = outcome.branch_id,
                product_id = outcome.product_id,
                quantity_changed = %outcome.quantity_changed,
                new_stock = %outcome.new_stock,
                "stock adjusted"
            );
            if let Err(err) = self
                .event_sender
                .send(Event::StockAdjusted {
                    tenant_id: ctx.tenant_id,
                    branch_id: outcome.branch_id,
                    product_id: outcome.product_id,
                    quantity_changed: outcome.quantity_changed,
                    new_stock: outcome.new_stock,
                })
                .await
            {
                warn!(error = %err, "failed to emit event");
            }
        }

        Ok(outcome)
    }
}
