//! Production output recording.
//!
//! Finished goods are booked in through a synthetic transfer: from and to
//! branch are the producing branch, the document takes the PRD prefix and
//! the row is created directly in `received` with every stamp set. That
//! keeps production in the same reporting surface as transfers while the
//! ledger rows carry their own `production_in` movement type.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::auth;
use crate::context::OperationContext;
use crate::db::DbPool;
use crate::entities::{
    stock_movement::{MovementType, ReferenceType},
    transfer,
    transfer::{TransferStatus, TransferType},
    transfer_item,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::transfers::TransferDetail;
use crate::services::{catalog, sequences, stock_ledger};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProductionItemInput {
    pub product_id: i64,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecordProductionInput {
    pub branch_id: i64,
    pub items: Vec<ProductionItemInput>,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct ProductionService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl ProductionService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Records a production run at a production-enabled branch.
    #[instrument(skip(self, input), fields(tenant_id = ctx.tenant_id))]
    pub async fn produce(
        &self,
        ctx: &OperationContext,
        input: RecordProductionInput,
    ) -> Result<TransferDetail, ServiceError> {
        let db = self.db.as_ref();

        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "A production run needs at least one item".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for item in &input.items {
            if item.quantity <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "Quantity for product {} must be positive",
                    item.product_id
                )));
            }
            if !seen.insert(item.product_id) {
                return Err(ServiceError::ValidationError(format!(
                    "Product {} appears more than once",
                    item.product_id
                )));
            }
        }

        let branch = catalog::get_active_branch(db, ctx, input.branch_id).await?;
        if !branch.is_production_enabled {
            return Err(ServiceError::InvalidOperation(format!(
                "Branch '{}' does not record production",
                branch.name
            )));
        }
        auth::ensure_branch_access(db, ctx, input.branch_id).await?;

        let mut lines = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let product = catalog::get_tracked_product(db, ctx, item.product_id).await?;
            lines.push((product, item.quantity));
        }

        let transfer_number =
            sequences::next_number(db, ctx.tenant_id, TransferType::ProductionTransfer.doc_prefix())
                .await?;

        let ctx2 = ctx.clone();
        let input2 = input.clone();
        let detail = db
            .transaction::<_, TransferDetail, ServiceError>(move |txn| {
                Box::pin(async move {
                    let now = Utc::now();

                    let header = transfer::ActiveModel {
                        tenant_id: Set(ctx2.tenant_id),
                        transfer_number: Set(transfer_number),
                        from_branch_id: Set(input2.branch_id),
                        to_branch_id: Set(input2.branch_id),
                        status: Set(TransferStatus::Received.to_string()),
                        transfer_type: Set(TransferType::ProductionTransfer.to_string()),
                        notes: Set(input2.notes.clone()),
                        scheduled_date: Set(None),
                        total_items: Set(lines.len() as i32),
                        stock_reserved: Set(false),
                        created_by: Set(ctx2.user_id),
                        created_at: Set(now),
                        shipped_by: Set(Some(ctx2.user_id)),
                        shipped_at: Set(Some(now)),
                        received_by: Set(Some(ctx2.user_id)),
                        received_at: Set(Some(now)),
                        ..Default::default()
                    };
                    let header = header.insert(txn).await.map_err(ServiceError::db_error)?;

                    let mut items = Vec::with_capacity(lines.len());
                    for (product, quantity) in &lines {
                        let item = transfer_item::ActiveModel {
                            transfer_id: Set(header.id),
                            product_id: Set(product.id),
                            product_name: Set(product.name.clone()),
                            quantity_requested: Set(*quantity),
                            quantity_shipped: Set(*quantity),
                            quantity_received: Set(*quantity),
                            unit_cost: Set(product.standard_cost),
                            total_cost: Set(product.standard_cost * *quantity),
                            ..Default::default()
                        };
                        items.push(item.insert(txn).await.map_err(ServiceError::db_error)?);

                        stock_ledger::apply_delta(
                            txn,
                            &ctx2,
                            input2.branch_id,
                            product.id,
                            *quantity,
                            MovementType::ProductionIn,
                            ReferenceType::Production,
                            Some(header.id),
                            input2.notes.clone(),
                        )
                        .await?;
                    }

                    Ok(TransferDetail {
                        transfer: header,
                        items,
                    })
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(
            transfer_id = detail.transfer.id,
            transfer_number = %detail.transfer.transfer_number,
            item_count = detail.items.len(),
            "production recorded"
        );
        if let Err(err) = self
            .event_sender
            .send(Event::StockProduced {
                tenant_id: ctx.tenant_id,
                branch_id: input.branch_id,
                transfer_id: detail.transfer.id,
                item_count: detail.items.len(),
            })
            .await
        {
            warn!(error = %err, "failed to emit event");
        }

        Ok(detail)
    }
}
