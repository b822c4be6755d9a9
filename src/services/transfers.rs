//! Transfer workflow engine.
//!
//! Drives a transfer header and its items through
//! pending -> shipped -> received (or pending -> cancelled), honoring the
//! tenant's workflow policy. Every mutating operation executes inside one
//! database transaction; a validation failure mid-loop rolls the whole
//! operation back, so stock is never left half-moved.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::auth::{self, consts as perm, PermissionChecker};
use crate::context::OperationContext;
use crate::db::DbPool;
use crate::entities::{
    stock_movement::{MovementType, ReferenceType},
    transfer::{self, TransferStatus, TransferType},
    transfer_item, Transfer, TransferItem,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::{catalog, sequences, stock_ledger};
use crate::services::workflow_policy::{TransferAction, WorkflowMode, WorkflowSettings};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransferItemInput {
    pub product_id: i64,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateTransferInput {
    pub from_branch_id: i64,
    pub to_branch_id: i64,
    pub items: Vec<TransferItemInput>,
    pub notes: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    /// Request immediate shipment on creation (two-step mode only, subject
    /// to policy and the ship permission; falls back to pending otherwise).
    #[serde(default)]
    pub ship_on_create: bool,
    /// Defaults to an inter-branch transfer. Production transfers are
    /// created by the production service, never directly.
    #[schema(value_type = Option<String>)]
    pub transfer_type: Option<TransferType>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReceiveItemInput {
    pub item_id: i64,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateTransferInput {
    pub notes: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    /// Full replacement of the item list when present.
    pub items: Option<Vec<TransferItemInput>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransferListQuery {
    #[schema(value_type = Option<String>)]
    pub status: Option<TransferStatus>,
    #[schema(value_type = Option<String>)]
    pub transfer_type: Option<TransferType>,
    pub branch_id: Option<i64>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferDetail {
    #[serde(flatten)]
    pub transfer: transfer::Model,
    pub items: Vec<transfer_item::Model>,
}

/// Product snapshot captured at validation time, inserted with the item.
#[derive(Debug, Clone)]
struct LineSpec {
    product_id: i64,
    product_name: String,
    unit_cost: Decimal,
    quantity: Decimal,
}

#[derive(Clone)]
pub struct TransferService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl TransferService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates a transfer under the tenant's workflow policy.
    ///
    /// Validation (branches, products, duplicates, availability) happens
    /// before the document number is allocated, so number contention
    /// surfaces before any stock is touched and a rejected request never
    /// consumes a number needlessly.
    #[instrument(skip(self, input), fields(tenant_id = ctx.tenant_id))]
    pub async fn create(
        &self,
        ctx: &OperationContext,
        input: CreateTransferInput,
    ) -> Result<TransferDetail, ServiceError> {
        let db = self.db.as_ref();

        let transfer_type = input.transfer_type.unwrap_or(TransferType::InterBranchTransfer);
        if transfer_type == TransferType::ProductionTransfer {
            return Err(ServiceError::ValidationError(
                "Production transfers are created through the production endpoint".into(),
            ));
        }
        if input.from_branch_id == input.to_branch_id {
            return Err(ServiceError::ValidationError(
                "Source and destination branch must differ".into(),
            ));
        }
        validate_item_inputs(&input.items)?;

        catalog::get_active_branch(db, ctx, input.from_branch_id).await?;
        catalog::get_active_branch(db, ctx, input.to_branch_id).await?;
        auth::ensure_branch_access(db, ctx, input.from_branch_id).await?;
        auth::ensure_branch_access(db, ctx, input.to_branch_id).await?;

        let settings = WorkflowSettings::load(db, ctx).await?;
        let lines = snapshot_lines(db, ctx, &input.items).await?;
        check_availability(db, ctx, input.from_branch_id, &lines).await?;

        let ship_on_create = if input.ship_on_create {
            let mut checker = PermissionChecker::new();
            let has_ship = checker.has_permission(db, ctx, perm::TRANSFERS_SHIP).await?;
            // Policy gate is evaluated against the not-yet-created transfer;
            // only mode/flag/permission matter here.
            settings.mode == WorkflowMode::TwoStep && settings.allow_ship_on_create && has_ship
        } else {
            false
        };

        let transfer_number =
            sequences::next_number(db, ctx.tenant_id, transfer_type.doc_prefix()).await?;

        let ctx2 = ctx.clone();
        let input2 = input.clone();
        let lines2 = lines.clone();
        let number2 = transfer_number.clone();
        let detail = db
            .transaction::<_, TransferDetail, ServiceError>(move |txn| {
                Box::pin(async move {
                    let now = Utc::now();
                    let one_step = settings.mode == WorkflowMode::OneStep;

                    let status = if one_step {
                        TransferStatus::Received
                    } else if ship_on_create {
                        TransferStatus::Shipped
                    } else {
                        TransferStatus::Pending
                    };

                    let moves_out_now = one_step || ship_on_create;
                    let reserve_now = !moves_out_now && settings.reserve_on_pending;
                    if moves_out_now {
                        check_availability(txn, &ctx2, input2.from_branch_id, &lines2).await?;
                    }

                    let header = transfer::ActiveModel {
                        tenant_id: Set(ctx2.tenant_id),
                        transfer_number: Set(number2),
                        from_branch_id: Set(input2.from_branch_id),
                        to_branch_id: Set(input2.to_branch_id),
                        status: Set(status.to_string()),
                        transfer_type: Set(transfer_type.to_string()),
                        notes: Set(input2.notes.clone()),
                        scheduled_date: Set(input2.scheduled_date),
                        total_items: Set(lines2.len() as i32),
                        stock_reserved: Set(reserve_now),
                        created_by: Set(ctx2.user_id),
                        created_at: Set(now),
                        shipped_by: Set(moves_out_now.then_some(ctx2.user_id)),
                        shipped_at: Set(moves_out_now.then_some(now)),
                        received_by: Set(one_step.then_some(ctx2.user_id)),
                        received_at: Set(one_step.then_some(now)),
                        ..Default::default()
                    };
                    let header = header.insert(txn).await.map_err(ServiceError::db_error)?;

                    let mut items = Vec::with_capacity(lines2.len());
                    for line in &lines2 {
                        let shipped = if moves_out_now {
                            line.quantity
                        } else {
                            Decimal::ZERO
                        };
                        let received = if one_step { line.quantity } else { Decimal::ZERO };
                        let item = transfer_item::ActiveModel {
                            transfer_id: Set(header.id),
                            product_id: Set(line.product_id),
                            product_name: Set(line.product_name.clone()),
                            quantity_requested: Set(line.quantity),
                            quantity_shipped: Set(shipped),
                            quantity_received: Set(received),
                            unit_cost: Set(line.unit_cost),
                            total_cost: Set(line.unit_cost * line.quantity),
                            ..Default::default()
                        };
                        items.push(item.insert(txn).await.map_err(ServiceError::db_error)?);
                    }

                    for line in &lines2 {
                        if moves_out_now {
                            stock_ledger::apply_delta(
                                txn,
                                &ctx2,
                                input2.from_branch_id,
                                line.product_id,
                                -line.quantity,
                                MovementType::TransferOut,
                                ReferenceType::Transfer,
                                Some(header.id),
                                None,
                            )
                            .await?;
                        }
                        if one_step {
                            stock_ledger::apply_delta(
                                txn,
                                &ctx2,
                                input2.to_branch_id,
                                line.product_id,
                                line.quantity,
                                MovementType::TransferIn,
                                ReferenceType::Transfer,
                                Some(header.id),
                                None,
                            )
                            .await?;
                        }
                        if reserve_now {
                            stock_ledger::reserve(
                                txn,
                                &ctx2,
                                input2.from_branch_id,
                                line.product_id,
                                line.quantity,
                            )
                            .await?;
                        }
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
            status = %detail.transfer.status,
            "transfer created"
        );
        self.emit(Event::TransferCreated {
            tenant_id: ctx.tenant_id,
            transfer_id: detail.transfer.id,
            transfer_number: detail.transfer.transfer_number.clone(),
            status: detail.transfer.status.clone(),
        })
        .await;

        Ok(detail)
    }

    /// Ships a pending transfer: releases its reservation, re-checks
    /// availability per item and moves all items out, or nothing at all.
    #[instrument(skip(self), fields(tenant_id = ctx.tenant_id))]
    pub async fn ship(
        &self,
        ctx: &OperationContext,
        transfer_id: i64,
    ) -> Result<TransferDetail, ServiceError> {
        let db = self.db.as_ref();
        let (header, items) = self.load_with_items(ctx, transfer_id).await?;
        require_status(&header, TransferStatus::Pending, "shipped")?;

        let settings = WorkflowSettings::load(db, ctx).await?;
        let mut checker = PermissionChecker::new();
        let has_base = checker.has_permission(db, ctx, perm::TRANSFERS_SHIP).await?;
        if !settings.can_perform_action(TransferAction::Ship, &header, ctx.user_id, has_base) {
            return Err(ServiceError::Forbidden(
                "Shipping this transfer is not permitted for this actor".into(),
            ));
        }

        let ctx2 = ctx.clone();
        let detail = db
            .transaction::<_, TransferDetail, ServiceError>(move |txn| {
                Box::pin(async move {
                    let now = Utc::now();

                    // The release decision follows the flag stamped at create
                    // time; the tenant's current setting does not apply to
                    // transfers already in flight.
                    if header.stock_reserved {
                        for item in &items {
                            stock_ledger::release(
                                txn,
                                &ctx2,
                                header.from_branch_id,
                                item.product_id,
                                item.quantity_requested,
                            )
                            .await?;
                        }
                    }

                    // Any shortage aborts the whole ship; the rollback also
                    // restores the reservation released above.
                    for item in &items {
                        let available = stock_ledger::available_stock(
                            txn,
                            &ctx2,
                            header.from_branch_id,
                            item.product_id,
                        )
                        .await?;
                        if available < item.quantity_requested {
                            return Err(ServiceError::InsufficientStock(format!(
                                "'{}': requested {}, available {}",
                                item.product_name, item.quantity_requested, available
                            )));
                        }
                    }

                    let mut shipped_items = Vec::with_capacity(items.len());
                    for item in items {
                        stock_ledger::apply_delta(
                            txn,
                            &ctx2,
                            header.from_branch_id,
                            item.product_id,
                            -item.quantity_requested,
                            MovementType::TransferOut,
                            ReferenceType::Transfer,
                            Some(header.id),
                            None,
                        )
                        .await?;

                        let quantity = item.quantity_requested;
                        let mut active: transfer_item::ActiveModel = item.into();
                        active.quantity_shipped = Set(quantity);
                        shipped_items
                            .push(active.update(txn).await.map_err(ServiceError::db_error)?);
                    }

                    let mut active: transfer::ActiveModel = header.into();
                    active.status = Set(TransferStatus::Shipped.to_string());
                    active.stock_reserved = Set(false);
                    active.shipped_by = Set(Some(ctx2.user_id));
                    active.shipped_at = Set(Some(now));
                    let header = active.update(txn).await.map_err(ServiceError::db_error)?;

                    Ok(TransferDetail {
                        transfer: header,
                        items: shipped_items,
                    })
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(transfer_id = detail.transfer.id, "transfer shipped");
        self.emit(Event::TransferShipped {
            tenant_id: ctx.tenant_id,
            transfer_id: detail.transfer.id,
        })
        .await;

        Ok(detail)
    }

    /// Receives a shipped transfer at the destination. Per-item received
    /// quantities default to the shipped quantity; partial receipt is
    /// allowed, over-receipt never is.
    #[instrument(skip(self, received), fields(tenant_id = ctx.tenant_id))]
    pub async fn receive(
        &self,
        ctx: &OperationContext,
        transfer_id: i64,
        received: Vec<ReceiveItemInput>,
    ) -> Result<TransferDetail, ServiceError> {
        let db = self.db.as_ref();
        let (header, items) = self.load_with_items(ctx, transfer_id).await?;
        require_status(&header, TransferStatus::Shipped, "received")?;

        let settings = WorkflowSettings::load(db, ctx).await?;
        let mut checker = PermissionChecker::new();
        let has_base = checker
            .has_permission(db, ctx, perm::TRANSFERS_RECEIVE)
            .await?;
        if !settings.can_perform_action(TransferAction::Receive, &header, ctx.user_id, has_base) {
            return Err(ServiceError::Forbidden(
                "Receiving this transfer is not permitted for this actor".into(),
            ));
        }

        let item_ids: HashSet<i64> = items.iter().map(|item| item.id).collect();
        let mut overrides: HashMap<i64, Decimal> = HashMap::new();
        for entry in received {
            if !item_ids.contains(&entry.item_id) {
                return Err(ServiceError::ValidationError(format!(
                    "Item {} does not belong to transfer {}",
                    entry.item_id, transfer_id
                )));
            }
            if overrides.insert(entry.item_id, entry.quantity).is_some() {
                return Err(ServiceError::ValidationError(format!(
                    "Duplicate received quantity for item {}",
                    entry.item_id
                )));
            }
        }

        let ctx2 = ctx.clone();
        let detail = db
            .transaction::<_, TransferDetail, ServiceError>(move |txn| {
                Box::pin(async move {
                    let now = Utc::now();

                    let mut received_items = Vec::with_capacity(items.len());
                    for item in items {
                        let quantity = overrides
                            .get(&item.id)
                            .copied()
                            .unwrap_or(item.quantity_shipped);
                        if quantity < Decimal::ZERO {
                            return Err(ServiceError::ValidationError(format!(
                                "Received quantity for '{}' cannot be negative",
                                item.product_name
                            )));
                        }
                        if quantity > item.quantity_shipped {
                            return Err(ServiceError::ValidationError(format!(
                                "'{}': received {} exceeds shipped {}",
                                item.product_name, quantity, item.quantity_shipped
                            )));
                        }

                        if quantity > Decimal::ZERO {
                            stock_ledger::apply_delta(
                                txn,
                                &ctx2,
                                header.to_branch_id,
                                item.product_id,
                                quantity,
                                MovementType::TransferIn,
                                ReferenceType::Transfer,
                                Some(header.id),
                                None,
                            )
                            .await?;
                        }

                        let mut active: transfer_item::ActiveModel = item.into();
                        active.quantity_received = Set(quantity);
                        received_items
                            .push(active.update(txn).await.map_err(ServiceError::db_error)?);
                    }

                    let mut active: transfer::ActiveModel = header.into();
                    active.status = Set(TransferStatus::Received.to_string());
                    active.received_by = Set(Some(ctx2.user_id));
                    active.received_at = Set(Some(now));
                    let header = active.update(txn).await.map_err(ServiceError::db_error)?;

                    Ok(TransferDetail {
                        transfer: header,
                        items: received_items,
                    })
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(transfer_id = detail.transfer.id, "transfer received");
        self.emit(Event::TransferReceived {
            tenant_id: ctx.tenant_id,
            transfer_id: detail.transfer.id,
        })
        .await;

        Ok(detail)
    }

    /// Cancels a pending transfer. The reason is mandatory.
    #[instrument(skip(self, reason), fields(tenant_id = ctx.tenant_id))]
    pub async fn cancel(
        &self,
        ctx: &OperationContext,
        transfer_id: i64,
        reason: &str,
    ) -> Result<TransferDetail, ServiceError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::ValidationError(
                "A cancellation reason is required".into(),
            ));
        }

        let db = self.db.as_ref();
        let (header, items) = self.load_with_items(ctx, transfer_id).await?;
        require_status(&header, TransferStatus::Pending, "cancelled")?;

        let ctx2 = ctx.clone();
        let reason2 = reason.to_string();
        let detail = db
            .transaction::<_, TransferDetail, ServiceError>(move |txn| {
                Box::pin(async move {
                    if header.stock_reserved {
                        for item in &items {
                            stock_ledger::release(
                                txn,
                                &ctx2,
                                header.from_branch_id,
                                item.product_id,
                                item.quantity_requested,
                            )
                            .await?;
                        }
                    }

                    let mut active: transfer::ActiveModel = header.into();
                    active.status = Set(TransferStatus::Cancelled.to_string());
                    active.stock_reserved = Set(false);
                    active.cancelled_by = Set(Some(ctx2.user_id));
                    active.cancelled_at = Set(Some(Utc::now()));
                    active.cancellation_reason = Set(Some(reason2));
                    let header = active.update(txn).await.map_err(ServiceError::db_error)?;

                    Ok(TransferDetail {
                        transfer: header,
                        items,
                    })
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(transfer_id = detail.transfer.id, "transfer cancelled");
        self.emit(Event::TransferCancelled {
            tenant_id: ctx.tenant_id,
            transfer_id: detail.transfer.id,
            reason: reason.to_string(),
        })
        .await;

        Ok(detail)
    }

    /// Edits a pending transfer. Replacing the item list redoes the
    /// reservation bookkeeping and recomputes the live item count.
    #[instrument(skip(self, input), fields(tenant_id = ctx.tenant_id))]
    pub async fn update(
        &self,
        ctx: &OperationContext,
        transfer_id: i64,
        input: UpdateTransferInput,
    ) -> Result<TransferDetail, ServiceError> {
        let db = self.db.as_ref();
        let (header, old_items) = self.load_with_items(ctx, transfer_id).await?;
        require_status(&header, TransferStatus::Pending, "edited")?;

        let new_lines = match &input.items {
            Some(items) => {
                validate_item_inputs(items)?;
                Some(snapshot_lines(db, ctx, items).await?)
            }
            None => None,
        };

        let ctx2 = ctx.clone();
        let input2 = input.clone();
        let detail = db
            .transaction::<_, TransferDetail, ServiceError>(move |txn| {
                Box::pin(async move {
                    let mut active: transfer::ActiveModel = header.clone().into();
                    if let Some(notes) = input2.notes {
                        active.notes = Set(Some(notes));
                    }
                    if let Some(date) = input2.scheduled_date {
                        active.scheduled_date = Set(Some(date));
                    }

                    let items = if let Some(lines) = new_lines {
                        if header.stock_reserved {
                            for item in &old_items {
                                stock_ledger::release(
                                    txn,
                                    &ctx2,
                                    header.from_branch_id,
                                    item.product_id,
                                    item.quantity_requested,
                                )
                                .await?;
                            }
                        }
                        TransferItem::delete_many()
                            .filter(transfer_item::Column::TransferId.eq(header.id))
                            .exec(txn)
                            .await
                            .map_err(ServiceError::db_error)?;

                        check_availability(txn, &ctx2, header.from_branch_id, &lines).await?;

                        let mut items = Vec::with_capacity(lines.len());
                        for line in &lines {
                            let item = transfer_item::ActiveModel {
                                transfer_id: Set(header.id),
                                product_id: Set(line.product_id),
                                product_name: Set(line.product_name.clone()),
                                quantity_requested: Set(line.quantity),
                                quantity_shipped: Set(Decimal::ZERO),
                                quantity_received: Set(Decimal::ZERO),
                                unit_cost: Set(line.unit_cost),
                                total_cost: Set(line.unit_cost * line.quantity),
                                ..Default::default()
                            };
                            items.push(item.insert(txn).await.map_err(ServiceError::db_error)?);

                            if header.stock_reserved {
                                stock_ledger::reserve(
                                    txn,
                                    &ctx2,
                                    header.from_branch_id,
                                    line.product_id,
                                    line.quantity,
                                )
                                .await?;
                            }
                        }
                        items
                    } else {
                        old_items
                    };

                    let live_count = TransferItem::find()
                        .filter(transfer_item::Column::TransferId.eq(header.id))
                        .count(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    active.total_items = Set(live_count as i32);

                    let header = active.update(txn).await.map_err(ServiceError::db_error)?;
                    Ok(TransferDetail {
                        transfer: header,
                        items,
                    })
                })
            })
            .await
            .map_err(ServiceError::from)?;

        self.emit(Event::TransferUpdated {
            tenant_id: ctx.tenant_id,
            transfer_id: detail.transfer.id,
        })
        .await;

        Ok(detail)
    }

    /// Adds a single item to a pending transfer.
    #[instrument(skip(self, item), fields(tenant_id = ctx.tenant_id))]
    pub async fn add_item(
        &self,
        ctx: &OperationContext,
        transfer_id: i64,
        item: TransferItemInput,
    ) -> Result<TransferDetail, ServiceError> {
        let db = self.db.as_ref();
        let (header, items) = self.load_with_items(ctx, transfer_id).await?;
        require_status(&header, TransferStatus::Pending, "edited")?;

        if item.quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Item quantity must be positive".into(),
            ));
        }
        if items.iter().any(|existing| existing.product_id == item.product_id) {
            return Err(ServiceError::ValidationError(format!(
                "Product {} is already on this transfer",
                item.product_id
            )));
        }

        let lines = snapshot_lines(db, ctx, std::slice::from_ref(&item)).await?;

        let ctx2 = ctx.clone();
        let detail = db
            .transaction::<_, TransferDetail, ServiceError>(move |txn| {
                Box::pin(async move {
                    check_availability(txn, &ctx2, header.from_branch_id, &lines).await?;
                    let line = &lines[0];

                    let new_item = transfer_item::ActiveModel {
                        transfer_id: Set(header.id),
                        product_id: Set(line.product_id),
                        product_name: Set(line.product_name.clone()),
                        quantity_requested: Set(line.quantity),
                        quantity_shipped: Set(Decimal::ZERO),
                        quantity_received: Set(Decimal::ZERO),
                        unit_cost: Set(line.unit_cost),
                        total_cost: Set(line.unit_cost * line.quantity),
                        ..Default::default()
                    };
                    let new_item = new_item.insert(txn).await.map_err(ServiceError::db_error)?;

                    if header.stock_reserved {
                        stock_ledger::reserve(
                            txn,
                            &ctx2,
                            header.from_branch_id,
                            line.product_id,
                            line.quantity,
                        )
                        .await?;
                    }

                    let header = refresh_total_items(txn, header).await?;
                    let mut items = items;
                    items.push(new_item);
                    Ok(TransferDetail {
                        transfer: header,
                        items,
                    })
                })
            })
            .await
            .map_err(ServiceError::from)?;

        self.emit(Event::TransferUpdated {
            tenant_id: ctx.tenant_id,
            transfer_id: detail.transfer.id,
        })
        .await;

        Ok(detail)
    }

    /// Removes a single item from a pending transfer.
    #[instrument(skip(self), fields(tenant_id = ctx.tenant_id))]
    pub async fn remove_item(
        &self,
        ctx: &OperationContext,
        transfer_id: i64,
        item_id: i64,
    ) -> Result<TransferDetail, ServiceError> {
        let db = self.db.as_ref();
        let (header, items) = self.load_with_items(ctx, transfer_id).await?;
        require_status(&header, TransferStatus::Pending, "edited")?;

        let target = items
            .iter()
            .find(|item| item.id == item_id)
            .cloned()
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Item {item_id} not found on transfer {transfer_id}"
                ))
            })?;

        let ctx2 = ctx.clone();
        let detail = db
            .transaction::<_, TransferDetail, ServiceError>(move |txn| {
                Box::pin(async move {
                    if header.stock_reserved {
                        stock_ledger::release(
                            txn,
                            &ctx2,
                            header.from_branch_id,
                            target.product_id,
                            target.quantity_requested,
                        )
                        .await?;
                    }

                    target
                        .clone()
                        .delete(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let header = refresh_total_items(txn, header).await?;
                    let items = items.into_iter().filter(|i| i.id != item_id).collect();
                    Ok(TransferDetail {
                        transfer: header,
                        items,
                    })
                })
            })
            .await
            .map_err(ServiceError::from)?;

        self.emit(Event::TransferUpdated {
            tenant_id: ctx.tenant_id,
            transfer_id: detail.transfer.id,
        })
        .await;

        Ok(detail)
    }

    /// Loads one transfer with its items.
    pub async fn get(
        &self,
        ctx: &OperationContext,
        transfer_id: i64,
    ) -> Result<TransferDetail, ServiceError> {
        let (transfer, items) = self.load_with_items(ctx, transfer_id).await?;
        Ok(TransferDetail { transfer, items })
    }

    /// Lists transfers visible to the actor, newest first.
    pub async fn list(
        &self,
        ctx: &OperationContext,
        query: TransferListQuery,
    ) -> Result<(Vec<transfer::Model>, u64), ServiceError> {
        let db = self.db.as_ref();
        let mut find = Transfer::find()
            .filter(transfer::Column::TenantId.eq(ctx.tenant_id))
            .order_by_desc(transfer::Column::Id);

        if let Some(status) = query.status {
            find = find.filter(transfer::Column::Status.eq(status.to_string()));
        }
        if let Some(transfer_type) = query.transfer_type {
            find = find.filter(transfer::Column::TransferType.eq(transfer_type.to_string()));
        }
        if let Some(branch_id) = query.branch_id {
            find = find.filter(
                Condition::any()
                    .add(transfer::Column::FromBranchId.eq(branch_id))
                    .add(transfer::Column::ToBranchId.eq(branch_id)),
            );
        }
        if let Some(visible) = auth::visible_branches(db, ctx).await? {
            let ids: Vec<i64> = visible.into_iter().collect();
            find = find.filter(
                Condition::any()
                    .add(transfer::Column::FromBranchId.is_in(ids.clone()))
                    .add(transfer::Column::ToBranchId.is_in(ids)),
            );
        }

        let limit = query.limit.clamp(1, 100);
        let page = query.page.max(1);
        let paginator = find.paginate(db, limit);
        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::db_error)?;
        let rows = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;
        Ok((rows, total))
    }

    async fn load_with_items(
        &self,
        ctx: &OperationContext,
        transfer_id: i64,
    ) -> Result<(transfer::Model, Vec<transfer_item::Model>), ServiceError> {
        let db = self.db.as_ref();
        let header = Transfer::find_by_id(transfer_id)
            .filter(transfer::Column::TenantId.eq(ctx.tenant_id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Transfer {transfer_id} not found")))?;

        // Same visibility rule as the list projections: the actor must see
        // at least one end of the transfer.
        if let Some(visible) = auth::visible_branches(db, ctx).await? {
            if !visible.contains(&header.from_branch_id)
                && !visible.contains(&header.to_branch_id)
            {
                return Err(ServiceError::Forbidden(format!(
                    "user {} has no access to transfer {}",
                    ctx.user_id, transfer_id
                )));
            }
        }

        let items = TransferItem::find()
            .filter(transfer_item::Column::TransferId.eq(header.id))
            .order_by_asc(transfer_item::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((header, items))
    }

    async fn emit(&self, event: Event) {
        if let Err(err) = self.event_sender.send(event).await {
            warn!(error = %err, "failed to emit event");
        }
    }
}

/// Rejects empty item lists, non-positive quantities and duplicate products.
fn validate_item_inputs(items: &[TransferItemInput]) -> Result<(), ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::ValidationError(
            "A transfer needs at least one item".into(),
        ));
    }
    let mut seen = HashSet::new();
    for item in items {
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
    Ok(())
}

/// Resolves and snapshots product name/cost for each requested line.
async fn snapshot_lines<C: sea_orm::ConnectionTrait>(
    db: &C,
    ctx: &OperationContext,
    items: &[TransferItemInput],
) -> Result<Vec<LineSpec>, ServiceError> {
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let product = catalog::get_tracked_product(db, ctx, item.product_id).await?;
        lines.push(LineSpec {
            product_id: product.id,
            product_name: product.name,
            unit_cost: product.standard_cost,
            quantity: item.quantity,
        });
    }
    Ok(lines)
}

/// Hard-rejects any line whose availability falls short; no partial
/// fulfillment.
async fn check_availability<C: sea_orm::ConnectionTrait>(
    db: &C,
    ctx: &OperationContext,
    branch_id: i64,
    lines: &[LineSpec],
) -> Result<(), ServiceError> {
    for line in lines {
        let available =
            stock_ledger::available_stock(db, ctx, branch_id, line.product_id).await?;
        if available < line.quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "'{}': requested {}, available {}",
                line.product_name, line.quantity, available
            )));
        }
    }
    Ok(())
}

fn require_status(
    header: &transfer::Model,
    expected: TransferStatus,
    action: &str,
) -> Result<(), ServiceError> {
    if header.status != expected.to_string() {
        return Err(ServiceError::InvalidStatus(format!(
            "Only {} transfers can be {}; transfer {} is {}",
            expected, action, header.transfer_number, header.status
        )));
    }
    Ok(())
}

async fn refresh_total_items<C: sea_orm::ConnectionTrait>(
    db: &C,
    header: transfer::Model,
) -> Result<transfer::Model, ServiceError> {
    let live_count = TransferItem::find()
        .filter(transfer_item::Column::TransferId.eq(header.id))
        .count(db)
        .await
        .map_err(ServiceError::db_error)?;
    let mut active: transfer::ActiveModel = header.into();
    active.total_items = Set(live_count as i32);
    active.update(db).await.map_err(ServiceError::db_error)
}
