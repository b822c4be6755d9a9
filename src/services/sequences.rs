//! Per-tenant document number allocation.
//!
//! Numbers must be unique and contiguous under concurrent callers, so the
//! increment is a single atomic `UPDATE ... SET last_no = last_no + 1`
//! executed inside one transaction. The read-back afterwards sees the
//! transaction's own write; concurrent allocators serialize on the row.

use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set, TransactionTrait,
};

use crate::entities::{sequence_counter, SequenceCounter};
use crate::errors::ServiceError;

/// Allocates the next document number for (tenant, doc_type), formatted as
/// `{TYPE}-{:06}` (`TRF-000123`).
pub async fn next_number(
    db: &DatabaseConnection,
    tenant_id: i64,
    doc_type: &str,
) -> Result<String, ServiceError> {
    let seq_type = doc_type.to_ascii_uppercase();

    let txn = db.begin().await.map_err(ServiceError::db_error)?;

    // Seed the counter row at zero on first use.
    let seed = sequence_counter::ActiveModel {
        tenant_id: Set(tenant_id),
        seq_type: Set(seq_type.clone()),
        last_no: Set(0),
    };
    let insert = SequenceCounter::insert(seed)
        .on_conflict(
            OnConflict::columns([
                sequence_counter::Column::TenantId,
                sequence_counter::Column::SeqType,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec(&txn)
        .await;
    match insert {
        Ok(_) | Err(DbErr::RecordNotInserted) => {}
        Err(err) => {
            txn.rollback().await.ok();
            return Err(ServiceError::db_error(err));
        }
    }

    // Atomic increment; no read-modify-write window.
    SequenceCounter::update_many()
        .col_expr(
            sequence_counter::Column::LastNo,
            Expr::col(sequence_counter::Column::LastNo).add(1),
        )
        .filter(sequence_counter::Column::TenantId.eq(tenant_id))
        .filter(sequence_counter::Column::SeqType.eq(seq_type.clone()))
        .exec(&txn)
        .await
        .map_err(ServiceError::db_error)?;

    let counter = SequenceCounter::find_by_id((tenant_id, seq_type.clone()))
        .one(&txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::InternalError(format!(
                "sequence counter missing for tenant {tenant_id} type {seq_type}"
            ))
        })?;

    txn.commit().await.map_err(ServiceError::db_error)?;

    Ok(format_number(&seq_type, counter.last_no))
}

fn format_number(seq_type: &str, number: i64) -> String {
    format!("{seq_type}-{number:06}")
}
