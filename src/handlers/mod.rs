pub mod adjustments;
pub mod production;
pub mod reports;
pub mod stock;
pub mod transfers;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{AdjustmentService, ProductionService, ReportService, TransferService};

/// Bundle of service handles shared across handlers via app state.
#[derive(Clone)]
pub struct AppServices {
    pub transfers: TransferService,
    pub adjustments: AdjustmentService,
    pub production: ProductionService,
    pub reports: ReportService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            transfers: TransferService::new(db.clone(), event_sender.clone()),
            adjustments: AdjustmentService::new(db.clone(), event_sender.clone()),
            production: ProductionService::new(db.clone(), event_sender),
            reports: ReportService::new(db),
        }
    }
}
