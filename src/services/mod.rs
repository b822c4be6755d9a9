pub mod adjustments;
pub mod catalog;
pub mod production;
pub mod reports;
pub mod sequences;
pub mod stock_ledger;
pub mod transfers;
pub mod workflow_policy;

pub use adjustments::AdjustmentService;
pub use production::ProductionService;
pub use reports::ReportService;
pub use transfers::TransferService;
