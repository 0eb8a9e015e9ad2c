//! Domain models for the requisition dashboard.

pub mod report;
pub mod requisition;
pub mod stock;
pub mod user;

pub use report::Report;
pub use requisition::{
    Delivery, DeliverySummary, DeliverySummaryItem, ItemStatus, Requisition, RequisitionItem,
    RequisitionStatus,
};
pub use stock::StockLot;
pub use user::{AuthUser, Role};
