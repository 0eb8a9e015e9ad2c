pub mod models;
pub mod services;
pub mod workflow;

use models::user::AuthUser;
use services::{report_client::ReportClient, requisition_client::RequisitionClient};
use std::sync::Arc;

/// Shared application state containing service clients and the read-only
/// auth context.
#[derive(Clone)]
pub struct AppState {
    pub requisition_client: Arc<RequisitionClient>,
    pub report_client: Arc<ReportClient>,
    pub auth_user: AuthUser,
}

impl AppState {
    pub fn new(
        requisition_client: Arc<RequisitionClient>,
        report_client: Arc<ReportClient>,
        auth_user: AuthUser,
    ) -> Self {
        Self {
            requisition_client,
            report_client,
            auth_user,
        }
    }
}
