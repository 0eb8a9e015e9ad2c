//! End-to-end workflow test infrastructure.
//!
//! Provides an in-process mock of the backend REST API so the workflow
//! sessions and service clients can be exercised over real HTTP without a
//! running backend. The mock mirrors the wire contract (camelCase JSON,
//! `{ "message": ... }` error bodies) and enforces the same stock and
//! delivery rules the real backend owns.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use dashboard_client::models::report::Report;
use dashboard_client::models::requisition::{
    Delivery, DeliverySummary, DeliverySummaryItem, ItemStatus, Requisition, RequisitionItem,
    RequisitionStatus,
};
use dashboard_client::models::stock::StockLot;
use dashboard_client::models::user::{AuthUser, Role};
use dashboard_client::services::report_client::{ReportClient, ReportPayload};
use dashboard_client::services::requisition_client::{
    ApprovalPayload, ConfirmDeliveryPayload, DeliveryPayload, PriceOverridePayload, RejectPayload,
    RequisitionClient, RequisitionPayload,
};
use requisition_core::config::BackendSettings;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        requisition_core::observability::logging::try_init_tracing("info,workflow_tests=debug");
    });
}

/// Bearer token accepted by the mock backend; it performs no real auth.
pub const TEST_TOKEN: &str = "dev-test-token";

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "message": message.into() })))
}

#[derive(Default)]
struct Store {
    next_id: u64,
    requisitions: HashMap<String, Requisition>,
    lots: HashMap<String, StockLot>,
    reports: Vec<Report>,
}

impl Store {
    fn alloc(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

type SharedStore = Arc<Mutex<Store>>;

/// In-process mock of the backend REST API.
pub struct MockBackend {
    pub addr: SocketAddr,
    state: SharedStore,
}

impl MockBackend {
    pub async fn spawn() -> Self {
        let state: SharedStore = Arc::new(Mutex::new(Store::default()));
        let app = router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock backend listener");
        let addr = listener.local_addr().expect("mock backend has no address");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("mock backend stopped");
        });

        tracing::info!(%addr, "mock backend listening");
        Self { addr, state }
    }

    pub fn settings(&self) -> BackendSettings {
        BackendSettings {
            url: format!("http://{}", self.addr),
            public_url: format!("http://{}", self.addr),
            timeout_seconds: 5,
            service_token: None,
        }
    }

    pub fn requisition_client(&self) -> RequisitionClient {
        RequisitionClient::new(self.settings()).expect("failed to build requisition client")
    }

    pub fn report_client(&self) -> ReportClient {
        ReportClient::new(self.settings()).expect("failed to build report client")
    }

    pub fn seed_lot(&self, lot: StockLot) {
        let mut store = self.state.lock().unwrap();
        store.lots.insert(lot.id.clone(), lot);
    }

    pub fn seed_requisition(&self, requisition: Requisition) {
        let mut store = self.state.lock().unwrap();
        store
            .requisitions
            .insert(requisition.id.clone(), requisition);
    }

    /// Current server-side copy, for assertions.
    pub fn requisition(&self, id: &str) -> Option<Requisition> {
        self.state.lock().unwrap().requisitions.get(id).cloned()
    }
}

/// Common fixture data.
pub mod fixtures {
    use super::*;

    pub fn partner() -> AuthUser {
        AuthUser {
            id: "partner-1".to_string(),
            name: "Acme Partner".to_string(),
            role: Role::Partner,
        }
    }

    pub fn employee() -> AuthUser {
        AuthUser {
            id: "employee-1".to_string(),
            name: "Dana Clerk".to_string(),
            role: Role::Employee,
        }
    }

    pub fn lot(id: &str, item_name: &str, quantity: u32, unit_price: Decimal) -> StockLot {
        StockLot {
            id: id.to_string(),
            item_name: item_name.to_string(),
            quantity,
            unit_price,
            received_at: Some(Utc::now()),
        }
    }
}

fn router(state: SharedStore) -> Router {
    Router::new()
        .route("/requisition", post(create_requisition).get(list_requisitions))
        .route("/requisition/my/list", get(list_requisitions))
        .route(
            "/requisition/:id",
            get(get_requisition)
                .put(update_requisition)
                .delete(delete_requisition),
        )
        .route("/requisition/:id/cancel", put(cancel_requisition))
        .route("/requisition/:id/approve", put(approve_requisition))
        .route("/requisition/:id/reject", put(reject_requisition))
        .route("/requisition/:id/deliver", put(deliver_requisition))
        .route("/requisition/:id/delivery-summary", get(delivery_summary))
        .route("/requisition/item/:id/price", put(override_prices))
        .route("/requisition/delivery/:id/confirm", put(confirm_delivery))
        .route("/reports", post(create_report).get(list_reports))
        .route("/reports/employee", get(employee_reports))
        .route(
            "/reports/:id",
            get(get_report).put(update_report).delete(delete_report),
        )
        .with_state(state)
}

async fn create_requisition(
    State(state): State<SharedStore>,
    Json(payload): Json<RequisitionPayload>,
) -> Result<Json<Requisition>, ApiError> {
    let mut store = state.lock().unwrap();
    let id = store.alloc("req");
    let number = format!("RQ-{:04}", store.next_id);

    let items = payload
        .items
        .iter()
        .filter(|item| item.remove != Some(true))
        .map(|item| {
            let item_id = store.alloc("item");
            RequisitionItem {
                id: item_id,
                item_name: item.item_name.clone(),
                note: item.note.clone(),
                qty_requested: item.qty_requested,
                qty_approved: 0,
                qty_delivered: 0,
                status: ItemStatus::Pending,
                stock_in_id: None,
                unit_price_at_approval: Decimal::ZERO,
                price_override: None,
                approval_note: None,
                approved_at: None,
                approver: None,
                deliveries: vec![],
            }
        })
        .collect();

    let requisition = Requisition {
        id: id.clone(),
        requisition_number: number,
        status: RequisitionStatus::Pending,
        partner_id: "partner-1".to_string(),
        partner_note: payload.partner_note.clone(),
        approval_summary: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        reviewed_at: None,
        items,
    };

    store.requisitions.insert(id, requisition.clone());
    Ok(Json(requisition))
}

async fn update_requisition(
    State(state): State<SharedStore>,
    Path(id): Path<String>,
    Json(payload): Json<RequisitionPayload>,
) -> Result<Json<Requisition>, ApiError> {
    let mut store = state.lock().unwrap();

    let mut new_items = Vec::new();
    for item in &payload.items {
        if item.id.is_none() {
            let item_id = store.alloc("item");
            new_items.push(RequisitionItem {
                id: item_id,
                item_name: item.item_name.clone(),
                note: item.note.clone(),
                qty_requested: item.qty_requested,
                qty_approved: 0,
                qty_delivered: 0,
                status: ItemStatus::Pending,
                stock_in_id: None,
                unit_price_at_approval: Decimal::ZERO,
                price_override: None,
                approval_note: None,
                approved_at: None,
                approver: None,
                deliveries: vec![],
            });
        }
    }

    let requisition = store
        .requisitions
        .get_mut(&id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Requisition not found"))?;

    for entry in &payload.items {
        let entry_id = match &entry.id {
            Some(entry_id) => entry_id,
            None => continue,
        };
        if entry.remove == Some(true) {
            requisition.items.retain(|item| &item.id != entry_id);
            continue;
        }
        if let Some(item) = requisition.items.iter_mut().find(|i| &i.id == entry_id) {
            item.item_name = entry.item_name.clone();
            item.qty_requested = entry.qty_requested;
            item.note = entry.note.clone();
        }
    }
    requisition.items.extend(new_items);
    requisition.partner_note = payload.partner_note.clone();
    requisition.updated_at = Utc::now();

    Ok(Json(requisition.clone()))
}

async fn get_requisition(
    State(state): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<Json<Requisition>, ApiError> {
    let store = state.lock().unwrap();
    store
        .requisitions
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Requisition not found"))
}

async fn list_requisitions(State(state): State<SharedStore>) -> Json<Vec<Requisition>> {
    let store = state.lock().unwrap();
    let mut all: Vec<Requisition> = store.requisitions.values().cloned().collect();
    all.sort_by(|a, b| a.id.cmp(&b.id));
    Json(all)
}

async fn delete_requisition(
    State(state): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.lock().unwrap();
    store
        .requisitions
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Requisition not found"))
}

async fn cancel_requisition(
    State(state): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<Json<Requisition>, ApiError> {
    let mut store = state.lock().unwrap();
    let requisition = store
        .requisitions
        .get_mut(&id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Requisition not found"))?;
    requisition.status = RequisitionStatus::Cancelled;
    requisition.updated_at = Utc::now();
    Ok(Json(requisition.clone()))
}

async fn approve_requisition(
    State(state): State<SharedStore>,
    Path(id): Path<String>,
    Json(payload): Json<ApprovalPayload>,
) -> Result<Json<Requisition>, ApiError> {
    let mut store = state.lock().unwrap();
    let Store {
        requisitions, lots, ..
    } = &mut *store;

    let requisition = requisitions
        .get_mut(&id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Requisition not found"))?;

    for entry in &payload.items {
        let item = requisition
            .items
            .iter_mut()
            .find(|item| item.id == entry.item_id)
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Requisition item not found"))?;

        if entry.qty_approved == 0 {
            item.status = ItemStatus::Rejected;
            item.qty_approved = 0;
            item.stock_in_id = None;
            item.approval_note = entry.approval_note.clone();
            continue;
        }

        let stock_in_id = entry.stock_in_id.as_ref().ok_or_else(|| {
            api_error(StatusCode::UNPROCESSABLE_ENTITY, "A stock lot is required")
        })?;
        let lot = lots.get(stock_in_id).ok_or_else(|| {
            api_error(StatusCode::UNPROCESSABLE_ENTITY, "Stock lot not found")
        })?;
        if entry.qty_approved > lot.quantity {
            return Err(api_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Only {} available in stock", lot.quantity),
            ));
        }

        item.status = ItemStatus::Approved;
        item.qty_approved = entry.qty_approved;
        item.stock_in_id = Some(stock_in_id.clone());
        item.unit_price_at_approval = lot.unit_price;
        item.approval_note = entry.approval_note.clone();
        item.approved_at = Some(Utc::now());
        item.approver = Some("employee-1".to_string());
    }

    let all_rejected = requisition
        .items
        .iter()
        .all(|item| item.status == ItemStatus::Rejected);
    requisition.status = if all_rejected {
        RequisitionStatus::Rejected
    } else {
        RequisitionStatus::Reviewed
    };
    requisition.reviewed_at = Some(Utc::now());
    requisition.updated_at = Utc::now();

    Ok(Json(requisition.clone()))
}

async fn reject_requisition(
    State(state): State<SharedStore>,
    Path(id): Path<String>,
    Json(payload): Json<RejectPayload>,
) -> Result<Json<Requisition>, ApiError> {
    let mut store = state.lock().unwrap();
    let requisition = store
        .requisitions
        .get_mut(&id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Requisition not found"))?;
    requisition.status = RequisitionStatus::Rejected;
    requisition.approval_summary = Some(payload.reason);
    for item in &mut requisition.items {
        item.status = ItemStatus::Rejected;
        item.qty_approved = 0;
    }
    requisition.updated_at = Utc::now();
    Ok(Json(requisition.clone()))
}

async fn deliver_requisition(
    State(state): State<SharedStore>,
    Path(id): Path<String>,
    Json(payload): Json<DeliveryPayload>,
) -> Result<Json<Requisition>, ApiError> {
    let mut store = state.lock().unwrap();

    // Validate every entry before mutating anything
    {
        let requisition = store
            .requisitions
            .get(&id)
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Requisition not found"))?;
        for entry in &payload.deliveries {
            let item = requisition
                .items
                .iter()
                .find(|item| item.id == entry.item_id)
                .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Requisition item not found"))?;
            let gap = item.qty_approved.saturating_sub(item.qty_delivered);
            if entry.qty_delivered > gap {
                return Err(api_error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    format!("Cannot deliver more than {}", gap),
                ));
            }
        }
    }

    for entry in &payload.deliveries {
        let delivery_id = store.alloc("d");
        let requisition = store.requisitions.get_mut(&id).unwrap();
        let item = requisition
            .items
            .iter_mut()
            .find(|item| item.id == entry.item_id)
            .unwrap();

        item.qty_delivered += entry.qty_delivered;
        item.deliveries.push(Delivery {
            id: delivery_id,
            qty_delivered: entry.qty_delivered,
            delivery_note: entry.delivery_note.clone(),
            created_at: Utc::now(),
            created_by: "employee-1".to_string(),
            confirmed_at: None,
            confirmed_by: None,
            partner_note: None,
        });
        item.status = if item.qty_delivered == item.qty_approved {
            ItemStatus::Fulfilled
        } else {
            ItemStatus::PartiallyFulfilled
        };
    }

    let requisition = store.requisitions.get_mut(&id).unwrap();
    let fully_delivered = requisition
        .items
        .iter()
        .filter(|item| item.qty_approved > 0)
        .all(|item| item.remaining_gap() == 0);
    requisition.status = if fully_delivered {
        RequisitionStatus::Fulfilled
    } else {
        RequisitionStatus::PartiallyFulfilled
    };
    requisition.updated_at = Utc::now();

    Ok(Json(requisition.clone()))
}

async fn delivery_summary(
    State(state): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<Json<DeliverySummary>, ApiError> {
    let store = state.lock().unwrap();
    let requisition = store
        .requisitions
        .get(&id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Requisition not found"))?;

    let items = requisition
        .items
        .iter()
        .map(|item| DeliverySummaryItem {
            item_id: item.id.clone(),
            item_name: item.item_name.clone(),
            qty_requested: item.qty_requested,
            qty_approved: item.qty_approved,
            qty_delivered: item.qty_delivered,
            remaining: item.remaining_gap(),
        })
        .collect();

    let deliveries: Vec<&Delivery> = requisition
        .items
        .iter()
        .flat_map(|item| item.deliveries.iter())
        .collect();

    Ok(Json(DeliverySummary {
        requisition_id: requisition.id.clone(),
        items,
        pending_deliveries: deliveries.iter().filter(|d| !d.is_confirmed()).count() as u32,
        confirmed_deliveries: deliveries.iter().filter(|d| d.is_confirmed()).count() as u32,
    }))
}

async fn override_prices(
    State(state): State<SharedStore>,
    Path(_anchor): Path<String>,
    Json(payload): Json<PriceOverridePayload>,
) -> Result<Json<Requisition>, ApiError> {
    let mut store = state.lock().unwrap();
    let mut owner_id = None;

    for entry in &payload.items {
        let requisition = store
            .requisitions
            .values_mut()
            .find(|requisition| requisition.items.iter().any(|item| item.id == entry.id))
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Requisition item not found"))?;

        let item = requisition
            .items
            .iter_mut()
            .find(|item| item.id == entry.id)
            .unwrap();
        if item.qty_delivered > 0 {
            return Err(api_error(
                StatusCode::CONFLICT,
                "Price cannot be changed after delivery has started",
            ));
        }
        if item.qty_approved == 0 {
            return Err(api_error(
                StatusCode::CONFLICT,
                "Price requires an approved quantity",
            ));
        }
        item.price_override = Some(entry.overridden_price);
        owner_id = Some(requisition.id.clone());
    }

    let owner_id =
        owner_id.ok_or_else(|| api_error(StatusCode::UNPROCESSABLE_ENTITY, "No items given"))?;
    let requisition = store.requisitions.get_mut(&owner_id).unwrap();
    // Override-and-approve is one server-side action
    requisition.status = RequisitionStatus::Approved;
    requisition.updated_at = Utc::now();
    Ok(Json(requisition.clone()))
}

async fn confirm_delivery(
    State(state): State<SharedStore>,
    Path(delivery_id): Path<String>,
    Json(payload): Json<ConfirmDeliveryPayload>,
) -> Result<Json<Delivery>, ApiError> {
    let mut store = state.lock().unwrap();

    for requisition in store.requisitions.values_mut() {
        for item in &mut requisition.items {
            if let Some(delivery) = item
                .deliveries
                .iter_mut()
                .find(|delivery| delivery.id == delivery_id)
            {
                if delivery.is_confirmed() {
                    return Err(api_error(
                        StatusCode::CONFLICT,
                        "Delivery is already confirmed",
                    ));
                }
                delivery.confirmed_at = Some(Utc::now());
                delivery.confirmed_by = Some("partner-1".to_string());
                delivery.partner_note = payload.partner_note.clone();
                return Ok(Json(delivery.clone()));
            }
        }
    }

    Err(api_error(StatusCode::NOT_FOUND, "Delivery not found"))
}

async fn create_report(
    State(state): State<SharedStore>,
    Json(payload): Json<ReportPayload>,
) -> Result<Json<Report>, ApiError> {
    let mut store = state.lock().unwrap();
    let id = store.alloc("report");
    let report = Report {
        id,
        title: payload.title.clone(),
        body: payload.body.clone(),
        report_type: payload.report_type.clone(),
        created_at: Utc::now(),
        created_by: "employee-1".to_string(),
    };
    store.reports.push(report.clone());
    Ok(Json(report))
}

async fn list_reports(State(state): State<SharedStore>) -> Json<Vec<Report>> {
    Json(state.lock().unwrap().reports.clone())
}

async fn employee_reports(State(state): State<SharedStore>) -> Json<Vec<Report>> {
    let store = state.lock().unwrap();
    Json(
        store
            .reports
            .iter()
            .filter(|report| report.created_by == "employee-1")
            .cloned()
            .collect(),
    )
}

async fn update_report(
    State(state): State<SharedStore>,
    Path(id): Path<String>,
    Json(payload): Json<ReportPayload>,
) -> Result<Json<Report>, ApiError> {
    let mut store = state.lock().unwrap();
    let report = store
        .reports
        .iter_mut()
        .find(|report| report.id == id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Report not found"))?;
    report.title = payload.title.clone();
    report.body = payload.body.clone();
    report.report_type = payload.report_type.clone();
    Ok(Json(report.clone()))
}

async fn get_report(
    State(state): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<Json<Report>, ApiError> {
    let store = state.lock().unwrap();
    store
        .reports
        .iter()
        .find(|report| report.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Report not found"))
}

async fn delete_report(
    State(state): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.lock().unwrap();
    let before = store.reports.len();
    store.reports.retain(|report| report.id != id);
    if store.reports.len() == before {
        return Err(api_error(StatusCode::NOT_FOUND, "Report not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
