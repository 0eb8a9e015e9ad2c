//! Partner confirmation of received deliveries.
//!
//! Ownership is checked client-side as defense in depth; the server remains
//! the sole enforcement point. Confirmation is one-shot per delivery: after
//! success the local copy is optimistically patched and no un-confirm path
//! exists. `reconcile` re-fetches the aggregate to repair any drift the
//! optimistic patch may have introduced.

use crate::models::requisition::{Delivery, Requisition};
use crate::models::user::AuthUser;
use crate::services::requisition_client::{ConfirmDeliveryPayload, RequisitionClient};
use chrono::{DateTime, Duration, Utc};
use requisition_core::error::AppError;

/// Transient success banner with a bounded lifetime.
#[derive(Debug, Clone)]
pub struct Banner {
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

const BANNER_LIFETIME_SECONDS: i64 = 5;

pub struct ReceiptSession {
    requisition: Requisition,
    partner: AuthUser,
    banner: Option<Banner>,
    confirming: bool,
}

impl ReceiptSession {
    /// Build the session, refusing requisitions the partner does not own.
    pub fn new(requisition: Requisition, partner: AuthUser) -> Result<Self, AppError> {
        if requisition.partner_id != partner.id {
            return Err(AppError::AccessDenied(
                "This requisition belongs to another partner".to_string(),
            ));
        }

        Ok(Self {
            requisition,
            partner,
            banner: None,
            confirming: false,
        })
    }

    pub fn requisition(&self) -> &Requisition {
        &self.requisition
    }

    /// Deliveries awaiting the partner's confirmation.
    pub fn pending_deliveries(&self) -> Vec<&Delivery> {
        self.requisition
            .items
            .iter()
            .flat_map(|item| item.deliveries.iter())
            .filter(|delivery| !delivery.is_confirmed())
            .collect()
    }

    /// Confirmed deliveries, most recent confirmation first.
    pub fn confirmed_deliveries(&self) -> Vec<&Delivery> {
        let mut confirmed: Vec<&Delivery> = self
            .requisition
            .items
            .iter()
            .flat_map(|item| item.deliveries.iter())
            .filter(|delivery| delivery.is_confirmed())
            .collect();
        confirmed.sort_by(|a, b| b.confirmed_at.cmp(&a.confirmed_at));
        confirmed
    }

    /// Confirm one delivery. Errors are returned to the caller so the
    /// confirmation modal can display them without closing.
    pub async fn confirm(
        &mut self,
        client: &RequisitionClient,
        token: &str,
        delivery_id: &str,
        partner_note: Option<String>,
    ) -> Result<(), AppError> {
        if self.confirming {
            return Err(AppError::SubmissionInFlight);
        }

        let already_confirmed = self
            .requisition
            .items
            .iter()
            .flat_map(|item| item.deliveries.iter())
            .find(|delivery| delivery.id == delivery_id)
            .ok_or_else(|| AppError::NotFound(format!("no delivery {}", delivery_id)))?
            .is_confirmed();
        if already_confirmed {
            return Err(AppError::validation("Delivery is already confirmed"));
        }

        let payload = ConfirmDeliveryPayload {
            partner_note: partner_note.clone(),
        };

        self.confirming = true;
        let result = client.confirm_delivery(token, delivery_id, &payload).await;
        self.confirming = false;

        let confirmed = result?;

        // Optimistic local patch: known-shape change applied in place, no
        // full re-fetch.
        let confirmed_at = confirmed.confirmed_at.unwrap_or_else(Utc::now);
        for item in &mut self.requisition.items {
            if let Some(delivery) = item
                .deliveries
                .iter_mut()
                .find(|delivery| delivery.id == delivery_id)
            {
                delivery.confirmed_at = Some(confirmed_at);
                delivery.confirmed_by = Some(self.partner.name.clone());
                delivery.partner_note = partner_note.clone();
            }
        }

        self.banner = Some(Banner {
            message: "Delivery confirmed".to_string(),
            expires_at: Utc::now() + Duration::seconds(BANNER_LIFETIME_SECONDS),
        });

        tracing::info!(delivery_id = %delivery_id, "delivery confirmed");
        Ok(())
    }

    /// The success banner while it is still within its lifetime; expired
    /// banners are dropped.
    pub fn active_banner(&mut self, now: DateTime<Utc>) -> Option<&Banner> {
        if let Some(banner) = &self.banner {
            if banner.expires_at <= now {
                self.banner = None;
            }
        }
        self.banner.as_ref()
    }

    /// Replace the optimistically patched copy with the server's state.
    pub async fn reconcile(
        &mut self,
        client: &RequisitionClient,
        token: &str,
    ) -> Result<(), AppError> {
        let fresh = client.get(token, &self.requisition.id).await?;
        if fresh.partner_id != self.partner.id {
            return Err(AppError::AccessDenied(
                "This requisition belongs to another partner".to_string(),
            ));
        }
        self.requisition = fresh;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::requisition::{ItemStatus, RequisitionItem, RequisitionStatus};
    use crate::models::user::Role;
    use rust_decimal::Decimal;

    fn delivery(id: &str, confirmed_at: Option<DateTime<Utc>>) -> Delivery {
        Delivery {
            id: id.to_string(),
            qty_delivered: 2,
            delivery_note: None,
            created_at: Utc::now(),
            created_by: "employee-1".to_string(),
            confirmed_at,
            confirmed_by: confirmed_at.map(|_| "partner-1".to_string()),
            partner_note: None,
        }
    }

    fn requisition(partner_id: &str, deliveries: Vec<Delivery>) -> Requisition {
        Requisition {
            id: "req-1".to_string(),
            requisition_number: "RQ-001".to_string(),
            status: RequisitionStatus::PartiallyFulfilled,
            partner_id: partner_id.to_string(),
            partner_note: None,
            approval_summary: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            reviewed_at: Some(Utc::now()),
            items: vec![RequisitionItem {
                id: "item-1".to_string(),
                item_name: "Chair".to_string(),
                note: None,
                qty_requested: 10,
                qty_approved: 8,
                qty_delivered: 4,
                status: ItemStatus::PartiallyFulfilled,
                stock_in_id: Some("lot-1".to_string()),
                unit_price_at_approval: Decimal::from(10),
                price_override: None,
                approval_note: None,
                approved_at: None,
                approver: None,
                deliveries,
            }],
        }
    }

    fn partner(id: &str) -> AuthUser {
        AuthUser {
            id: id.to_string(),
            name: "Acme Partner".to_string(),
            role: Role::Partner,
        }
    }

    #[test]
    fn foreign_requisition_is_access_denied() {
        let result = ReceiptSession::new(requisition("partner-2", vec![]), partner("partner-1"));
        assert!(matches!(result, Err(AppError::AccessDenied(_))));
    }

    #[test]
    fn pending_and_confirmed_sets_are_disjoint() {
        let now = Utc::now();
        let session = ReceiptSession::new(
            requisition(
                "partner-1",
                vec![
                    delivery("d-1", None),
                    delivery("d-2", Some(now - Duration::hours(2))),
                    delivery("d-3", Some(now - Duration::hours(1))),
                ],
            ),
            partner("partner-1"),
        )
        .unwrap();

        let pending: Vec<&str> = session
            .pending_deliveries()
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(pending, vec!["d-1"]);

        // Most recent confirmation first
        let confirmed: Vec<&str> = session
            .confirmed_deliveries()
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(confirmed, vec!["d-3", "d-2"]);
    }

    #[test]
    fn expired_banner_is_dropped() {
        let mut session =
            ReceiptSession::new(requisition("partner-1", vec![]), partner("partner-1")).unwrap();
        session.banner = Some(Banner {
            message: "Delivery confirmed".to_string(),
            expires_at: Utc::now() - Duration::seconds(1),
        });
        assert!(session.active_banner(Utc::now()).is_none());
        assert!(session.banner.is_none());
    }

    #[test]
    fn live_banner_is_returned() {
        let mut session =
            ReceiptSession::new(requisition("partner-1", vec![]), partner("partner-1")).unwrap();
        session.banner = Some(Banner {
            message: "Delivery confirmed".to_string(),
            expires_at: Utc::now() + Duration::seconds(5),
        });
        assert!(session.active_banner(Utc::now()).is_some());
    }
}
