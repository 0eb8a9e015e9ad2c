//! Requisition service client.
//!
//! One method per REST endpoint; payload structs mirror the wire contract in
//! camelCase. Validation here is a last-line check before serialization; the
//! workflow sessions own the user-facing validation.

use super::{expect_success, parse_json};
use crate::models::requisition::{Delivery, DeliverySummary, Requisition};
use requisition_core::config::BackendSettings;
use requisition_core::error::AppError;
use requisition_core::observability::TracedClientExt;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

pub struct RequisitionClient {
    client: Client,
    settings: BackendSettings,
}

impl RequisitionClient {
    pub fn new(settings: BackendSettings) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self { client, settings })
    }

    pub fn base_url(&self) -> &str {
        &self.settings.url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.url, path)
    }

    /// `POST /requisition`
    pub async fn create(
        &self,
        token: &str,
        payload: &RequisitionPayload,
    ) -> Result<Requisition, AppError> {
        payload.validate()?;

        let response = self
            .client
            .traced_post(&self.url("/requisition"))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;

        parse_json(response, "Failed to create requisition").await
    }

    /// `PUT /requisition/:id`
    pub async fn update(
        &self,
        token: &str,
        id: &str,
        payload: &RequisitionPayload,
    ) -> Result<Requisition, AppError> {
        payload.validate()?;

        let response = self
            .client
            .traced_put(&self.url(&format!("/requisition/{}", id)))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;

        parse_json(response, "Failed to update requisition").await
    }

    /// `PUT /requisition/:id/cancel`
    pub async fn cancel(&self, token: &str, id: &str) -> Result<Requisition, AppError> {
        let response = self
            .client
            .traced_put(&self.url(&format!("/requisition/{}/cancel", id)))
            .bearer_auth(token)
            .send()
            .await?;

        parse_json(response, "Failed to cancel requisition").await
    }

    /// `DELETE /requisition/:id`
    pub async fn delete(&self, token: &str, id: &str) -> Result<(), AppError> {
        let response = self
            .client
            .traced_delete(&self.url(&format!("/requisition/{}", id)))
            .bearer_auth(token)
            .send()
            .await?;

        expect_success(response, "Failed to delete requisition").await?;
        Ok(())
    }

    /// `GET /requisition/:id`
    pub async fn get(&self, token: &str, id: &str) -> Result<Requisition, AppError> {
        let response = self
            .client
            .traced_get(&self.url(&format!("/requisition/{}", id)))
            .bearer_auth(token)
            .send()
            .await?;

        parse_json(response, "Failed to load requisition").await
    }

    /// `GET /requisition` — all requisitions (admin/employee).
    pub async fn list(&self, token: &str) -> Result<Vec<Requisition>, AppError> {
        let response = self
            .client
            .traced_get(&self.url("/requisition"))
            .bearer_auth(token)
            .send()
            .await?;

        parse_json(response, "Failed to load requisitions").await
    }

    /// `GET /requisition/my/list` — the authenticated partner's requisitions.
    pub async fn my_list(&self, token: &str) -> Result<Vec<Requisition>, AppError> {
        let response = self
            .client
            .traced_get(&self.url("/requisition/my/list"))
            .bearer_auth(token)
            .send()
            .await?;

        parse_json(response, "Failed to load your requisitions").await
    }

    /// `PUT /requisition/:id/approve`
    pub async fn approve(
        &self,
        token: &str,
        id: &str,
        payload: &ApprovalPayload,
    ) -> Result<Requisition, AppError> {
        payload.validate()?;

        let response = self
            .client
            .traced_put(&self.url(&format!("/requisition/{}/approve", id)))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;

        parse_json(response, "Failed to submit review").await
    }

    /// `PUT /requisition/:id/reject` — reject the whole requisition.
    pub async fn reject(&self, token: &str, id: &str, reason: &str) -> Result<Requisition, AppError> {
        let response = self
            .client
            .traced_put(&self.url(&format!("/requisition/{}/reject", id)))
            .bearer_auth(token)
            .json(&RejectPayload {
                reason: reason.to_string(),
            })
            .send()
            .await?;

        parse_json(response, "Failed to reject requisition").await
    }

    /// `PUT /requisition/:id/deliver`
    pub async fn deliver(
        &self,
        token: &str,
        id: &str,
        payload: &DeliveryPayload,
    ) -> Result<Requisition, AppError> {
        payload.validate()?;

        let response = self
            .client
            .traced_put(&self.url(&format!("/requisition/{}/deliver", id)))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;

        parse_json(response, "Failed to record deliveries").await
    }

    /// `PUT /requisition/item/:id/price` — batch price override, anchored on
    /// the first edited item's id. Applying overrides also advances the
    /// requisition status server-side (override-and-approve is one action).
    pub async fn override_prices(
        &self,
        token: &str,
        item_id: &str,
        payload: &PriceOverridePayload,
    ) -> Result<Requisition, AppError> {
        let response = self
            .client
            .traced_put(&self.url(&format!("/requisition/item/{}/price", item_id)))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;

        parse_json(response, "Failed to save price overrides").await
    }

    /// `PUT /requisition/delivery/:deliveryId/confirm`
    pub async fn confirm_delivery(
        &self,
        token: &str,
        delivery_id: &str,
        payload: &ConfirmDeliveryPayload,
    ) -> Result<Delivery, AppError> {
        let response = self
            .client
            .traced_put(&self.url(&format!("/requisition/delivery/{}/confirm", delivery_id)))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;

        parse_json(response, "Failed to confirm delivery").await
    }

    /// `GET /requisition/:id/delivery-summary`
    pub async fn delivery_summary(
        &self,
        token: &str,
        id: &str,
    ) -> Result<DeliverySummary, AppError> {
        let response = self
            .client
            .traced_get(&self.url(&format!("/requisition/{}/delivery-summary", id)))
            .bearer_auth(token)
            .send()
            .await?;

        parse_json(response, "Failed to load delivery summary").await
    }
}

/// Create/update payload for a requisition.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RequisitionPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_note: Option<String>,
    #[validate(nested)]
    pub items: Vec<RequisitionItemPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RequisitionItemPayload {
    /// Present for persisted rows only; new rows carry no id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[validate(length(min = 1, message = "Item name is required"))]
    pub item_name: String,
    #[validate(range(min = 1, message = "Quantity must be greater than zero"))]
    pub qty_requested: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Tombstone flag: a persisted row marked for removal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalPayload {
    #[validate(nested)]
    pub items: Vec<ApprovalItemPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalItemPayload {
    #[validate(length(min = 1))]
    pub item_id: String,
    /// Zero for rejected items.
    pub qty_approved: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_in_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectPayload {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPayload {
    #[validate(nested)]
    pub deliveries: Vec<DeliveryItemPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryItemPayload {
    #[validate(length(min = 1))]
    pub item_id: String,
    #[validate(range(min = 1, message = "Delivery quantity must be greater than zero"))]
    pub qty_delivered: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceOverridePayload {
    pub items: Vec<PriceOverrideItemPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceOverrideItemPayload {
    pub id: String,
    pub overridden_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmDeliveryPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_payload_omits_absent_fields() {
        let payload = RequisitionItemPayload {
            id: None,
            item_name: "Chair".to_string(),
            qty_requested: 10,
            note: None,
            remove: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"itemName": "Chair", "qtyRequested": 10})
        );
    }

    #[test]
    fn tombstoned_row_serializes_remove_flag() {
        let payload = RequisitionItemPayload {
            id: Some("item-1".to_string()),
            item_name: "Chair".to_string(),
            qty_requested: 10,
            note: None,
            remove: Some(true),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["remove"], serde_json::json!(true));
        assert_eq!(json["id"], serde_json::json!("item-1"));
    }

    #[test]
    fn payload_validation_rejects_zero_quantity() {
        let payload = RequisitionPayload {
            partner_note: None,
            items: vec![RequisitionItemPayload {
                id: None,
                item_name: "Chair".to_string(),
                qty_requested: 0,
                note: None,
                remove: None,
            }],
        };
        assert!(payload.validate().is_err());
    }
}
