//! Report service client.

use super::{expect_success, parse_json};
use crate::models::report::Report;
use requisition_core::config::BackendSettings;
use requisition_core::error::AppError;
use requisition_core::observability::TracedClientExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

pub struct ReportClient {
    client: Client,
    settings: BackendSettings,
}

impl ReportClient {
    pub fn new(settings: BackendSettings) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self { client, settings })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.url, path)
    }

    /// `POST /reports`
    pub async fn create(&self, token: &str, payload: &ReportPayload) -> Result<Report, AppError> {
        payload.validate()?;

        let response = self
            .client
            .traced_post(&self.url("/reports"))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;

        parse_json(response, "Failed to create report").await
    }

    /// `GET /reports`
    pub async fn list(&self, token: &str) -> Result<Vec<Report>, AppError> {
        let response = self
            .client
            .traced_get(&self.url("/reports"))
            .bearer_auth(token)
            .send()
            .await?;

        parse_json(response, "Failed to load reports").await
    }

    /// `GET /reports/:id`
    pub async fn get(&self, token: &str, id: &str) -> Result<Report, AppError> {
        let response = self
            .client
            .traced_get(&self.url(&format!("/reports/{}", id)))
            .bearer_auth(token)
            .send()
            .await?;

        parse_json(response, "Failed to load report").await
    }

    /// `PUT /reports/:id`
    pub async fn update(
        &self,
        token: &str,
        id: &str,
        payload: &ReportPayload,
    ) -> Result<Report, AppError> {
        payload.validate()?;

        let response = self
            .client
            .traced_put(&self.url(&format!("/reports/{}", id)))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;

        parse_json(response, "Failed to update report").await
    }

    /// `DELETE /reports/:id`
    pub async fn delete(&self, token: &str, id: &str) -> Result<(), AppError> {
        let response = self
            .client
            .traced_delete(&self.url(&format!("/reports/{}", id)))
            .bearer_auth(token)
            .send()
            .await?;

        expect_success(response, "Failed to delete report").await?;
        Ok(())
    }

    /// `GET /reports/employee` — reports authored by the current employee.
    pub async fn employee_reports(&self, token: &str) -> Result<Vec<Report>, AppError> {
        let response = self
            .client
            .traced_get(&self.url("/reports/employee"))
            .bearer_auth(token)
            .send()
            .await?;

        parse_json(response, "Failed to load employee reports").await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_type: Option<String>,
}
