use std::time::Duration;

use leadbridge_core::config::NotifyConfig;
use leadbridge_core::domain::client::ClientDetails;
use leadbridge_core::domain::quotation::ProjectInfo;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_EMPLOYEE_BAND: &str = "1-50";

/// Body of the organization-create call made after a quotation is rendered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationPayload {
    pub user_email: String,
    pub user_name: String,
    pub org_name: String,
    pub org_type: String,
    pub org_employees_count: String,
    pub org_description: String,
    pub org_contact_info: String,
}

impl OrganizationPayload {
    /// Built from what the requester typed; absent fields are sent empty.
    pub fn from_submission(client: &ClientDetails, project: &ProjectInfo) -> Self {
        let email = client.email.clone().unwrap_or_default();
        let phone = client.phone.clone().unwrap_or_default();
        Self {
            org_contact_info: format!("Phone: {phone}, Email: {email}"),
            user_email: email,
            user_name: client.name.clone().unwrap_or_default(),
            org_name: project.name.clone().unwrap_or_default(),
            org_type: project.category.clone().unwrap_or_default(),
            org_employees_count: DEFAULT_EMPLOYEE_BAND.to_string(),
            org_description: project.description.clone().unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notifier transport error: {0}")]
    Transport(String),
    #[error("notifier timed out after {0}s")]
    Timeout(u64),
    #[error("notifier rejected the payload with status {0}")]
    Rejected(u16),
}

#[derive(Clone, Debug)]
pub struct OrganizationNotifier {
    http: reqwest::Client,
    url: String,
    timeout_secs: u64,
}

impl OrganizationNotifier {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|error| NotifyError::Transport(error.to_string()))?;
        Ok(Self { http, url: url.into(), timeout_secs })
    }

    /// `None` when no organization endpoint is configured.
    pub fn from_config(config: &NotifyConfig) -> Result<Option<Self>, NotifyError> {
        config
            .organization_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| Self::new(url, config.timeout_secs))
            .transpose()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn notify(&self, payload: &OrganizationPayload) -> Result<(), NotifyError> {
        let response =
            self.http.post(&self.url).json(payload).send().await.map_err(|error| {
                if error.is_timeout() {
                    NotifyError::Timeout(self.timeout_secs)
                } else {
                    NotifyError::Transport(error.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }
        Ok(())
    }

    /// Fire-and-forget: the outcome is only logged.
    pub fn spawn(&self, payload: OrganizationPayload, correlation_id: String) {
        let notifier = self.clone();
        tokio::spawn(async move {
            match notifier.notify(&payload).await {
                Ok(()) => info!(
                    event_name = "notify.organization.sent",
                    correlation_id = %correlation_id,
                    org_name = %payload.org_name,
                    "organization notification delivered"
                ),
                Err(error) => warn!(
                    event_name = "notify.organization.failed",
                    correlation_id = %correlation_id,
                    error = %error,
                    "organization notification failed"
                ),
            }
        });
    }
}
