use async_trait::async_trait;
use leadbridge_core::domain::record::RecordId;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::query::SearchDomain;

/// One CRM row as returned by `read` or sent to `create`/`write`.
pub type RecordValues = Map<String, Value>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CrmError {
    #[error("crm transport error: {0}")]
    Transport(String),
    #[error("crm call timed out after {0}s")]
    Timeout(u64),
    #[error("crm rejected the call ({code}): {message}")]
    Remote { code: i64, message: String },
    #[error("crm session is no longer valid: {0}")]
    SessionExpired(String),
    #[error("unexpected crm response: {0}")]
    Decode(String),
    #[error("crm authentication failed for the configured user")]
    Authentication,
}

impl CrmError {
    /// Errors that a fresh login may cure.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }
}

/// Chatter entry posted on a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatterMessage {
    pub body: String,
    pub message_type: String,
    pub subtype_xmlid: String,
    pub attachment_ids: Vec<i64>,
}

impl ChatterMessage {
    /// Internal note (not emailed to followers) carrying the given attachments.
    pub fn note(body: impl Into<String>, attachment_ids: Vec<i64>) -> Self {
        Self {
            body: body.into(),
            message_type: "comment".to_string(),
            subtype_xmlid: "mail.mt_note".to_string(),
            attachment_ids,
        }
    }
}

#[async_trait]
pub trait CrmGateway: Send + Sync {
    /// Logs in and returns the CRM user id.
    async fn authenticate(&self) -> Result<i64, CrmError>;

    async fn search(
        &self,
        model: &str,
        domain: &SearchDomain,
        limit: Option<u32>,
    ) -> Result<Vec<RecordId>, CrmError>;

    /// Reads `fields` of each id. An empty field list reads every field.
    async fn read(
        &self,
        model: &str,
        ids: &[RecordId],
        fields: &[&str],
    ) -> Result<Vec<RecordValues>, CrmError>;

    async fn create(&self, model: &str, values: RecordValues) -> Result<RecordId, CrmError>;

    async fn write(
        &self,
        model: &str,
        ids: &[RecordId],
        values: RecordValues,
    ) -> Result<bool, CrmError>;

    /// Posts on the record's chatter and returns the message id.
    async fn message_post(
        &self,
        model: &str,
        id: RecordId,
        message: &ChatterMessage,
    ) -> Result<i64, CrmError>;
}
