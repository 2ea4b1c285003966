use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use leadbridge_core::domain::record::RecordId;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::gateway::{ChatterMessage, CrmError, CrmGateway, RecordValues};

pub const ATTACHMENT_MODEL: &str = "ir.attachment";
pub const PDF_MIMETYPE: &str = "application/pdf";

/// CRM id of an uploaded attachment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AttachmentRef(pub i64);

impl fmt::Display for AttachmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("could not attach document to {model}({record_id}): {source}")]
pub struct PublishError {
    pub model: String,
    pub record_id: RecordId,
    #[source]
    pub source: CrmError,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("chatter note for attachment {attachment} failed on {model}({record_id}): {source}")]
pub struct AnnotateError {
    pub model: String,
    pub record_id: RecordId,
    pub attachment: AttachmentRef,
    #[source]
    pub source: CrmError,
}

/// Uploads generated documents onto records of one model and notes them in chatter.
#[derive(Clone)]
pub struct AttachmentPublisher {
    gateway: Arc<dyn CrmGateway>,
    res_model: String,
}

impl AttachmentPublisher {
    pub fn new(gateway: Arc<dyn CrmGateway>, res_model: impl Into<String>) -> Self {
        Self { gateway, res_model: res_model.into() }
    }

    pub async fn publish(
        &self,
        bytes: &[u8],
        filename: &str,
        record_id: RecordId,
    ) -> Result<AttachmentRef, PublishError> {
        let mut values = RecordValues::new();
        values.insert("name".to_string(), Value::from(filename));
        values.insert("datas".to_string(), Value::from(STANDARD.encode(bytes)));
        values.insert("res_model".to_string(), Value::from(self.res_model.as_str()));
        values.insert("res_id".to_string(), Value::from(record_id.0));
        values.insert("type".to_string(), Value::from("binary"));
        values.insert("mimetype".to_string(), Value::from(PDF_MIMETYPE));

        self.gateway
            .create(ATTACHMENT_MODEL, values)
            .await
            .map(|id| AttachmentRef(id.0))
            .map_err(|source| PublishError {
                model: self.res_model.clone(),
                record_id,
                source,
            })
    }

    /// Posts `body` as an internal note on the record, linking the attachment.
    pub async fn annotate(
        &self,
        record_id: RecordId,
        attachment: AttachmentRef,
        body: &str,
    ) -> Result<i64, AnnotateError> {
        let message = ChatterMessage::note(body, vec![attachment.0]);
        self.gateway.message_post(&self.res_model, record_id, &message).await.map_err(|source| {
            AnnotateError { model: self.res_model.clone(), record_id, attachment, source }
        })
    }
}
