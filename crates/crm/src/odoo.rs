//! Odoo external API over JSON-RPC.
//!
//! Calls go to `{url}/jsonrpc` as `common.authenticate` or `object.execute_kw`. The
//! uid obtained at login is cached; when the server answers that the session is no
//! longer valid the client logs in again and replays the call once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use leadbridge_core::config::CrmConfig;
use leadbridge_core::domain::record::RecordId;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::gateway::{ChatterMessage, CrmError, CrmGateway, RecordValues};
use crate::query::SearchDomain;

const SESSION_EXPIRED_CODE: i64 = 100;

#[derive(Clone, Debug)]
pub struct OdooSettings {
    pub url: String,
    pub database: String,
    pub username: String,
    pub password: SecretString,
    pub timeout_secs: u64,
}

impl From<&CrmConfig> for OdooSettings {
    fn from(config: &CrmConfig) -> Self {
        Self {
            url: config.url.clone(),
            database: config.database.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

pub struct OdooClient {
    http: Client,
    endpoint: String,
    settings: OdooSettings,
    uid: RwLock<Option<i64>>,
    next_request_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<RpcErrorData>,
}

#[derive(Debug, Default, Deserialize)]
struct RpcErrorData {
    #[serde(default)]
    name: String,
    #[serde(default)]
    message: String,
}

impl OdooClient {
    pub fn new(settings: OdooSettings) -> Result<Self, CrmError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|error| CrmError::Transport(error.to_string()))?;
        let endpoint = format!("{}/jsonrpc", settings.url.trim_end_matches('/'));

        Ok(Self {
            http,
            endpoint,
            settings,
            uid: RwLock::new(None),
            next_request_id: AtomicU64::new(1),
        })
    }

    pub fn from_config(config: &CrmConfig) -> Result<Self, CrmError> {
        Self::new(OdooSettings::from(config))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(&self, service: &str, method: &str, args: Value) -> Result<Value, CrmError> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "method": "call",
            "params": { "service": service, "method": method, "args": args },
            "id": request_id,
        });

        let response =
            self.http.post(&self.endpoint).json(&payload).send().await.map_err(|error| {
                if error.is_timeout() {
                    CrmError::Timeout(self.settings.timeout_secs)
                } else {
                    CrmError::Transport(error.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrmError::Transport(format!("crm endpoint returned HTTP {status}")));
        }

        let body: RpcResponse = response.json().await.map_err(|error| {
            if error.is_timeout() {
                CrmError::Timeout(self.settings.timeout_secs)
            } else {
                CrmError::Decode(error.to_string())
            }
        })?;

        match body.error {
            Some(error) => Err(classify_error(error)),
            None => Ok(body.result.unwrap_or(Value::Null)),
        }
    }

    async fn login(&self) -> Result<i64, CrmError> {
        let result = self
            .call(
                "common",
                "authenticate",
                json!([
                    self.settings.database,
                    self.settings.username,
                    self.settings.password.expose_secret(),
                    {}
                ]),
            )
            .await?;

        // Odoo answers `false` rather than an error for bad credentials.
        let uid = result.as_i64().filter(|uid| *uid > 0).ok_or(CrmError::Authentication)?;
        *self.uid.write().await = Some(uid);
        info!(
            event_name = "crm.session.authenticated",
            database = %self.settings.database,
            username = %self.settings.username,
            uid,
            "crm session established"
        );
        Ok(uid)
    }

    async fn session_uid(&self) -> Result<i64, CrmError> {
        if let Some(uid) = *self.uid.read().await {
            return Ok(uid);
        }
        self.login().await
    }

    async fn execute_as(
        &self,
        uid: i64,
        model: &str,
        method: &str,
        args: &Value,
        kwargs: &Value,
    ) -> Result<Value, CrmError> {
        debug!(event_name = "crm.call", model, method, "execute_kw");
        self.call(
            "object",
            "execute_kw",
            json!([
                self.settings.database,
                uid,
                self.settings.password.expose_secret(),
                model,
                method,
                args,
                kwargs
            ]),
        )
        .await
    }

    async fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Value,
        kwargs: Value,
    ) -> Result<Value, CrmError> {
        let uid = self.session_uid().await?;
        match self.execute_as(uid, model, method, &args, &kwargs).await {
            Err(error) if error.is_session_expired() => {
                warn!(
                    event_name = "crm.session.expired",
                    model,
                    method,
                    error = %error,
                    "crm session rejected, logging in again"
                );
                *self.uid.write().await = None;
                let uid = self.login().await?;
                self.execute_as(uid, model, method, &args, &kwargs).await
            }
            result => result,
        }
    }
}

#[async_trait]
impl CrmGateway for OdooClient {
    async fn authenticate(&self) -> Result<i64, CrmError> {
        self.login().await
    }

    async fn search(
        &self,
        model: &str,
        domain: &SearchDomain,
        limit: Option<u32>,
    ) -> Result<Vec<RecordId>, CrmError> {
        let kwargs = match limit {
            Some(limit) => json!({ "limit": limit }),
            None => json!({}),
        };
        let result = self.execute_kw(model, "search", json!([domain]), kwargs).await?;
        decode_ids(result)
    }

    async fn read(
        &self,
        model: &str,
        ids: &[RecordId],
        fields: &[&str],
    ) -> Result<Vec<RecordValues>, CrmError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let kwargs = if fields.is_empty() { json!({}) } else { json!({ "fields": fields }) };
        let result = self.execute_kw(model, "read", json!([ids]), kwargs).await?;

        match result {
            Value::Array(rows) => rows
                .into_iter()
                .map(|row| match row {
                    Value::Object(values) => Ok(values),
                    other => {
                        Err(CrmError::Decode(format!("expected a record object, got {other}")))
                    }
                })
                .collect(),
            other => Err(CrmError::Decode(format!("expected a list of records, got {other}"))),
        }
    }

    async fn create(&self, model: &str, values: RecordValues) -> Result<RecordId, CrmError> {
        let result = self.execute_kw(model, "create", json!([values]), json!({})).await?;
        decode_single_id(result).map(RecordId)
    }

    async fn write(
        &self,
        model: &str,
        ids: &[RecordId],
        values: RecordValues,
    ) -> Result<bool, CrmError> {
        let result = self.execute_kw(model, "write", json!([ids, values]), json!({})).await?;
        result
            .as_bool()
            .ok_or_else(|| CrmError::Decode(format!("expected a boolean from write, got {result}")))
    }

    async fn message_post(
        &self,
        model: &str,
        id: RecordId,
        message: &ChatterMessage,
    ) -> Result<i64, CrmError> {
        let kwargs = serde_json::to_value(message)
            .map_err(|error| CrmError::Decode(error.to_string()))?;
        let result = self.execute_kw(model, "message_post", json!([[id]]), kwargs).await?;
        decode_single_id(result)
    }
}

fn classify_error(error: RpcError) -> CrmError {
    let data = error.data.unwrap_or_default();
    let message = if data.message.is_empty() { error.message } else { data.message };
    let session_rejected = error.code == SESSION_EXPIRED_CODE
        || data.name.ends_with("SessionExpiredException")
        || data.name.ends_with("AccessDenied");

    if session_rejected {
        CrmError::SessionExpired(message)
    } else {
        CrmError::Remote { code: error.code, message }
    }
}

fn decode_ids(value: Value) -> Result<Vec<RecordId>, CrmError> {
    let Value::Array(items) = value else {
        return Err(CrmError::Decode(format!("expected a list of ids, got {value}")));
    };
    items
        .into_iter()
        .map(|item| {
            item.as_i64()
                .map(RecordId)
                .ok_or_else(|| CrmError::Decode(format!("expected an integer id, got {item}")))
        })
        .collect()
}

/// Accepts `7` or `[7]`; Odoo returns either depending on how the method was called.
fn decode_single_id(value: Value) -> Result<i64, CrmError> {
    let id = match &value {
        Value::Number(number) => number.as_i64(),
        Value::Array(items) if items.len() == 1 => items[0].as_i64(),
        _ => None,
    };
    id.ok_or_else(|| CrmError::Decode(format!("expected a single id, got {value}")))
}
