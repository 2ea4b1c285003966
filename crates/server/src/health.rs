use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use leadbridge_crm::CrmGateway;
use serde::Serialize;
use tracing::warn;

use crate::pdf::PdfConverter;

#[derive(Clone)]
pub struct HealthState {
    pub gateway: Arc<dyn CrmGateway>,
    pub converter: Arc<dyn PdfConverter>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub crm: HealthCheck,
    pub renderer: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).route("/", get(liveness)).with_state(state)
}

pub async fn liveness() -> &'static str {
    "leadbridge is running"
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let crm = crm_check(state.gateway.as_ref()).await;
    let renderer = renderer_check(state.converter.as_ref());
    let ready = crm.status == "ready" && renderer.status == "ready";

    if !ready {
        warn!(
            event_name = "system.health.degraded",
            crm = %crm.detail,
            renderer = %renderer.detail,
            "health check degraded"
        );
    }

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "leadbridge-server runtime initialized".to_string(),
        },
        crm,
        renderer,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn crm_check(gateway: &dyn CrmGateway) -> HealthCheck {
    match gateway.authenticate().await {
        Ok(uid) => {
            HealthCheck { status: "ready", detail: format!("crm session active (uid {uid})") }
        }
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("crm login failed: {error}") }
        }
    }
}

fn renderer_check(converter: &dyn PdfConverter) -> HealthCheck {
    let status = if converter.is_available() { "ready" } else { "degraded" };
    HealthCheck { status, detail: converter.describe() }
}
