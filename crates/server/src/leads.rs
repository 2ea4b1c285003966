//! Lead endpoints backed by the CRM lead model:
//! - `POST /hubspot_webhook`   lead capture, deduplicated by email
//! - `GET  /project/details`   lead lookup by its project fields
//! - `GET  /lead/won`          whether a won lead exists

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use leadbridge_core::domain::lead::{LeadDraft, LeadFields};
use leadbridge_core::errors::{ApplicationError, ValidationError};
use leadbridge_crm::{CrmError, LeadRepository};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::api::{application_error, correlation_id, ApiFailure};

#[derive(Clone)]
pub struct LeadState {
    pub leads: LeadRepository,
}

pub fn router(state: LeadState) -> Router {
    Router::new()
        .route("/hubspot_webhook", post(lead_webhook))
        .route("/project/details", get(project_details))
        .route("/lead/won", get(won_lead))
        .with_state(state)
}

fn integration_failure(operation: &str, error: CrmError, correlation_id: &str) -> ApiFailure {
    error!(
        event_name = "lead.crm.failed",
        correlation_id,
        operation,
        error = %error,
        "crm call failed"
    );
    application_error(ApplicationError::Integration(error.to_string()), correlation_id)
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookQuery {
    pub lead_type: Option<String>,
}

pub async fn lead_webhook(
    State(state): State<LeadState>,
    Query(query): Query<WebhookQuery>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiFailure> {
    let correlation_id = correlation_id();
    let fields = payload.as_object().map(LeadFields::from_json_object).unwrap_or_default();
    if fields.is_empty() {
        return Err(application_error(ValidationError::EmptyPayload, &correlation_id));
    }

    let draft = LeadDraft::from_fields(&fields, query.lead_type.as_deref());
    let outcome = state
        .leads
        .intake(&draft)
        .await
        .map_err(|crm_error| integration_failure("lead_intake", crm_error, &correlation_id))?;

    info!(
        event_name = "lead.webhook.handled",
        correlation_id = %correlation_id,
        record_id = %outcome.record_id(),
        outcome = outcome.as_str(),
        "lead webhook handled"
    );
    Ok(Json(json!({
        "status": "success",
        "outcome": outcome.as_str(),
        "lead_id": outcome.record_id(),
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectQuery {
    pub project_name: Option<String>,
    pub project_description: Option<String>,
    pub project_category: Option<String>,
}

impl ProjectQuery {
    fn lookup_keys(&self) -> Result<(&str, &str, &str), ValidationError> {
        Ok((
            required(&self.project_name, "project_name")?,
            required(&self.project_description, "project_description")?,
            required(&self.project_category, "project_category")?,
        ))
    }
}

fn required<'a>(
    value: &'a Option<String>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ValidationError::MissingField(field))
}

pub async fn project_details(
    State(state): State<LeadState>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Value>, ApiFailure> {
    let correlation_id = correlation_id();
    let (name, description, category) =
        query.lookup_keys().map_err(|error| application_error(error, &correlation_id))?;

    let project = state
        .leads
        .find_project(name, description, category)
        .await
        .map_err(|crm_error| integration_failure("project_details", crm_error, &correlation_id))?;

    Ok(Json(match project {
        Some(project) => json!({"status": "success", "data": project}),
        None => json!({"status": "not found"}),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct WonLeadQuery {
    pub lead_name: Option<String>,
}

pub async fn won_lead(
    State(state): State<LeadState>,
    Query(query): Query<WonLeadQuery>,
) -> Result<Json<Value>, ApiFailure> {
    let correlation_id = correlation_id();
    let name = query.lead_name.as_deref();
    let found = state
        .leads
        .won_lead_exists(name)
        .await
        .map_err(|crm_error| integration_failure("won_lead", crm_error, &correlation_id))?;

    Ok(Json(if found {
        json!({
            "status": "success",
            "message": format!("Lead {} is won successfully", name.unwrap_or_default().trim()),
        })
    } else {
        json!({"status": "not found", "message": "No won lead found"})
    }))
}
