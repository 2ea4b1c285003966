//! RFQ endpoints:
//! - `POST /submit-rfq`        form submission, answers with the quotation PDF
//! - `GET  /rfq/{lead_id}`     entry form for a lead

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Form, Router};
use leadbridge_core::domain::record::RecordId;
use leadbridge_core::errors::ApplicationError;
use leadbridge_core::rfq::RfqForm;
use serde::Deserialize;
use tracing::{error, info};

use crate::api::{application_error, correlation_id, ApiFailure};
use crate::notify::{OrganizationNotifier, OrganizationPayload};
use crate::pdf::{PdfGenerator, RfqFormPage};
use crate::quotation::QuotationService;

pub const QUOTATION_NUMBER_HEADER: &str = "x-quotation-number";
pub const ATTACHMENT_ID_HEADER: &str = "x-crm-attachment-id";

#[derive(Clone)]
pub struct RfqState {
    pub service: Arc<QuotationService>,
    pub generator: Arc<PdfGenerator>,
    pub notifier: Option<Arc<OrganizationNotifier>>,
}

pub fn router(state: RfqState) -> Router {
    Router::new()
        .route("/submit-rfq", post(submit_rfq))
        .route("/rfq/{lead_id}", get(rfq_form_page))
        .with_state(state)
}

pub async fn submit_rfq(
    State(state): State<RfqState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<(StatusCode, HeaderMap, Vec<u8>), ApiFailure> {
    let correlation_id = correlation_id();
    let form = RfqForm::from_pairs(pairs);

    let outcome = state
        .service
        .submit(form, &correlation_id)
        .await
        .map_err(|error| application_error(error, &correlation_id))?;

    if let Some(notifier) = &state.notifier {
        let payload = OrganizationPayload::from_submission(
            &outcome.submitted_client,
            outcome.document.project(),
        );
        notifier.spawn(payload, correlation_id.clone());
    }

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    let disposition = format!("attachment; filename=\"{}\"", outcome.filename);
    headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).map_err(|header_error| {
            error!(
                event_name = "rfq.response.invalid_header",
                correlation_id = %correlation_id,
                error = %header_error,
                "filename is not a valid header value"
            );
            application_error(
                ApplicationError::Configuration("invalid content disposition".to_string()),
                &correlation_id,
            )
        })?,
    );
    if let Ok(number) = HeaderValue::from_str(outcome.quotation_number.as_str()) {
        headers.insert(HeaderName::from_static(QUOTATION_NUMBER_HEADER), number);
    }
    if let Some(attachment) = outcome.attachment() {
        headers
            .insert(HeaderName::from_static(ATTACHMENT_ID_HEADER), HeaderValue::from(attachment.0));
    }

    info!(
        event_name = "rfq.response.sent",
        correlation_id = %correlation_id,
        record_id = %outcome.record_id,
        quotation_number = %outcome.quotation_number,
        bytes = outcome.pdf_bytes.len(),
        annotated = outcome.annotated,
        "quotation pdf returned"
    );
    Ok((StatusCode::OK, headers, outcome.pdf_bytes))
}

#[derive(Debug, Default, Deserialize)]
pub struct RfqPageQuery {
    pub project_name: Option<String>,
    pub project_description: Option<String>,
    pub project_category: Option<String>,
}

pub async fn rfq_form_page(
    State(state): State<RfqState>,
    Path(lead_id): Path<String>,
    Query(query): Query<RfqPageQuery>,
) -> Result<impl IntoResponse, ApiFailure> {
    let correlation_id = correlation_id();
    let lead = RecordId::parse("lead_id", Some(&lead_id))
        .map_err(|error| application_error(error, &correlation_id))?;

    let page = RfqFormPage {
        lead_id: lead.0,
        project_name: query.project_name.unwrap_or_default(),
        project_description: query.project_description.unwrap_or_default(),
        project_category: query.project_category.unwrap_or_default(),
    };
    let html = state
        .generator
        .render_rfq_form(&page)
        .map_err(|error| application_error(error, &correlation_id))?;
    Ok(Html(html))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::{Path, Query, State};
    use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::Form;
    use leadbridge_core::rfq::{QuotationPolicy, RandomQuotationNumbers};
    use leadbridge_crm::memory::{CrmMethod, InMemoryCrm};
    use leadbridge_crm::{
        AttachmentPublisher, CrmError, LeadRepository, LeadSettings, RecordValues,
    };

    use super::{rfq_form_page, submit_rfq, RfqPageQuery, RfqState, ATTACHMENT_ID_HEADER};
    use crate::pdf::testing::FakeConverter;
    use crate::pdf::{load_templates, PdfGenerator};
    use crate::quotation::QuotationService;

    fn state(crm: Arc<InMemoryCrm>, converter: Arc<FakeConverter>) -> RfqState {
        let tera = load_templates(None).expect("templates");
        let generator = Arc::new(PdfGenerator::new(tera, converter, "Leadbridge"));
        let settings = LeadSettings {
            lead_model: "crm.lead".to_string(),
            default_team_id: 1,
            default_stage: "New".to_string(),
        };
        let service = QuotationService::new(
            LeadRepository::new(crm.clone(), settings),
            AttachmentPublisher::new(crm, "crm.lead"),
            generator.clone(),
            QuotationPolicy::default(),
            Arc::new(RandomQuotationNumbers),
        );
        RfqState { service: Arc::new(service), generator, notifier: None }
    }

    fn pairs(lead_id: &str) -> Form<Vec<(String, String)>> {
        Form(
            [
                ("lead_id", lead_id),
                ("project_name", "Solar Roof"),
                ("field_name[]", "Panels"),
                ("field_value[]", "400W"),
                ("quantity[]", "2"),
                ("unit_price[]", "10"),
            ]
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        )
    }

    #[tokio::test]
    async fn submit_returns_pdf_with_attachment_headers() {
        let crm = Arc::new(InMemoryCrm::new());
        let lead = crm.insert("crm.lead", RecordValues::new()).await;

        let state = state(crm, Arc::new(FakeConverter::default()));

        let (status, headers, body) =
            submit_rfq(State(state), pairs(&lead.to_string())).await.expect("pdf response");

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CONTENT_TYPE], "application/pdf");
        assert_eq!(
            headers[CONTENT_DISPOSITION],
            format!("attachment; filename=\"RFQ_Solar_Roof_{lead}.pdf\"").as_str()
        );
        assert!(headers.contains_key(ATTACHMENT_ID_HEADER));
        assert!(body.starts_with(b"%PDF-FAKE"));
    }

    #[tokio::test]
    async fn attach_failure_keeps_the_pdf_but_drops_the_header() {
        let crm = Arc::new(InMemoryCrm::new());
        let lead = crm.insert("crm.lead", RecordValues::new()).await;
        crm.fail_on("ir.attachment", CrmMethod::Create, CrmError::Timeout(30)).await;

        let state = state(crm, Arc::new(FakeConverter::default()));

        let (status, headers, body) =
            submit_rfq(State(state), pairs(&lead.to_string())).await.expect("pdf response");

        assert_eq!(status, StatusCode::OK);
        assert!(!headers.contains_key(ATTACHMENT_ID_HEADER));
        assert!(!body.is_empty());
    }

    #[tokio::test]
    async fn missing_lead_id_is_a_bad_request() {
        let crm = Arc::new(InMemoryCrm::new());
        let converter = Arc::new(FakeConverter::default());

        let (status, body) = submit_rfq(State(state(crm.clone(), converter.clone())), pairs(""))
            .await
            .expect_err("rejected");

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.0.detail.contains("lead_id"));
        assert_eq!(converter.calls(), 0);
        assert!(crm.calls().await.is_empty());
    }

    #[tokio::test]
    async fn form_page_rejects_non_numeric_lead() {
        let result = rfq_form_page(
            State(state(Arc::new(InMemoryCrm::new()), Arc::new(FakeConverter::default()))),
            Path("abc".to_string()),
            Query(RfqPageQuery::default()),
        )
        .await;

        let (status, _) = result.err().expect("rejected");
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn form_page_renders_html() {
        let response = rfq_form_page(
            State(state(Arc::new(InMemoryCrm::new()), Arc::new(FakeConverter::default()))),
            Path("12".to_string()),
            Query(RfqPageQuery {
                project_name: Some("Solar Roof".to_string()),
                ..RfqPageQuery::default()
            }),
        )
        .await
        .expect("page")
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
