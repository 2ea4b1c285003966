use std::sync::Arc;

use axum::Router;
use leadbridge_core::rfq::{QuotationPolicy, RandomQuotationNumbers};
use leadbridge_crm::{AttachmentPublisher, LeadRepository, LeadSettings};

use crate::bootstrap::Application;
use crate::health::{self, HealthState};
use crate::leads::{self, LeadState};
use crate::quotation::QuotationService;
use crate::rfq::{self, RfqState};

/// Every HTTP route the server exposes, wired to one shared CRM gateway.
pub fn router(app: &Application) -> Router {
    let lead_repository =
        LeadRepository::new(Arc::clone(&app.gateway), LeadSettings::from(&app.config.crm));
    let publisher =
        AttachmentPublisher::new(Arc::clone(&app.gateway), app.config.crm.lead_model.clone());
    let service = QuotationService::new(
        lead_repository.clone(),
        publisher,
        Arc::clone(&app.generator),
        QuotationPolicy::from(&app.config.quotation),
        Arc::new(RandomQuotationNumbers),
    );

    Router::new()
        .merge(rfq::router(RfqState {
            service: Arc::new(service),
            generator: Arc::clone(&app.generator),
            notifier: app.notifier.clone(),
        }))
        .merge(leads::router(LeadState { leads: lead_repository }))
        .merge(health::router(HealthState {
            gateway: Arc::clone(&app.gateway),
            converter: app.generator.converter(),
        }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use leadbridge_core::config::AppConfig;
    use leadbridge_crm::{CrmGateway, InMemoryCrm, RecordValues};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::router;
    use crate::bootstrap::Application;
    use crate::pdf::testing::FakeConverter;
    use crate::pdf::{load_templates, PdfGenerator};

    fn application(crm: Arc<InMemoryCrm>) -> Application {
        let tera = load_templates(None).expect("templates");
        let converter = Arc::new(FakeConverter::default());
        let gateway: Arc<dyn CrmGateway> = crm;
        Application {
            config: AppConfig::default(),
            gateway,
            generator: Arc::new(PdfGenerator::new(tera, converter, "Leadbridge")),
            notifier: None,
        }
    }

    #[tokio::test]
    async fn submit_rfq_round_trip_over_http() {
        let crm = Arc::new(InMemoryCrm::new());
        let lead = crm.insert("crm.lead", RecordValues::new()).await;
        let body = format!(
            "lead_id={lead}&project_name=Solar+Roof&field_name%5B%5D=Panels\
             &field_value%5B%5D=400W&quantity%5B%5D=2&unit_price%5B%5D=10.00"
        );

        let response = router(&application(crm.clone()))
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/submit-rfq")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let number = response.headers()["x-quotation-number"].to_str().expect("ascii").to_string();
        assert!(number.starts_with("QT-"));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert!(bytes.starts_with(b"%PDF-FAKE"));
        assert_eq!(crm.records("ir.attachment").await.len(), 1);
    }

    #[tokio::test]
    async fn invalid_submission_returns_json_error() {
        let response = router(&application(Arc::new(InMemoryCrm::new())))
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/submit-rfq")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("lead_id=abc"))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["status"], "error");
        assert!(body["correlation_id"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test]
    async fn health_and_liveness_are_routed() {
        let app = router(&application(Arc::new(InMemoryCrm::new())));

        let health = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(health.status(), StatusCode::OK);

        let root =
            app.oneshot(Request::builder().uri("/").body(Body::empty()).expect("request")).await;
        assert_eq!(root.expect("response").status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rfq_form_page_is_html() {
        let response = router(&application(Arc::new(InMemoryCrm::new())))
            .oneshot(
                Request::builder()
                    .uri("/rfq/7?project_name=Solar%20Roof")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let html = String::from_utf8(bytes.to_vec()).expect("utf-8");
        assert!(html.contains("value=\"Solar Roof\""));
    }
}
