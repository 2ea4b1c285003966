use axum::http::StatusCode;
use axum::Json;
use leadbridge_core::errors::{ApplicationError, InterfaceError};
use serde::Serialize;
use uuid::Uuid;

/// JSON error body shared by every endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub status: &'static str,
    pub error: &'static str,
    pub detail: String,
    pub correlation_id: String,
}

pub type ApiFailure = (StatusCode, Json<ApiError>);

pub fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn error_response(error: InterfaceError) -> ApiFailure {
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ApiError {
        status: "error",
        error: error.user_message(),
        detail: error.message().to_string(),
        correlation_id: error.correlation_id().to_string(),
    };
    (status, Json(body))
}

pub fn application_error(error: impl Into<ApplicationError>, correlation_id: &str) -> ApiFailure {
    error_response(error.into().into_interface(correlation_id))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use leadbridge_core::errors::{ApplicationError, RenderError, ValidationError};

    use super::application_error;

    #[test]
    fn status_codes_follow_the_error_class() {
        let (status, body) = application_error(ValidationError::EmptyPayload, "c-1");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0.detail, "no data found in payload");
        assert_eq!(body.0.correlation_id, "c-1");

        let (status, _) =
            application_error(ApplicationError::Integration("crm down".to_string()), "c-2");
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) = application_error(RenderError::ConverterUnavailable, "c-3");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.0.status, "error");
    }
}
