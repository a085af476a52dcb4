use crate::config::Environment;
use crate::error::{AppError, ErrorKind};
use crate::models::{ApiBody, ApiResponse};
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{HttpRequest, HttpResponse, web};

/// Fallback for every route that is not registered.
pub async fn invalid_endpoint(req: HttpRequest) -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::failure(
        404,
        ApiBody::error(
            format!("Route ({}) not found", req.path()),
            ErrorKind::InvalidEndpoint,
        ),
    ))
}

/// JSON extractor settings that report unreadable bodies in the standard
/// envelope instead of actix's plain-text errors.
pub fn json_config(environment: Environment) -> web::JsonConfig {
    web::JsonConfig::default().error_handler(move |err, _req| {
        let app_error = classify_payload_error(&err);
        let response = app_error.render(environment);
        InternalError::from_response(err, response).into()
    })
}

fn classify_payload_error(err: &JsonPayloadError) -> AppError {
    match err {
        JsonPayloadError::Deserialize(e) if e.is_eof() => {
            AppError::MissingFields("Request body is empty".to_string())
        }
        JsonPayloadError::Deserialize(e) => {
            AppError::InvalidRequest(format!("Request body is not valid JSON: {e}"))
        }
        JsonPayloadError::ContentType => {
            AppError::InvalidRequest("Content-Type must be application/json".to_string())
        }
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
            AppError::InvalidRequest("Request body is too large".to_string())
        }
        other => AppError::InvalidRequest(other.to_string()),
    }
}
