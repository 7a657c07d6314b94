use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::middleware::{ErrorHandlerResponse, ErrorHandlers};
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::model::ModelError;
use crate::web::models::ErrorBody;

/// Everything the chat endpoint can fail with. The `Display` text is the
/// exact message returned to the caller, so provider detail never reaches it.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Message is required")]
    InvalidRequest,

    #[error("Request is too large")]
    PayloadTooLarge,

    #[error("Bedrock access denied. Please check model permissions.")]
    AccessDenied,

    #[error("Too many requests. Please wait a moment and try again.")]
    RateLimited,

    #[error("Invalid request format. Please try again.")]
    InvalidUpstreamPayload,

    #[error("AI service temporarily unavailable. Please try again.")]
    UpstreamUnavailable,

    #[error("Internal server error")]
    UpstreamProtocolError,

    #[error("Internal server error")]
    InternalError,
}

impl From<ModelError> for ChatError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::AccessDenied { .. } => ChatError::AccessDenied,
            ModelError::Throttled { .. } => ChatError::RateLimited,
            ModelError::InvalidPayload { .. } => ChatError::InvalidUpstreamPayload,
            ModelError::Unavailable { .. } | ModelError::Timeout(_) => {
                ChatError::UpstreamUnavailable
            }
            ModelError::Protocol(_) => ChatError::UpstreamProtocolError,
        }
    }
}

impl ResponseError for ChatError {
    fn status_code(&self) -> StatusCode {
        match self {
            ChatError::InvalidRequest => StatusCode::BAD_REQUEST,
            ChatError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

/// Rewrites the body-limit rejection raised by actix's extractors into the
/// usual `{error}` JSON body.
pub fn error_handlers<B: 'static>() -> ErrorHandlers<B> {
    ErrorHandlers::new().handler(StatusCode::PAYLOAD_TOO_LARGE, payload_too_large)
}

fn payload_too_large<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let (req, _) = res.into_parts();
    let res = ServiceResponse::new(req, ChatError::PayloadTooLarge.error_response());
    Ok(ErrorHandlerResponse::Response(res.map_into_right_body()))
}
