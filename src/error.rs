use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Errors raised while validating a single image.
///
/// None of these are recoverable by the client, so every variant is reported
/// as a server error.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("could not decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("blocking task failed: {0}")]
    Blocking(#[from] BlockingError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        tracing::error!(error = %self, "ear validation failed");
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
