use crate::error::ApiError;
use crate::models::{HealthResponse, ImagePayload};
use crate::validator::EarValidator;
use actix_web::{web, HttpResponse, Result};
use tracing::info_span;
use uuid::Uuid;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/validate-ear").route(web::post().to(validate_ear)))
        .service(web::resource("/health").route(web::get().to(health)));
}

/// Bodies are parsed as JSON whatever their content type.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .content_type_required(false)
}

pub async fn validate_ear(
    validator: web::Data<EarValidator>,
    payload: web::Json<ImagePayload>,
) -> Result<HttpResponse, ApiError> {
    let span = info_span!("validate_ear", request_id = %Uuid::new_v4());
    let ImagePayload { image_base64 } = payload.into_inner();

    // Decoding and the forward pass are CPU bound; keep them off the async worker.
    let response = web::block(move || {
        let _entered = span.enter();
        validator.validate(&image_base64)
    })
    .await??;

    Ok(HttpResponse::Ok().json(response))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse { status: "ok" })
}
