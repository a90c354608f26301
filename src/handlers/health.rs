use actix_web::{web, HttpResponse, Result};
use serde_json::json;

use crate::state::AppState;

/// Health check endpoint
pub async fn health() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "version": env!("CARGO_PKG_VERSION")
    })))
}

/// PEM public key clients use to verify license signatures
/// GET /public-key
pub async fn public_key(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(state.signer.public_key_pem().to_string())
}
