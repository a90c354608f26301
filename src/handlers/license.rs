/// License validation and administration endpoints
use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse};
use chrono::Utc;
use validator::Validate;

use crate::error::{AdminError, ValidationError};
use crate::models::{
    LicenseListItem, LicenseListResponse, RegisterLicenseRequest, RegisterLicenseResponse,
    RevokeLicenseRequest, RevokeLicenseResponse, ValidateErrorResponse, ValidateRequest,
    ValidateResponse,
};
use crate::services::LicenseRegistration;
use crate::state::AppState;

/// Validate a device and issue its signed license
/// POST /api/validate
///
/// Body: `{device_id, timestamp, signature, app_version}` where
/// `signature = hex(HMAC-SHA256(secret, "device_id:timestamp"))`
pub async fn validate_license(
    body: web::Json<ValidateRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ValidationError> {
    log::info!(
        "📥 Validation request for device {} (app version {})",
        body.device_id.as_deref().unwrap_or("<missing>"),
        body.app_version.as_deref().unwrap_or("unknown")
    );

    let issued = state.validator.validate(&body).await.map_err(|e| {
        if e.is_internal() {
            log::error!("💥 Validation failed internally: {}", e);
        }
        e
    })?;

    log::info!("✅ License validated for device: {}", issued.token.hardware_id);

    Ok(HttpResponse::Ok().json(ValidateResponse {
        valid: true,
        license_string: issued.token.to_string(),
        encrypted_data: issued.encrypted_profile.into_string(),
        expires_at: issued.expires_at,
        features: issued.features,
        encryption_scheme: issued.scheme,
    }))
}

/// Malformed JSON on the validate route gets the same `{valid:false}` shape
pub fn validate_json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::warn!("Rejected malformed validation body: {}", err);
    let response = HttpResponse::BadRequest().json(ValidateErrorResponse {
        valid: false,
        error: format!("invalid request body: {}", err),
        code: "INVALID_BODY",
        expired: None,
    });
    actix_web::error::InternalError::from_response(err, response).into()
}

/// Malformed JSON on admin routes gets the `{error}` shape
pub fn admin_json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::warn!("Rejected malformed admin body: {}", err);
    AdminError::InvalidRequest(err.to_string()).into()
}

/// Register or update a device license
/// POST /api/register
pub async fn register_license(
    req: web::Json<RegisterLicenseRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AdminError> {
    req.validate()
        .map_err(|e| AdminError::InvalidRequest(e.to_string()))?;
    let features = req
        .normalized_features()
        .map_err(AdminError::InvalidRequest)?;

    let req = req.into_inner();
    let record = state
        .admin
        .register(LicenseRegistration {
            hardware_id: req.device_id,
            company_profile: req.empresa,
            expiration_date: req.expiration_date,
            features,
        })
        .await?;

    log::info!("✅ License registered: {}", record.hardware_id);

    Ok(HttpResponse::Ok().json(RegisterLicenseResponse {
        success: true,
        message: "License registered".to_string(),
        device_id: record.hardware_id,
    }))
}

/// Deactivate a device license
/// POST /api/revoke
pub async fn revoke_license(
    req: web::Json<RevokeLicenseRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AdminError> {
    req.validate()
        .map_err(|e| AdminError::InvalidRequest(e.to_string()))?;

    if !state.admin.deactivate(&req.device_id).await? {
        return Err(AdminError::NotFound);
    }

    log::warn!("⚠️ License revoked: {}", req.device_id);

    Ok(HttpResponse::Ok().json(RevokeLicenseResponse {
        success: true,
        message: "License revoked".to_string(),
    }))
}

/// List all licenses, newest first
/// GET /api/licenses
pub async fn list_licenses(state: web::Data<AppState>) -> Result<HttpResponse, AdminError> {
    let records = state.admin.list().await?;

    Ok(HttpResponse::Ok().json(LicenseListResponse {
        licenses: records.iter().map(LicenseListItem::from).collect(),
    }))
}

/// Aggregate license counts
/// GET /api/stats
pub async fn license_stats(state: web::Data<AppState>) -> Result<HttpResponse, AdminError> {
    let stats = state.admin.stats(Utc::now()).await?;
    Ok(HttpResponse::Ok().json(stats))
}
