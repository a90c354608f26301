// Common helpers for HTTP-level license server tests
#![allow(dead_code)]

use std::sync::Arc;

use actix_web::web;
use chrono::{DateTime, TimeZone, Utc};
use license_server::config::{Config, StoreBackend};
use license_server::models::{CompanyProfile, LicenseRecord};
use license_server::security::{create_signature, construct_signature_data, PayloadScheme};
use license_server::services::MemoryLicenseStore;
use license_server::state::AppState;

pub const SECRET: &str = "s3cr3t-shared-secret-for-tests-0123456789";
pub const ADMIN_KEY: &str = "admin-key-for-tests";
pub const PRIVATE_PEM: &str = include_str!("../fixtures/test_private_key.pem");
pub const PUBLIC_PEM: &str = include_str!("../fixtures/test_public_key.pem");

/// MongoDB for the live-database tests (`cargo test -- --ignored`)
pub fn mongodb_url() -> String {
    std::env::var("MONGODB_URI").unwrap_or_else(|_| {
        let port = std::env::var("MONGODB_PORT").unwrap_or_else(|_| "27017".to_string());
        format!("mongodb://localhost:{}", port)
    })
}

pub fn test_config(scheme: PayloadScheme) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        hmac_secret: SECRET.to_string(),
        private_key_pem: PRIVATE_PEM.to_string(),
        public_key_pem: Some(PUBLIC_PEM.to_string()),
        admin_api_key: Some(ADMIN_KEY.to_string()),
        payload_scheme: scheme,
        store_backend: StoreBackend::Memory,
        seed_file: None,
        mongodb_uri: String::new(),
        database_name: String::new(),
    }
}

pub fn app_state(records: Vec<LicenseRecord>, scheme: PayloadScheme) -> web::Data<AppState> {
    let store = Arc::new(MemoryLicenseStore::with_records(records));
    web::Data::new(AppState::build(&test_config(scheme), store).expect("fixture keys load"))
}

pub fn expiration_2030() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
}

pub fn profile() -> CompanyProfile {
    CompanyProfile {
        company_code: Some("CDE-123".to_string()),
        legal_name: Some("MiEmpresa, S.A.".to_string()),
        tax_id: Some("123456-7".to_string()),
        trade_name: Some("MiComercio".to_string()),
        fiscal_address: Some("Calle A, Zona 10".to_string()),
        commercial_address: Some("Centro Comercial".to_string()),
        representative_name: Some("Juan Pérez".to_string()),
    }
}

pub fn license(device_id: &str, expiration: Option<DateTime<Utc>>, active: bool) -> LicenseRecord {
    let mut record = LicenseRecord::new(
        device_id.to_string(),
        profile(),
        expiration,
        vec!["export".to_string(), "import".to_string()],
    );
    record.active = active;
    record
}

/// Body a correctly provisioned device would send right now
pub fn signed_body(device_id: &str) -> serde_json::Value {
    let timestamp = Utc::now().timestamp();
    signed_body_at(device_id, timestamp)
}

pub fn signed_body_at(device_id: &str, timestamp: i64) -> serde_json::Value {
    let signature = create_signature(
        &construct_signature_data(device_id, timestamp),
        SECRET.as_bytes(),
    )
    .expect("HMAC accepts the test secret");
    serde_json::json!({
        "device_id": device_id,
        "timestamp": timestamp,
        "signature": signature,
        "app_version": "1.0"
    })
}
