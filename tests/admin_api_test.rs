use std::sync::Arc;

use actix_web::{http::StatusCode, test, web, App};
use license_server::handlers;
use license_server::middleware::ADMIN_KEY_HEADER;
use license_server::security::PayloadScheme;
use license_server::services::MemoryLicenseStore;
use license_server::state::AppState;

mod common;
use common::{app_state, expiration_2030, license, signed_body, test_config, ADMIN_KEY};

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(App::new().app_data($state).configure(handlers::configure)).await
    };
}

/// Status of a request the admin gate may reject before any handler runs
macro_rules! admin_status {
    ($app:expr, $req:expr) => {{
        match test::try_call_service(&$app, $req).await {
            Ok(resp) => resp.status(),
            Err(err) => err.as_response_error().status_code(),
        }
    }};
}

fn register_body(device_id: &str) -> serde_json::Value {
    serde_json::json!({
        "device_id": device_id,
        "empresa": {
            "codigoEmpresa": "CDE-9",
            "razonSocial": "Nueva Empresa, S.A.",
            "nit": "987654-3"
        },
        "expirationDate": "2030-01-01T00:00:00Z",
        "features": ["export", " reports ", "export"]
    })
}

#[actix_web::test]
async fn test_admin_routes_require_key() {
    let app = init_app!(app_state(vec![], PayloadScheme::V2));

    let req = test::TestRequest::get().uri("/api/licenses").to_request();
    assert_eq!(admin_status!(app, req), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/stats")
        .insert_header((ADMIN_KEY_HEADER, "wrong-key"))
        .to_request();
    assert_eq!(admin_status!(app, req), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/register")
        .set_json(register_body("DEV-9"))
        .to_request();
    assert_eq!(admin_status!(app, req), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_admin_routes_closed_without_configured_key() {
    let mut config = test_config(PayloadScheme::V2);
    config.admin_api_key = None;
    let state = AppState::build(&config, Arc::new(MemoryLicenseStore::new())).unwrap();
    let app = init_app!(web::Data::new(state));

    let req = test::TestRequest::get()
        .uri("/api/licenses")
        .insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
        .to_request();
    assert_eq!(admin_status!(app, req), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_key_accepted_from_query_parameter() {
    let app = init_app!(app_state(vec![], PayloadScheme::V2));

    let req = test::TestRequest::get()
        .uri(&format!("/api/stats?api_key={}", ADMIN_KEY))
        .to_request();
    assert_eq!(admin_status!(app, req), StatusCode::OK);
}

#[actix_web::test]
async fn test_registered_device_can_validate() {
    let app = init_app!(app_state(vec![], PayloadScheme::V2));

    let req = test::TestRequest::post()
        .uri("/api/register")
        .insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
        .set_json(register_body("DEV-9"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["device_id"], "DEV-9");

    let req = test::TestRequest::post()
        .uri("/api/validate")
        .set_json(signed_body("DEV-9"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert!(json["licenseString"]
        .as_str()
        .unwrap()
        .starts_with("DEV-9|2030-01-01T00:00:00.000Z|export,reports|"));
}

#[actix_web::test]
async fn test_register_rejects_separator_characters() {
    let app = init_app!(app_state(vec![], PayloadScheme::V2));

    let mut bad_device = register_body("DEV|9");
    bad_device["features"] = serde_json::json!(["export"]);
    let mut bad_feature = register_body("DEV-9");
    bad_feature["features"] = serde_json::json!(["export,import"]);

    for body in [bad_device, bad_feature] {
        let req = test::TestRequest::post()
            .uri("/api/register")
            .insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json: serde_json::Value = test::read_body_json(resp).await;
        assert!(json["error"].is_string());
    }
}

#[actix_web::test]
async fn test_malformed_admin_body_gets_json_error() {
    let app = init_app!(app_state(vec![], PayloadScheme::V2));

    let mut date_only = register_body("DEV-9");
    date_only["expirationDate"] = serde_json::json!("2030-01-01");
    let req = test::TestRequest::post()
        .uri("/api/register")
        .insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
        .set_json(date_only)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert!(json["error"].as_str().unwrap().starts_with("invalid request"));

    let req = test::TestRequest::post()
        .uri("/api/revoke")
        .insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
        .insert_header(("content-type", "application/json"))
        .set_payload("{ not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert!(json["error"].is_string());
}

#[actix_web::test]
async fn test_revoked_device_is_rejected() {
    let app = init_app!(app_state(
        vec![license("DEV-1", Some(expiration_2030()), true)],
        PayloadScheme::V2
    ));

    let req = test::TestRequest::post()
        .uri("/api/revoke")
        .insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
        .set_json(serde_json::json!({ "device_id": "DEV-1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/validate")
        .set_json(signed_body("DEV-1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(json["code"], "LICENSE_INACTIVE");
}

#[actix_web::test]
async fn test_revoke_unknown_device_not_found() {
    let app = init_app!(app_state(vec![], PayloadScheme::V2));

    let req = test::TestRequest::post()
        .uri("/api/revoke")
        .insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
        .set_json(serde_json::json!({ "device_id": "GHOST" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_list_and_stats() {
    let app = init_app!(app_state(
        vec![
            license("DEV-1", Some(expiration_2030()), true),
            license("DEV-2", None, false),
        ],
        PayloadScheme::V2
    ));

    let req = test::TestRequest::get()
        .uri("/api/licenses")
        .insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = test::read_body_json(resp).await;
    let licenses = json["licenses"].as_array().unwrap();
    assert_eq!(licenses.len(), 2);
    let dev1 = licenses
        .iter()
        .find(|l| l["hardwareID"] == "DEV-1")
        .unwrap();
    assert_eq!(dev1["empresa"], "MiEmpresa, S.A.");
    assert_eq!(dev1["activa"], true);

    let req = test::TestRequest::get()
        .uri("/api/stats")
        .insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["active"], 1);
    assert_eq!(json["inactive"], 1);
    assert_eq!(json["perpetual"], 1);
}
