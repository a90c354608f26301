mod health;
pub mod license;

use actix_web::web;

use crate::middleware::AdminKeyMiddleware;

pub use health::{health, public_key};
pub use license::{
    admin_json_error, license_stats, list_licenses, register_license, revoke_license,
    validate_json_error, validate_license,
};

/// Register every route; shared by the server binary and the tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/public-key", web::get().to(public_key))
        .service(
            web::resource("/api/validate")
                .app_data(web::JsonConfig::default().error_handler(validate_json_error))
                .route(web::post().to(validate_license)),
        )
        // Administrative routes (static admin key)
        .service(
            web::resource("/api/register")
                .app_data(web::JsonConfig::default().error_handler(admin_json_error))
                .wrap(AdminKeyMiddleware)
                .route(web::post().to(register_license)),
        )
        .service(
            web::resource("/api/revoke")
                .app_data(web::JsonConfig::default().error_handler(admin_json_error))
                .wrap(AdminKeyMiddleware)
                .route(web::post().to(revoke_license)),
        )
        .service(
            web::resource("/api/licenses")
                .wrap(AdminKeyMiddleware)
                .route(web::get().to(list_licenses)),
        )
        .service(
            web::resource("/api/stats")
                .wrap(AdminKeyMiddleware)
                .route(web::get().to(license_stats)),
        );
}
