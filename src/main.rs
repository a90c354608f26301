use license_server::config::{Config, StoreBackend};
use license_server::services::{LicenseAdmin, MemoryLicenseStore, MongoLicenseStore};
use license_server::state::AppState;
use license_server::{db, handlers};

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use std::io;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(|e| {
        log::error!("❌ Invalid configuration: {}", e);
        io::Error::other(e)
    })?;

    if config.hmac_secret.len() < 32 {
        log::warn!(
            "⚠️ HMAC_SECRET is only {} bytes; use at least 32",
            config.hmac_secret.len()
        );
    }
    if config.admin_api_key.is_none() {
        log::warn!("⚠️ ADMIN_API_KEY not set, administrative endpoints are disabled");
    }

    let state = match config.store_backend {
        StoreBackend::Memory => {
            let store = match &config.seed_file {
                Some(path) => MemoryLicenseStore::from_seed_file(path).map_err(io::Error::other)?,
                None => MemoryLicenseStore::new(),
            };
            build_state(&config, Arc::new(store))?
        }
        StoreBackend::MongoDb => {
            let database = db::init_db(&config.mongodb_uri, &config.database_name)
                .await
                .map_err(io::Error::other)?;
            let store = MongoLicenseStore::new(&database)
                .await
                .map_err(io::Error::other)?;
            build_state(&config, Arc::new(store))?
        }
    };

    let license_count = state
        .admin
        .stats(chrono::Utc::now())
        .await
        .map(|stats| stats.total)
        .unwrap_or(0);

    log::info!("🚀 Starting license server at {}:{}", config.host, config.port);
    log::info!("📋 HMAC_SECRET length: {}", config.hmac_secret.len());
    log::info!("📋 License store: {} ({} licenses)", config.store_backend.as_str(), license_count);
    log::info!("🔐 Payload encryption: {}", config.payload_scheme);
    log::info!("   Endpoints:");
    log::info!("   GET  /health");
    log::info!("   GET  /public-key");
    log::info!("   POST /api/validate");
    log::info!("   POST /api/register");
    log::info!("   POST /api/revoke");
    log::info!("   GET  /api/licenses");
    log::info!("   GET  /api/stats");

    let state = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

fn build_state<S>(config: &Config, store: Arc<S>) -> io::Result<AppState>
where
    S: LicenseAdmin + 'static,
{
    AppState::build(config, store).map_err(|e| {
        log::error!("❌ Failed to load key material: {}", e);
        io::Error::other(e)
    })
}
