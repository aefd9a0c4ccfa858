use actix_cors::Cors;
use actix_web::{middleware::NormalizePath, App, HttpServer};
use blog_service::app::{self, AppState};
use blog_service::config::{Config, LogFormat, StorageBackend};
use blog_service::middleware::IdentityMiddleware;
use blog_service::store::{PgStore, Stores};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn build_cors(allowed_origins: &str) -> Cors {
    let mut cors = Cors::default();
    for origin in allowed_origins.split(',') {
        let origin = origin.trim();
        if origin.is_empty() {
            continue;
        }
        if origin == "*" {
            cors = cors.allow_any_origin();
        } else {
            cors = cors.allowed_origin(origin);
        }
    }
    cors.allow_any_method().allow_any_header().max_age(3600)
}

/// Blog Service
///
/// Posts, comments, groups and follows over `/api/v1`.
#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenvy::dotenv();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.log_format);

    tracing::info!("Starting blog-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let stores = match config.storage {
        StorageBackend::Postgres => {
            let store = match PgStore::connect(&config.database).await {
                Ok(store) => store,
                Err(e) => {
                    tracing::error!("Database pool creation failed: {:#}", e);
                    std::process::exit(1);
                }
            };
            if let Err(e) = store.migrate().await {
                tracing::error!("Database migration failed: {:#}", e);
                std::process::exit(1);
            }
            tracing::info!("Connected to PostgreSQL and applied migrations");
            Stores::postgres(store)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Stores::memory()
        }
    };

    let state = AppState::new(stores, config.pagination, config.max_upload_bytes);
    let identity = IdentityMiddleware::new(&config.auth.jwt_secret);
    let allowed_origins = config.cors.allowed_origins.clone();

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(NormalizePath::trim())
            .wrap(build_cors(&allowed_origins))
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(app::configure(state.clone(), identity.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
