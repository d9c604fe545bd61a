// src/main.rs
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warehouse_layout::config::{load_config, Config, LogFormat, StorageBackend};
use warehouse_layout::engine::LayoutEngine;
use warehouse_layout::handlers::configure_routes;
use warehouse_layout::store::{
    FileKeyValueStore, LocalWarehouseStore, MemoryKeyValueStore, SqliteWarehouseStore, WarehouseStore,
};
use warehouse_layout::{db, sync, AppState};

// ==================== MAIN ====================

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (this calls load_env_file internally)
    let config = load_config()?;

    setup_logging(&config)?;
    config.print_startup_info();

    let store = build_store(&config).await?;

    // Hydrate the engine; an empty namespace gets the default warehouse
    let snapshot = store
        .load_warehouses()
        .await
        .context("Failed to load warehouses")?;
    let mut engine = LayoutEngine::new(config.layout.clone());
    if let Some(seeded) = engine.hydrate(snapshot) {
        store
            .save_warehouse(&seeded)
            .await
            .context("Failed to persist the default warehouse")?;
        log::info!("Seeded default warehouse '{}'", seeded.name);
    }
    log::info!("Loaded {} warehouse(s)", engine.warehouses().len());

    let app_state = Arc::new(AppState::new(engine, store, config.clone()));

    if config.storage.realtime_sync {
        tokio::spawn(sync::run_realtime_sync(app_state.clone()));
    }

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    log::info!("Starting server at http://{}", bind_address);

    let server_config = config.clone();
    let mut server = HttpServer::new(move || {
        let cors = setup_cors(&server_config.security.allowed_origins);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().limit(server_config.security.max_request_size))
            .configure(configure_routes)
    })
    .keep_alive(Duration::from_secs(config.server.keep_alive));

    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }

    server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run()
        .await?;

    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn WarehouseStore>> {
    let storage = &config.storage;
    let store: Arc<dyn WarehouseStore> = match storage.backend {
        StorageBackend::Sqlite => {
            db::setup_database(&storage.database_url).await?;
            let pool = db::create_database_pool(storage).await?;
            db::run_migrations(&pool).await?;
            Arc::new(SqliteWarehouseStore::new(pool, &storage.namespace).await?)
        }
        StorageBackend::File => Arc::new(
            LocalWarehouseStore::open(
                FileKeyValueStore::new(&storage.data_dir),
                &storage.storage_key,
                &storage.namespace,
            )
            .with_context(|| format!("Failed to open storage in {}", storage.data_dir))?,
        ),
        StorageBackend::Memory => Arc::new(LocalWarehouseStore::open(
            MemoryKeyValueStore::new(),
            &storage.storage_key,
            &storage.namespace,
        )?),
    };
    Ok(store)
}

pub fn setup_cors(allowed_origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers(vec![header::CONTENT_LENGTH])
        .max_age(3600);

    if allowed_origins.iter().any(|o| o == "*") {
        log::warn!("⚠️  Using wildcard CORS (*)");
        cors = cors.allow_any_origin();
    } else {
        for origin in allowed_origins.iter().filter(|o| !o.is_empty()) {
            cors = cors.allowed_origin(origin);
        }
    }
    cors
}

fn setup_logging(config: &Config) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Compact => registry.with(tracing_subscriber::fmt::layer().compact()).try_init(),
    }
    .context("Failed to install tracing subscriber")?;

    Ok(())
}
