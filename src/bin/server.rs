//! Shoply Sync Server
//!
//! Backend for the multi-device shopping-list application: accepts batch
//! pushes of client mutations, answers watermark-based pulls, and turns
//! committed changes into notifications.
//!
//! # Configuration
//!
//! Environment variables:
//! - `SHOPLY_PORT`: Port to listen on (default: 8080)
//! - `SHOPLY_DATABASE_PATH`: SQLite database path (default: <data dir>/shoply/shoply.db)
//!
//! # Config File Format
//!
//! ```yaml
//! port: 8080
//! database_path: /var/lib/shoply/shoply.db
//! event_queue_capacity: 64
//! api_keys:
//!   - key: "your-secret-key-here"
//!     user_id: "7c9e6679-7425-40de-944b-e07fc1f90ae7"
//! ```
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint (no auth required)
//! - `GET /me`: Returns current user profile (auth required)
//! - `GET /shoppingList/updates?date=<unix seconds>`: Pull changes (auth required)
//! - `POST /shoppingList/updates`: Push a mutation batch (auth required)

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shoply::config::Config;
use shoply::db::{init_db, NotificationsRepository};
use shoply::notify::{EventPublisher, GoodsChangeListener, ShareChangeListener};
use shoply::server::{router, ApiKeyStore, AppState};

#[derive(Parser)]
#[command(name = "shoply-server")]
#[command(version)]
#[command(about = "Sync server for the Shoply shopping-list app", long_about = None)]
struct Args {
    /// Path to config file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shoply=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = match Config::load(args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };
    let port = args.port.unwrap_or(config.port);

    tracing::info!("Database: {}", config.database_path.display());

    let pool = match init_db(Some(config.database_path.clone())).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to open database: {e}");
            std::process::exit(1);
        }
    };

    // Long-lived event queues with their listener workers. Listeners
    // persist notification rows; a slow listener backpressures pushes.
    let (publisher, shares_rx, goods_rx) = EventPublisher::channel(config.event_queue_capacity);

    let share_listener = ShareChangeListener::new(NotificationsRepository::new(pool.clone()));
    tokio::spawn(share_listener.run(shares_rx));

    let goods_listener = GoodsChangeListener::new(NotificationsRepository::new(pool.clone()));
    tokio::spawn(goods_listener.run(goods_rx));

    let state = AppState {
        pool,
        publisher,
        api_keys: Arc::new(ApiKeyStore::from_entries(&config.api_keys)),
    };

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
