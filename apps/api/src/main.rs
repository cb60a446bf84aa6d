mod candidates;
mod cli;
mod config;
mod db;
mod errors;
mod evaluation;
mod export;
mod jobs;
mod models;
mod progress;
mod routes;
mod scoring;
mod scoring_client;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::ServeArgs;
use crate::config::{Config, S3Config};
use crate::db::create_pool;
use crate::export::archive::ProfileArchive;
use crate::progress::store::{InMemoryProgressStore, ProgressStore, RedisProgressStore};
use crate::routes::build_router;
use crate::scoring_client::ScoringClient;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // load .env if present; ignore if missing

    // Initialize structured logging; RUST_LOG overrides the crate-level default
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}=info", env!("CARGO_PKG_NAME").replace('-', "_")))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Each command loads the configuration it needs
    cli::run().await
}

pub(crate) async fn serve(config: Config, args: ServeArgs) -> Result<()> {
    info!("Starting ATS API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize scoring client
    let scoring = ScoringClient::new(&config.scoring.api_url, config.scoring.timeout())?;
    info!("Scoring client initialized ({})", scoring.base_url());

    // Progress store: Redis when configured, otherwise process memory
    let progress: Arc<dyn ProgressStore> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            info!("Batch progress published to Redis");
            Arc::new(RedisProgressStore::new(client, config.progress_ttl_secs))
        }
        None => {
            info!("Batch progress kept in memory");
            Arc::new(InMemoryProgressStore::new(Duration::from_secs(
                config.progress_ttl_secs,
            )))
        }
    };

    // Initialize S3 / MinIO archival
    let archive = match &config.s3 {
        Some(s3) => {
            let client = build_s3_client(s3).await;
            info!("Profile archival enabled (bucket: {})", s3.bucket);
            Some(ProfileArchive::new(client, s3.bucket.clone()))
        }
        None => None,
    };

    let state = AppState {
        db,
        scoring,
        progress,
        archive,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let port = args.port.unwrap_or(config.port);
    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(s3: &S3Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &s3.access_key_id,
        &s3.secret_access_key,
        None,
        None,
        "ats-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&s3.endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
