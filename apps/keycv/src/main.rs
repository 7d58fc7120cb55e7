mod config;
mod db;
mod errors;
mod gateway;
mod identity;
mod models;
mod routes;
mod state;
mod storage;
mod workflow;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::gateway::HttpAnalysisGateway;
use crate::identity::HttpIdentityProvider;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::blob::S3BlobStore;
use crate::storage::postgres::PgRecordStore;
use crate::workflow::accounts::AccountService;
use crate::workflow::controller::SubmissionController;
use crate::workflow::gallery::FeedbackGallery;
use crate::workflow::reconciler::PersistenceReconciler;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting KeyCV v{}", env!("CARGO_PKG_VERSION"));

    // Record store
    let db = create_pool(&config.database_url).await?;
    let records = Arc::new(PgRecordStore::new(db));

    // Blob store
    let s3 = build_s3_client(&config).await;
    let blobs = Arc::new(S3BlobStore::new(s3, config.s3_bucket.clone()));
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Remote services
    let gateway = HttpAnalysisGateway::new(&config.gateway_base_url, config.http_timeout)
        .context("Could not build the analysis gateway client")?;
    info!("Analysis gateway: {}", gateway.endpoint());

    let identity = HttpIdentityProvider::new(
        &config.auth_url,
        config.auth_api_key.clone(),
        config.http_timeout,
    )
    .context("Could not build the identity provider client")?;

    let state = AppState {
        submissions: Arc::new(SubmissionController::new(Arc::new(gateway))),
        reconciler: Arc::new(PersistenceReconciler::new(records.clone(), blobs)),
        accounts: Arc::new(AccountService::new(Arc::new(identity), records.clone())),
        gallery: Arc::new(FeedbackGallery::new(records)),
        upload_limit_bytes: config.upload_limit_bytes,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "keycv-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
