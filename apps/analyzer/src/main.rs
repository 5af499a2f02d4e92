mod analysis;
mod classifier;
mod config;
mod db;
mod errors;
mod extract;
mod llm_client;
mod models;
mod persistence;
mod report;
mod routes;
mod state;
mod storage;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::pipeline::AnalysisPipeline;
use crate::classifier::{CategoryClassifier, HttpCategoryModel};
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::persistence::PersistenceCoordinator;
use crate::report::PdfReportRenderer;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::postgres::PgDocumentStore;
use crate::storage::s3::S3BlobStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume analyzer v{}", env!("CARGO_PKG_VERSION"));

    // Document store (PostgreSQL)
    let db = create_pool(&config.database_url).await?;
    let documents = Arc::new(PgDocumentStore::new(db));

    // Blob store (S3 / MinIO)
    let s3 = build_s3_client(&config).await;
    let blobs = Arc::new(S3BlobStore::new(s3, config.s3_bucket.clone()));
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Structured inference
    let llm = Arc::new(
        LlmClient::new(config.anthropic_api_key.clone()).context("Failed to build LLM client")?,
    );
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Category classifier
    let model = HttpCategoryModel::new(&config.classifier_url)
        .context("Failed to build classifier client")?;
    let classifier = CategoryClassifier::new(Arc::new(model));
    info!("Category classifier at {}", config.classifier_url);

    let state = AppState {
        pipeline: AnalysisPipeline::new(llm, classifier),
        persistence: PersistenceCoordinator::new(documents, blobs),
        renderer: Arc::new(PdfReportRenderer),
        config: config.clone(),
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
        "analyzer-static",
    );

    let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets by path, not by virtual host
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
