use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::sync::Mutex;
use tower_http::compression::CompressionLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hiddenspots_common::Config;
use hiddenspots_graph::{GraphClient, SpotReader, SpotWriter};

mod assets;
mod rest;
mod service;

use assets::AssetClient;
use service::SpotService;

pub struct AppState {
    pub service: SpotService,
    pub rate_limiter: Mutex<HashMap<IpAddr, Vec<Instant>>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("hiddenspots_api=info".parse()?)
                .add_directive("hiddenspots_graph=info".parse()?),
        )
        .init();

    let config = Config::from_env();

    let client = GraphClient::connect(
        &config.neo4j_uri,
        &config.neo4j_user,
        &config.neo4j_password,
    )
    .await?;
    hiddenspots_graph::migrate::migrate(&client).await?;

    let service = SpotService::new(
        SpotReader::new(client.clone()),
        SpotWriter::new(client),
        AssetClient::new(config.asset_upload_url, config.asset_api_key),
    );

    let state = Arc::new(AppState {
        service,
        rate_limiter: Mutex::new(HashMap::new()),
    });

    let app = Router::new()
        // Health check
        .route("/api/health", get(rest::api_health))
        // Spots
        .route(
            "/api/spots",
            get(rest::api_list_spots).post(rest::api_create_spot),
        )
        .route("/api/spots/nearby", get(rest::api_nearby_spots))
        .route("/api/spots/{id}", get(rest::api_spot_detail))
        .route("/api/spots/{id}/rate", post(rest::api_rate_spot))
        // Comments
        .route(
            "/api/spots/{id}/comments",
            get(rest::api_list_comments).post(rest::api_add_comment),
        )
        .route("/api/comments/{id}", delete(rest::api_delete_comment))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(CompressionLayer::new())
        // Logging layer: method + path + status + latency only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("Hidden Spots API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
