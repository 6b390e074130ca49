//! HTTP server setup and configuration.

use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::backend::{ChatSession, ImageBackend};
use crate::config::Config;
use crate::upload::MediaHost;

/// Shared application state.
///
/// The chat session is the one piece of cross-request mutable state: it is
/// shared on purpose (conversational memory spans requests) and guarded by a
/// mutex so concurrent script requests serialize their exchanges.
#[derive(Clone)]
pub struct AppState {
    pub image: ImageBackend,
    pub chat: Arc<Mutex<ChatSession>>,
    pub media: MediaHost,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build the state from a config and a shared HTTP client.
    pub fn new(config: Config, http_client: Client) -> Self {
        let image = ImageBackend::new(http_client.clone(), config.image.clone());
        let chat = Arc::new(Mutex::new(ChatSession::new(
            http_client.clone(),
            config.chat.clone(),
        )));
        let media = MediaHost::new(http_client, config.media.clone());

        Self {
            image,
            chat,
            media,
            config: Arc::new(config),
        }
    }
}

/// Create the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate-image", post(handlers::generate_image))
        .route("/api/get-video-script", post(handlers::get_video_script))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();

    // One client shared by all backends. The image call sets its own
    // per-request timeout on top of these defaults.
    let http_client = Client::builder()
        .timeout(Duration::from_secs(120))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let state = AppState::new(config, http_client);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Starting reelforge server");

    axum::serve(listener, app).await?;

    Ok(())
}
