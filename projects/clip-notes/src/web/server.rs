use crate::web::api::{get_comments, save_comments};
use crate::web::storage::CommentRepository;
use anyhow::{anyhow, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::{IpAddr, SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub struct AppState {
    pub repository: CommentRepository,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/comments", get(get_comments))
        .route("/api/save-comments", post(save_comments))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the comment API, moving up one port at a time while the
/// requested one is taken.
pub async fn run_server(host: IpAddr, port: u16, comments_root: PathBuf) -> Result<()> {
    let mut current_port = port;
    let listener = loop {
        let addr = SocketAddr::new(host, current_port);
        match TcpListener::bind(addr) {
            Ok(listener) => {
                // Tokio requires non-blocking std listeners
                listener.set_nonblocking(true)?;
                info!("Successfully bound to {}", addr);
                break listener;
            }
            Err(e) => {
                warn!("Failed to bind to {}: {}. Trying next port...", addr, e);
                current_port = current_port
                    .checked_add(1)
                    .ok_or_else(|| anyhow!("No available ports found"))?;
            }
        }
    };

    info!("Storing comments under {:?}", comments_root);
    let state = Arc::new(AppState {
        repository: CommentRepository::new(comments_root),
    });
    let app = build_router(state);

    let tokio_listener = tokio::net::TcpListener::from_std(listener)?;
    info!(
        "Clip Notes server started on http://{}",
        tokio_listener.local_addr()?
    );

    axum::serve(tokio_listener, app).await?;

    Ok(())
}
