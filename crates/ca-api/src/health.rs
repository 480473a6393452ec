use std::{future::Future, net::SocketAddr};

use axum::{Router, http::StatusCode, routing::get};
use tracing::info;

/// Routes:
/// - GET /health - 204 while the process is up
pub fn health_router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Serves [`health_router`] on `addr` until `shutdown` resolves.
pub async fn serve_health<F>(addr: SocketAddr, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "health endpoint listening");
    axum::serve(listener, health_router())
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_server;

    #[tokio::test]
    async fn health_returns_no_content() {
        let base = spawn_server(health_router()).await;
        let resp = reqwest::get(format!("{base}health")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);
    }
}
