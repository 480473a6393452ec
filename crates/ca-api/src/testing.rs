//! Throw-away servers and credential fixtures for adapter tests.
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use ca_core::{AgentError, AgentResult, CredentialCache, CredentialCacheConfig, TokenIssuer};

/// Serves `router` on an ephemeral local port; returns its base URL with a trailing slash.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/")
}

struct Unavailable;

#[async_trait]
impl TokenIssuer for Unavailable {
    async fn issue(&self, _identity: &str) -> AgentResult<String> {
        Err(AgentError::Authentication("issuer unavailable".into()))
    }
}

/// Cache that always hands out `token`.
pub fn fixed_credentials(token: &str) -> Arc<CredentialCache> {
    Arc::new(CredentialCache::new(
        Arc::new(Unavailable),
        CredentialCacheConfig::default().with_static_token(Some(token.to_string())),
    ))
}

/// Cache whose issuer always fails.
pub fn failing_credentials() -> Arc<CredentialCache> {
    Arc::new(CredentialCache::new(
        Arc::new(Unavailable),
        CredentialCacheConfig::default(),
    ))
}
