use std::fmt;

use async_trait::async_trait;
use ca_core::{AgentError, AgentResult, TokenIssuer};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::ApiResult;

/// Client-credentials grant parameters.
#[derive(Clone)]
pub struct OidcSettings {
    pub token_url: String,
    pub audience: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for OidcSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OidcSettings")
            .field("token_url", &self.token_url)
            .field("audience", &self.audience)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Obtains the job-management token from the identity provider's token endpoint.
pub struct OidcTokenIssuer {
    http: Client,
    token_url: Url,
    settings: OidcSettings,
}

impl OidcTokenIssuer {
    pub fn new(http: Client, settings: OidcSettings) -> ApiResult<Self> {
        let token_url = Url::parse(settings.token_url.trim())
            .map_err(|e| crate::ApiError::InvalidUrl(format!("{}: {e}", settings.token_url)))?;
        Ok(Self {
            http,
            token_url,
            settings,
        })
    }
}

#[async_trait]
impl TokenIssuer for OidcTokenIssuer {
    /// The identity is ignored; the grant is always for the configured client.
    #[instrument(level = "debug", skip(self), fields(url = %self.token_url))]
    async fn issue(&self, _identity: &str) -> AgentResult<String> {
        let form = [
            ("audience", self.settings.audience.as_str()),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];
        let resp = self
            .http
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| AgentError::Authentication(format!("token request failed: {e}")))?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentError::Authentication(format!(
                "token endpoint returned {status}: {}",
                body.trim()
            )));
        }

        let token: TokenResponse = resp.json().await.map_err(|e| {
            AgentError::Authentication(format!("malformed token response: {e}"))
        })?;
        debug!("issued job-management token");
        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Form, Json, Router, extract::State, http::StatusCode as AxumStatus, routing::post};
    use ca_core::{CredentialCache, CredentialCacheConfig, JobManagementApi};
    use serde_json::{Value, json};
    use std::collections::HashMap;

    use super::*;
    use crate::{JobManagementClient, testing::spawn_server};

    type Forms = Arc<Mutex<Vec<HashMap<String, String>>>>;

    async fn token(
        State(forms): State<Forms>,
        Form(form): Form<HashMap<String, String>>,
    ) -> (AxumStatus, Json<Value>) {
        let ok = form.get("client_secret").map(String::as_str) == Some("s3cret");
        forms.lock().unwrap().push(form);
        if ok {
            (AxumStatus::OK, Json(json!({"access_token": "issued", "token_type": "Bearer"})))
        } else {
            (AxumStatus::FORBIDDEN, Json(json!({"error": "access_denied"})))
        }
    }

    async fn server() -> (String, Forms) {
        let forms = Forms::default();
        let router = Router::new()
            .route("/oauth/token", post(token))
            .with_state(forms.clone());
        (spawn_server(router).await, forms)
    }

    fn settings(base: &str, secret: &str) -> OidcSettings {
        OidcSettings {
            token_url: format!("{base}oauth/token"),
            audience: "https://api.example.com".into(),
            client_id: "agent".into(),
            client_secret: secret.into(),
        }
    }

    #[tokio::test]
    async fn posts_client_credentials_form() {
        let (base, forms) = server().await;
        let issuer = OidcTokenIssuer::new(Client::new(), settings(&base, "s3cret")).unwrap();

        assert_eq!(issuer.issue("cluster-api").await.unwrap(), "issued");

        let form = forms.lock().unwrap()[0].clone();
        assert_eq!(form["grant_type"], "client_credentials");
        assert_eq!(form["client_id"], "agent");
        assert_eq!(form["audience"], "https://api.example.com");
    }

    #[tokio::test]
    async fn refused_grant_is_an_authentication_error() {
        let (base, _) = server().await;
        let issuer = OidcTokenIssuer::new(Client::new(), settings(&base, "wrong")).unwrap();

        match issuer.issue("cluster-api").await {
            Err(AgentError::Authentication(msg)) => assert!(msg.contains("access_denied"), "{msg}"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn debug_hides_secret() {
        let shown = format!("{:?}", settings("http://x/", "s3cret"));
        assert!(!shown.contains("s3cret"));
    }

    #[tokio::test]
    async fn job_client_uses_issued_token() {
        let (base, forms) = server().await;
        let issuer = OidcTokenIssuer::new(Client::new(), settings(&base, "s3cret")).unwrap();
        let credentials = Arc::new(CredentialCache::new(
            Arc::new(issuer),
            CredentialCacheConfig::default(),
        ));

        // The token server has no job routes, so the fetch fails after authenticating.
        let jobs = JobManagementClient::new(Client::new(), &base, credentials).unwrap();
        assert!(matches!(jobs.fetch_pending().await, Err(AgentError::Fetch(_))));
        assert_eq!(forms.lock().unwrap().len(), 1);
    }
}
