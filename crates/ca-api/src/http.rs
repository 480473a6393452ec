use std::time::Duration;

use reqwest::{Client, Response, Url};

use crate::{ApiError, ApiResult};

#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Whole-request deadline, connect included.
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("cluster-agent/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Shared client for every adapter; connection pools are reused across calls.
pub fn build_client(settings: &HttpSettings) -> ApiResult<Client> {
    Ok(Client::builder()
        .timeout(settings.request_timeout)
        .user_agent(settings.user_agent.clone())
        .build()?)
}

/// Parses an http(s) base URL and makes sure relative joins append to its path.
pub(crate) fn parse_base(url: &str) -> ApiResult<Url> {
    let mut base =
        Url::parse(url.trim()).map_err(|e| ApiError::InvalidUrl(format!("{url}: {e}")))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(ApiError::InvalidUrl(format!("{url}: scheme must be http or https")));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

pub(crate) fn endpoint(base: &Url, path: &str) -> ApiResult<Url> {
    base.join(path.trim_start_matches('/'))
        .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
}

/// Turns a non-2xx response into [`ApiError::Status`] carrying the body.
pub(crate) async fn expect_success(resp: Response) -> ApiResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body: body.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_gets_trailing_slash() {
        let base = parse_base("https://api.example.com/v1").unwrap();
        assert_eq!(
            endpoint(&base, "/jobs/pending").unwrap().as_str(),
            "https://api.example.com/v1/jobs/pending"
        );
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(matches!(parse_base("ftp://x"), Err(ApiError::InvalidUrl(_))));
        assert!(matches!(parse_base("not a url"), Err(ApiError::InvalidUrl(_))));
    }
}
