//! HTTP adapters for the agent ports.
//!
//! - [`JobManagementClient`]: job-management service, bearer auth.
//! - [`SlurmrestdClient`]: resource-manager REST API, per-request identity headers.
//! - [`OidcTokenIssuer`]: client-credentials grant for the job-management token.
//! - [`IdentityProviderMapper`]: username lookup through the identity provider.
//! - [`health_router`]: liveness endpoint served by the daemon.
mod error;
pub use error::{ApiError, ApiResult};

mod http;
pub use http::{HttpSettings, build_client};
pub use reqwest::Client as HttpClient;

mod health;
pub use health::{health_router, serve_health};

mod identity;
pub use identity::{IdentityProviderMapper, IdentityProviderSettings};

mod jobs;
pub use jobs::{CLUSTER_API_IDENTITY, JobManagementClient};

mod oidc;
pub use oidc::{OidcSettings, OidcTokenIssuer};

mod slurm;
pub use slurm::{SlurmrestdClient, USER_NAME_HEADER, USER_TOKEN_HEADER};

#[cfg(test)]
mod testing;
