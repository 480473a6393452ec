pub mod credentials;
pub mod error;
pub mod limiter;
pub mod ports;
pub mod status;
pub mod submit;
pub mod users;

#[cfg(test)]
mod fakes;

pub use credentials::{CachedToken, CredentialCache, CredentialCacheConfig};
pub use error::{AgentError, AgentResult};
pub use limiter::RequestLimiter;
pub use ports::{JobManagementApi, ResourceManagerApi, SlurmAuth, TokenIssuer, UserMapper};
pub use status::{StatusSummary, StatusTracker};
pub use submit::{BatchSummary, SubmissionCoordinator, SubmitConfig};
pub use users::{SingleUserMapper, UserMapperKind};

pub mod prelude {
    pub use crate::error::{AgentError, AgentResult};
    pub use crate::ports::{JobManagementApi, ResourceManagerApi, SlurmAuth, TokenIssuer, UserMapper};
    pub use crate::credentials::CredentialCache;
    pub use crate::status::StatusTracker;
    pub use crate::submit::SubmissionCoordinator;
}
