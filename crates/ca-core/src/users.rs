//! Username resolution strategies.
//!
//! The variant set is closed: [`UserMapperKind`] selects one at startup. The
//! single-user strategy lives here; the directory strategy (`ldapsearch`) is in
//! `ca-exec` and the identity-provider strategy in `ca-api`.
use std::{fmt, str::FromStr};

use async_trait::async_trait;
use tracing::debug;

use crate::{AgentError, AgentResult, UserMapper};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum UserMapperKind {
    #[default]
    SingleUser,
    Ldap,
    IdentityProvider,
}

impl FromStr for UserMapperKind {
    type Err = AgentError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "single-user" | "single" => Ok(Self::SingleUser),
            "ldap" | "directory" => Ok(Self::Ldap),
            "identity-provider" | "azure-ad" | "idp" => Ok(Self::IdentityProvider),
            other => Err(AgentError::Config(format!("unknown user mapper: {other}"))),
        }
    }
}

impl fmt::Display for UserMapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UserMapperKind::SingleUser => "single-user",
            UserMapperKind::Ldap => "ldap",
            UserMapperKind::IdentityProvider => "identity-provider",
        })
    }
}

/// Submits every job as the same cluster user.
#[derive(Debug, Clone)]
pub struct SingleUserMapper {
    username: Option<String>,
}

impl SingleUserMapper {
    pub fn new(username: Option<String>) -> Self {
        Self {
            username: username.filter(|u| !u.trim().is_empty()),
        }
    }
}

#[async_trait]
impl UserMapper for SingleUserMapper {
    fn name(&self) -> &'static str {
        "single-user"
    }

    async fn configure(&mut self) -> AgentResult<()> {
        match &self.username {
            Some(user) => {
                debug!(user = %user, "single-user mapper configured");
                Ok(())
            }
            None => Err(AgentError::Config(
                "single-user mapper requires a submitter username".into(),
            )),
        }
    }

    async fn resolve_username(&self, _email: &str) -> AgentResult<String> {
        self.username
            .clone()
            .ok_or_else(|| AgentError::UserMapping("no single-user submitter configured".into()))
    }
}
