use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use ca_core::{AgentError, AgentResult, TokenIssuer};
use tracing::{debug, instrument};

use crate::{CommandSpec, DEFAULT_COMMAND_TIMEOUT, run_checked};

const JWT_PREFIX: &str = "SLURM_JWT=";

/// Issues resource-manager tokens with `scontrol token username=<user>`.
#[derive(Debug, Clone)]
pub struct ScontrolTokenIssuer {
    program: PathBuf,
    timeout: Duration,
    lifespan: Option<u64>,
}

impl ScontrolTokenIssuer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
            lifespan: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Requested token lifetime in seconds; the controller default applies when unset.
    pub fn with_lifespan(mut self, secs: Option<u64>) -> Self {
        self.lifespan = secs;
        self
    }

    fn command(&self, username: &str) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.program)
            .arg("token")
            .arg(format!("username={username}"));
        if let Some(secs) = self.lifespan {
            spec = spec.arg(format!("lifespan={secs}"));
        }
        spec.with_timeout(self.timeout)
    }
}

impl Default for ScontrolTokenIssuer {
    fn default() -> Self {
        Self::new("scontrol")
    }
}

#[async_trait]
impl TokenIssuer for ScontrolTokenIssuer {
    #[instrument(level = "debug", skip(self))]
    async fn issue(&self, identity: &str) -> AgentResult<String> {
        let out = run_checked(&self.command(identity))
            .await
            .map_err(|e| AgentError::Authentication(e.to_string()))?;

        let token = parse_token(&out.stdout).ok_or_else(|| {
            AgentError::Authentication(format!(
                "{} printed no {JWT_PREFIX} line",
                self.program.display()
            ))
        })?;
        debug!("issued resource-manager token");
        Ok(token)
    }
}

fn parse_token(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .filter_map(|line| line.trim().strip_prefix(JWT_PREFIX))
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}
