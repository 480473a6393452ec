use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {after:?}")]
    Timeout { program: String, after: Duration },

    #[error("{program} exited with {}: {stderr}", code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}")))]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ExecResult<T> = Result<T, ExecError>;
