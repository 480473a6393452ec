use std::{
    fmt,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use tokio::process::Command;
use tracing::{debug, trace};

use crate::{ExecError, ExecResult};

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct Arg {
    value: String,
    secret: bool,
}

/// A program invocation. Secret arguments are masked wherever the spec is displayed.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: PathBuf,
    args: Vec<Arg>,
    timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(Arg {
            value: value.into(),
            secret: false,
        });
        self
    }

    pub fn secret_arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(Arg {
            value: value.into(),
            secret: true,
        });
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.secret {
                f.write_str(" ***")?;
            } else {
                write!(f, " {}", arg.value)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs `spec` to completion and captures its output.
///
/// The child is killed when the timeout elapses. A non-zero exit is not an error here.
pub async fn run(spec: &CommandSpec) -> ExecResult<CommandOutput> {
    trace!(command = %spec, "spawning command");

    let mut cmd = Command::new(&spec.program);
    cmd.args(spec.args.iter().map(|a| a.value.as_str()))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|source| ExecError::Spawn {
        program: spec.program_name(),
        source,
    })?;

    let output = match tokio::time::timeout(spec.timeout, child.wait_with_output()).await {
        Ok(res) => res?,
        Err(_) => {
            debug!(command = %spec, timeout = ?spec.timeout, "command timed out; killed");
            return Err(ExecError::Timeout {
                program: spec.program_name(),
                after: spec.timeout,
            });
        }
    };

    let out = CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    debug!(program = %spec.program.display(), code = ?out.code, "command finished");
    Ok(out)
}

/// Like [`run`], but a non-zero exit becomes [`ExecError::Failed`] carrying stderr.
pub async fn run_checked(spec: &CommandSpec) -> ExecResult<CommandOutput> {
    let out = run(spec).await?;
    if out.success() {
        return Ok(out);
    }
    Err(ExecError::Failed {
        program: spec.program_name(),
        code: out.code,
        stderr: out.stderr.trim().to_string(),
    })
}
