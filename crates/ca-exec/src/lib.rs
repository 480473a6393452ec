//! Local command execution for the agent.
//!
//! [`run`] spawns a program with captured output and a deadline. On top of it
//! sit the `scontrol token` issuer and the `ldapsearch` user mapper, each behind
//! its own feature.
mod error;
pub use error::{ExecError, ExecResult};

mod command;
pub use command::{CommandOutput, CommandSpec, DEFAULT_COMMAND_TIMEOUT, run, run_checked};

#[cfg(feature = "scontrol")]
mod scontrol;
#[cfg(feature = "scontrol")]
pub use scontrol::ScontrolTokenIssuer;

#[cfg(feature = "ldap")]
mod ldap;
#[cfg(feature = "ldap")]
pub use ldap::{LdapAuthType, LdapSettings, LdapUserMapper};
