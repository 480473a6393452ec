use std::{net::SocketAddr, path::PathBuf, time::Duration};

use ca_api::{HttpSettings, IdentityProviderSettings, OidcSettings};
use ca_core::{SubmitConfig, UserMapperKind};
use ca_exec::{LdapAuthType, LdapSettings};
use ca_observe::{LogConfig, LogFormat, LogLevel, LogTimeZone};
use clap::Parser;

/// Agent settings from command-line flags, falling back to `CLUSTER_AGENT_*` variables.
#[derive(Parser, Clone)]
#[command(
    name = "ca-agentd",
    version,
    about = "Cluster agent: submits pending jobs and reports their outcome"
)]
pub struct AgentSettings {
    /// Job-management API base URL.
    #[arg(long, env = "CLUSTER_AGENT_BASE_API_URL")]
    pub base_api_url: String,

    #[arg(long, env = "CLUSTER_AGENT_OIDC_TOKEN_URL")]
    pub oidc_token_url: String,

    #[arg(long, env = "CLUSTER_AGENT_OIDC_AUDIENCE")]
    pub oidc_audience: String,

    #[arg(long, env = "CLUSTER_AGENT_OIDC_CLIENT_ID")]
    pub oidc_client_id: String,

    #[arg(long, env = "CLUSTER_AGENT_OIDC_CLIENT_SECRET", hide_env_values = true)]
    pub oidc_client_secret: String,

    #[arg(
        long,
        env = "CLUSTER_AGENT_BASE_SLURMRESTD_URL",
        default_value = "http://127.0.0.1:6820"
    )]
    pub base_slurmrestd_url: String,

    #[arg(
        long,
        env = "CLUSTER_AGENT_SLURMRESTD_API_VERSION",
        default_value = "v0.0.36"
    )]
    pub slurmrestd_api_version: String,

    /// Cluster identity used for status queries.
    #[arg(long, env = "CLUSTER_AGENT_X_SLURM_USER_NAME", default_value = "root")]
    pub x_slurm_user_name: String,

    /// Fixed resource-manager token; disables `scontrol token`.
    #[arg(long, env = "CLUSTER_AGENT_X_SLURM_USER_TOKEN", hide_env_values = true)]
    pub x_slurm_user_token: Option<String>,

    #[arg(long, env = "CLUSTER_AGENT_SCONTROL_PATH", default_value = "scontrol")]
    pub scontrol_path: PathBuf,

    /// Requested lifetime of issued resource-manager tokens, in seconds.
    #[arg(long, env = "CLUSTER_AGENT_SCONTROL_TOKEN_LIFESPAN")]
    pub scontrol_token_lifespan: Option<u64>,

    /// Token cache directory; `$HOME/.cache/cluster-agent` when unset.
    #[arg(long, env = "CLUSTER_AGENT_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    #[arg(long, env = "CLUSTER_AGENT_TOKEN_SAFETY_MARGIN_SECS", default_value_t = 10)]
    pub token_safety_margin_secs: u64,

    /// Parent of per-submission directories for jobs without an execution directory.
    #[arg(long, env = "CLUSTER_AGENT_DEFAULT_SLURM_WORK_DIR", default_value = "/tmp")]
    pub default_slurm_work_dir: PathBuf,

    /// Upper bound on concurrent outbound calls.
    #[arg(long, env = "CLUSTER_AGENT_MAX_IN_FLIGHT", default_value_t = 8)]
    pub max_in_flight: usize,

    #[arg(long, env = "CLUSTER_AGENT_SUBMIT_INTERVAL_SECS", default_value_t = 30)]
    pub submit_interval_secs: u64,

    #[arg(long, env = "CLUSTER_AGENT_STATUS_INTERVAL_SECS", default_value_t = 60)]
    pub status_interval_secs: u64,

    #[arg(long, env = "CLUSTER_AGENT_CYCLE_TIMEOUT_SECS", default_value_t = 300)]
    pub cycle_timeout_secs: u64,

    #[arg(long, env = "CLUSTER_AGENT_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    #[arg(long, env = "CLUSTER_AGENT_USER_MAPPER", default_value = "single-user")]
    pub user_mapper: UserMapperKind,

    /// Submitter of the single-user mapper; defaults to the status identity.
    #[arg(long, env = "CLUSTER_AGENT_SINGLE_USER_SUBMITTER")]
    pub single_user_submitter: Option<String>,

    #[arg(long, env = "CLUSTER_AGENT_LDAP_URI")]
    pub ldap_uri: Option<String>,

    #[arg(long, env = "CLUSTER_AGENT_LDAP_DOMAIN")]
    pub ldap_domain: Option<String>,

    #[arg(long, env = "CLUSTER_AGENT_LDAP_USERNAME")]
    pub ldap_username: Option<String>,

    #[arg(long, env = "CLUSTER_AGENT_LDAP_PASSWORD", hide_env_values = true)]
    pub ldap_password: Option<String>,

    #[arg(long, env = "CLUSTER_AGENT_LDAP_AUTH_TYPE", default_value = "simple")]
    pub ldap_auth_type: LdapAuthType,

    #[arg(long, env = "CLUSTER_AGENT_LDAPSEARCH_PATH", default_value = "ldapsearch")]
    pub ldapsearch_path: PathBuf,

    #[arg(
        long,
        env = "CLUSTER_AGENT_IDENTITY_PROFILE_URL",
        default_value = "https://graph.microsoft.com/v1.0/me?$select=mailNickName"
    )]
    pub identity_profile_url: String,

    #[arg(long, env = "CLUSTER_AGENT_HEALTH_ADDR", default_value = "0.0.0.0:8080")]
    pub health_addr: SocketAddr,

    #[arg(long, env = "CLUSTER_AGENT_LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,

    /// `EnvFilter` expression, e.g. `info,ca_core=debug`.
    #[arg(long, env = "CLUSTER_AGENT_LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    #[arg(long, env = "CLUSTER_AGENT_LOG_TZ", default_value = "utc")]
    pub log_tz: LogTimeZone,
}

impl AgentSettings {
    pub fn log_config(&self) -> LogConfig {
        LogConfig::default()
            .with_format(self.log_format)
            .with_level(self.log_level.clone())
            .with_tz(self.log_tz)
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..Default::default()
        }
    }

    pub fn oidc_settings(&self) -> OidcSettings {
        OidcSettings {
            token_url: self.oidc_token_url.clone(),
            audience: self.oidc_audience.clone(),
            client_id: self.oidc_client_id.clone(),
            client_secret: self.oidc_client_secret.clone(),
        }
    }

    pub fn ldap_settings(&self) -> LdapSettings {
        LdapSettings {
            uri: self.ldap_uri.clone(),
            domain: self.ldap_domain.clone(),
            username: self.ldap_username.clone(),
            password: self.ldap_password.clone(),
            auth_type: self.ldap_auth_type,
            program: self.ldapsearch_path.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn identity_settings(&self) -> IdentityProviderSettings {
        IdentityProviderSettings {
            profile_url: self.identity_profile_url.clone(),
        }
    }

    pub fn submit_config(&self) -> SubmitConfig {
        SubmitConfig {
            default_work_dir: self.default_slurm_work_dir.clone(),
            ..Default::default()
        }
    }

    pub fn submitter(&self) -> String {
        self.single_user_submitter
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.x_slurm_user_name.clone())
    }

    /// `None` when neither a cache dir nor `$HOME` is known; tokens then stay in memory.
    pub fn token_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.clone().or_else(|| {
            std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache/cluster-agent"))
        })
    }

    pub fn token_safety_margin(&self) -> Duration {
        Duration::from_secs(self.token_safety_margin_secs)
    }

    pub fn submit_interval(&self) -> Duration {
        Duration::from_secs(self.submit_interval_secs.max(1))
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs.max(1))
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs.max(1))
    }
}
