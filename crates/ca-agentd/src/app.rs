//! Component wiring.
use std::sync::Arc;

use anyhow::Context;
use ca_api::{
    HttpClient, IdentityProviderMapper, JobManagementClient, OidcTokenIssuer, SlurmrestdClient,
    build_client,
};
use ca_core::{
    CredentialCache, CredentialCacheConfig, RequestLimiter, SingleUserMapper, StatusTracker,
    SubmissionCoordinator, UserMapper, UserMapperKind,
};
use ca_directives::Directives;
use ca_exec::{LdapUserMapper, ScontrolTokenIssuer};
use tracing::info;

use crate::settings::AgentSettings;

/// Cache subdirectory of resource-manager tokens, one file per cluster user.
const SLURM_TOKEN_DIR: &str = "slurmrestd";

pub struct Agent {
    pub coordinator: Arc<SubmissionCoordinator>,
    pub tracker: Arc<StatusTracker>,
}

pub async fn build(settings: &AgentSettings) -> anyhow::Result<Agent> {
    let http = build_client(&settings.http_settings())?;
    let cache_dir = settings.token_cache_dir();

    let mut api_cache =
        CredentialCacheConfig::default().with_safety_margin(settings.token_safety_margin());
    if let Some(dir) = &cache_dir {
        api_cache = api_cache.with_dir(dir);
    }
    let oidc = OidcTokenIssuer::new(http.clone(), settings.oidc_settings())
        .context("invalid OIDC token url")?;
    let api_credentials = Arc::new(CredentialCache::new(Arc::new(oidc), api_cache));
    let jobs = Arc::new(
        JobManagementClient::new(http.clone(), &settings.base_api_url, api_credentials)
            .context("invalid job-management base url")?,
    );

    let mut slurm_cache = CredentialCacheConfig::default()
        .with_safety_margin(settings.token_safety_margin())
        .with_static_token(settings.x_slurm_user_token.clone());
    if let Some(dir) = &cache_dir {
        slurm_cache = slurm_cache.with_dir(dir.join(SLURM_TOKEN_DIR));
    }
    let scontrol = ScontrolTokenIssuer::new(&settings.scontrol_path)
        .with_lifespan(settings.scontrol_token_lifespan)
        .with_timeout(settings.http_settings().request_timeout);
    let slurm_credentials = Arc::new(CredentialCache::new(Arc::new(scontrol), slurm_cache));
    let slurm = Arc::new(
        SlurmrestdClient::new(
            http.clone(),
            &settings.base_slurmrestd_url,
            settings.slurmrestd_api_version.clone(),
        )
        .context("invalid slurmrestd base url")?,
    );

    let users = user_mapper(settings, Arc::clone(&jobs), http).await?;
    let directives = Arc::new(Directives::sbatch().context("invalid directive table")?);
    let limiter = RequestLimiter::new(settings.max_in_flight);

    let coordinator = SubmissionCoordinator::new(
        jobs.clone(),
        slurm.clone(),
        Arc::clone(&slurm_credentials),
        users,
        directives,
        limiter.clone(),
        settings.submit_config(),
    );
    let tracker = StatusTracker::new(
        jobs,
        slurm,
        slurm_credentials,
        limiter,
        settings.x_slurm_user_name.clone(),
    );

    Ok(Agent {
        coordinator: Arc::new(coordinator),
        tracker: Arc::new(tracker),
    })
}

async fn user_mapper(
    settings: &AgentSettings,
    jobs: Arc<JobManagementClient>,
    http: HttpClient,
) -> anyhow::Result<Arc<dyn UserMapper>> {
    let mut mapper: Box<dyn UserMapper> = match settings.user_mapper {
        UserMapperKind::SingleUser => Box::new(SingleUserMapper::new(Some(settings.submitter()))),
        UserMapperKind::Ldap => Box::new(LdapUserMapper::new(settings.ldap_settings())),
        UserMapperKind::IdentityProvider => Box::new(IdentityProviderMapper::new(
            jobs,
            http,
            settings.identity_settings(),
        )),
    };
    let name = mapper.name();
    mapper
        .configure()
        .await
        .with_context(|| format!("could not configure the {name} user mapper"))?;
    info!(mapper = name, "user mapper configured");
    Ok(Arc::from(mapper))
}
