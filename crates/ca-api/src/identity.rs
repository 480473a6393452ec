//! Username lookup through the organization directory of the identity provider.
use std::sync::Arc;

use async_trait::async_trait;
use ca_core::{AgentError, AgentResult, UserMapper};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{JobManagementClient, http::expect_success};

const MEMBERS_PATH: &str = "admin/management/organizations/members";
const DEFAULT_PROFILE_URL: &str = "https://graph.microsoft.com/v1.0/me?$select=mailNickName";

#[derive(Debug, Clone)]
pub struct IdentityProviderSettings {
    /// Profile endpoint answering `{"mailNickName": ...}` for the bearer's account.
    pub profile_url: String,
}

impl Default for IdentityProviderSettings {
    fn default() -> Self {
        Self {
            profile_url: DEFAULT_PROFILE_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Member {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct MemberList {
    members: Vec<Member>,
}

#[derive(Deserialize)]
struct MemberIdentity {
    access_token: String,
}

#[derive(Deserialize)]
struct MemberDetail {
    identities: Vec<MemberIdentity>,
}

#[derive(Deserialize)]
struct Profile {
    #[serde(rename = "mailNickName")]
    mail_nick_name: String,
}

/// Resolves usernames as the lower-cased `mailNickName` of the member's linked identity.
///
/// The member and its identity token come from the job-management service; the
/// nickname comes from the identity provider itself.
pub struct IdentityProviderMapper {
    jobs: Arc<JobManagementClient>,
    http: Client,
    settings: IdentityProviderSettings,
    profile_url: Option<Url>,
}

impl IdentityProviderMapper {
    pub fn new(
        jobs: Arc<JobManagementClient>,
        http: Client,
        settings: IdentityProviderSettings,
    ) -> Self {
        Self {
            jobs,
            http,
            settings,
            profile_url: None,
        }
    }

    async fn nickname(&self, url: &Url, access_token: &str) -> AgentResult<String> {
        let resp = self
            .http
            .get(url.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AgentError::UserMapping(format!("profile request failed: {e}")))?;
        let resp = expect_success(resp)
            .await
            .map_err(|e| AgentError::UserMapping(format!("profile request failed: {e}")))?;
        let profile: Profile = resp
            .json()
            .await
            .map_err(|e| AgentError::UserMapping(format!("malformed profile: {e}")))?;
        Ok(profile.mail_nick_name)
    }
}

#[async_trait]
impl UserMapper for IdentityProviderMapper {
    fn name(&self) -> &'static str {
        "identity-provider"
    }

    async fn configure(&mut self) -> AgentResult<()> {
        let url = Url::parse(&self.settings.profile_url).map_err(|e| {
            AgentError::Config(format!(
                "invalid identity-provider profile url {}: {e}",
                self.settings.profile_url
            ))
        })?;
        self.profile_url = Some(url);
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn resolve_username(&self, email: &str) -> AgentResult<String> {
        let url = self.profile_url.as_ref().ok_or_else(|| {
            AgentError::UserMapping("identity-provider mapper is not configured".into())
        })?;

        let list: MemberList = self
            .jobs
            .get_json(MEMBERS_PATH, &[("search", email)], AgentError::UserMapping)
            .await?;
        let member = match list.members.as_slice() {
            [] => {
                return Err(AgentError::UserMapping(format!(
                    "did not find any matches for email {email}"
                )));
            }
            [member] => member,
            more => {
                return Err(AgentError::UserMapping(format!(
                    "found {} matches for email {email}",
                    more.len()
                )));
            }
        };
        debug!(user_id = %member.user_id, "found organization member");

        let detail: MemberDetail = self
            .jobs
            .get_json(
                &format!("{MEMBERS_PATH}/{}", member.user_id),
                &[],
                AgentError::UserMapping,
            )
            .await?;
        let [identity] = detail.identities.as_slice() else {
            return Err(AgentError::UserMapping(format!(
                "expected exactly one embedded identity, found {}",
                detail.identities.len()
            )));
        };

        Ok(self.nickname(url, &identity.access_token).await?.to_lowercase())
    }
}
