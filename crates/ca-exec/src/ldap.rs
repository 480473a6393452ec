//! Directory lookup of cluster usernames through `ldapsearch`.
use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use ca_core::{AgentError, AgentResult, UserMapper};
use tracing::{debug, instrument};

use crate::{CommandSpec, DEFAULT_COMMAND_TIMEOUT, run_checked};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LdapAuthType {
    #[default]
    Simple,
    /// Binds as `DOMAIN\user`.
    Ntlm,
}

impl FromStr for LdapAuthType {
    type Err = AgentError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "ntlm" => Ok(Self::Ntlm),
            other => Err(AgentError::Config(format!("unknown LDAP auth type: {other}"))),
        }
    }
}

impl fmt::Display for LdapAuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LdapAuthType::Simple => "simple",
            LdapAuthType::Ntlm => "ntlm",
        })
    }
}

#[derive(Debug, Clone)]
pub struct LdapSettings {
    pub uri: Option<String>,
    pub domain: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_type: LdapAuthType,
    pub program: PathBuf,
    pub timeout: Duration,
}

impl Default for LdapSettings {
    fn default() -> Self {
        Self {
            uri: None,
            domain: None,
            username: None,
            password: None,
            auth_type: LdapAuthType::Simple,
            program: PathBuf::from("ldapsearch"),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
struct Bind {
    uri: String,
    search_base: String,
    bind_name: String,
    password: String,
}

/// Resolves usernames as the single `cn` of the directory entry whose `mail` matches.
pub struct LdapUserMapper {
    settings: LdapSettings,
    bind: Option<Bind>,
}

impl LdapUserMapper {
    pub fn new(settings: LdapSettings) -> Self {
        Self {
            settings,
            bind: None,
        }
    }

    fn bind_from_settings(&self) -> AgentResult<Bind> {
        let s = &self.settings;
        let present = |v: &Option<String>| {
            v.as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
        };
        let (Some(uri), Some(domain), Some(username), Some(password)) = (
            present(&s.uri),
            present(&s.domain),
            present(&s.username),
            present(&s.password),
        ) else {
            return Err(AgentError::Config(
                "LDAP user mapper requires uri, domain, username and password".into(),
            ));
        };

        let bind_name = match s.auth_type {
            LdapAuthType::Ntlm => format!("{domain}\\{username}"),
            LdapAuthType::Simple => username,
        };
        Ok(Bind {
            uri,
            search_base: search_base(&domain),
            bind_name,
            password,
        })
    }

    fn search(
        &self,
        bind: &Bind,
        scope: Option<&str>,
        filter: &str,
        attrs: &[&str],
    ) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.settings.program).arg("-x").arg("-LLL");
        if !bind.uri.to_ascii_lowercase().starts_with("ldaps://") {
            spec = spec.arg("-ZZ");
        }
        spec = spec
            .arg("-H")
            .arg(&bind.uri)
            .arg("-D")
            .arg(&bind.bind_name)
            .arg("-w")
            .secret_arg(&bind.password)
            .arg("-b")
            .arg(&bind.search_base);
        if let Some(scope) = scope {
            spec = spec.arg("-s").arg(scope);
        }
        spec = spec.arg(filter);
        for attr in attrs {
            spec = spec.arg(*attr);
        }
        spec.with_timeout(self.settings.timeout)
    }
}

#[async_trait]
impl UserMapper for LdapUserMapper {
    fn name(&self) -> &'static str {
        "ldap"
    }

    /// Validates settings and checks that the bind succeeds.
    async fn configure(&mut self) -> AgentResult<()> {
        let bind = self.bind_from_settings()?;
        debug!(
            uri = %bind.uri,
            base = %bind.search_base,
            user = %bind.bind_name,
            "connecting to LDAP"
        );

        let probe = self.search(&bind, Some("base"), "(objectClass=*)", &["1.1"]);
        run_checked(&probe)
            .await
            .map_err(|e| AgentError::Config(format!("could not bind to LDAP: {e}")))?;

        debug!("LDAP bind succeeded");
        self.bind = Some(bind);
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn resolve_username(&self, email: &str) -> AgentResult<String> {
        let bind = self
            .bind
            .as_ref()
            .ok_or_else(|| AgentError::UserMapping("LDAP mapper is not configured".into()))?;

        let filter = format!("(mail={})", escape_filter_value(email));
        let out = run_checked(&self.search(bind, None, &filter, &["cn"]))
            .await
            .map_err(|e| AgentError::UserMapping(format!("LDAP search failed: {e}")))?;

        let entries = parse_ldif(&out.stdout)?;
        debug!(count = entries.len(), "LDAP entries found");
        let [entry] = entries.as_slice() else {
            return Err(AgentError::UserMapping(format!(
                "did not find exactly one match for email {email}; found {}",
                entries.len()
            )));
        };

        let cns: Vec<&str> = entry
            .iter()
            .filter(|(attr, _)| attr.eq_ignore_ascii_case("cn"))
            .map(|(_, value)| value.as_str())
            .collect();
        match cns.as_slice() {
            [cn] => Ok(cn.to_lowercase()),
            other => Err(AgentError::UserMapping(format!(
                "user did not have exactly one CN; got {other:?}"
            ))),
        }
    }
}

/// `example.com` -> `DC=example,DC=com`
fn search_base(domain: &str) -> String {
    domain
        .split('.')
        .filter(|p| !p.is_empty())
        .map(|dc| format!("DC={dc}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Escapes a filter assertion value (RFC 4515).
fn escape_filter_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '*' => out.push_str("\\2a"),
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '\\' => out.push_str("\\5c"),
            '\0' => out.push_str("\\00"),
            c => out.push(c),
        }
    }
    out
}

type Entry = Vec<(String, String)>;

/// Parses `ldapsearch -LLL` output into entries of `(attribute, value)` pairs.
fn parse_ldif(text: &str) -> AgentResult<Vec<Entry>> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        match raw.strip_prefix(' ') {
            Some(cont) if !lines.is_empty() => {
                if let Some(last) = lines.last_mut() {
                    last.push_str(cont);
                }
            }
            _ => lines.push(raw.to_string()),
        }
    }

    let mut entries = Vec::new();
    let mut current: Option<Entry> = None;
    for line in lines {
        if line.trim().is_empty() {
            entries.extend(current.take());
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        let Some((attr, rest)) = line.split_once(':') else {
            return Err(AgentError::UserMapping(format!("malformed LDIF line: {line}")));
        };
        let value = match rest.strip_prefix(':') {
            Some(encoded) => {
                let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
                    AgentError::UserMapping(format!("invalid base64 value for {attr}: {e}"))
                })?;
                String::from_utf8_lossy(&bytes).into_owned()
            }
            None => rest.trim_start().to_string(),
        };
        if attr.eq_ignore_ascii_case("dn") {
            entries.extend(current.take());
            current = Some(Vec::new());
        }
        current.get_or_insert_with(Vec::new).push((attr.to_string(), value));
    }
    entries.extend(current);
    Ok(entries)
}
