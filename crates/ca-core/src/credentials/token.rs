use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;
use time::OffsetDateTime;

#[derive(Deserialize)]
struct Claims {
    #[serde(default)]
    exp: Option<i64>,
}

/// A bearer token and the instant it stops being valid.
///
/// `expires_at` is `None` for tokens without an `exp` claim; those never expire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    value: String,
    expires_at: Option<OffsetDateTime>,
}

impl CachedToken {
    /// Reads the expiry from the JWT `exp` claim. The signature is not checked.
    ///
    /// Returns `None` when `value` is not a decodable JWT.
    pub fn decode(value: impl Into<String>) -> Option<Self> {
        let value = value.into().trim().to_string();
        let mut parts = value.split('.');
        let (Some(_header), Some(payload), Some(_sig), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };

        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        let claims: Claims = serde_json::from_slice(&bytes).ok()?;
        let expires_at = match claims.exp {
            Some(exp) => Some(OffsetDateTime::from_unix_timestamp(exp).ok()?),
            None => None,
        };
        Some(Self { value, expires_at })
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        self.expires_at
    }

    /// `true` while `now` is earlier than `expires_at - margin`.
    ///
    /// A margin that reaches past the representable time range is never fresh.
    pub fn is_fresh(&self, now: OffsetDateTime, margin: Duration) -> bool {
        let Some(exp) = self.expires_at else {
            return true;
        };
        time::Duration::try_from(margin)
            .ok()
            .and_then(|margin| now.checked_add(margin))
            .is_some_and(|deadline| deadline < exp)
    }
}

#[cfg(test)]
pub(crate) fn jwt_expiring_at(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"test","exp":{exp}}}"#));
    format!("{header}.{claims}.sig")
}
