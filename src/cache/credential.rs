use std::fmt;

use crate::helpers::time::now_i64;

/// Whether a held credential can be handed out as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
    Absent,
}

/// Access token minted by a credential source for a fixed scope set.
///
/// Credentials are replaced on refresh, never mutated in place.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub token_type: String,
    /// UNIX TIMESTAMP, `None` for tokens without a known lifetime
    pub expires_at: Option<i64>,
    pub scopes: Vec<String>,
}

impl Credential {
    pub fn new(token: String, expires_at: Option<i64>, scopes: Vec<String>) -> Self {
        Self {
            token,
            token_type: "Bearer".to_owned(),
            expires_at,
            scopes,
        }
    }

    /// Moment (unix seconds) from which the credential must be refreshed.
    pub fn refresh_at(&self, safety_margin_seconds: u64) -> Option<i64> {
        let margin = i64::try_from(safety_margin_seconds).unwrap_or(i64::MAX);
        self.expires_at.map(|exp| exp.saturating_sub(margin).max(0))
    }

    pub fn freshness(&self, safety_margin_seconds: u64) -> Freshness {
        match self.refresh_at(safety_margin_seconds) {
            Some(refresh_at) if now_i64() >= refresh_at => Freshness::Stale,
            _ => Freshness::Fresh,
        }
    }

    /// Copy of this credential that reports stale regardless of margin.
    pub(crate) fn invalidated(&self) -> Self {
        Self {
            expires_at: Some(0),
            ..self.clone()
        }
    }

    /// `Authorization` header value.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[redacted]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Freshness of an optional cached credential.
pub fn freshness_of(credential: Option<&Credential>, safety_margin_seconds: u64) -> Freshness {
    credential
        .map(|c| c.freshness(safety_margin_seconds))
        .unwrap_or(Freshness::Absent)
}

#[cfg(test)]
mod test {
    use super::*;

    fn credential(expires_at: Option<i64>) -> Credential {
        Credential::new("tok".into(), expires_at, vec![])
    }

    #[test]
    fn freshness_respects_safety_margin() {
        let now = now_i64();
        assert_eq!(credential(Some(now + 3600)).freshness(225), Freshness::Fresh);
        assert_eq!(credential(Some(now + 100)).freshness(225), Freshness::Stale);
        assert_eq!(credential(Some(now - 1)).freshness(0), Freshness::Stale);
        assert_eq!(credential(None).freshness(225), Freshness::Fresh);
    }

    #[test]
    fn oversized_margin_does_not_wrap() {
        let far = credential(Some(i64::MAX));
        assert_eq!(far.refresh_at(u64::MAX), Some(0));
        assert_eq!(far.freshness(u64::MAX), Freshness::Stale);
        assert_eq!(far.freshness(u64::MAX / 2 + 1), Freshness::Stale);
    }

    #[test]
    fn invalidated_credential_is_stale() {
        let now = now_i64();
        let fresh = credential(Some(now + 3600));
        assert_eq!(fresh.invalidated().freshness(0), Freshness::Stale);
        assert_eq!(fresh.invalidated().token, "tok");
    }

    #[test]
    fn absent_when_nothing_cached() {
        assert_eq!(freshness_of(None, 10), Freshness::Absent);
    }

    #[test]
    fn debug_output_redacts_token() {
        let out = format!("{:?}", Credential::new("secret-value".into(), None, vec![]));
        assert!(!out.contains("secret-value"));
    }
}
