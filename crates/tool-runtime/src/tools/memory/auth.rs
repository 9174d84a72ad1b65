//! Session credentials for the memory service.

use agentlink_core::AuthPreference;
use reqwest::header::{HeaderMap, AUTHORIZATION, COOKIE, SET_COOKIE};
use reqwest::RequestBuilder;
use serde_json::Value;

/// What a successful login handed back. At least one side is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential {
    /// `Cookie` header value built from the login's `Set-Cookie` headers.
    pub cookie: Option<String>,
    /// `access_token` from the login response body.
    pub bearer: Option<String>,
}

impl Credential {
    /// Extract whatever the login response offers.
    ///
    /// Cookies are honored regardless of status; the bearer token only
    /// from a 2xx JSON body. Returns `None` when neither is present.
    pub fn from_login(success: bool, headers: &HeaderMap, body: &str) -> Option<Self> {
        let cookies: Vec<&str> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        let cookie = (!cookies.is_empty()).then(|| join_cookies(&cookies));

        let bearer = if success {
            serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|j| j.get("access_token").and_then(Value::as_str).map(String::from))
                .filter(|t| !t.is_empty())
        } else {
            None
        };

        if cookie.is_none() && bearer.is_none() {
            return None;
        }
        Some(Self { cookie, bearer })
    }

    /// Attach the credential, choosing by preference when both exist.
    pub fn apply(&self, rb: RequestBuilder, preference: AuthPreference) -> RequestBuilder {
        let cookie = self.cookie.as_ref().map(|c| (COOKIE, c.clone()));
        let bearer = self
            .bearer
            .as_ref()
            .map(|t| (AUTHORIZATION, format!("Bearer {t}")));
        let chosen = match preference {
            AuthPreference::Cookie => cookie.or(bearer),
            AuthPreference::Bearer => bearer.or(cookie),
        };
        match chosen {
            Some((name, value)) => rb.header(name, value),
            None => rb,
        }
    }
}

/// Keep the `name=value` part of each `Set-Cookie` and join with `; `.
pub fn join_cookies(set_cookies: &[&str]) -> String {
    set_cookies
        .iter()
        .map(|sc| sc.split(';').next().unwrap_or_default().trim())
        .collect::<Vec<_>>()
        .join("; ")
}
