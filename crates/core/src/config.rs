use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Floor for the foreground cognify read window, in seconds.
pub const MIN_COGNIFY_WAIT_SECS: u64 = 15;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Profiled key lookup over an arbitrary source.
///
/// Tries `{PROFILE}_{KEY}` first, falls back to `{KEY}`. Empty values are
/// treated as unset.
struct Env<'a> {
    profile: &'a str,
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    fn opt(&self, key: &str) -> Option<String> {
        if !self.profile.is_empty() {
            let prefixed = format!("{}_{}", self.profile, key);
            if let Some(v) = (self.lookup)(&prefixed).filter(|s| !s.is_empty()) {
                return Some(v);
            }
        }
        (self.lookup)(key).filter(|s| !s.is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }

    fn u64(&self, key: &str, default: u64) -> u64 {
        self.opt(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub router: RouterConfig,
    pub memory: MemoryConfig,
    pub artifacts: ArtifactConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `AGENTLINK_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_opt("AGENTLINK_PROFILE").unwrap_or_default();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        Self::from_lookup(profile, &env_opt)
    }

    /// Build config from an arbitrary key lookup. Used by tests to avoid
    /// mutating the process environment.
    pub fn from_lookup(profile: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let p = profile.to_uppercase();
        let env = Env {
            profile: &p,
            lookup,
        };
        Self {
            profile: p.clone(),
            router: RouterConfig::from_env(&env),
            memory: MemoryConfig::from_env(&env),
            artifacts: ArtifactConfig::from_env(&env),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Check that both service base URLs are usable http(s) URLs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url("AGENT_ROUTER_BASE_URL", &self.router.base_url)?;
        validate_base_url("COGNEE_BASE_URL", &self.memory.base_url)?;
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  router:    url={}, connect={}ms, read={}ms",
            self.router.base_url,
            self.router.connect_timeout_ms,
            self.router.read_timeout_ms
        );
        tracing::info!(
            "  memory:    url={}, user={}, password=***, auth_preference={}",
            self.memory.base_url,
            self.memory.email,
            self.memory.auth_preference
        );
        tracing::info!(
            "  artifacts: dir={}",
            self.artifacts
                .dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "(none)".to_string())
        );
    }
}

fn validate_base_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl {
            key: key.to_string(),
            value: value.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

// ── Agent router ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    pub base_url: String,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
}

impl RouterConfig {
    fn from_env(env: &Env<'_>) -> Self {
        Self {
            base_url: trim_base(env.or("AGENT_ROUTER_BASE_URL", "http://localhost:5001")),
            connect_timeout_ms: env.u64("AGENT_ROUTER_CONNECT_TIMEOUT_MS", 3_000),
            read_timeout_ms: env.u64("AGENT_ROUTER_READ_TIMEOUT_MS", 600_000),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Whole-call deadline: read window plus 3s, never below 10s.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.saturating_add(3_000).max(10_000))
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::from_env(&Env {
            profile: "",
            lookup: &|_: &str| None,
        })
    }
}

// ── Memory service ────────────────────────────────────────────

/// Which credential to send when login yields both a cookie and a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthPreference {
    Cookie,
    Bearer,
}

impl std::fmt::Display for AuthPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthPreference::Cookie => write!(f, "cookie"),
            AuthPreference::Bearer => write!(f, "bearer"),
        }
    }
}

impl std::str::FromStr for AuthPreference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cookie" => Ok(AuthPreference::Cookie),
            "bearer" | "token" => Ok(AuthPreference::Bearer),
            _ => Err(ConfigError::InvalidValue {
                key: "COGNEE_AUTH_PREFERENCE".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub base_url: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Default dataset name, suffixed with the session id when one exists.
    pub dataset_prefix: String,
    pub auth_preference: AuthPreference,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub call_timeout_secs: u64,
    /// Bounded wait for a foreground cognify run.
    pub cognify_wait_secs: u64,
}

impl MemoryConfig {
    fn from_env(env: &Env<'_>) -> Self {
        let auth_preference = env
            .opt("COGNEE_AUTH_PREFERENCE")
            .and_then(|v| match v.parse::<AuthPreference>() {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring auth preference, using cookie");
                    None
                }
            })
            .unwrap_or(AuthPreference::Cookie);

        Self {
            base_url: trim_base(env.or("COGNEE_BASE_URL", "http://localhost:8000")),
            email: env.or("COGNEE_EMAIL", "admin@example.com"),
            password: env.or("COGNEE_PASSWORD", "admin123"),
            dataset_prefix: env.or("COGNEE_DATASET_PREFIX", "agent_profile"),
            auth_preference,
            connect_timeout_secs: env.u64("COGNEE_CONNECT_TIMEOUT_SECS", 10),
            read_timeout_secs: env.u64("COGNEE_READ_TIMEOUT_SECS", 60),
            call_timeout_secs: env.u64("COGNEE_CALL_TIMEOUT_SECS", 70),
            cognify_wait_secs: env.u64("COGNEE_COGNIFY_WAIT_SECS", 45),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Read window for a foreground cognify: the configured wait, at least 15s.
    pub fn cognify_read_timeout(&self) -> Duration {
        Duration::from_secs(self.cognify_wait_secs.max(MIN_COGNIFY_WAIT_SECS))
    }

    /// Whole-call deadline for a foreground cognify: read window plus 5s.
    pub fn cognify_call_timeout(&self) -> Duration {
        Duration::from_secs(
            self.cognify_wait_secs
                .max(MIN_COGNIFY_WAIT_SECS)
                .saturating_add(5),
        )
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::from_env(&Env {
            profile: "",
            lookup: &|_: &str| None,
        })
    }
}

// ── Artifacts ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Directory for operation transcripts. Persistence is off when unset.
    pub dir: Option<PathBuf>,
}

impl ArtifactConfig {
    fn from_env(env: &Env<'_>) -> Self {
        Self {
            dir: env.opt("AGENTLINK_ARTIFACT_DIR").map(PathBuf::from),
        }
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
