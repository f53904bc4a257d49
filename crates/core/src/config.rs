use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::error::ConfigError;
use crate::state_format::StateFormat;

/// Prefix shared by every provider environment variable.
pub const ENV_PREFIX: &str = "RULER";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled setting: tries `{PROFILE}_RULER_{KEY}` first, falls back to `RULER_{KEY}`.
fn profiled_opt(lookup: &dyn Fn(&str) -> Option<String>, profile: &str, key: &str) -> Option<String> {
    let unprefixed = format!("{}_{}", ENV_PREFIX, key);
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, unprefixed);
        if let Some(v) = lookup(&prefixed).filter(|s| !s.is_empty()) {
            return Some(v);
        }
    }
    lookup(&unprefixed).filter(|s| !s.is_empty())
}

fn profiled_or(
    lookup: &dyn Fn(&str) -> Option<String>,
    profile: &str,
    key: &str,
    default: &str,
) -> String {
    profiled_opt(lookup, profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_bool(
    lookup: &dyn Fn(&str) -> Option<String>,
    profile: &str,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match profiled_opt(lookup, profile, key) {
        None => Ok(default),
        Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
            key,
            message: format!("expected a boolean, got '{}'", raw),
        }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ── Provider config ───────────────────────────────────────────

/// Settings used to reach a ruler and to decide how rules are stored in state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Active profile name (empty = default).
    pub profile: String,
    /// Base URL of the ruler, e.g. `http://loki:3100`.
    pub address: Option<String>,
    /// Sent as `X-Scope-OrgID`.
    pub tenant_id: Option<String>,
    pub api_user: Option<String>,
    pub api_key: Option<String>,
    pub tls: TlsConfig,
    /// Path prefix for the non-legacy ruler routes.
    pub prometheus_http_prefix: String,
    /// Use `/api/prom/rules` instead of `{prefix}/config/v1/rules`.
    pub use_legacy_routes: bool,
    /// Store only the SHA-256 of the canonical rules in state.
    pub store_rules_sha256: bool,
    pub backend: Backend,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsConfig {
    pub key_path: Option<PathBuf>,
    pub cert_path: Option<PathBuf>,
    pub ca_path: Option<PathBuf>,
    pub insecure_skip_verify: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            profile: String::new(),
            address: None,
            tenant_id: None,
            api_user: None,
            api_key: None,
            tls: TlsConfig::default(),
            prometheus_http_prefix: "/prometheus".to_string(),
            use_legacy_routes: true,
            store_rules_sha256: false,
            backend: Backend::default(),
        }
    }
}

impl ProviderConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `RULER_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `PROD_RULER_{KEY}`, falling back to `RULER_{KEY}`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile = env_opt("RULER_PROFILE").unwrap_or_default();
        Self::from_lookup(&profile, &env_opt)
    }

    /// Build config from an arbitrary key lookup. `from_env` is this with `std::env`.
    pub fn from_lookup(
        profile: &str,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let p = profile.to_uppercase();
        let p = p.as_str();
        let defaults = Self::default();

        let backend = match profiled_opt(lookup, p, "BACKEND") {
            Some(raw) => raw
                .parse()
                .map_err(|message| ConfigError::Invalid { key: "backend", message })?,
            None => defaults.backend,
        };

        let config = Self {
            profile: p.to_string(),
            address: profiled_opt(lookup, p, "ADDRESS"),
            tenant_id: profiled_opt(lookup, p, "TENANT_ID"),
            api_user: profiled_opt(lookup, p, "API_USER"),
            api_key: profiled_opt(lookup, p, "API_KEY"),
            tls: TlsConfig {
                key_path: profiled_opt(lookup, p, "TLS_KEY_PATH").map(PathBuf::from),
                cert_path: profiled_opt(lookup, p, "TLS_CERT_PATH").map(PathBuf::from),
                ca_path: profiled_opt(lookup, p, "TLS_CA_PATH").map(PathBuf::from),
                insecure_skip_verify: profiled_bool(lookup, p, "INSECURE_SKIP_VERIFY", false)?,
            },
            prometheus_http_prefix: profiled_or(
                lookup,
                p,
                "PROMETHEUS_HTTP_PREFIX",
                &defaults.prometheus_http_prefix,
            ),
            use_legacy_routes: profiled_bool(lookup, p, "USE_LEGACY_ROUTES", defaults.use_legacy_routes)?,
            store_rules_sha256: profiled_bool(lookup, p, "STORE_RULES_SHA256", false)?,
            backend,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the address (when set) is an http(s) URL and TLS settings are paired.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(address) = &self.address {
            let parsed = url::Url::parse(address).map_err(|e| ConfigError::Invalid {
                key: "address",
                message: e.to_string(),
            })?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(ConfigError::Invalid {
                    key: "address",
                    message: format!("expected http or https scheme, got '{}'", parsed.scheme()),
                });
            }
        }
        if self.tls.cert_path.is_some() != self.tls.key_path.is_some() {
            return Err(ConfigError::Invalid {
                key: "tls_cert_path",
                message: "tls_cert_path and tls_key_path must be set together".to_string(),
            });
        }
        Ok(())
    }

    /// The configured address, or an error when none was provided.
    pub fn require_address(&self) -> Result<&str, ConfigError> {
        self.address.as_deref().ok_or(ConfigError::Missing("address"))
    }

    pub fn state_format(&self) -> StateFormat {
        StateFormat::from_store_sha256(self.store_rules_sha256)
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  address:     {}", self.address.as_deref().unwrap_or("(none)"));
        tracing::info!("  tenant:      {}", self.tenant_id.as_deref().unwrap_or("(none)"));
        tracing::info!("  backend:     {}", self.backend);
        tracing::info!("  routes:      legacy={}, prefix={}", self.use_legacy_routes, self.prometheus_http_prefix);
        tracing::info!("  state:       {:?}", self.state_format());
    }

    /// Return a redacted view safe for printing (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "address": self.address,
            "tenant_id": self.tenant_id,
            "auth": {
                "api_user": self.api_user,
                "api_key_set": self.api_key.is_some(),
            },
            "tls": {
                "ca_path": self.tls.ca_path,
                "cert_path": self.tls.cert_path,
                "key_set": self.tls.key_path.is_some(),
                "insecure_skip_verify": self.tls.insecure_skip_verify,
            },
            "prometheus_http_prefix": self.prometheus_http_prefix,
            "use_legacy_routes": self.use_legacy_routes,
            "store_rules_sha256": self.store_rules_sha256,
            "backend": self.backend,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = ProviderConfig::from_lookup("", &lookup_from(&[])).unwrap();
        assert!(config.address.is_none());
        assert_eq!(config.prometheus_http_prefix, "/prometheus");
        assert!(config.use_legacy_routes);
        assert_eq!(config.state_format(), StateFormat::Yaml);
        assert_eq!(config.backend, Backend::Loki);
        assert_eq!(config.require_address(), Err(ConfigError::Missing("address")));
    }

    #[test]
    fn reads_all_settings() {
        let lookup = lookup_from(&[
            ("RULER_ADDRESS", "https://mimir.example.com"),
            ("RULER_TENANT_ID", "team-a"),
            ("RULER_API_USER", "1234"),
            ("RULER_API_KEY", "secret"),
            ("RULER_TLS_CA_PATH", "/etc/ca.pem"),
            ("RULER_INSECURE_SKIP_VERIFY", "yes"),
            ("RULER_STORE_RULES_SHA256", "true"),
            ("RULER_USE_LEGACY_ROUTES", "false"),
            ("RULER_BACKEND", "mimir"),
        ]);
        let config = ProviderConfig::from_lookup("", &lookup).unwrap();
        assert_eq!(config.require_address(), Ok("https://mimir.example.com"));
        assert_eq!(config.tenant_id.as_deref(), Some("team-a"));
        assert_eq!(config.tls.ca_path, Some(PathBuf::from("/etc/ca.pem")));
        assert!(config.tls.insecure_skip_verify);
        assert_eq!(config.state_format(), StateFormat::Sha256);
        assert!(!config.use_legacy_routes);
        assert_eq!(config.backend, Backend::Mimir);
    }

    #[test]
    fn profile_prefixed_keys_win() {
        let lookup = lookup_from(&[
            ("RULER_ADDRESS", "http://localhost:3100"),
            ("PROD_RULER_ADDRESS", "https://loki.prod.example.com"),
        ]);
        let config = ProviderConfig::from_lookup("prod", &lookup).unwrap();
        assert_eq!(config.profile_label(), "PROD");
        assert_eq!(config.address.as_deref(), Some("https://loki.prod.example.com"));
    }

    #[test]
    fn rejects_non_http_address() {
        let lookup = lookup_from(&[("RULER_ADDRESS", "ftp://loki")]);
        let err = ProviderConfig::from_lookup("", &lookup).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "address", .. }));
    }

    #[test]
    fn rejects_bad_boolean() {
        let lookup = lookup_from(&[("RULER_STORE_RULES_SHA256", "maybe")]);
        let err = ProviderConfig::from_lookup("", &lookup).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "STORE_RULES_SHA256", .. }));
    }

    #[test]
    fn cert_without_key_is_rejected() {
        let lookup = lookup_from(&[("RULER_TLS_CERT_PATH", "/etc/client.pem")]);
        assert!(ProviderConfig::from_lookup("", &lookup).is_err());
    }

    #[test]
    fn redacted_summary_hides_secrets() {
        let lookup = lookup_from(&[("RULER_API_KEY", "secret")]);
        let config = ProviderConfig::from_lookup("", &lookup).unwrap();
        let summary = config.redacted_summary().to_string();
        assert!(!summary.contains("secret"));
        assert!(summary.contains("\"api_key_set\":true"));
    }
}
