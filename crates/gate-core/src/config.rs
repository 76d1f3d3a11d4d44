//! ============================================================================
//! Gate Configuration
//! ============================================================================
//! Everything the gate needs is built once at startup and handed to it:
//! key registry, page policy, session lifetime, checksum salt and the
//! landing flow's stage delays.
//!
//! Sources, later wins:
//! 1. Built-in defaults (the keys and pages the site ships with)
//! 2. JSON file from `--config` or `PURGE_GATE_CONFIG`
//! 3. `PURGE_SESSION_TTL_SECS`
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::access::KeyRegistry;
use crate::policy::PagePolicy;
use crate::session::{DEFAULT_SALT, DEFAULT_SESSION_TTL_SECS, MAX_SESSION_TTL_SECS};
use crate::types::{GateError, GateResult};

/// Env var naming a JSON config file
pub const CONFIG_PATH_ENV: &str = "PURGE_GATE_CONFIG";

/// Env var overriding the session lifetime in seconds
pub const SESSION_TTL_ENV: &str = "PURGE_SESSION_TTL_SECS";

/// Pauses between landing flow stages, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowDelays {
    /// Before checking a submitted key
    pub validate_ms: u64,
    /// Success message on screen before the overlay fades
    pub granted_ms: u64,
    /// Overlay fade-out
    pub overlay_fade_ms: u64,
    /// After the overlay is gone, before the announcement
    pub announcement_ms: u64,
}

impl Default for FlowDelays {
    fn default() -> Self {
        Self {
            validate_ms: 300,
            granted_ms: 1200,
            overlay_fade_ms: 800,
            announcement_ms: 800,
        }
    }
}

impl FlowDelays {
    /// Run every stage back to back
    pub fn none() -> Self {
        Self {
            validate_ms: 0,
            granted_ms: 0,
            overlay_fade_ms: 0,
            announcement_ms: 0,
        }
    }

    pub fn validate(&self) -> Duration {
        Duration::from_millis(self.validate_ms)
    }

    pub fn granted(&self) -> Duration {
        Duration::from_millis(self.granted_ms)
    }

    pub fn overlay_fade(&self) -> Duration {
        Duration::from_millis(self.overlay_fade_ms)
    }

    pub fn announcement(&self) -> Duration {
        Duration::from_millis(self.announcement_ms)
    }
}

/// Gate configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub keys: KeyRegistry,
    pub pages: PagePolicy,
    pub session_ttl_secs: i64,
    pub checksum_salt: String,
    pub delays: FlowDelays,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            keys: KeyRegistry::default(),
            pages: PagePolicy::default(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            checksum_salt: DEFAULT_SALT.to_string(),
            delays: FlowDelays::default(),
        }
    }
}

impl GateConfig {
    /// Load from `path`, else `PURGE_GATE_CONFIG`, else defaults; then
    /// apply env overrides and validate.
    pub fn load(path: Option<&Path>) -> GateResult<Self> {
        let file = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));

        let mut config = match file {
            Some(file) => {
                info!("Loading gate config from {}", file.display());
                let raw = std::fs::read_to_string(&file).map_err(|source| GateError::ConfigRead {
                    path: file.clone(),
                    source,
                })?;
                Self::from_json(&raw)?
            }
            None => {
                debug!("No config file, using defaults");
                Self::default()
            }
        };

        if let Ok(ttl) = std::env::var(SESSION_TTL_ENV) {
            config.session_ttl_secs = ttl.trim().parse().map_err(|_| {
                GateError::InvalidConfig(format!("{} must be an integer, got '{}'", SESSION_TTL_ENV, ttl))
            })?;
            debug!("Session TTL overridden to {}s", config.session_ttl_secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document. Missing fields keep their defaults.
    pub fn from_json(raw: &str) -> GateResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reject configurations the gate cannot enforce
    pub fn validate(&self) -> GateResult<()> {
        if self.session_ttl_secs <= 0 {
            return Err(GateError::InvalidConfig(format!(
                "session_ttl_secs must be positive, got {}",
                self.session_ttl_secs
            )));
        }
        if self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(GateError::InvalidConfig(format!(
                "session_ttl_secs must be at most {}, got {}",
                MAX_SESSION_TTL_SECS, self.session_ttl_secs
            )));
        }

        if self.keys.is_empty() {
            return Err(GateError::InvalidConfig("no keys configured".into()));
        }

        let mut all_keys = self.keys.free.iter().chain(self.keys.premium.iter());
        if all_keys.any(|k| KeyRegistry::normalize(k).is_empty()) {
            return Err(GateError::InvalidConfig("blank key in registry".into()));
        }

        let overlap = self.keys.overlapping_keys();
        if !overlap.is_empty() {
            return Err(GateError::InvalidConfig(format!(
                "keys listed under both tiers: {}",
                overlap.join(", ")
            )));
        }

        let pages = &self.pages;
        if pages.landing_page == pages.blocked_page {
            return Err(GateError::InvalidConfig(
                "landing and blocked pages must differ".into(),
            ));
        }

        let gated_landing = pages
            .free_pages
            .iter()
            .chain(pages.premium_pages.iter())
            .find(|p| pages.is_landing(p));
        if let Some(page) = gated_landing {
            return Err(GateError::InvalidConfig(format!(
                "'{}' is a landing page and cannot be tier-gated",
                page
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session_ttl_secs, 1800);
        assert_eq!(config.checksum_salt, "purge_secret_2025");
        assert_eq!(config.delays.validate_ms, 300);
        assert_eq!(config.delays.granted_ms, 1200);
        assert_eq!(config.delays.overlay_fade_ms, 800);
        assert_eq!(config.delays.announcement_ms, 800);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = GateConfig::from_json(r#"{ "session_ttl_secs": 60, "delays": { "validate_ms": 0 } }"#)
            .unwrap();
        assert_eq!(config.session_ttl_secs, 60);
        assert_eq!(config.delays.validate_ms, 0);
        assert_eq!(config.delays.granted_ms, 1200);
        assert_eq!(config.keys, KeyRegistry::default());
    }

    #[test]
    fn test_bad_json() {
        let err = GateConfig::from_json("{ nope").unwrap_err();
        assert!(matches!(err, GateError::ConfigParse(_)));
    }

    #[test]
    fn test_rejects_nonpositive_ttl() {
        let config = GateConfig {
            session_ttl_secs: 0,
            ..GateConfig::default()
        };
        assert!(matches!(config.validate(), Err(GateError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_oversized_ttl() {
        let config = GateConfig {
            session_ttl_secs: 92_233_720_368_547_758,
            ..GateConfig::default()
        };
        assert!(matches!(config.validate(), Err(GateError::InvalidConfig(_))));

        let config = GateConfig {
            session_ttl_secs: MAX_SESSION_TTL_SECS,
            ..GateConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_key_in_both_tiers() {
        let mut config = GateConfig::default();
        config.keys.free.push("unhiin".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("UNHIIN"));
    }

    #[test]
    fn test_rejects_blank_key() {
        let mut config = GateConfig::default();
        config.keys.premium.push("   ".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_gated_landing_page() {
        let mut config = GateConfig::default();
        config.pages.premium_pages.push("blocked.html".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.json");
        std::fs::write(&path, r#"{ "checksum_salt": "pepper" }"#).unwrap();

        let config = GateConfig::load(Some(&path)).unwrap();
        assert_eq!(config.checksum_salt, "pepper");
    }

    #[test]
    fn test_load_missing_file() {
        let err = GateConfig::load(Some(Path::new("/definitely/not/here.json"))).unwrap_err();
        assert!(matches!(err, GateError::ConfigRead { .. }));
    }

    #[test]
    fn test_flow_delay_durations() {
        let delays = FlowDelays::default();
        assert_eq!(delays.validate(), Duration::from_millis(300));
        assert_eq!(FlowDelays::none().announcement(), Duration::ZERO);
    }
}
