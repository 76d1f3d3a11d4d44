//! ============================================================================
//! Key Registry - Static key lists per access tier
//! ============================================================================
//! Keys are compared after trimming and uppercasing. These lists ship with
//! the site, so anyone reading the page source can see them.
//! ============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{AccessTier, KeyValidation};

/// Free tier keys
pub const FREE_KEYS: &[&str] = &["IMPOOR"];

/// Premium tier keys
pub const PREMIUM_KEYS: &[&str] = &["CHARLESISPOOR", "UNHIIN", "SOSAPARTY"];

/// Static mapping from key to tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRegistry {
    pub free: Vec<String>,
    pub premium: Vec<String>,
}

impl Default for KeyRegistry {
    fn default() -> Self {
        Self {
            free: FREE_KEYS.iter().map(|k| k.to_string()).collect(),
            premium: PREMIUM_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl KeyRegistry {
    /// Canonical form a typed key is matched in
    pub fn normalize(input: &str) -> String {
        input.trim().to_uppercase()
    }

    /// Tier for a key, exact match only. Premium wins if listed in both.
    pub fn tier_for(&self, input: &str) -> Option<AccessTier> {
        let key = Self::normalize(input);
        if key.is_empty() {
            return None;
        }

        if self.premium.iter().any(|k| Self::normalize(k) == key) {
            return Some(AccessTier::Premium);
        }
        if self.free.iter().any(|k| Self::normalize(k) == key) {
            return Some(AccessTier::Free);
        }
        None
    }

    /// Validate a typed key
    pub fn validate(&self, input: &str) -> KeyValidation {
        match self.tier_for(input) {
            Some(tier) => {
                debug!("Key accepted for {} tier", tier);
                KeyValidation::granted(tier)
            }
            None => {
                debug!("Key rejected");
                KeyValidation::rejected()
            }
        }
    }

    /// Keys listed under more than one tier
    pub fn overlapping_keys(&self) -> Vec<String> {
        self.free
            .iter()
            .map(|k| Self::normalize(k))
            .filter(|k| self.premium.iter().any(|p| Self::normalize(p) == *k))
            .collect()
    }

    /// Total number of keys across tiers
    pub fn len(&self) -> usize {
        self.free.len() + self.premium.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
