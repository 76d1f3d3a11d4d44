//! ============================================================================
//! Access Types - Key tiers and validation results
//! ============================================================================
//! Defines the access tiers granted by site keys and the outcome of
//! validating a typed key.
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Access tiers granted by a validated key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTier {
    /// Free key - games only
    Free,
    /// Premium key - every protected page
    Premium,
}

impl AccessTier {
    /// Storage representation, also used in the session checksum
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessTier::Free => "free",
            AccessTier::Premium => "premium",
        }
    }

    /// Get human-readable tier name
    pub fn display_name(&self) -> &'static str {
        match self {
            AccessTier::Free => "Free",
            AccessTier::Premium => "Premium",
        }
    }

    /// Parse a stored tier string. Anything unrecognized is no tier at all.
    pub fn parse(level: &str) -> Option<Self> {
        level.parse().ok()
    }

    fn rank(&self) -> u8 {
        match self {
            AccessTier::Free => 1,
            AccessTier::Premium => 2,
        }
    }
}

impl PartialOrd for AccessTier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AccessTier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for AccessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(AccessTier::Free),
            "premium" => Ok(AccessTier::Premium),
            other => Err(format!("Unknown access tier '{}'", other)),
        }
    }
}

/// Result of checking a typed key against the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValidation {
    pub valid: bool,
    pub tier: Option<AccessTier>,
}

impl KeyValidation {
    pub fn granted(tier: AccessTier) -> Self {
        Self {
            valid: true,
            tier: Some(tier),
        }
    }

    pub fn rejected() -> Self {
        Self {
            valid: false,
            tier: None,
        }
    }
}

/// What a protected page load should do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "decision", content = "tier")]
pub enum PageDecision {
    /// Session tier covers the page
    Allow(AccessTier),
    /// The blocked page never checks the session
    Exempt,
    /// No valid session; go back to the landing page
    RedirectToLanding,
    /// Session tier is too low for this page
    RedirectToBlocked,
}

impl PageDecision {
    pub fn is_redirect(&self) -> bool {
        matches!(
            self,
            PageDecision::RedirectToLanding | PageDecision::RedirectToBlocked
        )
    }
}
