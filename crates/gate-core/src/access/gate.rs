//! ============================================================================
//! Access Gate - Key validation and page protection
//! ============================================================================
//! Owns the tab's session store together with the key registry and page
//! policy, and answers the questions every page load asks.
//! ============================================================================

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::types::{AccessTier, KeyValidation, PageDecision};
use crate::config::GateConfig;
use crate::policy::page_from_path;
use crate::session::{Clock, MemoryStorage, Session, SessionStore, SystemClock, TabStorage};

/// How a page load is handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    /// Landing or blocked page: runs the key prompt flow
    Landing,
    /// Any other page: runs `protect_page`
    Protected(String),
}

/// Session-backed access gate for one tab
pub struct AccessGate<S> {
    config: GateConfig,
    store: SessionStore<S>,
}

impl AccessGate<MemoryStorage> {
    /// Gate over a fresh in-process tab
    pub fn in_memory(config: GateConfig) -> Self {
        Self::new(config, MemoryStorage::new())
    }
}

impl<S: TabStorage> AccessGate<S> {
    pub fn new(config: GateConfig, storage: S) -> Self {
        Self::with_clock(config, storage, Arc::new(SystemClock))
    }

    pub fn with_clock(config: GateConfig, storage: S, clock: Arc<dyn Clock>) -> Self {
        let store = SessionStore::with_clock(
            storage,
            clock,
            config.session_ttl_secs,
            config.checksum_salt.clone(),
        );
        Self { config, store }
    }

    /// Check a typed key against the registry
    pub fn validate_key(&self, input: &str) -> KeyValidation {
        self.config.keys.validate(input)
    }

    /// Current session, if it is complete, fresh and consistent.
    /// Unusable records are wiped.
    pub fn check_session(&self) -> Result<Option<Session>> {
        let Some(session) = self.store.load()? else {
            debug!("No active session");
            return Ok(None);
        };

        // The tier must follow from the key alone
        if self.config.keys.tier_for(&session.key) != Some(session.tier) {
            warn!(
                "Session tier {} does not match key '{}', clearing",
                session.tier, session.key
            );
            self.store.clear()?;
            return Ok(None);
        }

        debug!("Valid session: {} ({})", session.tier, session.key);
        Ok(Some(session))
    }

    /// Whether `tier` may open `page`
    pub fn can_access_page(&self, tier: Option<AccessTier>, page: &str) -> bool {
        self.config.pages.can_access(tier, page)
    }

    /// Decide a protected page load. Redirects wipe the tab.
    pub fn protect_page(&self, path: &str) -> Result<PageDecision> {
        let page = page_from_path(path);

        if self.config.pages.is_landing(page) {
            debug!("{} - no auth check", page);
            return Ok(PageDecision::Exempt);
        }

        debug!("Checking access for: {}", page);

        let Some(session) = self.check_session()? else {
            info!("No valid session for {} - redirecting to {}", page, self.config.pages.landing_page);
            self.store.clear()?;
            return Ok(PageDecision::RedirectToLanding);
        };

        if !self.can_access_page(Some(session.tier), page) {
            info!(
                "{} cannot access {} - redirecting to {}",
                session.tier, page, self.config.pages.blocked_page
            );
            self.store.clear()?;
            return Ok(PageDecision::RedirectToBlocked);
        }

        info!("Access granted to {}", page);
        Ok(PageDecision::Allow(session.tier))
    }

    /// Which flow a page load at `path` runs
    pub fn classify(&self, path: &str) -> PageKind {
        let page = page_from_path(path);
        if self.config.pages.is_landing(page) {
            PageKind::Landing
        } else {
            PageKind::Protected(page.to_string())
        }
    }

    /// Validate and, on success, start a session with the trimmed key
    pub fn login(&self, input: &str) -> Result<Option<Session>> {
        let validation = self.validate_key(input);
        match validation.tier {
            Some(tier) if validation.valid => {
                let session = self.store.save(input.trim(), tier)?;
                Ok(Some(session))
            }
            _ => Ok(None),
        }
    }

    /// Explicit sign-out
    pub fn logout(&self) -> Result<()> {
        self.store.clear()?;
        info!("Session cleared");
        Ok(())
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore<S> {
        &self.store
    }
}
