//! ============================================================================
//! Session Store - Authorization record for one tab
//! ============================================================================
//! Writes and reads the five `purge_auth*` fields. A record is never edited
//! in place: it is replaced by `save` or removed by `clear`.
//! ============================================================================

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::checksum::session_checksum;
use super::storage::TabStorage;
use crate::access::AccessTier;

/// Storage field names
pub const AUTH_FIELD: &str = "purge_auth";
pub const LEVEL_FIELD: &str = "purge_auth_level";
pub const KEY_FIELD: &str = "purge_auth_key";
pub const TIMESTAMP_FIELD: &str = "purge_auth_timestamp";
pub const HASH_FIELD: &str = "purge_auth_hash";

/// Value of the auth marker field for a live session
pub const AUTH_MARKER: &str = "authenticated";

/// Default session lifetime (30 minutes)
pub const DEFAULT_SESSION_TTL_SECS: i64 = 30 * 60;

/// Largest lifetime whose millisecond form fits in an `i64`
pub const MAX_SESSION_TTL_SECS: i64 = i64::MAX / 1000;

fn ttl_millis(ttl_secs: i64) -> i64 {
    ttl_secs.saturating_mul(1000)
}

/// Source of wall-clock time in milliseconds since the epoch
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Real time via chrono
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Settable clock for tests and replays
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.now_ms.fetch_add(secs * 1000, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// A validated key's record for this tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub tier: AccessTier,
    pub key: String,
    /// Milliseconds since the epoch
    pub issued_at: i64,
    pub checksum: String,
}

impl Session {
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.issued_at)
    }

    pub fn expires_at(&self, ttl_secs: i64) -> i64 {
        self.issued_at.saturating_add(ttl_millis(ttl_secs))
    }
}

/// What the tab currently holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Marker or a field is missing
    Absent,
    /// Older than the session lifetime, or the timestamp does not parse
    Expired,
    /// Fields present but they do not agree with each other
    Tampered(String),
    Active(Session),
}

/// Reads and writes the session record of one tab
pub struct SessionStore<S> {
    storage: S,
    clock: Arc<dyn Clock>,
    ttl_secs: i64,
    salt: String,
}

impl<S: TabStorage> SessionStore<S> {
    /// Store on real time
    pub fn new(storage: S, ttl_secs: i64, salt: impl Into<String>) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock), ttl_secs, salt)
    }

    pub fn with_clock(
        storage: S,
        clock: Arc<dyn Clock>,
        ttl_secs: i64,
        salt: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            clock,
            ttl_secs,
            salt: salt.into(),
        }
    }

    /// Write a fresh record stamped with the current time
    pub fn save(&self, key: &str, tier: AccessTier) -> Result<Session> {
        let issued_at = self.clock.now_millis();
        let checksum = session_checksum(key, tier, issued_at, &self.salt);

        self.storage.set_item(AUTH_FIELD, AUTH_MARKER)?;
        self.storage.set_item(LEVEL_FIELD, tier.as_str())?;
        self.storage.set_item(KEY_FIELD, key)?;
        self.storage.set_item(TIMESTAMP_FIELD, &issued_at.to_string())?;
        self.storage.set_item(HASH_FIELD, &checksum)?;

        info!("Session saved: {} ({})", tier, key);

        Ok(Session {
            tier,
            key: key.to_string(),
            issued_at,
            checksum,
        })
    }

    /// Classify the stored record. Does not modify storage.
    pub fn inspect(&self) -> Result<SessionStatus> {
        let auth = self.storage.get_item(AUTH_FIELD)?;
        let level = self.storage.get_item(LEVEL_FIELD)?;
        let key = self.storage.get_item(KEY_FIELD)?;
        let timestamp = self.storage.get_item(TIMESTAMP_FIELD)?;
        let hash = self.storage.get_item(HASH_FIELD)?;

        let (Some(auth), Some(level), Some(key), Some(timestamp), Some(hash)) =
            (auth, level, key, timestamp, hash)
        else {
            return Ok(SessionStatus::Absent);
        };

        if auth != AUTH_MARKER
            || level.is_empty()
            || key.is_empty()
            || timestamp.is_empty()
            || hash.is_empty()
        {
            return Ok(SessionStatus::Absent);
        }

        let issued_at = match timestamp.trim().parse::<i64>() {
            Ok(ts) => ts,
            Err(_) => {
                debug!("Unparseable session timestamp '{}'", timestamp);
                return Ok(SessionStatus::Expired);
            }
        };

        // A timestamp far enough from now to overflow the age is corrupt
        let Some(age_ms) = self.clock.now_millis().checked_sub(issued_at) else {
            debug!("Session timestamp {} out of range", issued_at);
            return Ok(SessionStatus::Expired);
        };
        if age_ms > ttl_millis(self.ttl_secs) {
            return Ok(SessionStatus::Expired);
        }

        let Some(tier) = AccessTier::parse(&level) else {
            return Ok(SessionStatus::Tampered(format!("unknown tier '{}'", level)));
        };

        if session_checksum(&key, tier, issued_at, &self.salt) != hash {
            return Ok(SessionStatus::Tampered("checksum mismatch".into()));
        }

        Ok(SessionStatus::Active(Session {
            tier,
            key,
            issued_at,
            checksum: hash,
        }))
    }

    /// Wipe the tab
    pub fn clear(&self) -> Result<()> {
        self.storage.clear()?;
        debug!("Session storage cleared");
        Ok(())
    }

    /// Clear if the record is unusable, returning the live session if any
    pub fn load(&self) -> Result<Option<Session>> {
        match self.inspect()? {
            SessionStatus::Active(session) => Ok(Some(session)),
            SessionStatus::Absent => Ok(None),
            SessionStatus::Expired => {
                info!("Session expired");
                self.clear()?;
                Ok(None)
            }
            SessionStatus::Tampered(reason) => {
                warn!("Session rejected: {}", reason);
                self.clear()?;
                Ok(None)
            }
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::checksum::DEFAULT_SALT;
    use crate::session::storage::MemoryStorage;

    const T0: i64 = 1_700_000_000_000;

    fn store() -> (SessionStore<MemoryStorage>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        let store = SessionStore::with_clock(
            MemoryStorage::new(),
            clock.clone(),
            DEFAULT_SESSION_TTL_SECS,
            DEFAULT_SALT,
        );
        (store, clock)
    }

    #[test]
    fn test_save_writes_all_fields() {
        let (store, _) = store();
        store.save("IMPOOR", AccessTier::Free).unwrap();

        let storage = store.storage();
        assert_eq!(storage.get_item(AUTH_FIELD).unwrap().as_deref(), Some(AUTH_MARKER));
        assert_eq!(storage.get_item(LEVEL_FIELD).unwrap().as_deref(), Some("free"));
        assert_eq!(storage.get_item(KEY_FIELD).unwrap().as_deref(), Some("IMPOOR"));
        assert_eq!(
            storage.get_item(TIMESTAMP_FIELD).unwrap().as_deref(),
            Some("1700000000000")
        );
        assert_eq!(storage.get_item(HASH_FIELD).unwrap().as_deref(), Some("kp9wgj"));
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let (store, _) = store();
        let saved = store.save("sosaparty", AccessTier::Premium).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert_eq!((loaded.key.as_str(), loaded.tier), ("sosaparty", AccessTier::Premium));
    }

    #[test]
    fn test_expiry_window() {
        let (store, clock) = store();
        store.save("IMPOOR", AccessTier::Free).unwrap();

        clock.advance_secs(29 * 60);
        assert!(store.load().unwrap().is_some());

        clock.set(T0 + 30 * 60 * 1000);
        assert!(store.load().unwrap().is_some(), "exactly at the limit is still valid");

        clock.set(T0 + 31 * 60 * 1000);
        assert!(store.load().unwrap().is_none());
        assert!(store.storage().is_empty(), "expired session must be cleared");
    }

    #[test]
    fn test_missing_field_is_absent_and_not_cleared() {
        let (store, _) = store();
        store.save("IMPOOR", AccessTier::Free).unwrap();
        store.storage().remove_item(HASH_FIELD).unwrap();

        assert_eq!(store.inspect().unwrap(), SessionStatus::Absent);
        assert!(store.load().unwrap().is_none());
        assert_eq!(store.storage().len(), 4);
    }

    #[test]
    fn test_wrong_marker_is_absent() {
        let (store, _) = store();
        store.save("IMPOOR", AccessTier::Free).unwrap();
        store.storage().set_item(AUTH_FIELD, "yes").unwrap();
        assert_eq!(store.inspect().unwrap(), SessionStatus::Absent);
    }

    #[test]
    fn test_garbage_timestamp_is_expired() {
        let (store, _) = store();
        store.save("IMPOOR", AccessTier::Free).unwrap();
        store.storage().set_item(TIMESTAMP_FIELD, "soon").unwrap();

        assert_eq!(store.inspect().unwrap(), SessionStatus::Expired);
        assert!(store.load().unwrap().is_none());
        assert!(store.storage().is_empty());
    }

    #[test]
    fn test_extreme_timestamps_are_cleared() {
        for stamp in [i64::MIN.to_string(), i64::MAX.to_string()] {
            let (store, _) = store();
            store.save("IMPOOR", AccessTier::Free).unwrap();
            store.storage().set_item(TIMESTAMP_FIELD, &stamp).unwrap();

            assert!(store.load().unwrap().is_none(), "timestamp {}", stamp);
            assert!(store.storage().is_empty(), "timestamp {}", stamp);
        }
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let clock = Arc::new(ManualClock::new(T0));
        let store = SessionStore::with_clock(
            MemoryStorage::new(),
            clock.clone(),
            i64::MAX / 100,
            DEFAULT_SALT,
        );
        let saved = store.save("IMPOOR", AccessTier::Free).unwrap();

        clock.advance_secs(365 * 24 * 60 * 60);
        assert_eq!(store.load().unwrap(), Some(saved.clone()));
        assert_eq!(saved.expires_at(i64::MAX / 100), i64::MAX);
    }

    #[test]
    fn test_edited_tier_is_tampered() {
        let (store, _) = store();
        store.save("IMPOOR", AccessTier::Free).unwrap();
        store.storage().set_item(LEVEL_FIELD, "premium").unwrap();

        assert!(matches!(store.inspect().unwrap(), SessionStatus::Tampered(_)));
        assert!(store.load().unwrap().is_none());
        assert!(store.storage().is_empty());
    }

    #[test]
    fn test_unknown_tier_is_tampered() {
        let (store, _) = store();
        store.save("IMPOOR", AccessTier::Free).unwrap();
        store.storage().set_item(LEVEL_FIELD, "admin").unwrap();
        assert!(matches!(store.inspect().unwrap(), SessionStatus::Tampered(_)));
    }

    #[test]
    fn test_clear_wipes_whole_tab() {
        let (store, _) = store();
        store.save("IMPOOR", AccessTier::Free).unwrap();
        store.storage().set_item("purge_announcement_shown", "true").unwrap();

        store.clear().unwrap();
        assert!(store.storage().is_empty());
        assert_eq!(store.inspect().unwrap(), SessionStatus::Absent);
    }

    #[test]
    fn test_session_expiry_helpers() {
        let session = Session {
            tier: AccessTier::Free,
            key: "IMPOOR".into(),
            issued_at: T0,
            checksum: "kp9wgj".into(),
        };
        assert_eq!(session.age_ms(T0 + 5_000), 5_000);
        assert_eq!(session.expires_at(DEFAULT_SESSION_TTL_SECS), T0 + 1_800_000);
    }
}
