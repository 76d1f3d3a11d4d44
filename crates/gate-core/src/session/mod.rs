//! ============================================================================
//! Session Module - Per-tab authorization state
//! ============================================================================
//! One record per browser tab, living only as long as the tab's storage.
//!
//! ## Stored fields
//! - `purge_auth`: `authenticated` while a session exists
//! - `purge_auth_level`: `free` or `premium`
//! - `purge_auth_key`: the key as typed (trimmed)
//! - `purge_auth_timestamp`: issue time, ms since epoch
//! - `purge_auth_hash`: tamper stamp over the other fields
//!
//! ## Usage
//! ```rust,ignore
//! use gate_core::session::{MemoryStorage, SessionStore, DEFAULT_SALT};
//!
//! let store = SessionStore::new(MemoryStorage::new(), 30 * 60, DEFAULT_SALT);
//! store.save("IMPOOR", AccessTier::Free)?;
//! let session = store.load()?;
//! ```
//! ============================================================================

mod checksum;
mod storage;
mod store;

pub use checksum::{rolling_hash, session_checksum, DEFAULT_SALT};
pub use storage::{MemoryStorage, TabStorage};
pub use store::{
    Clock, ManualClock, Session, SessionStatus, SessionStore, SystemClock, AUTH_FIELD,
    AUTH_MARKER, DEFAULT_SESSION_TTL_SECS, HASH_FIELD, KEY_FIELD, LEVEL_FIELD,
    MAX_SESSION_TTL_SECS, TIMESTAMP_FIELD,
};
