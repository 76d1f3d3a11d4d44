//! ============================================================================
//! GATE-CORE: /Purge access gate
//! ============================================================================
//! This crate handles the logic behind the site's key prompt:
//! - Key registry and page policy for the free and premium tiers
//! - Per-tab session records with expiry and a tamper stamp
//! - Landing page flow and the one-time announcement dialog
//! - redb-backed simulated tabs for the command line harness
//! ============================================================================

pub mod access;
pub mod announcement;
pub mod config;
pub mod db;
pub mod flow;
pub mod policy;
pub mod session;
pub mod surface;
pub mod types;

// Re-export main types for convenience
pub use access::{AccessGate, AccessTier, KeyValidation, PageDecision, PageKind};
pub use announcement::{AnnouncementInput, AnnouncementPresenter, ShowOutcome};
pub use config::{FlowDelays, GateConfig};
pub use db::{DbTab, TabDb, TabInfo};
pub use flow::{AuthFlow, LandingOutcome, Rejection, SubmitOutcome};
pub use policy::{page_from_path, CategoryUnlock, PagePolicy};
pub use session::{Session, SessionStatus, SessionStore, TabStorage};
pub use surface::{Component, RecordingSurface, StatusKind, Surface, SurfaceEvent};
pub use types::{GateError, GateResult};
