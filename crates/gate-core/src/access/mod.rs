//! ============================================================================
//! Access Module - Key-gated access control for /Purge
//! ============================================================================
//! Turns a typed key into an access tier and enforces that tier on every
//! protected page load.
//!
//! ## Tiers
//! - **Free**: `IMPOOR` - games only
//! - **Premium**: `CHARLESISPOOR`, `UNHIIN`, `SOSAPARTY` - every page
//!
//! The keys ship inside the site, so this is a convenience gate rather than
//! access control.
//!
//! ## Usage
//! ```rust,ignore
//! use gate_core::access::AccessGate;
//!
//! let gate = AccessGate::in_memory(GateConfig::default());
//! gate.login("impoor")?;
//! let decision = gate.protect_page("tools.html")?; // RedirectToBlocked
//! ```
//! ============================================================================

mod checker;
mod gate;
mod types;

pub use checker::{KeyRegistry, FREE_KEYS, PREMIUM_KEYS};
pub use gate::{AccessGate, PageKind};
pub use types::{AccessTier, KeyValidation, PageDecision};
