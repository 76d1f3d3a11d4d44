//! ============================================================================
//! Auth Flow - Landing page key prompt
//! ============================================================================
//! The landing page sequence as one linear async run:
//!
//! ```text
//! init_landing ─┬─ session ok ──► hide overlay ──► unlock categories
//!               └─ no session ──► show overlay ──► (await key)
//!
//! submit_key ──► Validating ──► Granted ──► FadingOverlay ──► Unlocking ──► Announcing
//!                    └─ invalid: status + shake, nothing stored
//! ```
//!
//! Stage pauses come from `FlowDelays` and are cosmetic; zero runs the
//! whole sequence immediately.
//! ============================================================================

use anyhow::Result;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::access::{AccessGate, AccessTier};
use crate::announcement::{AnnouncementInput, AnnouncementPresenter, ShowOutcome};
use crate::config::FlowDelays;
use crate::session::TabStorage;
use crate::surface::{Component, StatusKind, Surface};

/// Status shown when the key input is blank
pub const EMPTY_KEY_MESSAGE: &str = "Please enter a key";

/// Status shown for an unknown key
pub const INVALID_KEY_MESSAGE: &str = "Invalid key. Try: IMPOOR (free)";

/// Named stages of a successful submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    Validating,
    Granted,
    FadingOverlay,
    Unlocking,
    Announcing,
}

/// Result of loading the landing page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandingOutcome {
    /// The page has no auth overlay
    Unavailable,
    AlreadyAuthenticated(AccessTier),
    AwaitingKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    Invalid,
}

/// Result of submitting a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Granted {
        tier: AccessTier,
        announcement: ShowOutcome,
    },
    Rejected(Rejection),
}

/// Message shown once a key is accepted
pub fn granted_message(tier: AccessTier) -> String {
    format!("✅ {} access granted!", tier.display_name())
}

pub struct AuthFlow<'g, S> {
    gate: &'g AccessGate<S>,
    presenter: AnnouncementPresenter,
    delays: FlowDelays,
}

impl<'g, S: TabStorage> AuthFlow<'g, S> {
    pub fn new(gate: &'g AccessGate<S>) -> Self {
        let delays = gate.config().delays;
        Self {
            gate,
            presenter: AnnouncementPresenter::new(delays.announcement()),
            delays,
        }
    }

    /// Landing page load
    pub async fn init_landing<U: Surface + ?Sized>(&mut self, surface: &mut U) -> Result<LandingOutcome> {
        if !surface.has(Component::AuthOverlay) {
            error!("Auth overlay not found");
            return Ok(LandingOutcome::Unavailable);
        }

        if let Some(session) = self.gate.check_session()? {
            info!("Already authenticated as {}, hiding overlay", session.tier);
            surface.hide_overlay();
            self.unlock_categories(session.tier, surface);
            return Ok(LandingOutcome::AlreadyAuthenticated(session.tier));
        }

        surface.show_overlay();
        debug!("Auth overlay shown");
        Ok(LandingOutcome::AwaitingKey)
    }

    /// Key submitted from the overlay
    pub async fn submit_key<U: Surface + ?Sized>(&mut self, input: &str, surface: &mut U) -> Result<SubmitOutcome> {
        let key = input.trim();
        if key.is_empty() {
            show_status(surface, EMPTY_KEY_MESSAGE, StatusKind::Error);
            return Ok(SubmitOutcome::Rejected(Rejection::Empty));
        }

        set_loading(surface, true);
        enter(FlowStage::Validating, self.delays.validate()).await;

        let Some(session) = self.gate.login(key)? else {
            info!("Rejected key submission");
            show_status(surface, INVALID_KEY_MESSAGE, StatusKind::Error);
            set_loading(surface, false);
            if surface.has(Component::KeyInput) {
                surface.shake_input();
            }
            return Ok(SubmitOutcome::Rejected(Rejection::Invalid));
        };

        let tier = session.tier;
        show_status(surface, &granted_message(tier), StatusKind::Success);
        set_loading(surface, false);
        enter(FlowStage::Granted, self.delays.granted()).await;

        if surface.has(Component::AuthOverlay) {
            surface.fade_overlay();
        }
        enter(FlowStage::FadingOverlay, self.delays.overlay_fade()).await;
        if surface.has(Component::AuthOverlay) {
            surface.hide_overlay();
        }

        enter(FlowStage::Unlocking, Duration::ZERO).await;
        self.unlock_categories(tier, surface);

        enter(FlowStage::Announcing, Duration::ZERO).await;
        let announcement = self
            .presenter
            .present(self.gate.store().storage(), surface)
            .await?;

        Ok(SubmitOutcome::Granted { tier, announcement })
    }

    /// Unlock every category tile, dimming the ones `tier` cannot open.
    /// Returns the number of tiles touched.
    pub fn unlock_categories<U: Surface + ?Sized>(&self, tier: AccessTier, surface: &mut U) -> usize {
        info!("Unlocking categories for {}", tier);
        let links = surface.category_links();
        let plan = self.gate.config().pages.unlock_plan(tier, &links);
        for unlock in &plan {
            surface.unlock_category(unlock);
        }
        plan.len()
    }

    /// Route user input to the announcement dialog
    pub fn handle_announcement<U: Surface + ?Sized>(&mut self, input: &AnnouncementInput, surface: &mut U) -> bool {
        self.presenter.handle(input, surface)
    }

    pub fn announcement_visible(&self) -> bool {
        self.presenter.is_visible()
    }
}

async fn enter(stage: FlowStage, pause: Duration) {
    debug!("Flow stage: {:?}", stage);
    if !pause.is_zero() {
        tokio::time::sleep(pause).await;
    }
}

fn show_status<U: Surface + ?Sized>(surface: &mut U, message: &str, kind: StatusKind) {
    if surface.has(Component::StatusLine) {
        surface.show_status(message, kind);
    }
}

fn set_loading<U: Surface + ?Sized>(surface: &mut U, loading: bool) {
    if surface.has(Component::SubmitButton) {
        surface.set_submit_loading(loading);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use crate::policy::PREMIUM_HINT;
    use crate::surface::{RecordingSurface, SurfaceEvent};

    fn gate() -> AccessGate<crate::session::MemoryStorage> {
        AccessGate::in_memory(GateConfig {
            delays: FlowDelays::none(),
            ..GateConfig::default()
        })
    }

    fn surface() -> RecordingSurface {
        RecordingSurface::full(vec!["games.html".into(), "tools.html".into(), "apps.html".into()])
    }

    fn unlocked(events: &[SurfaceEvent]) -> Vec<(String, bool)> {
        events
            .iter()
            .filter_map(|e| match e {
                SurfaceEvent::CategoryUnlocked(u) => Some((u.category.clone(), u.restricted)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_landing_without_session_shows_overlay() {
        let gate = gate();
        let mut flow = AuthFlow::new(&gate);
        let mut surface = surface();

        let outcome = flow.init_landing(&mut surface).await.unwrap();
        assert_eq!(outcome, LandingOutcome::AwaitingKey);
        assert_eq!(surface.events(), &[SurfaceEvent::OverlayShown]);
    }

    #[tokio::test]
    async fn test_landing_with_session_unlocks() {
        let gate = gate();
        gate.login("UNHIIN").unwrap();
        let mut flow = AuthFlow::new(&gate);
        let mut surface = surface();

        let outcome = flow.init_landing(&mut surface).await.unwrap();
        assert_eq!(outcome, LandingOutcome::AlreadyAuthenticated(AccessTier::Premium));
        assert_eq!(surface.events()[0], SurfaceEvent::OverlayHidden);
        assert_eq!(
            unlocked(surface.events()),
            vec![("games".into(), false), ("tools".into(), false), ("apps".into(), false)]
        );
    }

    #[tokio::test]
    async fn test_landing_without_overlay_is_noop() {
        let gate = gate();
        let mut flow = AuthFlow::new(&gate);
        let mut surface = surface().without(Component::AuthOverlay);

        assert_eq!(flow.init_landing(&mut surface).await.unwrap(), LandingOutcome::Unavailable);
        assert!(surface.events().is_empty());
    }

    #[tokio::test]
    async fn test_empty_key() {
        let gate = gate();
        let mut flow = AuthFlow::new(&gate);
        let mut surface = surface();

        let outcome = flow.submit_key("   ", &mut surface).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Rejected(Rejection::Empty));
        assert_eq!(
            surface.events(),
            &[SurfaceEvent::Status {
                message: EMPTY_KEY_MESSAGE.into(),
                kind: StatusKind::Error
            }]
        );
    }

    #[tokio::test]
    async fn test_invalid_key_stores_nothing() {
        let gate = gate();
        let mut flow = AuthFlow::new(&gate);
        let mut surface = surface();

        let outcome = flow.submit_key("letmein", &mut surface).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Rejected(Rejection::Invalid));
        assert!(gate.store().storage().is_empty());
        assert_eq!(
            surface.events(),
            &[
                SurfaceEvent::SubmitLoading { loading: true },
                SurfaceEvent::Status {
                    message: INVALID_KEY_MESSAGE.into(),
                    kind: StatusKind::Error
                },
                SurfaceEvent::SubmitLoading { loading: false },
                SurfaceEvent::InputShaken,
            ]
        );
    }

    #[tokio::test]
    async fn test_free_key_full_sequence() {
        let gate = gate();
        let mut flow = AuthFlow::new(&gate);
        let mut surface = surface();

        let outcome = flow.submit_key(" impoor ", &mut surface).await.unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Granted {
                tier: AccessTier::Free,
                announcement: ShowOutcome::Shown
            }
        );

        let events = surface.events();
        assert_eq!(events[0], SurfaceEvent::SubmitLoading { loading: true });
        assert_eq!(
            events[1],
            SurfaceEvent::Status {
                message: "✅ Free access granted!".into(),
                kind: StatusKind::Success
            }
        );
        assert_eq!(events[2], SurfaceEvent::SubmitLoading { loading: false });
        assert_eq!(events[3], SurfaceEvent::OverlayFading);
        assert_eq!(events[4], SurfaceEvent::OverlayHidden);
        assert_eq!(events.last(), Some(&SurfaceEvent::AnnouncementShown));

        assert_eq!(
            unlocked(events),
            vec![("games".into(), false), ("tools".into(), true), ("apps".into(), true)]
        );
        let hints: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SurfaceEvent::CategoryUnlocked(u) => u.hint.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(hints, vec![PREMIUM_HINT.to_string(), PREMIUM_HINT.to_string()]);

        let session = gate.check_session().unwrap().unwrap();
        assert_eq!((session.key.as_str(), session.tier), ("impoor", AccessTier::Free));
    }

    #[tokio::test]
    async fn test_premium_key_message() {
        let gate = gate();
        let mut flow = AuthFlow::new(&gate);
        let mut surface = surface();

        flow.submit_key("SOSAPARTY", &mut surface).await.unwrap();
        assert!(surface.events().contains(&SurfaceEvent::Status {
            message: "✅ Premium access granted!".into(),
            kind: StatusKind::Success
        }));
    }

    #[tokio::test]
    async fn test_second_login_does_not_repeat_announcement() {
        let gate = gate();
        let mut flow = AuthFlow::new(&gate);
        let mut surface = surface();

        flow.submit_key("IMPOOR", &mut surface).await.unwrap();
        assert!(flow.handle_announcement(&AnnouncementInput::Acknowledge, &mut surface));

        let outcome = flow.submit_key("UNHIIN", &mut surface).await.unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Granted {
                tier: AccessTier::Premium,
                announcement: ShowOutcome::AlreadyShown
            }
        );
    }

    #[tokio::test]
    async fn test_escape_closes_announcement() {
        let gate = gate();
        let mut flow = AuthFlow::new(&gate);
        let mut surface = surface();

        flow.submit_key("IMPOOR", &mut surface).await.unwrap();
        assert!(flow.announcement_visible());
        assert!(!flow.handle_announcement(&AnnouncementInput::Click { on_backdrop: false }, &mut surface));
        assert!(flow.handle_announcement(&AnnouncementInput::Key("Escape".into()), &mut surface));
        assert!(!flow.announcement_visible());
    }

    #[tokio::test]
    async fn test_missing_optional_components_still_grant() {
        let gate = gate();
        let mut flow = AuthFlow::new(&gate);
        let mut surface = RecordingSurface::empty();

        let outcome = flow.submit_key("IMPOOR", &mut surface).await.unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Granted {
                tier: AccessTier::Free,
                announcement: ShowOutcome::Unavailable
            }
        );
        assert!(surface.events().is_empty());
        assert!(gate.check_session().unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_delays_elapse_in_order() {
        let gate = AccessGate::in_memory(GateConfig::default());
        let mut flow = AuthFlow::new(&gate);
        let mut surface = surface();

        let started = tokio::time::Instant::now();
        flow.submit_key("IMPOOR", &mut surface).await.unwrap();
        // 300 validate + 1200 granted + 800 fade + 800 announcement
        assert_eq!(started.elapsed(), Duration::from_millis(3100));
    }
}
