//! ============================================================================
//! Surface - What the gate can ask the page to do
//! ============================================================================
//! The page is presentation only. The flow asks whether a component exists
//! before using it and decides itself whether absence matters.
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::policy::CategoryUnlock;

/// Page components the gate talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    AuthOverlay,
    KeyInput,
    SubmitButton,
    StatusLine,
    CategoryGrid,
    AnnouncementModal,
    AnnouncementOk,
}

impl Component {
    pub const ALL: [Component; 7] = [
        Component::AuthOverlay,
        Component::KeyInput,
        Component::SubmitButton,
        Component::StatusLine,
        Component::CategoryGrid,
        Component::AnnouncementModal,
        Component::AnnouncementOk,
    ];
}

/// Tone of the status line under the key input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Success,
    Error,
}

/// Presentation operations used by the landing flow and the announcement
pub trait Surface {
    /// Capability check: is the component on this page
    fn has(&self, component: Component) -> bool;

    fn show_overlay(&mut self);
    fn fade_overlay(&mut self);
    fn hide_overlay(&mut self);

    fn set_submit_loading(&mut self, loading: bool);
    fn show_status(&mut self, message: &str, kind: StatusKind);
    fn shake_input(&mut self);

    /// Link targets of the category tiles, in page order
    fn category_links(&self) -> Vec<String>;
    fn unlock_category(&mut self, unlock: &CategoryUnlock);

    fn show_announcement(&mut self);
    fn hide_announcement(&mut self);
}

/// One call made against a `RecordingSurface`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum SurfaceEvent {
    OverlayShown,
    OverlayFading,
    OverlayHidden,
    SubmitLoading { loading: bool },
    Status { message: String, kind: StatusKind },
    InputShaken,
    CategoryUnlocked(CategoryUnlock),
    AnnouncementShown,
    AnnouncementHidden,
}

/// Surface that records calls instead of drawing
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    available: HashSet<Component>,
    links: Vec<String>,
    events: Vec<SurfaceEvent>,
}

impl RecordingSurface {
    /// Every component present, with the given category tiles
    pub fn full(links: Vec<String>) -> Self {
        Self {
            available: Component::ALL.into_iter().collect(),
            links,
            events: Vec::new(),
        }
    }

    /// No components at all
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn without(mut self, component: Component) -> Self {
        self.available.remove(&component);
        self
    }

    pub fn events(&self) -> &[SurfaceEvent] {
        &self.events
    }

    /// Hand over the recorded events, leaving the log empty
    pub fn take_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }

    /// Whether the announcement dialog is currently up
    pub fn announcement_visible(&self) -> bool {
        self.events
            .iter()
            .rev()
            .find_map(|e| match e {
                SurfaceEvent::AnnouncementShown => Some(true),
                SurfaceEvent::AnnouncementHidden => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    fn record(&mut self, event: SurfaceEvent) {
        self.events.push(event);
    }
}

impl Surface for RecordingSurface {
    fn has(&self, component: Component) -> bool {
        self.available.contains(&component)
    }

    fn show_overlay(&mut self) {
        self.record(SurfaceEvent::OverlayShown);
    }

    fn fade_overlay(&mut self) {
        self.record(SurfaceEvent::OverlayFading);
    }

    fn hide_overlay(&mut self) {
        self.record(SurfaceEvent::OverlayHidden);
    }

    fn set_submit_loading(&mut self, loading: bool) {
        self.record(SurfaceEvent::SubmitLoading { loading });
    }

    fn show_status(&mut self, message: &str, kind: StatusKind) {
        self.record(SurfaceEvent::Status {
            message: message.to_string(),
            kind,
        });
    }

    fn shake_input(&mut self) {
        self.record(SurfaceEvent::InputShaken);
    }

    fn category_links(&self) -> Vec<String> {
        if self.has(Component::CategoryGrid) {
            self.links.clone()
        } else {
            Vec::new()
        }
    }

    fn unlock_category(&mut self, unlock: &CategoryUnlock) {
        self.record(SurfaceEvent::CategoryUnlocked(unlock.clone()));
    }

    fn show_announcement(&mut self) {
        self.record(SurfaceEvent::AnnouncementShown);
    }

    fn hide_announcement(&mut self) {
        self.record(SurfaceEvent::AnnouncementHidden);
    }
}
