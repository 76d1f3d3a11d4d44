//! ============================================================================
//! Announcement Presenter - One dialog per authorized session
//! ============================================================================
//! Shown after a successful key entry. Dismissed by the OK button, a click
//! on the backdrop, or Escape, and only while it is up.
//! ============================================================================

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::session::TabStorage;
use crate::surface::{Component, Surface};

/// Tab storage flag set once the announcement has been shown
pub const SHOWN_FIELD: &str = "purge_announcement_shown";

/// Key that dismisses the dialog
pub const CANCEL_KEY: &str = "Escape";

/// User input while the announcement may be up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementInput {
    /// OK button
    Acknowledge,
    /// Click somewhere; `on_backdrop` when the target is the modal itself
    /// rather than its content
    Click { on_backdrop: bool },
    Key(String),
}

/// Result of asking for the announcement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowOutcome {
    Shown,
    /// Already shown in this session
    AlreadyShown,
    /// The page has no announcement dialog
    Unavailable,
}

pub struct AnnouncementPresenter {
    visible: bool,
    delay: Duration,
}

impl AnnouncementPresenter {
    pub fn new(delay: Duration) -> Self {
        Self {
            visible: false,
            delay,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Show the dialog after the post-authorization delay, unless this
    /// session has already seen it
    pub async fn present<S, U>(&mut self, storage: &S, surface: &mut U) -> Result<ShowOutcome>
    where
        S: TabStorage + ?Sized,
        U: Surface + ?Sized,
    {
        if !surface.has(Component::AnnouncementModal) || !surface.has(Component::AnnouncementOk) {
            warn!("Announcement elements not found");
            return Ok(ShowOutcome::Unavailable);
        }

        if storage.get_item(SHOWN_FIELD)?.as_deref() == Some("true") {
            debug!("Announcement already shown this session");
            return Ok(ShowOutcome::AlreadyShown);
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        surface.show_announcement();
        self.visible = true;
        storage.set_item(SHOWN_FIELD, "true")?;
        info!("Announcement shown");

        Ok(ShowOutcome::Shown)
    }

    /// Apply an input; returns true if it closed the dialog
    pub fn handle<U: Surface + ?Sized>(&mut self, input: &AnnouncementInput, surface: &mut U) -> bool {
        if !self.visible {
            return false;
        }

        let dismiss = match input {
            AnnouncementInput::Acknowledge => true,
            AnnouncementInput::Click { on_backdrop } => *on_backdrop,
            AnnouncementInput::Key(key) => key == CANCEL_KEY,
        };

        if dismiss {
            surface.hide_announcement();
            self.visible = false;
            debug!("Announcement dismissed via {:?}", input);
        }
        dismiss
    }
}
