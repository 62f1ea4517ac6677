// src/display/output.rs

//! Host-facing lifecycle contract.
//!
//! The windowing layer above this crate drives a fixed sequence:
//! `init` → `create_window` → `create_context` → repeated `swap_buffers`
//! → `release_context` → `uninit`. `KmsOutput` owns the session as an
//! explicit value; there is no global, and misuse shows up as an error
//! from the call that attempted it rather than as a race.

use log::{debug, info};

use crate::config::Config;
use crate::display::error::{AcquireError, ContextError};
use crate::display::session::DisplaySession;

/// Events the host learns about via polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    /// The framebuffer dimensions differ from what the host has cached.
    /// Fires at most once per session, since the mode is fixed at
    /// acquisition time.
    Resize { width: u32, height: u32 },
}

/// The video output driver exposed to the host.
pub struct KmsOutput {
    config: Config,
    session: Option<DisplaySession>,
    /// Dimensions the host is assumed to know about; compared against the
    /// session's in `check_events`.
    host_dims: (u32, u32),
    /// Cosmetic: mirrors other drivers' border toggle even though the
    /// output is borderless by construction.
    border: bool,
}

impl KmsOutput {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session: None,
            host_dims: (0, 0),
            border: false,
        }
    }

    /// Always succeeds; real work is deferred to window and context
    /// creation.
    pub fn init(&mut self) {
        debug!("video output initialized");
    }

    /// Acquires the display. Requested dimensions and flags are ignored:
    /// the display dictates the mode. Fails without touching the existing
    /// session if one is already active.
    pub fn create_window(
        &mut self,
        width: u32,
        height: u32,
        flags: u32,
    ) -> Result<(), AcquireError> {
        if self.session.is_some() {
            return Err(AcquireError::AlreadyActive);
        }
        debug!(
            "ignoring requested geometry {}x{} (flags {:#x}); the display dictates the mode",
            width, height, flags
        );
        self.session = Some(DisplaySession::acquire(&self.config)?);
        Ok(())
    }

    /// Binds the rendering context and presents the initial black frame.
    /// Must follow a successful `create_window`.
    pub fn create_context(&mut self) -> Result<(), ContextError> {
        let session = self.session.as_mut().ok_or(ContextError::NoSession)?;
        session.bind_context()
    }

    /// Presents the current frame. Errors are absorbed by the page-flip
    /// driver; a failed presentation leaves the previous frame on screen.
    pub fn swap_buffers(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.present_frame();
        }
    }

    /// Tears down the rendering context only. The display mode and buffer
    /// ownership survive, so a new context can be bound to the same
    /// session.
    pub fn release_context(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.release_context();
        }
    }

    /// Full teardown in reverse acquisition order: release the context,
    /// restore the original display configuration, return the locked
    /// buffer, deregister framebuffers, then drop surface, device, and
    /// descriptor. Safe after a failed or partial acquisition and safe to
    /// call twice; afterwards `create_window` may run again.
    pub fn uninit(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.release_context();
            session.restore_original_crtc();
            session.front = None;
            let card = session.card.clone();
            session.framebuffers.clear(&card);
            drop(session);
            info!("display session released");
        }
        self.host_dims = (0, 0);
    }

    /// Reports a resize exactly once per session, when the host's cached
    /// dimensions differ from the session's fixed framebuffer size.
    pub fn check_events(&mut self) -> Option<DisplayEvent> {
        let session = self.session.as_ref()?;
        resize_event(&mut self.host_dims, session.size())
    }

    /// Active framebuffer dimensions, or zeroes when no session exists.
    pub fn screen_geometry(&self) -> (u32, u32) {
        self.session
            .as_ref()
            .map(DisplaySession::size)
            .unwrap_or((0, 0))
    }

    /// Cosmetic no-op: the surface is borderless by construction, but the
    /// toggle is tracked to mirror other drivers' visible behavior.
    pub fn toggle_border(&mut self) {
        self.border = !self.border;
        debug!("border toggled to {} (cosmetic only)", self.border);
    }

    /// No-op: always fullscreen.
    pub fn set_fullscreen(&mut self, _fullscreen: bool) {}

    /// No-op: always on top.
    pub fn set_ontop(&mut self, _ontop: bool) {}
}

/// Updates the cached dimensions and reports a resize if they changed.
fn resize_event(cached: &mut (u32, u32), actual: (u32, u32)) -> Option<DisplayEvent> {
    if *cached != actual {
        *cached = actual;
        Some(DisplayEvent::Resize {
            width: actual.0,
            height: actual.1,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_is_reported_exactly_once_for_fixed_dimensions() {
        let mut cached = (0, 0);
        assert_eq!(
            resize_event(&mut cached, (1920, 1080)),
            Some(DisplayEvent::Resize {
                width: 1920,
                height: 1080
            })
        );
        // The session's dimensions never change, so nothing fires again.
        assert_eq!(resize_event(&mut cached, (1920, 1080)), None);
        assert_eq!(resize_event(&mut cached, (1920, 1080)), None);
    }

    #[test]
    fn check_events_without_a_session_reports_nothing() {
        let mut output = KmsOutput::new(Config::default());
        assert_eq!(output.check_events(), None);
    }

    #[test]
    fn screen_geometry_without_a_session_is_zero() {
        let output = KmsOutput::new(Config::default());
        assert_eq!(output.screen_geometry(), (0, 0));
    }

    #[test]
    fn teardown_without_a_session_is_idempotent() {
        let mut output = KmsOutput::new(Config::default());
        // e.g. `uninit` immediately after a failed `create_window`.
        output.uninit();
        output.uninit();
        output.release_context();
        output.swap_buffers();
        assert_eq!(output.screen_geometry(), (0, 0));
    }

    #[test]
    fn border_toggle_flips_the_cosmetic_flag() {
        let mut output = KmsOutput::new(Config::default());
        assert!(!output.border);
        output.toggle_border();
        assert!(output.border);
        output.toggle_border();
        assert!(!output.border);
    }

    #[test]
    fn ignored_window_hints_do_not_fabricate_a_session() {
        // Acquisition against real hardware is not attempted in tests;
        // this only pins the accessors' inactive-state behavior.
        let output = KmsOutput::new(Config::default());
        assert!(output.session.is_none());
    }
}
