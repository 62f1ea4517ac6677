// src/display/error.rs

//! Error taxonomy for the display path.
//!
//! Acquisition and context-binding failures are fatal to session startup
//! and propagate to the host. Presentation failures never surface here:
//! the page-flip driver absorbs them so a dropped frame cannot take down
//! a running playback pipeline. Teardown is best-effort and reports
//! nothing at all.

use std::fmt;
use std::io;

use khronos_egl as egl;

/// Failures while taking ownership of the display controller.
///
/// Any of these aborts startup; the caller must not proceed to context
/// creation. A failed acquisition leaves no partial state behind, so a
/// later retry starts from scratch.
#[derive(Debug)]
pub enum AcquireError {
    /// A display session already exists; only one may be active.
    AlreadyActive,
    /// No configured DRM driver module backs an openable device node.
    NoDeviceFound,
    /// The controller's connector/encoder/CRTC resource set was unavailable.
    ResourceQueryFailed(io::Error),
    /// Every advertised connector reports disconnected.
    NoConnectedDisplay,
    /// The selected connector advertises no modes.
    NoUsableMode,
    /// No encoder matches the connector's bound encoder id, or the
    /// matching encoder has no CRTC to scan out from.
    NoMatchingEncoder,
    /// The GBM allocation surface could not be created at the mode size.
    SurfaceCreationFailed(io::Error),
}

impl fmt::Display for AcquireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyActive => {
                write!(f, "a display session is already active; only one may exist")
            }
            Self::NoDeviceFound => write!(f, "no usable DRM device node found"),
            Self::ResourceQueryFailed(err) => {
                write!(f, "failed to query display controller resources: {}", err)
            }
            Self::NoConnectedDisplay => write!(f, "no connector reports a connected display"),
            Self::NoUsableMode => write!(f, "connected display advertises no modes"),
            Self::NoMatchingEncoder => {
                write!(f, "no encoder/CRTC binding matches the selected connector")
            }
            Self::SurfaceCreationFailed(err) => {
                write!(f, "failed to create scanout allocation surface: {}", err)
            }
        }
    }
}

impl std::error::Error for AcquireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ResourceQueryFailed(err) | Self::SurfaceCreationFailed(err) => Some(err),
            _ => None,
        }
    }
}

/// Failures while binding the rendering context to the session.
///
/// Fatal to startup. Whatever partial EGL state exists when one of these
/// is returned remains releasable through the ordinary teardown path.
#[derive(Debug)]
pub enum ContextError {
    /// `create_context` was called without an acquired display session.
    NoSession,
    /// No EGL display could be opened over the allocation device.
    DisplayConnectionFailed,
    /// The driver rejected the legacy OpenGL client API.
    ApiNotSupported(egl::Error),
    /// EGL display initialization failed.
    InitializationFailed(egl::Error),
    /// The configuration query itself was rejected by the driver.
    ConfigQueryFailed(egl::Error),
    /// The config filter did not match exactly one configuration. The
    /// `n == 1` exactness is policy, not a relaxable minimum.
    NoMatchingConfig { found: usize },
    /// Context creation against the chosen config failed.
    ContextCreationFailed(egl::Error),
    /// The window surface over the allocation surface could not be made.
    SurfaceBindFailed(egl::Error),
    /// The context/surface pair could not be made current.
    MakeCurrentFailed(egl::Error),
    /// Registering the first front buffer as a framebuffer was rejected.
    FramebufferRegistrationFailed(io::Error),
    /// The display controller rejected the initial mode-set; the whole
    /// session acquisition aborts.
    InitialPresentFailed(io::Error),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSession => write!(f, "no display session; create the window first"),
            Self::DisplayConnectionFailed => write!(f, "failed to open EGL display connection"),
            Self::ApiNotSupported(err) => {
                write!(f, "legacy OpenGL client API not supported: {}", err)
            }
            Self::InitializationFailed(err) => {
                write!(f, "EGL display initialization failed: {}", err)
            }
            Self::ConfigQueryFailed(err) => write!(f, "EGL config query failed: {}", err),
            Self::NoMatchingConfig { found } => write!(
                f,
                "expected exactly one matching EGL config, found {}",
                found
            ),
            Self::ContextCreationFailed(err) => write!(f, "EGL context creation failed: {}", err),
            Self::SurfaceBindFailed(err) => {
                write!(f, "failed to bind EGL surface to allocation surface: {}", err)
            }
            Self::MakeCurrentFailed(err) => {
                write!(f, "failed to make rendering context current: {}", err)
            }
            Self::FramebufferRegistrationFailed(err) => {
                write!(f, "framebuffer registration rejected: {}", err)
            }
            Self::InitialPresentFailed(err) => {
                write!(f, "initial mode-set of the first front buffer failed: {}", err)
            }
        }
    }
}

impl std::error::Error for ContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ApiNotSupported(err)
            | Self::InitializationFailed(err)
            | Self::ConfigQueryFailed(err)
            | Self::ContextCreationFailed(err)
            | Self::SurfaceBindFailed(err)
            | Self::MakeCurrentFailed(err) => Some(err),
            Self::FramebufferRegistrationFailed(err) | Self::InitialPresentFailed(err) => Some(err),
            _ => None,
        }
    }
}
