// src/display/egl.rs

//! Rendering context binder.
//!
//! Opens an EGL display over the GBM allocation device, negotiates the
//! legacy OpenGL client API (not a GLES variant), requires exactly one
//! matching surface configuration, and binds a client-version-2 context
//! to a window surface wrapping the allocation surface. Teardown runs in
//! strict reverse order and is idempotent: every step is skipped when its
//! handle is already gone.

use khronos_egl as egl;
use log::{debug, info, warn};

use gbm::AsRaw;

use crate::display::device::Card;
use crate::display::error::ContextError;
use crate::gl;

/// Requests client version 2 semantics against the chosen config.
const CONTEXT_ATTRIBS: [egl::Int; 3] = [egl::CONTEXT_CLIENT_VERSION, 2, egl::NONE];

/// Window-surface capable, renderable via legacy OpenGL, at least one bit
/// per color channel, alpha not required.
const CONFIG_ATTRIBS: [egl::Int; 13] = [
    egl::SURFACE_TYPE,
    egl::WINDOW_BIT,
    egl::RED_SIZE,
    1,
    egl::GREEN_SIZE,
    1,
    egl::BLUE_SIZE,
    1,
    egl::ALPHA_SIZE,
    0,
    egl::RENDERABLE_TYPE,
    egl::OPENGL_BIT,
    egl::NONE,
];

/// The EGL display/config/context/surface bundle for one session.
///
/// Handles are `Option`s so release can null each one as it goes, making
/// a second release (or a release after a partial bind) a no-op.
pub struct RenderContext {
    egl: egl::Instance<egl::Static>,
    display: Option<egl::Display>,
    config: Option<egl::Config>,
    context: Option<egl::Context>,
    surface: Option<egl::Surface>,
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("display", &self.display.is_some())
            .field("config", &self.config.is_some())
            .field("context", &self.context.is_some())
            .field("surface", &self.surface.is_some())
            .finish()
    }
}

impl RenderContext {
    /// Establishes the rendering context over the allocation surface and
    /// makes it current. On success the context is bound and cleared to
    /// black with one buffer swap already issued, so the first locked
    /// front buffer holds defined content.
    ///
    /// Each handle moves into its `Option` slot as soon as the driver
    /// hands it over, so an error on any later step drops a partially
    /// filled `Self` and `release` tears down exactly what exists.
    pub fn bind(
        gbm: &gbm::Device<Card>,
        surface: &gbm::Surface<()>,
    ) -> Result<Self, ContextError> {
        let egl_api = egl::Instance::new(egl::Static);

        let display = unsafe {
            egl_api.get_display(gbm.as_raw() as egl::NativeDisplayType)
        }
        .ok_or(ContextError::DisplayConnectionFailed)?;

        // The legacy OpenGL API is negotiated explicitly; GLES would also
        // bind on most drivers but changes the renderer contract.
        egl_api
            .bind_api(egl::OPENGL_API)
            .map_err(ContextError::ApiNotSupported)?;

        let (major, minor) = egl_api
            .initialize(display)
            .map_err(ContextError::InitializationFailed)?;
        debug!("EGL {}.{} initialized over GBM device", major, minor);

        let mut bound = Self {
            egl: egl_api,
            display: Some(display),
            config: None,
            context: None,
            surface: None,
        };

        // Exactly one config must match; more than one means the filter
        // is ambiguous and the choice would be driver-dependent.
        let mut configs = Vec::with_capacity(2);
        bound
            .egl
            .choose_config(display, &CONFIG_ATTRIBS, &mut configs)
            .map_err(ContextError::ConfigQueryFailed)?;
        if configs.len() != 1 {
            return Err(ContextError::NoMatchingConfig {
                found: configs.len(),
            });
        }
        let config = configs[0];
        bound.config = Some(config);

        let context = bound
            .egl
            .create_context(display, config, None, &CONTEXT_ATTRIBS)
            .map_err(ContextError::ContextCreationFailed)?;
        bound.context = Some(context);

        let window_surface = unsafe {
            bound.egl.create_window_surface(
                display,
                config,
                surface.as_raw() as egl::NativeWindowType,
                None,
            )
        }
        .map_err(ContextError::SurfaceBindFailed)?;
        bound.surface = Some(window_surface);

        bound
            .egl
            .make_current(display, Some(window_surface), Some(window_surface), Some(context))
            .map_err(ContextError::MakeCurrentFailed)?;

        info!("rendering context bound and current");

        // Clear-and-present once before anything renders: starts up with
        // a black screen rather than whatever the buffers held.
        gl::clear(0.0, 0.0, 0.0, 1.0);
        if let Err(err) = bound.swap() {
            warn!("initial buffer swap failed: {}", err);
        }

        Ok(bound)
    }

    /// Issues the driver buffer swap, moving the just-rendered content to
    /// the allocation surface's front buffer. A no-op once released.
    pub fn swap(&self) -> Result<(), egl::Error> {
        match (self.display, self.surface) {
            (Some(display), Some(surface)) => self.egl.swap_buffers(display, surface),
            _ => Ok(()),
        }
    }

    /// Tears down in strict reverse order: unbind, destroy context,
    /// destroy surface, terminate the display connection. Idempotent.
    pub fn release(&mut self) {
        if let Some(display) = self.display.take() {
            if let Err(err) = self.egl.make_current(display, None, None, None) {
                warn!("failed to unbind rendering context: {}", err);
            }
            if let Some(context) = self.context.take() {
                if let Err(err) = self.egl.destroy_context(display, context) {
                    warn!("failed to destroy rendering context: {}", err);
                }
            }
            if let Some(surface) = self.surface.take() {
                if let Err(err) = self.egl.destroy_surface(display, surface) {
                    warn!("failed to destroy window surface: {}", err);
                }
            }
            if let Err(err) = self.egl.terminate(display) {
                warn!("failed to terminate EGL display: {}", err);
            }
            info!("rendering context released");
        }
        self.config = None;
        self.context = None;
        self.surface = None;
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The shape a failed bind leaves behind once its filled slots have
    // been torn down. Driver handles cannot be fabricated in tests, so
    // this pins the empty-slot behavior of the shared teardown path.
    fn unbound() -> RenderContext {
        RenderContext {
            egl: egl::Instance::new(egl::Static),
            display: None,
            config: None,
            context: None,
            surface: None,
        }
    }

    #[test]
    fn release_with_no_bound_handles_is_an_idempotent_no_op() {
        let mut context = unbound();
        context.release();
        context.release();
        // A released context also refuses to present.
        assert!(context.swap().is_ok());
    }
}
