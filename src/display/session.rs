// src/display/session.rs

//! The exclusively owned display session.
//!
//! Aggregates everything a running output needs: the device node, the
//! selected scanout pipeline, the GBM allocation surface, the framebuffer
//! cache, the rendering context, and the one buffer currently on screen.
//! There is no process-wide registry; whoever owns the value owns the
//! display, and a second session can only be acquired once this one has
//! been torn down by its owner.

use log::{info, warn};

use drm::control::{connector, crtc, Device as ControlDevice, Mode};
use gbm::{BufferObject, BufferObjectFlags, Format};

use crate::config::Config;
use crate::display::device::{self, Card};
use crate::display::egl::RenderContext;
use crate::display::error::{AcquireError, ContextError};
use crate::display::framebuffer::FramebufferCache;

/// One acquired display output.
///
/// Field order matters for drop safety: the rendering context unbinds
/// before the allocation surface goes away, and the locked front buffer
/// returns to the surface pool before the surface itself drops.
pub struct DisplaySession {
    pub(crate) render: Option<RenderContext>,
    pub(crate) front: Option<BufferObject<()>>,
    pub(crate) framebuffers: FramebufferCache,
    pub(crate) surface: gbm::Surface<()>,
    pub(crate) gbm: gbm::Device<Card>,
    pub(crate) card: Card,
    pub(crate) crtc: crtc::Handle,
    pub(crate) connector: connector::Handle,
    pub(crate) mode: Mode,
    pub(crate) original_crtc: Option<crtc::Info>,
}

impl DisplaySession {
    /// Takes ownership of the display controller: probes the device,
    /// resolves the scanout pipeline, and creates the allocation surface
    /// sized to the selected mode.
    ///
    /// On any failure every partially acquired resource is dropped before
    /// returning, so a retry never sees stale half-acquired state.
    pub fn acquire(config: &Config) -> Result<Self, AcquireError> {
        let card = Card::probe(&config.device)?;
        let pipeline = device::select_pipeline(&card)?;
        let (width, height) = pipeline.mode.size();

        let gbm = gbm::Device::new(card.clone()).map_err(AcquireError::SurfaceCreationFailed)?;
        let surface = gbm
            .create_surface::<()>(
                u32::from(width),
                u32::from(height),
                Format::Xrgb8888,
                BufferObjectFlags::SCANOUT | BufferObjectFlags::RENDERING,
            )
            .map_err(AcquireError::SurfaceCreationFailed)?;

        info!("display session acquired at {}x{}", width, height);

        Ok(Self {
            render: None,
            front: None,
            framebuffers: FramebufferCache::new(config.format.depth, config.format.bpp),
            surface,
            gbm,
            card,
            crtc: pipeline.crtc,
            connector: pipeline.connector,
            mode: pipeline.mode,
            original_crtc: pipeline.original_crtc,
        })
    }

    /// True while a front buffer is locked for scanout. Exactly one
    /// buffer stays locked across any number of successful presents.
    pub fn has_front_buffer(&self) -> bool {
        self.front.is_some()
    }

    /// Framebuffer dimensions fixed at acquisition time.
    pub fn size(&self) -> (u32, u32) {
        let (width, height) = self.mode.size();
        (u32::from(width), u32::from(height))
    }

    /// Binds the rendering context and puts the first front buffer on
    /// screen with a direct mode-set, so the session starts on a defined
    /// black frame instead of stale memory.
    ///
    /// On failure any partial EGL state is released through the ordinary
    /// teardown path before this returns.
    pub fn bind_context(&mut self) -> Result<(), ContextError> {
        let render = RenderContext::bind(&self.gbm, &self.surface)?;

        // The bind already cleared and swapped once; that cleared buffer
        // is now the surface's front buffer.
        let first = unsafe { self.surface.lock_front_buffer() }
            .map_err(|err| ContextError::InitialPresentFailed(std::io::Error::other(err)))?;
        let framebuffer = self
            .framebuffers
            .handle_for(&self.card, &first)
            .map_err(ContextError::FramebufferRegistrationFailed)?;

        // Sets the framebuffer directly without any flip synchronization;
        // nothing is on screen yet that could tear.
        self.card
            .set_crtc(
                self.crtc,
                Some(framebuffer),
                (0, 0),
                &[self.connector],
                Some(self.mode),
            )
            .map_err(ContextError::InitialPresentFailed)?;

        self.front = Some(first);
        self.render = Some(render);
        Ok(())
    }

    /// Releases the rendering context only. Display mode, allocation
    /// surface, and the displayed buffer all survive, so a fresh context
    /// can be bound without reacquiring the session.
    pub fn release_context(&mut self) {
        if let Some(mut render) = self.render.take() {
            render.release();
        }
    }

    /// Puts the CRTC back the way it was found, if its configuration was
    /// captured at acquisition. Best-effort and purely cosmetic; a VT
    /// switch would restore it anyway.
    pub fn restore_original_crtc(&self) {
        if let Some(original) = &self.original_crtc {
            let result = self.card.set_crtc(
                original.handle(),
                original.framebuffer(),
                original.position(),
                &[self.connector],
                original.mode(),
            );
            if let Err(err) = result {
                warn!("failed to restore original display configuration: {}", err);
            }
        }
    }
}
