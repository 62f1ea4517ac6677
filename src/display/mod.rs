// src/display/mod.rs
//! The direct-rendering display path.
//!
//! - `device`: opens the DRM node and selects connector/mode/encoder/CRTC
//! - `framebuffer`: maps GBM buffer objects to registered framebuffer ids
//! - `egl`: binds the legacy-OpenGL rendering context to the GBM surface
//! - `present`: the double-buffered, event-synchronized page-flip driver
//! - `session`: the exclusively owned aggregate of all of the above
//! - `output`: the fixed lifecycle contract exposed to the host

pub mod device;
pub mod egl;
pub mod error;
pub mod framebuffer;
pub mod output;
pub mod present;
pub mod session;

pub use device::Card;
pub use error::{AcquireError, ContextError};
pub use output::{DisplayEvent, KmsOutput};
pub use session::DisplaySession;
