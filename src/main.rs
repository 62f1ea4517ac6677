// src/main.rs

//! Demo driver for the KMS video output.
//!
//! Runs the full host lifecycle against the real display: acquires the
//! controller, binds the rendering context, sweeps the clear color for a
//! few seconds of page-flipped frames, and tears everything down,
//! restoring the previous display configuration.
//!
//! Must run on a VT with DRM master available (no X11/Wayland holding the
//! device).

use anyhow::Context;
use log::info;

use kms_output::config::Config;
use kms_output::display::{DisplayEvent, KmsOutput};
use kms_output::gl;

const DEMO_FRAMES: u32 = 300;

fn main() -> anyhow::Result<()> {
    // Initialize the logger. Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let config = Config::default();
    let mut output = KmsOutput::new(config);

    output.init();
    output
        .create_window(0, 0, 0)
        .context("Failed to acquire display controller")?;
    output
        .create_context()
        .context("Failed to bind rendering context")?;

    if let Some(DisplayEvent::Resize { width, height }) = output.check_events() {
        info!("display reports {}x{}", width, height);
    }

    for frame in 0..DEMO_FRAMES {
        // Stand-in renderer: fade through red so successive flips are
        // visibly distinct frames.
        let level = (frame % 120) as f32 / 120.0;
        gl::clear(level, 0.1, 0.1, 1.0);
        output.swap_buffers();
    }

    let (width, height) = output.screen_geometry();
    info!("presented {} frames at {}x{}", DEMO_FRAMES, width, height);

    output.release_context();
    output.uninit();
    Ok(())
}
