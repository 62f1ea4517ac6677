// src/gl.rs
//! Minimal OpenGL entry points.
//!
//! The renderer proper lives outside this crate; the only GL the output
//! path itself issues is the clear that guarantees the first visible
//! frame is defined content rather than uninitialized memory. The demo
//! binary reuses the same entry points as a stand-in renderer.

/// `GL_COLOR_BUFFER_BIT`.
pub const COLOR_BUFFER_BIT: u32 = 0x0000_4000;

extern "C" {
    fn glClearColor(red: f32, green: f32, blue: f32, alpha: f32);
    fn glClear(mask: u32);
}

/// Clears the current draw surface to the given color.
///
/// Requires a current GL context; calling it without one is undefined
/// behavior in the driver, so the display path only invokes it after a
/// successful make-current.
pub fn clear(red: f32, green: f32, blue: f32, alpha: f32) {
    unsafe {
        glClearColor(red, green, blue, alpha);
        glClear(COLOR_BUFFER_BIT);
    }
}
