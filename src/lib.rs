// src/lib.rs
//! Direct-rendering video output over the kernel mode-setting interface.
//!
//! This crate takes exclusive ownership of a DRM display controller,
//! negotiates the largest advertised mode on the first connected output,
//! binds a legacy-OpenGL EGL context to a GBM allocation surface, and
//! presents frames with a double-buffered, vblank-synchronized page flip.
//!
//! The host drives a fixed lifecycle through [`display::KmsOutput`]:
//! `init` → `create_window` → `create_context` → repeated `swap_buffers`
//! → `release_context` → `uninit`. The renderer itself is external; it
//! issues draw calls into the context this crate makes current.

pub mod config;
pub mod display;
pub mod gl;
pub mod os;
