// src/os/mod.rs
//! Thin OS-level helpers shared by the display path.

pub mod poll;
