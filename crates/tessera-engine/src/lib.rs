//! Tessera engine crate.
//!
//! Window runtime, GPU device, input, timing and the batched model renderer.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod render;
