//! # sph_toon
//!
//! GPU-resident SPH particle simulation with cartoon-style depth-based rendering.
//!
//! Every frame runs three barrier-separated compute passes over a single particle buffer,
//! then draws the same buffer as a vertex source through a depth pre-pass, a toon-shaded
//! colour pass and a full-screen outline composite.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sph_toon::core::Engine;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     Engine::run()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Headless use
//!
//! `render::backend::RecordingBackend` records every GPU operation in order and can drive
//! `render::particles::ParticleSystem` and `core::scheduler::FrameScheduler` without a window.

/// Engine entry, frame scheduling and errors
pub mod core;
/// Configuration loading and validation
pub mod config;
/// Window and input abstraction
pub mod platform;
/// GPU backends, particle pipeline and render graph
pub mod render;
/// Image loading
pub mod resources;
