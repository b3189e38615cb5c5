//! # flockpaint
//!
//! GPU boid flocking against a collision mask you paint in real time.
//!
//! Thousands of boids steer by separation, cohesion and alignment, feel an
//! optional gravity well at the cursor, and bounce off whatever has been
//! painted into a full-screen collision mask. Painting, the boid step and
//! drawing all run on the GPU through `wgpu`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use flockpaint::prelude::*;
//!
//! fn main() -> Result<(), SimulationError> {
//!     Simulation::new()
//!         .with_parameters(SimulationParameters::flocking_preset())
//!         .with_boid_count(8_192)
//!         .run()
//! }
//! ```
//!
//! ## Controls
//!
//! | Input | Action |
//! |-------|--------|
//! | Left mouse | paint the collision mask |
//! | Right mouse | erase the collision mask |
//! | Mouse wheel | brush size |
//! | Q (held) | attracting gravity well at the cursor |
//! | E (held) | repelling gravity well at the cursor |
//! | W | reset boids and clear the mask |
//! | Tab | settings panel (feature `egui`) |
//! | Escape | quit |
//!
//! ## Frame pipeline
//!
//! [`FrameOrchestrator`] owns the boid array, the collision mask and the
//! [`SimulationParameters`], and runs each frame in a fixed order: mask size
//! check, brush, paint, boid step, draw. It is generic over a [`Backend`];
//! [`GpuBackend`] is the real one, [`CpuBackend`] runs the same kernel on
//! `rayon` without a window and is what the tests drive.
//!
//! ```
//! use flockpaint::{CpuBackend, FrameOrchestrator, RawInput, SimulationSettings};
//!
//! let mut sim = FrameOrchestrator::new(CpuBackend::new(320, 240)).with_seed(7);
//! sim.set_boid_count(100);
//! assert_eq!(sim.boid_count(), 96);
//!
//! sim.step_frame(1.0 / 120.0, &RawInput::default()).unwrap();
//! assert_eq!(sim.mask().size(), Some((320, 240)));
//! ```
//!
//! Boid counts are always a multiple of [`WORKGROUP_WIDTH`]; any requested
//! count is rounded down.

pub mod backend;
pub mod boid;
pub mod cpu;
pub mod error;
mod gpu;
pub mod input;
pub mod mask;
mod orchestrator;
pub mod params;
pub mod settings;
pub mod shader;
mod simulation;
pub mod time;
#[cfg(feature = "egui")]
pub mod ui;
pub mod uniforms;
mod window;

pub use backend::Backend;
pub use boid::{BoidRecord, BoidStore};
pub use bytemuck;
pub use cpu::{CpuBackend, CpuBoids, CpuMask};
pub use error::{FrameError, GpuError, SimulationError};
pub use glam::{Vec2, Vec4};
pub use gpu::{GpuBackend, GpuBoids, GpuMask, MASK_FORMAT};
pub use input::{BrushState, Input, KeyCode, MouseButton, RawInput};
pub use mask::{CollisionMask, MaskSync};
pub use orchestrator::{FrameOrchestrator, FrameStatus, BRUSH_SCROLL_FACTOR};
pub use params::{normalize_boid_count, SimulationParameters, WORKGROUP_WIDTH};
pub use settings::{Setting, SettingDescriptor, SimulationSettings};
pub use simulation::{Simulation, DEFAULT_BOID_SIZE, DEFAULT_MAX_DELTA, DEFAULT_TARGET_FPS};
pub use uniforms::{BoidUniforms, PaintUniforms, RenderUniforms};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use flockpaint::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::SimulationError;
    pub use crate::input::{Input, KeyCode, MouseButton};
    pub use crate::orchestrator::FrameOrchestrator;
    pub use crate::params::SimulationParameters;
    pub use crate::settings::{Setting, SimulationSettings};
    pub use crate::simulation::Simulation;
    pub use crate::time::Time;
    pub use crate::Vec2;
    #[cfg(feature = "egui")]
    pub use egui;
}
