//! Per-frame sequencing and resource lifecycle.
//!
//! [`FrameOrchestrator`] owns the boid store, the collision mask and the
//! parameters, and drives a [`Backend`] through a fixed sequence every frame:
//!
//! 1. dirty-check the collision mask against the surface size;
//! 2. derive the brush from raw input and the input-enable flag;
//! 3. paint into the mask;
//! 4. pack the parameters and brush, then step the boids;
//! 5. draw.
//!
//! Each stage reads what the previous one produced, so the order is fixed.

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::backend::Backend;
use crate::boid::BoidStore;
use crate::error::FrameError;
use crate::input::{BrushState, RawInput};
use crate::mask::{CollisionMask, MaskSync};
use crate::params::{normalize_boid_count, SimulationParameters};
use crate::settings::{SimulationSettings, BRUSH_SIZE_RANGE, DEFAULT_BRUSH_SIZE};
use crate::uniforms::{BoidUniforms, PaintUniforms};

/// Brush size factor per mouse wheel notch.
pub const BRUSH_SCROLL_FACTOR: f32 = 1.1;

/// What happened to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Every stage ran.
    Rendered {
        /// Result of this frame's mask dirty check.
        mask: MaskSync,
    },
    /// The surface has zero area (e.g. the window is minimized).
    Skipped,
}

/// Owner of the simulation state and the per-frame pipeline.
pub struct FrameOrchestrator<B: Backend> {
    backend: B,
    params: SimulationParameters,
    boids: BoidStore<B::Boids>,
    mask: CollisionMask<B::Mask>,
    brush_size: f32,
    allow_input: bool,
    rng: SmallRng,
    initialized: bool,
    /// The flock was spawned on a zero-area surface and must be placed again.
    placement_pending: bool,
    last_brush: Option<BrushState>,
    last_paint: Option<PaintUniforms>,
    last_uniforms: Option<BoidUniforms>,
}

impl<B: Backend> FrameOrchestrator<B> {
    /// Create an orchestrator with default parameters. Nothing is allocated
    /// until [`initialize`](Self::initialize) or the first frame.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            params: SimulationParameters::default(),
            boids: BoidStore::new(),
            mask: CollisionMask::new(),
            brush_size: DEFAULT_BRUSH_SIZE,
            allow_input: true,
            rng: SmallRng::from_entropy(),
            initialized: false,
            placement_pending: false,
            last_brush: None,
            last_paint: None,
            last_uniforms: None,
        }
    }

    /// Use a fixed seed for boid placement.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    /// Start from `params`. The count is normalized.
    pub fn with_parameters(mut self, params: SimulationParameters) -> Self {
        self.params = params;
        self.params.count = normalize_boid_count(params.count);
        self
    }

    pub fn with_brush_size(mut self, size: f32) -> Self {
        self.brush_size = size.clamp(*BRUSH_SIZE_RANGE.start(), *BRUSH_SIZE_RANGE.end());
        self
    }

    /// Allocate the collision mask and the first flock. Calling it again is a
    /// no-op until [`shutdown`](Self::shutdown).
    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        let (width, height) = self.backend.surface_size();
        if width > 0 && height > 0 {
            self.mask.sync(&mut self.backend, width, height);
        }
        self.reset_boids();
        self.initialized = true;
        log::info!(
            "simulation initialized: {} boids on {}x{}",
            self.boids.len(),
            width,
            height
        );
    }

    /// Run one frame of `delta_time` seconds.
    pub fn step_frame(&mut self, delta_time: f32, raw: &RawInput) -> Result<FrameStatus, FrameError> {
        self.initialize();

        let (width, height) = self.backend.surface_size();
        if width == 0 || height == 0 {
            return Ok(FrameStatus::Skipped);
        }

        let mask_sync = self.mask.sync(&mut self.backend, width, height);

        if self.placement_pending {
            self.reset_boids();
        }

        // Someone wrote `count` through `parameters_mut`.
        if self.params.count != self.boids.len() {
            self.params.count = normalize_boid_count(self.params.count);
            self.reset_boids();
        }

        self.backend.begin_frame()?;

        let brush = BrushState::derive(raw, self.brush_size, self.allow_input);
        let paint = PaintUniforms::new(&brush, (width, height));
        self.last_brush = Some(brush);
        self.last_paint = Some(paint);

        if let Some(mask) = self.mask.surface_mut() {
            self.backend.paint(mask, &paint);
        }

        let uniforms = BoidUniforms::pack(&self.params, delta_time, (width, height), &brush);
        self.last_uniforms = Some(uniforms);

        let count = self.boids.len();
        let (Some(mask), Some(boids)) = (self.mask.surface(), self.boids.buffer_mut()) else {
            return Ok(FrameStatus::Skipped);
        };
        if count > 0 {
            self.backend.simulate(boids, mask, &uniforms);
        }
        self.backend.draw(boids, mask, &paint, count);

        Ok(FrameStatus::Rendered { mask: mask_sync })
    }

    /// Re-randomize the flock at the current count and clear the mask.
    ///
    /// The blank mask replaces the old one at the next dirty check.
    pub fn reset(&mut self) {
        self.reset_boids();
        self.mask.invalidate();
    }

    /// Release the boid store and the collision mask.
    pub fn shutdown(&mut self) {
        self.boids.release(&mut self.backend);
        self.mask.release(&mut self.backend);
        self.initialized = false;
        log::debug!("simulation shut down");
    }

    /// Scale the brush by [`BRUSH_SCROLL_FACTOR`] per wheel notch.
    pub fn scroll_brush(&mut self, notches: f32) {
        if notches != 0.0 {
            let size = self.brush_size * BRUSH_SCROLL_FACTOR.powf(notches);
            self.set_brush_size(size);
        }
    }

    fn reset_boids(&mut self) {
        let size = self.backend.surface_size();
        self.params.count = self
            .boids
            .reset(&mut self.backend, self.params.count, size, &mut self.rng);
        self.placement_pending = size.0 == 0 || size.1 == 0;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn boids(&self) -> &BoidStore<B::Boids> {
        &self.boids
    }

    pub fn mask(&self) -> &CollisionMask<B::Mask> {
        &self.mask
    }

    /// Number of boids in the live store.
    pub fn boid_count(&self) -> u32 {
        self.boids.len()
    }

    /// Brush derived in the last rendered frame.
    pub fn last_brush(&self) -> Option<&BrushState> {
        self.last_brush.as_ref()
    }

    /// Paint payload of the last rendered frame.
    pub fn last_paint(&self) -> Option<&PaintUniforms> {
        self.last_paint.as_ref()
    }

    /// Compute payload of the last rendered frame.
    pub fn last_uniforms(&self) -> Option<&BoidUniforms> {
        self.last_uniforms.as_ref()
    }
}

impl<B: Backend> SimulationSettings for FrameOrchestrator<B> {
    fn allow_input(&self) -> bool {
        self.allow_input
    }

    fn set_allow_input(&mut self, allow: bool) {
        self.allow_input = allow;
    }

    fn parameters(&self) -> &SimulationParameters {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut SimulationParameters {
        &mut self.params
    }

    /// Resize the flock. Like [`reset`](FrameOrchestrator::reset), this also
    /// clears the mask.
    fn set_boid_count(&mut self, count: u32) {
        self.params.count = normalize_boid_count(count);
        if self.initialized {
            self.reset_boids();
            self.mask.invalidate();
        } else {
            self.initialize();
        }
    }

    fn brush_size(&self) -> f32 {
        self.brush_size
    }

    fn set_brush_size(&mut self, size: f32) {
        self.brush_size = size.clamp(*BRUSH_SIZE_RANGE.start(), *BRUSH_SIZE_RANGE.end());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuBackend;

    fn orchestrator() -> FrameOrchestrator<CpuBackend> {
        FrameOrchestrator::new(CpuBackend::new(160, 120)).with_seed(11)
    }

    #[test]
    fn test_first_frame_initializes() {
        let mut sim = orchestrator();
        assert!(!sim.is_initialized());

        let status = sim.step_frame(0.016, &RawInput::default());
        assert_eq!(
            status,
            Ok(FrameStatus::Rendered {
                mask: MaskSync::Unchanged
            })
        );
        assert!(sim.is_initialized());
        assert_eq!(sim.boid_count(), 96);
        assert_eq!(sim.mask().size(), Some((160, 120)));
        assert_eq!(sim.backend().last_draw_count(), 96);
    }

    #[test]
    fn test_zero_surface_skips() {
        let mut sim = orchestrator();
        sim.initialize();
        sim.backend_mut().resize(0, 120);

        assert_eq!(sim.step_frame(0.016, &RawInput::default()), Ok(FrameStatus::Skipped));
        assert_eq!(sim.backend().stats().frames, 0);
        // The mask keeps its last valid size.
        assert_eq!(sim.mask().size(), Some((160, 120)));
    }

    #[test]
    fn test_frame_error_propagates() {
        let mut sim = orchestrator();
        sim.initialize();
        sim.backend_mut().fail_next_frame(FrameError::Lost);

        assert_eq!(sim.step_frame(0.016, &RawInput::default()), Err(FrameError::Lost));
        assert_eq!(sim.backend().stats().frames, 0);
        assert!(sim.step_frame(0.016, &RawInput::default()).is_ok());
    }

    #[test]
    fn test_scroll_brush() {
        let mut sim = orchestrator();
        sim.set_brush_size(10.0);
        sim.scroll_brush(1.0);
        assert!((sim.brush_size() - 11.0).abs() < 1e-4);
        sim.scroll_brush(-1.0);
        assert!((sim.brush_size() - 10.0).abs() < 1e-4);
        sim.scroll_brush(1_000.0);
        assert_eq!(sim.brush_size(), *BRUSH_SIZE_RANGE.end());
    }

    #[test]
    fn test_count_written_directly_is_picked_up() {
        let mut sim = orchestrator();
        sim.initialize();
        sim.parameters_mut().count = 70;

        sim.step_frame(0.016, &RawInput::default()).ok();
        assert_eq!(sim.parameters().count, 64);
        assert_eq!(sim.boid_count(), 64);
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let mut sim = orchestrator();
        sim.step_frame(0.016, &RawInput::default()).ok();
        sim.shutdown();

        let stats = sim.backend().stats();
        assert_eq!(stats.live_boid_arrays(), 0);
        assert_eq!(stats.live_masks(), 0);
        assert_eq!(sim.backend().bound_boids(), None);
        assert_eq!(sim.backend().bound_mask(), None);
        assert!(!sim.is_initialized());
    }
}
