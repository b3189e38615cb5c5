//! The seam between frame orchestration and the parallel substrate.
//!
//! [`FrameOrchestrator`](crate::FrameOrchestrator) only decides *what* runs
//! each frame and in which order. A [`Backend`] decides *how*: the wgpu
//! backend records GPU passes, the CPU backend runs the same kernel on a
//! rayon pool.

use crate::boid::BoidAllocator;
use crate::error::FrameError;
use crate::mask::MaskAllocator;
use crate::uniforms::{BoidUniforms, PaintUniforms};

/// A substrate that can run one frame of the pipeline.
///
/// Within a frame the orchestrator calls, in order: [`begin_frame`],
/// [`paint`], [`simulate`], [`draw`]. `simulate` must not start reading the
/// mask before `paint` has finished writing it.
///
/// [`begin_frame`]: Backend::begin_frame
/// [`paint`]: Backend::paint
/// [`simulate`]: Backend::simulate
/// [`draw`]: Backend::draw
pub trait Backend: BoidAllocator + MaskAllocator {
    /// Current output surface size in pixels.
    fn surface_size(&self) -> (u32, u32);

    /// Acquire whatever the frame renders into.
    fn begin_frame(&mut self) -> Result<(), FrameError>;

    /// Draw the brush into the mask. A zero brush weight leaves it untouched.
    fn paint(&mut self, mask: &mut Self::Mask, brush: &PaintUniforms);

    /// Advance every boid by one step against a snapshot of the mask.
    fn simulate(&mut self, boids: &mut Self::Boids, mask: &Self::Mask, uniforms: &BoidUniforms);

    /// Composite the mask, draw the boids and present.
    fn draw(&mut self, boids: &Self::Boids, mask: &Self::Mask, brush: &PaintUniforms, count: u32);
}
