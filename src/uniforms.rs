//! GPU-facing uniform payloads.
//!
//! Each struct here is `#[repr(C)]` + [`Pod`] and mirrors a WGSL struct in
//! `src/shaders/` field for field. The compile-time size checks keep the two
//! sides from drifting apart.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::input::BrushState;
use crate::params::SimulationParameters;

/// Packed parameters for the boid compute kernel.
///
/// The five groups are consumed by the kernel in this exact order:
///
/// | Group | x | y | z | w |
/// |-------|---|---|---|---|
/// | 1 | repel weight | align weight | cohesion weight | cohesion coef |
/// | 2 | repel distance | align distance | cohesion distance | max force |
/// | 3 | 1 / boid mass | delta * timescale | surface width | surface height |
/// | 4 | cursor x | cursor y | align coef | body radius |
/// | 5 | body mass * mass sign | drag | unit scale | bounciness |
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct BoidUniforms {
    pub params1: [f32; 4],
    pub params2: [f32; 4],
    pub params3: [f32; 4],
    pub params4: [f32; 4],
    pub params5: [f32; 4],
    pub num_boids: u32,
    pub _padding: [u32; 3],
}

const _: () = assert!(
    std::mem::size_of::<BoidUniforms>() == 96,
    "size of BoidUniforms does not match WGSL"
);

impl BoidUniforms {
    /// Pack parameters and this frame's brush into the kernel payload.
    pub fn pack(
        params: &SimulationParameters,
        delta_time: f32,
        surface_size: (u32, u32),
        brush: &BrushState,
    ) -> Self {
        let (width, height) = surface_size;
        Self {
            params1: [
                params.repel_weight,
                params.align_weight,
                params.cohesion_weight,
                params.cohesion_coef,
            ],
            params2: [
                params.repel_distance,
                params.align_distance,
                params.cohesion_distance,
                params.boid_max_force,
            ],
            params3: [
                params.inverse_boid_mass(),
                params.step(delta_time),
                width as f32,
                height as f32,
            ],
            params4: [
                brush.cursor.x,
                brush.cursor.y,
                params.align_coef,
                params.body_radius,
            ],
            params5: [
                params.body_mass * brush.mass_sign as f32,
                params.drag,
                params.unit_scale,
                params.bounciness,
            ],
            num_boids: params.count,
            _padding: [0; 3],
        }
    }

    #[inline]
    pub fn repel_weight(&self) -> f32 {
        self.params1[0]
    }

    #[inline]
    pub fn align_weight(&self) -> f32 {
        self.params1[1]
    }

    #[inline]
    pub fn cohesion_weight(&self) -> f32 {
        self.params1[2]
    }

    #[inline]
    pub fn cohesion_coef(&self) -> f32 {
        self.params1[3]
    }

    #[inline]
    pub fn repel_distance(&self) -> f32 {
        self.params2[0]
    }

    #[inline]
    pub fn align_distance(&self) -> f32 {
        self.params2[1]
    }

    #[inline]
    pub fn cohesion_distance(&self) -> f32 {
        self.params2[2]
    }

    #[inline]
    pub fn max_force(&self) -> f32 {
        self.params2[3]
    }

    #[inline]
    pub fn inverse_mass(&self) -> f32 {
        self.params3[0]
    }

    /// Integration step in seconds of simulated time.
    #[inline]
    pub fn step(&self) -> f32 {
        self.params3[1]
    }

    #[inline]
    pub fn surface_size(&self) -> Vec2 {
        Vec2::new(self.params3[2], self.params3[3])
    }

    #[inline]
    pub fn cursor(&self) -> Vec2 {
        Vec2::new(self.params4[0], self.params4[1])
    }

    #[inline]
    pub fn align_coef(&self) -> f32 {
        self.params4[2]
    }

    #[inline]
    pub fn body_radius(&self) -> f32 {
        self.params4[3]
    }

    /// Gravity well mass with its sign folded in. Zero disables the well.
    #[inline]
    pub fn signed_body_mass(&self) -> f32 {
        self.params5[0]
    }

    #[inline]
    pub fn drag(&self) -> f32 {
        self.params5[1]
    }

    #[inline]
    pub fn unit_scale(&self) -> f32 {
        self.params5[2]
    }

    #[inline]
    pub fn bounciness(&self) -> f32 {
        self.params5[3]
    }
}

/// Brush parameters shared by the paint and composite passes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PaintUniforms {
    pub cursor: [f32; 2],
    pub radius: f32,
    /// `1` paints, `-1` erases, `0` is a pass-through.
    pub weight: f32,
    pub surface_size: [f32; 2],
    /// Non-zero when the brush ring should be drawn.
    pub show_brush: f32,
    pub _padding: f32,
}

const _: () = assert!(
    std::mem::size_of::<PaintUniforms>() == 32,
    "size of PaintUniforms does not match WGSL"
);

impl PaintUniforms {
    pub fn new(brush: &BrushState, surface_size: (u32, u32)) -> Self {
        Self {
            cursor: brush.cursor.to_array(),
            radius: brush.radius,
            weight: brush.weight,
            surface_size: [surface_size.0 as f32, surface_size.1 as f32],
            show_brush: if brush.enabled { 1.0 } else { 0.0 },
            _padding: 0.0,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.weight != 0.0
    }
}

/// View parameters for drawing boids.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct RenderUniforms {
    pub surface_size: [f32; 2],
    /// Boid length in pixels.
    pub boid_size: f32,
    pub _padding: f32,
}

const _: () = assert!(
    std::mem::size_of::<RenderUniforms>() == 16,
    "size of RenderUniforms does not match WGSL"
);

impl RenderUniforms {
    pub fn new(surface_size: (u32, u32), boid_size: f32) -> Self {
        Self {
            surface_size: [surface_size.0 as f32, surface_size.1 as f32],
            boid_size,
            _padding: 0.0,
        }
    }
}
