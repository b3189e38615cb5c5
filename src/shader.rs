//! WGSL sources and the binding layout they share with the host.
//!
//! The slot constants below are the only place binding indices appear on the
//! Rust side; bind group layouts and bind groups in [`crate::gpu`] are built
//! from them. Bump [`BINDING_LAYOUT_VERSION`] whenever a slot moves.

/// Boid flocking compute kernel.
pub const BOIDS_SOURCE: &str = include_str!("shaders/boids.wgsl");
/// Brush paint pass and mask composite.
pub const PAINT_SOURCE: &str = include_str!("shaders/paint.wgsl");
/// Boid instanced draw.
pub const RENDER_SOURCE: &str = include_str!("shaders/render.wgsl");

/// Version of the slot table below.
pub const BINDING_LAYOUT_VERSION: u32 = 1;

/// Compute kernel, group 0.
pub mod compute_slots {
    pub const BOIDS_IN: u32 = 0;
    pub const PARAMS: u32 = 1;
    pub const COLLISION_MASK: u32 = 2;
    pub const BOIDS_OUT: u32 = 3;
}

/// Paint and composite passes, group 0.
pub mod paint_slots {
    pub const BRUSH: u32 = 0;
    pub const COLLISION_MASK: u32 = 1;
}

/// Boid draw, group 0.
pub mod render_slots {
    pub const VIEW: u32 = 0;
}

pub const COMPUTE_ENTRY: &str = "main";
pub const FULLSCREEN_VERTEX_ENTRY: &str = "vs_fullscreen";
pub const PAINT_FRAGMENT_ENTRY: &str = "fs_paint";
pub const COMPOSITE_FRAGMENT_ENTRY: &str = "fs_composite";
pub const BOID_VERTEX_ENTRY: &str = "vs_main";
pub const BOID_FRAGMENT_ENTRY: &str = "fs_main";

/// Vertex attributes for one boid instance, matching [`BoidRecord`](crate::BoidRecord).
pub const BOID_VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
    0 => Float32x2,
    1 => Float32x2,
    2 => Float32x4
];
