//! Headless CPU backend.
//!
//! Runs the same paint and boid kernels as the WGSL shaders, on a rayon
//! pool. The boid array is split into [`WORKGROUP_WIDTH`]-sized chunks, one
//! per rayon task, and every boid reads the same start-of-step snapshot, so
//! the result does not depend on scheduling.
//!
//! Besides being a fallback substrate, the backend keeps bookkeeping about
//! which resources are live and bound, which the tests lean on.

use glam::Vec2;
use rayon::prelude::*;

use crate::backend::Backend;
use crate::boid::{BoidAllocator, BoidRecord};
use crate::error::FrameError;
use crate::mask::MaskAllocator;
use crate::params::WORKGROUP_WIDTH;
use crate::uniforms::{BoidUniforms, PaintUniforms};

/// Mask values above this are solid.
pub const SOLID_THRESHOLD: f32 = 0.5;

/// Pixel offset of the central differences used for the mask normal.
const NORMAL_REACH: i32 = 2;

/// Brush intensity at `distance` from the cursor: `1 - (d/r)^2`, zero
/// outside the radius.
#[inline]
pub fn brush_falloff(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    let t = (distance / radius).clamp(0.0, 1.0);
    1.0 - t * t
}

/// A collision mask held in host memory, one `f32` per pixel, row-major,
/// origin top-left.
#[derive(Debug, Clone)]
pub struct CpuMask {
    id: u64,
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl CpuMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_id(0, width, height)
    }

    fn with_id(id: u64, width: u32, height: u32) -> Self {
        Self {
            id,
            width,
            height,
            data: vec![0.0; width as usize * height as usize],
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Mask value at pixel `(x, y)`; zero outside the surface.
    #[inline]
    pub fn value(&self, x: i32, y: i32) -> f32 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0.0;
        }
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Set pixel `(x, y)`. Out-of-range coordinates are ignored.
    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        if x < self.width && y < self.height {
            self.data[y as usize * self.width as usize + x as usize] = value.clamp(0.0, 1.0);
        }
    }

    /// Mask value under a point in pixel space.
    #[inline]
    pub fn sample(&self, p: Vec2) -> f32 {
        self.value(p.x.floor() as i32, p.y.floor() as i32)
    }

    #[inline]
    pub fn is_solid(&self, p: Vec2) -> bool {
        self.sample(p) > SOLID_THRESHOLD
    }

    /// Direction pointing out of the painted region at `p`, unnormalized.
    ///
    /// Zero deep inside a uniform region.
    pub fn normal_at(&self, p: Vec2) -> Vec2 {
        let x = p.x.floor() as i32;
        let y = p.y.floor() as i32;
        let gx = self.value(x + NORMAL_REACH, y) - self.value(x - NORMAL_REACH, y);
        let gy = self.value(x, y + NORMAL_REACH) - self.value(x, y - NORMAL_REACH);
        -Vec2::new(gx, gy)
    }

    /// Sum of all mask values.
    pub fn coverage(&self) -> f32 {
        self.data.iter().sum()
    }
}

/// Draw one brush dab into `mask`.
pub fn paint_mask(mask: &mut CpuMask, brush: &PaintUniforms) {
    if !brush.is_active() || brush.radius <= 0.0 || mask.width == 0 || mask.height == 0 {
        return;
    }

    let cursor = Vec2::from_array(brush.cursor);
    let radius = brush.radius;
    let width = mask.width as usize;

    let x0 = (cursor.x - radius).floor().max(0.0) as usize;
    let x1 = ((cursor.x + radius).ceil().max(0.0) as usize).min(width);
    let y0 = (cursor.y - radius).floor().max(0.0) as usize;
    let y1 = ((cursor.y + radius).ceil().max(0.0) as usize).min(mask.height as usize);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    mask.data[y0 * width..y1 * width]
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, line)| {
            let y = (y0 + row) as f32 + 0.5;
            for (x, texel) in line.iter_mut().enumerate().take(x1).skip(x0) {
                let d = Vec2::new(x as f32 + 0.5, y).distance(cursor);
                let falloff = brush_falloff(d, radius);
                if falloff > 0.0 {
                    *texel = (*texel + brush.weight * falloff).clamp(0.0, 1.0);
                }
            }
        });
}

/// Force of the cursor gravity well on a boid at `pos`.
fn gravity_well(pos: Vec2, u: &BoidUniforms) -> Vec2 {
    let mass = u.signed_body_mass();
    if mass == 0.0 {
        return Vec2::ZERO;
    }
    let offset = u.cursor() - pos;
    if offset == Vec2::ZERO {
        return Vec2::ZERO;
    }
    let scaled = offset * u.unit_scale();
    let d2 = scaled.length_squared() + u.body_radius() * u.body_radius();
    if d2 <= 0.0 {
        return Vec2::ZERO;
    }
    offset.normalize() * (mass / d2)
}

/// Move from `pos` with velocity `vel` for `step`, bouncing off the mask and
/// the surface edges.
fn resolve_collisions(
    pos: Vec2,
    vel: Vec2,
    step: f32,
    mask: &CpuMask,
    u: &BoidUniforms,
) -> (Vec2, Vec2) {
    let bounciness = u.bounciness();
    let mut v = vel;
    let mut next = pos + v * step;

    // A boid that was painted over may walk out freely.
    if mask.is_solid(next) && !mask.is_solid(pos) {
        let n = mask.normal_at(next);
        v = if n != Vec2::ZERO {
            let n = n.normalize();
            let approach = v.dot(n);
            if approach < 0.0 {
                v - 2.0 * approach * n
            } else {
                v
            }
        } else {
            -v
        };
        v *= bounciness;
        next = pos;
    }

    let max = (u.surface_size() - 1.0).max(Vec2::ZERO);
    if next.x < 0.0 {
        next.x = 0.0;
        v.x = v.x.abs() * bounciness;
    } else if next.x > max.x {
        next.x = max.x;
        v.x = -v.x.abs() * bounciness;
    }
    if next.y < 0.0 {
        next.y = 0.0;
        v.y = v.y.abs() * bounciness;
    } else if next.y > max.y {
        next.y = max.y;
        v.y = -v.y.abs() * bounciness;
    }

    (next, v)
}

/// Advance boid `index` one step, reading only `snapshot`.
pub fn step_boid(index: usize, snapshot: &[BoidRecord], mask: &CpuMask, u: &BoidUniforms) -> BoidRecord {
    let me = snapshot[index];
    let pos = me.position();
    let vel = me.direction();

    let mut separation = Vec2::ZERO;
    let mut align_sum = Vec2::ZERO;
    let mut align_n = 0.0f32;
    let mut cohesion_sum = Vec2::ZERO;
    let mut cohesion_n = 0.0f32;

    for (j, other) in snapshot.iter().enumerate() {
        if j == index {
            continue;
        }
        let offset = other.position() - pos;
        let dist = offset.length();
        if dist > 0.0 && dist < u.repel_distance() {
            separation -= offset / (dist * dist);
        }
        if dist < u.align_distance() {
            align_sum += other.direction();
            align_n += 1.0;
        }
        if dist < u.cohesion_distance() {
            cohesion_sum += other.position();
            cohesion_n += 1.0;
        }
    }

    let mut steer = separation * u.repel_weight();
    if align_n > 0.0 {
        steer += (align_sum / align_n * u.align_coef() - vel) * u.align_weight();
    }
    if cohesion_n > 0.0 {
        steer += ((cohesion_sum / cohesion_n - pos) * u.cohesion_coef() - vel) * u.cohesion_weight();
    }

    let force = steer.clamp_length_max(u.max_force().max(0.0)) + gravity_well(pos, u);

    let step = u.step();
    let mut v = vel + force * u.inverse_mass() * step;
    v -= v * (u.drag() * step).clamp(0.0, 1.0);

    let (position, direction) = resolve_collisions(pos, v, step, mask, u);
    BoidRecord {
        position: position.to_array(),
        direction: direction.to_array(),
        color: me.color,
    }
}

/// Advance every boid in `records` one step.
///
/// `records.len()` must be a multiple of [`WORKGROUP_WIDTH`].
pub fn step_boids(records: &mut [BoidRecord], mask: &CpuMask, u: &BoidUniforms) {
    debug_assert_eq!(records.len() % WORKGROUP_WIDTH as usize, 0);
    let snapshot = records.to_vec();
    let width = WORKGROUP_WIDTH as usize;

    records
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(group, chunk)| {
            for (lane, boid) in chunk.iter_mut().enumerate() {
                *boid = step_boid(group * width + lane, &snapshot, mask, u);
            }
        });
}

/// A boid array held in host memory.
#[derive(Debug, Clone)]
pub struct CpuBoids {
    id: u64,
    records: Vec<BoidRecord>,
}

impl CpuBoids {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn records(&self) -> &[BoidRecord] {
        &self.records
    }
}

/// Resource counters kept by [`CpuBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub boid_uploads: u64,
    pub boid_releases: u64,
    pub mask_creations: u64,
    pub mask_releases: u64,
    pub frames: u64,
}

impl BackendStats {
    pub fn live_boid_arrays(&self) -> u64 {
        self.boid_uploads - self.boid_releases
    }

    pub fn live_masks(&self) -> u64 {
        self.mask_creations - self.mask_releases
    }
}

/// Host-memory backend.
#[derive(Debug)]
pub struct CpuBackend {
    surface_size: (u32, u32),
    next_id: u64,
    bound_boids: Option<u64>,
    bound_mask: Option<u64>,
    stats: BackendStats,
    last_draw_count: u32,
    pending_failure: Option<FrameError>,
}

impl CpuBackend {
    /// Create a backend whose output surface is `width` x `height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface_size: (width, height),
            next_id: 1,
            bound_boids: None,
            bound_mask: None,
            stats: BackendStats::default(),
            last_draw_count: 0,
            pending_failure: None,
        }
    }

    /// Change the output surface size, as a window resize would.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface_size = (width, height);
    }

    /// Make the next `begin_frame` fail with `error`.
    pub fn fail_next_frame(&mut self, error: FrameError) {
        self.pending_failure = Some(error);
    }

    pub fn stats(&self) -> BackendStats {
        self.stats
    }

    pub fn bound_boids(&self) -> Option<u64> {
        self.bound_boids
    }

    pub fn bound_mask(&self) -> Option<u64> {
        self.bound_mask
    }

    /// Boid count passed to the last `draw`.
    pub fn last_draw_count(&self) -> u32 {
        self.last_draw_count
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl BoidAllocator for CpuBackend {
    type Boids = CpuBoids;

    fn upload_boids(&mut self, records: &[BoidRecord]) -> CpuBoids {
        self.stats.boid_uploads += 1;
        CpuBoids {
            id: self.next_id(),
            records: records.to_vec(),
        }
    }

    fn bind_boids(&mut self, boids: &CpuBoids) {
        self.bound_boids = Some(boids.id);
    }

    fn unbind_boids(&mut self) {
        self.bound_boids = None;
    }

    fn release_boids(&mut self, boids: CpuBoids) {
        debug_assert_ne!(
            self.bound_boids,
            Some(boids.id),
            "released a boid array that is still bound"
        );
        if self.bound_boids == Some(boids.id) {
            self.bound_boids = None;
        }
        self.stats.boid_releases += 1;
    }
}

impl MaskAllocator for CpuBackend {
    type Mask = CpuMask;

    fn create_mask(&mut self, width: u32, height: u32) -> CpuMask {
        self.stats.mask_creations += 1;
        let id = self.next_id();
        CpuMask::with_id(id, width, height)
    }

    fn bind_mask(&mut self, mask: &CpuMask) {
        self.bound_mask = Some(mask.id);
    }

    fn unbind_mask(&mut self) {
        self.bound_mask = None;
    }

    fn release_mask(&mut self, mask: CpuMask) {
        debug_assert_ne!(
            self.bound_mask,
            Some(mask.id),
            "released a collision mask that is still bound"
        );
        if self.bound_mask == Some(mask.id) {
            self.bound_mask = None;
        }
        self.stats.mask_releases += 1;
    }
}

impl Backend for CpuBackend {
    fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    fn begin_frame(&mut self) -> Result<(), FrameError> {
        match self.pending_failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn paint(&mut self, mask: &mut CpuMask, brush: &PaintUniforms) {
        paint_mask(mask, brush);
    }

    fn simulate(&mut self, boids: &mut CpuBoids, mask: &CpuMask, uniforms: &BoidUniforms) {
        debug_assert_eq!(boids.records.len() as u32, uniforms.num_boids);
        step_boids(&mut boids.records, mask, uniforms);
    }

    fn draw(&mut self, _boids: &CpuBoids, _mask: &CpuMask, _brush: &PaintUniforms, count: u32) {
        self.last_draw_count = count;
        self.stats.frames += 1;
    }
}
