//! Boid records and the boid state store.
//!
//! The store owns the backend-resident array of [`BoidRecord`]s. It is never
//! resized in place: every reset allocates a fresh, freshly randomized array,
//! rebinds it, and only then releases the previous one, so no pass ever sees
//! a released buffer.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use rand::Rng;

use crate::params::normalize_boid_count;

/// Tint every boid starts with.
pub const DEFAULT_TINT: [f32; 4] = [0.25, 0.5, 0.5, 1.0];

/// One boid, laid out exactly as the WGSL `Boid` struct.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct BoidRecord {
    /// Position in surface pixels.
    pub position: [f32; 2],
    /// Velocity in pixels per second of simulated time.
    pub direction: [f32; 2],
    /// RGBA tint.
    pub color: [f32; 4],
}

const _: () = assert!(
    std::mem::size_of::<BoidRecord>() == 32,
    "size of BoidRecord does not match WGSL"
);
const _: () = assert!(
    std::mem::offset_of!(BoidRecord, direction) == 8,
    "offset of BoidRecord.direction does not match WGSL"
);
const _: () = assert!(
    std::mem::offset_of!(BoidRecord, color) == 16,
    "offset of BoidRecord.color does not match WGSL"
);

impl BoidRecord {
    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::from_array(self.position)
    }

    #[inline]
    pub fn direction(&self) -> Vec2 {
        Vec2::from_array(self.direction)
    }
}

/// Uniform random point inside the unit disk.
fn random_in_unit_disk<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    loop {
        let v = Vec2::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0));
        if v.length_squared() <= 1.0 {
            return v;
        }
    }
}

/// Spawn `count` boids scattered over a `width` x `height` surface.
///
/// Positions are uniform over `[0, width) x [0, height)`, directions are
/// uniform inside the unit disk and every boid gets [`DEFAULT_TINT`].
pub fn spawn_boids<R: Rng + ?Sized>(
    count: u32,
    width: u32,
    height: u32,
    rng: &mut R,
) -> Vec<BoidRecord> {
    let size = Vec2::new(width as f32, height as f32);
    (0..count)
        .map(|_| {
            // gen::<f32>() is in [0, 1), and scaling by the size cannot round
            // the product up to the far edge.
            let unit = Vec2::new(rng.gen::<f32>(), rng.gen::<f32>());
            BoidRecord {
                position: (unit * size).to_array(),
                direction: random_in_unit_disk(rng).to_array(),
                color: DEFAULT_TINT,
            }
        })
        .collect()
}

/// Allocation seam for boid arrays.
///
/// `upload` creates a new backend array holding `records`; `bind` points the
/// compute kernel and the boid draw at it; `release` destroys an array that
/// is no longer bound.
pub trait BoidAllocator {
    /// Backend handle for one boid array.
    type Boids;

    fn upload_boids(&mut self, records: &[BoidRecord]) -> Self::Boids;
    fn bind_boids(&mut self, boids: &Self::Boids);
    /// Drop whatever boid array is bound. Called before the last release.
    fn unbind_boids(&mut self) {}
    fn release_boids(&mut self, boids: Self::Boids);
}

/// Owner of the live boid array.
#[derive(Debug)]
pub struct BoidStore<B> {
    buffer: Option<B>,
    len: u32,
    generation: u64,
}

impl<B> Default for BoidStore<B> {
    fn default() -> Self {
        Self {
            buffer: None,
            len: 0,
            generation: 0,
        }
    }
}

impl<B> BoidStore<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the array with `count` (normalized) fresh boids.
    ///
    /// Returns the normalized count actually stored.
    pub fn reset<A, R>(
        &mut self,
        allocator: &mut A,
        count: u32,
        surface_size: (u32, u32),
        rng: &mut R,
    ) -> u32
    where
        A: BoidAllocator<Boids = B>,
        R: Rng + ?Sized,
    {
        let count = normalize_boid_count(count);
        let records = spawn_boids(count, surface_size.0, surface_size.1, rng);

        let fresh = allocator.upload_boids(&records);
        allocator.bind_boids(&fresh);
        if let Some(old) = self.buffer.replace(fresh) {
            allocator.release_boids(old);
        }

        self.len = count;
        self.generation += 1;
        log::debug!(
            "boid store reset: {} boids on {}x{} (generation {})",
            count,
            surface_size.0,
            surface_size.1,
            self.generation
        );
        count
    }

    /// Release the array. The store is empty afterwards.
    pub fn release<A>(&mut self, allocator: &mut A)
    where
        A: BoidAllocator<Boids = B>,
    {
        if let Some(old) = self.buffer.take() {
            allocator.unbind_boids();
            allocator.release_boids(old);
        }
        self.len = 0;
    }

    /// Number of boids in the live array.
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Count of resets performed so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn buffer(&self) -> Option<&B> {
        self.buffer.as_ref()
    }

    pub fn buffer_mut(&mut self) -> Option<&mut B> {
        self.buffer.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[derive(Default)]
    struct Recorder {
        next_id: u32,
        events: Vec<String>,
        bound: Option<u32>,
    }

    impl BoidAllocator for Recorder {
        type Boids = (u32, usize);

        fn upload_boids(&mut self, records: &[BoidRecord]) -> Self::Boids {
            self.next_id += 1;
            self.events.push(format!("upload {}", self.next_id));
            (self.next_id, records.len())
        }

        fn bind_boids(&mut self, boids: &Self::Boids) {
            self.events.push(format!("bind {}", boids.0));
            self.bound = Some(boids.0);
        }

        fn unbind_boids(&mut self) {
            self.events.push("unbind".to_string());
            self.bound = None;
        }

        fn release_boids(&mut self, boids: Self::Boids) {
            assert_ne!(self.bound, Some(boids.0), "released a bound array");
            self.events.push(format!("release {}", boids.0));
        }
    }

    #[test]
    fn test_spawn_within_bounds() {
        let mut rng = SmallRng::seed_from_u64(7);
        let boids = spawn_boids(4096, 640, 360, &mut rng);

        assert_eq!(boids.len(), 4096);
        for b in &boids {
            assert!(b.position[0] >= 0.0 && b.position[0] < 640.0);
            assert!(b.position[1] >= 0.0 && b.position[1] < 360.0);
            assert!(b.direction().length() <= 1.0);
            assert_eq!(b.color, DEFAULT_TINT);
        }
    }

    #[test]
    fn test_spawn_covers_surface() {
        let mut rng = SmallRng::seed_from_u64(3);
        let boids = spawn_boids(2048, 1000, 1000, &mut rng);
        let max_x = boids.iter().map(|b| b.position[0]).fold(0.0, f32::max);
        let max_y = boids.iter().map(|b| b.position[1]).fold(0.0, f32::max);
        assert!(max_x > 900.0);
        assert!(max_y > 900.0);
    }

    #[test]
    fn test_reset_normalizes_count() {
        let mut store = BoidStore::new();
        let mut alloc = Recorder::default();
        let mut rng = SmallRng::seed_from_u64(1);

        assert_eq!(store.reset(&mut alloc, 100, (64, 64), &mut rng), 96);
        assert_eq!(store.len(), 96);
        assert_eq!(store.buffer().map(|b| b.1), Some(96));
    }

    #[test]
    fn test_reset_rebinds_before_release() {
        let mut store = BoidStore::new();
        let mut alloc = Recorder::default();
        let mut rng = SmallRng::seed_from_u64(1);

        store.reset(&mut alloc, 64, (64, 64), &mut rng);
        store.reset(&mut alloc, 64, (64, 64), &mut rng);

        assert_eq!(
            alloc.events,
            vec!["upload 1", "bind 1", "upload 2", "bind 2", "release 1"]
        );
        assert_eq!(store.generation(), 2);
    }

    #[test]
    fn test_release_empties_store() {
        let mut store = BoidStore::new();
        let mut alloc = Recorder::default();
        let mut rng = SmallRng::seed_from_u64(1);

        store.reset(&mut alloc, 32, (64, 64), &mut rng);
        store.release(&mut alloc);

        assert!(store.is_empty());
        assert!(store.buffer().is_none());
        assert_eq!(alloc.events[2..], ["unbind", "release 1"]);
    }
}
