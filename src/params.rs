//! Tunable simulation parameters.
//!
//! [`SimulationParameters`] is a flat record of every physics and flocking
//! knob plus the boid count. The orchestrator owns it and lends it to the
//! settings layer for in-place edits; edits land on the next compute dispatch.
//!
//! The boid count is special: the compute kernel processes boids in work
//! groups of exactly [`WORKGROUP_WIDTH`], so the count is always stored
//! rounded down to a multiple of that width. Change it through
//! [`SimulationSettings::set_boid_count`](crate::SimulationSettings::set_boid_count),
//! never by writing the field.

/// Number of boids processed by one compute work group.
pub const WORKGROUP_WIDTH: u32 = 32;

/// Round a requested boid count down to a whole number of work groups.
///
/// ```
/// use flockpaint::normalize_boid_count;
///
/// assert_eq!(normalize_boid_count(100), 96);
/// assert_eq!(normalize_boid_count(31), 0);
/// ```
#[inline]
pub fn normalize_boid_count(count: u32) -> u32 {
    (count / WORKGROUP_WIDTH) * WORKGROUP_WIDTH
}

/// Physics and flocking tunables.
///
/// Distances and the gravity well position are in output-surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParameters {
    /// Number of boids. Always a multiple of [`WORKGROUP_WIDTH`].
    pub count: u32,

    // Physics
    /// Multiplier applied to the frame delta before integration.
    pub timescale: f32,
    /// Velocity damping per second.
    pub drag: f32,
    /// Mass of the cursor gravity well.
    pub body_mass: f32,
    /// Softening radius of the gravity well, in scaled units.
    pub body_radius: f32,
    /// Speed retained after bouncing off the mask or a screen edge.
    pub bounciness: f32,
    /// Pixel-to-unit scale used for the gravity well distance.
    pub unit_scale: f32,
    /// Mass of a single boid.
    pub boid_mass: f32,

    // Flocking
    /// Largest steering force the flocking rules may exert per second.
    pub boid_max_force: f32,
    pub repel_weight: f32,
    pub repel_distance: f32,
    pub cohesion_weight: f32,
    pub cohesion_coef: f32,
    pub cohesion_distance: f32,
    pub align_weight: f32,
    pub align_coef: f32,
    pub align_distance: f32,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            count: normalize_boid_count(100),
            timescale: 1.0,
            drag: 1.0,
            body_mass: 100_000.0,
            body_radius: 0.5,
            bounciness: 1.0,
            unit_scale: 0.1,
            boid_mass: 5.0,
            boid_max_force: 1.0,
            repel_weight: 1.0,
            repel_distance: 1.0,
            cohesion_weight: 1.0,
            cohesion_coef: 1.0,
            cohesion_distance: 1.0,
            align_weight: 1.0,
            align_coef: 1.0,
            align_distance: 1.0,
        }
    }
}

impl SimulationParameters {
    /// A livelier preset than the bare defaults: wider neighborhoods and
    /// stronger steering so flocks form within a few seconds.
    pub fn flocking_preset() -> Self {
        Self {
            count: normalize_boid_count(8192),
            drag: 0.2,
            boid_max_force: 600.0,
            repel_weight: 40.0,
            repel_distance: 10.0,
            cohesion_weight: 1.5,
            cohesion_coef: 2.0,
            cohesion_distance: 40.0,
            align_weight: 2.0,
            align_coef: 1.2,
            align_distance: 30.0,
            ..Self::default()
        }
    }

    /// Reciprocal boid mass, or zero when the mass is not positive.
    ///
    /// A zero inverse mass turns every force into a no-op instead of a
    /// division by zero.
    #[inline]
    pub fn inverse_boid_mass(&self) -> f32 {
        if self.boid_mass > 0.0 {
            1.0 / self.boid_mass
        } else {
            0.0
        }
    }

    /// Integration step for a frame that took `delta_time` seconds.
    ///
    /// Negative products clamp to zero so a bad delta freezes the flock
    /// rather than running it backwards.
    #[inline]
    pub fn step(&self, delta_time: f32) -> f32 {
        (delta_time * self.timescale).max(0.0)
    }

    /// Number of compute work groups needed for the current count.
    #[inline]
    pub fn workgroups(&self) -> u32 {
        self.count / WORKGROUP_WIDTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_is_floor_to_workgroup() {
        for n in (0..2_000).chain([u32::MAX - 5, u32::MAX]) {
            let normalized = normalize_boid_count(n);
            assert_eq!(normalized % WORKGROUP_WIDTH, 0);
            assert!(normalized <= n);
            assert!(n - normalized < WORKGROUP_WIDTH);
        }
    }

    #[test]
    fn test_below_one_group_is_zero() {
        assert_eq!(normalize_boid_count(0), 0);
        assert_eq!(normalize_boid_count(31), 0);
        assert_eq!(normalize_boid_count(32), 32);
    }

    #[test]
    fn test_defaults() {
        let params = SimulationParameters::default();
        assert_eq!(params.count, 96);
        assert_eq!(params.boid_mass, 5.0);
        assert_eq!(params.body_mass, 100_000.0);
        assert_eq!(params.unit_scale, 0.1);
        assert_eq!(params.workgroups(), 3);
    }

    #[test]
    fn test_preset_count_is_normalized() {
        let params = SimulationParameters::flocking_preset();
        assert_eq!(params.count % WORKGROUP_WIDTH, 0);
    }

    #[test]
    fn test_inverse_mass_guards_zero() {
        let mut params = SimulationParameters::default();
        assert!((params.inverse_boid_mass() - 0.2).abs() < 1e-6);

        params.boid_mass = 0.0;
        assert_eq!(params.inverse_boid_mass(), 0.0);

        params.boid_mass = -3.0;
        assert_eq!(params.inverse_boid_mass(), 0.0);
    }

    #[test]
    fn test_step_scales_and_clamps() {
        let mut params = SimulationParameters::default();
        params.timescale = 2.0;
        assert_eq!(params.step(0.5), 1.0);
        assert_eq!(params.step(-0.5), 0.0);
    }
}
