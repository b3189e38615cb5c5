//! The settings capability and the per-setting descriptor table.
//!
//! A settings UI never touches the orchestrator directly. It talks to a
//! [`SimulationSettings`] implementor, and uses [`Setting`] to enumerate what
//! can be edited, how to label it and which range to offer.
//!
//! ```
//! use flockpaint::{CpuBackend, FrameOrchestrator, Setting, SimulationSettings};
//!
//! let mut sim = FrameOrchestrator::new(CpuBackend::new(64, 64));
//! Setting::BodyMass.apply(&mut sim, 100.0);
//! assert_eq!(sim.parameters().body_mass, 10_000.0);
//! assert_eq!(Setting::BodyMass.value(&sim), 100.0);
//! ```

use std::ops::RangeInclusive;

use crate::params::SimulationParameters;

/// Brush radius bounds, in pixels.
pub const BRUSH_SIZE_RANGE: RangeInclusive<f32> = 1.0..=256.0;

/// Brush radius a fresh simulation starts with.
pub const DEFAULT_BRUSH_SIZE: f32 = 16.0;

/// What a settings UI may read and change on a running simulation.
pub trait SimulationSettings {
    /// Whether brush and gravity well input reach the simulation.
    fn allow_input(&self) -> bool;
    fn set_allow_input(&mut self, allow: bool);

    fn parameters(&self) -> &SimulationParameters;

    /// Mutable access for in-place edits; changes land on the next step.
    ///
    /// Do not write `count` here; use [`set_boid_count`](Self::set_boid_count).
    fn parameters_mut(&mut self) -> &mut SimulationParameters;

    /// Round `count` down to a whole number of work groups and reset the
    /// flock at that size.
    fn set_boid_count(&mut self, count: u32);

    /// Brush radius in pixels.
    fn brush_size(&self) -> f32;
    fn set_brush_size(&mut self, size: f32);
}

/// Label, help text and value range for one [`Setting`].
#[derive(Debug, Clone, PartialEq)]
pub struct SettingDescriptor {
    pub label: &'static str,
    pub help: &'static str,
    pub range: RangeInclusive<f32>,
}

/// Every value a settings UI can edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    Count,
    BrushSize,
    Timescale,
    Drag,
    BodyMass,
    BodyRadius,
    Bounciness,
    UnitScale,
    BoidMass,
    BoidMaxForce,
    RepelWeight,
    RepelDistance,
    CohesionWeight,
    CohesionCoef,
    CohesionDistance,
    AlignWeight,
    AlignCoef,
    AlignDistance,
}

impl Setting {
    /// All settings, in display order.
    pub const ALL: [Setting; 18] = [
        Setting::Count,
        Setting::BrushSize,
        Setting::Timescale,
        Setting::Drag,
        Setting::BodyMass,
        Setting::BodyRadius,
        Setting::Bounciness,
        Setting::UnitScale,
        Setting::BoidMass,
        Setting::BoidMaxForce,
        Setting::RepelWeight,
        Setting::RepelDistance,
        Setting::CohesionWeight,
        Setting::CohesionCoef,
        Setting::CohesionDistance,
        Setting::AlignWeight,
        Setting::AlignCoef,
        Setting::AlignDistance,
    ];

    pub fn descriptor(self) -> SettingDescriptor {
        let (label, help, range) = match self {
            Setting::Count => (
                "BOID COUNT :",
                "Number of boids in the simulation (rounded to multiples of 32).",
                32.0..=16_000.0,
            ),
            Setting::BrushSize => (
                "BRUSH SIZE :",
                "Radius of the paint brush in pixels. The mouse wheel changes it too.",
                BRUSH_SIZE_RANGE,
            ),
            Setting::Timescale => ("TIME SCALE :", "Time scale of the simulation.", 0.1..=32.0),
            Setting::Drag => (
                "DRAG :",
                "Coefficient for how much boids resist movement over time.",
                0.0..=16.0,
            ),
            Setting::BodyMass => (
                "BODY MASS :",
                "Mass (to the power of 2 for convenience) of the gravity point that is applied when pressing Q or E.",
                2.0..=10_000_000.0,
            ),
            Setting::BodyRadius => (
                "BODY RADIUS :",
                "Radius of the gravity point that is applied when pressing Q or E.",
                0.0..=32.0,
            ),
            Setting::Bounciness => (
                "BOUNCINESS :",
                "Multiplier for collision speed conservation.",
                0.0..=8.0,
            ),
            Setting::UnitScale => (
                "UNIT SCALE :",
                "Unit scale with which the distance to the gravity point is calculated.",
                0.001..=1.0,
            ),
            Setting::BoidMass => ("BOID MASS :", "Mass of a single boid.", 2.0..=256.0),
            Setting::BoidMaxForce => (
                "BOID MAX FORCE :",
                "Maximum amount of force the flocking algorithm can exert in one second.",
                0.0..=4096.0,
            ),
            Setting::RepelWeight => ("REPEL MULT :", "Multiplier for boid repelling force.", 0.0..=512.0),
            Setting::RepelDistance => (
                "REPEL DIST :",
                "Distance threshold where repelling is applied.",
                0.0..=256.0,
            ),
            Setting::CohesionWeight => (
                "COHESION MULT :",
                "Multiplier for boid cohesion force.",
                0.0..=512.0,
            ),
            Setting::CohesionCoef => (
                "COHESION COEF :",
                "Coefficient for cohesion/velocity subtraction.",
                0.0..=256.0,
            ),
            Setting::CohesionDistance => (
                "COHESION DIST :",
                "Distance threshold where cohesion is applied.",
                0.0..=256.0,
            ),
            Setting::AlignWeight => ("ALIGN MULT :", "Multiplier for boid alignment force.", 0.0..=512.0),
            Setting::AlignCoef => (
                "ALIGN COEF :",
                "Coefficient for alignment/velocity subtraction.",
                0.0..=256.0,
            ),
            Setting::AlignDistance => (
                "ALIGN DIST :",
                "Distance threshold where alignment is applied.",
                0.0..=256.0,
            ),
        };
        SettingDescriptor { label, help, range }
    }

    /// Whether the UI should offer whole numbers only.
    pub fn is_integer(self) -> bool {
        matches!(self, Setting::Count)
    }

    /// Current value as the UI shows it.
    pub fn value(self, settings: &dyn SimulationSettings) -> f32 {
        let p = settings.parameters();
        match self {
            Setting::Count => p.count as f32,
            Setting::BrushSize => settings.brush_size(),
            Setting::Timescale => p.timescale,
            Setting::Drag => p.drag,
            Setting::BodyMass => p.body_mass.max(0.0).sqrt(),
            Setting::BodyRadius => p.body_radius,
            Setting::Bounciness => p.bounciness,
            Setting::UnitScale => p.unit_scale,
            Setting::BoidMass => p.boid_mass,
            Setting::BoidMaxForce => p.boid_max_force,
            Setting::RepelWeight => p.repel_weight,
            Setting::RepelDistance => p.repel_distance,
            Setting::CohesionWeight => p.cohesion_weight,
            Setting::CohesionCoef => p.cohesion_coef,
            Setting::CohesionDistance => p.cohesion_distance,
            Setting::AlignWeight => p.align_weight,
            Setting::AlignCoef => p.align_coef,
            Setting::AlignDistance => p.align_distance,
        }
    }

    /// Store a UI value, clamped to the setting's range.
    pub fn apply(self, settings: &mut dyn SimulationSettings, value: f32) {
        let range = self.descriptor().range;
        let value = value.clamp(*range.start(), *range.end());

        match self {
            Setting::Count => {
                let count = value.round() as u32;
                if count != settings.parameters().count {
                    settings.set_boid_count(count);
                }
                return;
            }
            Setting::BrushSize => {
                settings.set_brush_size(value);
                return;
            }
            _ => {}
        }

        let p = settings.parameters_mut();
        match self {
            Setting::Timescale => p.timescale = value,
            Setting::Drag => p.drag = value,
            Setting::BodyMass => p.body_mass = value * value,
            Setting::BodyRadius => p.body_radius = value,
            Setting::Bounciness => p.bounciness = value,
            Setting::UnitScale => p.unit_scale = value,
            Setting::BoidMass => p.boid_mass = value,
            Setting::BoidMaxForce => p.boid_max_force = value,
            Setting::RepelWeight => p.repel_weight = value,
            Setting::RepelDistance => p.repel_distance = value,
            Setting::CohesionWeight => p.cohesion_weight = value,
            Setting::CohesionCoef => p.cohesion_coef = value,
            Setting::CohesionDistance => p.cohesion_distance = value,
            Setting::AlignWeight => p.align_weight = value,
            Setting::AlignCoef => p.align_coef = value,
            Setting::AlignDistance => p.align_distance = value,
            Setting::Count | Setting::BrushSize => {}
        }
    }
}
