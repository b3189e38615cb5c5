//! End-to-end tests of the frame pipeline.
//!
//! These drive a `FrameOrchestrator` over the headless `CpuBackend`, so the
//! whole sequence (mask sync, brush, paint, boid step, draw) runs without a
//! window or a GPU.

use flockpaint::{
    BoidRecord, CpuBackend, FrameOrchestrator, FrameStatus, MaskSync, RawInput, Setting,
    SimulationParameters, SimulationSettings, Vec2,
};

const W: u32 = 320;
const H: u32 = 240;
const DT: f32 = 1.0 / 60.0;

fn sim() -> FrameOrchestrator<CpuBackend> {
    FrameOrchestrator::new(CpuBackend::new(W, H)).with_seed(42)
}

fn records(sim: &FrameOrchestrator<CpuBackend>) -> Vec<BoidRecord> {
    sim.boids()
        .buffer()
        .map(|b| b.records().to_vec())
        .unwrap_or_default()
}

fn idle() -> RawInput {
    RawInput {
        cursor: Vec2::new(W as f32 / 2.0, H as f32 / 2.0),
        ..RawInput::default()
    }
}

fn painting_at(cursor: Vec2) -> RawInput {
    RawInput {
        cursor,
        paint: true,
        ..RawInput::default()
    }
}

fn coverage(sim: &FrameOrchestrator<CpuBackend>) -> f32 {
    sim.mask().surface().map(|m| m.coverage()).unwrap_or(0.0)
}

// ============================================================================
// Boid State Store
// ============================================================================

#[test]
fn test_boid_count_normalization() {
    let mut sim = sim();
    sim.initialize();

    for requested in [0, 1, 31, 32, 33, 63, 64, 100, 1_000, 4_097] {
        sim.set_boid_count(requested);
        let expected = requested / 32 * 32;
        assert_eq!(sim.parameters().count, expected, "requested {}", requested);
        assert_eq!(sim.boid_count(), expected);
        assert_eq!(records(&sim).len() as u32, expected);
    }
}

#[test]
fn test_reset_places_boids_on_the_surface() {
    let mut sim = sim();
    sim.set_boid_count(2_048);
    sim.initialize();

    let boids = records(&sim);
    assert_eq!(boids.len(), 2_048);
    for boid in &boids {
        let p = boid.position();
        assert!(p.x >= 0.0 && p.x < W as f32, "x = {}", p.x);
        assert!(p.y >= 0.0 && p.y < H as f32, "y = {}", p.y);
        assert!(boid.direction().length() <= 1.0);
    }
}

#[test]
fn test_same_count_twice_resets_twice() {
    let mut sim = sim();
    sim.initialize();
    let uploads = sim.backend().stats().boid_uploads;
    let generation = sim.boids().generation();

    sim.set_boid_count(64);
    let first = records(&sim);
    let first_id = sim.boids().buffer().map(|b| b.id());

    sim.set_boid_count(64);
    let second = records(&sim);
    let second_id = sim.boids().buffer().map(|b| b.id());

    assert_eq!(first.len(), 64);
    assert_eq!(second.len(), 64);
    assert_ne!(first, second, "second reset reused the first array");
    assert_ne!(first_id, second_id);
    assert_eq!(sim.boids().generation(), generation + 2);
    assert_eq!(sim.backend().stats().boid_uploads, uploads + 2);
    // Only the newest array is alive, and it is the one bound.
    assert_eq!(sim.backend().stats().live_boid_arrays(), 1);
    assert_eq!(sim.backend().bound_boids(), second_id);
}

#[test]
fn test_count_set_before_first_frame() {
    let mut sim = sim();
    sim.set_boid_count(100);

    assert!(sim.is_initialized());
    assert_eq!(sim.parameters().count, 96);
    assert_eq!(sim.boid_count(), 96);
    assert_eq!(records(&sim).len(), 96);
}

#[test]
fn test_count_change_clears_mask() {
    let mut sim = sim();
    sim.step_frame(DT, &painting_at(Vec2::new(80.0, 80.0))).unwrap();
    assert!(coverage(&sim) > 0.0);

    sim.set_boid_count(64);
    let status = sim.step_frame(DT, &idle()).unwrap();

    assert_eq!(
        status,
        FrameStatus::Rendered {
            mask: MaskSync::Recreated {
                from: (W, H),
                to: (W, H),
            }
        }
    );
    assert_eq!(coverage(&sim), 0.0);
    assert_eq!(sim.boid_count(), 64);
}

#[test]
fn test_explicit_reset_keeps_parameters() {
    let mut sim = sim();
    sim.parameters_mut().drag = 3.0;
    sim.step_frame(DT, &idle()).unwrap();
    let before = records(&sim);

    sim.reset();

    assert_eq!(sim.parameters().drag, 3.0);
    assert_eq!(sim.boid_count(), 96);
    assert_ne!(records(&sim), before);
}

#[test]
fn test_count_edit_through_settings_table() {
    let mut sim = sim();
    sim.initialize();

    Setting::Count.apply(&mut sim, 1_000.0);
    assert_eq!(sim.boid_count(), 992);
    assert_eq!(records(&sim).len(), 992);
}

// ============================================================================
// Collision Mask dirty check
// ============================================================================

#[test]
fn test_mask_created_with_surface_size() {
    let mut sim = sim();
    sim.step_frame(DT, &idle()).unwrap();

    assert_eq!(sim.mask().size(), Some((W, H)));
    assert_eq!(sim.backend().stats().live_masks(), 1);
    assert_eq!(
        sim.backend().bound_mask(),
        sim.mask().surface().map(|m| m.id())
    );
}

#[test]
fn test_resize_recreates_mask() {
    let mut sim = sim();
    sim.step_frame(DT, &idle()).unwrap();
    let old_id = sim.mask().surface().map(|m| m.id());

    sim.backend_mut().resize(400, 300);
    let status = sim.step_frame(DT, &idle()).unwrap();

    assert_eq!(
        status,
        FrameStatus::Rendered {
            mask: MaskSync::Recreated {
                from: (W, H),
                to: (400, 300),
            }
        }
    );
    assert_eq!(sim.mask().size(), Some((400, 300)));

    let new_id = sim.mask().surface().map(|m| m.id());
    assert_ne!(new_id, old_id);
    assert_eq!(sim.backend().bound_mask(), new_id);
    // The old surface was released, not leaked.
    assert_eq!(sim.backend().stats().live_masks(), 1);
    assert_eq!(sim.backend().stats().mask_releases, 1);
}

#[test]
fn test_dirty_check_is_idempotent() {
    let mut sim = sim();
    sim.step_frame(DT, &idle()).unwrap();
    let id = sim.mask().id();
    let creations = sim.backend().stats().mask_creations;

    for _ in 0..3 {
        let status = sim.step_frame(DT, &idle()).unwrap();
        assert_eq!(
            status,
            FrameStatus::Rendered {
                mask: MaskSync::Unchanged
            }
        );
    }

    assert_eq!(sim.mask().id(), id);
    assert_eq!(sim.backend().stats().mask_creations, creations);
}

#[test]
fn test_minimized_window_keeps_state() {
    let mut sim = sim();
    sim.step_frame(DT, &idle()).unwrap();
    let before = records(&sim);

    sim.backend_mut().resize(0, 0);
    assert_eq!(sim.step_frame(DT, &idle()), Ok(FrameStatus::Skipped));
    assert_eq!(records(&sim), before);
    assert_eq!(sim.mask().size(), Some((W, H)));
}

#[test]
fn test_first_frame_on_zero_surface_places_boids_after_resize() {
    let mut sim = FrameOrchestrator::new(CpuBackend::new(0, 0)).with_seed(42);
    assert_eq!(sim.step_frame(DT, &idle()), Ok(FrameStatus::Skipped));

    sim.backend_mut().resize(W, H);
    sim.step_frame(0.0, &idle()).unwrap();

    let boids = records(&sim);
    assert_eq!(boids.len(), 96);
    let at_origin = boids
        .iter()
        .filter(|b| b.position() == Vec2::ZERO)
        .count();
    assert!(at_origin < boids.len(), "{} of {} boids at the origin", at_origin, boids.len());
    for boid in &boids {
        let p = boid.position();
        assert!(p.x >= 0.0 && p.x < W as f32, "x = {}", p.x);
        assert!(p.y >= 0.0 && p.y < H as f32, "y = {}", p.y);
    }
}

// ============================================================================
// Brush and paint
// ============================================================================

#[test]
fn test_disabled_input_zeroes_brush_and_well() {
    let mut sim = sim();
    sim.set_allow_input(false);

    let everything = RawInput {
        cursor: Vec2::new(100.0, 100.0),
        paint: true,
        erase: true,
        attract: true,
        repel: true,
    };
    sim.step_frame(DT, &everything).unwrap();

    let uniforms = sim.last_uniforms().copied().unwrap();
    let paint = sim.last_paint().copied().unwrap();
    assert_eq!(uniforms.signed_body_mass(), 0.0);
    assert_eq!(paint.weight, 0.0);
    assert_eq!(sim.last_brush().map(|b| b.mass_sign), Some(0));
    assert_eq!(coverage(&sim), 0.0);
}

#[test]
fn test_paint_then_erase() {
    let mut sim = sim();
    let cursor = Vec2::new(160.0, 120.0);

    sim.step_frame(DT, &painting_at(cursor)).unwrap();
    let mask = sim.mask().surface().unwrap();
    assert!(mask.is_solid(cursor));
    assert!(!mask.is_solid(Vec2::new(10.0, 10.0)));
    assert!(coverage(&sim) > 0.0);

    let erase = RawInput {
        cursor,
        erase: true,
        ..RawInput::default()
    };
    sim.step_frame(DT, &erase).unwrap();
    assert!(coverage(&sim) < 1e-3);
}

#[test]
fn test_reset_clears_painted_mask() {
    let mut sim = sim();
    sim.step_frame(DT, &painting_at(Vec2::new(80.0, 80.0))).unwrap();
    assert!(coverage(&sim) > 0.0);
    let old_id = sim.mask().id();

    sim.reset();
    let status = sim.step_frame(DT, &idle()).unwrap();

    assert_eq!(
        status,
        FrameStatus::Rendered {
            mask: MaskSync::Recreated {
                from: (W, H),
                to: (W, H),
            }
        }
    );
    assert_ne!(sim.mask().id(), old_id);
    assert_eq!(coverage(&sim), 0.0);
    assert_eq!(sim.backend().stats().live_masks(), 1);
}

#[test]
fn test_boids_do_not_enter_painted_region() {
    let mut sim = sim()
        .with_parameters(SimulationParameters {
            count: 1_024,
            ..SimulationParameters::flocking_preset()
        })
        .with_brush_size(60.0);
    let center = Vec2::new(W as f32 / 2.0, H as f32 / 2.0);
    sim.step_frame(DT, &painting_at(center)).unwrap();

    for _ in 0..20 {
        let before = records(&sim);
        sim.step_frame(DT, &idle()).unwrap();
        let after = records(&sim);
        let mask = sim.mask().surface().unwrap();

        for (b, a) in before.iter().zip(&after) {
            if !mask.is_solid(b.position()) {
                assert!(
                    !mask.is_solid(a.position()),
                    "boid moved from {:?} into the mask at {:?}",
                    b.position(),
                    a.position()
                );
            }
        }
    }
}

// ============================================================================
// Compute payload
// ============================================================================

#[test]
fn test_payload_group_three() {
    let mut sim = sim();
    sim.set_boid_count(100);
    assert_eq!(sim.boid_count(), 96);

    sim.step_frame(DT, &idle()).unwrap();
    let uniforms = sim.last_uniforms().copied().unwrap();

    assert_eq!(uniforms.num_boids, 96);
    assert!((uniforms.params3[0] - 0.2).abs() < 1e-6);
    assert!((uniforms.params3[1] - DT).abs() < 1e-9);
    assert_eq!(uniforms.params3[2], W as f32);
    assert_eq!(uniforms.params3[3], H as f32);
}

#[test]
fn test_payload_group_five_sign() {
    let cases = [
        (
            RawInput {
                attract: true,
                ..idle()
            },
            100_000.0,
        ),
        (
            RawInput {
                repel: true,
                ..idle()
            },
            -100_000.0,
        ),
        (idle(), 0.0),
    ];

    for (raw, expected) in cases {
        let mut sim = sim();
        sim.step_frame(DT, &raw).unwrap();
        let uniforms = sim.last_uniforms().copied().unwrap();
        assert_eq!(uniforms.params5[0], expected);
    }
}

#[test]
fn test_parameter_edits_land_next_frame() {
    let mut sim = sim();
    sim.step_frame(DT, &idle()).unwrap();

    sim.parameters_mut().bounciness = 0.5;
    sim.parameters_mut().timescale = 2.0;
    sim.step_frame(DT, &idle()).unwrap();

    let uniforms = sim.last_uniforms().copied().unwrap();
    assert_eq!(uniforms.bounciness(), 0.5);
    assert!((uniforms.step() - 2.0 * DT).abs() < 1e-9);
}

// ============================================================================
// Degenerate inputs
// ============================================================================

#[test]
fn test_zero_and_negative_delta_freeze_the_flock() {
    let mut sim = sim();
    // Boids spawned in the last pixel column or row are pulled onto the
    // edge by the first step, whatever its length.
    sim.step_frame(0.0, &idle()).unwrap();
    let before = records(&sim);

    sim.step_frame(0.0, &idle()).unwrap();
    sim.step_frame(-1.0, &idle()).unwrap();

    assert_eq!(records(&sim), before);
}

#[test]
fn test_zero_mass_stays_finite() {
    let mut sim = sim();
    sim.parameters_mut().boid_mass = 0.0;
    let attract = RawInput {
        attract: true,
        ..idle()
    };
    for _ in 0..5 {
        sim.step_frame(DT, &attract).unwrap();
    }

    for boid in records(&sim) {
        assert!(boid.position().is_finite());
        assert!(boid.direction().is_finite());
    }
}

#[test]
fn test_empty_flock_still_draws() {
    let mut sim = sim();
    sim.set_boid_count(10);
    sim.step_frame(DT, &idle()).unwrap();

    assert_eq!(sim.boid_count(), 0);
    assert_eq!(sim.backend().last_draw_count(), 0);
    assert_eq!(sim.backend().stats().frames, 1);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_shutdown_then_restart() {
    let mut sim = sim();
    sim.step_frame(DT, &idle()).unwrap();
    sim.shutdown();

    let stats = sim.backend().stats();
    assert_eq!(stats.live_boid_arrays(), 0);
    assert_eq!(stats.live_masks(), 0);

    // The next frame brings everything back.
    sim.step_frame(DT, &idle()).unwrap();
    assert!(sim.is_initialized());
    assert_eq!(sim.boid_count(), 96);
    assert_eq!(sim.mask().size(), Some((W, H)));
    assert_eq!(sim.backend().stats().live_boid_arrays(), 1);
    assert_eq!(sim.backend().stats().live_masks(), 1);
}
