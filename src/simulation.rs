//! Simulation builder and runner

use winit::event_loop::{ControlFlow, EventLoop};

use crate::error::SimulationError;
use crate::params::{normalize_boid_count, SimulationParameters};
use crate::settings::{BRUSH_SIZE_RANGE, DEFAULT_BRUSH_SIZE};
use crate::window::App;

/// Boid length in pixels when none is configured.
pub const DEFAULT_BOID_SIZE: f32 = 8.0;

/// Frame cadence when none is configured.
pub const DEFAULT_TARGET_FPS: u32 = 120;

/// Largest single step after a stall, in seconds.
pub const DEFAULT_MAX_DELTA: f32 = 0.25;

/// Everything the window loop needs to start.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SimConfig {
    pub title: String,
    pub window_size: (u32, u32),
    pub params: SimulationParameters,
    pub brush_size: f32,
    pub boid_size: f32,
    pub target_fps: Option<u32>,
    pub max_delta: Option<f32>,
}

/// A flocking simulation builder.
///
/// Use method chaining to configure, then call `.run()` to open the window.
///
/// ```no_run
/// use flockpaint::prelude::*;
///
/// Simulation::new()
///     .with_boid_count(4_000)
///     .with_brush_size(24.0)
///     .run()
///     .ok();
/// ```
pub struct Simulation {
    config: SimConfig,
}

impl Simulation {
    /// Create a new simulation with default settings.
    pub fn new() -> Self {
        Self {
            config: SimConfig {
                title: "flockpaint".to_string(),
                window_size: (1280, 720),
                params: SimulationParameters::default(),
                brush_size: DEFAULT_BRUSH_SIZE,
                boid_size: DEFAULT_BOID_SIZE,
                target_fps: Some(DEFAULT_TARGET_FPS),
                max_delta: Some(DEFAULT_MAX_DELTA),
            },
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    /// Initial inner size of the window in logical pixels.
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.config.window_size = (width, height);
        self
    }

    /// Replace every parameter. The boid count is normalized.
    pub fn with_parameters(mut self, params: SimulationParameters) -> Self {
        self.config.params = SimulationParameters {
            count: normalize_boid_count(params.count),
            ..params
        };
        self
    }

    /// Set the number of boids, rounded down to a multiple of 32.
    pub fn with_boid_count(mut self, count: u32) -> Self {
        self.config.params.count = normalize_boid_count(count);
        self
    }

    /// Brush radius in pixels.
    pub fn with_brush_size(mut self, size: f32) -> Self {
        self.config.brush_size = size.clamp(*BRUSH_SIZE_RANGE.start(), *BRUSH_SIZE_RANGE.end());
        self
    }

    /// Length of the drawn boid in pixels.
    pub fn with_boid_size(mut self, size: f32) -> Self {
        self.config.boid_size = size.max(1.0);
        self
    }

    /// Redraw cadence. `None` redraws as fast as the event loop allows.
    ///
    /// Physics scales with measured time, so this only affects smoothness.
    pub fn with_target_fps(mut self, fps: Option<u32>) -> Self {
        self.config.target_fps = fps;
        self
    }

    /// Cap on the delta time of a single step. `None` disables the cap.
    pub fn with_max_delta(mut self, max_delta: Option<f32>) -> Self {
        self.config.max_delta = max_delta;
        self
    }

    /// Open the window and run until it is closed.
    ///
    /// Fails if the event loop cannot start, the window cannot be created,
    /// or GPU initialization fails (including shader validation).
    pub fn run(self) -> Result<(), SimulationError> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App::new(self.config);
        event_loop.run_app(&mut app)?;

        match app.take_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    #[cfg(test)]
    pub(crate) fn config(&self) -> &SimConfig {
        &self.config
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let sim = Simulation::new();
        let config = sim.config();
        assert_eq!(config.params, SimulationParameters::default());
        assert_eq!(config.target_fps, Some(120));
        assert_eq!(config.max_delta, Some(0.25));
        assert_eq!(config.brush_size, DEFAULT_BRUSH_SIZE);
    }

    #[test]
    fn test_boid_count_is_normalized() {
        let sim = Simulation::new().with_boid_count(1_000);
        assert_eq!(sim.config().params.count, 992);

        let params = SimulationParameters {
            count: 31,
            ..SimulationParameters::default()
        };
        let sim = Simulation::new().with_parameters(params);
        assert_eq!(sim.config().params.count, 0);
    }

    #[test]
    fn test_builder_chain() {
        let sim = Simulation::new()
            .with_title("test")
            .with_window_size(640, 480)
            .with_brush_size(10_000.0)
            .with_boid_size(0.0)
            .with_target_fps(None)
            .with_max_delta(None);

        let config = sim.config();
        assert_eq!(config.title, "test");
        assert_eq!(config.window_size, (640, 480));
        assert_eq!(config.brush_size, 256.0);
        assert_eq!(config.boid_size, 1.0);
        assert_eq!(config.target_fps, None);
        assert_eq!(config.max_delta, None);
    }

    #[test]
    fn test_parameters_keep_later_count() {
        let sim = Simulation::new()
            .with_parameters(SimulationParameters::flocking_preset())
            .with_boid_count(64);
        assert_eq!(sim.config().params.count, 64);
    }
}
