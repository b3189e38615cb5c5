//! winit application handler driving the frame loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow},
    window::{Window, WindowId},
};

use crate::error::{GpuError, SimulationError};
use crate::gpu::GpuBackend;
use crate::input::{Input, KeyCode};
use crate::orchestrator::FrameOrchestrator;
#[cfg(feature = "egui")]
use crate::settings::SimulationSettings;
use crate::simulation::SimConfig;
use crate::time::{frame_interval, Time};

/// Frames between window title refreshes.
const TITLE_REFRESH_FRAMES: u64 = 30;

pub(crate) struct App {
    config: SimConfig,
    window: Option<Arc<Window>>,
    sim: Option<FrameOrchestrator<GpuBackend>>,
    input: Input,
    time: Time,
    frame_interval: Option<Duration>,
    next_frame: Instant,
    #[cfg(feature = "egui")]
    panel_open: bool,
    error: Option<SimulationError>,
}

impl App {
    pub(crate) fn new(config: SimConfig) -> Self {
        let time = Time::new().with_max_delta(config.max_delta);
        let frame_interval = frame_interval(config.target_fps);
        Self {
            config,
            window: None,
            sim: None,
            input: Input::new(),
            time,
            frame_interval,
            next_frame: Instant::now(),
            #[cfg(feature = "egui")]
            panel_open: false,
            error: None,
        }
    }

    /// The error that stopped the loop, if any.
    pub(crate) fn take_error(&mut self) -> Option<SimulationError> {
        self.error.take()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: SimulationError) {
        log::error!("{}", err);
        self.error = Some(err);
        event_loop.exit();
    }

    fn create(&self, event_loop: &ActiveEventLoop) -> Result<(Arc<Window>, GpuBackend), SimulationError> {
        let (width, height) = self.config.window_size;
        let window_attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(width, height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let backend: Result<GpuBackend, GpuError> =
            pollster::block_on(GpuBackend::new(window.clone(), self.config.boid_size));
        Ok((window, backend?))
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(sim)) = (self.window.clone(), self.sim.as_mut()) else {
            return;
        };

        let (_, delta) = self.time.update();

        if self.input.key_pressed(KeyCode::Escape) {
            event_loop.exit();
            return;
        }
        if self.input.key_pressed(KeyCode::W) {
            sim.reset();
        }
        sim.scroll_brush(self.input.scroll_delta());

        #[cfg(feature = "egui")]
        {
            if self.input.key_pressed(KeyCode::Tab) {
                self.panel_open = !self.panel_open;
                sim.set_allow_input(!self.panel_open);
            }
            let ctx = sim.backend_mut().egui_begin(&window);
            if self.panel_open {
                crate::ui::settings_panel(&ctx, &mut *sim);
            }
            sim.backend_mut().egui_end(&window);
        }

        match sim.step_frame(delta, &self.input.sample()) {
            Ok(_) => {}
            Err(e) if e.needs_reconfigure() => sim.backend_mut().reconfigure(),
            Err(e) if e.is_fatal() => {
                log::error!("render error: {}", e);
                event_loop.exit();
            }
            Err(e) => log::warn!("skipped frame: {}", e),
        }

        if self.time.frame() % TITLE_REFRESH_FRAMES == 1 {
            window.set_title(&format!(
                "{} | {:.0} fps | {} boids",
                self.config.title,
                self.time.fps(),
                sim.boid_count()
            ));
        }

        self.input.begin_frame();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match self.create(event_loop) {
            Ok((window, backend)) => {
                let sim = FrameOrchestrator::new(backend)
                    .with_parameters(self.config.params)
                    .with_brush_size(self.config.brush_size);
                self.window = Some(window);
                self.sim = Some(sim);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        #[cfg(feature = "egui")]
        let consumed = match (&self.window, &mut self.sim) {
            (Some(window), Some(sim)) => sim.backend_mut().egui_on_event(window, &event),
            _ => false,
        };
        #[cfg(not(feature = "egui"))]
        let consumed = false;

        if consumed {
            #[cfg(feature = "egui")]
            self.input.handle_consumed_event(&event);
        } else {
            self.input.handle_event(&event);
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(sim) = &mut self.sim {
                    sim.backend_mut().resize(physical_size);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = &self.window else {
            return;
        };
        match self.frame_interval {
            Some(interval) => {
                let now = Instant::now();
                if now >= self.next_frame {
                    window.request_redraw();
                    self.next_frame = now + interval;
                }
                event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame));
            }
            None => {
                window.request_redraw();
                event_loop.set_control_flow(ControlFlow::Poll);
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(sim) = &mut self.sim {
            sim.shutdown();
        }
    }
}
