//! Error types for flockpaint.
//!
//! Startup failures (no adapter, shader or pipeline rejected by the device)
//! are fatal and surface as [`SimulationError`]. Per-frame surface trouble is
//! a [`FrameError`] that the window loop either recovers from or skips.

use std::fmt;

/// Errors that can occur during GPU initialization.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// A shader module or pipeline failed validation.
    Shader {
        label: &'static str,
        message: String,
    },
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::Shader { label, message } => {
                write!(f, "Shader '{}' failed to compile: {}", label, message)
            }
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Errors that can stop a single frame from rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The surface was lost and must be reconfigured.
    Lost,
    /// The surface no longer matches the window and must be reconfigured.
    Outdated,
    /// Acquiring the next surface texture timed out.
    Timeout,
    /// The device ran out of memory. Not recoverable.
    OutOfMemory,
    /// Any other acquisition failure.
    Other,
}

impl FrameError {
    /// Whether reconfiguring the surface fixes this error.
    pub fn needs_reconfigure(&self) -> bool {
        matches!(self, FrameError::Lost | FrameError::Outdated)
    }

    /// Whether the event loop should give up.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::OutOfMemory)
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Lost => write!(f, "Surface lost"),
            FrameError::Outdated => write!(f, "Surface outdated"),
            FrameError::Timeout => write!(f, "Timed out acquiring surface texture"),
            FrameError::OutOfMemory => write!(f, "GPU out of memory"),
            FrameError::Other => write!(f, "Failed to acquire surface texture"),
        }
    }
}

impl std::error::Error for FrameError {}

impl From<wgpu::SurfaceError> for FrameError {
    fn from(e: wgpu::SurfaceError) -> Self {
        match e {
            wgpu::SurfaceError::Lost => FrameError::Lost,
            wgpu::SurfaceError::Outdated => FrameError::Outdated,
            wgpu::SurfaceError::Timeout => FrameError::Timeout,
            wgpu::SurfaceError::OutOfMemory => FrameError::OutOfMemory,
            _ => FrameError::Other,
        }
    }
}

/// Errors that can occur when running a simulation.
#[derive(Debug)]
pub enum SimulationError {
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
    /// GPU initialization failed.
    Gpu(GpuError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            SimulationError::Window(e) => write!(f, "Failed to create window: {}", e),
            SimulationError::Gpu(e) => write!(f, "GPU error: {}", e),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::EventLoop(e) => Some(e),
            SimulationError::Window(e) => Some(e),
            SimulationError::Gpu(e) => Some(e),
        }
    }
}

impl From<winit::error::EventLoopError> for SimulationError {
    fn from(e: winit::error::EventLoopError) -> Self {
        SimulationError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for SimulationError {
    fn from(e: winit::error::OsError) -> Self {
        SimulationError::Window(e)
    }
}

impl From<GpuError> for SimulationError {
    fn from(e: GpuError) -> Self {
        SimulationError::Gpu(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_error_recovery_classes() {
        assert!(FrameError::from(wgpu::SurfaceError::Lost).needs_reconfigure());
        assert!(FrameError::from(wgpu::SurfaceError::Outdated).needs_reconfigure());
        assert!(!FrameError::Timeout.needs_reconfigure());
        assert!(FrameError::from(wgpu::SurfaceError::OutOfMemory).is_fatal());
        assert!(!FrameError::Lost.is_fatal());
    }

    #[test]
    fn test_shader_error_message_names_module() {
        let err = GpuError::Shader {
            label: "Boid Compute",
            message: "unknown identifier".into(),
        };
        let text = err.to_string();
        assert!(text.contains("Boid Compute"));
        assert!(text.contains("unknown identifier"));
    }
}
