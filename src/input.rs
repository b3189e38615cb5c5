//! Input handling.
//!
//! [`Input`] folds raw winit window events into per-frame state, tracking
//! both instantaneous events (key just pressed) and continuous state (key or
//! button held). Once per frame the window glue reduces it to a
//! [`RawInput`] snapshot, which is all the simulation core ever sees.
//!
//! Bindings:
//!
//! | Control | Effect |
//! |---------|--------|
//! | Left mouse | paint collision mask |
//! | Right mouse | erase collision mask |
//! | `Q` held | attracting gravity well at the cursor |
//! | `E` held | repelling gravity well at the cursor |
//! | `W` | reset boids and clear the mask |
//! | Mouse wheel | resize brush |
//! | `Tab` | toggle the settings panel (`egui` feature) |
//! | `Escape` | quit |

use glam::Vec2;
use std::collections::HashSet;
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode as WinitKeyCode, PhysicalKey};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    fn from_winit(btn: WinitMouseButton) -> Option<Self> {
        match btn {
            WinitMouseButton::Left => Some(MouseButton::Left),
            WinitMouseButton::Right => Some(MouseButton::Right),
            WinitMouseButton::Middle => Some(MouseButton::Middle),
            _ => None,
        }
    }
}

/// The keys the simulation reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// Attracting gravity well.
    Q,
    /// Repelling gravity well.
    E,
    /// Reset.
    W,
    /// Settings panel toggle.
    Tab,
    /// Quit.
    Escape,
}

impl KeyCode {
    fn from_winit(key: WinitKeyCode) -> Option<Self> {
        match key {
            WinitKeyCode::KeyQ => Some(KeyCode::Q),
            WinitKeyCode::KeyE => Some(KeyCode::E),
            WinitKeyCode::KeyW => Some(KeyCode::W),
            WinitKeyCode::Tab => Some(KeyCode::Tab),
            WinitKeyCode::Escape => Some(KeyCode::Escape),
            _ => None,
        }
    }
}

/// Input state tracking for keyboard and mouse.
#[derive(Debug, Default)]
pub struct Input {
    keys_held: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,

    mouse_held: HashSet<MouseButton>,
    mouse_pressed: HashSet<MouseButton>,

    /// Cursor position in physical pixels, origin top-left, y down.
    cursor: Vec2,

    scroll_delta: f32,
}

impl Input {
    /// Create a new input tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a key was pressed this frame (just went down).
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Check if a key is currently held down.
    pub fn key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    /// Check if a mouse button was pressed this frame.
    pub fn mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse_pressed.contains(&button)
    }

    /// Check if a mouse button is currently held down.
    pub fn mouse_held(&self, button: MouseButton) -> bool {
        self.mouse_held.contains(&button)
    }

    /// Cursor position in surface pixels.
    pub fn cursor(&self) -> Vec2 {
        self.cursor
    }

    /// Scroll wheel notches this frame. Positive is up/forward.
    pub fn scroll_delta(&self) -> f32 {
        self.scroll_delta
    }

    /// Reduce the tracked state to the snapshot the core consumes.
    pub fn sample(&self) -> RawInput {
        RawInput {
            cursor: self.cursor,
            paint: self.mouse_held(MouseButton::Left),
            erase: self.mouse_held(MouseButton::Right),
            attract: self.key_held(KeyCode::Q),
            repel: self.key_held(KeyCode::E),
        }
    }

    /// Clear per-frame state. Call after the frame has consumed it.
    pub(crate) fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_pressed.clear();
        self.scroll_delta = 0.0;
    }

    /// Drop all held state, e.g. when the window loses focus and release
    /// events would never arrive.
    pub(crate) fn release_all(&mut self) {
        self.keys_held.clear();
        self.mouse_held.clear();
    }

    /// Process a winit window event.
    pub(crate) fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                let Some(key) = KeyCode::from_winit(code) else {
                    return;
                };
                match event.state {
                    ElementState::Pressed => {
                        // Only fire pressed event if not already held (no repeat)
                        if !self.keys_held.contains(&key) {
                            self.keys_pressed.insert(key);
                        }
                        self.keys_held.insert(key);
                    }
                    ElementState::Released => {
                        self.keys_held.remove(&key);
                    }
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let Some(btn) = MouseButton::from_winit(*button) else {
                    return;
                };
                match state {
                    ElementState::Pressed => {
                        self.mouse_pressed.insert(btn);
                        self.mouse_held.insert(btn);
                    }
                    ElementState::Released => {
                        self.mouse_held.remove(&btn);
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
            }

            WindowEvent::MouseWheel { delta, .. } => {
                self.scroll_delta += match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
            }

            WindowEvent::Focused(false) => self.release_all(),

            _ => {}
        }
    }

    /// Process an event the settings panel consumed.
    ///
    /// Presses and scrolling stay with the panel. Releases, focus loss and
    /// cursor motion still land here, so a button let go over the panel does
    /// not stay held.
    #[cfg(any(feature = "egui", test))]
    pub(crate) fn handle_consumed_event(&mut self, event: &WindowEvent) {
        let passes = match event {
            WindowEvent::KeyboardInput { event, .. } => event.state == ElementState::Released,
            WindowEvent::MouseInput { state, .. } => *state == ElementState::Released,
            WindowEvent::CursorMoved { .. } | WindowEvent::Focused(false) => true,
            _ => false,
        };
        if passes {
            self.handle_event(event);
        }
    }
}

/// Device state for one frame, before the input-enable flag is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawInput {
    /// Cursor position in surface pixels.
    pub cursor: Vec2,
    /// Paint button held.
    pub paint: bool,
    /// Erase button held.
    pub erase: bool,
    /// Attracting well key held.
    pub attract: bool,
    /// Repelling well key held.
    pub repel: bool,
}

/// Brush and gravity well state for one frame.
///
/// Derived from [`RawInput`] every frame and never stored across frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushState {
    /// Cursor position in surface pixels.
    pub cursor: Vec2,
    /// Brush radius in pixels.
    pub radius: f32,
    /// `1.0` paints, `-1.0` erases, `0.0` leaves the mask untouched.
    pub weight: f32,
    /// `1` attracts, `-1` repels, `0` disables the gravity well.
    pub mass_sign: i32,
    /// Whether input is enabled; the brush ring is only drawn when it is.
    pub enabled: bool,
}

impl BrushState {
    /// Apply the input-enable flag and key priorities to raw device state.
    ///
    /// With input disabled the brush weight and mass sign are forced to zero
    /// whatever the devices report. Painting wins over erasing and attracting
    /// wins over repelling.
    pub fn derive(raw: &RawInput, radius: f32, allow_input: bool) -> Self {
        let weight = match (allow_input, raw.paint, raw.erase) {
            (false, _, _) => 0.0,
            (true, true, _) => 1.0,
            (true, false, true) => -1.0,
            (true, false, false) => 0.0,
        };
        let mass_sign = match (allow_input, raw.attract, raw.repel) {
            (false, _, _) => 0,
            (true, true, _) => 1,
            (true, false, true) => -1,
            (true, false, false) => 0,
        };

        Self {
            cursor: raw.cursor,
            radius,
            weight,
            mass_sign,
            enabled: allow_input,
        }
    }

    /// Whether the brush writes to the mask this frame.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.weight != 0.0
    }
}
