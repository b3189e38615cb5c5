//! Frame clock.
//!
//! The simulation steps with real elapsed time, not a fixed step, so the
//! clock is the source of every `delta_time` handed to
//! [`FrameOrchestrator::step_frame`](crate::FrameOrchestrator::step_frame).
//! After a stall (a dragged window, a breakpoint) one huge delta would launch
//! every boid across the screen, so the delta can be capped.

use std::time::{Duration, Instant};

/// Elapsed time, delta time, frame count and FPS.
#[derive(Debug)]
pub struct Time {
    start: Instant,
    last_frame: Instant,
    elapsed_secs: f32,
    delta_secs: f32,
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    /// Largest delta `update` reports, if any.
    max_delta: Option<f32>,
}

impl Time {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(now: Instant) -> Self {
        Self {
            start: now,
            last_frame: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            max_delta: None,
        }
    }

    /// Cap the delta reported by [`update`](Self::update). `None` disables
    /// the cap.
    pub fn with_max_delta(mut self, max_delta: Option<f32>) -> Self {
        self.max_delta = max_delta.map(|d| d.max(0.0));
        self
    }

    /// Advance one frame. Returns `(elapsed, delta)` in seconds.
    pub fn update(&mut self) -> (f32, f32) {
        self.update_at(Instant::now())
    }

    fn update_at(&mut self, now: Instant) -> (f32, f32) {
        let raw_delta = now.saturating_duration_since(self.last_frame).as_secs_f32();
        self.delta_secs = match self.max_delta {
            Some(max) => raw_delta.min(max),
            None => raw_delta,
        };
        self.last_frame = now;
        self.elapsed_secs = now.saturating_duration_since(self.start).as_secs_f32();
        self.frame_count += 1;

        let fps_elapsed = now.saturating_duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        (self.elapsed_secs, self.delta_secs)
    }

    /// Seconds since the clock started.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    /// Seconds covered by the last frame, after the cap.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second, refreshed every 500 ms.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn max_delta(&self) -> Option<f32> {
        self.max_delta
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

/// Time between frames for a target rate, or `None` to run unthrottled.
pub fn frame_interval(target_fps: Option<u32>) -> Option<Duration> {
    match target_fps {
        Some(fps) if fps > 0 => Some(Duration::from_secs_f64(1.0 / fps as f64)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_new() {
        let time = Time::new();
        assert_eq!(time.frame(), 0);
        assert_eq!(time.delta(), 0.0);
        assert_eq!(time.max_delta(), None);
    }

    #[test]
    fn test_update_measures_delta() {
        let start = Instant::now();
        let mut time = Time::starting_at(start);
        let (elapsed, delta) = time.update_at(start + Duration::from_millis(20));

        assert!((delta - 0.02).abs() < 1e-4);
        assert!((elapsed - 0.02).abs() < 1e-4);
        assert_eq!(time.frame(), 1);
    }

    #[test]
    fn test_max_delta_caps_stalls() {
        let start = Instant::now();
        let mut time = Time::starting_at(start).with_max_delta(Some(0.25));
        time.update_at(start + Duration::from_secs(3));

        assert_eq!(time.delta(), 0.25);
        // Elapsed still tracks wall time.
        assert!((time.elapsed() - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_fps_refresh() {
        let start = Instant::now();
        let mut time = Time::starting_at(start);
        for i in 1..=60 {
            time.update_at(start + Duration::from_millis(i * 10));
        }
        // Refreshed at 500 ms after 50 frames, not yet again.
        assert!((time.fps() - 100.0).abs() < 0.5);
    }

    #[test]
    fn test_frame_interval() {
        assert_eq!(frame_interval(None), None);
        assert_eq!(frame_interval(Some(0)), None);
        let interval = frame_interval(Some(120)).map(|d| d.as_secs_f64());
        assert!(interval.is_some_and(|s| (s - 1.0 / 120.0).abs() < 1e-9));
    }
}
