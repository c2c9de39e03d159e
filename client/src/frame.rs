use std::time::{Duration, Instant};

/// Longest frame delta reported; longer gaps (tab hidden, debugger) are cut.
const MAX_FRAME_DT: f64 = 0.25;
const FPS_WINDOW: Duration = Duration::from_secs(1);

/// Per-session frame clock and FPS counter. Owned by the frame loop and
/// passed to whatever needs it.
#[derive(Debug)]
pub struct FrameContext {
    last_frame: Option<Instant>,
    window_start: Instant,
    frames_in_window: u32,
    fps: f64,
    frame_count: u64,
    elapsed: f64,
}

impl FrameContext {
    pub fn new(now: Instant) -> Self {
        Self {
            last_frame: None,
            window_start: now,
            frames_in_window: 0,
            fps: 0.0,
            frame_count: 0,
            elapsed: 0.0,
        }
    }

    /// Start a frame; returns the clamped delta since the previous one.
    pub fn begin_frame(&mut self, now: Instant) -> f64 {
        let dt = match self.last_frame {
            Some(last) => now.saturating_duration_since(last).as_secs_f64().min(MAX_FRAME_DT),
            None => 0.0,
        };
        self.last_frame = Some(now);
        self.frame_count += 1;
        self.elapsed += dt;

        self.frames_in_window += 1;
        let window = now.saturating_duration_since(self.window_start);
        if window >= FPS_WINDOW {
            self.fps = self.frames_in_window as f64 / window.as_secs_f64();
            self.frames_in_window = 0;
            self.window_start = now;
        }
        dt
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Sum of clamped frame deltas (seconds)
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}
