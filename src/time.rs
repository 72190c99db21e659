//! Frame clock shared by everything that runs inside a tick.
//!
//! The [`FrameScheduler`](crate::scheduler::FrameScheduler) owns the clock
//! and is the only thing that advances it; stages only read it. A clock is
//! either driven by wall time ([`FrameClock::new`]) or steps by a fixed
//! amount per frame ([`FrameClock::fixed`]) for offline rendering.

use std::time::{Duration, Instant};

const FPS_WINDOW: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy)]
enum Source {
    Wall { start: Instant },
    Fixed { step: f32 },
}

/// Monotonic elapsed time, per-frame delta, frame count and fps.
#[derive(Debug, Clone)]
pub struct FrameClock {
    source: Source,
    last_frame: Instant,
    elapsed: f32,
    delta: f32,
    frame: u64,
    fps: f32,
    window_start: Instant,
    window_frames: u64,
}

impl FrameClock {
    /// Wall-clock driven timer starting now.
    pub fn new() -> Self {
        Self::with_source(Source::Wall {
            start: Instant::now(),
        })
    }

    /// A clock that ignores wall time and advances `step` seconds per
    /// frame, so frame `n` always lands at `n * step`.
    pub fn fixed(step: f32) -> Self {
        Self::with_source(Source::Fixed {
            step: step.max(0.0),
        })
    }

    fn with_source(source: Source) -> Self {
        let now = Instant::now();
        Self {
            source,
            last_frame: now,
            elapsed: 0.0,
            delta: 0.0,
            frame: 0,
            fps: 0.0,
            window_start: now,
            window_frames: 0,
        }
    }

    /// Advance one frame. Returns `(elapsed, delta)`.
    pub fn update(&mut self) -> (f32, f32) {
        let now = Instant::now();
        match self.source {
            Source::Fixed { step } => {
                self.delta = step;
                self.elapsed += step;
                if step > 0.0 {
                    self.fps = 1.0 / step;
                }
            }
            Source::Wall { start } => {
                self.delta = now.duration_since(self.last_frame).as_secs_f32();
                // Never let elapsed run backwards, even if the clock stutters.
                self.elapsed = now.duration_since(start).as_secs_f32().max(self.elapsed);

                self.window_frames += 1;
                let window = now.duration_since(self.window_start);
                if window >= FPS_WINDOW {
                    self.fps = self.window_frames as f32 / window.as_secs_f32();
                    self.window_frames = 0;
                    self.window_start = now;
                }
            }
        }
        self.last_frame = now;
        self.frame += 1;
        (self.elapsed, self.delta)
    }

    /// Seconds since the clock started.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Seconds covered by the last frame.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Frames since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Frames per second, averaged over the last half second of wall time.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_fixed(&self) -> bool {
        matches!(self.source, Source::Fixed { .. })
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
