//! Frame loop driver.
//!
//! Each [`FrameScheduler::tick`] applies at most one coalesced resize, then
//! runs `update` to completion, then `draw`. The scheduler owns the
//! [`FrameClock`] and the [`ViewportController`]; everything else lives in
//! the [`FrameStage`].

use crate::time::FrameClock;
use crate::viewport::{ResizeSink, ViewportController, ViewportSize};

/// The per-frame work the scheduler drives.
pub trait FrameStage: ResizeSink {
    /// Advance simulation and uniforms. Must not touch GPU output.
    fn update(&mut self, clock: &FrameClock);

    /// Encode and submit one frame.
    fn draw(&mut self, clock: &FrameClock) -> Result<(), Self::Error>;
}

/// What a call to [`FrameScheduler::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The frame was updated and drawn.
    Drawn,
    /// The scheduler was stopped; nothing ran.
    Stopped,
}

/// Drives `update` then `draw` once per display refresh.
pub struct FrameScheduler<S: FrameStage> {
    stage: S,
    clock: FrameClock,
    viewport: ViewportController,
    running: bool,
}

impl<S: FrameStage> FrameScheduler<S> {
    pub fn new(stage: S, clock: FrameClock, initial: ViewportSize) -> Self {
        Self {
            stage,
            clock,
            viewport: ViewportController::new(initial.width(), initial.height()),
            running: true,
        }
    }

    /// Run one frame.
    ///
    /// Errors from the resize or from `draw` are returned to the caller. The
    /// scheduler stays running either way; a failed frame is dropped.
    pub fn tick(&mut self) -> Result<TickOutcome, S::Error> {
        if !self.running {
            return Ok(TickOutcome::Stopped);
        }

        self.viewport.apply_pending(&mut self.stage)?;

        self.clock.update();
        self.stage.update(&self.clock);
        self.stage.draw(&self.clock)?;

        log::trace!(
            "frame {} at {:.3}s (dt {:.4}s, {:.1} fps)",
            self.clock.frame(),
            self.clock.elapsed(),
            self.clock.delta(),
            self.clock.fps()
        );
        Ok(TickOutcome::Drawn)
    }

    /// Run up to `frames` ticks, stopping at the first error.
    pub fn run_for(&mut self, frames: u64) -> Result<u64, S::Error> {
        let mut drawn = 0;
        for _ in 0..frames {
            match self.tick()? {
                TickOutcome::Drawn => drawn += 1,
                TickOutcome::Stopped => break,
            }
        }
        Ok(drawn)
    }

    /// Queue a resize; applied at the start of the next tick.
    pub fn request_resize(&mut self, width: u32, height: u32) {
        self.viewport.request(width, height);
    }

    /// Apply a resize immediately, bypassing the queue.
    pub fn resize_now(&mut self, width: u32, height: u32) -> Result<ViewportSize, S::Error> {
        self.viewport.on_resize(width, height, &mut self.stage)
    }

    /// Stop the loop. Further ticks do nothing.
    pub fn stop(&mut self) {
        if self.running {
            log::info!("frame scheduler stopped after {} frames", self.clock.frame());
        }
        self.running = false;
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[inline]
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    #[inline]
    pub fn viewport(&self) -> ViewportSize {
        self.viewport.current()
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut S {
        &mut self.stage
    }

    /// Stop and hand back the stage, releasing the scheduler.
    pub fn into_stage(mut self) -> S {
        self.stop();
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Resize(u32, u32),
        Update(u64),
        Draw(u64),
    }

    #[derive(Default)]
    struct Recording {
        calls: Vec<Call>,
        fail_draw: bool,
    }

    impl ResizeSink for Recording {
        type Error = &'static str;
        fn apply_viewport(&mut self, size: ViewportSize) -> Result<(), Self::Error> {
            self.calls.push(Call::Resize(size.width(), size.height()));
            Ok(())
        }
    }

    impl FrameStage for Recording {
        fn update(&mut self, clock: &FrameClock) {
            self.calls.push(Call::Update(clock.frame()));
        }
        fn draw(&mut self, clock: &FrameClock) -> Result<(), Self::Error> {
            if self.fail_draw {
                return Err("draw failed");
            }
            self.calls.push(Call::Draw(clock.frame()));
            Ok(())
        }
    }

    fn scheduler() -> FrameScheduler<Recording> {
        FrameScheduler::new(
            Recording::default(),
            FrameClock::fixed(1.0 / 60.0),
            ViewportSize::clamped(800, 600),
        )
    }

    #[test]
    fn test_update_precedes_draw() {
        let mut s = scheduler();
        s.run_for(2).unwrap();
        assert_eq!(
            s.stage().calls,
            vec![Call::Update(1), Call::Draw(1), Call::Update(2), Call::Draw(2)]
        );
    }

    #[test]
    fn test_resize_applied_once_before_update() {
        let mut s = scheduler();
        s.request_resize(100, 100);
        s.request_resize(0, 0);
        s.request_resize(320, 200);
        s.tick().unwrap();
        assert_eq!(
            s.stage().calls,
            vec![Call::Resize(320, 200), Call::Update(1), Call::Draw(1)]
        );
        assert_eq!(s.viewport(), ViewportSize::clamped(320, 200));
    }

    #[test]
    fn test_stop_halts_ticks() {
        let mut s = scheduler();
        s.tick().unwrap();
        s.stop();
        assert_eq!(s.tick().unwrap(), TickOutcome::Stopped);
        assert_eq!(s.run_for(5).unwrap(), 0);
        assert_eq!(s.clock().frame(), 1);
    }

    #[test]
    fn test_draw_error_is_reported_and_loop_continues() {
        let mut s = scheduler();
        s.stage_mut().fail_draw = true;
        assert_eq!(s.tick(), Err("draw failed"));
        assert!(s.is_running());
        s.stage_mut().fail_draw = false;
        assert_eq!(s.tick(), Ok(TickOutcome::Drawn));
    }

    #[test]
    fn test_minimize_then_restore() {
        let mut s = scheduler();
        assert_eq!(s.resize_now(0, 0).unwrap(), ViewportSize::clamped(1, 1));
        s.tick().unwrap();
        assert_eq!(s.resize_now(800, 600).unwrap(), ViewportSize::clamped(800, 600));
        assert_eq!(s.viewport(), ViewportSize::clamped(800, 600));
    }
}
