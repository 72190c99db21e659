//! Frame loop tests with a GPU-free stage.

use driftscene::time::FrameClock;
use driftscene::viewport::ResizeSink;
use driftscene::{FrameScheduler, FrameStage, ViewportController, ViewportSize};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Resize(u32, u32),
    Update { frame: u64, elapsed: f32 },
    Draw,
}

/// Records calls and keeps a fake "target" that follows resizes.
#[derive(Default)]
struct MockStage {
    events: Vec<Event>,
    target: (u32, u32),
    reallocations: u32,
    /// Largest accepted dimension; 0 means unlimited.
    limit: u32,
}

impl ResizeSink for MockStage {
    type Error = String;

    fn apply_viewport(&mut self, size: ViewportSize) -> Result<(), String> {
        let next = (size.width(), size.height());
        if self.limit > 0 && (next.0 > self.limit || next.1 > self.limit) {
            return Err(format!("{}x{} exceeds {}", next.0, next.1, self.limit));
        }
        if next != self.target {
            self.target = next;
            self.reallocations += 1;
        }
        self.events.push(Event::Resize(size.width(), size.height()));
        Ok(())
    }
}

impl FrameStage for MockStage {
    fn update(&mut self, clock: &FrameClock) {
        self.events.push(Event::Update {
            frame: clock.frame(),
            elapsed: clock.elapsed(),
        });
    }

    fn draw(&mut self, _clock: &FrameClock) -> Result<(), String> {
        self.events.push(Event::Draw);
        Ok(())
    }
}

#[test]
fn test_minimize_and_restore() {
    let mut stage = MockStage::default();
    let mut vc = ViewportController::new(800, 600);

    vc.on_resize(800, 600, &mut stage).unwrap();
    let minimized = vc.on_resize(0, 0, &mut stage).unwrap();
    assert_eq!((minimized.width(), minimized.height()), (1, 1));
    assert_eq!(stage.target, (1, 1));

    vc.on_resize(800, 600, &mut stage).unwrap();
    assert_eq!(stage.target, (800, 600));
    assert_eq!(vc.current(), ViewportSize::clamped(800, 600));
}

#[test]
fn test_repeated_resize_reallocates_once() {
    let mut stage = MockStage {
        target: (800, 600),
        ..Default::default()
    };
    let mut vc = ViewportController::new(800, 600);
    vc.on_resize(1024, 768, &mut stage).unwrap();
    vc.on_resize(1024, 768, &mut stage).unwrap();
    assert_eq!(stage.reallocations, 1);
    assert_eq!(stage.target, (1024, 768));
}

#[test]
fn test_scheduler_orders_resize_update_draw() {
    let mut scheduler = FrameScheduler::new(
        MockStage::default(),
        FrameClock::fixed(0.25),
        ViewportSize::clamped(800, 600),
    );

    scheduler.tick().unwrap();
    scheduler.request_resize(640, 0);
    scheduler.request_resize(640, 480);
    scheduler.tick().unwrap();

    assert_eq!(
        scheduler.stage().events,
        vec![
            Event::Update {
                frame: 1,
                elapsed: 0.25
            },
            Event::Draw,
            Event::Resize(640, 480),
            Event::Update {
                frame: 2,
                elapsed: 0.5
            },
            Event::Draw,
        ]
    );
}

#[test]
fn test_run_for_counts_frames_and_stops() {
    let mut scheduler = FrameScheduler::new(
        MockStage::default(),
        FrameClock::fixed(1.0 / 60.0),
        ViewportSize::clamped(320, 240),
    );
    assert_eq!(scheduler.run_for(30).unwrap(), 30);
    assert_eq!(scheduler.clock().frame(), 30);

    let stage = scheduler.into_stage();
    let draws = stage.events.iter().filter(|e| **e == Event::Draw).count();
    assert_eq!(draws, 30);
}

#[test]
fn test_elapsed_is_monotonic() {
    let mut scheduler = FrameScheduler::new(
        MockStage::default(),
        FrameClock::new(),
        ViewportSize::clamped(64, 64),
    );
    scheduler.run_for(20).unwrap();
    let elapsed: Vec<f32> = scheduler
        .stage()
        .events
        .iter()
        .filter_map(|e| match e {
            Event::Update { elapsed, .. } => Some(*elapsed),
            _ => None,
        })
        .collect();
    assert!(elapsed.windows(2).all(|w| w[1] >= w[0]));
}

#[test]
fn test_rejected_resize_keeps_previous_size() {
    let stage = MockStage {
        target: (800, 600),
        limit: 4096,
        ..Default::default()
    };
    let mut scheduler =
        FrameScheduler::new(stage, FrameClock::fixed(0.25), ViewportSize::clamped(800, 600));

    scheduler.request_resize(10_000, 600);
    assert!(scheduler.tick().is_err());
    assert_eq!(scheduler.viewport(), ViewportSize::clamped(800, 600));
    assert_eq!(scheduler.stage().target, (800, 600));
    assert!(scheduler.is_running());

    // The loop carries on at the old size.
    scheduler.tick().unwrap();
    assert_eq!(scheduler.stage().events.last(), Some(&Event::Draw));

    // A later, valid resize goes through.
    scheduler.request_resize(1024, 768);
    scheduler.tick().unwrap();
    assert_eq!(scheduler.viewport(), ViewportSize::clamped(1024, 768));
    assert_eq!(scheduler.stage().target, (1024, 768));
    assert_eq!(scheduler.stage().reallocations, 1);
}
