//! Cancelable self-rescheduling tick tasks. Each loop re-arms itself only
//! after the current tick finishes, so there is never more than one
//! in-flight tick, and the cancellation guard is read at the top of every
//! scheduled callback: a tick already armed when cancel is raised may run
//! once more, but it never re-arms.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Shared cancellation guard for a loop; cloning keeps pointing at the same
/// flag so a tick body can cancel the loop driving it.
#[derive(Clone)]
pub struct LoopHandle {
    canceled: Rc<Cell<bool>>,
}

impl LoopHandle {
    pub fn cancel(&self) {
        self.canceled.set(true);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.get()
    }
}

/// Display-refresh-driven loop: the host fires [`FrameLoop::run_tick`] once
/// per refresh signal.
pub struct FrameLoop {
    canceled: Rc<Cell<bool>>,
    armed: bool,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self {
            canceled: Rc::new(Cell::new(false)),
            armed: true,
        }
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            canceled: Rc::clone(&self.canceled),
        }
    }

    pub fn cancel(&self) {
        self.canceled.set(true);
    }

    pub fn is_scheduled(&self) -> bool {
        self.armed && !self.canceled.get()
    }

    /// Runs one tick if the loop is still armed. The guard is checked before
    /// the tick runs and again before re-arming, so a cancel raised inside
    /// the tick body stops any further scheduling. Returns whether the loop
    /// is still scheduled.
    pub fn run_tick(&mut self, tick: impl FnOnce()) -> bool {
        if !self.armed || self.canceled.get() {
            self.armed = false;
            return false;
        }
        tick();
        self.armed = !self.canceled.get();
        self.armed
    }
}

/// Fixed-period loop, polled by the host. The period is honored even when
/// the host polls slower than it: a late poll runs every tick that came due
/// since the last one, up to [`MAX_CATCH_UP_TICKS`]; past that cap the
/// backlog is dropped and the schedule restarts from now.
pub struct IntervalLoop {
    period: Duration,
    next_due: Instant,
    canceled: Rc<Cell<bool>>,
    armed: bool,
}

/// Most ticks one poll may run; a stall longer than this many periods
/// skips ahead instead of replaying the gap.
const MAX_CATCH_UP_TICKS: u32 = 8;

impl IntervalLoop {
    pub fn from_rate_hz(rate_hz: u32) -> Self {
        Self::new(Duration::from_secs_f64(1.0 / rate_hz.max(1) as f64))
    }

    pub fn new(period: Duration) -> Self {
        Self {
            period,
            // First tick fires on the first poll.
            next_due: Instant::now(),
            canceled: Rc::new(Cell::new(false)),
            armed: true,
        }
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            canceled: Rc::clone(&self.canceled),
        }
    }

    pub fn cancel(&self) {
        self.canceled.set(true);
    }

    pub fn is_scheduled(&self) -> bool {
        self.armed && !self.canceled.get()
    }

    /// Returns whether the loop is still scheduled.
    pub fn poll(&mut self, now: Instant, mut tick: impl FnMut()) -> bool {
        if !self.armed || self.canceled.get() {
            self.armed = false;
            return false;
        }
        let mut fired = 0;
        while now >= self.next_due && !self.canceled.get() && fired < MAX_CATCH_UP_TICKS {
            tick();
            fired += 1;
            self.next_due += self.period;
        }
        if now >= self.next_due {
            // Capped out: drop the backlog rather than bursting across
            // several polls.
            self.next_due = now + self.period;
        }
        self.armed = !self.canceled.get();
        self.armed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_loop_ticks_until_canceled() {
        let mut fl = FrameLoop::new();
        let mut ticks = 0;
        assert!(fl.run_tick(|| ticks += 1));
        assert!(fl.run_tick(|| ticks += 1));
        fl.cancel();
        assert!(!fl.run_tick(|| ticks += 1));
        assert_eq!(ticks, 2);
    }

    #[test]
    fn cancel_mid_tick_allows_exactly_one_more_tick() {
        let mut fl = FrameLoop::new();
        let handle = fl.handle();
        let mut ticks = 0;
        // Guard raised between "tick starts" and "tick reschedules".
        let still = fl.run_tick(|| {
            ticks += 1;
            handle.cancel();
        });
        assert!(!still);
        assert!(!fl.run_tick(|| ticks += 1));
        assert_eq!(ticks, 1);
    }

    #[test]
    fn interval_loop_respects_period() {
        let mut il = IntervalLoop::new(Duration::from_millis(50));
        let start = Instant::now();
        let mut ticks = 0;
        assert!(il.poll(start, || ticks += 1));
        assert_eq!(ticks, 1);
        // Not due yet: still scheduled, no tick.
        assert!(il.poll(start + Duration::from_millis(10), || ticks += 1));
        assert_eq!(ticks, 1);
        assert!(il.poll(start + Duration::from_millis(60), || ticks += 1));
        assert_eq!(ticks, 2);
    }

    #[test]
    fn slow_polling_still_delivers_the_full_rate() {
        // A 120 Hz update loop polled at a 60 Hz redraw cadence must not
        // halve the update rate.
        let mut il = IntervalLoop::from_rate_hz(120);
        let start = Instant::now();
        let mut ticks = 0u32;
        for frame in 1..=60u64 {
            let now = start + Duration::from_nanos(frame * 1_000_000_000 / 60);
            assert!(il.poll(now, || ticks += 1));
        }
        assert!((118..=122).contains(&ticks), "got {} ticks", ticks);
    }

    #[test]
    fn long_stall_drops_backlog_instead_of_bursting() {
        let mut il = IntervalLoop::new(Duration::from_millis(10));
        let start = Instant::now();
        let mut ticks = 0u32;
        assert!(il.poll(start + Duration::from_secs(5), || ticks += 1));
        assert!(ticks <= MAX_CATCH_UP_TICKS);
        // The dropped backlog is gone: within one period nothing more runs.
        let after_stall = ticks;
        let next = start + Duration::from_secs(5) + Duration::from_millis(5);
        assert!(il.poll(next, || ticks += 1));
        assert_eq!(ticks, after_stall);
    }

    #[test]
    fn canceled_interval_never_ticks_again() {
        let mut il = IntervalLoop::new(Duration::from_millis(1));
        let handle = il.handle();
        let mut ticks = 0;
        assert!(il.is_scheduled());
        assert!(il.poll(Instant::now(), || ticks += 1));
        handle.cancel();
        assert!(!il.is_scheduled());
        assert!(!il.poll(Instant::now() + Duration::from_secs(1), || ticks += 1));
        assert_eq!(ticks, 1);
    }

    #[test]
    fn handles_observe_cancellation() {
        let fl = FrameLoop::new();
        let handle = fl.handle();
        assert!(!handle.is_canceled());
        fl.cancel();
        assert!(handle.is_canceled());
        assert!(!fl.is_scheduled());
    }
}
