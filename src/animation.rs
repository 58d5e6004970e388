//! Frame-driven animation primitives.
//!
//! Nothing here owns a timer. The host calls `step`/`fire` from its frame
//! loop with the current instant, which keeps every animation cancellable
//! and testable with synthetic clocks.

use std::f64::consts::FRAC_PI_2;
use std::time::{Duration, Instant};

pub fn ease_out_sine(progress: f64) -> f64 {
    (progress.clamp(0.0, 1.0) * FRAC_PI_2).sin()
}

pub trait Interpolate: Copy {
    fn interpolate(from: Self, to: Self, t: f64) -> Self;
}

impl Interpolate for f64 {
    fn interpolate(from: Self, to: Self, t: f64) -> Self {
        from + (to - from) * t
    }
}

impl Interpolate for (f64, f64) {
    fn interpolate(from: Self, to: Self, t: f64) -> Self {
        (
            f64::interpolate(from.0, to.0, t),
            f64::interpolate(from.1, to.1, t),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    /// The exact target has been handed out; the next step goes idle.
    Settling,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step<T> {
    Frame(T),
    Settled(T),
}

/// A single eased transition. At most one is in flight; `start` replaces
/// whatever was running.
#[derive(Debug)]
pub struct Tween<T> {
    phase: Phase,
    started_at: Option<Instant>,
    duration: Duration,
    from: Option<T>,
    to: Option<T>,
}

impl<T: Interpolate> Default for Tween<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Interpolate> Tween<T> {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            started_at: None,
            duration: Duration::ZERO,
            from: None,
            to: None,
        }
    }

    pub fn start(&mut self, from: T, to: T, duration: Duration, now: Instant) {
        self.cancel();
        self.phase = Phase::Running;
        self.started_at = Some(now);
        self.duration = duration;
        self.from = Some(from);
        self.to = Some(to);
    }

    /// Stops the current animation, if any. Returns whether one was active.
    pub fn cancel(&mut self) -> bool {
        let was_active = self.is_active();
        self.phase = Phase::Idle;
        self.started_at = None;
        self.from = None;
        self.to = None;
        was_active
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn target(&self) -> Option<T> {
        self.to
    }

    pub fn step(&mut self, now: Instant) -> Option<Step<T>> {
        match self.phase {
            Phase::Idle => None,
            Phase::Settling => {
                self.cancel();
                None
            }
            Phase::Running => {
                let (Some(started_at), Some(from), Some(to)) = (self.started_at, self.from, self.to)
                else {
                    self.cancel();
                    return None;
                };
                let elapsed = now.saturating_duration_since(started_at);
                let progress = if self.duration.is_zero() {
                    1.0
                } else {
                    elapsed.as_secs_f64() / self.duration.as_secs_f64()
                };
                if progress >= 1.0 {
                    self.phase = Phase::Settling;
                    Some(Step::Settled(to))
                } else {
                    Some(Step::Frame(T::interpolate(from, to, ease_out_sine(progress))))
                }
            }
        }
    }
}

/// A quiet-period timer: fires once no `arm` call has happened for `window`.
#[derive(Debug, Clone)]
pub struct Debounce {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` exactly once, on the first call at or past the deadline.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn ease_out_sine_endpoints() {
        assert_eq!(ease_out_sine(0.0), 0.0);
        assert!((ease_out_sine(1.0) - 1.0).abs() < 1e-12);
        assert!((ease_out_sine(4.0) - 1.0).abs() < 1e-12);
        assert!(ease_out_sine(0.5) > 0.5);
    }

    #[test]
    fn tween_runs_settles_then_goes_idle() {
        let t0 = Instant::now();
        let mut tween = Tween::<f64>::new();
        tween.start(0.0, 100.0, 300 * MS, t0);
        assert_eq!(tween.phase(), Phase::Running);

        match tween.step(t0 + 150 * MS) {
            Some(Step::Frame(value)) => assert!(value > 50.0 && value < 100.0),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(tween.step(t0 + 310 * MS), Some(Step::Settled(100.0)));
        assert_eq!(tween.phase(), Phase::Settling);
        assert_eq!(tween.step(t0 + 326 * MS), None);
        assert_eq!(tween.phase(), Phase::Idle);
    }

    #[test]
    fn starting_again_replaces_the_running_tween() {
        let t0 = Instant::now();
        let mut tween = Tween::<(f64, f64)>::new();
        tween.start((0.0, 10.0), (5.0, 5.0), 300 * MS, t0);
        tween.start((1.0, 1.0), (2.0, 2.0), 300 * MS, t0 + 10 * MS);
        assert_eq!(tween.target(), Some((2.0, 2.0)));
        assert_eq!(tween.step(t0 + 400 * MS), Some(Step::Settled((2.0, 2.0))));
    }

    #[test]
    fn zero_duration_settles_immediately() {
        let t0 = Instant::now();
        let mut tween = Tween::<f64>::new();
        tween.start(3.0, 7.0, Duration::ZERO, t0);
        assert_eq!(tween.step(t0), Some(Step::Settled(7.0)));
    }

    #[test]
    fn debounce_fires_once_after_quiet_window() {
        let t0 = Instant::now();
        let mut debounce = Debounce::new(200 * MS);
        debounce.arm(t0);
        debounce.arm(t0 + 150 * MS);
        assert!(!debounce.fire(t0 + 250 * MS));
        assert!(debounce.fire(t0 + 350 * MS));
        assert!(!debounce.fire(t0 + 400 * MS));
        assert!(!debounce.is_pending());
    }
}
