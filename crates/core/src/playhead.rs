//! Visual playhead animation, decoupled from store updates.
//!
//! The animator interpolates between committed transport positions using a
//! monotonic [`Clock`], so the playhead moves smoothly even though the
//! engine only reports its position in discrete blocks. `current_time` in
//! the store stays the source of truth whenever the animator is not
//! `Running`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

const MIN_RATE: f64 = 0.1;
const MAX_RATE: f64 = 16.0;

/// Monotonic time source, measured from an arbitrary fixed origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-clock time from [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

/// Cancellation flag shared with anything that may need to stop the
/// current animation. The animator observes it on its next frame.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    Idle,
    Scheduled,
    Running,
    Paused,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayheadFrame {
    pub seconds: f64,
    pub state: AnimationState,
    /// Set on the frame the animation reached the end of its span.
    pub finished: bool,
}

pub struct PlayheadAnimator<C: Clock> {
    clock: C,
    state: AnimationState,
    to: f64,
    /// Position at `anchor_time`; progress is folded in here on every
    /// state or rate change.
    anchor_seconds: f64,
    anchor_time: Duration,
    rate: f64,
    token: CancelToken,
}

impl<C: Clock> PlayheadAnimator<C> {
    pub fn new(clock: C) -> Self {
        let anchor_time = clock.now();
        Self {
            clock,
            state: AnimationState::Idle,
            to: 0.0,
            anchor_seconds: 0.0,
            anchor_time,
            rate: 1.0,
            token: CancelToken::default(),
        }
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Token for the animation currently scheduled. Tripping it cancels
    /// that animation only; the next [`schedule`](Self::schedule) issues a
    /// fresh token.
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Tear down whatever is in flight and prepare an animation over
    /// `[from, to]`. Invalid spans leave the animator idle at `from`.
    pub fn schedule(&mut self, from: f64, to: f64) {
        self.token.cancel();
        self.token = CancelToken::default();
        self.anchor_time = self.clock.now();

        if !from.is_finite() || !to.is_finite() || from > to {
            tracing::debug!(from, to, "playhead span invalid, staying idle");
            self.anchor_seconds = if from.is_finite() { from.max(0.0) } else { 0.0 };
            self.to = self.anchor_seconds;
            self.state = AnimationState::Idle;
            return;
        }

        self.anchor_seconds = from;
        self.to = to;
        self.state = AnimationState::Scheduled;
    }

    /// Start or resume in place. Returns false when there is nothing left
    /// to play.
    pub fn play(&mut self) -> bool {
        self.observe_cancel();
        match self.state {
            AnimationState::Scheduled | AnimationState::Paused if self.anchor_seconds < self.to => {
                self.anchor_time = self.clock.now();
                self.state = AnimationState::Running;
                true
            }
            AnimationState::Running => true,
            _ => false,
        }
    }

    /// Halt and return the live position, which the caller commits.
    pub fn pause(&mut self) -> f64 {
        self.observe_cancel();
        if self.state == AnimationState::Running {
            self.fold();
            self.state = AnimationState::Paused;
        }
        self.anchor_seconds
    }

    /// Terminate this animation and return the position to commit.
    pub fn cancel(&mut self) -> f64 {
        self.token.cancel();
        self.observe_cancel();
        self.anchor_seconds
    }

    /// Change the advance speed without restarting the animation.
    pub fn set_rate(&mut self, rate: f64) {
        if !rate.is_finite() {
            return;
        }
        if self.state == AnimationState::Running {
            self.fold();
        }
        self.rate = rate.clamp(MIN_RATE, MAX_RATE);
    }

    pub fn position(&self) -> f64 {
        match self.state {
            AnimationState::Running => self.live_position(),
            _ => self.anchor_seconds,
        }
    }

    /// Advance one visual frame.
    pub fn tick(&mut self) -> PlayheadFrame {
        self.observe_cancel();

        let mut finished = false;
        if self.state == AnimationState::Running && self.live_position() >= self.to {
            self.anchor_seconds = self.to;
            self.anchor_time = self.clock.now();
            self.state = AnimationState::Paused;
            finished = true;
        }

        PlayheadFrame {
            seconds: self.position(),
            state: self.state,
            finished,
        }
    }

    fn live_position(&self) -> f64 {
        let elapsed = self.clock.now().saturating_sub(self.anchor_time).as_secs_f64();
        (self.anchor_seconds + elapsed * self.rate).min(self.to)
    }

    fn fold(&mut self) {
        self.anchor_seconds = self.live_position();
        self.anchor_time = self.clock.now();
    }

    fn observe_cancel(&mut self) {
        if !self.token.is_cancelled() {
            return;
        }
        match self.state {
            AnimationState::Running => {
                self.fold();
                self.state = AnimationState::Cancelled;
            }
            AnimationState::Scheduled | AnimationState::Paused => {
                self.state = AnimationState::Cancelled;
            }
            AnimationState::Idle | AnimationState::Cancelled => {}
        }
    }
}
