//! Per-room round countdown timer.
//!
//! Each room holds at most one active [`RoundTimer`]. It counts down from
//! a configured number of seconds, firing [`TimerEvent::Tick`] once per
//! second and a single [`TimerEvent::Expired`] when it reaches zero. A
//! `startGame` or `nextQuestion` cancels the prior countdown (simply by
//! dropping the old `RoundTimer` and constructing a new one) before
//! arming the next.
//!
//! # Integration
//!
//! `wait_tick` is designed to sit inside a room actor's `tokio::select!`
//! loop, the same way the generic tick scheduler this module replaces
//! did:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         event = timer.wait_tick(), if timer.is_some() => {
//!             match event {
//!                 TimerEvent::Tick(remaining) => broadcast_timer_update(remaining),
//!                 TimerEvent::Expired => enqueue_time_up(),
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! When `tokio::select!`'s `if` guard is false (no timer armed, or the
//! countdown already expired), the branch is skipped entirely rather than
//! polled — no busy-waiting.
//!
//! A second, much simpler primitive, [`GraceDelay`], expresses the fixed
//! delays the round state machine needs: the auto-submit grace window
//! after a timeout or `endRoundEarly` (default 1s), and disconnect grace
//! periods. It's a one-shot delayed wakeup rather than a repeating
//! countdown.

use std::time::Duration;

use tokio::time::{self, Instant as TokioInstant};
use tracing::trace;

/// `timeLimitSeconds` values at or above this sentinel (or `None`) mean
/// "no countdown" — the round ends only when every expected participant
/// has submitted, or the GM calls `endRoundEarly`.
pub const NO_TIMER_SENTINEL: u32 = 99999;

/// The fixed grace window between a round's end trigger (timeout or
/// `endRoundEarly`) and the actual auto-submit finalize.
pub const AUTO_SUBMIT_GRACE: Duration = Duration::from_secs(1);

/// Returns whether a `timeLimitSeconds` value arms a countdown at all.
pub fn is_armed(time_limit: Option<u32>) -> bool {
    matches!(time_limit, Some(secs) if secs < NO_TIMER_SENTINEL)
}

/// What fired on a given tick of the round countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Seconds remaining after this tick (always `>= 1`).
    Tick(u32),
    /// The countdown reached zero. Fired exactly once; after this the
    /// timer is finished and `wait_tick` will pend forever if called
    /// again.
    Expired,
}

/// A one-shot, per-room countdown. `None` in the caller's `Option<RoundTimer>`
/// slot represents "no countdown armed", matching the null/`>=99999`
/// sentinel in spec §5.
pub struct RoundTimer {
    total_seconds: u32,
    remaining: u32,
    next_tick: Option<TokioInstant>,
}

impl RoundTimer {
    /// Arms a fresh countdown from `time_limit_seconds`, or returns `None`
    /// if that value means "no countdown" per [`is_armed`].
    pub fn start(time_limit_seconds: Option<u32>) -> Option<Self> {
        let total = time_limit_seconds.filter(|&s| is_armed(Some(s)))?;
        if total == 0 {
            return None;
        }
        Some(Self {
            total_seconds: total,
            remaining: total,
            next_tick: Some(TokioInstant::now() + Duration::from_secs(1)),
        })
    }

    /// Seconds remaining as of the last fired tick (or the full duration
    /// if no tick has fired yet).
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn total_seconds(&self) -> u32 {
        self.total_seconds
    }

    /// `true` once [`TimerEvent::Expired`] has fired.
    pub fn is_finished(&self) -> bool {
        self.next_tick.is_none()
    }

    /// Waits for the next tick or expiry. Pends forever once finished —
    /// guard the `select!` branch with `if !timer.is_finished()`.
    pub async fn wait_tick(&mut self) -> TimerEvent {
        let Some(next) = self.next_tick else {
            std::future::pending::<()>().await;
            unreachable!("RoundTimer::wait_tick polled after completion");
        };

        time::sleep_until(next).await;
        self.remaining = self.remaining.saturating_sub(1);

        if self.remaining == 0 {
            self.next_tick = None;
            trace!(total = self.total_seconds, "round timer expired");
            TimerEvent::Expired
        } else {
            self.next_tick = Some(next + Duration::from_secs(1));
            trace!(remaining = self.remaining, "round timer tick");
            TimerEvent::Tick(self.remaining)
        }
    }
}

/// A one-shot delayed wakeup, armed or idle.
///
/// Used for the fixed auto-submit grace window and for disconnect
/// deadlines that need a single precise wakeup rather than a repeating
/// countdown. An idle `GraceDelay` pends forever in `wait`, so it's safe
/// to poll unconditionally inside a `select!` alongside other branches.
#[derive(Default)]
pub struct GraceDelay {
    deadline: Option<TokioInstant>,
}

impl GraceDelay {
    /// An unarmed delay — `wait` never resolves.
    pub fn idle() -> Self {
        Self { deadline: None }
    }

    /// Arms a delay firing `duration` from now.
    pub fn arm(duration: Duration) -> Self {
        Self {
            deadline: Some(TokioInstant::now() + duration),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Disarms the delay (cancellation).
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Waits until the deadline. Pends forever if not armed. Disarms
    /// itself once it fires, so a second `wait` call pends again.
    pub async fn wait(&mut self) {
        match self.deadline.take() {
            Some(deadline) => time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_timer_sentinel_disarms() {
        assert!(!is_armed(None));
        assert!(!is_armed(Some(99999)));
        assert!(!is_armed(Some(100000)));
        assert!(is_armed(Some(30)));
    }

    #[test]
    fn round_timer_start_returns_none_for_unarmed_limits() {
        assert!(RoundTimer::start(None).is_none());
        assert!(RoundTimer::start(Some(99999)).is_none());
        assert!(RoundTimer::start(Some(0)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn round_timer_ticks_once_per_second_then_expires() {
        let mut timer = RoundTimer::start(Some(3)).unwrap();

        let e1 = timer.wait_tick().await;
        assert_eq!(e1, TimerEvent::Tick(2));
        let e2 = timer.wait_tick().await;
        assert_eq!(e2, TimerEvent::Tick(1));
        let e3 = timer.wait_tick().await;
        assert_eq!(e3, TimerEvent::Expired);
        assert!(timer.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn grace_delay_fires_once_after_duration() {
        let mut delay = GraceDelay::arm(Duration::from_millis(500));
        assert!(delay.is_armed());
        delay.wait().await;
        assert!(!delay.is_armed());
    }

    #[tokio::test]
    async fn idle_grace_delay_never_resolves_within_a_timeout() {
        let mut delay = GraceDelay::idle();
        let result = tokio::time::timeout(Duration::from_millis(50), delay.wait()).await;
        assert!(result.is_err(), "idle delay should not resolve");
    }

    #[test]
    fn cancel_disarms_a_grace_delay() {
        let mut delay = GraceDelay::arm(Duration::from_secs(60));
        assert!(delay.is_armed());
        delay.cancel();
        assert!(!delay.is_armed());
    }
}
