// Tick scheduling: when the next frame is due, and a way to stop the loop.
// A `Clock` abstracts wall time so tests can step ticks by hand.

use std::time::{Duration, Instant};

/// Shared stop flag; clones observe the same state.
pub use tokio_util::sync::CancellationToken;

/// Source of "now" plus a way to wait.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&mut self, duration: Duration);
}

/// Real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Clock that only moves when told to; sleeping advances it instantly.
#[derive(Debug, Clone, Copy)]
pub struct ManualClock {
    now: Instant,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { now: Instant::now() }
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now
    }

    fn sleep(&mut self, duration: Duration) {
        self.advance(duration);
    }
}

/// One-shot timer re-armed by every tick with the delay that tick asked for.
#[derive(Debug)]
pub struct Ticker {
    next_due: Instant,
    token: CancellationToken,
}

impl Ticker {
    /// First tick is due immediately.
    pub fn new(now: Instant, token: CancellationToken) -> Self {
        Self { next_due: now, token }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        !self.token.is_cancelled() && now >= self.next_due
    }

    pub fn schedule(&mut self, now: Instant, delay: Duration) {
        self.next_due = now + delay;
    }

    pub fn time_until_due(&self, now: Instant) -> Duration {
        self.next_due.saturating_duration_since(now)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Run `tick` if it is due and re-arm with the delay it returns.
    /// Returns whether a tick ran.
    pub fn poll<C: Clock>(&mut self, clock: &C, tick: impl FnOnce() -> Duration) -> bool {
        let now = clock.now();
        if !self.is_due(now) {
            return false;
        }
        let delay = tick();
        self.schedule(now, delay);
        true
    }

    /// Tick until the token is cancelled, sleeping between ticks.
    pub fn run<C: Clock>(&mut self, clock: &mut C, mut tick: impl FnMut() -> Duration) {
        while !self.token.is_cancelled() {
            self.poll(clock, &mut tick);
            let wait = self.time_until_due(clock.now());
            clock.sleep(wait);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_only_when_due() {
        let mut clock = ManualClock::new();
        let mut ticker = Ticker::new(clock.now(), CancellationToken::new());
        let mut count = 0;

        assert!(ticker.poll(&clock, || {
            count += 1;
            Duration::from_millis(33)
        }));
        assert!(!ticker.poll(&clock, || unreachable!()));

        clock.advance(Duration::from_millis(32));
        assert!(!ticker.is_due(clock.now()));
        clock.advance(Duration::from_millis(1));
        assert!(ticker.is_due(clock.now()));
        assert_eq!(count, 1);
    }

    #[test]
    fn cancelled_ticker_never_fires() {
        let clock = ManualClock::new();
        let token = CancellationToken::new();
        let mut ticker = Ticker::new(clock.now(), token.clone());
        token.cancel();
        assert!(!ticker.poll(&clock, || Duration::ZERO));
        assert!(ticker.token().is_cancelled());
    }

    #[test]
    fn parent_cancel_stops_a_child_ticker() {
        let clock = ManualClock::new();
        let parent = CancellationToken::new();
        let mut ticker = Ticker::new(clock.now(), parent.child_token());
        assert!(ticker.is_due(clock.now()));

        parent.cancel();
        assert!(!ticker.poll(&clock, || Duration::ZERO));
    }

    #[test]
    fn run_stops_once_cancelled() {
        let mut clock = ManualClock::new();
        let token = CancellationToken::new();
        let mut ticker = Ticker::new(clock.now(), token.clone());
        let start = clock.now();
        let mut ticks = 0;

        ticker.run(&mut clock, || {
            ticks += 1;
            if ticks == 5 {
                token.cancel();
            }
            Duration::from_millis(10)
        });

        assert_eq!(ticks, 5);
        assert_eq!(clock.now() - start, Duration::from_millis(50));
    }
}
