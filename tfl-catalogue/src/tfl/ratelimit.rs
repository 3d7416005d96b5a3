//! Client-side rate limiting.
//!
//! TfL budgets each registered key at a fixed number of requests per
//! minute but sends no rate-limit headers, so the budget is enforced
//! locally. Two mechanisms combine:
//!
//! - a **debounce** keeps consecutive calls a minimum distance apart,
//!   bounding burst spacing even while the window has spare capacity
//! - a **sliding window** of completion timestamps blocks a call
//!   outright once the budget for the trailing period is spent; waits
//!   inside the window use exponential backoff with jitter, capped by
//!   the budget remaining in the period
//!
//! Only calls that complete successfully occupy a window slot; a failed
//! exchange does not burn budget.
//!
//! The clock and the sleep primitive are injected so tests can drive
//! simulated time instead of waiting for real.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::Mutex;
use tracing::debug;

use super::Transport;
use super::error::TflError;

/// Backoff multiplier.
const BACKOFF_FACTOR: f64 = 0.5;

/// Backoff growth base.
const BACKOFF_BASE: f64 = 2.0;

/// Fraction of the even request spacing used as the debounce interval.
const DEBOUNCE_RATIO: f64 = 0.7;

/// Source of the current instant.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Blocking wait primitive.
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// Real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Rate limiter parameters.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum successful calls allowed in any trailing `request_period`.
    pub max_requests: usize,
    /// Length of the trailing window.
    pub request_period: Duration,
}

impl RateLimitConfig {
    /// Create a new config. `max_requests` must be positive and
    /// `request_period` non-zero.
    pub fn new(max_requests: usize, request_period: Duration) -> Self {
        assert!(max_requests > 0, "max_requests must be positive");
        assert!(
            !request_period.is_zero(),
            "request_period must be non-zero"
        );
        Self {
            max_requests,
            request_period,
        }
    }

    /// Minimum enforced spacing between consecutive calls.
    pub fn debounce_interval(&self) -> Duration {
        self.request_period
            .mul_f64(DEBOUNCE_RATIO / self.max_requests as f64)
    }
}

impl Default for RateLimitConfig {
    /// TfL's registered-key budget: 500 requests per minute.
    fn default() -> Self {
        Self::new(500, Duration::from_secs(60))
    }
}

/// Window state. Mutated only inside the admit-and-send critical section.
struct Window {
    /// Completion timestamps of successful calls, oldest first. Every
    /// entry is within `request_period` of "now" after eviction.
    history: VecDeque<Instant>,
    /// When the previous call was admitted; debounce reference point.
    last_call: Option<Instant>,
}

/// Rate-limiting wrapper around another [`Transport`].
///
/// One instance owns its window. Concurrent callers sharing an instance
/// serialize on the internal mutex, which is held for the whole
/// admit-and-send section, so the window invariants hold regardless;
/// the intended use is a single sequential caller.
pub struct RateLimited<T, C = SystemClock, S = TokioSleeper> {
    inner: T,
    config: RateLimitConfig,
    clock: C,
    sleeper: S,
    window: Mutex<Window>,
}

impl<T> RateLimited<T> {
    /// Wrap `inner` with the production clock and the tokio timer.
    pub fn new(inner: T, config: RateLimitConfig) -> Self {
        Self::with_clock(inner, config, SystemClock, TokioSleeper)
    }
}

impl<T, C: Clock, S: Sleeper> RateLimited<T, C, S> {
    /// Wrap `inner` with an explicit clock and sleeper.
    pub fn with_clock(inner: T, config: RateLimitConfig, clock: C, sleeper: S) -> Self {
        Self {
            inner,
            config,
            clock,
            sleeper,
            window: Mutex::new(Window {
                history: VecDeque::new(),
                last_call: None,
            }),
        }
    }

    /// Access the wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Block until both the debounce and the window budget admit a call.
    async fn admit(&self, window: &mut Window) {
        let debounce = self.config.debounce_interval();

        if let Some(prev) = window.last_call {
            let since = self.clock.now().duration_since(prev);
            if since < debounce {
                self.sleeper.sleep(debounce - since).await;
            }
        }

        let entered = self.clock.now();
        window.last_call = Some(entered);

        let mut attempt: u32 = 0;
        while window.history.len() >= self.config.max_requests {
            let now = self.clock.now();

            // Slide the window: evict entries older than the period.
            while let Some(&oldest) = window.history.front() {
                if now.duration_since(oldest) > self.config.request_period {
                    window.history.pop_front();
                } else {
                    break;
                }
            }

            if window.history.len() < self.config.max_requests {
                break;
            }

            let elapsed = now.duration_since(entered);
            if elapsed < self.config.request_period {
                let backoff = BACKOFF_FACTOR * BACKOFF_BASE.powi(attempt as i32)
                    + rand::rng().random_range(0.0..1.0);
                attempt += 1;

                let remaining = self.config.request_period - elapsed;
                let wait = remaining.min(Duration::from_secs_f64(backoff));
                debug!(
                    wait_secs = wait.as_secs_f64(),
                    in_window = window.history.len(),
                    "request budget spent, backing off"
                );
                self.sleeper.sleep(wait).await;
            }
        }
    }
}

impl<T: Transport, C: Clock, S: Sleeper> Transport for RateLimited<T, C, S> {
    async fn get(&self, endpoint: &str) -> Result<String, TflError> {
        let mut window = self.window.lock().await;

        self.admit(&mut window).await;

        let result = self.inner.get(endpoint).await;

        // Only a completed exchange occupies a window slot.
        if result.is_ok() {
            window.history.push_back(self.clock.now());
        }

        result
    }
}
