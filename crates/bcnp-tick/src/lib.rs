//! Fixed-period control-loop scheduler for BCNP.
//!
//! The engine is synchronous: one bounded pass per `Engine::tick(now)`.
//! This crate supplies the cadence and the `now`.
//!
//! ```ignore
//! let mut clock = TickScheduler::new(TickConfig::default()); // 50 Hz
//! loop {
//!     let info = clock.wait_for_tick().await;
//!     let report = engine.tick(info.now);
//!     drivetrain.apply(report.drive_command());
//!     clock.record_tick_end();
//! }
//! ```
//!
//! Both the tick time and the work time come from Tokio's clock. Under
//! `tokio::time::pause` the whole loop runs on simulated time, including
//! the budget accounting.

use std::time::{Duration, Instant};

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How the schedule recovers after a tick fires late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverrunPolicy {
    /// Re-anchor one period after the late tick. Missed slots are lost.
    #[default]
    Skip,
    /// Keep the original grid, firing back-to-back to catch up, unless
    /// more than `max_burst` slots were missed, in which case re-anchor.
    CatchUp { max_burst: u32 },
    /// Keep the original grid and never burst: resume at the first grid
    /// slot after the late tick. Slots in between are lost.
    Drop,
}

/// Scheduler settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TickConfig {
    /// Control period. 20 ms by default.
    pub period: Duration,
    pub on_overrun: OverrunPolicy,
    /// Fraction of the period at which tick work logs a warning.
    pub warn_load: f64,
    /// Fraction of the period at which tick work counts as a blown budget.
    pub critical_load: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: Self::DEFAULT_PERIOD,
            on_overrun: OverrunPolicy::default(),
            warn_load: 0.8,
            critical_load: 1.0,
        }
    }
}

impl TickConfig {
    pub const DEFAULT_PERIOD: Duration = Duration::from_millis(20);
    pub const MIN_PERIOD: Duration = Duration::from_millis(1);
    pub const MAX_PERIOD: Duration = Duration::from_secs(1);

    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            ..Self::default()
        }
    }

    /// A rate of 0 Hz keeps the default period.
    pub fn with_rate(rate_hz: u32) -> Self {
        match rate_hz {
            0 => Self::default(),
            hz => Self::with_period(Duration::from_secs(1) / hz),
        }
    }

    /// Clamps the period into `MIN_PERIOD..=MAX_PERIOD` and the load
    /// thresholds into `0.0..=1.0`, with `warn_load <= critical_load`.
    pub fn validated(mut self) -> Self {
        let period = self.period.clamp(Self::MIN_PERIOD, Self::MAX_PERIOD);
        if period != self.period {
            warn!(
                requested_us = self.period.as_micros() as u64,
                used_us = period.as_micros() as u64,
                "control period out of range"
            );
            self.period = period;
        }
        self.critical_load = unit_fraction(self.critical_load, 1.0);
        self.warn_load = unit_fraction(self.warn_load, 0.8).min(self.critical_load);
        self
    }

    pub fn rate_hz(&self) -> f64 {
        self.period.as_secs_f64().recip()
    }
}

fn unit_fraction(value: f64, fallback: f64) -> f64 {
    if value.is_nan() { fallback } else { value.clamp(0.0, 1.0) }
}

// ---------------------------------------------------------------------------
// Per-tick output
// ---------------------------------------------------------------------------

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone, Copy)]
pub struct TickInfo {
    /// Sequence number, starting at 1.
    pub tick: u64,
    /// When the tick fired. Hand this to `Engine::tick`.
    pub now: Instant,
    /// How far behind its deadline the tick fired.
    pub late_by: Duration,
    /// Deadline slots abandoned to recover from lateness.
    pub skipped: u64,
}

impl TickInfo {
    /// Late by more than a tenth of a period.
    pub fn is_overrun(&self, period: Duration) -> bool {
        self.late_by > period / LATE_TOLERANCE_DIVISOR
    }
}

/// Lateness up to `period / LATE_TOLERANCE_DIVISOR` is timer noise.
const LATE_TOLERANCE_DIVISOR: u32 = 10;

/// Counters kept by the scheduler.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub ticks: u64,
    pub overruns: u64,
    pub skipped: u64,
    /// Ticks whose work reached `critical_load`.
    pub budget_exceeded: u64,
    /// Moving average of work time per tick (weight 1/8 per sample).
    pub work_avg: Duration,
    pub work_max: Duration,
    /// Work time of the last recorded tick over the period.
    pub last_load: f64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Sleeps until each deadline and tracks how long the work in between took.
pub struct TickScheduler {
    config: TickConfig,
    deadline: TokioInstant,
    fired_at: Option<TokioInstant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// The first tick fires one period from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        debug!(
            period_us = config.period.as_micros() as u64,
            policy = ?config.on_overrun,
            "control loop scheduler ready"
        );
        Self {
            deadline: TokioInstant::now() + config.period,
            config,
            fired_at: None,
            metrics: TickMetrics::default(),
        }
    }

    /// Waits for the next deadline.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let deadline = self.deadline;
        time::sleep_until(deadline).await;

        let fired = TokioInstant::now();
        self.fired_at = Some(fired);
        self.metrics.ticks += 1;

        let late_by = fired.saturating_duration_since(deadline);
        let mut info = TickInfo {
            tick: self.metrics.ticks,
            now: fired.into_std(),
            late_by,
            skipped: 0,
        };

        if info.is_overrun(self.config.period) {
            self.metrics.overruns += 1;
            info.skipped = self.reschedule_late(deadline, fired);
            self.metrics.skipped += info.skipped;
            warn!(
                tick = info.tick,
                late_us = late_by.as_micros() as u64,
                skipped = info.skipped,
                policy = ?self.config.on_overrun,
                "control tick fired late"
            );
        } else {
            self.deadline = deadline + self.config.period;
        }

        trace!(tick = info.tick, "tick");
        info
    }

    /// Picks the next deadline after a late tick and returns how many
    /// slots were given up.
    fn reschedule_late(&mut self, deadline: TokioInstant, fired: TokioInstant) -> u64 {
        let period = self.config.period;
        let late = fired.saturating_duration_since(deadline).as_nanos();
        let missed = u64::try_from(late / period.as_nanos()).unwrap_or(u64::MAX);
        // Offset of `fired` past the grid slot it landed in.
        let into_slot = Duration::from_nanos(
            u64::try_from(late % period.as_nanos()).unwrap_or_default(),
        );

        let (next, skipped) = match self.config.on_overrun {
            OverrunPolicy::Skip => (fired + period, missed),
            OverrunPolicy::Drop => (fired + (period - into_slot), missed),
            OverrunPolicy::CatchUp { max_burst } if missed <= u64::from(max_burst) => {
                (deadline + period, 0)
            }
            OverrunPolicy::CatchUp { max_burst } => {
                (fired + period, missed - u64::from(max_burst))
            }
        };
        self.deadline = next;
        skipped
    }

    /// Marks the end of this tick's work. Without it no budget accounting
    /// happens; calling it twice for one tick is a no-op.
    pub fn record_tick_end(&mut self) {
        let Some(fired) = self.fired_at.take() else {
            return;
        };
        let work = fired.elapsed();
        let load = work.as_secs_f64() / self.config.period.as_secs_f64();

        let m = &mut self.metrics;
        m.last_load = load;
        m.work_max = m.work_max.max(work);
        m.work_avg = if m.ticks == 1 {
            work
        } else {
            (m.work_avg * 7 + work) / 8
        };

        if load >= self.config.critical_load {
            m.budget_exceeded += 1;
            warn!(
                tick = m.ticks,
                work_us = work.as_micros() as u64,
                "control tick overran its period"
            );
        } else if load >= self.config.warn_load {
            debug!(
                tick = m.ticks,
                work_us = work.as_micros() as u64,
                load = format!("{:.0}%", load * 100.0),
                "control tick close to its period"
            );
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.metrics.ticks
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &TickConfig {
        &self.config
    }
}
