// src/scheduler.rs
use std::time::Duration;

use crate::relay::Relay;

/// Reference polling period.
pub const DEFAULT_INTERVAL_SECS: u64 = 600;

/// Waits between cycles. Tests inject one that returns immediately.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, period: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, period: Duration) {
        tokio::time::sleep(period).await;
    }
}

/// Runs every relay once per period, one after another.
pub struct Scheduler<S: Sleeper = TokioSleeper> {
    relays: Vec<Relay>,
    interval: Duration,
    sleeper: S,
}

impl Scheduler<TokioSleeper> {
    pub fn new(relays: Vec<Relay>, interval: Duration) -> Self {
        Self::with_sleeper(relays, interval, TokioSleeper)
    }
}

impl<S: Sleeper> Scheduler<S> {
    pub fn with_sleeper(relays: Vec<Relay>, interval: Duration, sleeper: S) -> Self {
        Self {
            relays,
            interval,
            sleeper,
        }
    }

    pub fn relays(&self) -> &[Relay] {
        &self.relays
    }

    /// One pass over all relays. A failing relay is logged and the pass
    /// moves on; returns how many relays failed.
    pub async fn run_once(&mut self) -> usize {
        crate::metrics::ensure_described();

        let mut failed = 0usize;
        for relay in &mut self.relays {
            match relay.run_cycle().await {
                Ok(report) => {
                    tracing::info!(
                        relay = relay.name(),
                        fetched = report.fetched,
                        delivered = report.delivered,
                        marked_seen = report.marked_seen,
                        duplicates = report.duplicates,
                        delivery_failures = report.delivery_failures,
                        "relay cycle done"
                    );
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(relay = relay.name(), error = %e, "relay cycle abandoned");
                }
            }
        }
        failed
    }

    /// `n` passes with a sleep between consecutive ones.
    pub async fn run_cycles(&mut self, n: usize) {
        for i in 0..n {
            if i > 0 {
                self.sleeper.sleep(self.interval).await;
            }
            self.run_once().await;
        }
    }

    /// Run, sleep, repeat. Never returns.
    pub async fn run_forever(&mut self) {
        tracing::info!(
            relays = self.relays.len(),
            interval_secs = self.interval.as_secs(),
            "scheduler started"
        );
        loop {
            self.run_once().await;
            self.sleeper.sleep(self.interval).await;
        }
    }
}
