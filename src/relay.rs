//! # Relay
//! One binding of sources to sinks with its own delivery ledger.
//!
//! A cycle fetches every source, sorts the combined messages by timestamp
//! (stable, so same-second posts keep page order), delivers each unseen one
//! to every sink in order, marks it seen, and persists the ledger once.
//!
//! Policies:
//! - any source fetch error abandons the cycle before anything is delivered,
//!   appended or persisted;
//! - a message is marked seen after the sink loop even if some sinks failed
//!   (deliver-then-mark, best-effort).

use std::time::Instant;

use metrics::{counter, gauge, histogram};

use crate::error::RelayError;
use crate::ingest::SourceReader;
use crate::ledger::{DeliveryLedger, DuplicatePolicy, ExactMatch};
use crate::message::Message;
use crate::notify::Sink;

/// What one cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    /// New messages at least one sink accepted.
    pub delivered: usize,
    /// New messages appended to the ledger, delivered or not.
    pub marked_seen: usize,
    pub duplicates: usize,
    pub delivery_failures: usize,
}

pub struct Relay {
    name: String,
    sources: Vec<Box<dyn SourceReader>>,
    sinks: Vec<Box<dyn Sink>>,
    ledger: DeliveryLedger,
    policy: Box<dyn DuplicatePolicy>,
}

impl Relay {
    pub fn new(
        name: impl Into<String>,
        sources: Vec<Box<dyn SourceReader>>,
        sinks: Vec<Box<dyn Sink>>,
        ledger: DeliveryLedger,
    ) -> Self {
        Self {
            name: name.into(),
            sources,
            sinks,
            ledger,
            policy: Box::new(ExactMatch),
        }
    }

    /// Swap the duplicate test, e.g. for content-hash based dedup.
    pub fn with_policy(mut self, policy: Box<dyn DuplicatePolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ledger(&self) -> &DeliveryLedger {
        &self.ledger
    }

    /// Fetch every source, concatenated in source order.
    async fn fetch_all(&self) -> Result<Vec<Message>, RelayError> {
        let mut all = Vec::new();
        for reader in &self.sources {
            let source_id = &reader.source().id;
            match reader.fetch().await {
                Ok(mut batch) => {
                    tracing::debug!(relay = %self.name, source = %source_id, count = batch.len(), "fetched");
                    all.append(&mut batch);
                }
                Err(source) => {
                    counter!("relay_fetch_errors_total", "relay" => self.name.clone()).increment(1);
                    return Err(RelayError::Fetch {
                        source_id: source_id.clone(),
                        source,
                    });
                }
            }
        }
        Ok(all)
    }

    pub async fn run_cycle(&mut self) -> Result<CycleReport, RelayError> {
        let t0 = Instant::now();
        let mut messages = self.fetch_all().await?;
        messages.sort_by_key(|m| m.timestamp);

        let mut report = CycleReport {
            fetched: messages.len(),
            ..CycleReport::default()
        };

        for message in messages {
            if self.policy.is_duplicate(&message, self.ledger.entries()) {
                report.duplicates += 1;
                continue;
            }
            let mut accepted = 0usize;
            for sink in &self.sinks {
                if let Err(e) = sink.deliver(&message).await {
                    report.delivery_failures += 1;
                    counter!("relay_delivery_errors_total", "relay" => self.name.clone()).increment(1);
                    tracing::warn!(
                        relay = %self.name,
                        sink = %sink.label(),
                        source = %message.source_id,
                        timestamp = message.timestamp,
                        error = %e,
                        "delivery failed; message still marked seen"
                    );
                } else {
                    accepted += 1;
                }
            }
            if accepted > 0 {
                report.delivered += 1;
            }
            self.ledger.append(message);
            report.marked_seen += 1;
        }

        self.ledger.persist()?;

        counter!("relay_messages_fetched_total", "relay" => self.name.clone())
            .increment(report.fetched as u64);
        counter!("relay_messages_delivered_total", "relay" => self.name.clone())
            .increment(report.delivered as u64);
        counter!("relay_messages_marked_seen_total", "relay" => self.name.clone())
            .increment(report.marked_seen as u64);
        counter!("relay_duplicates_total", "relay" => self.name.clone())
            .increment(report.duplicates as u64);
        histogram!("relay_cycle_ms", "relay" => self.name.clone())
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("relay_last_cycle_ts", "relay" => self.name.clone())
            .set(chrono::Utc::now().timestamp() as f64);

        Ok(report)
    }
}
