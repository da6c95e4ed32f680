// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod ingest;
pub mod ledger;
pub mod message;
pub mod metrics;
pub mod notify;
pub mod relay;
pub mod scheduler;

// ---- Re-exports for stable public API ----
pub use crate::error::{DeliveryError, FetchError, LedgerError, MalformedPost, RelayError};
pub use crate::ledger::{DeliveryLedger, DuplicatePolicy, ExactMatch};
pub use crate::message::{derive_color, Message, MessageRecord, Source};
pub use crate::relay::{CycleReport, Relay};
pub use crate::scheduler::{Scheduler, Sleeper, TokioSleeper};
