// src/ingest/mod.rs
pub mod channel;

use crate::error::FetchError;
use crate::message::{Message, Source};

/// Something that can be polled for its current posts.
///
/// `fetch` returns messages in the order the source shows them, which is not
/// necessarily chronological; ordering is the relay's job.
#[async_trait::async_trait]
pub trait SourceReader: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Message>, FetchError>;
    fn source(&self) -> &Source;
}
