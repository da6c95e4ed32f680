pub mod discord;

use std::sync::{Arc, Mutex};

use crate::error::DeliveryError;
use crate::message::Message;

/// A delivery target for relayed messages. One call is one attempt; retry
/// policy lives above this layer.
#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    async fn deliver(&self, message: &Message) -> Result<(), DeliveryError>;

    /// Loggable name of the target (secrets stripped).
    fn label(&self) -> String;
}

/// Sink that keeps everything it receives. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    delivered: Arc<Mutex<Vec<Message>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<Message> {
        self.delivered.lock().expect("memory sink mutex poisoned").clone()
    }
}

#[async_trait::async_trait]
impl Sink for MemorySink {
    async fn deliver(&self, message: &Message) -> Result<(), DeliveryError> {
        self.delivered
            .lock()
            .expect("memory sink mutex poisoned")
            .push(message.clone());
        Ok(())
    }

    fn label(&self) -> String {
        "memory".to_string()
    }
}

/// Scheme and host of a webhook URL; the path carries the token.
pub fn redact_endpoint(endpoint: &str) -> String {
    match reqwest::Url::parse(endpoint) {
        Ok(url) => match url.host_str() {
            Some(host) => format!("{}://{}/…", url.scheme(), host),
            None => "<webhook>".to_string(),
        },
        Err(_) => "<webhook>".to_string(),
    }
}
