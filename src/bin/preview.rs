//! Fetch the given channels once and print the webhook payloads that would be
//! sent, without delivering anything or touching a ledger.
//!
//! Usage: `preview <channel-id>...`

use channel_relay::ingest::channel::{ChannelReader, DEFAULT_BASE_URL};
use channel_relay::ingest::SourceReader;
use channel_relay::notify::discord::WebhookPayload;
use channel_relay::Source;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let ids: Vec<String> = std::env::args().skip(1).collect();
    if ids.is_empty() {
        anyhow::bail!("usage: preview <channel-id>...");
    }
    let base = std::env::var("RELAY_SOURCE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    for id in ids {
        let reader = ChannelReader::from_url(Source::new(id), &base, client.clone());
        let mut messages = reader.fetch().await?;
        messages.sort_by_key(|m| m.timestamp);
        for m in &messages {
            println!("{}", serde_json::to_string_pretty(&WebhookPayload::from_message(m))?);
        }
        tracing::info!(source = %reader.source().id, count = messages.len(), "preview done");
    }
    Ok(())
}
