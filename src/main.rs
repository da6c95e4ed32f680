//! Channel relay — binary entrypoint.
//! Loads the relay configuration, opens every relay's ledger and polls
//! forever until interrupted.

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use channel_relay::config::load_config_default;
use channel_relay::Scheduler;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("channel_relay=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = load_config_default()?;
    if let Some(addr) = cfg.metrics_listen {
        channel_relay::metrics::install_exporter(addr)?;
    }

    let client = cfg.build_client()?;
    let relays = cfg.build_relays(&client)?;
    let mut scheduler = Scheduler::new(relays, cfg.interval());

    tokio::select! {
        _ = scheduler.run_forever() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, shutting down");
        }
    }
    Ok(())
}
