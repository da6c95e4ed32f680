// src/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::ingest::channel::{ChannelReader, DEFAULT_BASE_URL};
use crate::ingest::SourceReader;
use crate::ledger::DeliveryLedger;
use crate::message::{Source, MAX_COLOR};
use crate::notify::discord::DiscordWebhook;
use crate::notify::Sink;
use crate::relay::Relay;
use crate::scheduler::DEFAULT_INTERVAL_SECS;

pub const ENV_PATH: &str = "RELAY_CONFIG_PATH";
const FALLBACKS: [&str; 3] = ["config/relay.toml", "config/relay.yaml", "config.yaml"];
const USER_AGENT: &str = concat!("channel-relay/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default = "default_base_url")]
    pub source_base_url: String,
    #[serde(default)]
    pub metrics_listen: Option<SocketAddr>,
    pub relays: Vec<RelayConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ledger: Option<PathBuf>,
    #[serde(alias = "scrapers")]
    pub sources: Vec<SourceSpec>,
    #[serde(alias = "senders")]
    pub sinks: Vec<SinkSpec>,
}

/// `"id"` or `{ id, color }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SourceSpec {
    Id(String),
    Full {
        id: String,
        #[serde(default)]
        color: Option<u32>,
    },
}

/// `"https://…"` or `{ endpoint }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SinkSpec {
    Url(String),
    Full { endpoint: String },
}

// A bare list of relays is accepted as a config with every default.
#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigFile {
    Full(AppConfig),
    Bare(Vec<RelayConfig>),
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}

fn default_timeout() -> u64 {
    30
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("state")
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// A relay after defaults and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelay {
    pub name: String,
    pub ledger_path: PathBuf,
    pub sources: Vec<Source>,
    pub sinks: Vec<String>,
}

impl SourceSpec {
    fn to_source(&self) -> Result<Source> {
        let (id, color) = match self {
            SourceSpec::Id(id) => (id.trim(), None),
            SourceSpec::Full { id, color } => (id.trim(), *color),
        };
        if id.is_empty() {
            bail!("empty source id");
        }
        match color {
            Some(c) if c > MAX_COLOR => bail!("source {id}: color {c:#x} exceeds 0xFFFFFF"),
            Some(c) => Ok(Source::with_color(id, c)),
            None => Ok(Source::new(id)),
        }
    }
}

impl SinkSpec {
    fn endpoint(&self) -> &str {
        match self {
            SinkSpec::Url(u) => u,
            SinkSpec::Full { endpoint } => endpoint,
        }
    }
}

/// Drop `.` and fold `..` without touching the filesystem, so spellings of
/// the same not-yet-existing ledger path compare equal.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn check_endpoint(endpoint: &str) -> Result<()> {
    let url = reqwest::Url::parse(endpoint)
        .map_err(|e| anyhow!("sink endpoint is not a URL ({e})"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("sink endpoint must be http(s), got {}", url.scheme());
    }
    Ok(())
}

impl AppConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Apply defaults and reject configurations that cannot run.
    pub fn resolve(&self) -> Result<Vec<ResolvedRelay>> {
        if self.relays.is_empty() {
            bail!("no relays configured");
        }
        if self.interval_secs == 0 {
            bail!("interval_secs must be positive");
        }

        let mut names = HashSet::new();
        let mut ledgers = HashSet::new();
        let mut out = Vec::with_capacity(self.relays.len());

        for (i, rc) in self.relays.iter().enumerate() {
            let name = rc
                .name
                .clone()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("relay-{}", i + 1));

            if rc.sources.is_empty() {
                bail!("relay {name}: no sources");
            }
            if rc.sinks.is_empty() {
                bail!("relay {name}: no sinks");
            }

            let sources = rc
                .sources
                .iter()
                .map(SourceSpec::to_source)
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("relay {name}"))?;

            let mut sinks = Vec::with_capacity(rc.sinks.len());
            for spec in &rc.sinks {
                let ep = spec.endpoint().trim();
                check_endpoint(ep).with_context(|| format!("relay {name}"))?;
                sinks.push(ep.to_string());
            }

            let ledger_path = rc
                .ledger
                .clone()
                .unwrap_or_else(|| self.state_dir.join(format!("{name}.yaml")));

            if !names.insert(name.clone()) {
                bail!("duplicate relay name {name}");
            }
            if !ledgers.insert(lexical_normalize(&ledger_path)) {
                bail!("relay {name}: ledger {} is shared with another relay", ledger_path.display());
            }

            out.push(ResolvedRelay {
                name,
                ledger_path,
                sources,
                sinks,
            });
        }
        Ok(out)
    }

    /// Shared HTTP client for source fetches and webhook posts.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("building http client")
    }

    /// Construct every relay, opening (and validating) its ledger.
    pub fn build_relays(&self, client: &reqwest::Client) -> Result<Vec<Relay>> {
        let mut relays = Vec::new();
        for r in self.resolve()? {
            let ledger = DeliveryLedger::open(&r.ledger_path)
                .with_context(|| format!("relay {}: opening ledger", r.name))?;

            let sources: Vec<Box<dyn SourceReader>> = r
                .sources
                .into_iter()
                .map(|s| {
                    Box::new(ChannelReader::from_url(s, &self.source_base_url, client.clone()))
                        as Box<dyn SourceReader>
                })
                .collect();
            let sinks: Vec<Box<dyn Sink>> = r
                .sinks
                .into_iter()
                .map(|ep| Box::new(DiscordWebhook::new(ep, client.clone())) as Box<dyn Sink>)
                .collect();

            tracing::info!(
                relay = %r.name,
                sources = sources.len(),
                sinks = sinks.len(),
                seen = ledger.len(),
                "relay ready"
            );
            relays.push(Relay::new(r.name, sources, sinks, ledger));
        }
        Ok(relays)
    }
}

/// Load configuration from an explicit path. TOML or YAML, by extension.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing config {}", path.display()))
}

/// Load configuration using env var + fallbacks:
/// 1) $RELAY_CONFIG_PATH
/// 2) config/relay.toml
/// 3) config/relay.yaml
/// 4) config.yaml
pub fn load_config_default() -> Result<AppConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        }
        return Err(anyhow!("{ENV_PATH} points to non-existent path"));
    }
    for candidate in FALLBACKS {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return load_config_from(&p);
        }
    }
    Err(anyhow!(
        "no configuration found (set {ENV_PATH} or create one of {})",
        FALLBACKS.join(", ")
    ))
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AppConfig> {
    match hint_ext {
        "toml" => parse_toml(s),
        "yaml" | "yml" => parse_yaml(s),
        _ => parse_toml(s).or_else(|_| parse_yaml(s)),
    }
}

fn parse_toml(s: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(s)?;
    Ok(cfg)
}

fn parse_yaml(s: &str) -> Result<AppConfig> {
    let file: ConfigFile = serde_yaml::from_str(s)?;
    Ok(match file {
        ConfigFile::Full(cfg) => cfg,
        ConfigFile::Bare(relays) => AppConfig {
            interval_secs: default_interval(),
            request_timeout_secs: default_timeout(),
            state_dir: default_state_dir(),
            source_base_url: default_base_url(),
            metrics_listen: None,
            relays,
        },
    })
}
