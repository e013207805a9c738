//! Netscript Agent
//!
//! Runs the script handlers outside a scripting host: the rewrite proxy as a
//! long-lived service, and the check-in and network-change handlers as
//! one-shot commands meant to be triggered by cron or a network hook.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use script_core::fakes::RecordingOutbound;
use script_core::{
    CertificateAuthority, CheckinRunner, FileStore, HostContext, InterceptedEvent, MemoryStore,
    NetworkSnapshot, OutboundController, OutboundSelector, PersistentStore, ProxyServer,
    ReqwestClient, ResponseRewriter, ScriptConfig, SelectorOutcome, StaticNetwork,
    SurgeApiController, TracingNotifier,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub mod logging;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Use an in-memory store and record side effects instead of applying them
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the MITM proxy that strips ads from intercepted responses
    Proxy {
        /// Address to listen on for HTTP/HTTPS traffic
        #[arg(long)]
        listen_addr: Option<String>,

        /// Port to listen on for HTTP/HTTPS traffic
        #[arg(long)]
        listen_port: Option<u16>,

        /// Port to expose the Admin API (health/metrics)
        #[arg(long)]
        admin_port: Option<u16>,

        /// Directory holding the root CA
        #[arg(long)]
        ca_dir: Option<PathBuf>,
    },

    /// Rewrite one captured response body and print the result
    Rewrite {
        /// Request URL the body was served for
        #[arg(long)]
        url: String,

        /// File containing the response body
        #[arg(long)]
        body_file: PathBuf,
    },

    /// Check in every configured account once
    Checkin,

    /// Handle a network change and switch outbound mode if needed
    NetworkChanged {
        /// Current Wi-Fi SSID, omitted when not on Wi-Fi
        #[arg(long)]
        ssid: Option<String>,

        /// Primary IPv4 address
        #[arg(long)]
        ip: Option<String>,

        /// Primary interface identifier (e.g. en0, pdp_ip0)
        #[arg(long)]
        interface: Option<String>,
    },
}

/// Load the configuration file if given, defaults otherwise
pub fn load_config(args: &Args) -> anyhow::Result<ScriptConfig> {
    let mut config = match &args.config {
        Some(path) => ScriptConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ScriptConfig::default(),
    };
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    Ok(config)
}

fn open_store(config: &ScriptConfig, dry_run: bool) -> Arc<dyn PersistentStore> {
    if dry_run {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::new(&config.store.path))
    }
}

fn outbound_controller(
    config: &ScriptConfig,
    dry_run: bool,
) -> anyhow::Result<Arc<dyn OutboundController>> {
    if dry_run {
        return Ok(Arc::new(RecordingOutbound::new(true)));
    }
    let api_url = config.outbound.api_url.as_deref().ok_or_else(|| {
        anyhow!("outbound.api_url is not configured; set it or pass --dry-run")
    })?;
    Ok(Arc::new(SurgeApiController::new(
        api_url,
        config.outbound.api_key.clone(),
        Duration::from_secs(config.checkin.request_timeout_secs),
    )?))
}

fn host_context(
    config: &ScriptConfig,
    dry_run: bool,
    snapshot: NetworkSnapshot,
    outbound: Arc<dyn OutboundController>,
) -> anyhow::Result<HostContext> {
    let http = ReqwestClient::new(Duration::from_secs(config.checkin.request_timeout_secs))?;
    Ok(HostContext::new(
        open_store(config, dry_run),
        Arc::new(TracingNotifier),
        Arc::new(http),
        Arc::new(StaticNetwork::new(snapshot)),
        outbound,
    ))
}

pub async fn run_agent(args: Args, config: ScriptConfig) -> anyhow::Result<()> {
    match args.command.clone() {
        Command::Proxy {
            listen_addr,
            listen_port,
            admin_port,
            ca_dir,
        } => {
            let mut proxy_config = config.proxy.clone();
            if let Some(addr) = listen_addr {
                proxy_config.listen_address = addr;
            }
            if let Some(port) = listen_port {
                proxy_config.listen_port = port;
            }
            if let Some(port) = admin_port {
                proxy_config.admin_port = port;
            }
            if let Some(dir) = ca_dir {
                proxy_config.cert_store_path = dir;
            }

            tracing::info!("Starting rewrite proxy...");
            tracing::info!("  Listen: {}:{}", proxy_config.listen_address, proxy_config.listen_port);
            tracing::info!("  Admin:  {}", proxy_config.admin_port);
            tracing::info!("  CA:     {}", proxy_config.cert_store_path.display());

            let store = open_store(&config, args.dry_run);
            let rewriter = ResponseRewriter::new(config.rewriter.clone(), store.as_ref())?;
            let ca = CertificateAuthority::new(&proxy_config.cert_store_path)?;

            let server = ProxyServer::new(proxy_config, ca, rewriter);
            server
                .run(async {
                    let _ = tokio::signal::ctrl_c().await;
                    tracing::info!("Shutdown signal received, stopping proxy server...");
                })
                .await?;
        }

        Command::Rewrite { url, body_file } => {
            let body = std::fs::read_to_string(&body_file)
                .with_context(|| format!("Failed to read {}", body_file.display()))?;
            let store = open_store(&config, args.dry_run);
            let rewriter = ResponseRewriter::new(config.rewriter.clone(), store.as_ref())?;

            let outcome = rewriter.rewrite(&InterceptedEvent::response(&url, &body));
            match outcome.into_body() {
                Some(rewritten) => println!("{}", rewritten),
                None => println!("{}", body),
            }
        }

        Command::Checkin => {
            let runner = CheckinRunner::from_config(config.checkin.clone())?;
            let outbound: Arc<dyn OutboundController> = Arc::new(RecordingOutbound::new(false));
            let host = host_context(&config, args.dry_run, NetworkSnapshot::default(), outbound)?;

            let report = runner.run(&host).await;
            if report.failed() > 0 {
                tracing::warn!(
                    "{} of {} check-ins failed",
                    report.failed(),
                    report.entries.len()
                );
            }
        }

        Command::NetworkChanged { ssid, ip, interface } => {
            let snapshot = NetworkSnapshot {
                ssid,
                primary_address: ip,
                primary_interface: interface,
            };
            let outbound = outbound_controller(&config, args.dry_run)?;
            let host = host_context(&config, args.dry_run, snapshot, outbound)?;

            let selector = OutboundSelector::from_config(&config.outbound);
            match selector.on_network_changed(&host).await {
                SelectorOutcome::Unchanged { network } => {
                    tracing::info!("No change ({})", network);
                }
                SelectorOutcome::Changed {
                    network,
                    mode,
                    applied,
                } => {
                    tracing::info!(applied, "{} -> {} mode", network, mode);
                }
            }
        }
    }

    Ok(())
}
