use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shareport::{AppState, ApprovalGate, Config, FsNode, Scheme, ServerIdentity, routes};

#[derive(Parser, Debug)]
#[command(name = "shareport")]
#[command(about = "Personal file-sharing HTTP server for the local network")]
#[command(version)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "SHAREPORT_PORT", default_value = "8686")]
    port: u16,

    /// Address to bind to
    #[arg(short, long, env = "SHAREPORT_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// Root directory to share
    #[arg(short, long, env = "SHAREPORT_ROOT", default_value = ".")]
    root: PathBuf,

    /// IP address clients reach this machine under; enables absolute
    /// URLs in listings and the injected base URL in the UI shell
    #[arg(long, env = "SHAREPORT_PUBLIC_IP")]
    public_ip: Option<String>,

    /// Generate https:// URLs (for externally terminated TLS)
    #[arg(long, env = "SHAREPORT_HTTPS")]
    https: bool,

    /// Require per-client approval before serving requests
    #[arg(long, env = "SHAREPORT_REQUIRE_APPROVAL")]
    require_approval: bool,

    /// Enable verbose logging
    #[arg(short, long, env = "SHAREPORT_VERBOSE")]
    verbose: bool,

    /// Config file path (optional)
    #[arg(short, long, env = "SHAREPORT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "shareport=debug,tower_http=debug"
    } else {
        "shareport=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .map_err(|err| anyhow::anyhow!("failed to load config {}: {err}", path.display()))?,
        None => Config::default(),
    };
    if cli.require_approval {
        config.require_approval = true;
    }

    let root_dir = cli.root.canonicalize().unwrap_or_else(|_| cli.root.clone());
    if !root_dir.is_dir() {
        anyhow::bail!("shared root is not a directory: {}", root_dir.display());
    }

    let root = FsNode::open(&root_dir)
        .await
        .with_context(|| format!("cannot open shared root {}", root_dir.display()))?;

    let gate = if config.require_approval {
        let (tx, rx) = mpsc::unbounded_channel();
        let gate = Arc::new(ApprovalGate::new(Some(tx)));
        tokio::spawn(approval_console(rx, gate.clone()));
        gate
    } else {
        Arc::new(ApprovalGate::new(None))
    };

    let scheme = if cli.https { Scheme::Https } else { Scheme::Http };
    let identity = cli.public_ip.as_ref().map(|ip| ServerIdentity {
        scheme,
        ip: ip.clone(),
        port: cli.port,
    });

    if let Some(identity) = &identity {
        info!("reachable at {}", identity.base_url());
    } else {
        info!("no public IP configured; listings will carry null URLs");
    }
    info!("sharing directory: {}", root_dir.display());
    if config.require_approval {
        info!("per-client approval is ON; type 'approve <ip>' / 'deny <ip>' / 'list'");
    }

    let state = AppState::new(Arc::new(root), config, identity, gate);
    let app = routes::app(state);

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port)
        .parse()
        .context("invalid bind address")?;
    info!("starting shareport on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Stand-in for a host UI: logs connection attempts and takes approval
/// decisions from stdin.
async fn approval_console(
    mut attempts: mpsc::UnboundedReceiver<String>,
    gate: Arc<ApprovalGate>,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            attempt = attempts.recv() => {
                match attempt {
                    Some(ip) => {
                        info!(client = %ip, "connection attempt awaiting approval (type 'approve {ip}' or 'deny {ip}')");
                    }
                    None => break,
                }
            }
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                let mut parts = line.split_whitespace();
                match (parts.next(), parts.next()) {
                    (Some("approve"), Some(ip)) => gate.approve(ip),
                    (Some("deny"), Some(ip)) => gate.reject(ip),
                    (Some("list"), None) => {
                        let pending = gate.pending();
                        if pending.is_empty() {
                            info!("no clients awaiting approval");
                        } else {
                            info!("awaiting approval: {}", pending.join(", "));
                        }
                    }
                    (None, _) => {}
                    _ => warn!("unrecognized command (expected 'approve <ip>', 'deny <ip>' or 'list')"),
                }
            }
        }
    }
}
