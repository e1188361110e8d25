//! # helm
//!
//! Operator console binary: loads settings, connects to the server, and
//! runs the interactive line loop on stdin.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use helm_console::commands::default_registry;
use helm_console::{Dispatcher, Session, Shell, TextRenderer};
use helm_rpc::RpcGateway;
use helm_settings::HelmSettings;
use tokio::io::BufReader;

/// Helm operator console.
#[derive(Parser, Debug)]
#[command(name = "helm", about = "Helm operator console")]
struct Cli {
    /// Server host (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Log level for stderr output (overrides settings).
    #[arg(long)]
    log_level: Option<String>,

    /// Path to the settings file.
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    /// Load settings from the chosen file and apply flag overrides.
    fn settings(&self) -> Result<HelmSettings> {
        let path = self
            .settings
            .clone()
            .unwrap_or_else(helm_settings::settings_path);
        let mut settings = helm_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;

        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = args.settings()?;
    helm_core::logging::init_subscriber(&settings.logging.level);

    let address = settings.server.address();
    let (sink, source) = helm_rpc::transport::connect(&address, settings.server.max_frame_bytes)
        .await
        .with_context(|| format!("Failed to connect to {address}"))?;
    tracing::info!(%address, "connected");

    let gateway = Arc::new(RpcGateway::spawn(sink, source, settings.rpc.outbound_buffer));
    let session = Session::new(gateway, &settings, Arc::new(TextRenderer::stdout()));
    let registry = default_registry().context("Failed to assemble console commands")?;
    let dispatcher = Dispatcher::new(registry).context("Failed to start dispatcher")?;

    let mut shell = Shell::new(dispatcher, session, &settings.console);
    shell
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
        .context("Console I/O failed")?;

    tracing::info!("console closed");
    Ok(())
}
