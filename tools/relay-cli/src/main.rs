//! wallet-relay: drive a browser wallet extension from the terminal.
//!
//! ## Usage
//!
//! ```bash
//! # Print the active address (opens the default browser)
//! wallet-relay address
//!
//! # Fixed port, no browser launch, 60s per-request timeout
//! wallet-relay --port 4321 --no-browser --timeout 60s sign-message "hello"
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relay_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{error, info};
use wallet_relay::domain::config::parse_duration;
use wallet_relay::domain::encoding;
use wallet_relay::{BrowserWallet, RelayConfig, SessionStatus};

/// Wallet relay command line
#[derive(Parser, Debug)]
#[command(name = "wallet-relay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Listen port (0 = OS-assigned)
    #[arg(long)]
    port: Option<u16>,

    /// Kill whatever holds --port and retry once
    #[arg(long)]
    free_port: bool,

    /// Per-request timeout (e.g. 300s, 5m, 1500ms)
    #[arg(long, value_parser = parse_timeout)]
    timeout: Option<Duration>,

    /// Browser executable
    #[arg(long)]
    browser: Option<String>,

    /// Browser profile
    #[arg(long)]
    profile: Option<String>,

    /// Only print the page URL instead of opening a browser
    #[arg(long)]
    no_browser: bool,

    /// Debug logging for the relay
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the active wallet address
    Address,
    /// Print every address in the wallet
    Addresses,
    /// Print the active public key
    PublicKey,
    /// Sign a UTF-8 message and print the base64 signature
    SignMessage {
        /// Message text
        text: String,
    },
    /// Keep the relay running until Ctrl-C
    Serve,
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    parse_duration(s).map_err(|e| format!("{e}: {s:?}"))
}

impl Args {
    /// Environment defaults overlaid with command-line flags.
    fn relay_config(&self) -> Result<RelayConfig> {
        let mut config = RelayConfig::from_env().context("invalid WALLET_RELAY_* environment")?;
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.free_port {
            config.free_port = true;
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout = timeout;
        }
        if let Some(browser) = &self.browser {
            config.browser.executable = Some(browser.clone());
        }
        if let Some(profile) = &self.profile {
            config.browser.profile = Some(profile.clone());
        }
        if self.no_browser {
            config.browser.launch = false;
        }
        config.validate().context("invalid relay configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut telemetry = TelemetryConfig::from_env();
    if args.verbose {
        telemetry = telemetry.verbose();
    }
    let _guard = init_telemetry(telemetry).context("failed to initialize logging")?;

    let config = args.relay_config()?;
    let wallet = BrowserWallet::initialize(config)
        .await
        .context("failed to start wallet relay")?;
    if args.no_browser {
        eprintln!("Open {} in a browser with the wallet extension", wallet.url());
    }

    let result = run(&wallet, args.command).await;
    let status = match &result {
        Ok(()) => SessionStatus::Success,
        Err(e) => {
            error!(error = %e, "Command failed");
            SessionStatus::Failed
        }
    };
    wallet.close(status).await;
    result
}

async fn run(wallet: &BrowserWallet, command: Command) -> Result<()> {
    match command {
        Command::Address => {
            let address = wallet
                .get_active_address()
                .await
                .context("getActiveAddress failed")?;
            println!("{address}");
        }
        Command::Addresses => {
            let addresses = wallet
                .get_all_addresses()
                .await
                .context("getAllAddresses failed")?;
            for address in addresses {
                println!("{address}");
            }
        }
        Command::PublicKey => {
            let key = wallet
                .get_active_public_key()
                .await
                .context("getActivePublicKey failed")?;
            println!("{key}");
        }
        Command::SignMessage { text } => {
            let signature = wallet
                .sign_message(text.as_bytes(), None)
                .await
                .context("signMessage failed")?;
            println!("{}", encoding::encode(&signature));
        }
        Command::Serve => {
            info!(url = %wallet.url(), "Serving until Ctrl-C");
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
        }
    }
    Ok(())
}
