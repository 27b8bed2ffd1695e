//! Antminer Agent CLI
//!
//! ## Usage
//! ```bash
//! # Zabbix item
//! antminer-agent get 192.168.1.110 80 root root STATS.chain.0.temp_chip.2
//!
//! # Low-level discovery
//! antminer-agent discover_chains 192.168.1.110 80 root root
//! antminer-agent discover_fans 192.168.1.110 80 root root
//!
//! # Terminal report (connection from config file / ANTMINER_* env)
//! antminer-agent status
//! ```

use anyhow::{Context, Result};
use antminer_agent::commands;
use antminer_agent::{AgentConfig, DiscoveryKind, DiscoveryMode, Dialect, MinerClient, MinerConfig};
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "antminer-agent",
    about = "Antminer stats.cgi poller for Zabbix and terminal status reports",
    version
)]
struct Cli {
    /// Enable verbose logging on stderr (repeat for more: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// HTTP timeout in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

/// Positional connection arguments shared by the Zabbix-facing commands
#[derive(Args)]
struct Target {
    host: String,
    port: u16,
    username: String,
    password: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value of one item, or 0 when it can't be read.
    Get {
        #[command(flatten)]
        target: Target,

        /// Item path, e.g. STATS.chain.0.freq_avg
        item: String,

        #[arg(long, value_enum, default_value_t = Dialect::Extended)]
        dialect: Dialect,
    },

    /// Print a low-level discovery document for the hashing chains.
    #[command(name = "discover_chains")]
    DiscoverChains {
        #[command(flatten)]
        target: Target,

        /// Use 0..chain_num instead of each chain's index field.
        #[arg(long)]
        count_only: bool,
    },

    /// Print a low-level discovery document for the fans.
    #[command(name = "discover_fans")]
    DiscoverFans {
        #[command(flatten)]
        target: Target,

        /// Use 0..fan_num instead of the fan array length.
        #[arg(long)]
        count_only: bool,
    },

    /// Display a colorized status report.
    Status {
        /// Path to a TOML configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        password: Option<String>,
    },

    /// Poll one item repeatedly, one value per line.
    Watch {
        #[command(flatten)]
        target: Target,

        item: String,

        /// Seconds between polls.
        #[arg(long, default_value_t = 30)]
        interval: u64,

        #[arg(long, value_enum, default_value_t = Dialect::Extended)]
        dialect: Dialect,
    },
}

impl Target {
    fn into_config(self, timeout: Option<u64>) -> MinerConfig {
        let mut miner = MinerConfig::new(self.host, self.port, self.username, self.password);
        if let Some(secs) = timeout {
            miner.timeout_secs = secs.max(1);
        }
        miner
    }
}

fn discovery_mode(count_only: bool) -> DiscoveryMode {
    if count_only {
        DiscoveryMode::Count
    } else {
        DiscoveryMode::Enumerate
    }
}

/// Logs go to stderr; stdout carries only the value for the monitoring server.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            // Usage goes to stdout so the monitoring server shows it
            println!("{}", e.render());
            std::process::exit(1);
        }
    };

    init_tracing(cli.verbose);

    match cli.command {
        Commands::Get { target, item, dialect } => {
            let client = MinerClient::new(target.into_config(cli.timeout))
                .context("Failed to build HTTP client")?;
            println!("{}", commands::get(&client, &item, dialect).await);
        }
        Commands::DiscoverChains { target, count_only } => {
            let client = MinerClient::new(target.into_config(cli.timeout))
                .context("Failed to build HTTP client")?;
            let mode = discovery_mode(count_only);
            println!("{}", commands::discover_items(&client, DiscoveryKind::Chains, mode).await);
        }
        Commands::DiscoverFans { target, count_only } => {
            let client = MinerClient::new(target.into_config(cli.timeout))
                .context("Failed to build HTTP client")?;
            let mode = discovery_mode(count_only);
            println!("{}", commands::discover_items(&client, DiscoveryKind::Fans, mode).await);
        }
        Commands::Status { config, host, port, username, password } => {
            let mut config = AgentConfig::load_with_env(config.as_deref())
                .context("Failed to load configuration")?;
            let miner = &mut config.miner;
            if let Some(host) = host {
                miner.host = host;
            }
            if let Some(port) = port {
                miner.port = port;
            }
            if let Some(username) = username {
                miner.username = username;
            }
            if let Some(password) = password {
                miner.password = password;
            }
            if let Some(secs) = cli.timeout {
                miner.timeout_secs = secs.max(1);
            }
            debug!("Reporting on {}", miner.stats_url());

            let client = MinerClient::new(config.miner.clone())
                .context("Failed to build HTTP client")?;
            print!("{}", commands::status(&client, &config.thresholds).await);
        }
        Commands::Watch { target, item, interval, dialect } => {
            let client = MinerClient::new(target.into_config(cli.timeout))
                .context("Failed to build HTTP client")?;
            commands::watch(&client, &item, dialect, Duration::from_secs(interval.max(1))).await;
        }
    }

    Ok(())
}
