use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "bastion",
    about = "Bastion - failover and circuit-breaking API gateway",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, env = "BASTION_CONFIG", help = "Gateway configuration file (JSON)")]
    pub config: Option<PathBuf>,

    #[arg(short, long, env = "BASTION_PORT", help = "Override the configured listen port")]
    pub port: Option<u16>,

    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, env = "BASTION_LOG_DIR", help = "Also write daily-rolling log files here")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    #[command(about = "Start the gateway (default if no command specified)")]
    Serve,

    #[command(about = "Validate the configuration and print the deployed APIs")]
    Validate {
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
}
