pub mod catalog;
pub mod init;
pub mod keys;
pub mod migrate;
pub mod serve;
pub mod sign;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "greenleaf")]
#[command(version)]
#[command(about = "Tenant webhook delivery for the Greenleaf storefront", long_about = None)]
pub struct Cli {
    #[arg(short, long, default_value = "greenleaf.toml", env = "GREENLEAF_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter config with a freshly generated secret key
    Init {
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long)]
        force: bool,
    },
    /// Run the management API and webhook worker
    Serve {
        #[arg(short = 'H', long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Apply pending database migrations
    Migrate {
        #[command(subcommand)]
        command: Option<MigrateCommand>,
    },
    /// Manage tenant API keys
    Keys {
        #[command(subcommand)]
        command: KeyCommand,
    },
    /// Print the event catalog
    Catalog {
        #[arg(long)]
        json: bool,
    },
    /// Compute the signature header for a body file
    Sign {
        #[arg(long, env = "GREENLEAF_WEBHOOK_SECRET")]
        secret: String,
        /// Body file; `-` reads stdin
        file: PathBuf,
    },
    /// Check a signature against a body file, as a receiver would
    Verify {
        #[arg(long, env = "GREENLEAF_WEBHOOK_SECRET")]
        secret: String,
        #[arg(long)]
        signature: String,
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum MigrateCommand {
    /// Show applied and pending migrations
    Status,
}

#[derive(Subcommand)]
pub enum KeyCommand {
    Create {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        name: String,
    },
    List {
        #[arg(long)]
        tenant: Option<String>,
    },
    Revoke {
        id: i64,
    },
}
