use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod auth;
mod cli;
mod config;
mod error;
mod integration;
mod storage;

use crate::cli::commands::AuthenticateArgs;
use crate::config::{Overrides, Settings};
use crate::error::AuthError;

#[derive(Parser)]
#[command(name = "apiauth", about = "Acquire and store credentials for API integrations")]
struct Cli {
    /// Config file (default: <config dir>/apiauth/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding <integration>.json credential files
    #[arg(long, global = true)]
    credentials_dir: Option<PathBuf>,

    /// Directory holding integration specs
    #[arg(long, global = true)]
    integrations_dir: Option<PathBuf>,

    /// Local port for the OAuth callback server
    #[arg(long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an account for an integration, or edit an existing one
    Authenticate {
        /// Integration name (e.g. github)
        integration: String,
        /// Edit the account stored under this alias
        #[arg(long = "as", value_name = "ALIAS")]
        alias: Option<String>,
        /// Fetch fresh OAuth tokens through a local callback server (requires --as)
        #[arg(long)]
        generate_token: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = Overrides {
        config: cli.config,
        credentials_dir: cli.credentials_dir,
        integrations_dir: cli.integrations_dir,
        oauth_port: cli.port,
    };

    let result = Settings::load(overrides)
        .map_err(anyhow::Error::from)
        .and_then(|settings| match &cli.command {
            Commands::Authenticate {
                integration,
                alias,
                generate_token,
            } => cli::commands::cmd_authenticate(
                &settings,
                AuthenticateArgs {
                    integration,
                    alias: alias.as_deref(),
                    generate_token: *generate_token,
                },
            ),
        });

    if let Err(e) = result {
        eprintln!("error: {:#}", e);
        let code = e
            .downcast_ref::<AuthError>()
            .map(|err| err.kind().exit_code())
            .unwrap_or(1);
        std::process::exit(code);
    }
}
