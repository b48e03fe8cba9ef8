//! Orchard Command Line Tool
//!
//! This binary is the command-line interface for managing Orchard hosts and
//! running Docker against them.

use clap::{Parser, Subcommand};
use log::debug;
use std::path::PathBuf;
use std::process::ExitCode;

use orchard::commands::{self, Context};
use orchard::common::init_logger;
use orchard::config::defaults::HOST_SIZE_STR;
use orchard::config::{ClientConfig, ConfigLoader};
use orchard::{Result, APP_NAME, VERSION};

/// Orchard: remote Docker hosts
#[derive(Parser, Debug)]
#[clap(name = "orchard", author, version = VERSION, about, long_about = None)]
struct Args {
    /// Log level (error, warn, info, debug, trace); overrides the config file
    #[clap(long, global = true)]
    log_level: Option<String>,

    /// Load configuration from a file
    #[clap(long, global = true)]
    config_file: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage hosts
    Hosts {
        #[clap(subcommand)]
        command: Option<HostsCommand>,
    },

    /// Run a Docker command against a host
    Docker {
        /// Host to use
        #[clap(short = 'H', long)]
        host: Option<String>,

        /// Arguments passed to docker
        #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Start a local proxy to a host's Docker daemon
    Proxy {
        /// Host to use
        #[clap(short = 'H', long)]
        host: Option<String>,

        /// Where to listen, e.g. tcp://127.0.0.1:2375 or unix:///tmp/orchard.sock
        listen_url: Option<String>,
    },

    /// Print a host's IP address
    Ip {
        /// Host name
        name: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum HostsCommand {
    /// List hosts
    Ls,

    /// Create a host
    Create {
        /// Memory size (512M, 1G, 2G, 4G or 8G)
        #[clap(short = 'm', long = "memory", default_value = HOST_SIZE_STR)]
        size: String,

        /// Host name
        name: Option<String>,
    },

    /// Remove a host
    Rm {
        /// Don't ask for confirmation
        #[clap(short, long)]
        force: bool,

        /// Host name
        name: Option<String>,
    },
}

async fn run(args: Args) -> Result<()> {
    // The env-provided file is picked up by the loader itself
    let mut config = ClientConfig::load(args.config_file.as_deref())?;
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    init_logger(&config.log_level);
    debug!("Starting {} v{}", APP_NAME, VERSION);
    config.log();

    let ctx = Context::new(config);
    match args.command {
        Command::Hosts { command: None | Some(HostsCommand::Ls) } => commands::run_hosts(&ctx).await,
        Command::Hosts { command: Some(HostsCommand::Create { size, name }) } => {
            commands::run_create_host(&ctx, name.as_deref(), &size).await
        }
        Command::Hosts { command: Some(HostsCommand::Rm { force, name }) } => {
            commands::run_remove_host(&ctx, name.as_deref(), force).await
        }
        Command::Docker { host, args } => commands::run_docker(&ctx, host.as_deref(), &args).await,
        Command::Proxy { host, listen_url } => {
            commands::run_proxy(&ctx, host.as_deref(), listen_url.as_deref()).await
        }
        Command::Ip { name } => commands::run_ip(&ctx, name.as_deref()).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
