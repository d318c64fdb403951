use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod config;
mod error;
mod juju;
mod select;
mod utils;

use cmd::{ListArgs, RunArgs};
use config::{Config, Overrides};

/// juju-act - pick a Juju action interactively
///
/// Command layout:
///   juju-act run  [--query Q] [--wide] [--json]
///   juju-act list <models|applications|charms|actions> [--query Q] [--json]
///
/// Global flags / env:
///   -v / -vv          Increase verbosity
///   -q / --quiet      Errors only
///   -c / --config     YAML config file (or JUJU_ACT_CONFIG)
///   -e / --endpoint   Controller address (or JUJU_ENDPOINT)
///   -u / --username   Login user (or JUJU_USERNAME, default admin)
///   -m / --model      Target model (or JUJU_MODEL)
///   --insecure        Skip TLS verification (or JUJU_INSECURE=1)
///   JUJU_PASSWORD     Login password (never a flag)
///
/// Examples:
///   JUJU_PASSWORD=secret juju-act -e 10.0.0.5:17070 -m tests run
///   juju-act -c ~/.config/juju-act.yaml list charms --query wordpress --json
#[derive(Parser, Debug)]
#[command(
    name = "juju-act",
    version,
    author,
    about = "Interactive action picker for Juju models",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// YAML config file
    #[arg(short = 'c', long = "config", global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Controller endpoint (host:port, ws:// or wss:// URL)
    #[arg(short = 'e', long = "endpoint", global = true, value_name = "ENDPOINT")]
    endpoint: Option<String>,

    /// Login user name
    #[arg(short = 'u', long = "username", global = true, value_name = "USER")]
    username: Option<String>,

    /// Model to work in
    #[arg(short = 'm', long = "model", global = true, value_name = "MODEL")]
    model: Option<String>,

    /// Accept self-signed controller certificates
    #[arg(long, global = true)]
    insecure: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search applications and pick a charm action
    Run(RunArgs),

    /// List models, applications, charms or actions
    List(ListArgs),
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            config: self.config.clone(),
            endpoint: self.endpoint.clone(),
            username: self.username.clone(),
            model: self.model.clone(),
            insecure: self.insecure,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    let config = match Config::load(&cli.overrides()) {
        Ok(c) => c,
        Err(e) => {
            crate::log_error!("{e}");
            std::process::exit(2);
        }
    };

    match cli.command {
        Commands::Run(args) => cmd::execute_run(args, &config),
        Commands::List(args) => cmd::execute_list(args, &config),
    }
}
