//! Definitions of CLI arguments and commands for the deploy scripts

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::{
    commands::{check_networks, print_profiles, resolve_networks},
    declarations::Declarations,
    errors::ScriptError,
    resolver::{ConfigResolver, Selection},
    secrets::SecretSource,
};

/// Resolve the build & deployment configuration of the contracts
#[derive(Parser)]
pub struct Cli {
    /// Network to activate, may be repeated. Defaults to the declared default network
    #[arg(short, long = "network")]
    pub networks: Vec<String>,

    /// JSON declarations file, replacing the builtin tables
    #[arg(short, long)]
    pub declarations: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Load the declarations the invocation runs against
    pub fn load_declarations(&self) -> Result<Declarations, ScriptError> {
        match &self.declarations {
            Some(path) => {
                info!("Loading declarations from {}", path.display());
                Declarations::from_json_file(path)
            }
            None => Ok(Declarations::builtin()?),
        }
    }

    /// The networks selected on the command line
    pub fn selection(&self) -> Selection {
        if self.networks.is_empty() {
            Selection::Default
        } else {
            Selection::Networks(self.networks.clone())
        }
    }
}

/// The possible CLI commands
#[derive(Subcommand)]
pub enum Command {
    /// Resolve the active networks, failing on any missing credential
    Resolve(ResolveArgs),
    /// Report the state of the selected networks, or of every declared one, without
    /// failing on missing credentials
    Check,
    /// List the compiler profiles of a contract source
    Profiles(ProfilesArgs),
}

impl Command {
    /// Run the command
    pub fn run<S: SecretSource>(
        self,
        resolver: &ConfigResolver<S>,
        selection: Selection,
    ) -> Result<(), ScriptError> {
        match self {
            Command::Resolve(args) => {
                info!("Resolving configuration...");
                resolve_networks(args, resolver, &selection)
            }
            Command::Check => {
                info!("Checking declared networks...");
                check_networks(resolver, &selection)
            }
            Command::Profiles(args) => {
                print_profiles(args, resolver);
                Ok(())
            }
        }
    }
}

/// Resolve the active networks
#[derive(Args)]
pub struct ResolveArgs {
    /// Write a redacted manifest of the active networks to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// List compiler profiles
#[derive(Args)]
pub struct ProfilesArgs {
    /// Path of the contract source
    #[arg(short, long)]
    pub source: PathBuf,
}
