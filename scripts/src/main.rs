use clap::Parser;
use deploy_scripts::{
    cli::Cli, errors::ScriptError, resolver::ConfigResolver, secrets::EnvSecretSource,
};
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), ScriptError> {
    // Load .env file
    dotenv().ok();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().pretty().with_env_filter(filter).init();

    // Resolve everything before any side effect
    let resolver = ConfigResolver::new(cli.load_declarations()?, EnvSecretSource);
    let selection = cli.selection();

    cli.command.run(&resolver, selection)
}
