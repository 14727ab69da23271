use clap::Parser;
use eventify_checkout::config::AppConfig;
use eventify_checkout::interfaces::cli::{Cli, run};
use eventify_checkout::observability::init_tracing;
use miette::{IntoDiagnostic, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = AppConfig::from_env().into_diagnostic()?;
    run(cli, config).await.into_diagnostic()?;

    Ok(())
}
