//! Morgue - extract and deduplicate articles from an archived HTML tree.

use clap::Parser;
use morgue_cli::config::OutputFormat;
use morgue_cli::{execute_run, Cli, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    if let Err(e) = run(&cli).await {
        let formatter = Formatter::new(OutputFormat::Table, !cli.no_color);
        eprintln!("{}", formatter.error(&format!("Error: {}", e)));
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> morgue_cli::Result<()> {
    // Logs go to stderr so the report on stdout stays machine-readable
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    // Load config, then let flags win
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_overrides(cli);

    let formatter = Formatter::new(config.settings.format, config.settings.color);

    let report = execute_run(&cli.source, &cli.dest, &config).await?;
    println!("{}", formatter.format_report(&report)?);

    if config.scheduler.dry_run {
        eprintln!("{}", formatter.info("Dry run: nothing was written"));
    }

    Ok(())
}
