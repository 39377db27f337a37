use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use notecrawl::app::AppContext;
use notecrawl::cli::{commands, Cli, Commands};
use notecrawl::config::Config;
use notecrawl::engine::TerminalStatus;

/// Where log output goes
enum LogTarget<'a> {
    Stdout,
    Stderr,
    File(&'a Path),
}

fn init_tracing(target: LogTarget<'_>) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let registry = tracing_subscriber::registry().with(filter);

    match target {
        LogTarget::Stdout => registry.with(fmt::layer()).init(),
        // stdout carries control messages
        LogTarget::Stderr => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            registry
                .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_config_path()?,
    };

    match cli.command {
        Commands::Run(args) => {
            init_tracing(match args.log.as_deref() {
                Some(path) => LogTarget::File(path),
                None => LogTarget::Stdout,
            })?;

            let mut config = Config::load_from(&config_path)?;
            commands::apply_run_args(&mut config, &args);
            let url = commands::resolve_url(args.url.as_deref(), &config)?;
            let ctx = AppContext::new(config)?;

            let report = commands::run(&ctx, &url).await?;
            if report.status == TerminalStatus::Error {
                std::process::exit(1);
            }
        }
        Commands::Serve { url, headed } => {
            init_tracing(LogTarget::Stderr)?;

            let mut config = Config::load_from(&config_path)?;
            if headed {
                config.browser.headless = false;
            }
            let url = commands::resolve_url(url.as_deref(), &config)?;
            let ctx = AppContext::new(config)?;

            commands::serve(&ctx, &url).await?;
        }
        Commands::Config { init } => {
            commands::show_config(&config_path, init)?;
        }
    }

    Ok(())
}
