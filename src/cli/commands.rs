use std::path::Path;
use std::sync::Arc;

use tokio::io::BufReader;
use tracing::{info, warn};

use crate::app::{AppContext, CrawlError, Result};
use crate::browser::{ChromeBrowser, ChromeSource, ChromeTab};
use crate::cli::RunArgs;
use crate::config::Config;
use crate::control::{self, ControlServer};
use crate::engine::{RunReport, TerminalStatus};
use crate::sink::DeliveryTarget;

/// Fold command-line flags into the loaded config
pub fn apply_run_args(config: &mut Config, args: &RunArgs) {
    if let Some(mode) = args.mode {
        config.run.mode = mode;
    }
    if let Some(limit) = args.limit {
        config.run.total_limit = limit;
    }
    if let Some(batch_size) = args.batch_size {
        config.run.batch_size = batch_size;
    }
    if let Some(ref dir) = args.output {
        config.delivery.target = DeliveryTarget::File;
        config.delivery.output_dir = Some(dir.clone());
    }
    if let Some(ref endpoint) = args.endpoint {
        config.delivery.target = DeliveryTarget::Http;
        config.delivery.endpoint = Some(endpoint.clone());
    }
    if args.download_media {
        config.delivery.download_media = true;
    }
    if args.headed {
        config.browser.headless = false;
    }
}

/// URL from the command line, else the configured start page
pub fn resolve_url(url: Option<&str>, config: &Config) -> Result<String> {
    let url = url
        .or(config.browser.start_url.as_deref())
        .ok_or_else(|| CrawlError::Config("No page given: pass --url or set browser.start_url".to_string()))?;
    url::Url::parse(url)?;
    Ok(url.to_string())
}

pub async fn run(ctx: &AppContext, url: &str) -> Result<RunReport> {
    let run = ctx.config.run.run_configuration();
    run.validate()?;

    let browser = ChromeBrowser::launch(ctx.config.browser.clone()).await?;
    let page = browser.open_page(url).await?;
    let source = Arc::new(ChromeSource::new(
        page,
        ctx.config.selectors.clone(),
        run.mode.into(),
        ctx.pacer.clone(),
        ctx.config.browser.clone(),
    ));

    println!(
        "Collecting {} (mode: {}, delivering to {})",
        url,
        run.mode,
        ctx.sink.name()
    );

    // start() clears the stop flag, so listen for Ctrl-C only afterwards
    let handle = ctx.controller.start(run, source, ctx.sink.clone())?;

    let stop = ctx.controller.stop_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping after the current item");
            stop.stop();
        }
    });

    let report = handle.wait().await;
    interrupt.abort();

    if let Err(e) = browser.close().await {
        warn!("{}", e);
    }

    print_report(&report);
    Ok(report)
}

fn print_report(report: &RunReport) {
    if let Some(ref profile) = report.profile {
        println!("Profile: {} ({})", profile.display_name(), profile.unique_id);
    }

    for item in &report.items {
        println!(
            "  {} ({} comments, {} images)",
            item.display_title(),
            item.detail.comment_count(),
            item.detail.images.len()
        );
    }

    let outcome = match report.status {
        TerminalStatus::Complete => "complete",
        TerminalStatus::Stopped => "stopped",
        TerminalStatus::Error => "failed",
    };
    println!(
        "Run {}: {} items, {} of {} batches delivered",
        outcome,
        report.items.len(),
        report.delivery.delivered,
        report.delivery.dispatched
    );
    if report.delivery.media_saved + report.delivery.media_failed > 0 {
        println!(
            "Images: {} saved, {} failed",
            report.delivery.media_saved, report.delivery.media_failed
        );
    }
    if !report.delivery.failed_batches.is_empty() {
        eprintln!("Batches not delivered: {:?}", report.delivery.failed_batches);
    }
    if let Some(ref message) = report.message {
        eprintln!("  {}", message);
    }
}

pub async fn serve(ctx: &AppContext, url: &str) -> Result<()> {
    let browser = ChromeBrowser::launch(ctx.config.browser.clone()).await?;
    let page = browser.open_page(url).await?;
    let tab = ChromeTab::new(
        page,
        ctx.config.selectors.clone(),
        ctx.pacer.clone(),
        ctx.config.browser.clone(),
    );

    let (server, events) = ControlServer::new(ctx.controller.clone(), Arc::new(tab), ctx.sink.clone());
    let server = server.with_default_batch_size(ctx.config.run.batch_size);
    info!("Listening for control messages on stdin");

    let served = control::serve(
        server,
        events,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await;

    if let Err(e) = browser.close().await {
        warn!("{}", e);
    }
    served
}

pub fn show_config(path: &Path, init: bool) -> Result<()> {
    if init {
        if path.exists() {
            println!("Config already exists: {}", path.display());
        } else {
            Config::create_default_config(path)?;
            println!("Wrote default config to {}", path.display());
        }
        return Ok(());
    }

    let config = Config::load_from(path)?;
    let content = toml::to_string_pretty(&config)
        .map_err(|e| CrawlError::Config(format!("Failed to render config: {}", e)))?;
    println!("# {}\n{}", path.display(), content);
    Ok(())
}
