//! Dubwatch - Playlist watcher with automatic voice-over translation
//!
//! This is the main entry point: it checks the external tools, bootstraps
//! the private state directory on first run and then drives the scan cycle
//! until interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dubwatch::cli::{Args, Commands};
use dubwatch::config::Config;
use dubwatch::pipeline::ItemPipeline;
use dubwatch::process::{check_dependencies, SystemRunner};
use dubwatch::report::TracingReporter;
use dubwatch::scheduler::CycleScheduler;
use dubwatch::setup::SetupManager;
use dubwatch::state::{load_sources, Ledger, StatePaths};
use dubwatch::tools::{required_tools, Toolchain};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(state_dir) = &args.state_dir {
        config.state.dir = state_dir.clone();
    }

    // Setup logging to both console and file
    let _log_guard = setup_logging(args.verbose, &config.state.log_dir())?;

    info!("Starting Dubwatch - playlist watcher with voice-over translation");

    let result = match args.command.unwrap_or_default() {
        Commands::Run { once, no_interactive } => run_service(&config, once, no_interactive).await,
        Commands::Setup => run_setup(&config).await,
        Commands::Check => run_check(&config),
        Commands::Scan { locator, json } => run_scan(&config, &locator, json).await,
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

async fn run_service(config: &Config, once: bool, no_interactive: bool) -> Result<()> {
    check_dependencies(&required_tools(config)).context("Dependencies check failed")?;

    let tools = Toolchain::from_config(config, Arc::new(SystemRunner::new()));
    let paths = StatePaths::from(&config.state);
    let setup = SetupManager::new(&config.state.templates_dir, paths.clone());

    let created = setup
        .ensure_state_files()
        .await
        .context("Critical error creating state files")?;
    if created {
        info!("First run: configuration files created in {}", paths.dir.display());

        if no_interactive || !std::io::stdin().is_terminal() {
            info!(
                "Add your playlists to {} and start the service again",
                paths.sources.display()
            );
            return Ok(());
        }

        let start = setup
            .interactive(std::io::stdin().lock(), std::io::stdout(), tools.scanner.as_ref())
            .await
            .context("Interactive setup failed")?;
        if !start {
            info!("Setup complete. You can start the service later.");
            return Ok(());
        }
        info!("Setup complete. Starting service...");
    }

    // Corrupt state is fatal at startup; later cycles only log it
    let sources = load_sources(&paths.sources).await?;
    let ledger = Ledger::load(&paths.ledger).await?;
    info!(
        "Watching {} playlist(s), {} video(s) already processed",
        sources.len(),
        ledger.ids().len()
    );

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    let scheduler = CycleScheduler::new(
        paths,
        tools.scanner.clone(),
        Arc::new(ItemPipeline::from_toolchain(&tools, config)),
        Arc::new(TracingReporter),
        config.schedule.interval(),
        cancel,
    );

    if once {
        scheduler.run_once().await?;
    } else {
        info!("Service started, interval {}s", config.schedule.interval_secs);
        scheduler.run().await;
    }

    Ok(())
}

async fn run_setup(config: &Config) -> Result<()> {
    let tools = Toolchain::from_config(config, Arc::new(SystemRunner::new()));
    let setup = SetupManager::new(&config.state.templates_dir, StatePaths::from(&config.state));

    setup.ensure_state_files().await?;
    let start = setup
        .interactive(std::io::stdin().lock(), std::io::stdout(), tools.scanner.as_ref())
        .await
        .context("Interactive setup failed")?;

    if start {
        run_service(config, false, true).await
    } else {
        info!("Setup complete. You can start the service later.");
        Ok(())
    }
}

fn run_check(config: &Config) -> Result<()> {
    let resolved = check_dependencies(&required_tools(config))?;

    println!("\nExternal tools:");
    println!("{:<12} {:<15} {}", "Tool", "Binary", "Path");
    println!("{}", "-".repeat(60));
    for (dependency, path) in resolved {
        println!("{:<12} {:<15} {}", dependency.tool, dependency.binary, path.display());
    }
    Ok(())
}

async fn run_scan(config: &Config, locator: &str, json: bool) -> Result<()> {
    let tools = Toolchain::from_config(config, Arc::new(SystemRunner::new()));
    let paths = StatePaths::from(&config.state);

    let items = tools.scanner.scan(locator).await?;
    let ledger = match Ledger::load(&paths.ledger).await {
        Ok(ledger) => ledger,
        Err(e) => {
            warn!("Could not load ledger, listing all videos as new: {}", e);
            Ledger::empty(&paths.ledger)
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    println!("\n{:<14} {:<5} {}", "Id", "Done", "Title");
    println!("{}", "-".repeat(80));
    for item in &items {
        let done = if ledger.contains(&item.id) { "yes" } else { "no" };
        println!("{:<14} {:<5} {}", item.id, done, item.title);
    }
    println!("\n{} video(s)", items.len());
    Ok(())
}

/// Cancel `token` on Ctrl-C or SIGTERM
fn spawn_shutdown_listener(token: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, finishing current work...");
        token.cancel();
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn setup_logging(verbose: bool, log_dir: &Path) -> Result<WorkerGuard> {
    // Create log directory
    std::fs::create_dir_all(log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(log_dir, "dubwatch.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Create console layer
    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    // Initialize the subscriber
    subscriber
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(guard)
}
