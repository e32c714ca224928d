use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use snitchloop::api::{HttpApiClient, MockApi, RestaurantLookup, SnitchPublisher};
use snitchloop::clock::{Clock, SystemClock};
use snitchloop::config::Config;
use snitchloop::controller::{LoopController, LoopDeps, LoopRunner, Outbound, report_channel, run_publisher};
use snitchloop::domain::LatLon;
use snitchloop::location::ReplaySource;
use snitchloop::notify::{log_notifications, notification_channel};
use snitchloop::scheduler::TokioScheduler;

mod cli;

use cli::Cli;
use cli::commands::Commands;

fn setup_logging(filter: &str) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("snitchloop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("snitchloop.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::new()
        .parse_filters(filter)
        .parse_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Run {
            fixes,
            offline,
            user_id,
        } => {
            let user_id = user_id.clone().unwrap_or_else(|| config.user_id.clone());
            let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
            runtime.block_on(handle_run_command(fixes, *offline, user_id, config))
        }
        Commands::Check { lat, lon } => {
            let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
            runtime.block_on(handle_check_command(LatLon { lat: *lat, lon: *lon }, config))
        }
        Commands::Config => handle_config_command(config),
    }
}

async fn handle_run_command(fixes: &Path, offline: bool, user_id: String, config: &Config) -> Result<()> {
    info!("Running loop from {} (offline: {})", fixes.display(), offline);
    if user_id.is_empty() {
        println!("{}", "Warning: no user_id configured, reports will be anonymous".yellow());
    }

    let source = Arc::new(ReplaySource::open(fixes).context("Failed to load replay file")?);

    let lookup: Arc<dyn RestaurantLookup>;
    let publisher: Arc<dyn SnitchPublisher>;
    if offline {
        let api = Arc::new(MockApi::new());
        lookup = api.clone();
        publisher = api;
    } else {
        let api = Arc::new(HttpApiClient::new(config.api.http()).context("Failed to create API client")?);
        lookup = api.clone();
        publisher = api;
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (scheduler, wakes) = TokioScheduler::new(clock.clone());
    let scheduler = Arc::new(scheduler);
    let (notify_tx, notify_rx) = notification_channel();
    let (report_tx, report_rx) = report_channel();

    let controller = Arc::new(LoopController::new(
        config.loop_.clone(),
        user_id,
        LoopDeps {
            source,
            lookup,
            scheduler: scheduler.clone(),
            clock,
            outbound: Outbound {
                notifications: notify_tx,
                reports: report_tx,
            },
        },
    ));

    let grace_secs = config.loop_.warning_interval_ms / 1000;
    let notifier = tokio::spawn(log_notifications(notify_rx, grace_secs));
    let publisher = tokio::spawn(run_publisher(report_rx, publisher));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = tokio::spawn(LoopRunner::new(controller.clone(), scheduler, wakes).run(shutdown_rx));

    println!("{}", "Loop running. Commands: cheat, status, quit".cyan());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) => match line.trim() {
                        "cheat" => {
                            controller.on_cancellation_requested();
                            println!("{}", "Cancellation recorded".green());
                        }
                        "status" => print_status(&controller)?,
                        "quit" => break,
                        "" => {}
                        other => println!("{} {}", "Unknown command:".red(), other),
                    },
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let _ = shutdown_tx.send(true);
    let wakes = runner.await.context("Loop task failed")?;
    // The controller owns the outbound senders; dropping it lets the workers drain and exit
    drop(controller);
    let shade = notifier.await.context("Notification task failed")?;
    let stats = publisher.await.context("Publisher task failed")?;

    println!(
        "{} {} wakes, {} published, {} failed, {} snitched notifications",
        "Stopped:".green(),
        wakes,
        stats.published,
        stats.failed,
        shade.snitched_count
    );
    Ok(())
}

fn print_status(controller: &LoopController) -> Result<()> {
    let status = controller.status();
    println!("{}", serde_json::to_string_pretty(&status).context("Failed to encode status")?);
    match controller
        .next_wake_deadline()
        .and_then(|ms| chrono::DateTime::from_timestamp_millis(ms as i64))
    {
        Some(deadline) => println!("{} {}", "Next wake:".green(), deadline.to_rfc3339()),
        None => println!("{}", "No wake armed".yellow()),
    }
    Ok(())
}

async fn handle_check_command(coords: LatLon, config: &Config) -> Result<()> {
    info!("Checking location {:?}", coords);
    let api = HttpApiClient::new(config.api.http()).context("Failed to create API client")?;
    match api.check_location(coords).await.context("Lookup failed")? {
        Some(restaurant) => {
            println!("{} {} ({})", "Match:".green(), restaurant.name, restaurant.id);
        }
        None => println!("{}", "No restaurant at this location".yellow()),
    }
    Ok(())
}

fn handle_config_command(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to encode config")?;
    print!("{}", yaml);
    Ok(())
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging with the configured filter
    setup_logging(config.log_filter()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).context("Application failed")?;

    Ok(())
}
