use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use whalewatch::app::App;
use whalewatch::config::{Config, STREAM_KEY_ENV};
use whalewatch::error::Result;

/// Whalewatch - whale-flow and liquidation-storm alerts from live exchange
/// streams.
#[derive(Parser, Debug)]
#[command(name = "whalewatch")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the alert pipeline (foreground)
    Run(ConfigArgs),

    /// Validate the configuration file and credentials, then exit
    Check(ConfigArgs),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(&args.config).await,
        Commands::Check(args) => check(&args.config),
    }
}

async fn run(config_path: &Path) {
    let config = match Config::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    config.init_logging();
    info!("whalewatch starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut app_handle = tokio::spawn(App::run_with_shutdown(config, shutdown_rx));

    tokio::select! {
        result = &mut app_handle => {
            report_app_result(result);
            info!("whalewatch stopped");
            return;
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received (Ctrl+C)");
            let _ = shutdown_tx.send(true);
        }
    }

    report_app_result(app_handle.await);
    info!("whalewatch stopped");
}

fn report_app_result(result: std::result::Result<Result<()>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(error = %e, "Fatal error");
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "Application task failed");
            std::process::exit(1);
        }
    }
}

/// Validate configuration without starting the pipeline.
fn check(config_path: &Path) {
    println!("Checking configuration: {}", config_path.display());
    println!();

    let config = match Config::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("✗ Configuration invalid: {e}");
            std::process::exit(1);
        }
    };

    println!("✓ Configuration file is valid");
    println!();
    println!("Summary:");
    println!("  Feed: {}", config.stream.ws_url);
    println!("  Exchange: {}", config.stream.exchange);
    println!("  Trade symbols: {}", config.stream.trade_symbols.join(", "));
    println!("  Window: {}s", config.aggregator.window_secs);
    println!("  Detector tick: {}s", config.detectors.tick_secs);
    println!();

    if config.stream.stream_key.is_some() {
        println!("✓ Feed credential found (from {STREAM_KEY_ENV} env var)");
    } else {
        println!("⚠ No feed credential configured");
        println!("  Set {STREAM_KEY_ENV} if the feed requires one");
    }

    let telegram_token = std::env::var("TELEGRAM_BOT_TOKEN").ok();
    let telegram_chat = std::env::var("TELEGRAM_CHAT_ID").ok();

    if config.telegram.enabled {
        if telegram_token.is_some() && telegram_chat.is_some() {
            println!("✓ Telegram configured and enabled");
        } else {
            println!("⚠ Telegram enabled but missing environment variables:");
            if telegram_token.is_none() {
                println!("    - TELEGRAM_BOT_TOKEN");
            }
            if telegram_chat.is_none() {
                println!("    - TELEGRAM_CHAT_ID");
            }
        }
    } else {
        println!("  Telegram: disabled");
    }

    println!();
    println!("Configuration is ready to use.");
}
