//! Hoopshot CLI
//!
//! Plays rounds against the local balance store. Without a host game surface or
//! relay the outcome comes from the local simulation.

use clap::{Parser, Subcommand};
use hoopshot::{
    config::generate_sample_config, games::balance::format_amount, ConfigLoader, GameClient,
    HostCapabilities, HoopshotConfig, HoopshotResult, UserId,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hoopshot")]
#[command(about = "Basketball wager mini-game client", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Balance database directory (overrides configuration)
    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the stored balance for a player
    Balance {
        #[arg(long)]
        user: String,
    },
    /// Play one or more rounds
    Play {
        #[arg(long)]
        user: String,

        /// Stake amount
        #[arg(long, conflicts_with = "preset")]
        stake: Option<String>,

        /// Use preset shortcut N (1-based) instead of --stake
        #[arg(long)]
        preset: Option<usize>,

        /// Number of rounds to play with the same stake
        #[arg(long, default_value = "1")]
        rounds: u32,
    },
    /// Write a sample configuration file
    Config {
        #[arg(long, default_value = "hoopshot.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;
    if let Some(dir) = args.data_dir {
        config.storage.data_directory = dir;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.monitoring.log_level.as_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match args.command {
        Command::Balance { user } => {
            let client = build_client(config)?;
            let engine = client.engine();
            let (_session, account) = engine.open_session(UserId::new(user));
            println!(
                "💰 Balance for {}: {} {}",
                account.user_id,
                format_amount(account.balance),
                client.config().game.currency
            );
        }
        Command::Play {
            user,
            stake,
            preset,
            rounds,
        } => {
            let client = build_client(config)?;
            let engine = client.engine();
            let (session, account) = engine.open_session(UserId::new(user));
            println!("💰 Starting balance: {}", format_amount(account.balance));

            let stake = match preset {
                Some(0) => {
                    eprintln!("❌ Presets are numbered from 1");
                    return Ok(());
                }
                Some(n) => match engine.preset_stake(n - 1) {
                    Ok(amount) => Some(amount.to_string()),
                    Err(e) => {
                        eprintln!("❌ {}", e);
                        return Ok(());
                    }
                },
                None => stake,
            };

            let display = client.display();
            let mut shots = display.subscribe_shot();
            let printer = tokio::spawn(async move {
                while shots.changed().await.is_ok() {
                    let label = shots.borrow_and_update().label();
                    if !label.is_empty() {
                        println!("🏀 {}", label);
                    }
                }
            });

            for round in 1..=rounds {
                match engine.play_round(&session, stake.as_deref()).await {
                    Ok(result) => {
                        println!(
                            "🎯 Round {}: {} | balance {}",
                            round,
                            display.result().message(),
                            format_amount(result.new_balance)
                        );
                    }
                    Err(e) if e.is_user_facing() => {
                        eprintln!("❌ {}", e);
                        break;
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            if client.config().monitoring.enable_metrics {
                let stats = engine.metrics().snapshot();
                println!(
                    "📊 Rounds: {} won, {} lost, {} rejected",
                    stats.won, stats.lost, stats.rejected
                );
            }

            printer.abort();
            // Let the detached settlement report run before the runtime shuts down
            tokio::task::yield_now().await;
        }
        Command::Config { output } => {
            generate_sample_config(&output)?;
            println!("📝 Sample configuration written to {}", output.display());
        }
    }

    Ok(())
}

fn build_client(config: HoopshotConfig) -> HoopshotResult<GameClient> {
    GameClient::builder(config).host(HostCapabilities::none()).build()
}
