//! Watchdog CLI - replay observation streams through the judgment pipeline

use clap::Parser;
use watchdog_core::{Observation, Watchdog, WatchdogConfig};

#[derive(Parser)]
#[command(name = "watchdog")]
#[command(about = "Watchdog - autonomous judgment over behavioral observation streams")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Replay a JSONL observation stream through the pipeline
    Replay {
        /// Path to the stream (one observation object per line)
        file: String,
        /// Persist thresholds and judgments to the state database
        #[arg(long)]
        persist: bool,
    },
    /// Check configuration validity
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "config/watchdog.json")]
        config: String,
    },
    /// Show the pipeline defaults
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt::init();

    match cli.command {
        Some(Commands::Replay { file, persist }) => replay(&file, persist).await?,
        Some(Commands::Check { config }) => check(&config)?,
        Some(Commands::Status) => status(),
        None => {
            println!("Watchdog v0.1.0 - Use --help for commands");
        }
    }

    Ok(())
}

async fn replay(path: &str, persist: bool) -> anyhow::Result<()> {
    let mut config = WatchdogConfig::default();
    config.store.persist = persist;
    let mut watchdog = Watchdog::new(config)?;

    let content = std::fs::read_to_string(path)?;
    let mut seen = 0usize;
    let mut emitted = 0usize;

    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let observation: Observation = serde_json::from_str(line)?;
        seen += 1;
        if let Some(judgment) = watchdog.observe(observation).await? {
            emitted += 1;
            println!(
                "{} [{}] {} — {} (confidence {:.3}, {})",
                judgment.verdict,
                judgment.trigger,
                judgment.subject,
                judgment.reason,
                judgment.confidence,
                judgment.band,
            );
        }
    }

    println!("{} observations replayed, {} judgments emitted", seen, emitted);
    Ok(())
}

fn check(path: &str) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)?;
    let _: WatchdogConfig = serde_json::from_str(&content)?;
    println!("Config OK: {}", path);
    Ok(())
}

fn status() {
    let config = WatchdogConfig::default();
    println!("Watchdog defaults:");
    println!("  cooldown: {}s", config.trigger.cooldown_secs);
    println!("  window: {}s", config.trigger.window_secs);
    println!("  consensus threshold: {:.3}", config.consensus.threshold);
    println!("  strategy: {:?}", config.strategy.mode);
}
