mod assistant;
mod commands;
mod format;
mod gateway;

use assistant::Assistant;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use taskbot_channels::TelegramChannel;
use taskbot_core::config::{self, BotConfig, Config, Prompts};
use taskbot_memory::Store;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "taskbot",
    version,
    about = "Telegram task list bot with daily digests and sarcastic reminders"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot: poll Telegram and run the schedulers.
    Start,
    /// Show configuration, provider availability and database stats.
    Status,
    /// Send the task digest to every chat once, then exit.
    Digest,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load(&cli.config)?;
    let _log_guard = init_tracing(&cfg.bot)?;
    cfg.apply_env_overrides();

    match cli.command {
        Commands::Start => start(cfg).await?,
        Commands::Status => status(&cli.config, &cfg).await?,
        Commands::Digest => {
            cfg.validate()?;
            let store = Store::new(&cfg.memory).await?;
            let channel = TelegramChannel::new(cfg.channel.telegram.clone());
            let sent = gateway::scheduler::send_digest(&store, &channel, Utc::now()).await?;
            store.close().await;
            println!("Digest sent to {sent} chat(s).");
        }
    }

    Ok(())
}

/// Stderr logging filtered by `RUST_LOG` or `bot.log_level`, plus a daily
/// rolling file when `bot.log_dir` is set. Keep the guard alive until exit.
fn init_tracing(bot: &BotConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&bot.log_level));

    let (file_layer, guard) = match &bot.log_dir {
        Some(dir) => {
            let dir = config::shellexpand(dir);
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::daily(&dir, format!("{}.log", bot.name));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn start(cfg: Config) -> anyhow::Result<()> {
    cfg.validate()?;

    config::install_bundled_prompts(&cfg.bot.data_dir);
    let prompts = Prompts::load(&cfg.bot.data_dir);

    let store = Store::new(&cfg.memory).await?;
    let channel = Arc::new(TelegramChannel::new(cfg.channel.telegram.clone()));
    let assistant = Arc::new(Assistant::from_config(&cfg.provider, prompts));

    info!("starting {}", cfg.bot.name);
    let gw = Arc::new(gateway::Gateway::new(channel, store, assistant, &cfg));
    gw.run().await
}

async fn status(config_path: &str, cfg: &Config) -> anyhow::Result<()> {
    println!("taskbot status\n");
    println!("Config: {config_path}");
    println!(
        "Telegram token: {}",
        if cfg.channel.telegram.bot_token.trim().is_empty() {
            "missing"
        } else {
            "configured"
        }
    );
    if let Err(e) = cfg.validate() {
        println!("Config problem: {e}");
    }
    println!();

    let assistant = Assistant::from_config(&cfg.provider, Prompts::default());
    for (role, provider) in [
        ("analyzer", assistant.analyzer()),
        ("nagger", assistant.nagger()),
    ] {
        match provider {
            Some(p) => {
                let reachable = if p.is_available().await {
                    "reachable"
                } else {
                    "unreachable"
                };
                println!("  {role}: {} ({reachable})", p.name());
            }
            None => println!("  {role}: disabled (no API key)"),
        }
    }
    println!();

    let store = Store::new(&cfg.memory).await?;
    let chats = store.get_all_chats_with_tasks().await?;
    println!("Database: {}", config::shellexpand(&cfg.memory.db_path));
    println!("  size: {} bytes", store.db_size().await?);
    println!("  chats with tasks: {}", chats.len());
    store.close().await;

    let sched = &cfg.scheduler;
    println!();
    println!(
        "Scheduler: {}",
        if sched.enabled { "enabled" } else { "disabled" }
    );
    println!("  digest: '{}' every {} day(s)", sched.digest_cron, sched.digest_every_days);
    println!(
        "  nag: {} ({}-{})",
        if sched.nag_enabled { "on" } else { "off" },
        sched.nag_window_start,
        sched.nag_window_end
    );
    Ok(())
}
