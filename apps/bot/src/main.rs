//! Coinwatch - Telegram crypto price alert bot.
//!
//! Wires the engine to its collaborators: the Telegram transport, the
//! CoinGecko price source, the JSON document stores and the
//! process-level housekeeping tasks (liveness endpoint, keep-alive
//! ping).

mod health;
mod keepalive;

use clap::Parser;
use coinwatch_core::{AccessRoot, AlertBook, SymbolMap};
use coinwatch_engine::{
    AccessControl, AlertService, AssetRegistry, JsonStore, PriceWatcher, WatcherConfig,
};
use coinwatch_feeds::{CoinGecko, PriceSource};
use coinwatch_telegram::{CoinwatchBot, TelegramNotifier};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tokio::sync::watch;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Coinwatch CLI
#[derive(Parser, Debug)]
#[command(name = "coinwatch-bot")]
#[command(about = "Telegram crypto price alert bot", long_about = None)]
struct Args {
    /// Directory holding the persisted JSON documents
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Price poll interval in seconds
    #[arg(long, default_value_t = 15)]
    poll_interval: u64,

    /// Delay before the first poll, in seconds
    #[arg(long, default_value_t = 5)]
    initial_delay: u64,

    /// Liveness endpoint port (0 disables it)
    #[arg(long, default_value_t = 10002)]
    health_port: u16,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

fn require_env(name: &str) -> String {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => value,
        _ => {
            error!("{name} must be set");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(&args.log_level);

    let token = require_env("TELOXIDE_TOKEN");
    let owner_id = require_env("OWNER_ID");
    let ping_url = std::env::var("PING_URL").ok().filter(|url| !url.is_empty());

    if let Err(e) = std::fs::create_dir_all(&args.data_dir) {
        error!(dir = %args.data_dir.display(), error = %e, "failed to create data directory");
        std::process::exit(1);
    }

    // One store per persisted document; each carries its fresh-install
    // default.
    let access_store = Arc::new(JsonStore::new(
        args.data_dir.join("access.json"),
        AccessRoot::new(owner_id.clone()),
    ));
    let alert_store = Arc::new(JsonStore::new(
        args.data_dir.join("alerts.json"),
        AlertBook::default(),
    ));
    let symbol_store = Arc::new(JsonStore::new(
        args.data_dir.join("symbols.json"),
        SymbolMap::seeded(),
    ));

    let source: Arc<dyn PriceSource> = match CoinGecko::new() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!(error = %e, "failed to build price source client");
            std::process::exit(1);
        }
    };

    let registry = Arc::new(
        AssetRegistry::open(symbol_store, access_store.clone(), source.clone()).await,
    );
    let access = Arc::new(AccessControl::new(access_store.clone(), registry.clone()));
    let alerts = Arc::new(AlertService::new(
        alert_store.clone(),
        access_store,
        registry.clone(),
    ));

    let bot = Bot::new(token);
    let watcher = Arc::new(PriceWatcher::new(
        alert_store,
        source.clone(),
        Arc::new(TelegramNotifier::new(bot.clone())),
        WatcherConfig {
            initial_delay: Duration::from_secs(args.initial_delay),
            poll_interval: Duration::from_secs(args.poll_interval),
        },
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(watcher.run(shutdown_rx.clone()));
    if args.health_port != 0 {
        tokio::spawn(health::serve(args.health_port));
    }
    if let Some(url) = ping_url {
        tokio::spawn(keepalive::run(url, shutdown_rx));
    }

    if let Ok(owner_chat) = owner_id.parse::<i64>() {
        if let Err(e) = bot
            .send_message(ChatId(owner_chat), "🤖 Bot started successfully!")
            .await
        {
            warn!(error = %e, "owner startup notification failed");
        }
    }

    info!("coinwatch started");
    Arc::new(CoinwatchBot::new(bot, access, alerts, registry, source))
        .run()
        .await;

    // Dispatcher returned (ctrl-c): stop the background tasks.
    let _ = shutdown_tx.send(true);
    info!("coinwatch stopped");
}
