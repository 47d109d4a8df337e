//! # StaffCast — staff workflow bot
//!
//! Composition root: loads config, builds the schedulers, the outbox, the
//! caches, and the dialog engine, then pumps inbound events until shutdown.
//!
//! Usage:
//!   staffcast                        # config from ~/.staffcast/config.toml
//!   staffcast --config ./bot.toml    # explicit config path
//!   staffcast --verbose              # debug logging

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use staffcast_cache::RosterCache;
use staffcast_core::StaffcastConfig;
use staffcast_dialog::runner;
use staffcast_dialog::{
    ActorStates, DialogCtx, DialogEngine, InMemoryMailings, NoopDirectory, NoopNotifications,
    NoopRefresh, SessionStore, default_registry,
};
use staffcast_scheduler::RequestScheduler;
use staffcast_telegram::{Outbox, Poller, TelegramApi};

#[derive(Parser)]
#[command(name = "staffcast", version, about = "Staff workflow bot")]
struct Cli {
    /// Path to the config file
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "staffcast=debug"
    } else {
        "staffcast=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => {
            let expanded = shellexpand::tilde(path).to_string();
            StaffcastConfig::load_from(std::path::Path::new(&expanded))?
        }
        None => StaffcastConfig::load()?,
    };
    if config.telegram.bot_token.is_empty() {
        anyhow::bail!("no bot token configured; set [telegram].bot_token");
    }

    // Startup connectivity check; failing here is fatal by design.
    let api = Arc::new(TelegramApi::new(config.telegram.bot_token.clone()));
    let me = api.get_me().await?;
    tracing::info!(
        "connected as @{} ({})",
        me.username.as_deref().unwrap_or("unknown"),
        me.first_name
    );

    // One scheduler per rate-limited concern: message sends and callback
    // answers each get their own serialized consumer.
    let sync_timeout = Duration::from_secs(config.scheduler.sync_timeout_secs);
    let messages = Arc::new(RequestScheduler::new(
        "telegram-messages",
        config.scheduler.msg_buffer_size,
        sync_timeout,
    ));
    let callbacks = Arc::new(RequestScheduler::new(
        "telegram-callbacks",
        config.scheduler.callback_buffer_size,
        sync_timeout,
    ));
    messages.start(Duration::from_millis(config.scheduler.msg_pause_ms))?;
    callbacks.start(Duration::from_millis(config.scheduler.callback_pause_ms))?;

    let outbox = Arc::new(Outbox::new(
        api.clone(),
        Arc::clone(&messages),
        Arc::clone(&callbacks),
        config.telegram.clone(),
    ));

    let ttl = Duration::from_secs(config.cache.ttl_hours * 3600);
    let sweep = Duration::from_secs(config.cache.sweep_minutes * 60);
    let sessions = SessionStore::new(ttl, sweep);
    let actor_states = ActorStates::new(ttl, sweep);
    sessions.cache().spawn_sweeper();
    actor_states.cache().spawn_sweeper();

    let roster = Arc::new(RosterCache::with_admins(config.dialog.admin_ids.clone()));

    let ctx = Arc::new(DialogCtx::new(
        outbox,
        sessions,
        actor_states,
        roster,
        Arc::new(InMemoryMailings::new()),
        Arc::new(NoopDirectory),
        Arc::new(NoopRefresh),
        Arc::new(NoopNotifications),
        config.telegram.clone(),
    ));
    let registry = Arc::new(default_registry());
    ctx.attach_registry(Arc::clone(&registry));

    let engine = DialogEngine::start(
        Arc::clone(&ctx),
        registry,
        config.dialog.workers,
        config.dialog.queue_depth,
    );

    runner::spawn_dispatch(Arc::clone(&ctx), config.mailing.clone());
    runner::spawn_expiry(Arc::clone(&ctx), config.mailing.clone());

    let mut events = Poller::new(Arc::clone(&api), config.telegram.poll_timeout).start();

    tracing::info!("StaffCast v{} is up", env!("CARGO_PKG_VERSION"));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
            event = events.recv() => match event {
                Some(event) => {
                    if let Err(e) = engine.dispatch(event).await {
                        tracing::error!("event dispatch failed: {e}");
                    }
                }
                None => {
                    tracing::warn!("update stream ended");
                    break;
                }
            }
        }
    }

    messages.stop();
    callbacks.stop();
    Ok(())
}
