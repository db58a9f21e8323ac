//! Gateway: the main event loop connecting the channel, the store, and the
//! assistant.
//!
//! Events are handled one at a time in arrival order. Background loops (digest,
//! nag, counter cleanup) run as separate tasks and are aborted on shutdown.

mod routing;
pub mod scheduler;


use crate::assistant::Assistant;
use std::sync::Arc;
use taskbot_core::{
    config::{ChatterConfig, Config, ReplyStyle, SchedulerConfig},
    traits::Channel,
};
use taskbot_memory::Store;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// The central gateway that routes chat events to commands and the assistant.
pub struct Gateway {
    pub(super) channel: Arc<dyn Channel>,
    pub(super) store: Store,
    pub(super) assistant: Arc<Assistant>,
    pub(super) reply_style: ReplyStyle,
    pub(super) chatter_config: ChatterConfig,
    pub(super) scheduler_config: SchedulerConfig,
}

impl Gateway {
    /// Create a new gateway.
    pub fn new(
        channel: Arc<dyn Channel>,
        store: Store,
        assistant: Arc<Assistant>,
        config: &Config,
    ) -> Self {
        Self {
            channel,
            store,
            assistant,
            reply_style: config.provider.reply_style,
            chatter_config: config.chatter.clone(),
            scheduler_config: config.scheduler.clone(),
        }
    }

    /// Run the main event loop until a shutdown signal or channel close.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        info!(
            "taskbot gateway running | channel: {} | analyzer: {} | nagger: {} | replies: {:?}",
            self.channel.name(),
            self.assistant.analyzer_name().unwrap_or("disabled"),
            self.assistant.nagger_name().unwrap_or("disabled"),
            self.reply_style,
        );

        let mut rx = self
            .channel
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start channel {}: {e}", self.channel.name()))?;

        let handles = self.spawn_background_loops()?;

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        // Main event loop with graceful shutdown.
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        warn!("channel {} closed its event stream", self.channel.name());
                        break;
                    }
                },
                _ = &mut shutdown => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown(&handles).await;
        Ok(())
    }

    /// Spawn the scheduler loops enabled in config.
    fn spawn_background_loops(&self) -> anyhow::Result<Vec<JoinHandle<()>>> {
        let mut handles = Vec::new();
        let sched = &self.scheduler_config;

        // Counters are pruned even with the scheduler off.
        {
            let store = self.store.clone();
            let every = sched.cleanup_interval_mins;
            handles.push(tokio::spawn(async move {
                scheduler::cleanup_loop(store, every).await;
            }));
        }

        if !sched.enabled {
            info!("scheduler disabled");
            return Ok(handles);
        }

        let offset = scheduler::local_offset(sched.utc_offset_minutes)?;
        let digest_schedule = scheduler::parse_cron(&sched.digest_cron)?;
        {
            let store = self.store.clone();
            let channel = self.channel.clone();
            let every_days = sched.digest_every_days;
            handles.push(tokio::spawn(async move {
                scheduler::digest_loop(store, channel, digest_schedule, offset, every_days).await;
            }));
        }

        if sched.nag_enabled {
            if self.assistant.has_nagger() {
                let window = scheduler::NagWindow::from_config(sched)?;
                let store = self.store.clone();
                let channel = self.channel.clone();
                let assistant = self.assistant.clone();
                handles.push(tokio::spawn(async move {
                    scheduler::nag_loop(store, channel, assistant, window, offset).await;
                }));
            } else {
                info!("nag enabled but no LLM provider configured, skipping");
            }
        }

        Ok(handles)
    }

    /// Graceful shutdown: abort background loops, stop the channel, close the pool.
    async fn shutdown(&self, handles: &[JoinHandle<()>]) {
        info!("Shutting down...");

        for h in handles {
            h.abort();
        }

        if let Err(e) = self.channel.stop().await {
            warn!("failed to stop channel {}: {e}", self.channel.name());
        }

        self.store.close().await;
        info!("Shutdown complete.");
    }
}

/// Resolve on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
