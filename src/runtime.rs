//! Runtime services and shared state for the pomodoro-bot.

use tokio_util::sync::CancellationToken;

use crate::{
    interaction::dispatcher::Dispatcher,
    prelude::*,
    service::chat::ChatClient,
    timer::TimerStore,
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the chat client, the timer store, and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The chat client instance.
    pub chat: ChatClient,
    /// The store of running timers.
    pub store: TimerStore,
}

impl Runtime {
    /// Create a new runtime instance backed by Telegram.
    #[instrument(skip_all)]
    pub fn new(config: Config) -> Res<Self> {
        let chat = ChatClient::telegram(&config)?;

        Ok(Self::with_chat(config, chat))
    }

    /// Create a new runtime instance on top of an existing chat client.
    pub fn with_chat(config: Config, chat: ChatClient) -> Self {
        let store = TimerStore::new(chat.clone());

        Self { config, chat, store }
    }

    /// Runs the bot until Ctrl-C, or until fetching fails too many times in a row.
    pub async fn start(&self) -> Void {
        self.run_until(async {
            let signal = tokio::signal::ctrl_c().await;
            info!("Shutdown requested.");
            signal.map_err(anyhow::Error::from)
        })
        .await
    }

    /// Runs the bot until `signal` resolves, or until fetching fails too many times in a row.
    ///
    /// Either way, the sweeper is stopped and every running timer is cancelled before returning.
    pub async fn run_until(&self, signal: impl Future<Output = Void>) -> Void {
        let shutdown = CancellationToken::new();

        let sweeper = if self.config.sweep_period.is_zero() {
            warn!("Finished-timer sweeping is disabled.");
            None
        } else {
            Some(self.store.spawn_sweeper(self.config.sweep_period, shutdown.clone()))
        };

        let result = tokio::select! {
            result = self.poll(shutdown.clone()) => result,
            result = signal => result,
        };

        shutdown.cancel();
        self.store.unset_all().await;

        if let Some(sweeper) = sweeper {
            sweeper.await?;
        }

        info!("Service stopped.");

        result
    }

    /// The fetch/process loop.
    ///
    /// Returns an error once `fetch_failure_limit` consecutive fetches failed,
    /// and `Ok(())` once `shutdown` is cancelled.
    pub async fn poll(&self, shutdown: CancellationToken) -> Void {
        let mut dispatcher = Dispatcher::new(self.config.clone(), self.store.clone(), self.chat.clone());
        let mut failures = 0u32;

        info!("Service started.");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.config.updates_check_period) => {}
            }

            let events = match dispatcher.fetch(self.config.updates_process_limit).await {
                Ok(events) => {
                    failures = 0;
                    events
                }
                Err(err) => {
                    failures += 1;
                    error!("Fetch failed ({}/{}): {:#}", failures, self.config.fetch_failure_limit, err);

                    if failures >= self.config.fetch_failure_limit {
                        return Err(err.context(format!("{failures} consecutive fetches failed")));
                    }

                    continue;
                }
            };

            if events.is_empty() {
                continue;
            }

            dispatcher.process(events).await;

            debug!("{} timers in store.", self.store.len().await);
        }
    }
}
