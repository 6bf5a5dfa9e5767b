//! The shared collection of running timers.

use std::{collections::VecDeque, ops::Deref, sync::Arc, time::Duration};

use thiserror::Error;
use tokio::{sync::Mutex, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{prelude::*, service::chat::ChatClient};

use super::countdown::Timer;

/// Errors returned by unset operations.
///
/// These are user-facing outcomes, not faults.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("no timers to unset")]
    NoTimers,
    #[error("no such timer")]
    NoSuchTimer,
}

/// Concurrency-safe store of timers, in insertion order.
///
/// Every operation holds the store's lock for its whole duration, so the
/// sequence is never observed half-mutated. It is designed to be trivially
/// cloneable, allowing it to be passed around without the need for `Arc`.
#[derive(Clone)]
pub struct TimerStore {
    inner: Arc<TimerStoreInner>,
}

impl Deref for TimerStore {
    type Target = TimerStoreInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Inner implementation of the timer store.
pub struct TimerStoreInner {
    chat: ChatClient,
    timers: Mutex<VecDeque<Timer>>,
}

impl TimerStore {
    /// Creates an empty store whose timers ring through `chat`.
    pub fn new(chat: ChatClient) -> Self {
        Self {
            inner: Arc::new(TimerStoreInner {
                chat,
                timers: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Starts a new timer and appends it to the sequence.
    #[instrument(skip(self, notice))]
    pub async fn set(&self, chat_id: i64, minutes: u32, notice: impl Into<String>) {
        let timer = Timer::start(self.chat.clone(), chat_id, minutes, notice);

        let mut timers = self.timers.lock().await;
        timers.push_back(timer);

        debug!("Timer set, {} in store.", timers.len());
    }

    /// Cancels and removes the most recently set timer, returning its duration.
    #[instrument(skip(self))]
    pub async fn unset_most_recent(&self) -> Result<u32, StoreError> {
        let mut timers = self.timers.lock().await;

        let timer = timers.pop_back().ok_or(StoreError::NoTimers)?;
        timer.cancel();

        Ok(timer.minutes())
    }

    /// Cancels and removes the oldest timer with the given duration.
    #[instrument(skip(self))]
    pub async fn unset_by_duration(&self, minutes: u32) -> Result<(), StoreError> {
        let mut timers = self.timers.lock().await;

        if timers.is_empty() {
            return Err(StoreError::NoTimers);
        }

        let index = timers.iter().position(|t| t.minutes() == minutes).ok_or(StoreError::NoSuchTimer)?;

        if let Some(timer) = timers.remove(index) {
            timer.cancel();
        }

        Ok(())
    }

    /// Cancels every timer and empties the store.
    #[instrument(skip(self))]
    pub async fn unset_all(&self) {
        let mut timers = self.timers.lock().await;

        for timer in timers.drain(..) {
            timer.cancel();
        }
    }

    /// Removes finished timers, returning how many were removed.
    ///
    /// Finished timers are already inert, so nothing is cancelled.
    pub async fn sweep_finished(&self) -> usize {
        let mut timers = self.timers.lock().await;

        let before = timers.len();
        timers.retain(|t| !t.is_finished());

        before - timers.len()
    }

    /// Spawns a task that sweeps finished timers every `period`, until `shutdown` is cancelled.
    ///
    /// `period` must be non-zero.
    pub fn spawn_sweeper(&self, period: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        let store = self.clone();

        tokio::spawn(async move {
            info!("Finished-timer sweeper started (every {:?}).", period);

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // Skip the first immediate tick.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = store.sweep_finished().await;
                        debug!("Swept {} finished timers.", removed);
                    }
                }
            }

            info!("Finished-timer sweeper stopped.");
        })
    }

    pub async fn len(&self) -> usize {
        self.timers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.timers.lock().await.is_empty()
    }

    /// Snapshot of the stored timers, oldest first.
    pub async fn timers(&self) -> Vec<Timer> {
        self.timers.lock().await.iter().cloned().collect()
    }
}

// Tests.
