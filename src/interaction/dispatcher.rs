//! The fetch/process cycle: polls the chat for commands and runs them concurrently.

use futures::future::join_all;
use tracing::Instrument;

use crate::{
    base::replies,
    prelude::*,
    service::chat::ChatClient,
    timer::TimerStore,
};

use super::event::{Event, EventKind};

/// Turns inbound messages into events and executes them.
///
/// Tracks the update offset, so each message is fetched once.
pub struct Dispatcher {
    config: Config,
    store: TimerStore,
    chat: ChatClient,
    offset: i64,
}

impl Dispatcher {
    pub fn new(config: Config, store: TimerStore, chat: ChatClient) -> Self {
        Self { config, store, chat, offset: 0 }
    }

    /// The update id the next fetch starts at.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Fetches at most `limit` pending messages and classifies them.
    ///
    /// Returns an empty list when nothing is pending. Updates without a message
    /// advance the offset but produce no event.
    #[instrument(skip(self))]
    pub async fn fetch(&mut self, limit: u32) -> Res<Vec<Event>> {
        let messages = self.chat.get_updates(self.offset, limit).await.context("Could not get events")?;

        debug!("Fetched {} updates at offset {}.", messages.len(), self.offset);

        if let Some(last) = messages.iter().map(|m| m.id).max() {
            self.offset = self.offset.max(last + 1);
        }

        let events = messages
            .into_iter()
            .filter_map(|message| match message.chat_id {
                Some(chat_id) => Some(Event::new(chat_id, &message.text)),
                None => {
                    debug!("Skipping update {} without a message.", message.id);
                    None
                }
            })
            .collect();

        Ok(events)
    }

    /// Executes every event concurrently, and returns once all of them are done.
    ///
    /// Failures are contained to the event that caused them.
    #[instrument(skip_all, fields(events = events.len()))]
    pub async fn process(&self, events: Vec<Event>) {
        let handles = events
            .into_iter()
            .map(|event| handle_event(event, self.config.clone(), self.store.clone(), self.chat.clone()));

        for result in join_all(handles).await {
            if let Err(err) = result {
                error!("Event task failed: {}", err);
            }
        }
    }
}

/// Spawns the task that executes one event and replies to its chat.
#[instrument(skip_all)]
pub fn handle_event(event: Event, config: Config, store: TimerStore, chat: ChatClient) -> tokio::task::JoinHandle<()> {
    tokio::spawn(
        async move {
            // Process the event.
            let result = handle_event_internal(&event, &config, &store, &chat).await;

            // Log any errors.
            if let Err(err) = &result {
                error!("Error while handling {:?}: {:#}", event.kind, err);
            }
        }
        .in_current_span(),
    )
}

#[instrument(skip_all, fields(chat_id = event.chat_id))]
async fn handle_event_internal(event: &Event, config: &Config, store: &TimerStore, chat: &ChatClient) -> Void {
    let reply = execute(&event.kind, event.chat_id, config, store).await;

    chat.send_message(event.chat_id, &reply).await
}

/// Applies one event to the store, and returns the reply text.
pub async fn execute(kind: &EventKind, chat_id: i64, config: &Config, store: &TimerStore) -> String {
    match kind {
        EventKind::Start => replies::START_TEXT.to_string(),
        EventKind::Help => replies::HELP_TEXT.to_string(),
        EventKind::SetDefault => {
            store.set(chat_id, config.default_time_mins, config.default_notice.as_str()).await;
            replies::timer_set(config.default_time_mins, None)
        }
        EventKind::SetTime { minutes } => {
            store.set(chat_id, *minutes, config.default_notice.as_str()).await;
            replies::timer_set(*minutes, None)
        }
        EventKind::SetTimeAndNotice { minutes, notice } => {
            store.set(chat_id, *minutes, notice.as_str()).await;
            replies::timer_set(*minutes, Some(notice.as_str()))
        }
        EventKind::Unset => match store.unset_most_recent().await {
            Ok(minutes) => replies::timer_unset(minutes),
            Err(err) => replies::pretty_error(&err),
        },
        EventKind::UnsetByDuration { minutes } => match store.unset_by_duration(*minutes).await {
            Ok(()) => replies::timer_unset(*minutes),
            Err(err) => replies::pretty_error(&err),
        },
        EventKind::UnsetAll => {
            store.unset_all().await;
            replies::ALL_UNSET_TEXT.to_string()
        }
        EventKind::Unrecognized => replies::UNKNOWN_COMMAND_TEXT.to_string(),
    }
}

// Tests.
