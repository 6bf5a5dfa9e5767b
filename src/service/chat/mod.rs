//! Chat service integration for pomodoro-bot.
//!
//! This module provides functionality for interacting with chat platforms:
//! - Polling for new inbound messages
//! - Sending text replies and timer notices
//!
//! It defines the `GenericChatClient` trait that can be implemented for different
//! chat services, with a default implementation for Telegram.

pub mod telegram;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{RawMessage, Res, Void};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This is the update source of the bot: it yields raw inbound messages and
/// accepts outbound text. Retrying failed requests is the implementation's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Get at most `limit` pending messages, starting at update id `offset`.
    ///
    /// Returns an empty list when nothing is pending.
    async fn get_updates(&self, offset: i64, limit: u32) -> Res<Vec<RawMessage>>;

    /// Send a text message to a chat.
    async fn send_message(&self, chat_id: i64, text: &str) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
