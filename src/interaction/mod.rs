//! Command handling and user interactions for pomodoro-bot.
//!
//! This module provides functionality for handling inbound commands:
//! - Classifying raw message text into typed events
//! - Fetching pending messages and executing their events concurrently
//! - Replying to the chat each command came from

pub mod dispatcher;
pub mod event;
