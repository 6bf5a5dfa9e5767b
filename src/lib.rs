//! Library root for `pomodoro-bot`.
//!
//! Pomodoro-bot is a Telegram bot that runs countdown timers for its users:
//! - `/set [mins [notice]]` starts a timer that rings the chat when it elapses
//! - `/unset [mins | all]` cancels timers
//! - `/start` and `/help` describe the commands
//!
//! The bot polls Telegram for new messages, classifies each one into an event,
//! and executes every event of a batch concurrently against a shared timer store.
//! The chat transport sits behind a trait, so other platforms (and test doubles)
//! can be plugged in.

pub mod base;
pub mod interaction;
pub mod prelude;
pub mod runtime;
pub mod service;
pub mod timer;

use base::{config::Config, types::Void};
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the pomodoro-bot runtime:
/// - Creates the runtime context with the chat client and the timer store
/// - Starts the main polling loop for processing messages
pub async fn start(config: Config) -> Void {
    info!("Starting pomodoro-bot ...");

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config)?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
