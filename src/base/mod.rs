//! Core components, types, and utilities for the pomodoro-bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - Reply texts sent back to users.
//! - Common types and result handling.

pub mod config;
pub mod replies;
pub mod types;
