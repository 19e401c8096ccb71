//! Telegram transport for the coinwatch engine.
//!
//! This crate owns everything Telegram-shaped: command parsing, reply
//! rendering and outbound notification delivery. The engine below it
//! never sees a chat update, only `(caller id, args)` calls and typed
//! outcomes.

pub mod bot;
pub mod notifier;
pub mod render;

pub use bot::{Command, CoinwatchBot, TelegramError};
pub use notifier::TelegramNotifier;
