//! Telegram adapters.

mod notifier;

pub use notifier::{TelegramNotifier, DEFAULT_API_BASE};
