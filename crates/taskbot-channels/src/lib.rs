//! # taskbot-channels
//!
//! Chat platform integrations for taskbot.

pub mod telegram;
pub mod utils;

pub use telegram::TelegramChannel;
