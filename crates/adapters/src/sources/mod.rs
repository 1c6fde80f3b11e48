//! Ingestion source adapters

pub mod rss;
pub mod telegram;

pub use rss::RssSource;
pub use telegram::TelegramSource;
