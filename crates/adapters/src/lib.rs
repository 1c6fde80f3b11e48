//! newsflow adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `sources`: RSS and Telegram channel ingestion
//! - `llm`: OpenAI chat/vision adapters and the offline stub
//! - `images`: Image generation adapter
//! - `social`: Social platform publishers (Meta Graph, LinkedIn, TikTok)
//! - `bot_channel`: Telegram bot moderation channel
//! - `storage`: Public object storage for media re-hosting
//! - `state`: SQLite and in-memory content/policy stores

mod bot_channel;
mod images;
mod state_memory;
mod state_sqlite;
mod storage;

pub mod llm;
pub mod social;
pub mod sources;

/// Re-exports for state adapters
pub mod state {
    pub use crate::state_memory::InMemoryStore;
    pub use crate::state_sqlite::SqliteStore;
}

/// Re-exports for the moderation channel adapter
pub mod channel {
    pub use crate::bot_channel::{NullChannel, TelegramChannel};
}

/// Re-exports for media adapters
pub mod media {
    pub use crate::images::{ImageConfig, OpenAiImageRenderer, StubRenderer};
    pub use crate::storage::{BucketStore, PassthroughStore};
}
