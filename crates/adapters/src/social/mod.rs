//! Social platform publisher adapters

pub mod facebook;
pub mod graph;
pub mod instagram;
pub mod linkedin;
pub mod stub;
pub mod tiktok;

pub use facebook::FacebookPublisher;
pub use instagram::InstagramPublisher;
pub use linkedin::LinkedInPublisher;
pub use stub::StubPublisher;
pub use tiktok::TikTokPublisher;
