//! Pipeline use cases

pub mod comments;
pub mod distribute;
pub mod image;
pub mod moderate;
pub mod pipeline;
pub mod publish;
pub mod rewrite;

pub use comments::{CommentSyncer, ReplyRequest};
pub use distribute::{DistributionConfig, Distributor, build_caption};
pub use image::{ImageOrchestrator, ImageOrchestratorConfig};
pub use moderate::{ModerationVerdict, PreModerationGate};
pub use pipeline::{ContentPipeline, PipelineConfig};
pub use publish::{PublicationScheduler, ScheduleOutcome};
pub use rewrite::RewriteEngine;
