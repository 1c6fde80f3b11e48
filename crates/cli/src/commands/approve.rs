//! Approve command - publish a held item

use anyhow::{Context, Result};
use std::path::PathBuf;
use uuid::Uuid;

use crate::args::ApproveArgs;
use crate::commands::run::build_pipeline;
use crate::config::AppConfig;

pub async fn execute(args: ApproveArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let item_id = Uuid::parse_str(&args.item_id)
        .with_context(|| format!("Invalid item ID: {}", args.item_id))?;

    // No sources needed; approval only publishes an already-ingested item
    let parts = build_pipeline(&config, args.dry_run, Vec::new()).await?;

    let outcome = parts
        .pipeline
        .approve_and_publish(item_id)
        .await
        .map_err(|e| anyhow::anyhow!("Approval failed: {}", e))?;

    match outcome {
        newsflow_domain::ItemOutcome::Processed {
            posts_attempted, ..
        } => {
            tracing::info!(item_id = %item_id, posts_attempted, "Item approved and published");
            println!(
                "Approved {} ({} social posts attempted)",
                item_id, posts_attempted
            );
        }
        newsflow_domain::ItemOutcome::Skipped { reason } => {
            println!("Not published: {}", reason);
        }
        newsflow_domain::ItemOutcome::Failed { error } => {
            anyhow::bail!("Approval failed: {}", error);
        }
    }

    Ok(())
}
