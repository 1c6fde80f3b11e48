//! Ingest command - one-shot ingestion cycle

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use newsflow_domain::{ItemSource, RawItem, SourceError};
use std::path::PathBuf;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::args::IngestArgs;
use crate::commands::run::{build_pipeline, build_sources, log_outcomes};
use crate::config::AppConfig;

pub async fn execute(args: IngestArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let from = parse_timestamp(args.from.as_deref(), "--from")?;
    let to = parse_timestamp(args.to.as_deref(), "--to")?;

    let mut sources = build_sources(&config)?;

    if let Some(wanted) = &args.source {
        sources.retain(|s| s.source_id() == wanted);
        if sources.is_empty() {
            bail!("No configured source with ID: {}", wanted);
        }
    }

    if sources.is_empty() {
        bail!("No ingestion sources configured");
    }

    if from.is_some() || to.is_some() {
        sources = sources
            .into_iter()
            .map(|inner| Box::new(TimeWindowSource { inner, from, to }) as Box<dyn ItemSource>)
            .collect();
    }

    tracing::info!(
        sources = sources.len(),
        from = ?args.from,
        to = ?args.to,
        dry_run = args.dry_run,
        "Running one-shot ingestion"
    );

    let parts = build_pipeline(&config, args.dry_run, sources).await?;
    let outcomes = parts.pipeline.ingest_once().await;
    log_outcomes(&outcomes);

    tracing::info!(items = outcomes.len(), "Ingestion complete");
    Ok(())
}

fn parse_timestamp(value: Option<&str>, flag: &str) -> Result<Option<OffsetDateTime>> {
    value
        .map(|s| {
            OffsetDateTime::parse(s, &Rfc3339)
                .with_context(|| format!("Invalid {} timestamp: {}", flag, s))
        })
        .transpose()
}

/// Source wrapper restricting items to a publication-time window, used for
/// backfills over channel history.
struct TimeWindowSource {
    inner: Box<dyn ItemSource>,
    from: Option<OffsetDateTime>,
    to: Option<OffsetDateTime>,
}

#[async_trait]
impl ItemSource for TimeWindowSource {
    fn source_id(&self) -> &str {
        self.inner.source_id()
    }

    async fn fetch_items(&self) -> Result<Vec<RawItem>, SourceError> {
        let items = self.inner.fetch_items().await?;
        Ok(items
            .into_iter()
            .filter(|item| {
                self.from.is_none_or(|from| item.published_at >= from)
                    && self.to.is_none_or(|to| item.published_at <= to)
            })
            .collect())
    }
}
