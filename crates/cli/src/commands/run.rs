//! Run command - ingestion and comment-sync workers

use anyhow::{Context, Result, bail};
use newsflow_adapters::channel::{NullChannel, TelegramChannel};
use newsflow_adapters::llm::{
    LlmConfig, OpenAiChatModel, OpenAiVisionModel, StubChatModel, StubVisionModel,
};
use newsflow_adapters::media::{
    BucketStore, ImageConfig, OpenAiImageRenderer, PassthroughStore, StubRenderer,
};
use newsflow_adapters::social::{
    FacebookPublisher, InstagramPublisher, LinkedInPublisher, StubPublisher, TikTokPublisher,
    facebook::FacebookConfig, instagram::InstagramConfig, linkedin::LinkedInConfig,
    tiktok::TikTokConfig,
};
use newsflow_adapters::sources::{RssSource, TelegramSource};
use newsflow_adapters::state::{InMemoryStore, SqliteStore};
use newsflow_domain::{
    ChatModel, ContentStore, ImageRenderer, ItemOutcome, ItemSource, Language, ModerationChannel,
    ObjectStore, Platform, PolicyStore, SocialPublisher, SystemClock, VisionModel,
    usecases::{
        CommentSyncer, ContentPipeline, DistributionConfig, ImageOrchestratorConfig,
        PipelineConfig,
    },
};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use crate::args::RunArgs;
use crate::config::AppConfig;

pub type AppPipeline = ContentPipeline<
    dyn ChatModel,
    dyn VisionModel,
    dyn ImageRenderer,
    dyn ContentStore,
    dyn PolicyStore,
    dyn ObjectStore,
    dyn ModerationChannel,
    SystemClock,
>;

/// Everything the commands need, wired from config
pub struct PipelineParts {
    pub pipeline: AppPipeline,
    pub store: Arc<dyn ContentStore>,
    pub chat: Arc<dyn ChatModel>,
    pub publishers: Vec<Arc<dyn SocialPublisher>>,
}

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    tracing::info!(
        dry_run = args.dry_run,
        once = args.once,
        rss_feeds = config.sources.rss_feeds.len(),
        telegram_channels = config.sources.telegram_channels.len(),
        "Starting newsflow run"
    );

    let sources = build_sources(&config)?;
    if sources.is_empty() {
        bail!("No ingestion sources configured");
    }

    let parts = Arc::new(build_pipeline(&config, args.dry_run, sources).await?);

    if args.once {
        tracing::info!("Running single ingestion cycle");
        let outcomes = parts.pipeline.ingest_once().await;
        log_outcomes(&outcomes);
        sync_comments(&parts).await;
        return Ok(());
    }

    // Independent periodic workers: one per ingestion source, one for
    // comment sync. Each source polls on its own interval.
    let mut workers = Vec::new();

    for source_id in parts.pipeline.source_ids() {
        let secs = config
            .sources
            .poll_interval_overrides
            .get(&source_id)
            .copied()
            .unwrap_or(config.sources.poll_interval_secs);
        tracing::info!(source = %source_id, interval_secs = secs, "Starting source worker");

        let parts = parts.clone();
        workers.push(tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(secs));
            loop {
                ticker.tick().await;
                let outcomes = parts.pipeline.ingest_from(&source_id).await;
                if !outcomes.is_empty() {
                    log_outcomes(&outcomes);
                }
            }
        }));
    }

    {
        let secs = config.sources.comment_sync_interval_secs;
        let parts = parts.clone();
        workers.push(tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(secs));
            loop {
                ticker.tick().await;
                sync_comments(&parts).await;
            }
        }));
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
    }
    tracing::info!("Shutdown signal received");

    for worker in &workers {
        worker.abort();
    }

    tracing::info!("newsflow run completed");
    Ok(())
}

pub fn log_outcomes(outcomes: &[ItemOutcome]) {
    for outcome in outcomes {
        match outcome {
            ItemOutcome::Processed {
                item_id,
                published,
                posts_attempted,
            } => {
                tracing::info!(
                    item_id = %item_id,
                    published = published,
                    posts_attempted = posts_attempted,
                    "Processed"
                );
            }
            ItemOutcome::Skipped { reason } => {
                tracing::debug!(reason = %reason, "Skipped");
            }
            ItemOutcome::Failed { error } => {
                tracing::error!(error = %error, "Failed");
            }
        }
    }
}

async fn sync_comments(parts: &PipelineParts) {
    let syncer = CommentSyncer::new(
        parts.publishers.clone(),
        parts.store.as_ref(),
        parts.chat.as_ref(),
    );
    match syncer.sync().await {
        Ok(inserted) if inserted > 0 => {
            tracing::info!(inserted = inserted, "Comment sync complete");
        }
        Ok(_) => {}
        Err(e) => tracing::error!(error = %e, "Comment sync failed"),
    }
}

pub fn load_api_key(env_var: &str, feature: &str) -> Result<SecretString> {
    match std::env::var(env_var) {
        Ok(value) if !value.is_empty() => Ok(SecretString::new(value.into())),
        _ => bail!("Environment variable {} is not set (required for {})", env_var, feature),
    }
}

pub fn build_sources(config: &AppConfig) -> Result<Vec<Box<dyn ItemSource>>> {
    let mut sources: Vec<Box<dyn ItemSource>> = Vec::new();

    for feed_url in &config.sources.rss_feeds {
        let source = RssSource::new(feed_url.clone())
            .with_context(|| format!("Failed to build RSS source for {}", feed_url))?;
        sources.push(Box::new(source));
    }

    for channel in &config.sources.telegram_channels {
        let source = TelegramSource::new(channel.clone())
            .with_context(|| format!("Failed to build Telegram source for {}", channel))?;
        sources.push(Box::new(source));
    }

    Ok(sources)
}

pub async fn build_pipeline(
    config: &AppConfig,
    dry_run: bool,
    sources: Vec<Box<dyn ItemSource>>,
) -> Result<PipelineParts> {
    let (chat, vision, renderer) = build_models(config)?;

    // Dry runs keep all state in memory and leave the database untouched
    let (store, policy_store): (Arc<dyn ContentStore>, Arc<dyn PolicyStore>) = if dry_run {
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), store)
    } else {
        let store = Arc::new(
            SqliteStore::new(&config.general.state_db_path)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to open state store: {}", e))?,
        );
        (store.clone(), store)
    };

    let objects: Arc<dyn ObjectStore> = if config.storage.enabled && !dry_run {
        let key = load_api_key(&config.storage.api_key_env, "object storage")?;
        Arc::new(
            BucketStore::new(
                config.storage.base_url.clone(),
                key,
                config.storage.bucket.clone(),
            )
            .map_err(|e| anyhow::anyhow!("Failed to build object store: {}", e))?,
        )
    } else {
        Arc::new(PassthroughStore)
    };

    let channel: Arc<dyn ModerationChannel> = if config.moderation.enabled && !dry_run {
        if config.moderation.chat_id.is_empty() {
            bail!("Moderation enabled but chat_id is not configured");
        }
        let token = load_api_key(&config.moderation.bot_token_env, "moderation channel")?;
        Arc::new(
            TelegramChannel::new(token, config.moderation.chat_id.clone())
                .map_err(|e| anyhow::anyhow!("Failed to build moderation channel: {}", e))?,
        )
    } else {
        Arc::new(NullChannel)
    };

    let publishers = build_publishers(config, dry_run)?;

    let languages = parse_languages(&config.general.languages)?;

    let pipeline_config = PipelineConfig {
        languages,
        ai_batch_size: config.general.ai_batch_size,
        ai_batch_delay: Duration::from_millis(config.general.ai_batch_delay_ms),
        image: ImageOrchestratorConfig {
            max_retries: config.general.max_image_retries,
            propose_variants: config.general.propose_image_variants,
        },
        distribution: DistributionConfig {
            site_base_url: config.general.site_base_url.clone(),
            ..Default::default()
        },
    };

    let pipeline = ContentPipeline::new(
        sources,
        publishers.clone(),
        chat.clone(),
        vision,
        renderer,
        store.clone(),
        policy_store,
        objects,
        channel,
        Arc::new(SystemClock),
        pipeline_config,
    );

    Ok(PipelineParts {
        pipeline,
        store,
        chat,
        publishers,
    })
}

type Models = (
    Arc<dyn ChatModel>,
    Arc<dyn VisionModel>,
    Arc<dyn ImageRenderer>,
);

fn build_models(config: &AppConfig) -> Result<Models> {
    match config.openai.provider.as_str() {
        "openai" => {
            let api_key = load_api_key(&config.openai.api_key_env, "OpenAI")?;

            let chat = OpenAiChatModel::with_base_url(
                api_key.clone(),
                config.openai.base_url.clone(),
                LlmConfig {
                    model: config.openai.model.clone(),
                    timeout_secs: config.openai.timeout_secs,
                    retries: config.openai.retries,
                },
            )
            .context("Failed to build chat model")?;

            let vision = OpenAiVisionModel::with_base_url(
                api_key.clone(),
                config.openai.base_url.clone(),
                LlmConfig {
                    model: config.openai.vision_model.clone(),
                    timeout_secs: config.openai.timeout_secs,
                    retries: config.openai.retries,
                },
            )
            .context("Failed to build vision model")?;

            let renderer = OpenAiImageRenderer::with_base_url(
                api_key,
                config.openai.base_url.clone(),
                ImageConfig {
                    model: config.openai.image_model.clone(),
                    size: config.openai.image_size.clone(),
                    timeout_secs: 120,
                },
            )
            .map_err(|e| anyhow::anyhow!("Failed to build image renderer: {}", e))?;

            Ok((Arc::new(chat), Arc::new(vision), Arc::new(renderer)))
        }
        "stub" => Ok((
            Arc::new(StubChatModel::approving()),
            Arc::new(StubVisionModel::passing()),
            Arc::new(StubRenderer),
        )),
        other => bail!("Unknown AI provider: {}", other),
    }
}

fn build_publishers(config: &AppConfig, dry_run: bool) -> Result<Vec<Arc<dyn SocialPublisher>>> {
    if dry_run {
        return Ok(Platform::all()
            .iter()
            .map(|p| Arc::new(StubPublisher::new(*p)) as Arc<dyn SocialPublisher>)
            .collect());
    }

    let mut publishers: Vec<Arc<dyn SocialPublisher>> = Vec::new();

    if config.social.instagram.enabled {
        let token = load_api_key(&config.social.instagram.access_token_env, "Instagram")?;
        publishers.push(Arc::new(
            InstagramPublisher::new(
                token,
                InstagramConfig {
                    enabled: true,
                    user_id: config.social.instagram.user_id.clone(),
                },
            )
            .map_err(|e| anyhow::anyhow!("Failed to build Instagram publisher: {}", e))?,
        ));
    }

    if config.social.facebook.enabled {
        let token = load_api_key(&config.social.facebook.access_token_env, "Facebook")?;
        publishers.push(Arc::new(
            FacebookPublisher::new(
                token,
                FacebookConfig {
                    enabled: true,
                    page_id: config.social.facebook.page_id.clone(),
                },
            )
            .map_err(|e| anyhow::anyhow!("Failed to build Facebook publisher: {}", e))?,
        ));
    }

    if config.social.linkedin.enabled {
        let token = load_api_key(&config.social.linkedin.access_token_env, "LinkedIn")?;
        publishers.push(Arc::new(
            LinkedInPublisher::new(
                token,
                LinkedInConfig {
                    enabled: true,
                    organization_id: config.social.linkedin.organization_id.clone(),
                },
            )
            .map_err(|e| anyhow::anyhow!("Failed to build LinkedIn publisher: {}", e))?,
        ));
    }

    if config.social.tiktok.enabled {
        let token = load_api_key(&config.social.tiktok.access_token_env, "TikTok")?;
        publishers.push(Arc::new(
            TikTokPublisher::new(token, TikTokConfig { enabled: true })
                .map_err(|e| anyhow::anyhow!("Failed to build TikTok publisher: {}", e))?,
        ));
    }

    if publishers.is_empty() {
        tracing::warn!("No social platforms enabled; items will only be published to the site");
    }

    Ok(publishers)
}

fn parse_languages(codes: &[String]) -> Result<Vec<Language>> {
    codes
        .iter()
        .map(|code| {
            code.parse::<Language>()
                .map_err(|e| anyhow::anyhow!("Invalid language in config: {}", e))
        })
        .collect()
}
