//! Content pipeline - orchestrates ingestion, moderation, rewriting, image
//! generation, publication, and social fan-out
//!
//! The policy is loaded fresh from the `PolicyStore` at each decision point,
//! so flipping a flag takes effect on the next item without a restart.

use std::sync::Arc;

use futures::future::join_all;
use tokio::time::{Duration, sleep};
use uuid::Uuid;

use crate::model::{ContentItem, ItemOutcome, Language, ModerationStatus, RawItem};
use crate::policy::PipelinePolicy;
use crate::ports::{
    ChatModel, Clock, ContentStore, ImageRenderer, ItemSource, ModerationChannel, ObjectStore,
    PolicyStore, SocialPublisher, StateError, VisionModel,
};
use crate::usecases::{
    distribute::{DistributionConfig, Distributor},
    image::{ImageOrchestrator, ImageOrchestratorConfig},
    moderate::PreModerationGate,
    publish::{PublicationScheduler, ScheduleOutcome},
    rewrite::RewriteEngine,
};

/// Configuration for the content pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Languages to rewrite every item into
    pub languages: Vec<Language>,
    /// Items processed concurrently per AI batch
    pub ai_batch_size: usize,
    /// Pause between AI batches
    pub ai_batch_delay: Duration,
    pub image: ImageOrchestratorConfig,
    pub distribution: DistributionConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            languages: Language::all().to_vec(),
            ai_batch_size: 3,
            ai_batch_delay: Duration::from_millis(500),
            image: ImageOrchestratorConfig::default(),
            distribution: DistributionConfig::default(),
        }
    }
}

/// Stages one content item moves through after ingestion
enum ItemStage {
    Moderate,
    Rewrite,
    Illustrate,
    Publish,
}

/// Pipeline orchestrator. Generic over the ports so tests run entirely on
/// fakes; the binary wires in the real adapters.
pub struct ContentPipeline<C, V, R, St, P, O, M, Cl>
where
    C: ChatModel + ?Sized,
    V: VisionModel + ?Sized,
    R: ImageRenderer + ?Sized,
    St: ContentStore + ?Sized,
    P: PolicyStore + ?Sized,
    O: ObjectStore + ?Sized,
    M: ModerationChannel + ?Sized,
    Cl: Clock + ?Sized,
{
    sources: Vec<Box<dyn ItemSource>>,
    publishers: Vec<Arc<dyn SocialPublisher>>,
    chat: Arc<C>,
    vision: Arc<V>,
    renderer: Arc<R>,
    store: Arc<St>,
    policy: Arc<P>,
    objects: Arc<O>,
    channel: Arc<M>,
    clock: Arc<Cl>,
    config: PipelineConfig,
}

impl<C, V, R, St, P, O, M, Cl> ContentPipeline<C, V, R, St, P, O, M, Cl>
where
    C: ChatModel + ?Sized,
    V: VisionModel + ?Sized,
    R: ImageRenderer + ?Sized,
    St: ContentStore + ?Sized,
    P: PolicyStore + ?Sized,
    O: ObjectStore + ?Sized,
    M: ModerationChannel + ?Sized,
    Cl: Clock + ?Sized,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sources: Vec<Box<dyn ItemSource>>,
        publishers: Vec<Arc<dyn SocialPublisher>>,
        chat: Arc<C>,
        vision: Arc<V>,
        renderer: Arc<R>,
        store: Arc<St>,
        policy: Arc<P>,
        objects: Arc<O>,
        channel: Arc<M>,
        clock: Arc<Cl>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            sources,
            publishers,
            chat,
            vision,
            renderer,
            store,
            policy,
            objects,
            channel,
            clock,
            config,
        }
    }

    /// One full ingestion cycle: fetch every source, process new items in
    /// bounded AI batches. A failing source never blocks the others.
    pub async fn ingest_once(&self) -> Vec<ItemOutcome> {
        let mut outcomes = Vec::new();
        for source in &self.sources {
            outcomes.extend(self.ingest_source(source.as_ref()).await);
        }
        outcomes
    }

    /// Single-source cycle, driven by the per-source workers.
    pub async fn ingest_from(&self, source_id: &str) -> Vec<ItemOutcome> {
        match self.sources.iter().find(|s| s.source_id() == source_id) {
            Some(source) => self.ingest_source(source.as_ref()).await,
            None => {
                tracing::warn!(source = source_id, "Unknown source ID");
                Vec::new()
            }
        }
    }

    /// Source IDs in configuration order
    pub fn source_ids(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.source_id().to_string()).collect()
    }

    async fn ingest_source(&self, source: &dyn ItemSource) -> Vec<ItemOutcome> {
        let raws = match source.fetch_items().await {
            Ok(items) => {
                tracing::info!(source = source.source_id(), count = items.len(), "Fetched");
                items
            }
            Err(e) => {
                tracing::error!(source = source.source_id(), error = %e, "Fetch failed");
                return Vec::new();
            }
        };

        let mut outcomes = Vec::new();
        let batch_size = self.config.ai_batch_size.max(1);
        let mut batches = raws.chunks(batch_size).peekable();

        while let Some(batch) = batches.next() {
            let batch_outcomes = join_all(batch.iter().map(|raw| self.process_raw(raw))).await;
            outcomes.extend(batch_outcomes);

            if batches.peek().is_some() {
                sleep(self.config.ai_batch_delay).await;
            }
        }

        outcomes
    }

    /// Drive one raw item through the stage machine:
    /// Moderate → Rewrite → Illustrate → Publish.
    pub async fn process_raw(&self, raw: &RawItem) -> ItemOutcome {
        let dedup_key = raw.dedup_key();

        match self.store.dedup_exists(&dedup_key).await {
            Ok(true) => {
                return ItemOutcome::Skipped {
                    reason: "Already ingested".to_string(),
                };
            }
            Ok(false) => {}
            Err(e) => {
                // Fail open: a broken dedup check must not halt ingestion
                tracing::warn!(error = %e, "Dedup check failed, continuing");
            }
        }

        let mut item = ContentItem::from_raw(raw, self.clock.now());
        match self.store.insert_item(&item).await {
            Ok(()) => {}
            Err(StateError::Duplicate(_)) => {
                // Another run claimed the key between check and insert
                return ItemOutcome::Skipped {
                    reason: "Already ingested".to_string(),
                };
            }
            Err(e) => {
                return ItemOutcome::Failed {
                    error: format!("Insert failed: {}", e),
                };
            }
        }

        let mut stage = ItemStage::Moderate;
        loop {
            stage = match stage {
                ItemStage::Moderate => match self.moderate(&mut item).await {
                    Ok(()) => ItemStage::Rewrite,
                    Err(reason) => break ItemOutcome::Skipped { reason },
                },

                ItemStage::Rewrite => {
                    let rewriter = RewriteEngine::new(self.chat.as_ref());
                    item.language_variants = rewriter
                        .rewrite(
                            &item.original_title,
                            &item.original_body,
                            &self.config.languages,
                        )
                        .await;

                    if item.language_variants.is_empty() {
                        item.rejection_reason = Some("Rewrite produced no variants".to_string());
                        self.persist(&item).await;
                        break ItemOutcome::Failed {
                            error: "Rewrite produced no variants".to_string(),
                        };
                    }
                    ItemStage::Illustrate
                }

                ItemStage::Illustrate => {
                    let (title, body) = match item.variant(Language::En) {
                        Some(v) => (v.title.clone(), v.body.clone()),
                        None => (item.original_title.clone(), item.original_body.clone()),
                    };
                    let images = ImageOrchestrator::new(
                        self.chat.as_ref(),
                        self.vision.as_ref(),
                        self.renderer.as_ref(),
                        self.config.image.clone(),
                    );
                    item.image = Some(images.run(&title, &body, None).await);
                    self.persist(&item).await;
                    ItemStage::Publish
                }

                ItemStage::Publish => {
                    // Fresh read: the publish decision respects flag flips mid-cycle
                    let policy = self.load_policy().await;
                    let outcome = self.scheduler().schedule(&mut item, &policy).await;

                    let posts_attempted = if outcome == ScheduleOutcome::Published {
                        self.distributor().distribute(&item, &policy).await
                    } else {
                        0
                    };

                    self.persist(&item).await;

                    break ItemOutcome::Processed {
                        item_id: item.id,
                        published: item.is_published(),
                        posts_attempted,
                    };
                }
            };
        }
    }

    /// Moderation stage. Returns the rejection reason when the gate says no.
    async fn moderate(&self, item: &mut ContentItem) -> Result<(), String> {
        let policy = self.load_policy().await;

        if policy.pre_moderation_enabled {
            let gate = PreModerationGate::new(self.chat.as_ref());
            let verdict = gate.review(&item.original_title, &item.original_body).await;
            if !verdict.approved {
                item.moderation_status = ModerationStatus::Rejected;
                item.rejection_reason = verdict.reason.clone();
                self.persist(item).await;
                tracing::info!(item_id = %item.id, reason = ?verdict.reason, "Rejected");
                return Err(verdict
                    .reason
                    .unwrap_or_else(|| "Rejected by moderation".to_string()));
            }
        }

        item.moderation_status = ModerationStatus::Approved;
        Ok(())
    }

    /// Explicit human approval: publish the item now and fan it out under the
    /// current policy. Also serves as the republish path.
    pub async fn approve_and_publish(&self, item_id: Uuid) -> Result<ItemOutcome, StateError> {
        let mut item = self
            .store
            .get_item(item_id)
            .await?
            .ok_or_else(|| StateError::NotFound(item_id.to_string()))?;

        item.moderation_status = ModerationStatus::Approved;
        item.rejection_reason = None;
        self.scheduler().publish_now(&mut item);

        let policy = self.load_policy().await;
        let posts_attempted = self.distributor().distribute(&item, &policy).await;

        self.store.update_item(&item).await?;

        Ok(ItemOutcome::Processed {
            item_id: item.id,
            published: true,
            posts_attempted,
        })
    }

    fn scheduler(&self) -> PublicationScheduler<&M, &Cl> {
        PublicationScheduler::new(
            self.channel.as_ref(),
            self.clock.as_ref(),
            self.config.distribution.site_base_url.clone(),
        )
    }

    fn distributor(&self) -> Distributor<&St, &O, &M, &Cl> {
        Distributor::new(
            self.publishers.clone(),
            self.store.as_ref(),
            self.objects.as_ref(),
            self.channel.as_ref(),
            self.clock.as_ref(),
            self.config.distribution.clone(),
        )
    }

    async fn load_policy(&self) -> PipelinePolicy {
        match self.policy.load().await {
            Ok(policy) => policy,
            Err(e) => {
                tracing::warn!(error = %e, "Policy load failed, using defaults");
                PipelinePolicy::default()
            }
        }
    }

    async fn persist(&self, item: &ContentItem) {
        if let Err(e) = self.store.update_item(item).await {
            tracing::error!(item_id = %item.id, error = %e, "Item update failed");
        }
    }
}
