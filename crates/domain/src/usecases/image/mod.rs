//! Image generation orchestrator
//!
//! State machine: NotStarted → VariantsOffered (optional) → Analyzed →
//! Generated → Validated{Pass|RetryPending|Failed}. A critic pass scores
//! each render and can trigger a bounded retry that folds the critic's
//! suggestions into the next prompt.

pub mod analysis;
pub mod classify;
pub mod creative;
pub mod critic;
pub mod variants;

use crate::model::{ImageApproach, ImageVariant, ItemImage};
use crate::ports::{ChatModel, ImageRenderer, VisionModel};

use analysis::PreAnalysis;
use critic::Critique;

#[derive(Debug, Clone)]
pub struct ImageOrchestratorConfig {
    /// Maximum critic-triggered retries after the initial attempt
    pub max_retries: u32,
    /// Run the optional variant-proposal step before analysis
    pub propose_variants: bool,
}

impl Default for ImageOrchestratorConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            propose_variants: false,
        }
    }
}

enum Stage {
    NotStarted,
    Analyzed(PreAnalysis),
    Generated { prompt: String, url: String },
    Done,
}

/// Drives the generation state machine for one content item. Best-effort
/// throughout: every failure path degrades (structured fallback, pass-by-
/// default critique, keep-last-image) instead of stalling the pipeline.
pub struct ImageOrchestrator<C, V, R>
where
    C: ChatModel,
    V: VisionModel,
    R: ImageRenderer,
{
    chat: C,
    vision: V,
    renderer: R,
    config: ImageOrchestratorConfig,
}

impl<C, V, R> ImageOrchestrator<C, V, R>
where
    C: ChatModel,
    V: VisionModel,
    R: ImageRenderer,
{
    pub fn new(chat: C, vision: V, renderer: R, config: ImageOrchestratorConfig) -> Self {
        Self {
            chat,
            vision,
            renderer,
            config,
        }
    }

    /// Run the full sub-pipeline and return the resulting image state.
    /// `selected_variant` biases the creative path when a human (or an
    /// automated selector) picked one of the proposed concepts.
    pub async fn run(
        &self,
        title: &str,
        body: &str,
        selected_variant: Option<ImageVariant>,
    ) -> ItemImage {
        let mut image = ItemImage {
            selected_variant,
            ..ItemImage::default()
        };

        if self.config.propose_variants && image.selected_variant.is_none() {
            let seed = variants::random_style_seed();
            match variants::propose_variants(&self.chat, title, body, seed).await {
                Ok(offered) => image.variants_offered = offered,
                Err(e) => {
                    // Variant proposal failing is not a pipeline failure
                    tracing::warn!(error = %e, "Variant proposal failed, continuing without");
                }
            }
        }

        let mut suggestions: Vec<String> = Vec::new();
        let mut stage = Stage::NotStarted;

        loop {
            stage = match stage {
                Stage::NotStarted => {
                    let analysis = analysis::analyze(&self.chat, title, body).await;
                    tracing::info!(approach = analysis.approach.as_str(), "Image pre-analysis done");
                    Stage::Analyzed(analysis)
                }

                Stage::Analyzed(analysis) => {
                    let (prompt, approach) =
                        self.build_prompt(title, body, &analysis, &image, &suggestions).await;
                    image.approach_used = approach;
                    image.generation_prompt = prompt.clone();
                    image.attempts += 1;

                    match self.renderer.render(&prompt).await {
                        Ok(rendered) => Stage::Generated {
                            prompt,
                            url: rendered.url,
                        },
                        Err(e) => {
                            tracing::warn!(error = %e, attempt = image.attempts, "Render failed");
                            if image.attempts <= self.config.max_retries {
                                Stage::Analyzed(analysis)
                            } else {
                                image
                                    .validation_issues
                                    .push(format!("Render failed: {}", e));
                                Stage::Done
                            }
                        }
                    }
                }

                Stage::Generated { prompt, url } => {
                    let critique =
                        critic::critique_image(&self.vision, &prompt, title, &url).await;
                    image.url = Some(url);
                    image.quality_score = Some(critique.overall_score);
                    image.validation_issues = critique.issues();

                    if self.decide_retry(&critique, image.attempts) {
                        suggestions = critique.improvement_suggestions.clone();
                        tracing::info!(
                            score = critique.overall_score,
                            attempt = image.attempts,
                            "Critic requested retry"
                        );
                        // Re-enter generation with the suggestions folded in
                        let analysis = analysis::analyze(&self.chat, title, body).await;
                        Stage::Analyzed(analysis)
                    } else {
                        Stage::Done
                    }
                }

                Stage::Done => break,
            };
        }

        image
    }

    /// Build the generation prompt: structured template or creative prose,
    /// with creative falling back to structured on failure.
    async fn build_prompt(
        &self,
        title: &str,
        body: &str,
        analysis: &PreAnalysis,
        image: &ItemImage,
        suggestions: &[String],
    ) -> (String, ImageApproach) {
        if analysis.approach != ImageApproach::Structured {
            match creative::write_creative_prompt(
                &self.chat,
                analysis,
                image.selected_variant.as_ref(),
                suggestions,
            )
            .await
            {
                Ok(prompt) => return (prompt, analysis.approach),
                Err(e) => {
                    tracing::warn!(error = %e, "Creative writer failed, falling back to structured");
                }
            }
        }

        (
            self.build_structured(title, body, suggestions).await,
            ImageApproach::Structured,
        )
    }

    async fn build_structured(&self, title: &str, body: &str, suggestions: &[String]) -> String {
        let mut prompt = match classify::classify_article(&self.chat, title, body).await {
            Ok(profile) => classify::build_structured_prompt(&profile),
            Err(e) => {
                tracing::warn!(error = %e, "Classifier failed, using minimal template");
                format!(
                    "Editorial illustration for a news article titled \"{}\". \
                     Balanced composition, slate blue and soft orange palette. \
                     No text, no letters, no logos.",
                    title
                )
            }
        };

        if !suggestions.is_empty() {
            prompt.push_str(&format!(" Address: {}.", suggestions.join("; ")));
        }

        prompt
    }

    fn decide_retry(&self, critique: &Critique, attempts: u32) -> bool {
        if !critique.should_retry() {
            return false;
        }
        // attempts counts the initial attempt; retries beyond it are bounded
        if attempts > self.config.max_retries {
            tracing::warn!(
                attempts = attempts,
                "Retry budget exhausted, keeping last image"
            );
            return false;
        }
        true
    }
}
