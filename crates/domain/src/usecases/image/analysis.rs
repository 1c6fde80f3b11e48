//! Pre-analysis: choose a generation approach and visual metadata

use serde::Deserialize;

use crate::model::ImageApproach;
use crate::ports::{ChatModel, ChatRequest};
use crate::util::extract_json;

/// Output of the pre-analysis step, feeding both generation paths
#[derive(Debug, Clone)]
pub struct PreAnalysis {
    pub approach: ImageApproach,
    pub mood: String,
    pub color_palette: String,
    pub emotion: String,
    /// The single idea the image should communicate
    pub core_idea: String,
    /// The transformation/conflict the image should encode
    pub visual_metaphor: String,
}

impl Default for PreAnalysis {
    fn default() -> Self {
        Self {
            approach: ImageApproach::Structured,
            mood: "neutral".to_string(),
            color_palette: "cool blues".to_string(),
            emotion: "curiosity".to_string(),
            core_idea: String::new(),
            visual_metaphor: String::new(),
        }
    }
}

#[derive(Deserialize)]
struct AnalysisJson {
    approach: String,
    #[serde(default)]
    mood: Option<String>,
    #[serde(default)]
    color_palette: Option<String>,
    #[serde(default)]
    emotion: Option<String>,
    #[serde(default)]
    core_idea: Option<String>,
    #[serde(default)]
    visual_metaphor: Option<String>,
}

/// Classify the article into a generation approach plus visual metadata.
/// On any AI or parse failure, defaults to the `Structured` approach — the
/// safest, templated path — rather than failing the pipeline.
pub async fn analyze<C: ChatModel + ?Sized>(model: &C, title: &str, body: &str) -> PreAnalysis {
    let request = ChatRequest::new(
        "You are an art director planning an illustrative image for a news \
         article. Output only valid JSON.",
        build_analysis_prompt(title, body),
    )
    .with_temperature(0.5)
    .with_max_tokens(500);

    let text = match model.complete(request).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "Pre-analysis call failed, defaulting to structured");
            return PreAnalysis::default();
        }
    };

    match serde_json::from_str::<AnalysisJson>(extract_json(&text)) {
        Ok(parsed) => {
            let approach = parse_approach(&parsed.approach);
            PreAnalysis {
                approach,
                mood: parsed.mood.unwrap_or_else(|| "neutral".to_string()),
                color_palette: parsed
                    .color_palette
                    .unwrap_or_else(|| "cool blues".to_string()),
                emotion: parsed.emotion.unwrap_or_else(|| "curiosity".to_string()),
                core_idea: parsed.core_idea.unwrap_or_default(),
                visual_metaphor: parsed.visual_metaphor.unwrap_or_default(),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Unparseable pre-analysis, defaulting to structured");
            PreAnalysis::default()
        }
    }
}

fn parse_approach(s: &str) -> ImageApproach {
    match s.trim().to_lowercase().as_str() {
        "structured" => ImageApproach::Structured,
        "creative" => ImageApproach::Creative,
        "hero_image" => ImageApproach::HeroImage,
        "artistic" => ImageApproach::Artistic,
        other => {
            tracing::warn!(approach = %other, "Unknown approach, using structured");
            ImageApproach::Structured
        }
    }
}

fn build_analysis_prompt(title: &str, body: &str) -> String {
    format!(
        r#"Plan an illustrative image for this article.

Title: {title}

Body:
{body}

Pick the generation approach:
- "structured": product/company announcements that fit a template
- "creative": abstract topics needing a conceptual scene
- "hero_image": events and people best served by a photographic shot
- "artistic": culture/opinion pieces suiting a painterly style

Respond with ONLY a JSON object:
{{"approach": "structured|creative|hero_image|artistic",
  "mood": "...", "color_palette": "...", "emotion": "...",
  "core_idea": "one sentence: the single idea the image communicates",
  "visual_metaphor": "one sentence: the transformation or conflict to encode"}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::AiError;
    use async_trait::async_trait;

    struct FakeModel(Result<String, ()>);

    #[async_trait]
    impl ChatModel for FakeModel {
        async fn complete(&self, _request: ChatRequest) -> Result<String, AiError> {
            self.0
                .clone()
                .map_err(|_| AiError::Api("down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_analyze_parses_approach_and_metadata() {
        let model = FakeModel(Ok(r#"{
            "approach": "creative",
            "mood": "tense",
            "color_palette": "amber and slate",
            "emotion": "urgency",
            "core_idea": "markets react to policy",
            "visual_metaphor": "a tide lifting some boats and sinking others"
        }"#
        .to_string()));

        let analysis = analyze(&model, "Title", "Body").await;
        assert_eq!(analysis.approach, ImageApproach::Creative);
        assert_eq!(analysis.mood, "tense");
        assert!(analysis.visual_metaphor.contains("tide"));
    }

    #[tokio::test]
    async fn test_analyze_defaults_to_structured_on_failure() {
        let model = FakeModel(Err(()));
        let analysis = analyze(&model, "Title", "Body").await;
        assert_eq!(analysis.approach, ImageApproach::Structured);
    }

    #[tokio::test]
    async fn test_analyze_defaults_on_unknown_approach() {
        let model = FakeModel(Ok(r#"{"approach": "cubist"}"#.to_string()));
        let analysis = analyze(&model, "Title", "Body").await;
        assert_eq!(analysis.approach, ImageApproach::Structured);
    }
}
