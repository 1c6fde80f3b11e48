//! Creative-writer generation path: free-form prose prompts

use crate::model::{ImageApproach, ImageVariant};
use crate::ports::{AiError, ChatModel, ChatRequest};
use crate::usecases::image::analysis::PreAnalysis;

/// Fixed quality/branding directives appended to every creative prompt
pub const QUALITY_DIRECTIVES: &str = "High detail, coherent anatomy and perspective, \
     no text, no letters, no watermarks, no logos. Editorial quality suitable \
     for a news site header, 16:9 composition.";

/// Expand the pre-analysis (and selected variant, if any) into a free-form
/// prose prompt of 150-250 words following the idea → metaphor → tension →
/// style authoring method.
pub async fn write_creative_prompt<C: ChatModel + ?Sized>(
    model: &C,
    analysis: &PreAnalysis,
    selected_variant: Option<&ImageVariant>,
    improvement_suggestions: &[String],
) -> Result<String, AiError> {
    let request = ChatRequest::new(
        "You are a prompt author for an image generation model. Output only \
         the prompt text, no preamble.",
        build_writer_prompt(analysis, selected_variant, improvement_suggestions),
    )
    .with_temperature(0.8)
    .with_max_tokens(600);

    let text = model.complete(request).await?;
    let prompt = text.trim();

    if prompt.is_empty() {
        return Err(AiError::InvalidFormat("Empty creative prompt".to_string()));
    }

    Ok(format!("{}\n\n{}", prompt, QUALITY_DIRECTIVES))
}

fn build_writer_prompt(
    analysis: &PreAnalysis,
    selected_variant: Option<&ImageVariant>,
    improvement_suggestions: &[String],
) -> String {
    let mut prompt = format!(
        r#"Write a single image-generation prompt of 150-250 words.

Follow this method, in order:
1. Idea: state the core idea plainly.
2. Metaphor: build the scene around the visual metaphor.
3. Tension: make the transformation or conflict visible in the composition.
4. Style: close with concrete style, lighting, and palette directions.

Core idea: {core_idea}
Visual metaphor: {visual_metaphor}
Mood: {mood}
Emotion: {emotion}
Color palette: {palette}
Approach: {approach}"#,
        core_idea = analysis.core_idea,
        visual_metaphor = analysis.visual_metaphor,
        mood = analysis.mood,
        emotion = analysis.emotion,
        palette = analysis.color_palette,
        approach = approach_direction(analysis.approach),
    );

    if let Some(variant) = selected_variant {
        prompt.push_str(&format!(
            "\n\nA concept was pre-selected for this article; build on it:\n{}: {}",
            variant.label, variant.description
        ));
    }

    if !improvement_suggestions.is_empty() {
        prompt.push_str("\n\nA previous render was criticized; address these points:\n");
        for suggestion in improvement_suggestions {
            prompt.push_str(&format!("- {}\n", suggestion));
        }
    }

    prompt
}

fn approach_direction(approach: ImageApproach) -> &'static str {
    match approach {
        ImageApproach::HeroImage => "photographic, shallow depth of field, natural light",
        ImageApproach::Artistic => "painterly, visible brushwork, gallery quality",
        // Creative is the default register; Structured never reaches here
        _ => "conceptual editorial illustration",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FakeModel(Result<String, ()>);

    #[async_trait]
    impl ChatModel for FakeModel {
        async fn complete(&self, _request: ChatRequest) -> Result<String, AiError> {
            self.0.clone().map_err(|_| AiError::Api("down".to_string()))
        }
    }

    fn analysis() -> PreAnalysis {
        PreAnalysis {
            approach: ImageApproach::Creative,
            core_idea: "markets shift".to_string(),
            visual_metaphor: "a tide turning".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_creative_prompt_appends_quality_directives() {
        let model = FakeModel(Ok("A vast harbor at dawn...".to_string()));
        let prompt = write_creative_prompt(&model, &analysis(), None, &[])
            .await
            .unwrap();

        assert!(prompt.starts_with("A vast harbor"));
        assert!(prompt.contains("no watermarks"));
    }

    #[tokio::test]
    async fn test_creative_prompt_fails_on_empty_output() {
        let model = FakeModel(Ok("   ".to_string()));
        let result = write_creative_prompt(&model, &analysis(), None, &[]).await;
        assert!(matches!(result, Err(AiError::InvalidFormat(_))));
    }

    #[tokio::test]
    async fn test_creative_prompt_propagates_api_error() {
        let model = FakeModel(Err(()));
        let result = write_creative_prompt(&model, &analysis(), None, &[]).await;
        assert!(matches!(result, Err(AiError::Api(_))));
    }

    #[test]
    fn test_writer_prompt_includes_variant_and_suggestions() {
        let variant = ImageVariant {
            label: "The Lighthouse".to_string(),
            description: "a lighthouse made of newspapers".to_string(),
        };
        let suggestions = vec!["less clutter".to_string()];

        let prompt = build_writer_prompt(&analysis(), Some(&variant), &suggestions);
        assert!(prompt.contains("The Lighthouse"));
        assert!(prompt.contains("less clutter"));
        assert!(prompt.contains("150-250 words"));
    }
}
