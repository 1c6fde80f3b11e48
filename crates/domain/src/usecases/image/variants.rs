//! Variant proposal: concept options for human-in-the-loop selection

use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::model::ImageVariant;
use crate::ports::{AiError, ChatModel, ChatRequest};
use crate::util::extract_json;

/// Pre-authored surreal scene descriptions. One is chosen at random per
/// proposal run and each concept grafts an article keyword onto it.
pub const STYLE_SEEDS: &[&str] = &[
    "a library where the shelves grow like trees and books ripen as fruit",
    "an ocean frozen mid-wave, with staircases carved into the crests",
    "a city street where the buildings lean in to listen to passers-by",
    "a chess board the size of a valley, pieces half-buried like ruins",
    "a train station suspended in clouds, platforms made of folded maps",
    "a greenhouse at night where the plants emit a soft television glow",
];

/// Minimum usable concepts: with fewer than 2 there is nothing to choose from
pub const MIN_VARIANTS: usize = 2;
const REQUESTED_VARIANTS: usize = 4;

pub fn random_style_seed() -> &'static str {
    STYLE_SEEDS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(STYLE_SEEDS[0])
}

#[derive(Deserialize)]
struct VariantJson {
    label: String,
    description: String,
}

#[derive(Deserialize)]
struct VariantsJson {
    variants: Vec<VariantJson>,
}

/// Ask for 4 distinct concepts grafting one article keyword onto the style
/// seed. Returning fewer than `MIN_VARIANTS` valid concepts fails this
/// sub-step only; full generation proceeds without a selected variant.
pub async fn propose_variants<C: ChatModel + ?Sized>(
    model: &C,
    title: &str,
    body: &str,
    style_seed: &str,
) -> Result<Vec<ImageVariant>, AiError> {
    let request = ChatRequest::new(
        "You are a concept artist proposing image ideas. Output only valid JSON.",
        build_variants_prompt(title, body, style_seed),
    )
    .with_temperature(0.9)
    .with_max_tokens(800);

    let text = model.complete(request).await?;
    let parsed: VariantsJson = serde_json::from_str(extract_json(&text))
        .map_err(|e| AiError::InvalidFormat(e.to_string()))?;

    let variants: Vec<ImageVariant> = parsed
        .variants
        .into_iter()
        .filter(|v| !v.label.trim().is_empty() && !v.description.trim().is_empty())
        .take(REQUESTED_VARIANTS)
        .map(|v| ImageVariant {
            label: v.label,
            description: v.description,
        })
        .collect();

    if variants.len() < MIN_VARIANTS {
        return Err(AiError::InvalidFormat(format!(
            "Only {} usable variants, need at least {}",
            variants.len(),
            MIN_VARIANTS
        )));
    }

    Ok(variants)
}

fn build_variants_prompt(title: &str, body: &str, style_seed: &str) -> String {
    format!(
        r#"Style seed scene: {style_seed}

Article title: {title}

Article body:
{body}

Propose exactly {REQUESTED_VARIANTS} distinct image concepts. Each grafts ONE
keyword from the article onto the style seed scene, keeping the scene
recognizable. Labels must be short and evocative.

Respond with ONLY a JSON object:
{{"variants": [{{"label": "...", "description": "2-3 sentences"}}, ...]}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FakeModel(String);

    #[async_trait]
    impl ChatModel for FakeModel {
        async fn complete(&self, _request: ChatRequest) -> Result<String, AiError> {
            Ok(self.0.clone())
        }
    }

    fn variants_json(n: usize) -> String {
        let variants: Vec<String> = (0..n)
            .map(|i| format!(r#"{{"label": "Concept {i}", "description": "Scene {i}"}}"#))
            .collect();
        format!(r#"{{"variants": [{}]}}"#, variants.join(","))
    }

    #[tokio::test]
    async fn test_proposes_four_variants() {
        let model = FakeModel(variants_json(4));
        let variants = propose_variants(&model, "T", "B", STYLE_SEEDS[0])
            .await
            .unwrap();
        assert_eq!(variants.len(), 4);
    }

    #[tokio::test]
    async fn test_two_valid_variants_is_enough() {
        let model = FakeModel(variants_json(2));
        let variants = propose_variants(&model, "T", "B", STYLE_SEEDS[0])
            .await
            .unwrap();
        assert_eq!(variants.len(), 2);
    }

    #[tokio::test]
    async fn test_fewer_than_two_valid_variants_fails() {
        let model = FakeModel(
            r#"{"variants": [
                {"label": "Only one", "description": "Scene"},
                {"label": "", "description": "blank label"},
                {"label": "Blank desc", "description": "  "}
            ]}"#
            .to_string(),
        );
        let result = propose_variants(&model, "T", "B", STYLE_SEEDS[0]).await;
        assert!(matches!(result, Err(AiError::InvalidFormat(_))));
    }

    #[tokio::test]
    async fn test_extra_variants_are_capped() {
        let model = FakeModel(variants_json(7));
        let variants = propose_variants(&model, "T", "B", STYLE_SEEDS[0])
            .await
            .unwrap();
        assert_eq!(variants.len(), 4);
    }

    #[test]
    fn test_random_style_seed_comes_from_the_fixed_set() {
        let seed = random_style_seed();
        assert!(STYLE_SEEDS.contains(&seed));
    }
}
