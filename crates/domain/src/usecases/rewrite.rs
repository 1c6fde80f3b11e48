//! Rewrite/translate engine: per-language article variants

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::model::{Language, LanguageVariant};
use crate::ports::{AiError, ChatModel, ChatRequest};
use crate::util::{extract_json, slugify};

#[derive(Deserialize)]
struct VariantJson {
    title: String,
    body: String,
    short_description: String,
}

#[derive(Deserialize)]
struct MultiVariantJson {
    #[serde(flatten)]
    languages: BTreeMap<String, VariantJson>,
}

/// Rewrites and translates source text into per-language variants.
///
/// The default mode is one call per language, isolating failures: a language
/// that fails is simply absent and resolves through the English fallback
/// chain downstream. `rewrite_all_at_once` is the legacy single-call mode
/// kept for providers where request count matters more than blast radius.
pub struct RewriteEngine<C: ChatModel> {
    model: C,
}

impl<C: ChatModel> RewriteEngine<C> {
    pub fn new(model: C) -> Self {
        Self { model }
    }

    /// Rewrite into each target language with one call per language.
    /// Per-language failures are logged and skipped.
    pub async fn rewrite(
        &self,
        title: &str,
        body: &str,
        languages: &[Language],
    ) -> BTreeMap<Language, LanguageVariant> {
        let mut variants = BTreeMap::new();

        for &language in languages {
            match self.rewrite_one(title, body, language).await {
                Ok(variant) => {
                    variants.insert(language, variant);
                }
                Err(e) => {
                    tracing::warn!(
                        language = %language,
                        error = %e,
                        "Rewrite failed for language, falling back to English downstream"
                    );
                }
            }
        }

        variants
    }

    /// Rewrite into a single target language
    pub async fn rewrite_one(
        &self,
        title: &str,
        body: &str,
        language: Language,
    ) -> Result<LanguageVariant, AiError> {
        let request = ChatRequest::new(
            "You are an editor rewriting news articles. Output only valid JSON.",
            build_single_language_prompt(title, body, language),
        )
        .with_temperature(0.4)
        .with_max_tokens(1600);

        let text = self.model.complete(request).await?;
        let parsed: VariantJson = serde_json::from_str(extract_json(&text))
            .map_err(|e| AiError::InvalidFormat(e.to_string()))?;

        Ok(to_variant(parsed))
    }

    /// Legacy mode: all languages in one structured call. Higher latency and
    /// a single point of failure for every language.
    pub async fn rewrite_all_at_once(
        &self,
        title: &str,
        body: &str,
        languages: &[Language],
    ) -> Result<BTreeMap<Language, LanguageVariant>, AiError> {
        let request = ChatRequest::new(
            "You are an editor rewriting news articles. Output only valid JSON.",
            build_multi_language_prompt(title, body, languages),
        )
        .with_temperature(0.4)
        .with_max_tokens(3000);

        let text = self.model.complete(request).await?;
        let parsed: MultiVariantJson = serde_json::from_str(extract_json(&text))
            .map_err(|e| AiError::InvalidFormat(e.to_string()))?;

        let mut variants = BTreeMap::new();
        for (code, variant) in parsed.languages {
            match code.parse::<Language>() {
                Ok(language) => {
                    variants.insert(language, to_variant(variant));
                }
                Err(_) => {
                    tracing::warn!(code = %code, "Ignoring unknown language in rewrite response");
                }
            }
        }

        if variants.is_empty() {
            return Err(AiError::InvalidFormat(
                "No recognizable languages in response".to_string(),
            ));
        }

        Ok(variants)
    }
}

fn to_variant(json: VariantJson) -> LanguageVariant {
    let slug = slugify(&json.title);
    LanguageVariant {
        title: json.title,
        body: json.body,
        short_description: json.short_description,
        slug,
    }
}

fn build_single_language_prompt(title: &str, body: &str, language: Language) -> String {
    format!(
        r#"Rewrite the following article in {lang_name} for a news site: keep the
facts, drop promotional framing, and write a concise short description
(max 2 sentences).

Original title: {title}

Original body:
{body}

Respond with ONLY a JSON object:
{{"title": "...", "body": "...", "short_description": "..."}}"#,
        lang_name = language.name(),
    )
}

fn build_multi_language_prompt(title: &str, body: &str, languages: &[Language]) -> String {
    let codes: Vec<&str> = languages.iter().map(|l| l.code()).collect();
    format!(
        r#"Rewrite the following article for a news site in each of these
languages: {codes}. Keep the facts, drop promotional framing, and write a
concise short description (max 2 sentences) per language.

Original title: {title}

Original body:
{body}

Respond with ONLY a JSON object keyed by language code:
{{"en": {{"title": "...", "body": "...", "short_description": "..."}}, ...}}"#,
        codes = codes.join(", "),
    )
}
