//! Critic pass: vision-model scoring of a rendered image

use serde::Deserialize;

use crate::ports::VisionModel;
use crate::util::extract_json;

/// Parsed critique of one rendered image
#[derive(Debug, Clone, Deserialize)]
pub struct Critique {
    #[serde(default)]
    pub relevance: Option<f64>,
    #[serde(default)]
    pub quality: Option<f64>,
    #[serde(default)]
    pub branding: Option<f64>,
    #[serde(default)]
    pub artifacts: Vec<String>,
    #[serde(default)]
    pub text_issues: Vec<String>,
    pub overall_score: f64,
    #[serde(default)]
    pub improvement_suggestions: Vec<String>,
}

impl Critique {
    /// A passing default used when the critic itself is unreachable: the
    /// workflow must never be blocked indefinitely by an unreachable
    /// validator.
    pub fn pass_by_default() -> Self {
        Self {
            relevance: None,
            quality: None,
            branding: None,
            artifacts: Vec::new(),
            text_issues: Vec::new(),
            overall_score: 7.0,
            improvement_suggestions: Vec::new(),
        }
    }

    pub fn issues(&self) -> Vec<String> {
        let mut issues = self.artifacts.clone();
        issues.extend(self.text_issues.iter().cloned());
        issues
    }

    /// Valid when the score clears 6 and at most 2 issues were found
    pub fn is_valid(&self) -> bool {
        self.overall_score >= 6.0 && self.issues().len() <= 2
    }

    /// Retry only the middling band: scores in [4, 6) where another attempt
    /// plausibly helps. Below 4 the approach itself is wrong.
    pub fn should_retry(&self) -> bool {
        !self.is_valid() && self.overall_score >= 4.0 && self.overall_score < 6.0
    }
}

/// Score a rendered image against its prompt and article context.
/// Fail-open: any critic failure returns `pass_by_default()`.
pub async fn critique_image<V: VisionModel + ?Sized>(
    vision: &V,
    generation_prompt: &str,
    article_title: &str,
    image_url: &str,
) -> Critique {
    let prompt = build_critic_prompt(generation_prompt, article_title);

    let text = match vision.critique(&prompt, image_url).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "Critic call failed, passing by default");
            return Critique::pass_by_default();
        }
    };

    match serde_json::from_str::<Critique>(extract_json(&text)) {
        Ok(critique) => critique,
        Err(e) => {
            tracing::warn!(error = %e, "Unparseable critique, passing by default");
            Critique::pass_by_default()
        }
    }
}

fn build_critic_prompt(generation_prompt: &str, article_title: &str) -> String {
    format!(
        r#"You are reviewing a generated news illustration.

Article title: {article_title}

The image was generated from this prompt:
{generation_prompt}

Score it and respond with ONLY a JSON object:
{{"relevance": 0-10, "quality": 0-10, "branding": 0-10,
  "artifacts": ["visual defects"],
  "text_issues": ["any rendered text, letters, or watermarks"],
  "overall_score": 0-10,
  "should_retry": true or false,
  "improvement_suggestions": ["concrete changes for the next attempt"]}}"#
    )
}
