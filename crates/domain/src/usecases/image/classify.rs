//! Structured generation path: article classifier + fixed prompt templates

use serde::Deserialize;

use crate::ports::{AiError, ChatModel, ChatRequest};
use crate::util::extract_json;

/// Structured classification of an article for templated prompt generation
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleProfile {
    pub company_name: String,
    pub category: String,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub key_features: Vec<String>,
    #[serde(default)]
    pub visual_elements: Vec<String>,
    pub visual_concept: String,
    #[serde(default)]
    pub color_scheme: Option<String>,
}

#[derive(Deserialize)]
struct ProfileJson {
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    product_type: Option<String>,
    #[serde(default)]
    key_features: Vec<String>,
    #[serde(default)]
    visual_elements: Vec<String>,
    #[serde(default)]
    visual_concept: Option<String>,
    #[serde(default)]
    color_scheme: Option<String>,
}

/// Run the classifier. Missing any of company_name/category/visual_concept
/// is treated as a classifier failure (the template cannot be filled).
pub async fn classify_article<C: ChatModel + ?Sized>(
    model: &C,
    title: &str,
    body: &str,
) -> Result<ArticleProfile, AiError> {
    let request = ChatRequest::new(
        "You are a visual classifier extracting structured facts from news \
         articles. Output only valid JSON.",
        build_classifier_prompt(title, body),
    )
    .with_max_tokens(500);

    let text = model.complete(request).await?;
    let parsed: ProfileJson = serde_json::from_str(extract_json(&text))
        .map_err(|e| AiError::InvalidFormat(e.to_string()))?;

    let (Some(company_name), Some(category), Some(visual_concept)) = (
        non_empty(parsed.company_name),
        non_empty(parsed.category),
        non_empty(parsed.visual_concept),
    ) else {
        return Err(AiError::InvalidFormat(
            "Classifier output missing company_name, category, or visual_concept".to_string(),
        ));
    };

    Ok(ArticleProfile {
        company_name,
        category,
        product_type: non_empty(parsed.product_type),
        key_features: parsed.key_features,
        visual_elements: parsed.visual_elements,
        visual_concept,
        color_scheme: non_empty(parsed.color_scheme),
    })
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

/// Fixed per-category prompt templates with default color pairs.
/// Unknown categories fall through to the generic template.
struct CategoryTemplate {
    category: &'static str,
    template: &'static str,
    colors: (&'static str, &'static str),
}

const CATEGORY_TEMPLATES: &[CategoryTemplate] = &[
    CategoryTemplate {
        category: "finance",
        template: "Clean editorial illustration for {company}: {concept}. \
                   Geometric composition with charts dissolving into {elements}. \
                   Primary color {primary}, accents in {accent}.",
        colors: ("deep navy", "gold"),
    },
    CategoryTemplate {
        category: "technology",
        template: "Modern isometric illustration for {company}: {concept}. \
                   Circuit-like structures forming {elements}. \
                   Primary color {primary}, accents in {accent}.",
        colors: ("midnight blue", "electric cyan"),
    },
    CategoryTemplate {
        category: "health",
        template: "Soft editorial illustration for {company}: {concept}. \
                   Organic shapes interleaved with {elements}. \
                   Primary color {primary}, accents in {accent}.",
        colors: ("sage green", "warm white"),
    },
    CategoryTemplate {
        category: "energy",
        template: "Bold editorial illustration for {company}: {concept}. \
                   Flowing currents of light across {elements}. \
                   Primary color {primary}, accents in {accent}.",
        colors: ("charcoal", "amber"),
    },
    CategoryTemplate {
        category: "consumer",
        template: "Friendly flat illustration for {company}: {concept}. \
                   Everyday objects arranged into {elements}. \
                   Primary color {primary}, accents in {accent}.",
        colors: ("coral", "cream"),
    },
];

const GENERIC_TEMPLATE: CategoryTemplate = CategoryTemplate {
    category: "general",
    template: "Editorial illustration for {company}: {concept}. \
               Balanced composition featuring {elements}. \
               Primary color {primary}, accents in {accent}.",
    colors: ("slate blue", "soft orange"),
};

/// Fill the category template into the final generation prompt
pub fn build_structured_prompt(profile: &ArticleProfile) -> String {
    let template = CATEGORY_TEMPLATES
        .iter()
        .find(|t| t.category == profile.category.to_lowercase())
        .unwrap_or(&GENERIC_TEMPLATE);

    let (primary, accent) = match &profile.color_scheme {
        Some(scheme) => (scheme.as_str(), template.colors.1),
        None => template.colors,
    };

    let elements = if profile.visual_elements.is_empty() {
        profile
            .product_type
            .clone()
            .unwrap_or_else(|| "abstract shapes".to_string())
    } else {
        profile.visual_elements.join(", ")
    };

    let mut prompt = template
        .template
        .replace("{company}", &profile.company_name)
        .replace("{concept}", &profile.visual_concept)
        .replace("{elements}", &elements)
        .replace("{primary}", primary)
        .replace("{accent}", accent);

    if !profile.key_features.is_empty() {
        prompt.push_str(&format!(
            " Subtly reference: {}.",
            profile.key_features.join(", ")
        ));
    }

    prompt.push_str(" No text, no letters, no logos.");
    prompt
}

fn build_classifier_prompt(title: &str, body: &str) -> String {
    format!(
        r#"Extract structured facts for image generation from this article.

Title: {title}

Body:
{body}

Respond with ONLY a JSON object:
{{"company_name": "main organization or actor",
  "category": "finance|technology|health|energy|consumer|general",
  "product_type": "what is being announced, if anything",
  "key_features": ["up to 3"],
  "visual_elements": ["up to 3 concrete objects to draw"],
  "visual_concept": "one sentence describing the scene",
  "color_scheme": "optional dominant color"}}"#
    )
}
