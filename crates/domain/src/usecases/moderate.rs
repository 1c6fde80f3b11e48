//! Pre-moderation gate: AI classifier approving/rejecting raw items

use serde::Deserialize;

use crate::ports::{ChatModel, ChatRequest};
use crate::util::extract_json;

/// Outcome of a moderation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationVerdict {
    pub approved: bool,
    pub reason: Option<String>,
}

impl ModerationVerdict {
    pub fn approved() -> Self {
        Self {
            approved: true,
            reason: None,
        }
    }
}

#[derive(Deserialize)]
struct VerdictJson {
    approved: bool,
    #[serde(default)]
    reason: Option<String>,
}

/// AI pre-moderation gate.
///
/// Fail-open by policy: when the classifier is unreachable or returns
/// garbage, the item is approved so that an infrastructure outage never
/// silently blocks the whole content pipeline.
pub struct PreModerationGate<C: ChatModel> {
    model: C,
}

impl<C: ChatModel> PreModerationGate<C> {
    pub fn new(model: C) -> Self {
        Self { model }
    }

    /// Review title+body. Never returns an error; failures approve.
    pub async fn review(&self, title: &str, body: &str) -> ModerationVerdict {
        let request = ChatRequest::new(
            "You are a content moderation classifier for a news site. \
             Output only valid JSON.",
            build_moderation_prompt(title, body),
        )
        .with_max_tokens(300);

        match self.model.complete(request).await {
            Ok(text) => match serde_json::from_str::<VerdictJson>(extract_json(&text)) {
                Ok(verdict) => ModerationVerdict {
                    reason: if verdict.approved {
                        None
                    } else {
                        verdict.reason
                    },
                    approved: verdict.approved,
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Unparseable moderation verdict, approving");
                    ModerationVerdict::approved()
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Moderation call failed, approving (fail-open)");
                ModerationVerdict::approved()
            }
        }
    }
}

fn build_moderation_prompt(title: &str, body: &str) -> String {
    format!(
        r#"Decide whether the following article is acceptable for publication.
Reject spam, scams, explicit content, and items with no news value.

Title: {title}

Body:
{body}

Respond with ONLY a JSON object:
{{"approved": true or false, "reason": "required when approved is false"}}"#
    )
}
