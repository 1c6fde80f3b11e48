//! Pipeline policy: process-wide, hot-reloadable publication flags
//!
//! The policy is read from the `PolicyStore` port at each decision point and
//! treated as an immutable value for the duration of that decision. Changes
//! take effect on the next item processed, never retroactively.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{Language, Platform};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelinePolicy {
    /// When false, every raw item is approved without an AI moderation pass
    #[serde(default = "default_true")]
    pub pre_moderation_enabled: bool,

    /// When false, approved items wait for human approval before publishing
    #[serde(default)]
    pub auto_publish_enabled: bool,

    /// Platforms to fan out to when publishing
    #[serde(default)]
    pub auto_publish_platforms: BTreeSet<Platform>,

    /// Languages to fan out in when publishing
    #[serde(default = "default_languages")]
    pub auto_publish_languages: BTreeSet<Language>,
}

fn default_true() -> bool {
    true
}

fn default_languages() -> BTreeSet<Language> {
    BTreeSet::from([Language::En])
}

impl Default for PipelinePolicy {
    fn default() -> Self {
        Self {
            pre_moderation_enabled: true,
            auto_publish_enabled: false,
            auto_publish_platforms: BTreeSet::new(),
            auto_publish_languages: default_languages(),
        }
    }
}

impl PipelinePolicy {
    /// (platform, language) pairs enabled for distribution
    pub fn distribution_pairs(&self) -> Vec<(Platform, Language)> {
        self.auto_publish_platforms
            .iter()
            .flat_map(|platform| {
                self.auto_publish_languages
                    .iter()
                    .map(move |language| (*platform, *language))
            })
            .collect()
    }
}
