//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub moderation: ModerationConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub social: SocialConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_state_db_path")]
    pub state_db_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Base URL of the site where rewritten articles are published
    #[serde(default = "default_site_base_url")]
    pub site_base_url: String,

    /// Language codes items are rewritten into
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    #[serde(default = "default_ai_batch_size")]
    pub ai_batch_size: usize,

    #[serde(default = "default_ai_batch_delay_ms")]
    pub ai_batch_delay_ms: u64,

    #[serde(default = "default_image_retries")]
    pub max_image_retries: u32,

    #[serde(default)]
    pub propose_image_variants: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub rss_feeds: Vec<String>,

    #[serde(default)]
    pub telegram_channels: Vec<String>,

    /// Default poll interval applied to every source
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Per-source overrides keyed by source ID
    /// (e.g. "telegram:acme_news", "rss:https://ex.com/feed.xml")
    #[serde(default)]
    pub poll_interval_overrides: BTreeMap<String, u64>,

    #[serde(default = "default_comment_sync_interval")]
    pub comment_sync_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// "openai" or "stub" (fixed responses, for offline runs)
    #[serde(default = "default_ai_provider")]
    pub provider: String,

    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    #[serde(default = "default_image_model")]
    pub image_model: String,

    #[serde(default = "default_image_size")]
    pub image_size: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_retries")]
    pub retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_bot_token_env")]
    pub bot_token_env: String,

    /// Chat ID of the moderation group
    #[serde(default)]
    pub chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub base_url: String,

    #[serde(default = "default_storage_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_bucket")]
    pub bucket: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialConfig {
    #[serde(default)]
    pub instagram: InstagramSocialConfig,

    #[serde(default)]
    pub facebook: FacebookSocialConfig,

    #[serde(default)]
    pub linkedin: LinkedInSocialConfig,

    #[serde(default)]
    pub tiktok: TikTokSocialConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstagramSocialConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub user_id: String,

    #[serde(default = "default_meta_token_env")]
    pub access_token_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacebookSocialConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub page_id: String,

    #[serde(default = "default_meta_token_env")]
    pub access_token_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedInSocialConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub organization_id: String,

    #[serde(default = "default_linkedin_token_env")]
    pub access_token_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TikTokSocialConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_tiktok_token_env")]
    pub access_token_env: String,
}

// Default value functions
fn default_state_db_path() -> PathBuf {
    PathBuf::from("./newsflow.sqlite")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_site_base_url() -> String {
    "https://news.example.com".to_string()
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string(), "no".to_string(), "ua".to_string()]
}

fn default_ai_batch_size() -> usize {
    3
}

fn default_ai_batch_delay_ms() -> u64 {
    500
}

fn default_image_retries() -> u32 {
    2
}

fn default_poll_interval() -> u64 {
    300
}

fn default_comment_sync_interval() -> u64 {
    900
}

fn default_ai_provider() -> String {
    "openai".to_string()
}

fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_vision_model() -> String {
    "gpt-4o".to_string()
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_image_size() -> String {
    "1792x1024".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_retries() -> u32 {
    2
}

fn default_bot_token_env() -> String {
    "TELEGRAM_BOT_TOKEN".to_string()
}

fn default_storage_api_key_env() -> String {
    "STORAGE_API_KEY".to_string()
}

fn default_bucket() -> String {
    "media".to_string()
}

fn default_meta_token_env() -> String {
    "META_ACCESS_TOKEN".to_string()
}

fn default_linkedin_token_env() -> String {
    "LINKEDIN_ACCESS_TOKEN".to_string()
}

fn default_tiktok_token_env() -> String {
    "TIKTOK_ACCESS_TOKEN".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            state_db_path: default_state_db_path(),
            log_level: default_log_level(),
            site_base_url: default_site_base_url(),
            languages: default_languages(),
            ai_batch_size: default_ai_batch_size(),
            ai_batch_delay_ms: default_ai_batch_delay_ms(),
            max_image_retries: default_image_retries(),
            propose_image_variants: false,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            rss_feeds: vec![],
            telegram_channels: vec![],
            poll_interval_secs: default_poll_interval(),
            poll_interval_overrides: BTreeMap::new(),
            comment_sync_interval_secs: default_comment_sync_interval(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            provider: default_ai_provider(),
            api_key_env: default_openai_api_key_env(),
            base_url: default_openai_base_url(),
            model: default_chat_model(),
            vision_model: default_vision_model(),
            image_model: default_image_model(),
            image_size: default_image_size(),
            timeout_secs: default_timeout(),
            retries: default_retries(),
        }
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token_env: default_bot_token_env(),
            chat_id: String::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: String::new(),
            api_key_env: default_storage_api_key_env(),
            bucket: default_bucket(),
        }
    }
}

impl Default for InstagramSocialConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            user_id: String::new(),
            access_token_env: default_meta_token_env(),
        }
    }
}

impl Default for FacebookSocialConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            page_id: String::new(),
            access_token_env: default_meta_token_env(),
        }
    }
}

impl Default for LinkedInSocialConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            organization_id: String::new(),
            access_token_env: default_linkedin_token_env(),
        }
    }
}

impl Default for TikTokSocialConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            access_token_env: default_tiktok_token_env(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("NEWSFLOW")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# newsflow configuration

[general]
state_db_path = "./newsflow.sqlite"
log_level = "info"
site_base_url = "https://news.example.com"
languages = ["en", "no", "ua"]
ai_batch_size = 3
ai_batch_delay_ms = 500
max_image_retries = 2
propose_image_variants = false

[sources]
rss_feeds = ["https://news.example.com/feed.xml"]
telegram_channels = ["acme_news"]
poll_interval_secs = 300
comment_sync_interval_secs = 900

# Per-source overrides of poll_interval_secs, keyed by source ID
# [sources.poll_interval_overrides]
# "telegram:acme_news" = 120

[openai]
# "openai" or "stub" (fixed responses, no API key needed)
provider = "openai"
api_key_env = "OPENAI_API_KEY"
base_url = "https://api.openai.com/v1"
model = "gpt-4o-mini"
vision_model = "gpt-4o"
image_model = "dall-e-3"
image_size = "1792x1024"
timeout_secs = 60
retries = 2

[moderation]
enabled = false
bot_token_env = "TELEGRAM_BOT_TOKEN"
# chat_id = "-1001234567890"

[storage]
enabled = false
# base_url = "https://your-project.supabase.co"
api_key_env = "STORAGE_API_KEY"
bucket = "media"

[social.instagram]
enabled = false
# user_id = "17890000000000000"
access_token_env = "META_ACCESS_TOKEN"

[social.facebook]
enabled = false
# page_id = "100000000000000"
access_token_env = "META_ACCESS_TOKEN"

[social.linkedin]
enabled = false
# organization_id = "12345678"
access_token_env = "LINKEDIN_ACCESS_TOKEN"

[social.tiktok]
enabled = false
access_token_env = "TIKTOK_ACCESS_TOKEN"
"#
        .to_string()
    }
}
