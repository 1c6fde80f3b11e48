//! Telegram Bot API moderation channel

use async_trait::async_trait;
use newsflow_domain::{ChannelError, ChannelMessageRef, ModerationChannel};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Moderation channel backed by a Telegram bot posting into a private group
pub struct TelegramChannel {
    client: Client,
    base_url: String,
    bot_token: SecretString,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString, chat_id: String) -> Result<Self, ChannelError> {
        Self::with_base_url(bot_token, chat_id, "https://api.telegram.org".to_string())
    }

    pub fn with_base_url(
        bot_token: SecretString,
        chat_id: String,
        base_url: String,
    ) -> Result<Self, ChannelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ChannelError::Api(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            bot_token,
            chat_id,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.base_url,
            self.bot_token.expose_secret(),
            method
        )
    }

    async fn call<T: Serialize>(
        &self,
        method: &str,
        body: &T,
    ) -> Result<reqwest::Response, ChannelError> {
        self.client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::Network(e.to_string()))
    }
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
}

#[derive(Serialize)]
struct EditMessageRequest<'a> {
    chat_id: &'a str,
    message_id: i64,
    text: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<SentMessage>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[async_trait]
impl ModerationChannel for TelegramChannel {
    async fn notify(&self, text: &str) -> Result<ChannelMessageRef, ChannelError> {
        let response = self
            .call(
                "sendMessage",
                &SendMessageRequest {
                    chat_id: &self.chat_id,
                    text,
                    reply_to_message_id: None,
                },
            )
            .await?;

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| ChannelError::Api(e.to_string()))?;

        if !parsed.ok {
            return Err(ChannelError::Api(
                parsed.description.unwrap_or_else(|| "unknown".to_string()),
            ));
        }

        let message = parsed
            .result
            .ok_or_else(|| ChannelError::Api("Missing message in response".to_string()))?;

        Ok(ChannelMessageRef {
            chat_id: self.chat_id.clone(),
            message_id: message.message_id,
        })
    }

    async fn edit_message(
        &self,
        message: &ChannelMessageRef,
        text: &str,
    ) -> Result<(), ChannelError> {
        let response = self
            .call(
                "editMessageText",
                &EditMessageRequest {
                    chat_id: &message.chat_id,
                    message_id: message.message_id,
                    text,
                },
            )
            .await?;

        // Telegram answers 400 when the message is too old or unchanged
        let status = response.status();
        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| ChannelError::Api(e.to_string()))?;

        if !parsed.ok {
            let description = parsed.description.unwrap_or_else(|| "unknown".to_string());
            if status == 400 {
                return Err(ChannelError::EditRejected(description));
            }
            return Err(ChannelError::Api(description));
        }

        Ok(())
    }

    async fn send_fallback(
        &self,
        reply_to: &ChannelMessageRef,
        text: &str,
    ) -> Result<(), ChannelError> {
        let response = self
            .call(
                "sendMessage",
                &SendMessageRequest {
                    chat_id: &reply_to.chat_id,
                    text,
                    reply_to_message_id: Some(reply_to.message_id),
                },
            )
            .await?;

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| ChannelError::Api(e.to_string()))?;

        if !parsed.ok {
            return Err(ChannelError::Api(
                parsed.description.unwrap_or_else(|| "unknown".to_string()),
            ));
        }

        Ok(())
    }
}

/// Channel used when moderation is not configured. Notifications go to the
/// log; edits and fallbacks are no-ops.
#[derive(Default)]
pub struct NullChannel;

#[async_trait]
impl ModerationChannel for NullChannel {
    async fn notify(&self, text: &str) -> Result<ChannelMessageRef, ChannelError> {
        tracing::info!(text = text, "Moderation notification (channel disabled)");
        Ok(ChannelMessageRef {
            chat_id: String::new(),
            message_id: 0,
        })
    }

    async fn edit_message(
        &self,
        _message: &ChannelMessageRef,
        _text: &str,
    ) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn send_fallback(
        &self,
        _reply_to: &ChannelMessageRef,
        _text: &str,
    ) -> Result<(), ChannelError> {
        Ok(())
    }
}
