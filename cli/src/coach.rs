use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use fitlog_core::chat::{ChatBackend, ChatError, TRAINER_PERSONA};
use fitlog_core::models::{ChatMessage, ChatRole};

use crate::config::Config;

/// Chat-completions client for any OpenAI-compatible endpoint.
pub struct CompletionClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl CompletionClient {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!("fitlog-cli/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");
        CompletionClient {
            client,
            base_url: config.chat_base_url(),
            model: config.chat_model(),
            api_key: config.chat_api_key(),
        }
    }

    fn request_body(&self, messages: &[ChatMessage]) -> serde_json::Value {
        let mut formatted = vec![serde_json::json!({
            "role": "system",
            "content": TRAINER_PERSONA,
        })];
        formatted.extend(messages.iter().map(|m| {
            serde_json::json!({
                "role": match m.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                },
                "content": m.content,
            })
        }));

        serde_json::json!({
            "model": self.model,
            "messages": formatted,
            "temperature": 0.7,
            "max_tokens": 1000,
        })
    }
}

#[async_trait]
impl ChatBackend for CompletionClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let Some(api_key) = &self.api_key else {
            return Err(ChatError::NotConfigured);
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&self.request_body(messages))
            .send()
            .await
            .map_err(|e| ChatError::Backend(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ChatError::RateLimited);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            let detail = body["error"]["message"]
                .as_str()
                .unwrap_or("request failed")
                .to_string();
            return Err(ChatError::Backend(format!("{detail} (HTTP {status})")));
        }

        let completion: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| ChatError::Backend(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ChatError::Backend("No response from model".to_string()))
    }
}
