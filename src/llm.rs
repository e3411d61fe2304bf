//! LLM provider client
//!
//! Reqwest-backed, OpenAI-compatible chat-completions client implementing
//! the `CompletionClient` contract. A dummy API key short-circuits to a
//! canned offline response so demos and tests run without network access.

use async_trait::async_trait;

use crate::contracts::{CompletionClient, CompletionOptions};
use crate::error::{PipelineError, Result};

pub const DUMMY_API_KEY: &str = "dummy-api-key";

pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String> {
        if self.api_key == DUMMY_API_KEY {
            return Ok(
                r#"[{"sql": "SELECT 'offline mode' AS Notice", "explanation": "Offline dummy response"}]"#
                    .to_string(),
            );
        }

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You are a precise JSON-only responder. Always return valid JSON, no other text."},
                {"role": "user", "content": prompt}
            ],
            "temperature": options.temperature,
            "max_tokens": options.max_tokens
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Llm(format!("LLM API call failed: {e}")))?;

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::Llm(format!("Failed to parse LLM response: {e}")))?;

        // An empty completion is a valid "no answer"; only a malformed
        // payload is an error.
        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| PipelineError::Llm("No content in LLM response".to_string()))?;

        Ok(content.to_string())
    }
}
