//! Action-item extraction client.
//!
//! Sends a fixed two-message chat payload (build-time system instruction plus
//! the transcript) to the configured chat-completions endpoint and returns
//! the first completion's text, trimmed. An empty result is valid: the model
//! may legitimately find no tasks.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{RemoteClientError, RequestAuth, TaskExtractor};
use crate::config::Settings;

/// System instruction, fixed at build time.
const TASK_PROMPT: &str = "You are a note-taking assistant. Extract every action item, task, \
commitment, or follow-up from the following voice-note transcript and return them as a Markdown \
checklist, one `- [ ]` entry per item, including who is responsible when mentioned. Return only \
the checklist with no commentary. If the transcript contains no action items, return nothing.";

pub struct AnalysisClient {
    settings: Settings,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl AnalysisClient {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client for AnalysisClient")?;

        Ok(Self { settings, client })
    }

    fn extract_text(response: &ChatCompletionResponse) -> Result<String, RemoteClientError> {
        response
            .choices
            .first()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| {
                RemoteClientError::InvalidResponse("No choices in completion response".to_string())
            })
    }
}

#[async_trait]
impl TaskExtractor for AnalysisClient {
    async fn analyze(&self, transcript: &str) -> Result<String, RemoteClientError> {
        let auth = RequestAuth::from_settings(&self.settings)?;

        let request_body = ChatCompletionRequest {
            model: self.settings.analysis_model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: TASK_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: transcript.to_string(),
                },
            ],
            temperature: 0.2,
        };

        let response = auth
            .apply(self.client.post(&self.settings.analysis_url))
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteClientError::Remote { status, message });
        }

        let chat_response: ChatCompletionResponse = response.json().await.map_err(|e| {
            RemoteClientError::InvalidResponse(format!("Failed to parse completion response: {}", e))
        })?;

        Self::extract_text(&chat_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_fails_before_any_network_call() {
        let mut settings = Settings::default();
        settings.analysis_url = "http://127.0.0.1:1/v1/chat/completions".to_string();

        let client = AnalysisClient::new(settings).unwrap();
        let result = client.analyze("a transcript").await;

        assert!(matches!(result, Err(RemoteClientError::MissingApiKey)));
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatCompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: TASK_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: "buy milk tomorrow".to_string(),
                },
            ],
            temperature: 0.2,
        };

        let json = serde_json::to_string(&request).expect("Failed to serialize");
        assert!(json.contains("gpt-4o-mini"));
        assert!(json.contains("system"));
        assert!(json.contains("buy milk tomorrow"));
        assert!(json.contains("temperature"));
    }

    #[test]
    fn test_response_extraction() {
        let json = r#"{
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "- [ ] buy milk\n"},
                "finish_reason": "stop"
            }]
        }"#;

        let response: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            AnalysisClient::extract_text(&response).unwrap(),
            "- [ ] buy milk"
        );
    }

    #[test]
    fn test_empty_completion_is_valid() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": "  "}}]}"#;
        let response: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(AnalysisClient::extract_text(&response).unwrap(), "");
    }

    #[test]
    fn test_no_choices_is_an_error() {
        let json = r#"{"choices": []}"#;
        let response: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            AnalysisClient::extract_text(&response),
            Err(RemoteClientError::InvalidResponse(_))
        ));
    }
}
