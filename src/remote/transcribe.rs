//! Speech-to-text client.
//!
//! Packages audio bytes into a multipart request against the configured
//! transcription endpoint. Handles both a plain-text and a JSON `{"text": …}`
//! response body.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use super::{RemoteClientError, RequestAuth, SpeechToText};
use crate::config::Settings;

pub struct TranscriptionClient {
    settings: Settings,
    client: reqwest::Client,
}

impl TranscriptionClient {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client for TranscriptionClient")?;

        Ok(Self { settings, client })
    }
}

#[async_trait]
impl SpeechToText for TranscriptionClient {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        file_name: &str,
    ) -> Result<String, RemoteClientError> {
        // Pre-flight: no credentials means no network call at all
        let auth = RequestAuth::from_settings(&self.settings)?;

        let part = Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str(mime_for(file_name))?;

        let mut form = Form::new()
            .part("file", part)
            .text("model", self.settings.model.clone());
        if !self.settings.language.is_empty() {
            form = form.text("language", self.settings.language.clone());
        }
        if !self.settings.prompt.is_empty() {
            form = form.text("prompt", self.settings.prompt.clone());
        }

        let response = auth
            .apply(self.client.post(&self.settings.transcription_url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteClientError::Remote { status, message });
        }

        let body = response.text().await?;
        extract_transcript(&body)
    }
}

/// The endpoint may answer with JSON or with the bare transcript.
fn extract_transcript(body: &str) -> Result<String, RemoteClientError> {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value
            .get("text")
            .and_then(|t| t.as_str())
            .map(|t| t.trim().to_string())
            .ok_or_else(|| {
                RemoteClientError::InvalidResponse("No text field in JSON body".to_string())
            }),
        Err(_) => Ok(body.trim().to_string()),
    }
}

fn mime_for(file_name: &str) -> &'static str {
    match file_name.rsplit_once('.').map(|(_, ext)| ext) {
        Some(ext) if ext.eq_ignore_ascii_case("m4a") => "audio/mp4",
        Some(ext) if ext.eq_ignore_ascii_case("mp3") => "audio/mpeg",
        Some(ext) if ext.eq_ignore_ascii_case("wav") => "audio/wav",
        Some(ext) if ext.eq_ignore_ascii_case("ogg") => "audio/ogg",
        Some(ext) if ext.eq_ignore_ascii_case("webm") => "audio/webm",
        Some(ext) if ext.eq_ignore_ascii_case("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}
