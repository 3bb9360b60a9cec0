//! Remote API clients.
//!
//! Two thin HTTP wrappers: speech-to-text (multipart upload) and action-item
//! extraction (chat completions). Both share the auth strategy and the error
//! taxonomy. No retries anywhere: a failure is terminal for the reference on
//! this pass and the batch moves on.

pub mod analyze;
pub mod transcribe;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::Settings;

pub use analyze::AnalysisClient;
pub use transcribe::TranscriptionClient;

/// Errors from the remote clients
#[derive(Debug, Error)]
pub enum RemoteClientError {
    /// Checked before any network call is made
    #[error("No API key or auth header configured")]
    MissingApiKey,

    #[error("Remote endpoint returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

/// Closed set of request auth strategies, selected by which settings fields
/// are populated. A configured gateway header wins over the plain API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestAuth {
    /// Direct deployment: `Authorization: Bearer <api_key>`
    Bearer(String),

    /// Gateway deployment: the configured value is sent verbatim
    Gateway(String),
}

impl RequestAuth {
    /// Pick the strategy for the current settings, failing pre-flight when
    /// neither field is populated.
    pub fn from_settings(settings: &Settings) -> Result<Self, RemoteClientError> {
        if !settings.auth_header.is_empty() {
            Ok(Self::Gateway(settings.auth_header.clone()))
        } else if !settings.api_key.is_empty() {
            Ok(Self::Bearer(settings.api_key.clone()))
        } else {
            Err(RemoteClientError::MissingApiKey)
        }
    }

    /// Attach the Authorization header to a request.
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::Bearer(key) => request.bearer_auth(key),
            Self::Gateway(value) => request.header(reqwest::header::AUTHORIZATION, value.clone()),
        }
    }
}

/// Speech-to-text seam, implemented by [`TranscriptionClient`] and by
/// in-memory fakes in tests.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe raw audio bytes to plain text.
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str)
        -> Result<String, RemoteClientError>;
}

/// Action-item extraction seam.
#[async_trait]
pub trait TaskExtractor: Send + Sync {
    /// Extract a task list from a transcript. Empty output is a valid,
    /// non-error outcome.
    async fn analyze(&self, transcript: &str) -> Result<String, RemoteClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_requires_some_credential() {
        let settings = Settings::default();
        assert!(matches!(
            RequestAuth::from_settings(&settings),
            Err(RemoteClientError::MissingApiKey)
        ));
    }

    #[test]
    fn test_bearer_selected_from_api_key() {
        let mut settings = Settings::default();
        settings.api_key = "sk-test".to_string();

        let auth = RequestAuth::from_settings(&settings).unwrap();
        assert_eq!(auth, RequestAuth::Bearer("sk-test".to_string()));
    }

    #[test]
    fn test_gateway_header_wins_over_api_key() {
        let mut settings = Settings::default();
        settings.api_key = "sk-test".to_string();
        settings.auth_header = "Custom token".to_string();

        let auth = RequestAuth::from_settings(&settings).unwrap();
        assert_eq!(auth, RequestAuth::Gateway("Custom token".to_string()));
    }
}
