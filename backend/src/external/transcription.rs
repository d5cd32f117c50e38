//! Client for the hosted voice-transcription service
//!
//! The logbook app records a voice note and the backend forwards the audio
//! here; the returned transcript prefills the entry description. The model
//! itself is an external service, we only consume its HTTP API.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Transcription API client
#[derive(Clone)]
pub struct TranscriptionClient {
    client: Client,
    api_key: String,
    base_url: String,
}

/// Request body for the transcription endpoint
#[derive(Debug, Serialize)]
struct TranscribeRequest<'a> {
    /// Base64-encoded audio
    audio: &'a str,
    /// MIME type of the recording, e.g. "audio/webm"
    mime_type: &'a str,
    language: &'a str,
}

/// Response from the transcription endpoint
#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    text: String,
    #[serde(default)]
    confidence: Option<f64>,
}

/// A completed transcription
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub text: String,
    pub confidence: Option<f64>,
}

impl TranscriptionClient {
    /// Create a new TranscriptionClient
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    /// Transcribe a base64-encoded audio clip
    pub async fn transcribe(&self, audio_base64: &str, mime_type: &str) -> AppResult<Transcript> {
        // Reject malformed audio before forwarding
        let decoded = BASE64.decode(audio_base64).map_err(|_| AppError::Validation {
            field: "audio".to_string(),
            message: "Audio must be base64-encoded".to_string(),
        })?;
        if decoded.is_empty() {
            return Err(AppError::Validation {
                field: "audio".to_string(),
                message: "Audio clip is empty".to_string(),
            });
        }

        let url = format!("{}/v1/transcribe", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&TranscribeRequest {
                audio: audio_base64,
                mime_type,
                language: "en",
            })
            .send()
            .await
            .map_err(|e| AppError::TranscriptionError(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::TranscriptionError(format!(
                "{} - {}",
                status, body
            )));
        }

        let data: TranscribeResponse = response
            .json()
            .await
            .map_err(|e| AppError::TranscriptionError(format!("invalid response: {}", e)))?;

        Ok(Transcript {
            text: data.text,
            confidence: data.confidence,
        })
    }
}
