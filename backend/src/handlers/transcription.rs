//! Voice transcription HTTP handler
//!
//! Forwards a recorded voice note to the hosted transcription service; the
//! app prefills the entry description with the returned transcript.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::error::AppResult;
use crate::external::transcription::{Transcript, TranscriptionClient};
use crate::middleware::CurrentUser;
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeRequest {
    /// Base64-encoded audio clip
    pub audio: String,
    /// MIME type of the recording, e.g. "audio/webm"
    pub mime_type: String,
}

/// Transcribe a recorded voice note
pub async fn transcribe(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Json(body): Json<TranscribeRequest>,
) -> AppResult<Json<Transcript>> {
    let client = TranscriptionClient::new(
        state.config.transcription.api_key.clone(),
        state.config.transcription.api_endpoint.clone(),
    );

    let transcript = client.transcribe(&body.audio, &body.mime_type).await?;
    Ok(Json(transcript))
}
