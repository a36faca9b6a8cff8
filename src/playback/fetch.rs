use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::TranscriptionConfig;
use crate::playback::transcript::Transcript;

/// Response envelope of the transcription service's by-id endpoint.
#[derive(Debug, Deserialize)]
struct TranscriptionEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Transcript>,
    #[serde(default)]
    audio_file: Option<String>,
}

/// A stored transcription fetched by id, with the audio file it was made
/// from when the service knows it.
#[derive(Debug)]
pub struct FetchedTranscription {
    pub transcript: Transcript,
    pub audio_file: Option<String>,
}

/// Client for fetching stored transcriptions from the transcription service.
#[derive(Debug)]
pub struct TranscriptFetcher {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl TranscriptFetcher {
    pub fn from_config(config: &TranscriptionConfig) -> Result<Self> {
        if config.endpoint.is_empty() {
            anyhow::bail!(
                "Transcription endpoint not configured. Set [transcription] endpoint in callgrade.toml"
            );
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Fetch a transcription by id. Not-found is a non-fatal outcome: the
    /// caller shows an empty placeholder instead of failing.
    pub fn fetch(&self, id: &str) -> Result<Option<FetchedTranscription>> {
        let url = format!("{}/api/transcriptions/{}", self.endpoint, id);
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("Failed to fetch transcription {}", id))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::warn!("Transcription {} not found", id);
            return Ok(None);
        }
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!(
                "Transcription service returned HTTP {} for {}",
                status.as_u16(),
                id
            );
        }

        let envelope: TranscriptionEnvelope = response
            .json()
            .context("Failed to parse transcription response")?;

        match envelope.data {
            Some(mut transcript) if envelope.success => {
                transcript.normalize();
                Ok(Some(FetchedTranscription {
                    transcript,
                    audio_file: envelope.audio_file,
                }))
            }
            _ => {
                tracing::warn!("Transcription {} has no data", id);
                Ok(None)
            }
        }
    }
}
