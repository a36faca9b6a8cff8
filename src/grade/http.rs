use std::path::Path;

use anyhow::Result;

use crate::config::GradingConfig;
use crate::grade::backend::{GradeError, GradeReport, GradingBackend};

/// HTTP client for the transcript grading service.
pub struct HttpGradingBackend {
    endpoint: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for HttpGradingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGradingBackend")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl HttpGradingBackend {
    pub fn from_config(config: &GradingConfig) -> Result<Self> {
        let endpoint = if config.endpoint.is_empty() {
            anyhow::bail!(
                "Grading endpoint not configured. Set [grading] endpoint in callgrade.toml"
            );
        } else {
            config.endpoint.trim_end_matches('/').to_string()
        };

        // Key is optional: a local grading service runs unauthenticated.
        let api_key = if !config.api_key.is_empty() {
            config.api_key.clone()
        } else {
            std::env::var("CALLGRADE_API_KEY").unwrap_or_default()
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            endpoint,
            api_key,
            client,
        })
    }
}

impl GradingBackend for HttpGradingBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn grade(&self, transcript_path: &Path) -> Result<GradeReport, GradeError> {
        let raw = std::fs::read_to_string(transcript_path)?;
        let payload: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| GradeError::InvalidTranscript(e.to_string()))?;

        let url = format!("{}/api/grade", self.endpoint);
        let mut request = self.client.post(&url).json(&payload);
        if !self.api_key.is_empty() {
            request = request.header("api-key", &self.api_key);
        }

        let response = request
            .send()
            .map_err(|e| GradeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(GradeError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<GradeReport>()
            .map_err(|e| GradeError::MalformedResponse(e.to_string()))
    }
}
