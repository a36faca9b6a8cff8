use std::path::Path;

use anyhow::{Context, Result};
use reqwest::blocking::multipart;

use crate::config::TranscriptionConfig;

/// Forward a `.zip` call-recording archive to the remote transcription
/// service. Archives bypass the classification/grading pipeline entirely;
/// the service unpacks, separates speakers, and transcribes on its side.
pub fn forward_archive(config: &TranscriptionConfig, archive_path: &Path) -> Result<serde_json::Value> {
    if config.endpoint.is_empty() {
        anyhow::bail!(
            "Transcription endpoint not configured. Set [transcription] endpoint in callgrade.toml"
        );
    }
    let url = format!("{}/api/transcribe", config.endpoint.trim_end_matches('/'));

    let file_bytes = std::fs::read(archive_path)
        .with_context(|| format!("Failed to read archive {}", archive_path.display()))?;
    let filename = archive_path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("archive path has no filename: {}", archive_path.display()))?
        .to_string_lossy()
        .to_string();

    let form = multipart::Form::new().part(
        "file",
        multipart::Part::bytes(file_bytes)
            .file_name(filename.clone())
            .mime_str("application/zip")?,
    );

    tracing::info!("Forwarding archive {} to {}", filename, url);

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_secs))
        .build()?;
    let response = client.post(&url).multipart(form).send()?;

    let response = response.error_for_status()?;
    let body: serde_json::Value = response
        .json()
        .context("Failed to parse transcription response")?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_archive_missing_endpoint() {
        let config = TranscriptionConfig {
            endpoint: String::new(),
            timeout_secs: 300,
        };
        let result = forward_archive(&config, Path::new("calls.zip"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("endpoint"));
    }

    #[test]
    fn test_forward_archive_missing_file() {
        let config = TranscriptionConfig::default();
        let result = forward_archive(&config, Path::new("/nonexistent/calls.zip"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to read archive"));
    }
}
