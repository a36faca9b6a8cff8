use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One speaker turn. The interval is in seconds relative to the start of the
/// paired audio; segment order follows the artifact and is assumed
/// non-decreasing in `start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    #[serde(default = "unknown_speaker")]
    pub speaker: String,
    #[serde(default)]
    pub text: String,
    pub start: f64,
    pub end: f64,
}

fn unknown_speaker() -> String {
    "unknown".to_string()
}

/// A transcript artifact as produced by the transcription pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
    /// Path of the paired audio file, if the pipeline recorded one.
    #[serde(default)]
    pub audio_file: Option<String>,
}

impl Transcript {
    /// Load and normalize a transcript artifact from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read transcript {}", path.display()))?;
        let mut transcript: Transcript = serde_json::from_str(&content)
            .with_context(|| format!("Invalid transcript JSON in {}", path.display()))?;
        transcript.normalize();
        Ok(transcript)
    }

    /// Trim segment text and fall back to "unknown" for blank speakers, the
    /// same cleanup the review UI applies.
    pub fn normalize(&mut self) {
        for segment in &mut self.segments {
            segment.text = segment.text.trim().to_string();
            if segment.speaker.is_empty() {
                segment.speaker = unknown_speaker();
            }
        }
    }

    /// "No transcript loaded" is a defined state, not an error.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
