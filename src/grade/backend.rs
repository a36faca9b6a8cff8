use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::records::{FileGrade, QuestionResult};

/// Structured evaluation payload returned by the grading service for one
/// transcript. Unknown response fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeReport {
    pub grade_percentage: f64,
    #[serde(default)]
    pub detected_nature_code: Option<String>,
    #[serde(default)]
    pub grades: BTreeMap<String, QuestionResult>,
    #[serde(default)]
    pub total_questions: Option<u32>,
    /// Service-side grading timestamp, if reported.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl GradeReport {
    /// Convert the service payload into the durable per-file grade record,
    /// stamping the local grading time.
    pub fn into_file_grade(self) -> FileGrade {
        FileGrade {
            grade_percentage: self.grade_percentage,
            detected_nature_code: self.detected_nature_code,
            per_question: self.grades,
            graded_at: Some(chrono::Local::now().to_rfc3339()),
        }
    }
}

/// Failure modes of a single grading attempt, kept distinguishable so the
/// batch summary can report what actually went wrong.
#[derive(Debug, Error)]
pub enum GradeError {
    #[error("failed to read transcript: {0}")]
    Io(#[from] std::io::Error),
    #[error("transcript is not valid JSON: {0}")]
    InvalidTranscript(String),
    #[error("grading request failed: {0}")]
    Network(String),
    #[error("grading service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("malformed grading response: {0}")]
    MalformedResponse(String),
}

pub trait GradingBackend: Send {
    fn name(&self) -> &str;
    fn grade(&self, transcript_path: &Path) -> Result<GradeReport, GradeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::QuestionStatus;

    #[test]
    fn test_parse_service_response() {
        // Shape of the grading service's /api/grade response.
        let json = r#"{
            "grader_type": "ai",
            "grade_percentage": 87.5,
            "detected_nature_code": "Chest Pain",
            "total_questions": 12,
            "timestamp": "2026-03-04T10:00:00Z",
            "grades": {
                "CE_1": {"code": "1", "label": "What is the address?", "status": "asked_correctly"},
                "NC_4": {"code": "2", "label": "Is the patient breathing?", "status": "not_asked"}
            },
            "metadata": {"model": "llama3.1:8b"}
        }"#;
        let report: GradeReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.grade_percentage, 87.5);
        assert_eq!(report.detected_nature_code.as_deref(), Some("Chest Pain"));
        assert_eq!(report.total_questions, Some(12));
        assert_eq!(report.grades.len(), 2);
        assert_eq!(report.grades["NC_4"].status, QuestionStatus::NotAsked);
    }

    #[test]
    fn test_parse_minimal_response() {
        // Only the percentage is required; everything else is optional.
        let report: GradeReport = serde_json::from_str(r#"{"grade_percentage": 50.0}"#).unwrap();
        assert_eq!(report.grade_percentage, 50.0);
        assert!(report.detected_nature_code.is_none());
        assert!(report.grades.is_empty());
    }

    #[test]
    fn test_missing_percentage_is_an_error() {
        let result: Result<GradeReport, _> =
            serde_json::from_str(r#"{"detected_nature_code": "Fall"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_into_file_grade_carries_fields() {
        let report: GradeReport = serde_json::from_str(
            r#"{"grade_percentage": 62.5, "detected_nature_code": "Fall",
                "grades": {"CE_2": {"code": "4", "label": "Is she awake?", "status": "not_as_scripted"}}}"#,
        )
        .unwrap();
        let grade = report.into_file_grade();
        assert_eq!(grade.grade_percentage, 62.5);
        assert_eq!(grade.detected_nature_code.as_deref(), Some("Fall"));
        assert_eq!(grade.per_question["CE_2"].status, QuestionStatus::NotAsScripted);
        assert!(grade.graded_at.is_some());
    }

    #[test]
    fn test_error_messages_name_the_failure() {
        let err = GradeError::Http {
            status: 503,
            body: "Ollama connection failed".to_string(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("Ollama connection failed"));

        let err = GradeError::MalformedResponse("missing field".to_string());
        assert!(err.to_string().contains("malformed"));
    }
}
