use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a scripted question was handled, per the EMS grading key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    AskedCorrectly,
    AskedIncorrectly,
    NotAsked,
    NotAsScripted,
    NotApplicable,
    Obvious,
    RecordedCorrectly,
}

impl std::fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AskedCorrectly => write!(f, "Asked correctly"),
            Self::AskedIncorrectly => write!(f, "Asked incorrectly"),
            Self::NotAsked => write!(f, "Not asked"),
            Self::NotAsScripted => write!(f, "Not as scripted"),
            Self::NotApplicable => write!(f, "N/A"),
            Self::Obvious => write!(f, "Obvious"),
            Self::RecordedCorrectly => write!(f, "Recorded correctly"),
        }
    }
}

/// Outcome for a single scripted question in a graded transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub code: String,
    pub label: String,
    pub status: QuestionStatus,
}

/// Result of grading one transcript file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileGrade {
    pub grade_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_nature_code: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub per_question: BTreeMap<String, QuestionResult>,
    /// When this grade was recorded locally (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graded_at: Option<String>,
}

/// Grading state of one transcript file within a dispatcher record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradeState<'a> {
    /// No grading attempt has been made for this file.
    NotAttempted,
    /// A grading attempt was made but produced no grade.
    AttemptedUngraded,
    Graded(&'a FileGrade),
}

/// One dispatcher's aggregated record. `name` is the sole merge key; the file
/// lists keep arrival order and set semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispatcher {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub transcript_files: Vec<String>,
    #[serde(default)]
    pub audio_files: Vec<String>,
    /// Absent key = never attempted; `None` = attempted, ungraded;
    /// `Some` = graded.
    #[serde(default)]
    pub grades: BTreeMap<String, Option<FileGrade>>,
}

impl Dispatcher {
    pub fn new(name: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            transcript_files: Vec::new(),
            audio_files: Vec::new(),
            grades: BTreeMap::new(),
        }
    }

    pub fn grade_state(&self, filename: &str) -> GradeState<'_> {
        match self.grades.get(filename) {
            None => GradeState::NotAttempted,
            Some(None) => GradeState::AttemptedUngraded,
            Some(Some(grade)) => GradeState::Graded(grade),
        }
    }

    /// Average grade percentage across graded transcript files. Ungraded
    /// files are excluded from both numerator and denominator; a dispatcher
    /// with no graded files has no overall grade, not a zero one.
    pub fn overall_grade(&self) -> Option<f64> {
        let graded: Vec<f64> = self
            .transcript_files
            .iter()
            .filter_map(|f| self.grades.get(f))
            .filter_map(|g| g.as_ref())
            .map(|g| g.grade_percentage)
            .collect();
        if graded.is_empty() {
            None
        } else {
            Some(graded.iter().sum::<f64>() / graded.len() as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grade(pct: f64) -> FileGrade {
        FileGrade {
            grade_percentage: pct,
            detected_nature_code: None,
            per_question: BTreeMap::new(),
            graded_at: None,
        }
    }

    #[test]
    fn test_overall_grade_none_when_nothing_graded() {
        let mut d = Dispatcher::new("JaneDoe");
        d.transcript_files.push("a.json".to_string());
        assert_eq!(d.overall_grade(), None);
    }

    #[test]
    fn test_overall_grade_excludes_ungraded_files() {
        let mut d = Dispatcher::new("JaneDoe");
        d.transcript_files.push("a.json".to_string());
        d.transcript_files.push("b.json".to_string());
        d.grades.insert("a.json".to_string(), Some(grade(80.0)));
        // b.json attempted but ungraded: excluded, not counted as zero
        d.grades.insert("b.json".to_string(), None);
        assert_eq!(d.overall_grade(), Some(80.0));
    }

    #[test]
    fn test_overall_grade_averages_graded_files() {
        let mut d = Dispatcher::new("JaneDoe");
        d.transcript_files.push("a.json".to_string());
        d.transcript_files.push("b.json".to_string());
        d.grades.insert("a.json".to_string(), Some(grade(70.0)));
        d.grades.insert("b.json".to_string(), Some(grade(90.0)));
        assert_eq!(d.overall_grade(), Some(80.0));
    }

    #[test]
    fn test_overall_grade_ignores_grades_for_unknown_files() {
        // A grade entry without a matching transcript file doesn't count.
        let mut d = Dispatcher::new("JaneDoe");
        d.grades.insert("stray.json".to_string(), Some(grade(50.0)));
        assert_eq!(d.overall_grade(), None);
    }

    #[test]
    fn test_grade_state_three_way() {
        let mut d = Dispatcher::new("JaneDoe");
        d.grades.insert("b.json".to_string(), None);
        d.grades.insert("c.json".to_string(), Some(grade(95.0)));

        assert_eq!(d.grade_state("a.json"), GradeState::NotAttempted);
        assert_eq!(d.grade_state("b.json"), GradeState::AttemptedUngraded);
        assert!(matches!(d.grade_state("c.json"), GradeState::Graded(g) if g.grade_percentage == 95.0));
    }

    #[test]
    fn test_dispatcher_ids_are_unique() {
        assert_ne!(Dispatcher::new("a").id, Dispatcher::new("a").id);
    }

    #[test]
    fn test_serde_preserves_ungraded_entry() {
        let mut d = Dispatcher::new("JaneDoe");
        d.transcript_files.push("a.json".to_string());
        d.grades.insert("a.json".to_string(), None);

        let json = serde_json::to_string(&d).unwrap();
        let loaded: Dispatcher = serde_json::from_str(&json).unwrap();
        // The attempted-ungraded state must survive a round trip.
        assert_eq!(loaded.grade_state("a.json"), GradeState::AttemptedUngraded);
        assert_eq!(loaded.grade_state("other.json"), GradeState::NotAttempted);
    }

    #[test]
    fn test_question_status_serde_names() {
        let json = serde_json::to_string(&QuestionStatus::NotAsScripted).unwrap();
        assert_eq!(json, "\"not_as_scripted\"");
        let status: QuestionStatus = serde_json::from_str("\"asked_correctly\"").unwrap();
        assert_eq!(status, QuestionStatus::AskedCorrectly);
    }
}
