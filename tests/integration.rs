use std::path::{Path, PathBuf};

use callgrade::bus::ChangeBus;
use callgrade::grade::backend::{GradeError, GradeReport, GradingBackend};
use callgrade::grade::runner::{run_upload, ProgressObserver, UploadBatch};
use callgrade::records::GradeState;
use callgrade::store::{AggregateStore, MemoryStore};

/// Grading backend that fails for the filenames it is told to fail for and
/// otherwise returns a fixed report.
struct ScriptedBackend {
    failures: Vec<&'static str>,
}

impl GradingBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn grade(&self, transcript_path: &Path) -> Result<GradeReport, GradeError> {
        let filename = transcript_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.failures.iter().any(|f| *f == filename) {
            return Err(GradeError::Http {
                status: 503,
                body: "Ollama connection failed".to_string(),
            });
        }
        Ok(serde_json::from_str(
            r#"{"grade_percentage": 80.0, "detected_nature_code": "Case Entry"}"#,
        )
        .unwrap())
    }
}

#[derive(Default)]
struct RecordingProgress {
    messages: Vec<String>,
}

impl ProgressObserver for RecordingProgress {
    fn status(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

#[test]
fn test_batch_with_partial_failure_end_to_end() {
    let bus = ChangeBus::new();
    let notifications = bus.subscribe();
    let mut store = AggregateStore::new(Box::new(MemoryStore::new()), bus);
    let backend = ScriptedBackend {
        failures: vec!["912_call_JaneDoe.json"],
    };
    let mut progress = RecordingProgress::default();

    let files: Vec<PathBuf> = [
        "911_call_JaneDoe.json",
        "912_call_JaneDoe.json",
        "911_call_JohnRoe.json",
        "911_call_JaneDoe.mp3",
        "randomfile.json", // no second underscore: silently dropped
    ]
    .iter()
    .map(PathBuf::from)
    .collect();

    let mut batch = UploadBatch::from_paths(&files);
    let outcome = run_upload(&mut store, &backend, &mut progress, &mut batch).unwrap();

    // 2 graded, 1 failed, nothing left pending.
    assert_eq!(outcome.success_count, 2);
    assert_eq!(outcome.error_count, 1);
    assert!(batch.pending().is_empty());

    // The summary is the mixed-results branch.
    let summary = outcome.summary();
    assert!(summary.contains("Successfully analyzed 2 file(s), but 1 file(s) failed."));
    assert!(summary.contains("912_call_JaneDoe.json"));

    // All classified files were recorded; the dropped filename created nothing.
    let all = store.load().unwrap();
    assert_eq!(all.len(), 2);

    let jane = store.find("JaneDoe").unwrap().unwrap();
    assert_eq!(
        jane.transcript_files,
        vec!["911_call_JaneDoe.json", "912_call_JaneDoe.json"]
    );
    assert_eq!(jane.audio_files, vec!["911_call_JaneDoe.mp3"]);
    assert!(matches!(
        jane.grade_state("911_call_JaneDoe.json"),
        GradeState::Graded(g) if g.grade_percentage == 80.0
    ));
    assert_eq!(
        jane.grade_state("912_call_JaneDoe.json"),
        GradeState::AttemptedUngraded
    );

    // Failed file excluded from the average: one graded file at 80%.
    assert_eq!(jane.overall_grade(), Some(80.0));

    let john = store.find("JohnRoe").unwrap().unwrap();
    assert_eq!(john.transcript_files, vec!["911_call_JohnRoe.json"]);

    // One status line per transcript submission, in order.
    assert_eq!(
        progress.messages,
        vec![
            "Analyzing 911_call_JaneDoe.json...",
            "Analyzing 912_call_JaneDoe.json...",
            "Analyzing 911_call_JohnRoe.json...",
        ]
    );

    // One notification per store mutation:
    // 1 audio upsert + 3 * (transcript upsert + grade attach).
    assert_eq!(notifications.try_iter().count(), 7);
}

#[test]
fn test_repeated_batches_merge_into_one_record() {
    let mut store = AggregateStore::new(Box::new(MemoryStore::new()), ChangeBus::new());
    let backend = ScriptedBackend { failures: vec![] };
    let mut progress = RecordingProgress::default();

    let first: Vec<PathBuf> = vec![
        PathBuf::from("911_call_JaneDoe.json"),
        PathBuf::from("911_call_JaneDoe.mp3"),
    ];
    let second: Vec<PathBuf> = vec![
        PathBuf::from("911_call_JaneDoe.json"), // same file again
        PathBuf::from("912_call_JaneDoe.mp3"),
    ];

    for files in [&first, &second] {
        let mut batch = UploadBatch::from_paths(files);
        run_upload(&mut store, &backend, &mut progress, &mut batch).unwrap();
    }

    let all = store.load().unwrap();
    assert_eq!(all.len(), 1, "same name always merges into one record");

    let jane = &all[0];
    assert_eq!(jane.transcript_files, vec!["911_call_JaneDoe.json"]);
    assert_eq!(
        jane.audio_files,
        vec!["911_call_JaneDoe.mp3", "912_call_JaneDoe.mp3"]
    );
}

#[test]
fn test_all_failed_batch_still_records_files() {
    let mut store = AggregateStore::new(Box::new(MemoryStore::new()), ChangeBus::new());
    let backend = ScriptedBackend {
        failures: vec!["911_call_JaneDoe.json", "911_call_JohnRoe.json"],
    };
    let mut progress = RecordingProgress::default();

    let files: Vec<PathBuf> = vec![
        PathBuf::from("911_call_JaneDoe.json"),
        PathBuf::from("911_call_JohnRoe.json"),
    ];
    let mut batch = UploadBatch::from_paths(&files);
    let outcome = run_upload(&mut store, &backend, &mut progress, &mut batch).unwrap();

    assert_eq!(outcome.success_count, 0);
    assert_eq!(outcome.error_count, 2);
    assert!(outcome.summary().starts_with("Failed to analyze any files."));

    for name in ["JaneDoe", "JohnRoe"] {
        let d = store.find(name).unwrap().unwrap();
        assert_eq!(d.transcript_files.len(), 1);
        assert_eq!(d.overall_grade(), None, "no graded files means no overall grade");
    }
}
