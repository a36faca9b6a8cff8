use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Result;

use crate::classify::{self, FileCategory};
use crate::grade::backend::GradingBackend;
use crate::store::AggregateStore;

/// Receives the transient per-file status line emitted before each grading
/// submission.
pub trait ProgressObserver {
    fn status(&mut self, message: &str);
}

/// Default observer that routes status updates to the log.
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn status(&mut self, message: &str) {
        tracing::info!("{}", message);
    }
}

/// A classified upload batch with the files still awaiting processing held
/// as an explicit working set.
#[derive(Debug)]
pub struct UploadBatch {
    /// (dispatcher name, audio filename), persisted before any grading.
    audio: Vec<(String, String)>,
    /// (dispatcher name, transcript path), graded strictly in order.
    transcripts: Vec<(String, PathBuf)>,
    pending: BTreeSet<String>,
}

impl UploadBatch {
    /// Build a batch from already-validated paths. Filenames that don't match
    /// the dispatcher naming convention are dropped here (see
    /// `classify::group_batch`).
    pub fn from_paths(paths: &[PathBuf]) -> Self {
        let groups = classify::group_batch(paths);
        let mut audio = Vec::new();
        let mut transcripts = Vec::new();
        let mut pending = BTreeSet::new();

        for (dispatcher, files) in groups {
            for path in files.audio {
                let filename = classify::file_name(&path);
                pending.insert(filename.clone());
                audio.push((dispatcher.clone(), filename));
            }
            for path in files.transcripts {
                pending.insert(classify::file_name(&path));
                transcripts.push((dispatcher.clone(), path));
            }
        }

        Self {
            audio,
            transcripts,
            pending,
        }
    }

    /// Filenames not yet persisted or graded.
    pub fn pending(&self) -> &BTreeSet<String> {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.audio.is_empty() && self.transcripts.is_empty()
    }

    pub fn transcript_count(&self) -> usize {
        self.transcripts.len()
    }
}

/// End-of-batch bookkeeping: how many transcripts graded, how many failed,
/// and the captured error messages in submission order.
#[derive(Debug, Default)]
pub struct GradingOutcome {
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<String>,
}

impl GradingOutcome {
    /// The single end-of-batch summary. All-failed batches show up to 5
    /// errors, mixed batches up to 3, all-succeeded batches a plain
    /// acknowledgment.
    pub fn summary(&self) -> String {
        if self.success_count == 0 && self.error_count > 0 {
            format!(
                "Failed to analyze any files.\n\nErrors:\n{}{}\n\nFiles were saved but no grades were calculated.",
                self.errors[..self.errors.len().min(5)].join("\n"),
                overflow_suffix(&self.errors, 5)
            )
        } else if self.error_count > 0 {
            format!(
                "Successfully analyzed {} file(s), but {} file(s) failed.\n\nFailed files:\n{}{}",
                self.success_count,
                self.error_count,
                self.errors[..self.errors.len().min(3)].join("\n"),
                overflow_suffix(&self.errors, 3)
            )
        } else {
            "Successfully stored dispatcher(s) with files and grades!".to_string()
        }
    }
}

fn overflow_suffix(errors: &[String], shown: usize) -> String {
    if errors.len() > shown {
        format!("\n...and {} more", errors.len() - shown)
    } else {
        String::new()
    }
}

/// Drive a classified batch through the store and the grading service.
///
/// Audio files are persisted first, synchronously. Transcripts are then
/// submitted one at a time, each fully resolved before the next begins; this
/// keeps the store's full-collection read-modify-write race-free. A grading
/// failure records the file as attempted-ungraded and the batch continues.
pub fn run_upload(
    store: &mut AggregateStore,
    backend: &dyn GradingBackend,
    progress: &mut dyn ProgressObserver,
    batch: &mut UploadBatch,
) -> Result<GradingOutcome> {
    let mut outcome = GradingOutcome::default();

    let audio = std::mem::take(&mut batch.audio);
    for (dispatcher, filename) in &audio {
        store.upsert_file(dispatcher, filename, FileCategory::Audio)?;
        batch.pending.remove(filename);
    }

    let transcripts = std::mem::take(&mut batch.transcripts);
    for (dispatcher, path) in &transcripts {
        let filename = classify::file_name(path);
        progress.status(&format!("Analyzing {}...", filename));
        tracing::debug!("Submitting {} to {} backend", filename, backend.name());

        match backend.grade(path) {
            Ok(report) => {
                store.upsert_file(dispatcher, &filename, FileCategory::Transcript)?;
                store.attach_grade(dispatcher, &filename, Some(report.into_file_grade()))?;
                outcome.success_count += 1;
            }
            Err(e) => {
                tracing::error!("Failed to grade {}: {}", filename, e);
                outcome.errors.push(format!("{}: {}", filename, e));
                outcome.error_count += 1;
                // The file is still recorded, just without a grade.
                store.upsert_file(dispatcher, &filename, FileCategory::Transcript)?;
                store.attach_grade(dispatcher, &filename, None)?;
            }
        }
        batch.pending.remove(&filename);
    }

    Ok(outcome)
}
