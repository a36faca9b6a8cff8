use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File extensions accepted at the batch-upload boundary.
pub const ALLOWED_EXTENSIONS: &[&str] = &[".zip", ".json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Transcript,
    Audio,
}

/// A filename that matched the `<token>_<token>_<dispatcher>.<ext>` convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFile {
    pub dispatcher: String,
    pub filename: String,
    pub category: FileCategory,
}

/// Result of the extension gate over a raw batch.
#[derive(Debug, Default)]
pub struct BatchSplit {
    pub accepted: Vec<PathBuf>,
    pub rejected: Vec<String>,
}

/// Partition a batch by allowed extension (case-insensitive). Rejected files
/// never enter the pipeline; they are reported once via `rejection_message`.
pub fn split_batch(files: &[PathBuf]) -> BatchSplit {
    let mut split = BatchSplit::default();
    for path in files {
        let name = file_name(path);
        let allowed = name
            .rfind('.')
            .map(|dot| {
                let ext = name[dot..].to_ascii_lowercase();
                ALLOWED_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false);
        if allowed {
            split.accepted.push(path.clone());
        } else {
            split.rejected.push(name);
        }
    }
    split
}

/// Consolidated user-facing message for every rejected filename in a batch.
pub fn rejection_message(rejected: &[String]) -> Option<String> {
    if rejected.is_empty() {
        return None;
    }
    Some(format!(
        "The following files are not supported: {}\n\nOnly {} files are allowed.",
        rejected.join(", "),
        ALLOWED_EXTENSIONS.join(", ")
    ))
}

/// Extract the dispatcher name and category from a filename.
///
/// The dispatcher name is the substring between the second underscore and the
/// final dot. Filenames without a second underscore or a dot don't belong to
/// any dispatcher and yield `None`; callers treat that as a silent skip.
pub fn classify(filename: &str) -> Option<ClassifiedFile> {
    let first = filename.find('_')?;
    let second = filename[first + 1..].find('_').map(|i| first + 1 + i)?;
    let dot = filename.rfind('.')?;
    if dot <= second + 1 {
        return None;
    }
    let dispatcher = &filename[second + 1..dot];
    let category = if filename[dot..].eq_ignore_ascii_case(".json") {
        FileCategory::Transcript
    } else {
        FileCategory::Audio
    };
    Some(ClassifiedFile {
        dispatcher: dispatcher.to_string(),
        filename: filename.to_string(),
        category,
    })
}

/// Files grouped under one dispatcher name, in arrival order.
#[derive(Debug, Default, Clone)]
pub struct DispatcherFiles {
    pub transcripts: Vec<PathBuf>,
    pub audio: Vec<PathBuf>,
}

/// Group a batch of paths by extracted dispatcher name. Paths whose filename
/// doesn't match the naming convention are dropped (logged at debug level).
pub fn group_batch(paths: &[PathBuf]) -> BTreeMap<String, DispatcherFiles> {
    let mut groups: BTreeMap<String, DispatcherFiles> = BTreeMap::new();
    for path in paths {
        let name = file_name(path);
        let Some(classified) = classify(&name) else {
            tracing::debug!("Skipping {}: filename doesn't match naming convention", name);
            continue;
        };
        let entry = groups.entry(classified.dispatcher).or_default();
        match classified.category {
            FileCategory::Transcript => entry.transcripts.push(path.clone()),
            FileCategory::Audio => entry.audio.push(path.clone()),
        }
    }
    groups
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
