use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::bus::ChangeBus;
use crate::classify;
use crate::config::Config;
use crate::grade::http::HttpGradingBackend;
use crate::grade::runner::{self, ProgressObserver, UploadBatch};
use crate::playback::fetch::TranscriptFetcher;
use crate::playback::sync::{run_sync_loop, ActiveSegment, SyncSession, WallClock};
use crate::playback::transcript::Transcript;
use crate::records::{Dispatcher, GradeState, QuestionStatus};
use crate::store::{AggregateStore, FileStore};
use crate::transcribe;

/// Progress observer that prints the transient per-file status line.
struct ConsoleProgress;

impl ProgressObserver for ConsoleProgress {
    fn status(&mut self, message: &str) {
        println!("  {}", message);
    }
}

fn open_store(config: &Config) -> AggregateStore {
    let backend = FileStore::new(config.storage.data_dir.clone());
    AggregateStore::new(Box::new(backend), ChangeBus::new())
}

/// Upload a batch: gate extensions, forward archives, classify the rest and
/// run the grading pipeline.
pub fn upload_files(config: &Config, files: &[PathBuf]) -> Result<()> {
    let split = classify::split_batch(files);
    if let Some(message) = classify::rejection_message(&split.rejected) {
        println!("{}\n", message);
    }
    if split.accepted.is_empty() {
        println!("No supported files to upload.");
        return Ok(());
    }

    // Archives take the remote transcription path and never enter the
    // classification pipeline.
    let (archives, loose): (Vec<PathBuf>, Vec<PathBuf>) = split
        .accepted
        .into_iter()
        .partition(|p| classify::file_name(p).to_ascii_lowercase().ends_with(".zip"));

    for archive in &archives {
        let name = classify::file_name(archive);
        match transcribe::forward_archive(&config.transcription, archive) {
            Ok(body) => println!("Submitted {} for transcription: {}", name, body),
            Err(e) => println!("Failed to submit {} for transcription: {}", name, e),
        }
    }

    let mut batch = UploadBatch::from_paths(&loose);
    if batch.is_empty() {
        if archives.is_empty() {
            println!("No files matched the <token>_<token>_<dispatcher>.<ext> naming convention.");
        }
        return Ok(());
    }

    let mut store = open_store(config);
    let backend = HttpGradingBackend::from_config(&config.grading)?;
    let mut progress = ConsoleProgress;

    tracing::info!("Processing {} transcript file(s)", batch.transcript_count());
    let outcome = runner::run_upload(&mut store, &backend, &mut progress, &mut batch)?;

    println!("\n{}", outcome.summary());
    Ok(())
}

/// List dispatchers with overall grades, optionally filtered and re-sorted.
pub fn show_records(config: &Config, search: Option<&str>, ascending: bool) -> Result<()> {
    let dispatchers = open_store(config).load()?;
    print!("{}", format_records(&dispatchers, search, ascending));
    Ok(())
}

fn format_records(dispatchers: &[Dispatcher], search: Option<&str>, ascending: bool) -> String {
    let mut rows: Vec<&Dispatcher> = dispatchers
        .iter()
        .filter(|d| match search {
            Some(q) => d.name.to_lowercase().contains(&q.to_lowercase()),
            None => true,
        })
        .collect();

    if rows.is_empty() {
        return "No dispatchers on record.\n".to_string();
    }

    // Ungraded dispatchers sort as zero, the same ranking the records page used.
    rows.sort_by(|a, b| {
        let ka = a.overall_grade().unwrap_or(0.0);
        let kb = b.overall_grade().unwrap_or(0.0);
        if ascending {
            ka.total_cmp(&kb)
        } else {
            kb.total_cmp(&ka)
        }
    });

    let mut out = format!(
        "{:<24} {:>11} {:>6} {:>8}\n",
        "Dispatcher", "Transcripts", "Audio", "Overall"
    );
    for d in rows {
        let overall = match d.overall_grade() {
            Some(g) => format!("{:.1}%", g),
            None => "-".to_string(),
        };
        out.push_str(&format!(
            "{:<24} {:>11} {:>6} {:>8}\n",
            d.name,
            d.transcript_files.len(),
            d.audio_files.len(),
            overall
        ));
    }
    out
}

/// Show one dispatcher's files and per-file grading state.
pub fn show_dispatcher(config: &Config, name: &str) -> Result<()> {
    match open_store(config).find(name)? {
        Some(dispatcher) => print!("{}", format_dispatcher(&dispatcher)),
        None => println!("No dispatcher named {}.", name),
    }
    Ok(())
}

fn format_dispatcher(d: &Dispatcher) -> String {
    let mut out = format!("{} (id: {})\n", d.name, d.id);
    match d.overall_grade() {
        Some(g) => out.push_str(&format!("Overall grade: {:.1}%\n", g)),
        None => out.push_str("Overall grade: no graded transcripts\n"),
    }

    out.push_str("\nTranscript files:\n");
    if d.transcript_files.is_empty() {
        out.push_str("  (none)\n");
    }
    for file in &d.transcript_files {
        match d.grade_state(file) {
            GradeState::Graded(grade) => {
                let nature = grade
                    .detected_nature_code
                    .as_deref()
                    .map(|n| format!(" ({})", n))
                    .unwrap_or_default();
                out.push_str(&format!("  {}  {:.1}%{}\n", file, grade.grade_percentage, nature));
                // Flag the questions that cost points.
                for (qid, q) in &grade.per_question {
                    if matches!(
                        q.status,
                        QuestionStatus::NotAsked | QuestionStatus::AskedIncorrectly
                    ) {
                        out.push_str(&format!("      {}: {} - {}\n", qid, q.label, q.status));
                    }
                }
            }
            GradeState::AttemptedUngraded => {
                out.push_str(&format!("  {}  ungraded (analysis failed)\n", file));
            }
            GradeState::NotAttempted => {
                out.push_str(&format!("  {}  not graded yet\n", file));
            }
        }
    }

    out.push_str("\nAudio files:\n");
    if d.audio_files.is_empty() {
        out.push_str("  (none)\n");
    }
    for file in &d.audio_files {
        out.push_str(&format!("  {}\n", file));
    }
    out
}

/// Show store location and record counts.
pub fn show_status(config: &Config) -> Result<()> {
    let dispatchers = open_store(config).load()?;
    let transcript_count: usize = dispatchers.iter().map(|d| d.transcript_files.len()).sum();
    let audio_count: usize = dispatchers.iter().map(|d| d.audio_files.len()).sum();
    let graded_count: usize = dispatchers
        .iter()
        .map(|d| {
            d.transcript_files
                .iter()
                .filter(|f| matches!(d.grade_state(f), GradeState::Graded(_)))
                .count()
        })
        .sum();

    println!("callgrade status:");
    println!("  Data dir:     {}", config.storage.data_dir.display());
    println!("  Dispatchers:  {}", dispatchers.len());
    println!("  Transcripts:  {} ({} graded)", transcript_count, graded_count);
    println!("  Audio files:  {}", audio_count);
    Ok(())
}

/// Play back a call: resolve the transcript, then follow elapsed time
/// through the segment list, printing each speaker turn as it becomes
/// active. Ctrl-C cancels the loop.
pub fn play_call(
    config: &Config,
    audio: &Path,
    transcript_path: Option<&Path>,
    transcription_id: Option<&str>,
) -> Result<()> {
    let audio_name = classify::file_name(audio);
    let dispatcher = classify::classify(&audio_name)
        .map(|c| c.dispatcher)
        .unwrap_or_else(|| "N/A".to_string());

    println!("Dispatcher: {}", dispatcher);
    println!("Audio file: {}", audio_name);

    let transcript = resolve_transcript(config, audio, transcript_path, transcription_id)?;
    let mut session = SyncSession::new();
    session.load(&transcript);

    if session.segments().is_empty() {
        println!("\nChoose a call to review");
        return Ok(());
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_cancel = cancel.clone();
    ctrlc::set_handler(move || {
        handler_cancel.store(true, Ordering::Relaxed);
    })?;

    let end = session.end_secs().unwrap_or(0.0);
    let clock = WallClock::with_end(end);
    let tick = Duration::from_millis(config.playback.tick_interval_ms);
    let segments = session.segments();

    println!();
    run_sync_loop(&clock, segments, tick, &cancel, &mut |active| {
        if let ActiveSegment::At(i) = active {
            let s = &segments[i];
            println!("[{:>6.1}s] {}: {}", s.start, s.speaker, s.text);
        }
    });

    println!("\nPlayback finished");
    Ok(())
}

/// Resolve the transcript for an audio file: explicit path, remote fetch by
/// id, or the sibling `<base>.json`. A missing transcript on the implicit
/// paths is non-fatal and yields the empty placeholder.
fn resolve_transcript(
    config: &Config,
    audio: &Path,
    transcript_path: Option<&Path>,
    transcription_id: Option<&str>,
) -> Result<Transcript> {
    if let Some(path) = transcript_path {
        return Transcript::load(path);
    }

    if let Some(id) = transcription_id {
        let fetcher = TranscriptFetcher::from_config(&config.transcription)?;
        return Ok(match fetcher.fetch(id)? {
            Some(fetched) => fetched.transcript,
            None => Transcript::default(),
        });
    }

    let sibling = audio.with_extension("json");
    if sibling.exists() {
        Transcript::load(&sibling)
    } else {
        tracing::warn!(
            "Transcript not found for {} at {}",
            audio.display(),
            sibling.display()
        );
        Ok(Transcript::default())
    }
}
