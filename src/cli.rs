use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "callgrade",
    version,
    about = "Call-transcript grading and review tool for emergency dispatch QA"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a batch of transcript/audio files and grade the transcripts
    Upload {
        /// Files to upload (.json transcripts, audio, or .zip archives)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List dispatchers with their overall grades (default if no subcommand)
    Records {
        /// Only show dispatchers whose name contains this text
        #[arg(long)]
        search: Option<String>,

        /// Sort ascending by overall grade instead of descending
        #[arg(long)]
        asc: bool,
    },

    /// Show one dispatcher's files and per-file grades
    Show {
        /// Dispatcher name (as extracted from filenames)
        name: String,
    },

    /// Play back a call with the transcript synchronized to elapsed time
    Play {
        /// Audio file to play back
        audio: PathBuf,

        /// Explicit transcript file (default: `<audio base>.json` beside it)
        #[arg(long)]
        transcript: Option<PathBuf>,

        /// Fetch the transcript from the transcription service by id
        #[arg(long, conflicts_with = "transcript")]
        id: Option<String>,
    },

    /// Show store location, dispatcher and file counts
    Status,
}
