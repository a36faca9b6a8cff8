use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::playback::transcript::{Transcript, TranscriptSegment};

/// The segment considered "currently spoken" at a playback time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveSegment {
    /// No transcript is loaded; distinct from a time outside all segments.
    NoTranscript,
    At(usize),
}

/// Map a playback time onto the active segment.
///
/// The active segment is the first whose interval contains `time`. In a gap
/// between segments it is the most recent segment that has already finished;
/// before the first segment it is index 0.
pub fn active_segment(segments: &[TranscriptSegment], time: f64) -> ActiveSegment {
    if segments.is_empty() {
        return ActiveSegment::NoTranscript;
    }

    if let Some(i) = segments
        .iter()
        .position(|s| time >= s.start && time <= s.end)
    {
        return ActiveSegment::At(i);
    }

    // Gap between segments: last segment that already ended.
    for i in (0..segments.len()).rev() {
        if time > segments[i].end {
            return ActiveSegment::At(i);
        }
    }

    ActiveSegment::At(0)
}

/// Holds the segment list a playback view is synchronized against. The only
/// state is the list itself: loading a new transcript replaces it wholesale,
/// so no active index computed against the previous list can carry over.
#[derive(Debug, Default)]
pub struct SyncSession {
    segments: Vec<TranscriptSegment>,
}

impl SyncSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the segment list; playback conceptually restarts at the
    /// beginning.
    pub fn load(&mut self, transcript: &Transcript) {
        self.segments = transcript.segments.clone();
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    pub fn active_at(&self, time: f64) -> ActiveSegment {
        active_segment(&self.segments, time)
    }

    /// End of the last segment, i.e. the playback horizon.
    pub fn end_secs(&self) -> Option<f64> {
        self.segments.last().map(|s| s.end)
    }
}

/// Source of the current playback position. `None` means playback stopped.
pub trait PlaybackClock {
    fn position_secs(&self) -> Option<f64>;
}

/// Real-time clock counting from `start()`, optionally exhausted after
/// `end_secs`. Stands in for an audio player's position while audio
/// transport stays out of scope.
pub struct WallClock {
    started: Instant,
    end_secs: Option<f64>,
}

impl WallClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            end_secs: None,
        }
    }

    pub fn with_end(end_secs: f64) -> Self {
        Self {
            started: Instant::now(),
            end_secs: Some(end_secs),
        }
    }
}

impl PlaybackClock for WallClock {
    fn position_secs(&self) -> Option<f64> {
        let elapsed = self.started.elapsed().as_secs_f64();
        match self.end_secs {
            Some(end) if elapsed > end => None,
            _ => Some(elapsed),
        }
    }
}

/// Poll the clock at `tick` intervals and report active-segment changes.
///
/// The loop exits when the clock reports playback stopped or `cancel` is
/// set; cancellation is checked before every recomputation, so no update is
/// emitted after it.
pub fn run_sync_loop(
    clock: &dyn PlaybackClock,
    segments: &[TranscriptSegment],
    tick: Duration,
    cancel: &AtomicBool,
    on_change: &mut dyn FnMut(ActiveSegment),
) {
    let mut last: Option<ActiveSegment> = None;
    loop {
        if cancel.load(Ordering::Relaxed) {
            return;
        }
        let Some(time) = clock.position_secs() else {
            return;
        };
        let active = active_segment(segments, time);
        if last != Some(active) {
            on_change(active);
            last = Some(active);
        }
        std::thread::sleep(tick);
    }
}
