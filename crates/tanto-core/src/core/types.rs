//! Tanto Core Type Definitions
//!
//! Defines fundamental types used throughout the project.

use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Track unique identifier (ULID)
pub type TrackId = String;

/// Backend media unique identifier (ULID)
pub type MediaId = String;

/// Workspace number (1-based)
pub type WorkspaceId = usize;

/// Creates a fresh ULID string
pub fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

// =============================================================================
// Time Types
// =============================================================================

/// Time in seconds (floating point)
pub type TimeSec = f64;

/// Tolerance used when comparing positions produced by backend arithmetic
pub const TIME_EPSILON: TimeSec = 1e-9;

/// Half-open time window `[start, end)` in seconds
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start_sec: TimeSec,
    pub end_sec: TimeSec,
}

impl TimeWindow {
    /// Creates a window, swapping the bounds if they are inverted
    pub fn new(start: TimeSec, end: TimeSec) -> Self {
        if start > end {
            Self {
                start_sec: end,
                end_sec: start,
            }
        } else {
            Self {
                start_sec: start,
                end_sec: end,
            }
        }
    }

    pub fn duration(&self) -> TimeSec {
        self.end_sec - self.start_sec
    }

    /// Checks if a time point falls inside the window
    pub fn contains(&self, t: TimeSec) -> bool {
        t >= self.start_sec && t < self.end_sec
    }
}

// =============================================================================
// Media Types
// =============================================================================

/// Kind of decoded media
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn is_audio(self) -> bool {
        matches!(self, MediaKind::Audio)
    }

    pub fn is_video(self) -> bool {
        matches!(self, MediaKind::Video)
    }
}

/// Extensions treated as audio files; everything else is video
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg", "flac"];

/// Guesses the media kind of a file from its extension
pub fn kind_from_path(path: &std::path::Path) -> MediaKind {
    let is_audio = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false);
    if is_audio {
        MediaKind::Audio
    } else {
        MediaKind::Video
    }
}

// =============================================================================
// Spatial Types
// =============================================================================

/// Frame size in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size2D {
    pub width: u32,
    pub height: u32,
}

impl Size2D {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_time_window_inversion() {
        let w = TimeWindow::new(10.0, 5.0);
        assert_eq!(w.start_sec, 5.0);
        assert_eq!(w.end_sec, 10.0);
        assert!(w.contains(5.0));
        assert!(!w.contains(10.0));
    }

    #[test]
    fn test_kind_from_path() {
        assert_eq!(kind_from_path(Path::new("a/b/voice.WAV")), MediaKind::Audio);
        assert_eq!(kind_from_path(Path::new("song.flac")), MediaKind::Audio);
        assert_eq!(kind_from_path(Path::new("movie.mkv")), MediaKind::Video);
        assert_eq!(kind_from_path(Path::new("no_extension")), MediaKind::Video);
    }
}
