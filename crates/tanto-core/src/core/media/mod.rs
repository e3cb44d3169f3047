//! Media Backend Module
//!
//! The timeline engine never touches decoded media directly. Everything it
//! needs from a codec library goes through the [`MediaBackend`] trait:
//! - Decoding files into clips with a known kind and duration
//! - Subclipping, concatenation and layered compositing
//! - Volume scaling, fades and resizing
//! - Generated silence and text clips
//! - Encoding to files and audio preview playback
//!
//! [`GraphBackend`] is an in-process implementation that records every
//! operation as a render graph node.

mod graph;
mod scratch;

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{playback::PlaybackSignals, MediaId, MediaKind, Size2D, TimeSec, TimeWindow};

pub use graph::{GraphBackend, RenderLayer, RenderNode, RenderOp, SourceInfo};
pub use scratch::ScratchFile;

/// Media backend error types
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Cannot decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Unknown media handle: {0}")]
    UnknownHandle(MediaId),

    #[error("Invalid time range: {0}~{1} seconds")]
    InvalidRange(TimeSec, TimeSec),

    #[error("Operation requires {0:?} media")]
    KindMismatch(MediaKind),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MediaResult<T> = Result<T, MediaError>;

// =============================================================================
// Media Handle
// =============================================================================

/// Opaque reference to a piece of media owned by the backend.
///
/// Carries the few stream properties the timeline needs to reason about
/// clips without asking the backend. Cloning is cheap; a scratch artifact
/// or backend state attached to the handle lives as long as the last clone.
#[derive(Clone, Debug)]
pub struct MediaHandle {
    pub id: MediaId,
    pub kind: MediaKind,
    pub duration: TimeSec,
    /// Frame size for video media
    pub size: Option<Size2D>,
    /// Whether video media carries an audio stream
    pub has_audio: bool,
    pub fps: Option<f64>,
    pub video_bitrate: Option<String>,
    pub audio_bitrate: Option<String>,
    scratch: Option<Arc<ScratchFile>>,
    backing: Option<Arc<dyn Any + Send + Sync>>,
}

impl MediaHandle {
    /// Creates a handle with default stream properties for the given kind
    pub fn new(id: MediaId, kind: MediaKind, duration: TimeSec) -> Self {
        Self {
            id,
            kind,
            duration: duration.max(0.0),
            size: None,
            has_audio: kind.is_audio(),
            fps: None,
            video_bitrate: None,
            audio_bitrate: None,
            scratch: None,
            backing: None,
        }
    }

    pub fn is_audio(&self) -> bool {
        self.kind.is_audio()
    }

    pub fn is_video(&self) -> bool {
        self.kind.is_video()
    }

    /// Attaches a scratch artifact whose lifetime follows this handle
    pub fn with_scratch(mut self, scratch: ScratchFile) -> Self {
        self.scratch = Some(Arc::new(scratch));
        self
    }

    /// Attaches backend state that must stay alive while the handle does
    pub fn with_backing(mut self, backing: Arc<dyn Any + Send + Sync>) -> Self {
        self.backing = Some(backing);
        self
    }

    /// Backend state attached with [`MediaHandle::with_backing`]
    pub fn backing(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.backing.as_ref()
    }

    /// Path of the scratch artifact backing this media, if any
    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch.as_ref().map(|s| s.path())
    }
}

impl PartialEq for MediaHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// =============================================================================
// Operation Parameters
// =============================================================================

/// Media placed at a start offset inside a composite
#[derive(Clone, Debug)]
pub struct Layer {
    pub media: MediaHandle,
    pub start_sec: TimeSec,
}

impl Layer {
    pub fn new(media: MediaHandle, start_sec: TimeSec) -> Self {
        Self { media, start_sec }
    }

    pub fn end_sec(&self) -> TimeSec {
        self.start_sec + self.media.duration
    }
}

/// Which end of a clip a fade applies to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FadeEdge {
    In,
    Out,
}

/// Encoder hints
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeSettings {
    /// Video codec (e.g., "libx264"); backend default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    /// Video bitrate (e.g., "8000k")
    pub video_bitrate: String,
    /// Audio bitrate (e.g., "192k")
    pub audio_bitrate: String,
}

impl EncodeSettings {
    pub fn new(video_bitrate: &str, audio_bitrate: &str) -> Self {
        Self {
            video_codec: None,
            video_bitrate: video_bitrate.to_string(),
            audio_bitrate: audio_bitrate.to_string(),
        }
    }

    /// Picks the codec for an output path (mkv containers get x264)
    pub fn for_path(mut self, path: &Path) -> Self {
        if path.extension().and_then(|e| e.to_str()) == Some("mkv") {
            self.video_codec = Some("libx264".to_string());
        }
        self
    }
}

// =============================================================================
// Backend Trait
// =============================================================================

/// Operations the timeline consumes from a media codec library.
///
/// All calls are synchronous and may block for as long as the underlying
/// library needs.
pub trait MediaBackend: Send + Sync {
    /// Backend name, for logging
    fn name(&self) -> &str;

    /// Decodes a file into media with a known kind and duration
    fn decode(&self, path: &Path) -> MediaResult<MediaHandle>;

    /// Time-bounded part of a clip
    fn subclip(&self, clip: &MediaHandle, start: TimeSec, end: TimeSec)
        -> MediaResult<MediaHandle>;

    /// Cuts a file-backed clip without re-encoding.
    ///
    /// Backends without a raw-copy path fall back to [`MediaBackend::subclip`].
    fn copy_subclip(
        &self,
        clip: &MediaHandle,
        _origin: &Path,
        start: TimeSec,
        end: TimeSec,
    ) -> MediaResult<MediaHandle> {
        self.subclip(clip, start, end)
    }

    /// Joins audio clips back to back
    fn concatenate_audio(&self, clips: &[MediaHandle]) -> MediaResult<MediaHandle>;

    /// Joins video clips back to back
    fn concatenate_video(&self, clips: &[MediaHandle]) -> MediaResult<MediaHandle>;

    /// Mixes audio layers, each starting at its own offset
    fn composite_audio(&self, layers: &[Layer]) -> MediaResult<MediaHandle>;

    /// Stacks video layers, each starting at its own offset
    fn composite_video(&self, layers: &[Layer], size: Option<Size2D>) -> MediaResult<MediaHandle>;

    /// Multiplies the volume, optionally only inside a window
    fn scale_volume(
        &self,
        clip: &MediaHandle,
        factor: f64,
        window: Option<TimeWindow>,
    ) -> MediaResult<MediaHandle>;

    /// Fades the picture of a video clip
    fn fade_video(&self, clip: &MediaHandle, edge: FadeEdge, duration: TimeSec)
        -> MediaResult<MediaHandle>;

    /// Fades an audio clip
    fn fade_audio(&self, clip: &MediaHandle, edge: FadeEdge, duration: TimeSec)
        -> MediaResult<MediaHandle>;

    /// Stretches a video clip to the given frame size
    fn resize(&self, clip: &MediaHandle, size: Size2D) -> MediaResult<MediaHandle>;

    /// Audio of a clip: the clip itself for audio, the embedded stream for video
    fn audio_of(&self, clip: &MediaHandle) -> MediaResult<Option<MediaHandle>>;

    /// Replaces the audio stream of a video clip
    fn with_audio(&self, video: &MediaHandle, audio: &MediaHandle) -> MediaResult<MediaHandle>;

    /// Silent audio of the given duration
    fn silence(&self, duration: TimeSec) -> MediaResult<MediaHandle>;

    /// Video showing `text` as a caption on a plain background, without audio
    fn text_clip(&self, text: &str, duration: TimeSec, size: Size2D) -> MediaResult<MediaHandle>;

    /// Writes a clip to a file
    fn encode(&self, clip: &MediaHandle, path: &Path, settings: &EncodeSettings)
        -> MediaResult<()>;

    /// Plays the audio of a clip until it ends or `signals` is stopped.
    ///
    /// Implementations must call [`PlaybackSignals::mark_audio_ready`] once
    /// output has started, and return promptly after the playing flag clears.
    fn play(&self, clip: &MediaHandle, signals: &PlaybackSignals) -> MediaResult<()>;
}
