//! Clip Position State
//!
//! A [`Clip`] pairs a backend media handle with the editing state the user
//! attaches to it: a seek position, a mark, and the file it was decoded from.

use std::path::{Path, PathBuf};

use crate::core::{
    media::{MediaBackend, MediaHandle},
    CoreResult, MediaKind, Size2D, TimeSec,
};

/// Media on a track together with its mark and seek position.
///
/// Cloning re-wraps the same media and keeps both positions. Slicing
/// produces new media with both positions reset to zero.
#[derive(Clone, Debug)]
pub struct Clip {
    media: MediaHandle,
    mark: TimeSec,
    seek_pos: TimeSec,
    origin_file: Option<PathBuf>,
}

/// A clip split at its selection: `[0, lo)`, `[lo, hi)`, `[hi, end)`
#[derive(Clone, Debug)]
pub struct Trisection {
    pub before: Clip,
    pub middle: Clip,
    pub after: Clip,
}

impl Clip {
    pub fn new(media: MediaHandle) -> Self {
        Self {
            media,
            mark: 0.0,
            seek_pos: 0.0,
            origin_file: None,
        }
    }

    /// Clip decoded directly from `path`
    pub fn from_file(media: MediaHandle, path: impl Into<PathBuf>) -> Self {
        Self {
            origin_file: Some(path.into()),
            ..Self::new(media)
        }
    }

    pub fn media(&self) -> &MediaHandle {
        &self.media
    }

    pub fn kind(&self) -> MediaKind {
        self.media.kind
    }

    pub fn is_audio(&self) -> bool {
        self.media.is_audio()
    }

    pub fn is_video(&self) -> bool {
        self.media.is_video()
    }

    pub fn duration(&self) -> TimeSec {
        self.media.duration
    }

    pub fn size(&self) -> Option<Size2D> {
        self.media.size
    }

    // =========================================================================
    // Positions
    // =========================================================================

    pub fn mark(&self) -> TimeSec {
        self.mark
    }

    pub fn set_mark(&mut self, mark: TimeSec) {
        self.mark = self.clamp(mark);
    }

    pub fn seek_pos(&self) -> TimeSec {
        self.seek_pos
    }

    pub fn set_seek_pos(&mut self, pos: TimeSec) {
        self.seek_pos = self.clamp(pos);
    }

    pub fn reset_positions(&mut self) {
        self.mark = 0.0;
        self.seek_pos = 0.0;
    }

    /// Ordered selection bounds `(min(mark, seek), max(mark, seek))`
    pub fn selection(&self) -> (TimeSec, TimeSec) {
        (
            self.mark.min(self.seek_pos),
            self.mark.max(self.seek_pos),
        )
    }

    fn clamp(&self, t: TimeSec) -> TimeSec {
        if t.is_nan() {
            return 0.0;
        }
        t.clamp(0.0, self.duration())
    }

    // =========================================================================
    // Origin
    // =========================================================================

    pub fn origin_file(&self) -> Option<&Path> {
        self.origin_file.as_deref()
    }

    pub fn is_file_clip(&self) -> bool {
        self.origin_file.is_some()
    }

    // =========================================================================
    // Derivation
    // =========================================================================

    /// Wraps processed media while keeping this clip's positions.
    ///
    /// The result is no longer backed by the original file.
    pub fn rewrap(&self, media: MediaHandle) -> Clip {
        let mut clip = Clip {
            media,
            mark: 0.0,
            seek_pos: 0.0,
            origin_file: None,
        };
        clip.set_mark(self.mark);
        clip.set_seek_pos(self.seek_pos);
        clip
    }

    /// Cuts `[start, end)` out of this clip.
    ///
    /// File-backed clips go through the backend's raw-copy path, and the
    /// resulting clip is backed by the scratch file it produced.
    pub fn slice(&self, backend: &dyn MediaBackend, start: TimeSec, end: TimeSec) -> CoreResult<Clip> {
        let media = match &self.origin_file {
            Some(origin) => backend.copy_subclip(&self.media, origin, start, end)?,
            None => backend.subclip(&self.media, start, end)?,
        };
        let origin_file = media.scratch_path().map(Path::to_path_buf);
        Ok(Clip {
            media,
            mark: 0.0,
            seek_pos: 0.0,
            origin_file,
        })
    }

    /// Splits this clip at its mark and seek position
    pub fn trisection(&self, backend: &dyn MediaBackend) -> CoreResult<Trisection> {
        let (lo, hi) = self.selection();
        let duration = self.duration();
        let before = self.slice(backend, 0.0, lo)?;
        let middle = self.slice(backend, lo, hi)?;
        let after = if hi >= duration {
            self.slice(backend, 0.0, 0.0)?
        } else {
            self.slice(backend, hi, duration)?
        };
        Ok(Trisection {
            before,
            middle,
            after,
        })
    }
}
