//! Track Model
//!
//! A track is an ordered sequence of clips with a cursor. The cursor ranges
//! over `[0, len]`: `len` means "past the last clip" and is where inserts
//! append, while `None` only ever describes an empty track.

use std::path::PathBuf;

use tracing::debug;

use super::{format::show_mark, Clip, Tag, TagStore, TRACK_TAG_SLOT};
use crate::core::{
    media::MediaBackend, new_id, CoreError, CoreResult, Size2D, TimeSec, TrackId, WorkspaceId,
};

/// Name of the soft-delete track
pub const GRAVEYARD_NAME: &str = "graveyard";

pub const DEFAULT_FADE_DURATION: TimeSec = 0.2;
pub const DEFAULT_VIDEO_BITRATE: &str = "8000k";
pub const DEFAULT_AUDIO_BITRATE: &str = "50000k";

/// `(parent track name, parent clip index)`
pub type ParentLink = (String, usize);

#[derive(Debug)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    clips: Vec<Clip>,
    cursor: Option<usize>,
    pub locked: bool,
    /// Temporary tracks are never written to the project directory
    pub temporary: bool,
    pub audio_only: bool,
    /// Canonical frame size, taken from the first video clip
    pub size: Option<Size2D>,
    pub parent: Option<ParentLink>,
    /// Start of this track relative to the parent clip, in seconds
    pub offset: TimeSec,
    /// Volume factor applied to the parent while this track plays over it
    pub parent_audio_factor: Option<f64>,
    pub workspace_preference: WorkspaceId,
    pub tags: TagStore,
    pub fade_duration: TimeSec,
    pub video_bitrate: String,
    pub audio_bitrate: String,
    /// Media file this track mirrors, for tracks loaded from a single file
    pub file: Option<PathBuf>,
}

impl Track {
    /// Creates an empty, temporary track
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            clips: Vec::new(),
            cursor: None,
            locked: false,
            temporary: true,
            audio_only: false,
            size: None,
            parent: None,
            offset: 0.0,
            parent_audio_factor: None,
            workspace_preference: 1,
            tags: TagStore::new(),
            fade_duration: DEFAULT_FADE_DURATION,
            video_bitrate: DEFAULT_VIDEO_BITRATE.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            file: None,
        }
    }

    /// The locked soft-delete track
    pub fn graveyard() -> Self {
        Self {
            locked: true,
            ..Self::new(GRAVEYARD_NAME)
        }
    }

    pub fn is_graveyard(&self) -> bool {
        self.name == GRAVEYARD_NAME
    }

    /// Track linked to clip `index` of `parent`, starting `offset` seconds in
    pub fn linked(name: impl Into<String>, parent: &Track, index: usize, offset: TimeSec) -> Self {
        Self {
            parent: Some((parent.name.clone(), index)),
            offset,
            ..Self::new(name)
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Moves the cursor, clamped to `[0, len]`. Empty tracks keep no cursor.
    pub fn set_cursor(&mut self, cursor: Option<usize>) {
        self.cursor = match cursor {
            Some(_) if self.clips.is_empty() => None,
            Some(i) => Some(i.min(self.clips.len())),
            None => None,
        };
    }

    pub fn duration(&self) -> TimeSec {
        self.clips.iter().map(Clip::duration).sum()
    }

    pub fn has_video(&self) -> bool {
        self.clips.iter().any(Clip::is_video)
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_ref().map(|(name, _)| name.as_str())
    }

    pub fn parent_index(&self) -> Option<usize> {
        self.parent.as_ref().map(|(_, index)| *index)
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    /// Whether every clip is of the same kind
    pub fn is_mergable(&self) -> bool {
        let videos = self.clips.iter().any(Clip::is_video);
        let audios = self.clips.iter().any(Clip::is_audio);
        !(videos && audios)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Clip at the cursor, or at `index` without moving the cursor
    pub fn get(&self, index: Option<usize>) -> Option<&Clip> {
        self.clips.get(index.or(self.cursor)?)
    }

    pub fn get_mut(&mut self, index: Option<usize>) -> Option<&mut Clip> {
        let i = index.or(self.cursor)?;
        self.clips.get_mut(i)
    }

    pub fn current(&self) -> Option<&Clip> {
        self.get(None)
    }

    pub fn current_mut(&mut self) -> Option<&mut Clip> {
        self.get_mut(None)
    }

    pub fn left(&mut self) {
        if let Some(i) = self.cursor {
            self.cursor = Some(i.saturating_sub(1));
        }
    }

    pub fn right(&mut self) {
        if let Some(i) = self.cursor {
            if i < self.clips.len() {
                self.cursor = Some(i + 1);
            }
        }
    }

    pub fn rewind(&mut self) {
        self.set_cursor(Some(0));
    }

    /// True without a cursor or past the last clip
    pub fn at_end(&self) -> bool {
        self.cursor.map_or(true, |i| i >= self.clips.len())
    }

    pub fn str_index(&self) -> String {
        match self.cursor {
            None => "no clip".to_string(),
            Some(_) if self.at_end() => "end of track".to_string(),
            Some(i) => format!("clip {}", i),
        }
    }

    /// Name decorated with the track's flags, as shown in track lists
    pub fn display_name(&self) -> String {
        let mut w: String = self.name.chars().take(50).collect();

        if self.has_parent() {
            let offset = if self.offset > 0.0 {
                show_mark(self.offset)
            } else {
                String::new()
            };
            w = format!("*link {}* {}", offset, w);
        }
        if self.audio_only {
            w.push_str(" *audio*");
        }
        if self.file.is_some() {
            w.push_str(" *file*");
        }
        if self.temporary {
            w = format!("& {}", w);
        }
        if self.locked {
            w = format!("%{}", w);
        }
        w
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    fn check_unlocked(&self, force: bool) -> CoreResult<()> {
        if self.locked && !force {
            return Err(CoreError::LockedTrack(self.name.clone()));
        }
        Ok(())
    }

    /// Inserts a clip at the cursor and moves the cursor past it.
    ///
    /// Video clips offered to an audio-only track are dropped; the return
    /// value tells whether the clip went in. The first clip decides the
    /// track's kind, frame size and bitrates.
    pub fn insert_clip(&mut self, clip: Clip, force: bool) -> CoreResult<bool> {
        self.check_unlocked(force)?;

        if self.audio_only && clip.is_video() {
            debug!(track = %self.name, "Ignoring video clip on audio-only track");
            return Ok(false);
        }

        if self.clips.is_empty() {
            let media = clip.media();
            if clip.is_video() {
                self.size = media.size;
                if let Some(rate) = &media.video_bitrate {
                    self.video_bitrate = rate.clone();
                }
            } else {
                self.audio_only = true;
            }
            if let Some(rate) = &media.audio_bitrate {
                self.audio_bitrate = rate.clone();
            }
            self.clips.push(clip);
            self.cursor = Some(1);
            return Ok(true);
        }

        let at = self.cursor.unwrap_or(self.clips.len()).min(self.clips.len());
        self.clips.insert(at, clip);
        self.cursor = Some(at);
        self.right();
        Ok(true)
    }

    /// Removes the clip at the cursor and returns it.
    ///
    /// Nothing happens past the end of the track. The cursor stays on the
    /// following clip, or the new last one.
    pub fn remove(&mut self, force: bool) -> CoreResult<Option<Clip>> {
        self.check_unlocked(force)?;

        let Some(i) = self.cursor.filter(|&i| i < self.clips.len()) else {
            return Ok(None);
        };
        let clip = self.clips.remove(i);

        if self.clips.is_empty() {
            self.cursor = None;
            return Ok(Some(clip));
        }
        if i >= self.clips.len() {
            self.cursor = Some(self.clips.len() - 1);
        }
        if !self.has_video() {
            self.audio_only = true;
        }
        Ok(Some(clip))
    }

    /// Swaps the clip at the cursor for `clip`. Returns false without one.
    pub fn replace_current(&mut self, clip: Clip) -> bool {
        match self.current_mut() {
            Some(slot) => {
                *slot = clip;
                true
            }
            None => false,
        }
    }

    /// Independent copy with a fresh id. Each clip is re-sliced so the copy
    /// shares no media with this track; the copy is never locked.
    pub fn duplicate(&self, backend: &dyn MediaBackend) -> CoreResult<Track> {
        let clips = self
            .clips
            .iter()
            .map(|c| c.slice(backend, 0.0, c.duration()))
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(Track {
            id: new_id(),
            name: self.name.clone(),
            clips,
            cursor: self.cursor,
            locked: false,
            temporary: self.temporary,
            audio_only: self.audio_only,
            size: self.size,
            parent: self.parent.clone(),
            offset: self.offset,
            parent_audio_factor: self.parent_audio_factor,
            workspace_preference: self.workspace_preference,
            tags: self.tags.clone(),
            fade_duration: self.fade_duration,
            video_bitrate: self.video_bitrate.clone(),
            audio_bitrate: self.audio_bitrate.clone(),
            file: self.file.clone(),
        })
    }

    // =========================================================================
    // Tags
    // =========================================================================

    /// Tag slot for the cursor position
    pub fn tag_slot(&self) -> i64 {
        self.cursor.map_or(TRACK_TAG_SLOT, |i| i as i64)
    }

    /// Tags the current slot. Locked tracks are left untouched.
    pub fn add_tag(&mut self, name: impl Into<String>, pos: TimeSec) -> bool {
        if self.locked {
            return false;
        }
        let slot = self.tag_slot();
        self.tags.add(slot, Tag::new(name, pos));
        true
    }

    pub fn next_tag(&mut self, prev: bool) -> Option<&Tag> {
        let slot = self.tag_slot();
        self.tags.next(slot, prev)
    }

    pub fn remove_tag(&mut self, name: &str) -> bool {
        let slot = self.tag_slot();
        self.tags.remove(slot, name) > 0
    }

    pub fn current_tag(&self) -> Option<&Tag> {
        self.tags.current(self.tag_slot())
    }
}
