//! Clip Commands Module
//!
//! Edits on the clip under the cursor: splitting, cut/copy/paste, volume,
//! audio mixing and export.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::core::{
    media::{EncodeSettings, Layer, MediaBackend, MediaHandle},
    project,
    session::Session,
    timeline::{show_mark, Clip, Track},
    CoreError, CoreResult, Size2D, TimeSec,
};

/// Frame size of text clips when there is no video clip to match
const TEXT_CLIP_SIZE: Size2D = Size2D {
    width: 1024,
    height: 768,
};

/// Length of a new text clip
const TEXT_CLIP_DURATION: TimeSec = 3.0;

/// Joins media of one kind back to back
fn join(backend: &dyn MediaBackend, clip: &Clip, parts: &[MediaHandle]) -> CoreResult<MediaHandle> {
    let joined = if clip.is_audio() {
        backend.concatenate_audio(parts)?
    } else {
        backend.concatenate_video(parts)?
    };
    Ok(joined)
}

/// Lays `parts` out at their start offsets, audio or video as `clip` is
fn overlay(backend: &dyn MediaBackend, clip: &Clip, parts: Vec<Layer>) -> CoreResult<MediaHandle> {
    let composed = if clip.is_audio() {
        backend.composite_audio(&parts)?
    } else {
        backend.composite_video(&parts, clip.size())?
    };
    Ok(composed)
}

impl Session {
    // =========================================================================
    // Splitting
    // =========================================================================

    /// Splits the current clip at its mark.
    ///
    /// The two halves replace the clip either in place or on a temporary
    /// clone of the track, which is appended to the track list.
    pub fn bisect(&mut self, in_place: bool) -> CoreResult<String> {
        let backend = self.backend();
        let clip = self.current_clip()?;
        let mark = clip.mark();
        if mark <= 0.0 || mark >= clip.duration() {
            return Err(CoreError::InvalidSelection("nothing cut".to_string()));
        }
        let a = clip.slice(backend.as_ref(), 0.0, mark)?;
        let b = clip.slice(backend.as_ref(), mark, clip.duration())?;

        if in_place {
            let track = self.current_track_mut()?;
            split_into(track, a, b)?;
            return Ok(format!("Ok. cut clip onto {}", track.name));
        }

        let mut clone = self.make_clone_track(self.current_track()?)?;
        split_into(&mut clone, a, b)?;
        let name = clone.name.clone();
        self.workspaces.append_track(clone);
        Ok(format!("Ok. cut clip onto new track {}", name))
    }

    /// Cuts or copies the selection between mark and seek position.
    ///
    /// The selection goes to the clipboard. Cutting the whole clip removes
    /// it; otherwise the parts before and after the selection are joined.
    pub fn cut_clip(&mut self, copy: bool) -> CoreResult<String> {
        let backend = self.backend();
        let track = self.current_track()?;
        if !copy && track.locked {
            return Err(CoreError::LockedTrack(track.name.clone()));
        }
        let clip = track.current().ok_or(CoreError::NoCurrentClip)?;
        if clip.mark() == clip.seek_pos() {
            return Err(CoreError::InvalidSelection("nothing selected".to_string()));
        }

        let parts = clip.trisection(backend.as_ref())?;
        let middle_duration = parts.middle.duration();
        let whole = parts.before.duration() == 0.0 && parts.after.duration() == 0.0;
        let remainder = if copy || whole {
            None
        } else {
            let layers = vec![
                Layer::new(parts.before.media().clone(), 0.0),
                Layer::new(parts.after.media().clone(), parts.before.duration()),
            ];
            Some(Clip::new(overlay(backend.as_ref(), clip, layers)?))
        };

        self.put_clipboard(parts.middle)?;
        if copy {
            return Ok(format!("Copied clip with duration {}", show_mark(middle_duration)));
        }

        let track = self.current_track_mut()?;
        match remainder {
            None => {
                track.remove(false)?;
                Ok("Cut clip.".to_string())
            }
            Some(rest) => {
                track.replace_current(rest);
                Ok(format!("Cut {} from clip.", show_mark(middle_duration)))
            }
        }
    }

    /// Inserts a copy of the clipboard at the cursor
    pub fn paste(&mut self) -> CoreResult<String> {
        let mut clip = self.clipboard.clone().ok_or(CoreError::EmptyClipboard)?;
        clip.reset_positions();
        let duration = clip.duration();

        let track = self.current_track_mut()?;
        if !track.insert_clip(clip, false)? {
            return Err(CoreError::ValidationError(format!(
                "Cannot paste video into audio-only track {}.",
                track.name
            )));
        }
        Ok(format!("Pasted clip with {} into {}", show_mark(duration), track.name))
    }

    /// Moves the current clip into the graveyard
    pub fn remove_clip(&mut self) -> CoreResult<String> {
        let track = self.current_track_mut()?;
        if track.locked {
            return Err(CoreError::LockedTrack(track.name.clone()));
        }
        if track.is_empty() {
            return Err(CoreError::ValidationError(
                "Can't remove clip: No clips in track.".to_string(),
            ));
        }
        let clip = track.remove(false)?.ok_or(CoreError::NoCurrentClip)?;
        self.bury(clip)?;
        Ok("Ok. Clip moved to graveyard.".to_string())
    }

    // =========================================================================
    // Volume
    // =========================================================================

    /// Scales the volume by `1 + step`.
    ///
    /// Without a mark the whole clip changes. Otherwise only the selection
    /// does, and the clip is rebuilt from its three parts with the original
    /// mark and seek position restored.
    pub fn change_volume(&mut self, step: f64) -> CoreResult<String> {
        let factor = 1.0 + step;
        let backend = self.backend();
        let track = self.current_track()?;
        if track.locked {
            return Err(CoreError::LockedTrack(track.name.clone()));
        }
        let clip = track.current().ok_or(CoreError::NoCurrentClip)?;
        let mark = clip.mark();

        let (rebuilt, status) = if mark == 0.0 {
            let scaled = backend.scale_volume(clip.media(), factor, None)?;
            (clip.rewrap(scaled), format!("Ok. Changed volume by {}", step))
        } else {
            let parts = clip.trisection(backend.as_ref())?;
            let middle = backend.scale_volume(parts.middle.media(), factor, None)?;
            let joined = join(
                backend.as_ref(),
                clip,
                &[parts.before.media().clone(), middle, parts.after.media().clone()],
            )?;
            let mut rebuilt = Clip::new(joined);
            rebuilt.set_seek_pos(clip.seek_pos());
            rebuilt.set_mark(mark);
            (
                rebuilt,
                format!("Ok, changed volume of clip section by {}", step),
            )
        };

        self.current_track_mut()?.replace_current(rebuilt);
        Ok(status)
    }

    /// Scales the current clip's volume to `factor` times its level
    pub fn set_volume(&mut self, factor: f64) -> CoreResult<String> {
        if !(factor >= 0.0) {
            return Err(CoreError::ValidationError(
                "Can't set volume to negative number. Please specify a positive decimal number, like 0.2 or 3.1"
                    .to_string(),
            ));
        }
        let backend = self.backend();
        let track = self.current_track_mut()?;
        if track.locked {
            return Err(CoreError::LockedTrack(track.name.clone()));
        }
        let clip = track.current().ok_or(CoreError::NoCurrentClip)?;
        let scaled = clip.rewrap(backend.scale_volume(clip.media(), factor, None)?);
        track.replace_current(scaled);
        Ok(format!(
            "Ok. scaled volume to {} times its original value.",
            factor
        ))
    }

    // =========================================================================
    // Head Transfers
    // =========================================================================

    /// Selection of the current clip, or the whole clip when nothing is
    /// selected
    fn selection_or_clip(&self) -> CoreResult<Clip> {
        let subclip = self.current_subclip()?;
        if subclip.duration() > 0.0 {
            return Ok(subclip);
        }
        Ok(self.current_clip()?.clone())
    }

    /// Inserts the selection into the head track
    pub fn copy_to_head(&mut self) -> CoreResult<String> {
        let clip = self.selection_or_clip()?;
        let head = self.require_head_mut()?;
        if !head.insert_clip(clip, false)? {
            return Err(CoreError::ValidationError(format!(
                "Cannot copy video into audio-only track {}.",
                head.name
            )));
        }
        Ok(format!("Copied clip to {}", head.name))
    }

    /// Inserts `duration` seconds of silence at the head, or on a new track
    /// when no head is set and the head override is off
    pub fn create_silence_clip(&mut self, duration: TimeSec) -> CoreResult<String> {
        if !(duration > 0.0) {
            return Err(CoreError::ValidationError(
                "Please enter a positive, non-zero value.".to_string(),
            ));
        }
        let use_head = self.head_track().is_some() || self.head_override;
        if use_head {
            self.require_head()?;
        }
        let silence = Clip::new(self.backend().silence(duration)?);
        let track = if use_head {
            self.require_head_mut()?
        } else {
            self.new_track(None)?;
            self.current_track_mut()?
        };
        track.insert_clip(silence, false)?;
        Ok(format!(
            "Ok. Created {} seconds of silence at head position.",
            duration
        ))
    }

    /// Inserts a caption clip showing `text` at the cursor, creating a track
    /// first if there is none.
    ///
    /// The clip matches the frame size of the current clip when that is video.
    pub fn create_text_clip(&mut self, text: &str) -> CoreResult<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::ValidationError(
                "Please enter text to be displayed in clip.".to_string(),
            ));
        }
        if self.current_track().is_err() && !self.head_override {
            self.new_track(None)?;
        }

        let size = self
            .current_clip()
            .ok()
            .filter(|c| c.is_video())
            .and_then(Clip::size)
            .unwrap_or(TEXT_CLIP_SIZE);
        let clip = Clip::new(self.backend().text_clip(text, TEXT_CLIP_DURATION, size)?);

        let track = self.current_track_mut()?;
        if !track.insert_clip(clip, false)? {
            return Err(CoreError::ValidationError(format!(
                "Cannot add a text clip to audio-only track {}.",
                track.name
            )));
        }
        debug!(track = %track.name, width = size.width, height = size.height, "Created text clip");
        Ok("Created text clip.".to_string())
    }

    /// Mixes the selection's audio into the head's clip, starting at that
    /// clip's mark.
    ///
    /// The mix is cropped to the head clip. It either replaces the head clip
    /// or lands on a temporary copy of the head track.
    pub fn mix_audio(&mut self, in_place: bool) -> CoreResult<String> {
        let backend = self.backend();
        let source = self.selection_or_clip()?;
        let source_track = self.current_track()?;
        let head = self.require_head()?;
        let target = head.current().ok_or(CoreError::NoCurrentClip)?;

        if head.id == source_track.id && head.cursor() == source_track.cursor() {
            return Err(CoreError::ValidationError(
                "Mixing audio of a clip into itself is not supported yet.".to_string(),
            ));
        }
        if in_place && head.locked {
            return Err(CoreError::LockedTrack(head.name.clone()));
        }

        let source_audio = backend
            .audio_of(source.media())?
            .ok_or_else(|| CoreError::ValidationError("Source clip has no audio.".to_string()))?;
        let target_audio = match backend.audio_of(target.media())? {
            Some(audio) => audio,
            None => backend.silence(target.duration())?,
        };

        let mixed = backend.composite_audio(&[
            Layer::new(target_audio, 0.0),
            Layer::new(source_audio, target.mark()),
        ])?;
        let mixed = backend.subclip(&mixed, 0.0, target.duration())?;
        let media = if target.is_audio() {
            mixed
        } else {
            backend.with_audio(target.media(), &mixed)?
        };
        let replacement = target.rewrap(media);
        debug!(head = %head.name, offset = target.mark(), "Mixed audio into head clip");

        if in_place {
            let head = self.require_head_mut()?;
            head.replace_current(replacement);
            return Ok(format!("Ok. Mixed in audio track onto {}", head.name));
        }

        let mut clone = head.duplicate(backend.as_ref())?;
        clone.temporary = true;
        clone.name = self.side_track_name(&head.name)?;
        clone.replace_current(replacement);
        let name = clone.name.clone();
        self.workspaces.append_track(clone);
        Ok(format!("Ok. Mixed in audio track onto new track {}", name))
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Writes the current clip into the project directory, named after its
    /// track and position
    pub fn save_clip(&mut self) -> CoreResult<String> {
        let backend = self.backend();
        let track = self.current_track()?;
        let clip = track.current().ok_or(CoreError::NoCurrentClip)?;

        let name = project::clip_file_name(&track.name, &track.str_index(), clip.kind());
        let dir = self
            .project_dir()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let settings = EncodeSettings::new(&track.video_bitrate, &track.audio_bitrate);
        project::write_clip(backend.as_ref(), clip.media(), &dir.join(&name), &settings)?;

        info!(file = %name, "Wrote clip");
        Ok(format!("Ok. Wrote file {}", name))
    }
}

/// Replaces the clip at the cursor with `a` followed by `b`
fn split_into(track: &mut Track, a: Clip, b: Clip) -> CoreResult<()> {
    track.insert_clip(a, false)?;
    track.insert_clip(b, false)?;
    track.remove(false)?;
    Ok(())
}
