//! Navigation Commands Module
//!
//! Moving between tracks and clips, seeking inside a clip and playback.

use tracing::debug;

use crate::core::{
    media::MediaBackend,
    session::Session,
    timeline::{show_mark, to_timecode},
    CoreError, CoreResult, TimeSec,
};

const NO_TRACKS: &str = "No tracks. Please create a new track by hitting n.";

impl Session {
    // =========================================================================
    // Focus
    // =========================================================================

    /// Moves the track cursor by `y` or, when `y` is zero, the clip cursor
    /// by `x`.
    ///
    /// Without a selected track the first move selects the last track for
    /// `y >= 0` and the first one otherwise.
    pub fn shift_focus(&mut self, x: isize, y: isize) -> CoreResult<String> {
        let len = self.workspaces.tracks().len();
        let Some(current) = self.workspaces.cursor() else {
            if len == 0 {
                return Ok(NO_TRACKS.to_string());
            }
            let index = if y >= 0 { len - 1 } else { 0 };
            return Ok(self.focus_track(index));
        };

        if current >= len {
            self.workspaces.set_cursor(None);
            return Ok("Whoops. Something got lost in the shuffling. Try again.".to_string());
        }

        if y != 0 {
            let index = (current as isize + y).clamp(0, len as isize - 1) as usize;
            return Ok(self.focus_track(index));
        }

        let Some(track) = self.workspaces.current_track_mut() else {
            return Ok(String::new());
        };
        if x > 0 {
            track.right();
        } else if x < 0 {
            track.left();
        }
        Ok(track.str_index())
    }

    fn focus_track(&mut self, index: usize) -> String {
        self.workspaces.set_cursor(Some(index));
        self.workspaces
            .current_track()
            .map(|t| t.display_name())
            .unwrap_or_default()
    }

    pub fn min_focus(&mut self) -> CoreResult<String> {
        if self.workspaces.tracks().is_empty() {
            return Ok(NO_TRACKS.to_string());
        }
        Ok(self.focus_track(0))
    }

    pub fn max_focus(&mut self) -> CoreResult<String> {
        let len = self.workspaces.tracks().len();
        if len == 0 {
            return Ok(NO_TRACKS.to_string());
        }
        Ok(self.focus_track(len - 1))
    }

    /// Swaps the selected track with its neighbour above (`-1`) or below (`1`)
    pub fn order_track(&mut self, direction: isize) -> CoreResult<String> {
        self.workspaces.order_track(direction)?;
        let name = self
            .workspaces
            .current_track()
            .map(|t| t.display_name())
            .ok_or(CoreError::NoCurrentTrack)?;
        Ok(if direction <= 0 {
            format!("Moved up with {}", name)
        } else {
            format!("Moved down with {}", name)
        })
    }

    /// Describes the current track, clip and seek position
    pub fn where_am_i(&self) -> CoreResult<String> {
        let track = match self.current_track() {
            Ok(track) => track,
            Err(CoreError::NoCurrentTrack) => {
                return Ok("Please create at least 1 track.".to_string())
            }
            Err(e) => return Err(e),
        };

        let mut w = track.name.clone();
        if track.temporary {
            w = format!("temporary {}", w);
        }
        w.push_str(&format!(" at {}", track.str_index()));
        if let (Some(parent), Some(index)) = (track.parent_name(), track.parent_index()) {
            w.push_str(&format!(" linked to {} at clip {}", parent, index));
        }

        let Some(clip) = track.current() else {
            return Ok(w);
        };
        w.push_str(&format!(" at position {}", to_timecode(clip.seek_pos())));
        w.push_str(if clip.is_audio() { " *audio*" } else { " *video*" });
        Ok(w)
    }

    // =========================================================================
    // Seeking
    // =========================================================================

    /// Moves the seek position, restarting playback there if playing.
    ///
    /// Positions past the end land on the end of the clip.
    pub fn seek(&mut self, t: TimeSec) -> CoreResult<String> {
        let clip = self.current_clip_mut()?;
        clip.set_seek_pos(t);
        let pos = clip.seek_pos();

        if self.is_playing() {
            self.playback.stop();
            self.start_playback()?;
            return Ok(String::new());
        }
        Ok(show_mark(pos))
    }

    pub fn seek_percentage(&mut self, percent: f64) -> CoreResult<String> {
        let duration = self.current_clip()?.duration();
        self.seek(duration * percent / 100.0)
    }

    pub fn seek_relative(&mut self, step: TimeSec) -> CoreResult<String> {
        let pos = self.current_clip()?.seek_pos();
        self.seek(pos + step)
    }

    /// Scales both seek step sizes by `factor`
    pub fn step_factor(&mut self, factor: f64) -> CoreResult<String> {
        let editor = &mut self.settings.editor;
        editor.small_time_step *= factor;
        editor.large_time_step *= factor;
        Ok(format!(
            "timesteps are {} and {}",
            editor.small_time_step, editor.large_time_step
        ))
    }

    // =========================================================================
    // Playback
    // =========================================================================

    /// Starts or stops playing the current clip from its seek position.
    ///
    /// With `seek_on_pause`, stopping moves the seek position to where
    /// playback got to.
    pub fn play_pause(&mut self, seek_on_pause: bool) -> CoreResult<String> {
        if self.is_playing() {
            let reached = self.playback.stop();
            debug!(position = ?reached, "Playback paused");
            return match reached {
                Some(pos) if seek_on_pause => self.seek(pos),
                _ => Ok(String::new()),
            };
        }
        self.start_playback()
    }

    fn start_playback(&mut self) -> CoreResult<String> {
        let backend = self.backend();
        let clip = self.current_clip()?;
        let start = clip.seek_pos();
        if start >= clip.duration() {
            return Ok("End of clip.".to_string());
        }

        let rest = backend.subclip(clip.media(), start, clip.duration())?;
        let audio = backend
            .audio_of(&rest)?
            .ok_or_else(|| CoreError::ValidationError("Clip has no audio.".to_string()))?;
        self.playback.start(backend, audio, start)?;
        Ok(String::new())
    }
}
