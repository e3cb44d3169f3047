//! Mark Commands Module
//!
//! Setting, querying and remembering the mark of the current clip.

use crate::core::{
    session::Session,
    timeline::{show_mark, to_timecode},
    CoreError, CoreResult, TimeSec,
};

impl Session {
    /// Sets the mark at `pos`, or at the seek position when `pos` is `None`
    pub fn set_mark(&mut self, pos: Option<TimeSec>) -> CoreResult<String> {
        let clip = self.current_clip_mut()?;
        let pos = pos.unwrap_or_else(|| clip.seek_pos());
        clip.set_mark(pos);
        Ok(format!("Mark set at {}", to_timecode(clip.mark())))
    }

    /// Sets the mark at `percent` of the clip's duration
    pub fn set_mark_percentage(&mut self, percent: f64) -> CoreResult<String> {
        let duration = self.current_clip()?.duration();
        self.set_mark(Some(duration * percent / 100.0))
    }

    pub fn set_mark_start(&mut self) -> CoreResult<String> {
        self.set_mark(Some(0.0))
    }

    pub fn set_mark_end(&mut self) -> CoreResult<String> {
        let duration = self.current_clip()?.duration();
        self.set_mark(Some(duration))
    }

    pub fn where_mark(&self) -> CoreResult<String> {
        let clip = self.current_clip()?;
        Ok(format!(
            "seek at {}, mark at {}",
            to_timecode(clip.seek_pos()),
            to_timecode(clip.mark())
        ))
    }

    pub fn jump_to_mark(&mut self) -> CoreResult<String> {
        let mark = self.current_clip()?.mark();
        self.seek(mark)
    }

    /// Remembers the current clip's mark for [`Session::paste_mark`]
    pub fn save_mark(&mut self) -> CoreResult<String> {
        let mark = match self.current_clip() {
            Ok(clip) => clip.mark(),
            Err(CoreError::NoCurrentClip | CoreError::NoCurrentTrack) => {
                return Err(CoreError::ValidationError(
                    "Cannot save mark: No clip!".to_string(),
                ))
            }
            Err(e) => return Err(e),
        };
        self.saved_mark = Some(mark);
        Ok(format!("Saved mark {}", show_mark(mark)))
    }

    pub fn paste_mark(&mut self) -> CoreResult<String> {
        let saved = self.saved_mark;
        let clip = self.current_clip_mut().map_err(|_| {
            CoreError::ValidationError("Need a clip to paste mark onto.".to_string())
        })?;
        let mark = saved.ok_or_else(|| CoreError::ValidationError("No mark to paste.".to_string()))?;
        clip.set_mark(mark);
        Ok(format!("Set mark to {}", show_mark(clip.mark())))
    }
}
