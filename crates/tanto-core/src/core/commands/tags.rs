//! Tag Commands Module
//!
//! Named positions on the current clip, cycled and jumped to like bookmarks.

use tracing::debug;

use crate::core::{session::Session, timeline::show_mark, CoreError, CoreResult};

impl Session {
    /// Tags the current clip at its seek position, or at its mark if
    /// `use_mark` is set
    pub fn add_tag(&mut self, name: &str, use_mark: bool) -> CoreResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::ValidationError(
                "Please enter a name for the tag.".to_string(),
            ));
        }
        let track = self.current_track_mut()?;
        if track.locked {
            return Err(CoreError::ValidationError(
                "Cannot add tag: Track is locked.".to_string(),
            ));
        }
        let clip = track.current().ok_or_else(|| {
            CoreError::ValidationError("Need a clip to add tag to.".to_string())
        })?;
        let pos = if use_mark { clip.mark() } else { clip.seek_pos() };

        track.add_tag(name, pos);
        debug!(track = %track.name, tag = name, pos, "Tag added");
        Ok(format!("Tag {} added at position {}.", name, show_mark(pos)))
    }

    /// Deletes the current tag of the current clip
    pub fn remove_tag(&mut self) -> CoreResult<String> {
        let track = self.current_track_mut()?;
        if track.locked {
            return Err(CoreError::ValidationError(
                "Cannot remove tag: Track is locked.".to_string(),
            ));
        }
        if track.current().is_none() {
            return Err(CoreError::ValidationError(
                "Cannot delete tag: No clip selected!".to_string(),
            ));
        }
        let tag = track.current_tag().cloned().ok_or_else(|| {
            CoreError::ValidationError("Cannot remove tag: No tag to remove.".to_string())
        })?;

        track.remove_tag(&tag.name);
        Ok(format!(
            "Deleted tag {} at position {}",
            tag.name,
            show_mark(tag.pos)
        ))
    }

    /// Advances to the next (or previous) tag and describes it
    pub fn next_tag(&mut self, prev: bool) -> CoreResult<String> {
        self.current_track_mut()?.next_tag(prev);
        self.show_tag()
    }

    pub fn show_tag(&self) -> CoreResult<String> {
        let track = self.current_track()?;
        Ok(match track.current_tag() {
            Some(tag) => format!("{} at {}", tag.name, show_mark(tag.pos)),
            None => "No tags for clip.".to_string(),
        })
    }

    /// Seeks to the current tag, or sets the mark there if `use_mark` is set
    pub fn seek_tag(&mut self, use_mark: bool) -> CoreResult<String> {
        let track = self.current_track()?;
        if track.current().is_none() {
            return Err(CoreError::ValidationError(
                "Cannot jump to tag without a clip!".to_string(),
            ));
        }
        let tag = track.current_tag().cloned().ok_or_else(|| {
            CoreError::ValidationError("Cannot jump: No tags for clip.".to_string())
        })?;

        if use_mark {
            self.current_clip_mut()?.set_mark(tag.pos);
            return Ok(format!(
                "set mark to tag {} at position {}",
                tag.name,
                show_mark(tag.pos)
            ));
        }
        self.seek(tag.pos)?;
        Ok(format!(
            "seek to tag {} at position {}",
            tag.name,
            show_mark(tag.pos)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::media::GraphBackend;
    use crate::core::settings::TantoSettings;
    use crate::core::test_support::audio_clip;
    use crate::core::timeline::{Clip, Track};
    use std::sync::Arc;

    fn setup() -> (Arc<GraphBackend>, Session) {
        let backend = Arc::new(GraphBackend::new());
        let session = Session::new(backend.clone(), TantoSettings::default());
        (backend, session)
    }

    fn add_track(session: &mut Session, name: &str, clips: Vec<Clip>) {
        let mut track = Track::new(name);
        for clip in clips {
            track.insert_clip(clip, false).unwrap();
        }
        track.rewind();
        session.add_and_select(track);
    }

    /// Session with one 20 second clip tagged `intro` at 2 and `chorus` at 12
    fn tagged() -> Session {
        let (g, mut session) = setup();
        add_track(&mut session, "song", vec![audio_clip(&g, 20.0)]);
        session.seek(2.0).unwrap();
        session.add_tag("intro", false).unwrap();
        session.current_clip_mut().unwrap().set_mark(12.0);
        session.add_tag("chorus", true).unwrap();
        session
    }

    #[test]
    fn test_add_tag_requires_name_and_clip() {
        let (_g, mut session) = setup();
        add_track(&mut session, "empty", vec![]);
        assert_eq!(
            session.add_tag("  ", false).unwrap_err().to_status(),
            "Please enter a name for the tag."
        );
        assert_eq!(
            session.add_tag("x", false).unwrap_err().to_status(),
            "Need a clip to add tag to."
        );
    }

    #[test]
    fn test_add_tag_refused_on_locked_track() {
        let (g, mut session) = setup();
        add_track(&mut session, "song", vec![audio_clip(&g, 5.0)]);
        session.toggle_lock().unwrap();
        let err = session.add_tag("x", false).unwrap_err();
        assert_eq!(err.to_status(), "Cannot add tag: Track is locked.");
    }

    #[test]
    fn test_cycle_and_show_tags() {
        let mut session = tagged();
        let first = session.next_tag(false).unwrap();
        let second = session.next_tag(false).unwrap();
        assert_ne!(first, second);
        assert!(first.ends_with("at 2 seconds") || first.ends_with("at 12 seconds"));
        assert_eq!(session.show_tag().unwrap(), second);
    }

    #[test]
    fn test_seek_tag_and_mark_tag() {
        let mut session = tagged();
        session.next_tag(false).unwrap();
        let pos = session
            .current_track()
            .unwrap()
            .current_tag()
            .unwrap()
            .pos;

        let status = session.seek_tag(false).unwrap();
        assert!(status.starts_with("seek to tag"));
        assert_eq!(session.current_clip().unwrap().seek_pos(), pos);

        session.current_clip_mut().unwrap().set_mark(0.0);
        let status = session.seek_tag(true).unwrap();
        assert!(status.starts_with("set mark to tag"));
        assert_eq!(session.current_clip().unwrap().mark(), pos);
    }

    #[test]
    fn test_remove_tag_until_empty() {
        let mut session = tagged();
        session.next_tag(false).unwrap();
        assert!(session.remove_tag().unwrap().starts_with("Deleted tag"));
        session.next_tag(false).unwrap();
        assert!(session.remove_tag().is_ok());

        assert_eq!(session.show_tag().unwrap(), "No tags for clip.");
        assert_eq!(
            session.remove_tag().unwrap_err().to_status(),
            "Cannot remove tag: No tag to remove."
        );
        assert_eq!(
            session.seek_tag(false).unwrap_err().to_status(),
            "Cannot jump: No tags for clip."
        );
    }
}
