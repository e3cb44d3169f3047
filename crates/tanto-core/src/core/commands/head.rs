//! Head Commands Module
//!
//! The head is a second cursor pointing at a track. Copy-to-head and mix
//! write into it, and Tab swaps it with the selected track.

use tracing::debug;

use crate::core::{
    session::{HeadRef, Session, OVERRIDE_STATUS},
    timeline::{show_mark, to_timecode},
    CoreError, CoreResult,
};

impl Session {
    /// Describes the head as `<track> at <position>[ with mark at <tc>]`
    pub fn str_head(&self) -> String {
        let Some(track) = self.head_track() else {
            return "none".to_string();
        };
        let w = format!("{} at {}", track.name, track.str_index());
        match track.current() {
            Some(clip) if clip.mark() != 0.0 => {
                format!("{} with mark at {}", w, to_timecode(clip.mark()))
            }
            _ => w,
        }
    }

    /// Points the head at the current track
    pub fn set_head(&mut self) -> CoreResult<String> {
        let head = HeadRef::to(self.current_track()?);
        self.head = Some(head);
        Ok(format!("Head is now at {}", self.str_head()))
    }

    pub fn where_is_head(&self) -> CoreResult<String> {
        if self.head.is_none() {
            return Ok("Head is not set.".to_string());
        }
        Ok(format!("Head is set to {}", self.str_head()))
    }

    /// Makes the next command act on the head track instead of the
    /// selected one
    pub fn toggle_head_override(&mut self) -> CoreResult<String> {
        self.head_override = !self.head_override;
        debug!(active = self.head_override, "Head override toggled");
        Ok(OVERRIDE_STATUS.to_string())
    }

    /// Offsets the head track by the current clip's mark, which lines up a
    /// linked track before merging
    pub fn set_head_offset(&mut self) -> CoreResult<String> {
        let mark = self.current_clip()?.mark();
        let head = self.require_head_mut()?;
        head.offset = mark;
        Ok(format!("offset {} for {}", show_mark(mark), head.name))
    }

    /// Selects the head track and points the head at the previously
    /// selected one, switching workspace if the head lives elsewhere.
    ///
    /// Switching twice returns to where it started.
    pub fn switch_head(&mut self) -> CoreResult<String> {
        let head = self.head.clone().ok_or(CoreError::HeadNotSet)?;
        let (index, workspace) = self
            .workspaces
            .find_track_indices(&head.track_id)
            .ok_or_else(|| CoreError::TrackNotFound(head.name.clone()))?;
        let previous = self.workspaces.current_track().map(HeadRef::to);

        if workspace != self.workspaces.current_workspace() {
            self.workspaces.switch_to_workspace(workspace)?;
        }
        self.workspaces.set_cursor(Some(index));
        self.head = previous;

        let track = self
            .workspaces
            .current_track()
            .ok_or(CoreError::NoCurrentTrack)?;
        Ok(format!(
            "Tabbed to head at {} in {}",
            track.str_index(),
            track.name
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

    #[test]
    fn test_set_head_reports_mark() {
        let (g, mut session) = setup();
        add_track(&mut session, "voice", vec![audio_clip(&g, 10.0)]);

        assert_eq!(session.set_head().unwrap(), "Head is now at voice at clip 0");

        session.current_clip_mut().unwrap().set_mark(2.5);
        assert_eq!(
            session.where_is_head().unwrap(),
            "Head is set to voice at clip 0 with mark at 0:00:02.500000"
        );
    }

    #[test]
    fn test_where_is_head_unset() {
        let (_g, session) = setup();
        assert_eq!(session.where_is_head().unwrap(), "Head is not set.");
        assert_eq!(session.str_head(), "none");
    }

    #[test]
    fn test_toggle_override_flips() {
        let (_g, mut session) = setup();
        assert_eq!(session.toggle_head_override().unwrap(), OVERRIDE_STATUS);
        assert!(session.head_override());
        session.toggle_head_override().unwrap();
        assert!(!session.head_override());
    }

    #[test]
    fn test_set_head_offset_uses_mark() {
        let (g, mut session) = setup();
        add_track(&mut session, "child", vec![]);
        session.set_head().unwrap();
        add_track(&mut session, "main", vec![audio_clip(&g, 8.0)]);
        session.current_clip_mut().unwrap().set_mark(3.0);

        assert_eq!(session.set_head_offset().unwrap(), "offset 3 seconds for child");
        assert_eq!(session.head_track().unwrap().offset, 3.0);
    }

    #[test]
    fn test_set_head_offset_without_head() {
        let (g, mut session) = setup();
        add_track(&mut session, "main", vec![audio_clip(&g, 8.0)]);
        assert!(matches!(
            session.set_head_offset().unwrap_err(),
            CoreError::HeadNotSet
        ));
    }

    #[test]
    fn test_switch_head_twice_is_identity() {
        let (g, mut session) = setup();
        add_track(&mut session, "a", vec![audio_clip(&g, 1.0)]);
        session.set_head().unwrap();
        add_track(&mut session, "b", vec![audio_clip(&g, 1.0)]);
        let start = session.workspaces().cursor();

        let status = session.switch_head().unwrap();
        assert_eq!(status, "Tabbed to head at clip 0 in a");
        assert_eq!(session.head().unwrap().name, "b");

        session.switch_head().unwrap();
        assert_eq!(session.workspaces().cursor(), start);
        assert_eq!(session.head().unwrap().name, "a");
    }

    #[test]
    fn test_switch_head_unset() {
        let (_g, mut session) = setup();
        assert!(matches!(
            session.switch_head().unwrap_err(),
            CoreError::HeadNotSet
        ));
    }
}
