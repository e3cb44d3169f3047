//! Track Commands Module
//!
//! Creating, naming, locking, linking, merging, removing and saving tracks.

use std::path::Path;

use tracing::{debug, info};

use crate::core::{
    project,
    session::Session,
    timeline::{Clip, Track},
    CoreError, CoreResult,
};

impl Session {
    // =========================================================================
    // Creation
    // =========================================================================

    /// Appends an empty track and selects it.
    ///
    /// Without a name the track is called `track <n>`, made unique if that
    /// name is taken. An explicit name must be free.
    pub fn new_track(&mut self, name: Option<&str>) -> CoreResult<String> {
        let name = match name {
            Some(name) => {
                self.check_track_name(name)?;
                name.to_string()
            }
            None => {
                let base = format!("track {}", self.workspaces.tracks().len());
                self.unique_track_name(&base)?
            }
        };
        self.add_and_select(Track::new(name));
        Ok("Ok".to_string())
    }

    fn check_track_name(&self, name: &str) -> CoreResult<()> {
        if name.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "Please enter a new name for the track.".to_string(),
            ));
        }
        if self.all_track_names().contains(name) {
            return Err(CoreError::ValidationError(format!(
                "A track named {} already exists.",
                name
            )));
        }
        Ok(())
    }

    /// Renames the current track, keeping the head's cached name and the
    /// links of its child tracks in step
    pub fn rename_track(&mut self, name: &str) -> CoreResult<String> {
        let track = self.current_track()?;
        if self.is_graveyard(&track.id) {
            return Err(CoreError::ValidationError(
                "Cannot rename the graveyard.".to_string(),
            ));
        }
        if track.name == name {
            return Ok(format!("Ok. Renamed track to {}", name));
        }
        self.check_track_name(name)?;

        let track = self.current_track_mut()?;
        let old = std::mem::replace(&mut track.name, name.to_string());
        let id = track.id.clone();
        if let Some(head) = self.head.as_mut().filter(|h| h.track_id == id) {
            head.name = name.to_string();
        }
        let relinked = self.workspaces.relink_children(&old, name);
        debug!(from = %old, to = name, relinked, "Renamed track");
        Ok(format!("Ok. Renamed track to {}", name))
    }

    /// Appends a temporary copy of the current track
    pub fn create_clone_track(&mut self) -> CoreResult<String> {
        let clone = self.make_clone_track(self.current_track()?)?;
        let name = clone.name.clone();
        self.workspaces.append_track(clone);
        Ok(format!("Cloned to track {}", name))
    }

    /// Creates a track linked to the current clip, starting at its mark.
    ///
    /// The new track goes right below the current one and becomes both the
    /// selected track and the head.
    pub fn create_link_track(&mut self) -> CoreResult<String> {
        let index = self.current_live_index()?;
        let parent = self.current_track()?;
        let clip_index = parent.cursor().ok_or(CoreError::NoCurrentClip)?;
        let offset = parent.current().ok_or(CoreError::NoCurrentClip)?.mark();

        let name = self.link_track_name(&parent.name, clip_index)?;
        let linked = Track::linked(name.clone(), parent, clip_index, offset);
        let id = linked.id.clone();

        let at = self.workspaces.insert_track(index + 1, linked);
        self.workspaces.set_cursor(Some(at));
        self.point_head_at(&id);
        info!(track = %name, clip = clip_index, offset, "Created linked track");
        Ok(format!(
            "Created linked track {} and pointed head at it.",
            name
        ))
    }

    /// Makes the current linked track duck its parent by `factor`
    pub fn set_parent_audio_factor(&mut self, factor: f64) -> CoreResult<String> {
        if !(factor >= 0.0) {
            return Err(CoreError::ValidationError(
                "Can't set volume to negative number. Please specify a positive decimal number, like 0.2 or 3.1"
                    .to_string(),
            ));
        }
        let track = self.current_track_mut()?;
        if !track.has_parent() {
            return Err(CoreError::ValidationError(
                "Cannot set parent audio: Track is not linked.".to_string(),
            ));
        }
        track.parent_audio_factor = Some(factor);
        Ok(format!(
            "Set parent audio factor to {} for the duration of track {}",
            factor, track.name
        ))
    }

    // =========================================================================
    // Locking / Removal
    // =========================================================================

    /// Locks or unlocks the current track. The graveyard only ever locks.
    pub fn toggle_lock(&mut self) -> CoreResult<String> {
        let id = self.current_track()?.id.clone();
        let graveyard = self.is_graveyard(&id);
        let track = self.current_track_mut()?;

        if graveyard {
            if track.locked {
                return Ok("Cannot unlock graveyard. Sorry.".to_string());
            }
            track.locked = true;
            return Ok(
                "Abandon all hope, ye who enter the graveyard, for it is locked!".to_string(),
            );
        }

        track.locked = !track.locked;
        Ok(if track.locked {
            "Track locked."
        } else {
            "Track unlocked."
        }
        .to_string())
    }

    /// Removes the current track, moving all its clips to the graveyard
    pub fn remove_track(&mut self) -> CoreResult<String> {
        let index = self.current_live_index()?;
        let track = self
            .workspaces
            .track_at_mut(index)
            .ok_or(CoreError::NoCurrentTrack)?;
        if track.locked {
            return Err(CoreError::LockedTrack(track.name.clone()));
        }

        track.rewind();
        let mut clips = Vec::with_capacity(track.len());
        while let Some(clip) = track.remove(false)? {
            clips.push(clip);
        }
        let name = track.name.clone();
        let buried = clips.len();
        for clip in clips {
            self.bury(clip)?;
        }
        self.workspaces.remove_track_at(index);

        info!(track = %name, clips = buried, "Removed track");
        Ok(format!(
            "Ok. Removed track {}. Moved {} clips to graveyard.",
            name, buried
        ))
    }

    // =========================================================================
    // Merging
    // =========================================================================

    fn check_mergable(track: &Track) -> CoreResult<()> {
        if track.is_empty() {
            return Err(CoreError::ValidationError(
                "Track has no clips to merge.".to_string(),
            ));
        }
        if !track.is_mergable() {
            return Err(CoreError::NotMergable(track.name.clone()));
        }
        Ok(())
    }

    /// Joins the current track's clips onto a new track, with fades at clip
    /// boundaries if `fade` is set
    pub fn merge_track(&mut self, fade: bool) -> CoreResult<String> {
        let backend = self.backend();
        let source = self.current_track()?;
        Self::check_mergable(source)?;

        let merged = source
            .concatenate(backend.as_ref(), fade)?
            .ok_or_else(|| CoreError::NotMergable(source.name.clone()))?;
        let name = self.sub_track_name(&source.name)?;
        self.place_merged(name, merged)
    }

    /// Flattens the current track together with every track linked to it
    /// onto a new track
    pub fn merge_track_tree(&mut self) -> CoreResult<String> {
        let backend = self.backend();
        let source = self.current_track()?;
        Self::check_mergable(source)?;

        let find = |name: &str, index: usize| self.workspaces.find_children(name, index);
        let merged = source
            .rec_concatenate(backend.as_ref(), &find, false)?
            .ok_or_else(|| CoreError::NotMergable(source.name.clone()))?;
        let name = self.sub_track_name(&source.name)?;
        self.place_merged(name, merged)
    }

    fn place_merged(&mut self, name: String, merged: Clip) -> CoreResult<String> {
        let mut track = Track::new(name.clone());
        track.insert_clip(merged, false)?;
        self.add_and_select(track);
        Ok(format!("Ok. Merged clips onto {}", name))
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Writes the current track into the project directory
    pub fn save_track(&mut self) -> CoreResult<String> {
        let dir = self.project_dir().map(Path::to_path_buf).ok_or_else(|| {
            CoreError::ValidationError("Cannot save: no project directory.".to_string())
        })?;
        let backend = self.backend();
        let track = self.current_track_mut()?;
        let written = project::save_track(track, backend.as_ref(), &dir)?;
        Ok(format!(
            "Ok. Saved track {} with {} clips.",
            track.name, written
        ))
    }
}
