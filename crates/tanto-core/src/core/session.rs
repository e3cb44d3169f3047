//! Editing Session
//!
//! Holds everything one editor instance works on: the workspaces with their
//! tracks, the clipboard and graveyard, the head pointer, playback and the
//! project directory. Editing commands are methods on [`Session`] (see
//! [`crate::core::commands`]) and all reach the timeline through the helpers
//! defined here.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::core::{
    commands::{CommandRegistry, TOGGLE_HEAD_OVERRIDE},
    media::MediaBackend,
    naming::TrackNamer,
    playback::PlaybackController,
    project,
    settings::TantoSettings,
    timeline::{Clip, Track},
    workspace::WorkspaceManager,
    CoreError, CoreResult, TimeSec, TrackId,
};

/// Status returned by the head override toggle
pub const OVERRIDE_STATUS: &str = "Override...";

/// Weak pointer to a track: its id plus the name it had when pointed at
#[derive(Clone, Debug, PartialEq)]
pub struct HeadRef {
    pub track_id: TrackId,
    pub name: String,
}

impl HeadRef {
    pub fn to(track: &Track) -> Self {
        Self {
            track_id: track.id.clone(),
            name: track.name.clone(),
        }
    }
}

pub struct Session {
    backend: Arc<dyn MediaBackend>,
    pub(crate) settings: TantoSettings,
    pub(crate) workspaces: WorkspaceManager,
    pub(crate) clipboard: Option<Clip>,
    graveyard_id: TrackId,
    pub(crate) head: Option<HeadRef>,
    /// Makes the next command act on the head track
    pub(crate) head_override: bool,
    pub(crate) saved_mark: Option<TimeSec>,
    pub(crate) playback: PlaybackController,
    project_dir: Option<PathBuf>,
}

impl Session {
    /// Creates a session with an empty timeline apart from the graveyard
    pub fn new(backend: Arc<dyn MediaBackend>, mut settings: TantoSettings) -> Self {
        settings.normalize();
        let mut workspaces = WorkspaceManager::new(settings.editor.num_workspaces);
        let graveyard = Track::graveyard();
        let graveyard_id = graveyard.id.clone();
        workspaces.append_track(graveyard);

        let playback = PlaybackController::new(
            settings.playback.audio_fps,
            settings.playback.buffer_size,
            Duration::from_millis(settings.playback.ready_timeout_ms),
        );

        info!(backend = backend.name(), "Session created");
        Self {
            backend,
            settings,
            workspaces,
            clipboard: None,
            graveyard_id,
            head: None,
            head_override: false,
            saved_mark: None,
            playback,
            project_dir: None,
        }
    }

    /// Creates a session and loads every track found in `dir`
    pub fn open(
        backend: Arc<dyn MediaBackend>,
        settings: TantoSettings,
        dir: impl Into<PathBuf>,
    ) -> CoreResult<Self> {
        let mut session = Self::new(backend, settings);
        let dir = dir.into();
        session.load_dir(&dir)?;
        session.project_dir = Some(dir);
        Ok(session)
    }

    pub fn backend(&self) -> Arc<dyn MediaBackend> {
        Arc::clone(&self.backend)
    }

    pub fn settings(&self) -> &TantoSettings {
        &self.settings
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    pub fn project_dir(&self) -> Option<&Path> {
        self.project_dir.as_deref()
    }

    pub fn set_project_dir(&mut self, dir: Option<PathBuf>) {
        self.project_dir = dir;
    }

    pub fn clipboard(&self) -> Option<&Clip> {
        self.clipboard.as_ref()
    }

    pub fn head(&self) -> Option<&HeadRef> {
        self.head.as_ref()
    }

    pub fn head_override(&self) -> bool {
        self.head_override
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Runs the command registered as `id` and returns its status.
    ///
    /// Commands that need text only return their prompt and leave the head
    /// override in place for [`Session::dispatch_input`].
    pub fn dispatch(&mut self, registry: &CommandRegistry, id: &str) -> String {
        match registry.get(id) {
            Some(entry) if entry.takes_input() => {
                debug!(command = id, "Waiting for input");
                entry.prompt.clone().unwrap_or_default()
            }
            Some(entry) => self.execute(id, |session| entry.run(session)),
            None => unknown_command(id),
        }
    }

    /// Runs the command registered as `id` on text the user entered
    pub fn dispatch_input(&mut self, registry: &CommandRegistry, id: &str, input: &str) -> String {
        match registry.get(id) {
            Some(entry) => self.execute(id, |session| entry.run_with_input(session, input)),
            None => unknown_command(id),
        }
    }

    /// Runs `f` as the command `id`, turning errors into a status.
    ///
    /// Validation failures come back as their message. Anything else is
    /// logged and reported as `"exception"`. The head override lasts for one
    /// command, so it is cleared afterwards unless `id` is the toggle itself.
    pub fn execute(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut Session) -> CoreResult<String>,
    ) -> String {
        let status = match f(self) {
            Ok(status) => status,
            Err(e) if e.is_user_facing() => {
                debug!(command = id, reason = %e, "Command rejected");
                e.to_status()
            }
            Err(e) => {
                error!(command = id, error = %e, "Command failed");
                e.to_status()
            }
        };
        if id != TOGGLE_HEAD_OVERRIDE {
            self.head_override = false;
        }
        status
    }

    // =========================================================================
    // Current Track / Clip
    // =========================================================================

    /// Id of the track commands act on: the head while the override is
    /// active, otherwise the selected live track.
    ///
    /// Under the override a missing head is reported as such.
    pub(crate) fn current_track_id(&self) -> CoreResult<TrackId> {
        if self.head_override {
            return self.require_head().map(|t| t.id.clone());
        }
        self.workspaces
            .current_track()
            .map(|t| t.id.clone())
            .ok_or(CoreError::NoCurrentTrack)
    }

    pub fn current_track(&self) -> CoreResult<&Track> {
        let id = self.current_track_id()?;
        self.workspaces
            .track_by_id(&id)
            .ok_or(CoreError::NoCurrentTrack)
    }

    pub fn current_track_mut(&mut self) -> CoreResult<&mut Track> {
        let id = self.current_track_id()?;
        self.workspaces
            .track_by_id_mut(&id)
            .ok_or(CoreError::NoCurrentTrack)
    }

    /// Position of the current track in the live set
    pub(crate) fn current_live_index(&self) -> CoreResult<usize> {
        let id = self.current_track_id()?;
        self.workspaces
            .live_index(&id)
            .ok_or(CoreError::NoCurrentTrack)
    }

    pub fn current_clip(&self) -> CoreResult<&Clip> {
        self.current_track()?
            .current()
            .ok_or(CoreError::NoCurrentClip)
    }

    pub fn current_clip_mut(&mut self) -> CoreResult<&mut Clip> {
        self.current_track_mut()?
            .current_mut()
            .ok_or(CoreError::NoCurrentClip)
    }

    /// Middle part of the current clip's trisection
    pub(crate) fn current_subclip(&self) -> CoreResult<Clip> {
        let clip = self.current_clip()?;
        Ok(clip.trisection(self.backend.as_ref())?.middle)
    }

    // =========================================================================
    // Head
    // =========================================================================

    pub fn head_track(&self) -> Option<&Track> {
        let head = self.head.as_ref()?;
        self.workspaces.track_by_id(&head.track_id)
    }

    /// Head track, failing if the head is unset or its track is gone
    pub(crate) fn require_head(&self) -> CoreResult<&Track> {
        let head = self.head.as_ref().ok_or(CoreError::HeadNotSet)?;
        self.workspaces
            .track_by_id(&head.track_id)
            .ok_or_else(|| CoreError::TrackNotFound(head.name.clone()))
    }

    pub(crate) fn require_head_mut(&mut self) -> CoreResult<&mut Track> {
        let head = self.head.as_ref().ok_or(CoreError::HeadNotSet)?;
        let name = head.name.clone();
        let id = head.track_id.clone();
        self.workspaces
            .track_by_id_mut(&id)
            .ok_or(CoreError::TrackNotFound(name))
    }

    pub(crate) fn point_head_at(&mut self, track_id: &str) {
        self.head = self.workspaces.track_by_id(track_id).map(HeadRef::to);
    }

    // =========================================================================
    // Clipboard / Graveyard
    // =========================================================================

    pub fn graveyard(&self) -> CoreResult<&Track> {
        self.workspaces
            .track_by_id(&self.graveyard_id)
            .ok_or_else(|| CoreError::Internal("graveyard track is missing".to_string()))
    }

    pub(crate) fn is_graveyard(&self, track_id: &str) -> bool {
        track_id == self.graveyard_id
    }

    /// Moves a clip into the graveyard, which accepts any kind of clip
    pub(crate) fn bury(&mut self, clip: Clip) -> CoreResult<()> {
        let graveyard = self
            .workspaces
            .track_by_id_mut(&self.graveyard_id)
            .ok_or_else(|| CoreError::Internal("graveyard track is missing".to_string()))?;
        graveyard.audio_only = false;
        graveyard.set_cursor(Some(graveyard.len()));
        graveyard.insert_clip(clip, true)?;
        debug!(clips = graveyard.len(), "Clip moved to graveyard");
        Ok(())
    }

    /// Puts a clip on the clipboard; the previous one goes to the graveyard
    pub(crate) fn put_clipboard(&mut self, clip: Clip) -> CoreResult<()> {
        if let Some(previous) = self.clipboard.replace(clip) {
            self.bury(previous)?;
        }
        Ok(())
    }

    // =========================================================================
    // Naming
    // =========================================================================

    fn namer_budget(&self) -> usize {
        self.settings.editor.naming_retry_budget
    }

    pub(crate) fn all_track_names(&self) -> HashSet<String> {
        self.workspaces.all_track_names()
    }

    pub(crate) fn sub_track_name(&self, base: &str) -> CoreResult<String> {
        let names = self.all_track_names();
        TrackNamer::new(&names, self.namer_budget()).sub_name(base)
    }

    pub(crate) fn side_track_name(&self, base: &str) -> CoreResult<String> {
        let names = self.all_track_names();
        TrackNamer::new(&names, self.namer_budget()).side_name(base, None)
    }

    pub(crate) fn link_track_name(&self, parent: &str, index: usize) -> CoreResult<String> {
        let names = self.all_track_names();
        TrackNamer::new(&names, self.namer_budget()).link_name(parent, index)
    }

    /// `base` if no track uses it yet, otherwise a side name of it
    pub(crate) fn unique_track_name(&self, base: &str) -> CoreResult<String> {
        let names = self.all_track_names();
        if !names.contains(base) {
            return Ok(base.to_string());
        }
        TrackNamer::new(&names, self.namer_budget()).side_name(base, None)
    }

    /// Temporary copy of a track under a fresh sub name
    pub(crate) fn make_clone_track(&self, track: &Track) -> CoreResult<Track> {
        let mut clone = track.duplicate(self.backend.as_ref())?;
        clone.temporary = true;
        clone.name = self.sub_track_name(&track.name)?;
        Ok(clone)
    }

    /// Appends a track to the live set and selects it
    pub(crate) fn add_and_select(&mut self, track: Track) -> usize {
        let index = self.workspaces.append_track(track);
        self.workspaces.set_cursor(Some(index));
        index
    }

    // =========================================================================
    // Project
    // =========================================================================

    /// Loads every visible entry of `dir`: sub-directories as tracks, files
    /// as single-file tracks
    pub fn load_dir(&mut self, dir: &Path) -> CoreResult<usize> {
        let backend = self.backend();
        let mut loaded = 0;
        for path in project::sorted_entries(dir)? {
            if path.is_dir() {
                let mut track = project::track_from_dir(backend.as_ref(), &path)?;
                track.temporary = false;
                project::load_vars(&mut track, dir)?;
                let preference = track.workspace_preference;
                if let Err(e) = self.place_loaded(track, preference) {
                    warn!(dir = %path.display(), error = %e, "Loaded track kept in current workspace");
                }
            } else {
                self.load_file_into(&path, dir)?;
            }
            loaded += 1;
        }
        info!(dir = %dir.display(), tracks = loaded, "Project loaded");
        Ok(loaded)
    }

    /// Puts a loaded track into its preferred workspace, falling back to the
    /// live one
    fn place_loaded(&mut self, track: Track, workspace: usize) -> CoreResult<()> {
        let index = self.workspaces.append_track(track);
        if workspace != self.workspaces.current_workspace() {
            let cursor = self.workspaces.cursor();
            self.workspaces.send_track(index, workspace)?;
            self.workspaces.set_cursor(cursor);
        }
        Ok(())
    }

    /// Opens a single media file as a new selected track
    pub fn load_file(&mut self, path: &Path) -> CoreResult<String> {
        let project_dir = self
            .project_dir
            .clone()
            .or_else(|| path.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        self.load_file_into(path, &project_dir)
    }

    fn load_file_into(&mut self, path: &Path, project_dir: &Path) -> CoreResult<String> {
        let fallback = format!("track {}", self.workspaces.tracks().len());
        let mut track = project::track_from_file(self.backend.as_ref(), path, &fallback)?;
        project::load_vars(&mut track, project_dir)?;
        track.workspace_preference = self.workspaces.current_workspace();
        let name = track.name.clone();
        self.add_and_select(track);
        Ok(format!("Loaded {}", name))
    }

    /// Writes var files of every non-temporary track in every workspace
    pub fn store_track_vars(&self) -> CoreResult<usize> {
        let Some(dir) = self.project_dir.as_deref() else {
            return Ok(0);
        };
        let mut stored = 0;
        for track in self.workspaces.all_tracks().filter(|t| !t.temporary) {
            project::store_vars(track, dir)?;
            stored += 1;
        }
        debug!(tracks = stored, "Stored track vars");
        Ok(stored)
    }

    /// Stops playback and stores track vars before shutting down
    pub fn quit(&mut self) -> CoreResult<String> {
        self.playback.stop();
        self.store_track_vars()?;
        info!("Session closed");
        Ok("bye".to_string())
    }
}

fn unknown_command(id: &str) -> String {
    warn!(command = id, "Unknown command");
    format!("Unknown command: {}", id)
}
