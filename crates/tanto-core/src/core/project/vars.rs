//! Track Var Files
//!
//! Each persisted track owns a directory holding one hidden file per
//! property (`.parent`, `.offset`, ...). Values are JSON literals, each read
//! with the type its key expects.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::{timeline::Track, CoreError, CoreResult};

/// Keys of the persisted track properties
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKey {
    Parent,
    ParentAudioFactor,
    AudioOnly,
    Index,
    Offset,
    Locked,
    WorkspacePreference,
    Tags,
    Size,
    FadeDuration,
    VideoBitrate,
    AudioBitrate,
}

impl VarKey {
    pub const ALL: [VarKey; 12] = [
        VarKey::Parent,
        VarKey::ParentAudioFactor,
        VarKey::AudioOnly,
        VarKey::Index,
        VarKey::Offset,
        VarKey::Locked,
        VarKey::WorkspacePreference,
        VarKey::Tags,
        VarKey::Size,
        VarKey::FadeDuration,
        VarKey::VideoBitrate,
        VarKey::AudioBitrate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VarKey::Parent => "parent",
            VarKey::ParentAudioFactor => "parentAudioFactor",
            VarKey::AudioOnly => "audioOnly",
            VarKey::Index => "index",
            VarKey::Offset => "offset",
            VarKey::Locked => "locked",
            VarKey::WorkspacePreference => "workspacePreference",
            VarKey::Tags => "tags",
            VarKey::Size => "size",
            VarKey::FadeDuration => "fadeDuration",
            VarKey::VideoBitrate => "video_bitrate",
            VarKey::AudioBitrate => "audio_bitrate",
        }
    }

    pub fn file_name(self) -> String {
        format!(".{}", self.as_str())
    }

    /// Serializes the track's value for this key
    fn render(self, track: &Track) -> serde_json::Result<String> {
        match self {
            VarKey::Parent => serde_json::to_string(&track.parent),
            VarKey::ParentAudioFactor => serde_json::to_string(&track.parent_audio_factor),
            VarKey::AudioOnly => serde_json::to_string(&track.audio_only),
            VarKey::Index => serde_json::to_string(&track.cursor()),
            VarKey::Offset => serde_json::to_string(&track.offset),
            VarKey::Locked => serde_json::to_string(&track.locked),
            VarKey::WorkspacePreference => serde_json::to_string(&track.workspace_preference),
            VarKey::Tags => serde_json::to_string(&track.tags),
            VarKey::Size => serde_json::to_string(&track.size),
            VarKey::FadeDuration => serde_json::to_string(&track.fade_duration),
            VarKey::VideoBitrate => serde_json::to_string(&track.video_bitrate),
            VarKey::AudioBitrate => serde_json::to_string(&track.audio_bitrate),
        }
    }

    /// Parses `raw` and assigns it. On error the track is left unchanged.
    fn apply(self, track: &mut Track, raw: &str) -> serde_json::Result<()> {
        let raw = raw.trim();
        match self {
            VarKey::Parent => track.parent = serde_json::from_str(raw)?,
            VarKey::ParentAudioFactor => track.parent_audio_factor = serde_json::from_str(raw)?,
            VarKey::AudioOnly => track.audio_only = serde_json::from_str(raw)?,
            VarKey::Index => track.set_cursor(serde_json::from_str(raw)?),
            VarKey::Offset => track.offset = serde_json::from_str(raw)?,
            VarKey::Locked => track.locked = serde_json::from_str(raw)?,
            VarKey::WorkspacePreference => track.workspace_preference = serde_json::from_str(raw)?,
            VarKey::Tags => track.tags = serde_json::from_str(raw)?,
            VarKey::Size => track.size = serde_json::from_str(raw)?,
            VarKey::FadeDuration => track.fade_duration = serde_json::from_str(raw)?,
            VarKey::VideoBitrate => track.video_bitrate = serde_json::from_str(raw)?,
            VarKey::AudioBitrate => track.audio_bitrate = serde_json::from_str(raw)?,
        }
        Ok(())
    }
}

/// Directory holding a track's var files and clips.
///
/// File tracks use a hidden directory named after their file so it does not
/// load as a track of its own.
pub fn track_dir(project_dir: &Path, track: &Track) -> PathBuf {
    match track.file.as_deref().and_then(Path::file_name) {
        Some(base) => project_dir.join(format!(".{}", base.to_string_lossy())),
        None => project_dir.join(&track.name),
    }
}

/// Creates the track directory if needed
pub fn ensure_track_dir(project_dir: &Path, track: &Track) -> CoreResult<PathBuf> {
    let dir = track_dir(project_dir, track);
    if dir.is_file() {
        return Err(CoreError::ValidationError(format!(
            "Cannot write to {}: it is a file.",
            dir.display()
        )));
    }
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Writes every var file of `track`
pub fn store_vars(track: &Track, project_dir: &Path) -> CoreResult<PathBuf> {
    let dir = ensure_track_dir(project_dir, track)?;
    for key in VarKey::ALL {
        fs::write(dir.join(key.file_name()), key.render(track)?)?;
    }
    debug!(track = %track.name, dir = %dir.display(), "Stored track vars");
    Ok(dir)
}

/// Reads whatever var files exist for `track`.
///
/// Missing files are skipped; unreadable values keep the current value.
pub fn load_vars(track: &mut Track, project_dir: &Path) -> CoreResult<()> {
    let dir = track_dir(project_dir, track);
    if !dir.is_dir() {
        return Ok(());
    }

    for key in VarKey::ALL {
        let path = dir.join(key.file_name());
        if !path.is_file() {
            continue;
        }
        let raw = fs::read_to_string(&path)?;
        if let Err(e) = key.apply(track, &raw) {
            warn!(
                track = %track.name,
                key = key.as_str(),
                "Ignoring unreadable track var: {}",
                e
            );
        }
    }
    Ok(())
}
