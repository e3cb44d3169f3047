//! Project Persistence
//!
//! A project is a plain directory. Sub-directories are tracks whose files are
//! their clips in name order; loose media files become single-file tracks.
//! Track properties live in hidden var files next to the clips.

mod vars;

pub use vars::{ensure_track_dir, load_vars, store_vars, track_dir, VarKey};

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::{
    kind_from_path,
    media::{EncodeSettings, MediaBackend, MediaHandle, ScratchFile},
    timeline::{Clip, Track},
    CoreResult, MediaKind,
};

/// Width names are padded to so that `2` sorts before `10`
const SORT_WIDTH: usize = 10;

/// Sort key for directory entries
pub fn pad_zero(name: &str) -> String {
    format!("{:0>width$}", name, width = SORT_WIDTH)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Visible entries of `dir`, sorted by padded name
pub fn sorted_entries(dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.retain(|p| !file_name(p).starts_with('.'));
    entries.sort_by_key(|p| pad_zero(&file_name(p)));
    Ok(entries)
}

// =============================================================================
// Loading
// =============================================================================

/// Decodes `path` and inserts it into `track`.
///
/// Video files are skipped on audio-only tracks without decoding them.
pub fn insert_file(
    track: &mut Track,
    backend: &dyn MediaBackend,
    path: &Path,
    force: bool,
) -> CoreResult<bool> {
    if track.audio_only && kind_from_path(path).is_video() {
        debug!(track = %track.name, file = %path.display(), "Skipping video file");
        return Ok(false);
    }
    let media = backend.decode(path)?;
    track.insert_clip(Clip::from_file(media, path), force)
}

/// Builds a track from the media files directly inside `dir`
pub fn track_from_dir(backend: &dyn MediaBackend, dir: &Path) -> CoreResult<Track> {
    let mut track = Track::new(file_name(dir));
    for path in sorted_entries(dir)? {
        if path.is_dir() {
            continue;
        }
        insert_file(&mut track, backend, &path, false)?;
    }
    if track.clips().iter().all(Clip::is_audio) {
        track.audio_only = true;
    }
    Ok(track)
}

/// Track mirroring a single media file, cursor on its clip
pub fn track_from_file(
    backend: &dyn MediaBackend,
    path: &Path,
    fallback_name: &str,
) -> CoreResult<Track> {
    let name = match file_name(path) {
        n if n.is_empty() => fallback_name.to_string(),
        n => n,
    };
    let mut track = Track::new(name);
    track.audio_only = kind_from_path(path).is_audio();
    track.temporary = false;
    track.file = Some(path.to_path_buf());
    insert_file(&mut track, backend, path, false)?;
    track.left();
    Ok(track)
}

// =============================================================================
// Saving
// =============================================================================

/// Encodes `media` to `dest` through a scratch file in the same directory,
/// so `dest` is either the old file or the complete new one.
pub fn write_clip(
    backend: &dyn MediaBackend,
    media: &MediaHandle,
    dest: &Path,
    settings: &EncodeSettings,
) -> CoreResult<()> {
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let suffix = dest
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let scratch = ScratchFile::create_in(dir, &suffix)?;
    backend.encode(media, scratch.path(), &settings.clone().for_path(dest))?;
    scratch.persist(dest)?;
    Ok(())
}

fn clip_extension(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Audio => "wav",
        MediaKind::Video => "mkv",
    }
}

/// Whether `name` is a clip file as written by [`save_track`]
fn is_clip_file_name(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty()
                && stem.bytes().all(|b| b.is_ascii_digit())
                && (ext == clip_extension(MediaKind::Audio) || ext == clip_extension(MediaKind::Video))
        }
        None => false,
    }
}

/// Removes numbered clip files in `dir` other than `keep`
fn prune_stale_clips(dir: &Path, keep: &HashSet<String>) -> CoreResult<usize> {
    let mut removed = 0;
    for path in sorted_entries(dir)? {
        let name = file_name(&path);
        if path.is_dir() || keep.contains(&name) || !is_clip_file_name(&name) {
            continue;
        }
        fs::remove_file(&path)?;
        debug!(file = %path.display(), "Removed stale clip file");
        removed += 1;
    }
    Ok(removed)
}

/// Persists a track: var files always, clips unless it mirrors a file.
///
/// Clips are written as `<index>.mkv` or `<index>.wav`. Numbered clip files
/// from an earlier save that no longer match a clip are removed afterwards.
/// Returns the number of clips written.
pub fn save_track(
    track: &mut Track,
    backend: &dyn MediaBackend,
    project_dir: &Path,
) -> CoreResult<usize> {
    track.temporary = false;
    let dir = store_vars(track, project_dir)?;
    if track.file.is_some() {
        return Ok(0);
    }

    let settings = EncodeSettings::new(&track.video_bitrate, &track.audio_bitrate);
    let mut written = HashSet::with_capacity(track.len());
    for (i, clip) in track.clips().iter().enumerate() {
        let name = format!("{}.{}", i, clip_extension(clip.kind()));
        write_clip(backend, clip.media(), &dir.join(&name), &settings)?;
        written.insert(name);
    }
    let pruned = prune_stale_clips(&dir, &written)?;
    info!(track = %track.name, clips = track.len(), pruned, "Saved track");
    Ok(track.len())
}

/// File name for an exported clip: `<track>-<position>`, spaces as dashes
pub fn clip_file_name(track_name: &str, position: &str, kind: MediaKind) -> String {
    format!("{}-{}.{}", track_name, position, clip_extension(kind)).replace(' ', "-")
}
