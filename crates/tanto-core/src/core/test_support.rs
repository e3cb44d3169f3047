//! Shared fixtures for unit and scenario tests.

use std::path::Path;

use crate::core::{
    kind_from_path,
    media::{GraphBackend, MediaBackend, SourceInfo},
    new_id,
    timeline::Clip,
    MediaKind, Size2D,
};

pub(crate) const TEST_FRAME: Size2D = Size2D { width: 640, height: 480 };

pub(crate) fn backend() -> GraphBackend {
    GraphBackend::new()
}

fn source(kind: MediaKind, duration: f64) -> SourceInfo {
    match kind {
        MediaKind::Audio => SourceInfo::audio(duration),
        MediaKind::Video => SourceInfo::video(duration, TEST_FRAME),
    }
}

/// Registers and decodes a fresh source, returning a clip not tied to a file
fn decoded(backend: &GraphBackend, kind: MediaKind, duration: f64) -> Clip {
    let ext = if kind.is_audio() { "wav" } else { "mkv" };
    let path = format!("/media/{}.{}", new_id(), ext);
    backend.register_source(&path, source(kind, duration)).unwrap();
    Clip::new(backend.decode(Path::new(&path)).unwrap())
}

pub(crate) fn audio_clip(backend: &GraphBackend, duration: f64) -> Clip {
    decoded(backend, MediaKind::Audio, duration)
}

pub(crate) fn video_clip(backend: &GraphBackend, duration: f64) -> Clip {
    decoded(backend, MediaKind::Video, duration)
}

/// Clip decoded straight from `path`, as loaded from a project
pub(crate) fn file_clip(backend: &GraphBackend, path: &str, duration: f64) -> Clip {
    let path = Path::new(path);
    backend
        .register_source(path, source(kind_from_path(path), duration))
        .unwrap();
    Clip::from_file(backend.decode(path).unwrap(), path)
}
