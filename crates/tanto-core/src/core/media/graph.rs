//! Render Graph Backend
//!
//! In-process [`MediaBackend`] that performs no signal processing. Every
//! operation produces a [`RenderNode`] describing how the result is built
//! from its inputs, so a whole edit session reduces to a tree that can be
//! inspected, serialized, and handed to a real renderer.
//!
//! Source files are known through registered [`SourceInfo`] probes, or by
//! decoding a render document previously written by [`MediaBackend::encode`].
//!
//! Nodes share their inputs, and each node lives only as long as some
//! handle or downstream node still refers to it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    EncodeSettings, FadeEdge, Layer, MediaBackend, MediaError, MediaHandle, MediaResult,
    ScratchFile,
};
use crate::core::{
    new_id, playback::PlaybackSignals, MediaId, MediaKind, Size2D, TimeSec, TimeWindow,
    TIME_EPSILON,
};

/// Polling interval of the simulated playback loop
const PLAYBACK_POLL: Duration = Duration::from_millis(10);

/// Frame rate of generated text clips
const TEXT_FPS: f64 = 30.0;

/// Table size below which dead node entries are left in place
const SWEEP_THRESHOLD: usize = 256;

// =============================================================================
// Render Graph
// =============================================================================

/// One node of a render graph, with the stream properties of its output
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderNode {
    pub id: MediaId,
    pub kind: MediaKind,
    pub duration_sec: TimeSec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size2D>,
    pub has_audio: bool,
    pub op: RenderOp,
}

/// Media placed at an offset inside a composite node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderLayer {
    pub start_sec: TimeSec,
    pub node: Arc<RenderNode>,
}

/// Operation that produced a node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RenderOp {
    Source {
        path: PathBuf,
    },
    Silence,
    Text {
        text: String,
    },
    Subclip {
        source: Arc<RenderNode>,
        start_sec: TimeSec,
        end_sec: TimeSec,
    },
    Concatenate {
        parts: Vec<Arc<RenderNode>>,
    },
    Composite {
        layers: Vec<RenderLayer>,
    },
    Volume {
        source: Arc<RenderNode>,
        factor: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window: Option<TimeWindow>,
    },
    Fade {
        source: Arc<RenderNode>,
        edge: FadeEdge,
        duration_sec: TimeSec,
    },
    Resize {
        source: Arc<RenderNode>,
        size: Size2D,
    },
    ExtractAudio {
        source: Arc<RenderNode>,
    },
    AttachAudio {
        video: Arc<RenderNode>,
        audio: Arc<RenderNode>,
    },
}

impl RenderNode {
    /// Direct inputs of this node
    pub fn children(&self) -> Vec<&RenderNode> {
        match &self.op {
            RenderOp::Source { .. } | RenderOp::Silence | RenderOp::Text { .. } => vec![],
            RenderOp::Subclip { source, .. }
            | RenderOp::Volume { source, .. }
            | RenderOp::Fade { source, .. }
            | RenderOp::Resize { source, .. }
            | RenderOp::ExtractAudio { source } => vec![source.as_ref()],
            RenderOp::Concatenate { parts } => parts.iter().map(Arc::as_ref).collect(),
            RenderOp::Composite { layers } => layers.iter().map(|l| l.node.as_ref()).collect(),
            RenderOp::AttachAudio { video, audio } => vec![video.as_ref(), audio.as_ref()],
        }
    }

    /// Visits this node and all of its inputs, depth first
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a RenderNode)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// All windowed volume changes in the graph as `(factor, window)` pairs
    pub fn volume_windows(&self) -> Vec<(f64, TimeWindow)> {
        let mut acc = Vec::new();
        self.walk(&mut |node| {
            if let RenderOp::Volume {
                factor,
                window: Some(window),
                ..
            } = &node.op
            {
                acc.push((*factor, *window));
            }
        });
        acc
    }

    /// Volume multiplier in effect at `t` along the output chain of this node.
    ///
    /// Follows volume, fade, resize and attached-audio nodes from the root,
    /// stopping at the first node that combines several inputs.
    pub fn volume_factor_at(&self, t: TimeSec) -> f64 {
        match &self.op {
            RenderOp::Volume {
                source,
                factor,
                window,
            } => {
                let applies = window.map(|w| w.contains(t)).unwrap_or(true);
                let own = if applies { *factor } else { 1.0 };
                own * source.volume_factor_at(t)
            }
            RenderOp::Fade { source, .. } | RenderOp::Resize { source, .. } => {
                source.volume_factor_at(t)
            }
            RenderOp::AttachAudio { audio, .. } => audio.volume_factor_at(t),
            _ => 1.0,
        }
    }
}

/// File written by [`GraphBackend`] when encoding
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderDocument {
    encoder: EncodeSettings,
    root: RenderNode,
}

// =============================================================================
// Source Probes
// =============================================================================

/// Stream properties of a source file
#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
    pub kind: MediaKind,
    pub duration_sec: TimeSec,
    pub size: Option<Size2D>,
    pub has_audio: bool,
    pub fps: Option<f64>,
    pub video_bitrate: Option<String>,
    pub audio_bitrate: Option<String>,
}

impl SourceInfo {
    pub fn audio(duration_sec: TimeSec) -> Self {
        Self {
            kind: MediaKind::Audio,
            duration_sec,
            size: None,
            has_audio: true,
            fps: None,
            video_bitrate: None,
            audio_bitrate: None,
        }
    }

    /// Video with an embedded audio stream at 30fps
    pub fn video(duration_sec: TimeSec, size: Size2D) -> Self {
        Self {
            kind: MediaKind::Video,
            duration_sec,
            size: Some(size),
            has_audio: true,
            fps: Some(30.0),
            video_bitrate: None,
            audio_bitrate: None,
        }
    }

    pub fn without_audio(mut self) -> Self {
        self.has_audio = false;
        self
    }

    pub fn with_bitrates(mut self, video: Option<&str>, audio: Option<&str>) -> Self {
        self.video_bitrate = video.map(str::to_string);
        self.audio_bitrate = audio.map(str::to_string);
        self
    }
}

// =============================================================================
// Node Table
// =============================================================================

/// Weak index from media ids to live nodes.
///
/// Handles keep their node alive; the table only resolves ids. Entries whose
/// node is gone are swept once the table has doubled since the last sweep.
#[derive(Debug, Default)]
struct NodeTable {
    entries: HashMap<MediaId, Weak<RenderNode>>,
    sweep_at: usize,
}

impl NodeTable {
    fn insert(&mut self, node: &Arc<RenderNode>) {
        if self.entries.len() >= self.sweep_at.max(SWEEP_THRESHOLD) {
            self.entries.retain(|_, n| n.strong_count() > 0);
            self.sweep_at = self.entries.len() * 2;
        }
        self.entries.insert(node.id.clone(), Arc::downgrade(node));
    }

    fn get(&self, id: &MediaId) -> Option<Arc<RenderNode>> {
        self.entries.get(id)?.upgrade()
    }

    fn live(&self) -> usize {
        self.entries.values().filter(|n| n.strong_count() > 0).count()
    }
}

// =============================================================================
// Graph Backend
// =============================================================================

/// Media backend that builds render graphs instead of decoding samples
#[derive(Debug, Default)]
pub struct GraphBackend {
    sources: Mutex<HashMap<PathBuf, SourceInfo>>,
    nodes: Mutex<NodeTable>,
    scratch_dir: Option<PathBuf>,
}

impl GraphBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places raw-copy cuts in `dir` instead of the system temp directory
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Makes a source file decodable with the given properties
    pub fn register_source(&self, path: impl Into<PathBuf>, info: SourceInfo) -> MediaResult<()> {
        self.sources_guard()?.insert(path.into(), info);
        Ok(())
    }

    /// Full render graph behind a handle
    pub fn describe(&self, clip: &MediaHandle) -> MediaResult<Arc<RenderNode>> {
        self.node(&clip.id)
    }

    /// Number of nodes still referenced by a handle or another node
    pub fn node_count(&self) -> usize {
        self.nodes.lock().map(|n| n.live()).unwrap_or(0)
    }

    fn sources_guard(&self) -> MediaResult<MutexGuard<'_, HashMap<PathBuf, SourceInfo>>> {
        self.sources
            .lock()
            .map_err(|_| MediaError::Backend("source table poisoned".to_string()))
    }

    fn nodes_guard(&self) -> MediaResult<MutexGuard<'_, NodeTable>> {
        self.nodes
            .lock()
            .map_err(|_| MediaError::Backend("node table poisoned".to_string()))
    }

    fn node(&self, id: &MediaId) -> MediaResult<Arc<RenderNode>> {
        self.nodes_guard()?
            .get(id)
            .ok_or_else(|| MediaError::UnknownHandle(id.clone()))
    }

    fn store(&self, node: RenderNode) -> MediaResult<MediaHandle> {
        let node = Arc::new(node);
        let mut handle = MediaHandle::new(node.id.clone(), node.kind, node.duration_sec);
        handle.size = node.size;
        handle.has_audio = node.has_audio;
        self.nodes_guard()?.insert(&node);
        Ok(handle.with_backing(node))
    }

    /// Stores a node derived from `source`, keeping its stream properties
    fn derive(&self, source: &MediaHandle, duration: TimeSec, op: RenderOp) -> MediaResult<MediaHandle> {
        let mut handle = self.store(RenderNode {
            id: new_id(),
            kind: source.kind,
            duration_sec: duration,
            size: source.size,
            has_audio: source.has_audio,
            op,
        })?;
        handle.fps = source.fps;
        Ok(handle)
    }

    fn require(clip: &MediaHandle, kind: MediaKind) -> MediaResult<()> {
        if clip.kind != kind {
            return Err(MediaError::KindMismatch(kind));
        }
        Ok(())
    }

    fn validate_range(clip: &MediaHandle, start: TimeSec, end: TimeSec) -> MediaResult<TimeSec> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || end < start {
            return Err(MediaError::InvalidRange(start, end));
        }
        if start > clip.duration + TIME_EPSILON {
            return Err(MediaError::InvalidRange(start, end));
        }
        Ok(end.min(clip.duration))
    }

    fn subclip_node(&self, clip: &MediaHandle, start: TimeSec, end: TimeSec) -> MediaResult<RenderNode> {
        let end = Self::validate_range(clip, start, end)?;
        let source = self.node(&clip.id)?;
        Ok(RenderNode {
            id: new_id(),
            kind: clip.kind,
            duration_sec: (end - start).max(0.0),
            size: clip.size,
            has_audio: clip.has_audio,
            op: RenderOp::Subclip {
                source,
                start_sec: start,
                end_sec: end,
            },
        })
    }

    fn concatenate(&self, clips: &[MediaHandle], kind: MediaKind) -> MediaResult<MediaHandle> {
        if clips.is_empty() {
            return Err(MediaError::Backend("nothing to concatenate".to_string()));
        }
        let mut parts = Vec::with_capacity(clips.len());
        for clip in clips {
            Self::require(clip, kind)?;
            parts.push(self.node(&clip.id)?);
        }
        self.store(RenderNode {
            id: new_id(),
            kind,
            duration_sec: clips.iter().map(|c| c.duration).sum(),
            size: clips.iter().find_map(|c| c.size),
            has_audio: clips.iter().any(|c| c.has_audio),
            op: RenderOp::Concatenate { parts },
        })
    }

    fn composite(
        &self,
        layers: &[Layer],
        kind: MediaKind,
        size: Option<Size2D>,
    ) -> MediaResult<MediaHandle> {
        if layers.is_empty() {
            return Err(MediaError::Backend("nothing to composite".to_string()));
        }
        let mut placed = Vec::with_capacity(layers.len());
        for layer in layers {
            Self::require(&layer.media, kind)?;
            placed.push(RenderLayer {
                start_sec: layer.start_sec,
                node: self.node(&layer.media.id)?,
            });
        }
        let duration = layers.iter().map(Layer::end_sec).fold(0.0, f64::max);
        self.store(RenderNode {
            id: new_id(),
            kind,
            duration_sec: duration,
            size: size.or_else(|| layers.iter().find_map(|l| l.media.size)),
            has_audio: layers.iter().any(|l| l.media.has_audio),
            op: RenderOp::Composite { layers: placed },
        })
    }

    fn decode_document(&self, path: &Path) -> MediaResult<MediaHandle> {
        let content = std::fs::read_to_string(path)?;
        let doc: RenderDocument =
            serde_json::from_str(&content).map_err(|e| MediaError::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let mut handle = self.store(RenderNode {
            id: new_id(),
            ..doc.root
        })?;
        handle.video_bitrate = Some(doc.encoder.video_bitrate);
        handle.audio_bitrate = Some(doc.encoder.audio_bitrate);
        Ok(handle)
    }
}

impl MediaBackend for GraphBackend {
    fn name(&self) -> &str {
        "render-graph"
    }

    fn decode(&self, path: &Path) -> MediaResult<MediaHandle> {
        let info = self.sources_guard()?.get(path).cloned();
        let Some(info) = info else {
            if path.is_file() {
                return self.decode_document(path);
            }
            return Err(MediaError::Decode {
                path: path.to_path_buf(),
                reason: "no such source".to_string(),
            });
        };

        let mut handle = self.store(RenderNode {
            id: new_id(),
            kind: info.kind,
            duration_sec: info.duration_sec,
            size: info.size,
            has_audio: info.has_audio,
            op: RenderOp::Source {
                path: path.to_path_buf(),
            },
        })?;
        handle.fps = info.fps;
        handle.video_bitrate = info.video_bitrate;
        handle.audio_bitrate = info.audio_bitrate;
        debug!(path = %path.display(), id = %handle.id, "Decoded source");
        Ok(handle)
    }

    fn subclip(&self, clip: &MediaHandle, start: TimeSec, end: TimeSec) -> MediaResult<MediaHandle> {
        let node = self.subclip_node(clip, start, end)?;
        let mut handle = self.store(node)?;
        handle.fps = clip.fps;
        Ok(handle)
    }

    fn copy_subclip(
        &self,
        clip: &MediaHandle,
        origin: &Path,
        start: TimeSec,
        end: TimeSec,
    ) -> MediaResult<MediaHandle> {
        let node = self.subclip_node(clip, start, end)?;
        let suffix = origin
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        let scratch = match &self.scratch_dir {
            Some(dir) => ScratchFile::create_in(dir, &suffix)?,
            None => ScratchFile::create(&suffix)?,
        };
        let doc = RenderDocument {
            encoder: EncodeSettings::new("copy", "copy"),
            root: node.clone(),
        };
        let json = serde_json::to_string(&doc).map_err(|e| MediaError::Encode(e.to_string()))?;
        std::fs::write(scratch.path(), json)?;

        let mut handle = self.store(node)?;
        handle.fps = clip.fps;
        Ok(handle.with_scratch(scratch))
    }

    fn concatenate_audio(&self, clips: &[MediaHandle]) -> MediaResult<MediaHandle> {
        self.concatenate(clips, MediaKind::Audio)
    }

    fn concatenate_video(&self, clips: &[MediaHandle]) -> MediaResult<MediaHandle> {
        self.concatenate(clips, MediaKind::Video)
    }

    fn composite_audio(&self, layers: &[Layer]) -> MediaResult<MediaHandle> {
        self.composite(layers, MediaKind::Audio, None)
    }

    fn composite_video(&self, layers: &[Layer], size: Option<Size2D>) -> MediaResult<MediaHandle> {
        self.composite(layers, MediaKind::Video, size)
    }

    fn scale_volume(
        &self,
        clip: &MediaHandle,
        factor: f64,
        window: Option<TimeWindow>,
    ) -> MediaResult<MediaHandle> {
        let source = self.node(&clip.id)?;
        self.derive(
            clip,
            clip.duration,
            RenderOp::Volume {
                source,
                factor,
                window,
            },
        )
    }

    fn fade_video(&self, clip: &MediaHandle, edge: FadeEdge, duration: TimeSec) -> MediaResult<MediaHandle> {
        Self::require(clip, MediaKind::Video)?;
        let source = self.node(&clip.id)?;
        self.derive(
            clip,
            clip.duration,
            RenderOp::Fade {
                source,
                edge,
                duration_sec: duration,
            },
        )
    }

    fn fade_audio(&self, clip: &MediaHandle, edge: FadeEdge, duration: TimeSec) -> MediaResult<MediaHandle> {
        Self::require(clip, MediaKind::Audio)?;
        let source = self.node(&clip.id)?;
        self.derive(
            clip,
            clip.duration,
            RenderOp::Fade {
                source,
                edge,
                duration_sec: duration,
            },
        )
    }

    fn resize(&self, clip: &MediaHandle, size: Size2D) -> MediaResult<MediaHandle> {
        Self::require(clip, MediaKind::Video)?;
        let source = self.node(&clip.id)?;
        let mut handle = self.store(RenderNode {
            id: new_id(),
            kind: MediaKind::Video,
            duration_sec: clip.duration,
            size: Some(size),
            has_audio: clip.has_audio,
            op: RenderOp::Resize { source, size },
        })?;
        handle.fps = clip.fps;
        Ok(handle)
    }

    fn audio_of(&self, clip: &MediaHandle) -> MediaResult<Option<MediaHandle>> {
        if clip.is_audio() {
            return Ok(Some(clip.clone()));
        }
        if !clip.has_audio {
            return Ok(None);
        }
        let source = self.node(&clip.id)?;
        let handle = self.store(RenderNode {
            id: new_id(),
            kind: MediaKind::Audio,
            duration_sec: clip.duration,
            size: None,
            has_audio: true,
            op: RenderOp::ExtractAudio {
                source,
            },
        })?;
        Ok(Some(handle))
    }

    fn with_audio(&self, video: &MediaHandle, audio: &MediaHandle) -> MediaResult<MediaHandle> {
        Self::require(video, MediaKind::Video)?;
        Self::require(audio, MediaKind::Audio)?;
        let video_node = self.node(&video.id)?;
        let audio_node = self.node(&audio.id)?;
        let mut handle = self.store(RenderNode {
            id: new_id(),
            kind: MediaKind::Video,
            duration_sec: video.duration,
            size: video.size,
            has_audio: true,
            op: RenderOp::AttachAudio {
                video: video_node,
                audio: audio_node,
            },
        })?;
        handle.fps = video.fps;
        Ok(handle)
    }

    fn silence(&self, duration: TimeSec) -> MediaResult<MediaHandle> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(MediaError::InvalidRange(0.0, duration));
        }
        self.store(RenderNode {
            id: new_id(),
            kind: MediaKind::Audio,
            duration_sec: duration,
            size: None,
            has_audio: true,
            op: RenderOp::Silence,
        })
    }

    fn text_clip(&self, text: &str, duration: TimeSec, size: Size2D) -> MediaResult<MediaHandle> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(MediaError::InvalidRange(0.0, duration));
        }
        let mut handle = self.store(RenderNode {
            id: new_id(),
            kind: MediaKind::Video,
            duration_sec: duration,
            size: Some(size),
            has_audio: false,
            op: RenderOp::Text {
                text: text.to_string(),
            },
        })?;
        handle.fps = Some(TEXT_FPS);
        Ok(handle)
    }

    fn encode(&self, clip: &MediaHandle, path: &Path, settings: &EncodeSettings) -> MediaResult<()> {
        let doc = RenderDocument {
            encoder: settings.clone(),
            root: RenderNode::clone(&*self.node(&clip.id)?),
        };
        let json =
            serde_json::to_string_pretty(&doc).map_err(|e| MediaError::Encode(e.to_string()))?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), id = %clip.id, "Encoded render document");
        Ok(())
    }

    fn play(&self, clip: &MediaHandle, signals: &PlaybackSignals) -> MediaResult<()> {
        let started = Instant::now();
        let length = Duration::from_secs_f64(clip.duration.max(0.0));
        signals.mark_audio_ready();
        while signals.is_playing() && started.elapsed() < length {
            std::thread::sleep(PLAYBACK_POLL);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn backend_with_sources() -> GraphBackend {
        let backend = GraphBackend::new();
        backend
            .register_source("/media/a.wav", SourceInfo::audio(4.0))
            .unwrap();
        backend
            .register_source("/media/v.mkv", SourceInfo::video(10.0, Size2D::new(640, 480)))
            .unwrap();
        backend
    }

    #[test]
    fn test_decode_registered_source() {
        let backend = backend_with_sources();
        let clip = backend.decode(Path::new("/media/v.mkv")).unwrap();
        assert!(clip.is_video());
        assert_eq!(clip.duration, 10.0);
        assert_eq!(clip.size, Some(Size2D::new(640, 480)));
        assert!(clip.has_audio);
    }

    #[test]
    fn test_decode_unknown_source_fails() {
        let backend = backend_with_sources();
        let err = backend.decode(Path::new("/media/missing.mkv")).unwrap_err();
        assert!(matches!(err, MediaError::Decode { .. }));
    }

    #[test]
    fn test_subclip_range_validation() {
        let backend = backend_with_sources();
        let clip = backend.decode(Path::new("/media/a.wav")).unwrap();

        let sub = backend.subclip(&clip, 1.0, 2.5).unwrap();
        assert!((sub.duration - 1.5).abs() < 1e-9);

        // End beyond the clip is clamped
        let sub = backend.subclip(&clip, 3.0, 100.0).unwrap();
        assert!((sub.duration - 1.0).abs() < 1e-9);

        assert!(backend.subclip(&clip, 2.0, 1.0).is_err());
        assert!(backend.subclip(&clip, 5.0, 6.0).is_err());
    }

    #[test]
    fn test_concatenate_rejects_mixed_kinds() {
        let backend = backend_with_sources();
        let a = backend.decode(Path::new("/media/a.wav")).unwrap();
        let v = backend.decode(Path::new("/media/v.mkv")).unwrap();
        assert!(matches!(
            backend.concatenate_audio(&[a.clone(), v]),
            Err(MediaError::KindMismatch(MediaKind::Audio))
        ));

        let joined = backend.concatenate_audio(&[a.clone(), a]).unwrap();
        assert_eq!(joined.duration, 8.0);
    }

    #[test]
    fn test_composite_duration_is_latest_end() {
        let backend = backend_with_sources();
        let a = backend.decode(Path::new("/media/a.wav")).unwrap();
        let mixed = backend
            .composite_audio(&[Layer::new(a.clone(), 0.0), Layer::new(a, 5.0)])
            .unwrap();
        assert_eq!(mixed.duration, 9.0);
    }

    #[test]
    fn test_windowed_volume_factor() {
        let backend = backend_with_sources();
        let a = backend.decode(Path::new("/media/a.wav")).unwrap();
        let ducked = backend
            .scale_volume(&a, 0.2, Some(TimeWindow::new(1.0, 2.0)))
            .unwrap();
        let graph = backend.describe(&ducked).unwrap();
        assert_eq!(graph.volume_factor_at(0.5), 1.0);
        assert_eq!(graph.volume_factor_at(1.5), 0.2);
        assert_eq!(graph.volume_factor_at(2.0), 1.0);
        assert_eq!(graph.volume_windows(), vec![(0.2, TimeWindow::new(1.0, 2.0))]);
    }

    #[test]
    fn test_derived_nodes_share_inputs() {
        let backend = backend_with_sources();
        let a = backend.decode(Path::new("/media/a.wav")).unwrap();
        let louder = backend.scale_volume(&a, 2.0, None).unwrap();

        let source = backend.describe(&a).unwrap();
        let graph = backend.describe(&louder).unwrap();
        let RenderOp::Volume { source: input, .. } = &graph.op else {
            panic!("expected a volume node");
        };
        assert!(Arc::ptr_eq(input, &source));
    }

    #[test]
    fn test_nodes_released_with_their_handles() {
        let backend = backend_with_sources();
        let a = backend.decode(Path::new("/media/a.wav")).unwrap();
        assert_eq!(backend.node_count(), 1);

        let sub = backend.subclip(&a, 0.0, 1.0).unwrap();
        let mut edits = Vec::new();
        for i in 0..SWEEP_THRESHOLD {
            edits.push(backend.scale_volume(&sub, 1.0 + i as f64, None).unwrap());
        }
        assert_eq!(backend.node_count(), SWEEP_THRESHOLD + 2);

        drop(edits);
        assert_eq!(backend.node_count(), 2);

        // The subclip stays reachable through a node built on top of it
        let looped = backend.concatenate_audio(&[sub.clone(), sub]).unwrap();
        assert_eq!(backend.node_count(), 3);
        drop(a);
        assert_eq!(backend.node_count(), 3);
        assert_eq!(backend.describe(&looped).unwrap().children().len(), 2);

        drop(looped);
        assert_eq!(backend.node_count(), 0);
    }

    #[test]
    fn test_node_table_sweeps_dead_entries() {
        let silent = || {
            Arc::new(RenderNode {
                id: new_id(),
                kind: MediaKind::Audio,
                duration_sec: 1.0,
                size: None,
                has_audio: true,
                op: RenderOp::Silence,
            })
        };
        let mut table = NodeTable::default();
        for _ in 0..SWEEP_THRESHOLD {
            table.insert(&silent());
        }
        assert_eq!(table.entries.len(), SWEEP_THRESHOLD);
        assert_eq!(table.live(), 0);

        let kept = silent();
        table.insert(&kept);
        assert_eq!(table.entries.len(), 1);
        assert!(table.get(&kept.id).is_some());
    }

    #[test]
    fn test_text_clip_is_silent_video() {
        let backend = GraphBackend::new();
        let clip = backend
            .text_clip("Chapter one", 3.0, Size2D::new(1024, 768))
            .unwrap();
        assert!(clip.is_video());
        assert!(!clip.has_audio);
        assert_eq!(clip.duration, 3.0);
        assert_eq!(clip.size, Some(Size2D::new(1024, 768)));
        assert!(backend.audio_of(&clip).unwrap().is_none());
        assert!(backend.text_clip("x", 0.0, Size2D::new(1, 1)).is_err());
    }

    #[test]
    fn test_audio_of_video_without_audio() {
        let backend = GraphBackend::new();
        backend
            .register_source(
                "/media/mute.mkv",
                SourceInfo::video(3.0, Size2D::new(320, 240)).without_audio(),
            )
            .unwrap();
        let v = backend.decode(Path::new("/media/mute.mkv")).unwrap();
        assert!(backend.audio_of(&v).unwrap().is_none());
    }

    #[test]
    fn test_encode_then_decode_document() {
        let dir = TempDir::new().unwrap();
        let backend = backend_with_sources();
        let a = backend.decode(Path::new("/media/a.wav")).unwrap();
        let sub = backend.subclip(&a, 0.0, 1.0).unwrap();

        let out = dir.path().join("0.wav");
        backend
            .encode(&sub, &out, &EncodeSettings::new("8000k", "50000k"))
            .unwrap();

        let reloaded = backend.decode(&out).unwrap();
        assert!(reloaded.is_audio());
        assert_eq!(reloaded.duration, 1.0);
        assert_eq!(reloaded.audio_bitrate.as_deref(), Some("50000k"));
    }

    #[test]
    fn test_copy_subclip_owns_scratch_file() {
        let dir = TempDir::new().unwrap();
        let backend = backend_with_sources().with_scratch_dir(dir.path());
        let v = backend.decode(Path::new("/media/v.mkv")).unwrap();

        let cut = backend
            .copy_subclip(&v, Path::new("/media/v.mkv"), 2.0, 4.0)
            .unwrap();
        let scratch = cut.scratch_path().unwrap().to_path_buf();
        assert!(scratch.exists());
        assert_eq!(scratch.extension().unwrap(), "mkv");

        let copy = cut.clone();
        drop(cut);
        assert!(scratch.exists());
        drop(copy);
        assert!(!scratch.exists());
    }
}
