//! Track Composition
//!
//! Flattens tracks into single clips. [`Track::concatenate`] joins a track's
//! own clips back to back. [`Track::rec_concatenate`] also pulls in every
//! track linked below it and builds the whole tree in one pass:
//! - top-level clips are laid out sequentially
//! - linked tracks start at their parent clip's start plus their offset
//! - linked tracks with a parent audio factor become overlays and duck a
//!   video parent for as long as they play
//!
//! The tree becomes one layer list per kind; composites are never nested.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::{Clip, Track};
use crate::core::{
    media::{FadeEdge, Layer, MediaBackend, MediaHandle, MediaResult},
    CoreResult, TimeSec, TimeWindow,
};

/// Ducking applied to the parent while an overlay plays
#[derive(Clone, Copy, Debug, PartialEq)]
struct Suppression {
    factor: f64,
    window: TimeWindow,
}

/// Layers collected while walking a track tree
#[derive(Default)]
struct Accumulator {
    audio: Vec<Layer>,
    video: Vec<Layer>,
    overlays: Vec<Layer>,
    suppressions: Vec<Suppression>,
}

impl Accumulator {
    fn place(&mut self, media: MediaHandle, start: TimeSec) {
        if media.is_audio() {
            self.audio.push(Layer::new(media, start));
        } else {
            self.video.push(Layer::new(media, start));
        }
    }
}

/// Fade edges for clip `i` of `n`: the first fades out, the last fades in,
/// everything in between fades in and then out.
fn fade_edges(i: usize, n: usize) -> &'static [FadeEdge] {
    if i == 0 {
        &[FadeEdge::Out]
    } else if i == n - 1 {
        &[FadeEdge::In]
    } else {
        &[FadeEdge::In, FadeEdge::Out]
    }
}

/// Applies fades to a clip. Video clips get their picture and their audio
/// faded independently.
fn apply_fades(
    backend: &dyn MediaBackend,
    media: &MediaHandle,
    edges: &[FadeEdge],
    duration: TimeSec,
) -> MediaResult<MediaHandle> {
    if media.is_audio() {
        let mut out = media.clone();
        for &edge in edges {
            out = backend.fade_audio(&out, edge, duration)?;
        }
        return Ok(out);
    }

    let mut video = media.clone();
    for &edge in edges {
        video = backend.fade_video(&video, edge, duration)?;
    }
    if let Some(mut audio) = backend.audio_of(media)? {
        for &edge in edges {
            audio = backend.fade_audio(&audio, edge, duration)?;
        }
        video = backend.with_audio(&video, &audio)?;
    }
    Ok(video)
}

impl Track {
    /// Whether the track flattens to audio
    fn composes_as_audio(&self) -> bool {
        self.audio_only || !self.has_video()
    }

    /// Joins this track's clips back to back.
    ///
    /// Returns `None` for empty or mixed tracks. Audio tracks are joined as
    /// they are; video tracks get fades at clip boundaries when `fade` is set.
    pub fn concatenate(&self, backend: &dyn MediaBackend, fade: bool) -> CoreResult<Option<Clip>> {
        if !self.is_mergable() || self.is_empty() {
            return Ok(None);
        }

        let media: Vec<MediaHandle> = self.clips().iter().map(|c| c.media().clone()).collect();

        let joined = if self.composes_as_audio() {
            backend.concatenate_audio(&media)?
        } else if fade {
            let n = media.len();
            let faded = media
                .iter()
                .enumerate()
                .map(|(i, m)| apply_fades(backend, m, fade_edges(i, n), self.fade_duration))
                .collect::<MediaResult<Vec<_>>>()?;
            backend.concatenate_video(&faded)?
        } else {
            backend.concatenate_video(&media)?
        };

        Ok(Some(Clip::new(joined)))
    }

    /// Flattens this track together with all tracks linked to it.
    ///
    /// `find_children(name, index)` returns the tracks linked to clip
    /// `index` of the track called `name`. Returns `None` for empty or
    /// mixed tracks.
    pub fn rec_concatenate<'a, F>(
        &'a self,
        backend: &dyn MediaBackend,
        find_children: &F,
        fade: bool,
    ) -> CoreResult<Option<Clip>>
    where
        F: Fn(&str, usize) -> Vec<&'a Track>,
    {
        if !self.is_mergable() || self.is_empty() {
            return Ok(None);
        }

        let mut acc = Accumulator::default();
        let mut visited = HashSet::from([self.name.clone()]);
        let n = self.len();
        let mut cur_start = 0.0;

        for (i, clip) in self.clips().iter().enumerate() {
            let media = if fade {
                apply_fades(backend, clip.media(), fade_edges(i, n), self.fade_duration)?
            } else {
                clip.media().clone()
            };
            acc.place(media, cur_start);
            collect_children(self, i, cur_start, find_children, &mut acc, &mut visited);
            cur_start += clip.duration();
        }

        debug!(
            track = %self.name,
            audio = acc.audio.len(),
            video = acc.video.len(),
            overlays = acc.overlays.len(),
            suppressions = acc.suppressions.len(),
            "Composing track tree"
        );

        let result = if self.composes_as_audio() {
            self.compose_audio(backend, acc)?
        } else {
            self.compose_video(backend, acc)?
        };
        Ok(Some(Clip::new(result)))
    }

    /// Audio tracks composite their own layers plus the sound of any linked
    /// video. Ducking overlays only apply to video parents.
    fn compose_audio(&self, backend: &dyn MediaBackend, acc: Accumulator) -> CoreResult<MediaHandle> {
        if !acc.overlays.is_empty() {
            debug!(
                track = %self.name,
                overlays = acc.overlays.len(),
                "Audio track ignores ducking overlays"
            );
        }
        let mut layers = acc.audio;
        layers.extend(audio_layers(backend, &acc.video)?);
        Ok(backend.composite_audio(&layers)?)
    }

    fn compose_video(&self, backend: &dyn MediaBackend, acc: Accumulator) -> CoreResult<MediaHandle> {
        let video_layers = match self.size {
            Some(size) => acc
                .video
                .iter()
                .map(|l| -> MediaResult<Layer> {
                    Ok(Layer::new(backend.resize(&l.media, size)?, l.start_sec))
                })
                .collect::<MediaResult<Vec<_>>>()?,
            None => acc.video,
        };
        let mut video = backend.composite_video(&video_layers, self.size)?;

        let mut sound = Vec::with_capacity(acc.audio.len() + 1);
        if let Some(own) = backend.audio_of(&video)? {
            sound.push(Layer::new(own, 0.0));
        }
        sound.extend(acc.audio);
        let mut audio = if sound.is_empty() {
            None
        } else {
            Some(backend.composite_audio(&sound)?)
        };

        for s in &acc.suppressions {
            video = backend.scale_volume(&video, s.factor, Some(s.window))?;
            if let Some(a) = &audio {
                audio = Some(backend.scale_volume(a, s.factor, Some(s.window))?);
            }
        }

        let audio = match audio {
            Some(a) => Some(layer_overlays(backend, a, &acc.overlays)?),
            None => {
                let overlays = audio_layers(backend, &acc.overlays)?;
                if overlays.is_empty() {
                    None
                } else {
                    Some(backend.composite_audio(&overlays)?)
                }
            }
        };

        match audio {
            Some(a) => Ok(backend.with_audio(&video, &a)?),
            None => Ok(video),
        }
    }
}

/// Places the tracks linked to clip `index` of `track`, recursing into their
/// own linked tracks. Each linked track is laid out back to back from its
/// start.
fn collect_children<'a, F>(
    track: &Track,
    index: usize,
    clip_start: TimeSec,
    find_children: &F,
    acc: &mut Accumulator,
    visited: &mut HashSet<String>,
) where
    F: Fn(&str, usize) -> Vec<&'a Track>,
{
    for child in find_children(&track.name, index) {
        if !visited.insert(child.name.clone()) {
            warn!(track = %child.name, parent = %track.name, "Skipping cyclic track link");
            continue;
        }

        let child_start = clip_start + child.offset;
        let mut t = child_start;
        for (j, clip) in child.clips().iter().enumerate() {
            let layer = Layer::new(clip.media().clone(), t);
            if child.parent_audio_factor.is_some() {
                acc.overlays.push(layer);
            } else if child.audio_only {
                acc.audio.push(layer);
            } else {
                acc.video.push(layer);
            }
            collect_children(child, j, t, find_children, acc, visited);
            t += clip.duration();
        }

        if let Some(factor) = child.parent_audio_factor {
            acc.suppressions.push(Suppression {
                factor,
                window: TimeWindow::new(child_start, child_start + child.duration()),
            });
        }
        visited.remove(&child.name);
    }
}

/// Audio of each layer at the same start; layers without audio are dropped
fn audio_layers(backend: &dyn MediaBackend, layers: &[Layer]) -> MediaResult<Vec<Layer>> {
    let mut out = Vec::with_capacity(layers.len());
    for layer in layers {
        if let Some(audio) = backend.audio_of(&layer.media)? {
            out.push(Layer::new(audio, layer.start_sec));
        }
    }
    Ok(out)
}

fn layer_overlays(
    backend: &dyn MediaBackend,
    audio: MediaHandle,
    overlays: &[Layer],
) -> MediaResult<MediaHandle> {
    if overlays.is_empty() {
        return Ok(audio);
    }
    let mut layers = vec![Layer::new(audio, 0.0)];
    layers.extend(audio_layers(backend, overlays)?);
    backend.composite_audio(&layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::media::{GraphBackend, RenderOp};
    use crate::core::test_support::{audio_clip, backend, video_clip};

    fn track_of(backend: &GraphBackend, name: &str, durations: &[f64], video: bool) -> Track {
        let mut track = Track::new(name);
        for &d in durations {
            let clip = if video {
                video_clip(backend, d)
            } else {
                audio_clip(backend, d)
            };
            track.insert_clip(clip, false).unwrap();
        }
        track
    }

    fn no_children<'a>(_: &str, _: usize) -> Vec<&'a Track> {
        Vec::new()
    }

    #[test]
    fn test_concatenate_sums_durations() {
        let backend = backend();
        let track = track_of(&backend, "a", &[2.0, 3.0, 1.5], false);
        let merged = track.concatenate(&backend, false).unwrap().unwrap();
        assert!((merged.duration() - 6.5).abs() < 1e-9);
        assert!(merged.is_audio());
    }

    #[test]
    fn test_concatenate_empty_and_mixed() {
        let backend = backend();
        let empty = Track::new("empty");
        assert!(empty.concatenate(&backend, false).unwrap().is_none());

        let mut mixed = track_of(&backend, "mixed", &[1.0], true);
        mixed.insert_clip(audio_clip(&backend, 1.0), false).unwrap();
        assert!(!mixed.is_mergable());
        assert!(mixed.concatenate(&backend, false).unwrap().is_none());
        assert!(mixed
            .rec_concatenate(&backend, &no_children, false)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_video_concatenate_with_fades() {
        let backend = backend();
        let track = track_of(&backend, "v", &[2.0, 2.0, 2.0], true);
        let merged = track.concatenate(&backend, true).unwrap().unwrap();
        assert!((merged.duration() - 6.0).abs() < 1e-9);

        let graph = backend.describe(merged.media()).unwrap();
        let mut fades = Vec::new();
        graph.walk(&mut |node| {
            if let RenderOp::Fade { edge, .. } = &node.op {
                fades.push(*edge);
            }
        });
        // out | in+out | in, for the picture and for the audio of each clip
        assert_eq!(fades.len(), 8);
        assert_eq!(fades.iter().filter(|e| **e == FadeEdge::In).count(), 4);
    }

    #[test]
    fn test_rec_concatenate_without_children_matches_layout() {
        let backend = backend();
        let track = track_of(&backend, "a", &[2.0, 3.0], false);
        let merged = track
            .rec_concatenate(&backend, &no_children, false)
            .unwrap()
            .unwrap();
        assert!((merged.duration() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_suppression_window_covers_child() {
        let backend = backend();
        let parent = track_of(&backend, "main", &[20.0], true);
        let mut child = track_of(&backend, "0-alpha-main", &[1.0, 2.0], false);
        child.parent = Some(("main".to_string(), 0));
        child.offset = 5.0;
        child.parent_audio_factor = Some(0.2);

        let find = |name: &str, index: usize| {
            if child.parent_name() == Some(name) && child.parent_index() == Some(index) {
                vec![&child]
            } else {
                vec![]
            }
        };
        let merged = parent.rec_concatenate(&backend, &find, false).unwrap().unwrap();
        assert!((merged.duration() - 20.0).abs() < 1e-9);

        let windows = backend.describe(merged.media()).unwrap().volume_windows();
        assert!(!windows.is_empty());
        for (factor, window) in windows {
            assert_eq!(factor, 0.2);
            assert_eq!(window, TimeWindow::new(5.0, 8.0));
            assert!(!window.contains(4.999));
            assert!(window.contains(5.0));
            assert!(!window.contains(8.0));
        }
    }

    #[test]
    fn test_audio_parent_ignores_ducking_child() {
        let backend = backend();
        let parent = track_of(&backend, "main", &[20.0], false);
        let mut child = track_of(&backend, "0-alpha-main", &[3.0], false);
        child.parent = Some(("main".to_string(), 0));
        child.offset = 5.0;
        child.parent_audio_factor = Some(0.2);

        let find = |name: &str, index: usize| {
            if name == "main" && index == 0 {
                vec![&child]
            } else {
                vec![]
            }
        };
        let merged = parent.rec_concatenate(&backend, &find, false).unwrap().unwrap();
        assert!(merged.is_audio());
        assert!((merged.duration() - 20.0).abs() < 1e-9);

        let graph = backend.describe(merged.media()).unwrap();
        assert!(graph.volume_windows().is_empty());
        let RenderOp::Composite { layers } = &graph.op else {
            panic!("expected a composite");
        };
        assert_eq!(layers.len(), 1);
    }

    #[test]
    fn test_audio_child_starts_at_offset() {
        let backend = backend();
        let parent = track_of(&backend, "main", &[4.0, 6.0], false);
        let mut child = track_of(&backend, "music", &[3.0], false);
        child.parent = Some(("main".to_string(), 1));
        child.offset = 5.0;

        let find = |name: &str, index: usize| {
            if name == "main" && index == 1 {
                vec![&child]
            } else {
                vec![]
            }
        };
        let merged = parent.rec_concatenate(&backend, &find, false).unwrap().unwrap();
        // Child starts at 4 + 5 = 9 and runs past the parent's end
        assert!((merged.duration() - 12.0).abs() < 1e-9);

        let graph = backend.describe(merged.media()).unwrap();
        let RenderOp::Composite { layers } = &graph.op else {
            panic!("expected a composite");
        };
        let starts: Vec<_> = layers.iter().map(|l| l.start_sec).collect();
        assert_eq!(starts, vec![0.0, 4.0, 9.0]);
    }

    #[test]
    fn test_grandchildren_and_cycles() {
        let backend = backend();
        let parent = track_of(&backend, "main", &[10.0], false);
        let mut child = track_of(&backend, "child", &[2.0], false);
        child.parent = Some(("main".to_string(), 0));
        child.offset = 1.0;
        let mut grandchild = track_of(&backend, "grandchild", &[1.0], false);
        grandchild.parent = Some(("child".to_string(), 0));
        grandchild.offset = 0.5;
        // Links back up to main, forming a cycle
        let mut looping = track_of(&backend, "main", &[1.0], false);
        looping.parent = Some(("grandchild".to_string(), 0));

        let all = [&child, &grandchild, &looping];
        let find = |name: &str, index: usize| {
            all.iter()
                .copied()
                .filter(|t| t.parent_name() == Some(name) && t.parent_index() == Some(index))
                .collect::<Vec<&Track>>()
        };
        let merged = parent.rec_concatenate(&backend, &find, false).unwrap().unwrap();
        let graph = backend.describe(merged.media()).unwrap();
        let RenderOp::Composite { layers } = &graph.op else {
            panic!("expected a composite");
        };
        let starts: Vec<_> = layers.iter().map(|l| l.start_sec).collect();
        assert_eq!(starts, vec![0.0, 1.0, 1.5]);
    }
}
