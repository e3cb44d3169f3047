//! Timeline Module
//!
//! Clips, tracks and the algorithms that flatten track trees into media.

mod clip;
mod compose;
mod format;
mod tags;
mod track;

pub use clip::{Clip, Trisection};
pub use format::{show_mark, to_timecode};
pub use tags::{Tag, TagStore, TRACK_TAG_SLOT};
pub use track::{
    ParentLink, Track, DEFAULT_AUDIO_BITRATE, DEFAULT_FADE_DURATION, DEFAULT_VIDEO_BITRATE,
    GRAVEYARD_NAME,
};
