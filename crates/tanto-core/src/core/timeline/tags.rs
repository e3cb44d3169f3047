//! Tag Store
//!
//! Named bookmarks kept per clip slot of a track. Each slot is a ring sorted
//! by position; the head of the ring is the current tag.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::core::TimeSec;

/// Slot used for tags on a track without a cursor
pub const TRACK_TAG_SLOT: i64 = -1;

/// A named position inside a clip
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub pos: TimeSec,
}

impl Tag {
    pub fn new(name: impl Into<String>, pos: TimeSec) -> Self {
        Self {
            name: name.into(),
            pos,
        }
    }
}

/// Tags of one track, keyed by clip slot
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagStore {
    slots: BTreeMap<i64, VecDeque<Tag>>,
}

impl TagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag to `slot` and keeps the current tag where it was.
    ///
    /// A tag added to an empty slot becomes current.
    pub fn add(&mut self, slot: i64, tag: Tag) {
        let ring = self.slots.entry(slot).or_default();
        let previous = ring.front().cloned();
        ring.push_back(tag);
        ring.make_contiguous()
            .sort_by(|a, b| a.pos.total_cmp(&b.pos));

        if let Some(previous) = previous {
            for _ in 0..ring.len() {
                if ring.front() == Some(&previous) {
                    break;
                }
                ring.rotate_left(1);
            }
        }
    }

    /// Rotates the ring of `slot` by one and returns the new current tag
    pub fn next(&mut self, slot: i64, prev: bool) -> Option<&Tag> {
        let ring = self.slots.get_mut(&slot)?;
        if ring.is_empty() {
            return None;
        }
        if prev {
            ring.rotate_right(1);
        } else {
            ring.rotate_left(1);
        }
        ring.front()
    }

    /// Removes every tag named `name` from `slot`, returning how many went
    pub fn remove(&mut self, slot: i64, name: &str) -> usize {
        let Some(ring) = self.slots.get_mut(&slot) else {
            return 0;
        };
        let before = ring.len();
        ring.retain(|t| t.name != name);
        before - ring.len()
    }

    pub fn current(&self, slot: i64) -> Option<&Tag> {
        self.slots.get(&slot).and_then(|ring| ring.front())
    }

    /// Tags of `slot` in ring order, starting at the current one
    pub fn slot(&self, slot: i64) -> Vec<&Tag> {
        self.slots
            .get(&slot)
            .map(|ring| ring.iter().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.values().all(VecDeque::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(store: &TagStore, slot: i64) -> Vec<&str> {
        store.slot(slot).iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_first_tag_becomes_current() {
        let mut store = TagStore::new();
        assert!(store.current(0).is_none());
        store.add(0, Tag::new("intro", 4.0));
        assert_eq!(store.current(0).unwrap().name, "intro");
    }

    #[test]
    fn test_add_keeps_current_tag() {
        let mut store = TagStore::new();
        store.add(0, Tag::new("middle", 5.0));
        store.add(0, Tag::new("early", 1.0));
        store.add(0, Tag::new("late", 9.0));

        assert_eq!(store.current(0).unwrap().name, "middle");
        assert_eq!(names(&store, 0), vec!["middle", "late", "early"]);
    }

    #[test]
    fn test_next_cycles_both_ways() {
        let mut store = TagStore::new();
        store.add(2, Tag::new("a", 1.0));
        store.add(2, Tag::new("b", 2.0));
        store.add(2, Tag::new("c", 3.0));

        assert_eq!(store.next(2, false).unwrap().name, "b");
        assert_eq!(store.next(2, false).unwrap().name, "c");
        assert_eq!(store.next(2, false).unwrap().name, "a");
        assert_eq!(store.next(2, true).unwrap().name, "c");
        assert!(store.next(7, false).is_none());
    }

    #[test]
    fn test_remove_by_name() {
        let mut store = TagStore::new();
        store.add(TRACK_TAG_SLOT, Tag::new("keep", 1.0));
        store.add(TRACK_TAG_SLOT, Tag::new("drop", 2.0));

        assert_eq!(store.remove(TRACK_TAG_SLOT, "drop"), 1);
        assert_eq!(store.remove(TRACK_TAG_SLOT, "drop"), 0);
        assert_eq!(names(&store, TRACK_TAG_SLOT), vec!["keep"]);
    }

    #[test]
    fn test_slots_are_independent() {
        let mut store = TagStore::new();
        store.add(0, Tag::new("zero", 1.0));
        store.add(1, Tag::new("one", 1.0));
        assert_eq!(store.current(0).unwrap().name, "zero");
        assert_eq!(store.current(1).unwrap().name, "one");
    }

    #[test]
    fn test_serialized_as_slot_map() {
        let mut store = TagStore::new();
        store.add(3, Tag::new("cue", 1.5));
        let json = serde_json::to_string(&store).unwrap();
        assert_eq!(json, r#"{"3":[{"name":"cue","pos":1.5}]}"#);

        let back: TagStore = serde_json::from_str(&json).unwrap();
        assert_eq!(back, store);
    }
}
