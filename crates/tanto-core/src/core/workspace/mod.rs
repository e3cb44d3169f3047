//! Workspace Management
//!
//! Tracks are grouped into numbered workspaces. One workspace is live and
//! its tracks are what navigation and editing see; the others are stashed
//! together with their track cursor until switched to.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info};

use crate::core::{timeline::Track, CoreError, CoreResult, TrackId, WorkspaceId};

/// Tracks of one workspace and the index of the selected one
#[derive(Debug, Default)]
pub struct TrackSet {
    pub tracks: Vec<Track>,
    pub cursor: Option<usize>,
}

impl TrackSet {
    fn position(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }
}

/// Owns every track, split into one live set and per-workspace stashes
#[derive(Debug)]
pub struct WorkspaceManager {
    current: WorkspaceId,
    live: TrackSet,
    stashes: BTreeMap<WorkspaceId, TrackSet>,
}

impl WorkspaceManager {
    /// Creates workspaces `1..=count`, with workspace 1 live
    pub fn new(count: usize) -> Self {
        let stashes = (1..=count.max(1))
            .map(|id| (id, TrackSet::default()))
            .collect();
        Self {
            current: 1,
            live: TrackSet::default(),
            stashes,
        }
    }

    pub fn current_workspace(&self) -> WorkspaceId {
        self.current
    }

    pub fn workspace_ids(&self) -> Vec<WorkspaceId> {
        self.stashes.keys().copied().collect()
    }

    pub fn is_workspace(&self, id: WorkspaceId) -> bool {
        self.stashes.contains_key(&id)
    }

    /// Stash of an inactive workspace
    pub fn stash(&self, id: WorkspaceId) -> Option<&TrackSet> {
        self.stashes.get(&id)
    }

    // =========================================================================
    // Live Set
    // =========================================================================

    pub fn tracks(&self) -> &[Track] {
        &self.live.tracks
    }

    pub fn cursor(&self) -> Option<usize> {
        self.live.cursor
    }

    pub fn set_cursor(&mut self, cursor: Option<usize>) {
        self.live.cursor = cursor;
    }

    /// Live track at `index`
    pub fn track_at(&self, index: usize) -> Option<&Track> {
        self.live.tracks.get(index)
    }

    pub fn track_at_mut(&mut self, index: usize) -> Option<&mut Track> {
        self.live.tracks.get_mut(index)
    }

    /// Index of the selected live track, if the cursor points at one
    pub fn current_index(&self) -> Option<usize> {
        self.live.cursor.filter(|&i| i < self.live.tracks.len())
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.live.tracks.get(self.current_index()?)
    }

    pub fn current_track_mut(&mut self) -> Option<&mut Track> {
        let i = self.current_index()?;
        self.live.tracks.get_mut(i)
    }

    /// Position of a track in the live set
    pub fn live_index(&self, id: &str) -> Option<usize> {
        self.live.position(id)
    }

    /// Appends a track to the live set, claiming it for this workspace
    pub fn append_track(&mut self, mut track: Track) -> usize {
        track.workspace_preference = self.current;
        self.live.tracks.push(track);
        self.live.tracks.len() - 1
    }

    /// Inserts a track into the live set at `index`
    pub fn insert_track(&mut self, index: usize, mut track: Track) -> usize {
        track.workspace_preference = self.current;
        let index = index.min(self.live.tracks.len());
        self.live.tracks.insert(index, track);
        index
    }

    /// Removes a live track and moves the cursor to the one before it
    pub fn remove_track_at(&mut self, index: usize) -> Option<Track> {
        if index >= self.live.tracks.len() {
            return None;
        }
        let track = self.live.tracks.remove(index);
        self.live.cursor = if self.live.tracks.is_empty() {
            None
        } else {
            Some(index.saturating_sub(1).min(self.live.tracks.len() - 1))
        };
        Some(track)
    }

    /// Swaps the selected track with its neighbour `direction` steps away
    pub fn order_track(&mut self, direction: isize) -> CoreResult<()> {
        let current = self.current_index().ok_or(CoreError::NoCurrentTrack)?;
        let len = self.live.tracks.len();
        if len <= 1 {
            return Err(CoreError::ValidationError(
                "Not enough tracks to reorder.".to_string(),
            ));
        }
        let target = current as isize + direction;
        if target < 0 {
            return Err(CoreError::ValidationError(
                "Can't reorder. Reached top.".to_string(),
            ));
        }
        if target as usize >= len {
            return Err(CoreError::ValidationError(
                "Can't reorder. Reached bottom.".to_string(),
            ));
        }
        self.live.tracks.swap(current, target as usize);
        self.live.cursor = Some(target as usize);
        Ok(())
    }

    // =========================================================================
    // Workspaces
    // =========================================================================

    /// Makes workspace `n` live, stashing the current one.
    ///
    /// Refuses while the current workspace's stash still holds tracks, as
    /// stashing over them would lose them.
    pub fn switch_to_workspace(&mut self, n: WorkspaceId) -> CoreResult<()> {
        if !self.stashes.contains_key(&n) {
            return Err(CoreError::InvalidWorkspace(n));
        }
        let occupied = self
            .stashes
            .get(&self.current)
            .map_or(true, |s| !s.tracks.is_empty());
        if occupied {
            return Err(CoreError::StashNotEmpty(self.current));
        }

        let live = std::mem::take(&mut self.live);
        self.stashes.insert(self.current, live);
        self.live = self
            .stashes
            .insert(n, TrackSet::default())
            .unwrap_or_default();
        info!(from = self.current, to = n, "Switched workspace");
        self.current = n;
        Ok(())
    }

    /// Moves live track `index` into the stash of workspace `ws`.
    ///
    /// Returns `Ok(false)` when `ws` is the live workspace already.
    pub fn send_track(&mut self, index: usize, ws: WorkspaceId) -> CoreResult<bool> {
        if !self.stashes.contains_key(&ws) {
            return Err(CoreError::InvalidWorkspace(ws));
        }
        if index >= self.live.tracks.len() {
            return Err(CoreError::NoCurrentTrack);
        }
        if ws == self.current {
            return Ok(false);
        }

        let Some(mut track) = self.remove_track_at(index) else {
            return Err(CoreError::NoCurrentTrack);
        };
        track.workspace_preference = ws;
        debug!(track = %track.name, workspace = ws, "Sending track to workspace");
        let stash = self.stashes.entry(ws).or_default();
        stash.cursor = Some(stash.cursor.unwrap_or(0));
        stash.tracks.push(track);
        Ok(true)
    }

    /// Puts a track into workspace `ws`, live or stashed
    pub fn add_to_workspace(&mut self, track: Track, ws: WorkspaceId) -> CoreResult<()> {
        if ws == self.current {
            self.append_track(track);
            return Ok(());
        }
        let index = self.append_track(track);
        self.send_track(index, ws)?;
        Ok(())
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Every track in every workspace
    pub fn all_tracks(&self) -> impl Iterator<Item = &Track> {
        self.stashes
            .values()
            .flat_map(|s| s.tracks.iter())
            .chain(self.live.tracks.iter())
    }

    pub fn all_tracks_mut(&mut self) -> impl Iterator<Item = &mut Track> {
        self.stashes
            .values_mut()
            .flat_map(|s| s.tracks.iter_mut())
            .chain(self.live.tracks.iter_mut())
    }

    /// Points every track linked to `old` at `new` instead, in every
    /// workspace. Returns how many links moved.
    pub fn relink_children(&mut self, old: &str, new: &str) -> usize {
        let mut moved = 0;
        for track in self.all_tracks_mut() {
            if let Some((parent, _)) = &mut track.parent {
                if parent.as_str() == old {
                    *parent = new.to_string();
                    moved += 1;
                }
            }
        }
        moved
    }

    pub fn all_track_names(&self) -> HashSet<String> {
        self.all_tracks().map(|t| t.name.clone()).collect()
    }

    /// `(index, workspace)` of a track wherever it lives
    pub fn find_track_indices(&self, id: &str) -> Option<(usize, WorkspaceId)> {
        if let Some(i) = self.live.position(id) {
            return Some((i, self.current));
        }
        self.stashes
            .iter()
            .filter(|(ws, _)| **ws != self.current)
            .find_map(|(ws, set)| set.position(id).map(|i| (i, *ws)))
    }

    pub fn track_by_id(&self, id: &str) -> Option<&Track> {
        self.all_tracks().find(|t| t.id == id)
    }

    pub fn track_by_id_mut(&mut self, id: &str) -> Option<&mut Track> {
        self.stashes
            .values_mut()
            .flat_map(|s| s.tracks.iter_mut())
            .chain(self.live.tracks.iter_mut())
            .find(|t| t.id == id)
    }

    /// Live track called `name`
    pub fn find_track(&self, name: &str) -> Option<&Track> {
        self.live.tracks.iter().find(|t| t.name == name)
    }

    /// Live tracks linked to clip `index` of the track called `name`
    pub fn find_children(&self, name: &str, index: usize) -> Vec<&Track> {
        self.live
            .tracks
            .iter()
            .filter(|t| t.parent_name() == Some(name) && t.parent_index() == Some(index))
            .collect()
    }

    /// Live track with `id` together with its position
    pub fn live_track_by_id(&self, id: &TrackId) -> Option<(usize, &Track)> {
        let i = self.live.position(id)?;
        Some((i, &self.live.tracks[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with(names: &[&str]) -> WorkspaceManager {
        let mut manager = WorkspaceManager::new(4);
        for name in names {
            manager.append_track(Track::new(*name));
        }
        manager.set_cursor(Some(0));
        manager
    }

    fn live_names(manager: &WorkspaceManager) -> Vec<&str> {
        manager.tracks().iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_switch_round_trip() {
        let mut manager = manager_with(&["a", "b", "c"]);
        manager.set_cursor(Some(2));
        let ids: Vec<_> = manager.tracks().iter().map(|t| t.id.clone()).collect();

        manager.switch_to_workspace(3).unwrap();
        assert_eq!(manager.current_workspace(), 3);
        assert!(manager.tracks().is_empty());
        assert_eq!(manager.cursor(), None);

        manager.switch_to_workspace(1).unwrap();
        let back: Vec<_> = manager.tracks().iter().map(|t| t.id.clone()).collect();
        assert_eq!(back, ids);
        assert_eq!(manager.cursor(), Some(2));
        assert!(manager.stash(1).unwrap().tracks.is_empty());
    }

    #[test]
    fn test_switch_rejects_unknown_workspace() {
        let mut manager = manager_with(&["a"]);
        assert!(matches!(
            manager.switch_to_workspace(9),
            Err(CoreError::InvalidWorkspace(9))
        ));
        assert_eq!(manager.current_workspace(), 1);
    }

    #[test]
    fn test_switch_to_current_workspace_keeps_tracks() {
        let mut manager = manager_with(&["a", "b"]);
        manager.switch_to_workspace(1).unwrap();
        assert_eq!(live_names(&manager), vec!["a", "b"]);
    }

    #[test]
    fn test_send_track_moves_to_stash() {
        let mut manager = manager_with(&["a", "b", "c"]);
        manager.set_cursor(Some(1));

        assert!(manager.send_track(1, 2).unwrap());
        assert_eq!(live_names(&manager), vec!["a", "c"]);
        assert_eq!(manager.cursor(), Some(0));

        let stash = manager.stash(2).unwrap();
        assert_eq!(stash.tracks[0].name, "b");
        assert_eq!(stash.tracks[0].workspace_preference, 2);
        assert_eq!(stash.cursor, Some(0));
    }

    #[test]
    fn test_send_track_to_current_is_noop() {
        let mut manager = manager_with(&["a"]);
        assert!(!manager.send_track(0, 1).unwrap());
        assert_eq!(manager.tracks().len(), 1);
        assert!(matches!(
            manager.send_track(0, 7),
            Err(CoreError::InvalidWorkspace(7))
        ));
        assert!(matches!(
            manager.send_track(5, 2),
            Err(CoreError::NoCurrentTrack)
        ));
    }

    #[test]
    fn test_stash_not_empty_guard() {
        let mut manager = manager_with(&["a", "b"]);
        manager.switch_to_workspace(2).unwrap();
        // Manually leave something in workspace 2's own stash slot
        manager
            .stashes
            .get_mut(&2)
            .unwrap()
            .tracks
            .push(Track::new("stray"));
        assert!(matches!(
            manager.switch_to_workspace(1),
            Err(CoreError::StashNotEmpty(2))
        ));
    }

    #[test]
    fn test_find_track_indices_across_workspaces() {
        let mut manager = manager_with(&["a", "b"]);
        let b_id = manager.tracks()[1].id.clone();
        manager.send_track(1, 4).unwrap();
        assert_eq!(manager.find_track_indices(&b_id), Some((0, 4)));

        manager.switch_to_workspace(4).unwrap();
        assert_eq!(manager.find_track_indices(&b_id), Some((0, 4)));
        assert!(manager.find_track_indices("missing").is_none());
        assert!(manager.all_track_names().contains("a"));
    }

    #[test]
    fn test_find_children_matches_parent_and_index() {
        let mut manager = manager_with(&["main"]);
        let mut linked = Track::new("0-alpha-main");
        linked.parent = Some(("main".to_string(), 0));
        let mut other = Track::new("1-alpha-main");
        other.parent = Some(("main".to_string(), 1));
        manager.append_track(linked);
        manager.append_track(other);

        let children = manager.find_children("main", 0);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "0-alpha-main");
    }

    #[test]
    fn test_order_track_bounds() {
        let mut manager = manager_with(&["a", "b"]);
        assert!(manager.order_track(-1).is_err());
        manager.order_track(1).unwrap();
        assert_eq!(live_names(&manager), vec!["b", "a"]);
        assert_eq!(manager.cursor(), Some(1));
        assert!(manager.order_track(1).is_err());

        let mut single = manager_with(&["solo"]);
        assert!(single.order_track(1).is_err());
    }
}
