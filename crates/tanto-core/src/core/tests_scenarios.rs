//! End-to-end editing scenarios driven through the command registry.

use std::sync::Arc;

use crate::core::{
    commands::CommandRegistry,
    media::GraphBackend,
    session::{Session, OVERRIDE_STATUS},
    settings::TantoSettings,
    test_support::{audio_clip, video_clip},
    timeline::{Clip, Track},
    CoreError, TimeWindow,
};

struct Editor {
    backend: Arc<GraphBackend>,
    session: Session,
    registry: CommandRegistry,
}

impl Editor {
    fn new() -> Self {
        let backend = Arc::new(GraphBackend::new());
        let session = Session::new(backend.clone(), TantoSettings::default());
        let registry = CommandRegistry::standard(&session.workspaces().workspace_ids());
        Self {
            backend,
            session,
            registry,
        }
    }

    fn run(&mut self, id: &str) -> String {
        self.session.dispatch(&self.registry, id)
    }

    /// Adds a selected track with the cursor on its first clip
    fn track(&mut self, name: &str, clips: Vec<Clip>) {
        let mut track = Track::new(name);
        for clip in clips {
            track.insert_clip(clip, false).unwrap();
        }
        track.rewind();
        self.session.add_and_select(track);
    }

    fn live_names(&self) -> Vec<String> {
        self.session
            .workspaces()
            .tracks()
            .iter()
            .map(|t| t.name.clone())
            .collect()
    }
}

#[test]
fn test_workspace_round_trip_restores_live_set() {
    let mut ed = Editor::new();
    ed.track("a", vec![]);
    ed.track("b", vec![]);
    let names = ed.live_names();
    let cursor = ed.session.workspaces().cursor();

    assert_eq!(ed.run("workspace-2"), "Now on workspace 2");
    assert!(ed.session.workspaces().tracks().is_empty());
    assert_eq!(ed.run("workspace-1"), "Now on workspace 1");

    assert_eq!(ed.live_names(), names);
    assert_eq!(ed.session.workspaces().cursor(), cursor);
}

#[test]
fn test_switch_head_across_workspaces_is_identity() {
    let mut ed = Editor::new();
    ed.track("a", vec![]);
    ed.run("set-head");
    assert_eq!(ed.run("send-to-workspace-2"), "Ok. Sent track to workspace 2");
    assert_eq!(ed.session.workspaces().cursor(), Some(0));

    let status = ed.run("switch-head");
    assert_eq!(status, "Tabbed to head at no clip in a");
    assert_eq!(ed.session.workspaces().current_workspace(), 2);
    assert_eq!(ed.session.head().unwrap().name, "graveyard");

    ed.run("switch-head");
    assert_eq!(ed.session.workspaces().current_workspace(), 1);
    assert_eq!(ed.session.workspaces().cursor(), Some(0));
    assert_eq!(ed.session.head().unwrap().name, "a");
}

#[test]
fn test_head_override_lasts_one_command() {
    let mut ed = Editor::new();
    let clip = audio_clip(&ed.backend, 4.0);
    ed.track("a", vec![clip]);
    ed.run("set-head");
    ed.track("b", vec![]);

    assert_eq!(ed.run("toggle-head-override"), OVERRIDE_STATUS);
    assert!(ed.run("where-am-i").starts_with("temporary a at clip 0"));
    assert_eq!(ed.run("where-am-i"), "temporary b at no clip");
}

#[test]
fn test_focus_lazily_selects_track() {
    let mut ed = Editor::new();
    ed.session.workspaces.append_track(Track::new("a"));
    assert_eq!(ed.session.workspaces().cursor(), None);
    assert_eq!(ed.run("focus-up"), "%& graveyard");

    ed.session.workspaces.set_cursor(None);
    assert_eq!(ed.run("focus-down"), "& a");
}

#[test]
fn test_flat_merge_sums_durations() {
    let mut ed = Editor::new();
    let clips = [2.0, 3.0, 1.5]
        .iter()
        .map(|d| audio_clip(&ed.backend, *d))
        .collect();
    ed.track("main", clips);

    assert_eq!(ed.run("merge-flat"), "Ok. Merged clips onto alpha-main");
    let merged = ed.session.current_track().unwrap();
    assert_eq!(merged.len(), 1);
    assert!((merged.duration() - 6.5).abs() < 1e-9);
}

#[test]
fn test_merge_rejects_empty_and_mixed_tracks() {
    let mut ed = Editor::new();
    ed.track("empty", vec![]);
    assert_eq!(ed.run("merge-flat"), "Track has no clips to merge.");

    let clips = vec![video_clip(&ed.backend, 1.0), audio_clip(&ed.backend, 1.0)];
    ed.track("mixed", clips);
    assert_eq!(
        ed.run("merge"),
        CoreError::NotMergable("mixed".to_string()).to_string()
    );
}

#[test]
fn test_voice_over_ducks_parent_during_child() {
    let mut ed = Editor::new();
    let clip = video_clip(&ed.backend, 10.0);
    ed.track("main", vec![clip]);
    ed.session.current_clip_mut().unwrap().set_mark(5.0);

    assert_eq!(
        ed.run("link-track"),
        "Created linked track 0-alpha-main and pointed head at it."
    );
    let voice = audio_clip(&ed.backend, 3.0);
    ed.session
        .current_track_mut()
        .unwrap()
        .insert_clip(voice, false)
        .unwrap();
    assert!(ed.run("quiet-parent").starts_with("Set parent audio factor to 0.2"));

    ed.run("focus-up");
    assert_eq!(ed.session.current_track().unwrap().name, "main");
    assert!(ed.run("merge").starts_with("Ok. Merged clips onto"));

    let merged = ed.session.current_track().unwrap();
    assert_eq!(merged.duration(), 10.0);
    let windows = ed
        .backend
        .describe(merged.clips()[0].media())
        .unwrap()
        .volume_windows();
    assert!(!windows.is_empty());
    for (factor, window) in windows {
        assert_eq!(factor, 0.2);
        assert_eq!(window, TimeWindow::new(5.0, 8.0));
    }
}

#[test]
fn test_clone_names_strictly_increase() {
    let mut ed = Editor::new();
    ed.track("main", vec![]);
    for expected in ["alpha-main", "bravo-main", "charlie-main"] {
        assert_eq!(ed.run("clone-track"), format!("Cloned to track {}", expected));
    }
    assert_eq!(ed.session.current_track().unwrap().name, "main");
}

#[test]
fn test_remove_track_buries_clips() {
    let mut ed = Editor::new();
    let clips = vec![audio_clip(&ed.backend, 1.0), audio_clip(&ed.backend, 2.0)];
    ed.track("main", clips);

    assert_eq!(
        ed.run("remove-track"),
        "Ok. Removed track main. Moved 2 clips to graveyard."
    );
    assert_eq!(ed.live_names(), vec!["graveyard"]);
    assert_eq!(ed.session.graveyard().unwrap().len(), 2);
    assert_eq!(ed.run("toggle-lock"), "Cannot unlock graveyard. Sorry.");
}

#[test]
fn test_cut_whole_clip_then_paste() {
    let mut ed = Editor::new();
    let clips = vec![audio_clip(&ed.backend, 4.0), audio_clip(&ed.backend, 2.0)];
    ed.track("main", clips);
    assert_eq!(ed.run("cut"), "Nonsense mark position, nothing selected.");

    ed.session.current_clip_mut().unwrap().set_seek_pos(4.0);
    assert_eq!(ed.run("cut"), "Cut clip.");
    assert_eq!(ed.session.current_track().unwrap().len(), 1);
    assert_eq!(ed.session.clipboard().unwrap().duration(), 4.0);

    assert!(ed.run("paste").starts_with("Pasted clip"));
    assert_eq!(ed.session.current_track().unwrap().duration(), 6.0);
}

#[test]
fn test_unexpected_failure_reports_exception() {
    let mut ed = Editor::new();
    let clip = audio_clip(&ed.backend, 1.0);
    ed.track("main", vec![clip]);
    ed.session
        .set_project_dir(Some("/nonexistent/tanto/project".into()));

    assert_eq!(ed.run("save-clip"), "exception");
    assert_eq!(ed.run("no-such-command"), "Unknown command: no-such-command");
}
