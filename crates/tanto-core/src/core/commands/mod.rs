//! Editing Command System
//!
//! Every user-facing editing operation is a method on
//! [`Session`](crate::core::session::Session) returning a short status
//! string. The [`CommandRegistry`] maps command identifiers (and optionally
//! a key) to closures over the session so a front end can dispatch them
//! without knowing the individual methods.
//!
//! Commands that need a line of text (a tag name, a duration) carry a
//! prompt. Dispatching them only returns the prompt; the front end collects
//! the text and passes it to
//! [`Session::dispatch_input`](crate::core::session::Session::dispatch_input).

mod clip;
mod head;
mod marks;
mod navigation;
mod tags;
mod track;
mod workspace;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{session::Session, CoreError, CoreResult, WorkspaceId};

/// Identifier of the head override toggle. Dispatch keeps the override
/// alive only across this command.
pub const TOGGLE_HEAD_OVERRIDE: &str = "toggle-head-override";

// =============================================================================
// Command Entries
// =============================================================================

/// Grouping used when listing commands
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandCategory {
    Program,
    Navigation,
    Editing,
    Seek,
    Workspaces,
}

impl CommandCategory {
    pub fn label(self) -> &'static str {
        match self {
            CommandCategory::Program => "Program",
            CommandCategory::Navigation => "Navigation",
            CommandCategory::Editing => "Editing",
            CommandCategory::Seek => "Seek",
            CommandCategory::Workspaces => "Workspaces",
        }
    }
}

/// Boxed command body
pub type CommandFn = Box<dyn Fn(&mut Session) -> CoreResult<String> + Send + Sync>;

/// Boxed body of a command that takes a line of text
pub type InputCommandFn = Box<dyn Fn(&mut Session, &str) -> CoreResult<String> + Send + Sync>;

enum Handler {
    Plain(CommandFn),
    Input(InputCommandFn),
}

/// A registered command
pub struct CommandEntry {
    pub id: String,
    pub category: CommandCategory,
    pub description: String,
    /// Key the command is bound to by default
    pub key: Option<String>,
    /// Status asking for the text an input command needs
    pub prompt: Option<String>,
    handler: Handler,
}

impl CommandEntry {
    pub fn new<F>(id: &str, category: CommandCategory, description: &str, handler: F) -> Self
    where
        F: Fn(&mut Session) -> CoreResult<String> + Send + Sync + 'static,
    {
        Self {
            id: id.to_string(),
            category,
            description: description.to_string(),
            key: None,
            prompt: None,
            handler: Handler::Plain(Box::new(handler)),
        }
    }

    /// Command that asks for `prompt` and then runs on the text entered
    pub fn with_input<F>(
        id: &str,
        category: CommandCategory,
        description: &str,
        prompt: &str,
        handler: F,
    ) -> Self
    where
        F: Fn(&mut Session, &str) -> CoreResult<String> + Send + Sync + 'static,
    {
        Self {
            id: id.to_string(),
            category,
            description: description.to_string(),
            key: None,
            prompt: Some(prompt.to_string()),
            handler: Handler::Input(Box::new(handler)),
        }
    }

    pub fn takes_input(&self) -> bool {
        matches!(self.handler, Handler::Input(_))
    }

    /// Binds the command to a key
    pub fn bound_to(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    /// Runs the command. Input commands only return their prompt.
    pub fn run(&self, session: &mut Session) -> CoreResult<String> {
        match &self.handler {
            Handler::Plain(f) => f(session),
            Handler::Input(_) => Ok(self.prompt.clone().unwrap_or_default()),
        }
    }

    /// Runs the command on `input`; plain commands ignore it
    pub fn run_with_input(&self, session: &mut Session, input: &str) -> CoreResult<String> {
        match &self.handler {
            Handler::Plain(f) => f(session),
            Handler::Input(f) => f(session, input),
        }
    }
}

/// Parses a number typed in answer to a prompt
fn parse_number(input: &str) -> CoreResult<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| CoreError::ValidationError(format!("Not a number: {}", input.trim())))
}

impl std::fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEntry")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("key", &self.key)
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Command table keyed by identifier
#[derive(Debug, Default)]
pub struct CommandRegistry {
    entries: BTreeMap<String, CommandEntry>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a command, replacing any previous one with the same id
    pub fn register(&mut self, entry: CommandEntry) -> &mut Self {
        self.entries.insert(entry.id.clone(), entry);
        self
    }

    pub fn get(&self, id: &str) -> Option<&CommandEntry> {
        self.entries.get(id)
    }

    /// Command bound to `key`
    pub fn by_key(&self, key: &str) -> Option<&CommandEntry> {
        self.entries
            .values()
            .find(|e| e.key.as_deref() == Some(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandEntry> {
        self.entries.values()
    }

    pub fn by_category(&self, category: CommandCategory) -> Vec<&CommandEntry> {
        self.entries
            .values()
            .filter(|e| e.category == category)
            .collect()
    }

    /// Table of every editor command with its default key
    pub fn standard(workspaces: &[WorkspaceId]) -> Self {
        use CommandCategory::*;

        let mut r = Self::new();

        // Program
        r.register(CommandEntry::new("quit", Program, "Quit the editor", |s| s.quit()).bound_to("q"));
        r.register(
            CommandEntry::new("save-track", Program, "Save the current track", |s| s.save_track())
                .bound_to("_"),
        );
        r.register(
            CommandEntry::new("save-clip", Program, "Write the current clip to a file", |s| {
                s.save_clip()
            })
            .bound_to("S"),
        );
        r.register(
            CommandEntry::new("where-am-i", Program, "Describe the current position", |s| {
                s.where_am_i()
            })
            .bound_to("h"),
        );
        r.register(
            CommandEntry::new("step-finer", Program, "Shrink seek steps tenfold", |s| {
                s.step_factor(0.1)
            })
            .bound_to("^"),
        );
        r.register(
            CommandEntry::new("step-coarser", Program, "Grow seek steps tenfold", |s| {
                s.step_factor(10.0)
            })
            .bound_to("´"),
        );

        // Navigation
        r.register(
            CommandEntry::new("focus-up", Navigation, "Previous track", |s| s.shift_focus(0, -1))
                .bound_to("w"),
        );
        r.register(
            CommandEntry::new("focus-down", Navigation, "Next track", |s| s.shift_focus(0, 1))
                .bound_to("s"),
        );
        r.register(
            CommandEntry::new("focus-left", Navigation, "Previous clip", |s| s.shift_focus(-1, 0))
                .bound_to("a"),
        );
        r.register(
            CommandEntry::new("focus-right", Navigation, "Next clip", |s| s.shift_focus(1, 0))
                .bound_to("d"),
        );
        r.register(
            CommandEntry::new("min-focus", Navigation, "First track", |s| s.min_focus())
                .bound_to("<"),
        );
        r.register(
            CommandEntry::new("max-focus", Navigation, "Last track", |s| s.max_focus())
                .bound_to(">"),
        );
        r.register(
            CommandEntry::new("move-track-up", Navigation, "Move the track up", |s| {
                s.order_track(-1)
            })
            .bound_to("ALT+p"),
        );
        r.register(
            CommandEntry::new("move-track-down", Navigation, "Move the track down", |s| {
                s.order_track(1)
            })
            .bound_to("ALT+n"),
        );
        r.register(
            CommandEntry::new("set-head", Navigation, "Point the head at this track", |s| {
                s.set_head()
            })
            .bound_to("j"),
        );
        r.register(
            CommandEntry::new("where-is-head", Navigation, "Describe the head", |s| {
                s.where_is_head()
            })
            .bound_to("J"),
        );
        r.register(
            CommandEntry::new(
                TOGGLE_HEAD_OVERRIDE,
                Navigation,
                "Make the next command act on the head",
                |s| s.toggle_head_override(),
            )
            .bound_to("CTRL+j"),
        );
        r.register(
            CommandEntry::new("switch-head", Navigation, "Swap places with the head", |s| {
                s.switch_head()
            })
            .bound_to("TAB"),
        );
        r.register(
            CommandEntry::new("next-tag", Navigation, "Cycle to the next tag", |s| {
                s.next_tag(false)
            })
            .bound_to("T"),
        );
        r.register(
            CommandEntry::new("previous-tag", Navigation, "Cycle to the previous tag", |s| {
                s.next_tag(true)
            })
            .bound_to("CTRL+t"),
        );
        r.register(CommandEntry::new("show-tag", Navigation, "Describe the current tag", |s| {
            s.show_tag()
        }));

        // Seek
        r.register(
            CommandEntry::new("play-pause", Seek, "Play or pause", |s| s.play_pause(false))
                .bound_to("SPACE"),
        );
        r.register(
            CommandEntry::new("play-pause-seek", Seek, "Play or pause, keeping the position", |s| {
                s.play_pause(true)
            })
            .bound_to("CTRL+SPACE"),
        );
        r.register(
            CommandEntry::new("set-mark", Seek, "Set the mark at the seek position", |s| {
                s.set_mark(None)
            })
            .bound_to("ENTER"),
        );
        r.register(
            CommandEntry::new("jump-to-mark", Seek, "Seek to the mark", |s| s.jump_to_mark())
                .bound_to("BACKSPACE"),
        );
        r.register(
            CommandEntry::new("seek-start", Seek, "Seek to the clip start", |s| {
                s.seek_percentage(0.0)
            })
            .bound_to("CTRL+a"),
        );
        r.register(
            CommandEntry::new("seek-end", Seek, "Seek to the clip end", |s| {
                s.seek_percentage(100.0)
            })
            .bound_to("CTRL+e"),
        );
        r.register(
            CommandEntry::new("set-mark-start", Seek, "Mark the clip start", |s| s.set_mark_start())
                .bound_to("ALT+a"),
        );
        r.register(
            CommandEntry::new("set-mark-end", Seek, "Mark the clip end", |s| s.set_mark_end())
                .bound_to("ALT+e"),
        );
        r.register(
            CommandEntry::new("where-mark", Seek, "Describe seek and mark", |s| s.where_mark())
                .bound_to("t"),
        );
        r.register(
            CommandEntry::new("save-mark", Seek, "Remember the mark", |s| s.save_mark())
                .bound_to("y"),
        );
        r.register(
            CommandEntry::new("paste-mark", Seek, "Set the remembered mark", |s| s.paste_mark())
                .bound_to("CTRL+y"),
        );
        r.register(
            CommandEntry::new("set-head-offset", Seek, "Offset the head track by the mark", |s| {
                s.set_head_offset()
            })
            .bound_to("ALT+ENTER"),
        );
        r.register(
            CommandEntry::new("seek-forward", Seek, "Small step forward", |s| {
                let step = s.settings().editor.small_time_step;
                s.seek_relative(step)
            })
            .bound_to("f"),
        );
        r.register(
            CommandEntry::new("seek-back", Seek, "Small step back", |s| {
                let step = s.settings().editor.small_time_step;
                s.seek_relative(-step)
            })
            .bound_to("b"),
        );
        r.register(
            CommandEntry::new("seek-forward-large", Seek, "Large step forward", |s| {
                let step = s.settings().editor.large_time_step;
                s.seek_relative(step)
            })
            .bound_to("F"),
        );
        r.register(
            CommandEntry::new("seek-back-large", Seek, "Large step back", |s| {
                let step = s.settings().editor.large_time_step;
                s.seek_relative(-step)
            })
            .bound_to("B"),
        );
        r.register(CommandEntry::new("seek-tag", Seek, "Seek to the current tag", |s| {
            s.seek_tag(false)
        }));
        r.register(CommandEntry::new("mark-tag", Seek, "Set the mark to the current tag", |s| {
            s.seek_tag(true)
        }));
        for digit in 0..10u8 {
            let percent = f64::from(digit) * 10.0;
            r.register(
                CommandEntry::new(
                    &format!("seek-percent-{}", digit),
                    Seek,
                    &format!("Seek to {}% of the clip", percent),
                    move |s| s.seek_percentage(percent),
                )
                .bound_to(&digit.to_string()),
            );
            r.register(
                CommandEntry::new(
                    &format!("mark-percent-{}", digit),
                    Seek,
                    &format!("Mark {}% of the clip", percent),
                    move |s| s.set_mark_percentage(percent),
                )
                .bound_to(&format!("ALT+{}", digit)),
            );
        }

        // Editing
        r.register(CommandEntry::new("cut", Editing, "Cut the selection", |s| s.cut_clip(false)).bound_to("CTRL+x"));
        r.register(
            CommandEntry::new("copy", Editing, "Copy the selection", |s| s.cut_clip(true))
                .bound_to("CTRL+c"),
        );
        r.register(
            CommandEntry::new("paste", Editing, "Paste the clipboard", |s| s.paste())
                .bound_to("CTRL+v"),
        );
        r.register(
            CommandEntry::new("bisect", Editing, "Split the clip at the mark onto a new track", |s| {
                s.bisect(false)
            })
            .bound_to("v"),
        );
        r.register(
            CommandEntry::new("bisect-in-place", Editing, "Split the clip at the mark", |s| {
                s.bisect(true)
            })
            .bound_to("V"),
        );
        r.register(
            CommandEntry::new("copy-to-head", Editing, "Copy the selection to the head", |s| {
                s.copy_to_head()
            })
            .bound_to("c"),
        );
        r.register(
            CommandEntry::new("clone-track", Editing, "Clone the track", |s| s.create_clone_track())
                .bound_to("ALT+c"),
        );
        r.register(
            CommandEntry::new("merge", Editing, "Merge the track with its linked tracks", |s| {
                s.merge_track_tree()
            })
            .bound_to("m"),
        );
        r.register(
            CommandEntry::new("merge-fade", Editing, "Merge the clips with fades", |s| {
                s.merge_track(true)
            })
            .bound_to("M"),
        );
        r.register(CommandEntry::new("merge-flat", Editing, "Merge the clips", |s| {
            s.merge_track(false)
        }));
        r.register(
            CommandEntry::new("mix-audio", Editing, "Mix the selection's audio onto a copy of the head", |s| {
                s.mix_audio(false)
            })
            .bound_to("i"),
        );
        r.register(
            CommandEntry::new("mix-audio-in-place", Editing, "Mix the selection's audio into the head", |s| {
                s.mix_audio(true)
            })
            .bound_to("I"),
        );
        r.register(
            CommandEntry::new("quiet-parent", Editing, "Duck the parent while this track plays", |s| {
                let factor = s.settings().editor.quiet_factor;
                s.set_parent_audio_factor(factor)
            })
            .bound_to("p"),
        );
        r.register(
            CommandEntry::new("volume-up", Editing, "Raise the volume", |s| {
                let step = s.settings().editor.volume_step;
                s.change_volume(step)
            })
            .bound_to("+"),
        );
        r.register(
            CommandEntry::new("volume-down", Editing, "Lower the volume", |s| {
                let step = s.settings().editor.volume_step;
                s.change_volume(-step)
            })
            .bound_to("-"),
        );
        r.register(
            CommandEntry::new("remove-clip", Editing, "Move the clip to the graveyard", |s| {
                s.remove_clip()
            })
            .bound_to("CTRL+d"),
        );
        r.register(
            CommandEntry::new("remove-track", Editing, "Remove the track", |s| s.remove_track())
                .bound_to("ALT+d"),
        );
        r.register(
            CommandEntry::new("toggle-lock", Editing, "Lock or unlock the track", |s| {
                s.toggle_lock()
            })
            .bound_to("CTRL+l"),
        );
        r.register(
            CommandEntry::new("link-track", Editing, "Create a track linked to this clip", |s| {
                s.create_link_track()
            })
            .bound_to("ALT+l"),
        );
        r.register(
            CommandEntry::new("new-track", Editing, "Create an empty track", |s| s.new_track(None))
                .bound_to("n"),
        );
        r.register(CommandEntry::new("remove-tag", Editing, "Delete the current tag", |s| {
            s.remove_tag()
        }));

        // Commands taking text
        r.register(CommandEntry::with_input(
            "create-text-clip",
            Editing,
            "Insert a clip showing some text",
            "Please enter text to be displayed in clip.",
            |s, text| s.create_text_clip(text),
        ));
        r.register(CommandEntry::with_input(
            "create-silence",
            Editing,
            "Insert silence at the head",
            "Please enter the duration of silence in seconds.",
            |s, input| s.create_silence_clip(parse_number(input)?),
        ));
        r.register(CommandEntry::with_input(
            "set-volume",
            Editing,
            "Set the volume factor of the clip",
            "Please enter a volume factor.",
            |s, input| s.set_volume(parse_number(input)?),
        ));
        r.register(CommandEntry::with_input(
            "rename-track",
            Editing,
            "Rename the track",
            "Please enter a new name for the track.",
            |s, name| s.rename_track(name.trim()),
        ));
        r.register(CommandEntry::with_input(
            "new-named-track",
            Editing,
            "Create an empty track with a name",
            "Please enter a name for the new track.",
            |s, name| s.new_track(Some(name.trim())),
        ));
        r.register(CommandEntry::with_input(
            "add-tag",
            Editing,
            "Tag the seek position",
            "Please enter a name for the tag.",
            |s, name| s.add_tag(name, false),
        ));
        r.register(CommandEntry::with_input(
            "add-tag-at-mark",
            Editing,
            "Tag the mark",
            "Please enter a name for the tag.",
            |s, name| s.add_tag(name, true),
        ));

        // Workspaces
        for &ws in workspaces {
            r.register(
                CommandEntry::new(
                    &format!("workspace-{}", ws),
                    Workspaces,
                    &format!("Switch to workspace {}", ws),
                    move |s| s.switch_to_workspace(ws),
                )
                .bound_to(&format!("F{}", ws)),
            );
            r.register(
                CommandEntry::new(
                    &format!("send-to-workspace-{}", ws),
                    Workspaces,
                    &format!("Send the track to workspace {}", ws),
                    move |s| s.send_track(ws),
                )
                .bound_to(&format!("CTRL+F{}", ws)),
            );
        }

        r
    }
}
