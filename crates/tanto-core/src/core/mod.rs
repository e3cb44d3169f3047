//! Tanto Core Engine
//!
//! Core editing engine module.
//! Handles the timeline model, composition, workspaces, persistence and commands.

pub mod commands;
pub mod media;
pub mod naming;
pub mod playback;
pub mod project;
pub mod session;
pub mod settings;
pub mod timeline;
pub mod workspace;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(test)]
mod tests_scenarios;
