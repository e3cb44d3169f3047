//! Workspace Commands Module

use crate::core::{session::Session, CoreError, CoreResult, WorkspaceId};

impl Session {
    pub fn switch_to_workspace(&mut self, n: WorkspaceId) -> CoreResult<String> {
        self.workspaces.switch_to_workspace(n)?;
        Ok(format!("Now on workspace {}", n))
    }

    /// Moves the current track into the stash of workspace `ws`
    pub fn send_track(&mut self, ws: WorkspaceId) -> CoreResult<String> {
        if !self.workspaces.is_workspace(ws) {
            return Err(CoreError::InvalidWorkspace(ws));
        }
        let index = self.current_live_index()?;
        if !self.workspaces.send_track(index, ws)? {
            return Ok("Track is already on that workspace. No change.".to_string());
        }
        Ok(format!("Ok. Sent track to workspace {}", ws))
    }
}
