use crate::content::{CodingCliProvider, PaneContent, ShellType, TerminalMode};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    #[default]
    Creating,
    Running,
    Exited,
    Error,
}

/// A top-level tab. Its pane tree lives in the pane store, keyed by `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub title_set_by_user: bool,
    #[serde(default)]
    pub mode: TerminalMode,
    #[serde(default)]
    pub shell: ShellType,
    #[serde(default)]
    pub status: TabStatus,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coding_cli_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coding_cli_provider: Option<CodingCliProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_cwd: Option<String>,
}

impl Tab {
    pub fn new(id: impl Into<String>, title: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            title_set_by_user: false,
            mode: TerminalMode::Shell,
            shell: ShellType::System,
            status: TabStatus::Creating,
            created_at,
            terminal_id: None,
            coding_cli_session_id: None,
            coding_cli_provider: None,
            resume_session_id: None,
            initial_cwd: None,
        }
    }

    /// Content of the first pane when the tab's layout is created.
    ///
    /// Tabs created before panes existed carried their terminal settings on
    /// the tab itself; those are folded into the initial terminal leaf.
    pub fn default_content(&self) -> PaneContent {
        let mode = match (self.mode, self.coding_cli_provider) {
            (TerminalMode::Shell, Some(provider)) => TerminalMode::from_provider(provider),
            (mode, _) => mode,
        };
        let resume_session_id = self
            .resume_session_id
            .clone()
            .or_else(|| self.coding_cli_session_id.clone());
        PaneContent::Terminal {
            mode,
            shell: self.shell,
            resume_session_id,
            session_ref: None,
            initial_cwd: self.initial_cwd.clone(),
            terminal_id: self.terminal_id.clone(),
            create_request_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_content_carries_tab_terminal_settings() {
        let mut tab = Tab::new("t1", "Work", 0);
        tab.mode = TerminalMode::Codex;
        tab.resume_session_id = Some("sess-1".into());
        tab.initial_cwd = Some("/home/me".into());

        match tab.default_content() {
            PaneContent::Terminal { mode, resume_session_id, initial_cwd, .. } => {
                assert_eq!(mode, TerminalMode::Codex);
                assert_eq!(resume_session_id.as_deref(), Some("sess-1"));
                assert_eq!(initial_cwd.as_deref(), Some("/home/me"));
            }
            other => panic!("expected terminal, got {:?}", other),
        }
    }

    #[test]
    fn legacy_coding_cli_fields_fold_into_mode() {
        let mut tab = Tab::new("t1", "Legacy", 0);
        tab.coding_cli_provider = Some(CodingCliProvider::Claude);
        tab.coding_cli_session_id = Some("old-session".into());

        let content = tab.default_content();
        assert_eq!(content.resume_session_id(), Some("old-session"));
        match content {
            PaneContent::Terminal { mode, .. } => assert_eq!(mode, TerminalMode::Claude),
            other => panic!("expected terminal, got {:?}", other),
        }
    }

    #[test]
    fn tab_json_uses_camel_case() {
        let tab = Tab::new("t1", "Shell", 42);
        let value = serde_json::to_value(&tab).unwrap();
        assert_eq!(value["createdAt"], 42);
        assert_eq!(value["titleSetByUser"], false);
        assert_eq!(value["status"], "creating");
        assert!(value.get("terminalId").is_none());
    }
}
