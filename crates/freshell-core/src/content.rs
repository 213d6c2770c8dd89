use serde::{Deserialize, Serialize};

/// Coding CLI that can run inside a terminal pane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodingCliProvider {
    Claude,
    Codex,
    Opencode,
    Gemini,
    Kimi,
}

impl CodingCliProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            CodingCliProvider::Claude => "claude",
            CodingCliProvider::Codex => "codex",
            CodingCliProvider::Opencode => "opencode",
            CodingCliProvider::Gemini => "gemini",
            CodingCliProvider::Kimi => "kimi",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            CodingCliProvider::Claude => "Claude",
            CodingCliProvider::Codex => "Codex",
            CodingCliProvider::Opencode => "OpenCode",
            CodingCliProvider::Gemini => "Gemini",
            CodingCliProvider::Kimi => "Kimi",
        }
    }
}

/// What a terminal pane runs: a plain shell or a named coding CLI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalMode {
    #[default]
    Shell,
    Claude,
    Codex,
    Opencode,
    Gemini,
    Kimi,
}

impl TerminalMode {
    /// The coding CLI behind this mode, `None` for plain shells.
    pub fn provider(self) -> Option<CodingCliProvider> {
        match self {
            TerminalMode::Shell => None,
            TerminalMode::Claude => Some(CodingCliProvider::Claude),
            TerminalMode::Codex => Some(CodingCliProvider::Codex),
            TerminalMode::Opencode => Some(CodingCliProvider::Opencode),
            TerminalMode::Gemini => Some(CodingCliProvider::Gemini),
            TerminalMode::Kimi => Some(CodingCliProvider::Kimi),
        }
    }

    pub fn from_provider(provider: CodingCliProvider) -> Self {
        match provider {
            CodingCliProvider::Claude => TerminalMode::Claude,
            CodingCliProvider::Codex => TerminalMode::Codex,
            CodingCliProvider::Opencode => TerminalMode::Opencode,
            CodingCliProvider::Gemini => TerminalMode::Gemini,
            CodingCliProvider::Kimi => TerminalMode::Kimi,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellType {
    #[default]
    System,
    Cmd,
    Powershell,
    Wsl,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorViewMode {
    #[default]
    Source,
    Preview,
}

/// Durable pointer to a resumable backend session.
///
/// Unlike a runtime terminal id, a session ref stays meaningful on other
/// devices: `server_instance_id` names the backend process that issued
/// `session_id`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRef {
    pub provider: String,
    pub session_id: String,
    pub server_instance_id: String,
}

/// Content hosted by a single pane.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum PaneContent {
    Terminal {
        #[serde(default)]
        mode: TerminalMode,
        #[serde(default)]
        shell: ShellType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resume_session_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_ref: Option<SessionRef>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_cwd: Option<String>,
        /// Live connection to a running terminal. Only valid on this device.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        terminal_id: Option<String>,
        /// Correlates an in-flight terminal create with its response.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        create_request_id: Option<String>,
    },
    Browser {
        #[serde(default)]
        url: String,
        #[serde(default)]
        dev_tools_open: bool,
    },
    Editor {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        #[serde(default)]
        read_only: bool,
        #[serde(default)]
        view_mode: EditorViewMode,
    },
    AgentChat {
        provider: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resume_session_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_ref: Option<SessionRef>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        permission_mode: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        effort: Option<String>,
        /// Live SDK session handle. Only valid on this device.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    Picker,
}

impl PaneContent {
    /// A fresh terminal with no session attached.
    pub fn terminal(mode: TerminalMode, shell: ShellType) -> Self {
        PaneContent::Terminal {
            mode,
            shell,
            resume_session_id: None,
            session_ref: None,
            initial_cwd: None,
            terminal_id: None,
            create_request_id: None,
        }
    }

    pub fn browser(url: impl Into<String>) -> Self {
        PaneContent::Browser {
            url: url.into(),
            dev_tools_open: false,
        }
    }

    pub fn editor(file_path: Option<String>) -> Self {
        PaneContent::Editor {
            file_path,
            language: None,
            read_only: false,
            view_mode: EditorViewMode::Source,
        }
    }

    pub fn agent_chat(provider: impl Into<String>) -> Self {
        PaneContent::AgentChat {
            provider: provider.into(),
            resume_session_id: None,
            session_ref: None,
            model: None,
            permission_mode: None,
            effort: None,
            session_id: None,
        }
    }

    /// Wire name of the content kind (matches the serde tag).
    pub fn kind(&self) -> &'static str {
        match self {
            PaneContent::Terminal { .. } => "terminal",
            PaneContent::Browser { .. } => "browser",
            PaneContent::Editor { .. } => "editor",
            PaneContent::AgentChat { .. } => "agent-chat",
            PaneContent::Picker => "picker",
        }
    }

    pub fn is_picker(&self) -> bool {
        matches!(self, PaneContent::Picker)
    }

    pub fn resume_session_id(&self) -> Option<&str> {
        match self {
            PaneContent::Terminal { resume_session_id, .. }
            | PaneContent::AgentChat { resume_session_id, .. } => resume_session_id.as_deref(),
            _ => None,
        }
    }

    pub fn session_ref(&self) -> Option<&SessionRef> {
        match self {
            PaneContent::Terminal { session_ref, .. }
            | PaneContent::AgentChat { session_ref, .. } => session_ref.as_ref(),
            _ => None,
        }
    }

    /// Fallback pane title when the user hasn't named the pane.
    pub fn default_title(&self) -> String {
        match self {
            PaneContent::Terminal { mode, .. } => match mode.provider() {
                Some(provider) => provider.display_name().to_string(),
                None => "Shell".to_string(),
            },
            PaneContent::Browser { url, .. } if !url.is_empty() => url.clone(),
            PaneContent::Browser { .. } => "Browser".to_string(),
            PaneContent::Editor { file_path: Some(path), .. } => std::path::Path::new(path)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("Editor")
                .to_string(),
            PaneContent::Editor { .. } => "Editor".to_string(),
            PaneContent::AgentChat { .. } => "Chat".to_string(),
            PaneContent::Picker => "New Tab".to_string(),
        }
    }
}
