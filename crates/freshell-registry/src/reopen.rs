//! Registry record → local tab.

use freshell_core::content::PaneContent;
use freshell_core::registry::RegistryTabRecord;
use freshell_core::tab::Tab;
use freshell_core::time::now_ms;
use freshell_state::Workspace;
use serde_json::Value;

const KNOWN_KINDS: [&str; 5] = ["terminal", "browser", "editor", "agent-chat", "picker"];

/// Rebuild pane content from a registry payload.
///
/// A `resumeSessionId` is only honored when the record came from the backend
/// instance this device is attached to; otherwise it is dropped and the pane
/// opens without resuming. `sessionRef` is kept as is. Runtime handles are
/// never carried over, and unknown kinds become `picker`.
pub fn payload_to_content(
    kind: &str,
    payload: &Value,
    local_server_instance_id: &str,
    record_server_instance_id: &str,
) -> PaneContent {
    if !KNOWN_KINDS.contains(&kind) {
        log::debug!("Unknown pane kind {:?}, opening picker", kind);
        return PaneContent::Picker;
    }

    let mut obj = payload.as_object().cloned().unwrap_or_default();
    obj.insert("kind".to_string(), Value::String(kind.to_string()));
    let mut content = match serde_json::from_value::<PaneContent>(Value::Object(obj)) {
        Ok(content) => content,
        Err(e) => {
            log::warn!("Unreadable {} payload, opening picker: {}", kind, e);
            return PaneContent::Picker;
        }
    };

    let same_origin = !local_server_instance_id.is_empty()
        && local_server_instance_id == record_server_instance_id;
    match &mut content {
        PaneContent::Terminal {
            resume_session_id,
            terminal_id,
            create_request_id,
            ..
        } => {
            *terminal_id = None;
            *create_request_id = None;
            if !same_origin {
                *resume_session_id = None;
            }
        }
        PaneContent::AgentChat {
            resume_session_id,
            session_id,
            ..
        } => {
            *session_id = None;
            if !same_origin {
                *resume_session_id = None;
            }
        }
        PaneContent::Browser { .. } | PaneContent::Editor { .. } | PaneContent::Picker => {}
    }
    content
}

/// Open a record as a new, unlinked local tab. Returns the new tab id.
///
/// The tab gets a fresh id and reproduces the record's panes, in order,
/// as a chain of splits.
pub fn open_copy(workspace: &mut Workspace, record: &RegistryTabRecord, local_server_instance_id: &str) -> String {
    let mut contents = record.panes.iter().map(|pane| {
        payload_to_content(
            &pane.kind,
            &pane.payload,
            local_server_instance_id,
            &record.server_instance_id,
        )
    });
    let first = contents.next().unwrap_or(PaneContent::Picker);

    let mut tab = Tab::new(uuid::Uuid::new_v4().to_string(), record.tab_name.clone(), now_ms());
    tab.title_set_by_user = record.title_set_by_user;
    if let PaneContent::Terminal { mode, shell, .. } = &first {
        tab.mode = *mode;
        tab.shell = *shell;
    }
    let tab_id = tab.id.clone();
    workspace.add_tab(tab, first);

    for content in contents {
        workspace.append_pane(&tab_id, content);
    }

    // Carry pane titles over by position
    let pane_ids = workspace
        .layout(&tab_id)
        .map(|l| l.collect_leaf_ids())
        .unwrap_or_default();
    for (pane_id, snapshot) in pane_ids.iter().zip(&record.panes) {
        if let Some(title) = &snapshot.title {
            workspace.rename_pane(&tab_id, pane_id, title, false);
        }
    }
    if let Some(first_pane) = pane_ids.first() {
        workspace.set_active_pane(&tab_id, first_pane);
    }

    log::info!(
        "Opened copy of {} as tab {} with {} panes",
        record.tab_key,
        tab_id,
        pane_ids.len()
    );
    tab_id
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JumpOutcome {
    /// The tab exists here and was activated.
    Activated(String),
    /// The tab doesn't exist here; an unlinked copy was opened.
    OpenedCopy(String),
}

/// Activate the record's tab if it exists locally, otherwise open a copy.
pub fn jump_to_tab(
    workspace: &mut Workspace,
    record: &RegistryTabRecord,
    local_server_instance_id: &str,
) -> JumpOutcome {
    if workspace.tab(&record.tab_id).is_some() {
        workspace.activate_tab(&record.tab_id);
        return JumpOutcome::Activated(record.tab_id.clone());
    }
    JumpOutcome::OpenedCopy(open_copy(workspace, record, local_server_instance_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use freshell_core::content::{SessionRef, TerminalMode};
    use freshell_core::registry::{RegistryGroups, RegistryPaneSnapshot};
    use serde_json::json;

    fn remote_record() -> RegistryTabRecord {
        let data: RegistryGroups = serde_json::from_value(json!({
            "localOpen": [],
            "remoteOpen": [{
                "tabKey": "remote:tab-1", "tabId": "tab-1", "deviceId": "remote",
                "deviceLabel": "Desktop", "serverInstanceId": "srv-b", "tabName": "Build",
                "status": "open", "revision": 2, "createdAt": 1, "updatedAt": 2,
                "paneCount": 2, "titleSetByUser": true,
                "panes": [
                    {"paneId": "p1", "kind": "terminal", "title": "server",
                     "payload": {"kind": "terminal", "mode": "codex", "resumeSessionId": "s-1",
                                 "sessionRef": {"provider": "codex", "sessionId": "s-1", "serverInstanceId": "srv-b"}}},
                    {"paneId": "p2", "kind": "browser",
                     "payload": {"kind": "browser", "url": "http://localhost:3000"}}
                ]
            }],
            "closed": []
        }))
        .unwrap();
        data.remote_open[0].clone()
    }

    #[test]
    fn foreign_origin_strips_resume_but_keeps_session_ref() {
        let record = remote_record();
        let pane = &record.panes[0];
        let content = payload_to_content(&pane.kind, &pane.payload, "srv-a", &record.server_instance_id);
        assert_eq!(content.resume_session_id(), None);
        assert_eq!(
            content.session_ref(),
            Some(&SessionRef {
                provider: "codex".into(),
                session_id: "s-1".into(),
                server_instance_id: "srv-b".into(),
            })
        );
    }

    #[test]
    fn same_origin_keeps_resume() {
        let record = remote_record();
        let pane = &record.panes[0];
        let content = payload_to_content(&pane.kind, &pane.payload, "srv-b", "srv-b");
        assert_eq!(content.resume_session_id(), Some("s-1"));
    }

    #[test]
    fn runtime_handles_never_survive() {
        let payload = json!({"kind": "terminal", "terminalId": "live-1", "createRequestId": "r"});
        match payload_to_content("terminal", &payload, "srv", "srv") {
            PaneContent::Terminal { terminal_id, create_request_id, .. } => {
                assert!(terminal_id.is_none());
                assert!(create_request_id.is_none());
            }
            other => panic!("expected terminal, got {:?}", other),
        }
        let chat = json!({"provider": "freshclaude", "sessionId": "sdk"});
        match payload_to_content("agent-chat", &chat, "srv", "srv") {
            PaneContent::AgentChat { session_id, .. } => assert!(session_id.is_none()),
            other => panic!("expected agent chat, got {:?}", other),
        }
    }

    #[test]
    fn unknown_or_broken_payloads_become_picker() {
        assert_eq!(payload_to_content("hologram", &json!({}), "a", "a"), PaneContent::Picker);
        // agent-chat requires a provider
        assert_eq!(payload_to_content("agent-chat", &json!({}), "a", "a"), PaneContent::Picker);
    }

    #[test]
    fn open_copy_reproduces_panes_in_order() {
        let record = remote_record();
        let mut ws = Workspace::default();

        let tab_id = open_copy(&mut ws, &record, "srv-a");
        assert_eq!(ws.tabs().len(), 1);
        assert_ne!(tab_id, record.tab_id);

        let layout = ws.layout(&tab_id).unwrap();
        let kinds: Vec<&str> = layout.collect_pane_contents().iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, vec!["terminal", "browser"]);

        let tab = ws.tab(&tab_id).unwrap();
        assert_eq!(tab.title, "Build");
        assert!(tab.title_set_by_user);
        assert_eq!(tab.mode, TerminalMode::Codex);

        let first = layout.first_leaf_id().to_string();
        assert_eq!(ws.panes().pane_title(&tab_id, &first), Some("server"));
        assert_eq!(ws.panes().active_pane(&tab_id), Some(first.as_str()));
    }

    #[test]
    fn open_copy_of_paneless_record_gets_picker() {
        let mut record = remote_record();
        record.panes.clear();
        let mut ws = Workspace::default();
        let tab_id = open_copy(&mut ws, &record, "srv-a");
        assert_eq!(
            ws.layout(&tab_id).unwrap().collect_pane_contents(),
            vec![&PaneContent::Picker]
        );
    }

    #[test]
    fn jump_activates_existing_tab() {
        let mut ws = Workspace::default();
        ws.open_tab(Tab::new("tab-1", "Build", 0));
        ws.open_tab(Tab::new("tab-2", "Other", 0));

        let outcome = jump_to_tab(&mut ws, &remote_record(), "srv-a");
        assert_eq!(outcome, JumpOutcome::Activated("tab-1".into()));
        assert_eq!(ws.active_tab_id(), Some("tab-1"));
        assert_eq!(ws.tabs().len(), 2);
    }

    #[test]
    fn jump_falls_back_to_copy() {
        let mut ws = Workspace::default();
        let outcome = jump_to_tab(&mut ws, &remote_record(), "srv-a");
        match outcome {
            JumpOutcome::OpenedCopy(id) => assert!(ws.tab(&id).is_some()),
            other => panic!("expected copy, got {:?}", other),
        }
    }

    #[test]
    fn snapshot_titles_are_optional() {
        let snap = RegistryPaneSnapshot {
            pane_id: "p".into(),
            kind: "picker".into(),
            title: None,
            payload: json!({}),
        };
        assert_eq!(payload_to_content(&snap.kind, &snap.payload, "a", "b"), PaneContent::Picker);
    }
}
