//! Tab + pane tree → wire-safe registry record.
//!
//! [`sanitize_pane_payload`] is the only place runtime handles are dropped
//! from outbound content. Nothing else in the tree needs to know what is
//! safe to transmit.

use std::collections::HashMap;

use freshell_core::content::{PaneContent, SessionRef};
use freshell_core::id::make_tab_key;
use freshell_core::registry::{RegistryPaneSnapshot, RegistryTabRecord, RegistryTabStatus};
use freshell_core::tab::Tab;
use freshell_layout::PaneNode;
use serde_json::Value;

/// Identity of this device as stamped on every record it builds.
#[derive(Clone, Copy, Debug)]
pub struct SnapshotContext<'a> {
    pub device_id: &'a str,
    pub device_label: &'a str,
    /// Backend instance this device is currently attached to. Empty when
    /// not yet known.
    pub server_instance_id: &'a str,
}

/// Pane content as it may leave this device.
///
/// Runtime handles (`terminalId`, `createRequestId`, agent-chat `sessionId`)
/// are removed. A `resumeSessionId` without a `sessionRef` gets one pointing
/// at `server_instance_id`, so other devices can tell whether the session is
/// resumable from their backend. Plain shells have nothing to resume.
pub fn sanitize_pane_payload(content: &PaneContent, server_instance_id: &str) -> Value {
    let mut content = content.clone();
    match &mut content {
        PaneContent::Terminal {
            mode,
            resume_session_id,
            session_ref,
            terminal_id,
            create_request_id,
            ..
        } => {
            *terminal_id = None;
            *create_request_id = None;
            if session_ref.is_none() {
                *session_ref = synthesize_session_ref(
                    mode.provider().map(|p| p.as_str()),
                    resume_session_id.as_deref(),
                    server_instance_id,
                );
            }
        }
        PaneContent::AgentChat {
            provider,
            resume_session_id,
            session_ref,
            session_id,
            ..
        } => {
            *session_id = None;
            if session_ref.is_none() {
                *session_ref = synthesize_session_ref(
                    Some(provider.as_str()),
                    resume_session_id.as_deref(),
                    server_instance_id,
                );
            }
        }
        PaneContent::Browser { .. } | PaneContent::Editor { .. } | PaneContent::Picker => {}
    }

    serde_json::to_value(&content).unwrap_or_else(|e| {
        log::warn!("Failed to encode {} pane payload: {}", content.kind(), e);
        serde_json::json!({ "kind": content.kind() })
    })
}

fn synthesize_session_ref(
    provider: Option<&str>,
    resume_session_id: Option<&str>,
    server_instance_id: &str,
) -> Option<SessionRef> {
    let provider = provider?;
    let session_id = resume_session_id?;
    if server_instance_id.is_empty() {
        return None;
    }
    Some(SessionRef {
        provider: provider.to_string(),
        session_id: session_id.to_string(),
        server_instance_id: server_instance_id.to_string(),
    })
}

pub fn count_pane_leaves(tree: &PaneNode) -> usize {
    tree.count_leaves()
}

/// Wire snapshots of every pane, depth-first.
pub fn pane_snapshots(
    layout: &PaneNode,
    pane_titles: Option<&HashMap<String, String>>,
    server_instance_id: &str,
) -> Vec<RegistryPaneSnapshot> {
    layout
        .collect_leaves()
        .into_iter()
        .map(|(pane_id, content)| RegistryPaneSnapshot {
            pane_id: pane_id.to_string(),
            kind: content.kind().to_string(),
            title: pane_titles.and_then(|t| t.get(pane_id)).cloned(),
            payload: sanitize_pane_payload(content, server_instance_id),
        })
        .collect()
}

fn build_record(
    tab: &Tab,
    layout: Option<&PaneNode>,
    pane_titles: Option<&HashMap<String, String>>,
    revision: u64,
    ctx: &SnapshotContext<'_>,
    status: RegistryTabStatus,
    now: i64,
) -> RegistryTabRecord {
    let panes = layout
        .map(|l| pane_snapshots(l, pane_titles, ctx.server_instance_id))
        .unwrap_or_default();
    RegistryTabRecord {
        tab_key: make_tab_key(ctx.device_id, &tab.id),
        tab_id: tab.id.clone(),
        device_id: ctx.device_id.to_string(),
        device_label: ctx.device_label.to_string(),
        server_instance_id: ctx.server_instance_id.to_string(),
        tab_name: tab.title.clone(),
        status,
        revision,
        created_at: tab.created_at,
        updated_at: now,
        closed_at: (status == RegistryTabStatus::Closed).then_some(now),
        pane_count: layout.map(count_pane_leaves).unwrap_or(0),
        title_set_by_user: tab.title_set_by_user,
        panes,
    }
}

pub fn build_open_record(
    tab: &Tab,
    layout: Option<&PaneNode>,
    pane_titles: Option<&HashMap<String, String>>,
    revision: u64,
    ctx: &SnapshotContext<'_>,
    now: i64,
) -> RegistryTabRecord {
    build_record(tab, layout, pane_titles, revision, ctx, RegistryTabStatus::Open, now)
}

/// Like [`build_open_record`] but `status: closed` and `closedAt = now`.
pub fn build_closed_record(
    tab: &Tab,
    layout: Option<&PaneNode>,
    pane_titles: Option<&HashMap<String, String>>,
    revision: u64,
    ctx: &SnapshotContext<'_>,
    now: i64,
) -> RegistryTabRecord {
    build_record(tab, layout, pane_titles, revision, ctx, RegistryTabStatus::Closed, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use freshell_core::content::{ShellType, TerminalMode};
    use freshell_core::types::SplitDirection;

    const CTX: SnapshotContext<'static> = SnapshotContext {
        device_id: "laptop",
        device_label: "Laptop",
        server_instance_id: "srv-a",
    };

    fn terminal(mode: TerminalMode, resume: Option<&str>) -> PaneContent {
        PaneContent::Terminal {
            mode,
            shell: ShellType::System,
            resume_session_id: resume.map(str::to_string),
            session_ref: None,
            initial_cwd: Some("/work".into()),
            terminal_id: Some("term-42".into()),
            create_request_id: Some("req-1".into()),
        }
    }

    fn two_pane_layout() -> PaneNode {
        PaneNode::Split {
            id: "s".into(),
            direction: SplitDirection::Horizontal,
            sizes: [50.0, 50.0],
            children: Box::new([
                PaneNode::Leaf {
                    id: "p1".into(),
                    content: terminal(TerminalMode::Shell, None),
                },
                PaneNode::Leaf {
                    id: "p2".into(),
                    content: PaneContent::browser("http://x"),
                },
            ]),
        }
    }

    #[test]
    fn sanitize_drops_runtime_handles() {
        let payload = sanitize_pane_payload(&terminal(TerminalMode::Shell, None), "srv-a");
        assert!(payload.get("terminalId").is_none());
        assert!(payload.get("createRequestId").is_none());
        assert_eq!(payload["initialCwd"], "/work");
        assert_eq!(payload["kind"], "terminal");
    }

    #[test]
    fn sanitize_synthesizes_session_ref_for_cli_terminals() {
        let payload = sanitize_pane_payload(&terminal(TerminalMode::Codex, Some("s-1")), "srv-a");
        assert_eq!(payload["resumeSessionId"], "s-1");
        assert_eq!(payload["sessionRef"]["provider"], "codex");
        assert_eq!(payload["sessionRef"]["sessionId"], "s-1");
        assert_eq!(payload["sessionRef"]["serverInstanceId"], "srv-a");
    }

    #[test]
    fn sanitize_plain_shell_gets_no_session_ref() {
        let payload = sanitize_pane_payload(&terminal(TerminalMode::Shell, Some("s-1")), "srv-a");
        assert!(payload.get("sessionRef").is_none());
    }

    #[test]
    fn sanitize_keeps_existing_session_ref() {
        let mut content = terminal(TerminalMode::Claude, Some("s-1"));
        if let PaneContent::Terminal { session_ref, .. } = &mut content {
            *session_ref = Some(SessionRef {
                provider: "claude".into(),
                session_id: "s-0".into(),
                server_instance_id: "srv-old".into(),
            });
        }
        let payload = sanitize_pane_payload(&content, "srv-a");
        assert_eq!(payload["sessionRef"]["sessionId"], "s-0");
        assert_eq!(payload["sessionRef"]["serverInstanceId"], "srv-old");
    }

    #[test]
    fn sanitize_agent_chat() {
        let content = PaneContent::AgentChat {
            provider: "freshclaude".into(),
            resume_session_id: Some("chat-1".into()),
            session_ref: None,
            model: Some("opus".into()),
            permission_mode: None,
            effort: None,
            session_id: Some("sdk-live".into()),
        };
        let payload = sanitize_pane_payload(&content, "srv-a");
        assert!(payload.get("sessionId").is_none());
        assert_eq!(payload["sessionRef"]["provider"], "freshclaude");
        assert_eq!(payload["model"], "opus");
    }

    #[test]
    fn sanitize_without_server_instance_skips_session_ref() {
        let payload = sanitize_pane_payload(&terminal(TerminalMode::Codex, Some("s-1")), "");
        assert!(payload.get("sessionRef").is_none());
        assert_eq!(payload["resumeSessionId"], "s-1");
    }

    #[test]
    fn open_and_closed_records_differ_only_in_status_and_closed_at() {
        let tab = Tab::new("local-tab", "Work", 100);
        let layout = two_pane_layout();
        let mut titles = HashMap::new();
        titles.insert("p2".to_string(), "Docs".to_string());

        let open = build_open_record(&tab, Some(&layout), Some(&titles), 3, &CTX, 5_000);
        let closed = build_closed_record(&tab, Some(&layout), Some(&titles), 3, &CTX, 5_000);

        assert_eq!(open.tab_key, "laptop:local-tab");
        assert_eq!(open.pane_count, 2);
        assert_eq!(open.panes[0].pane_id, "p1");
        assert_eq!(open.panes[1].kind, "browser");
        assert_eq!(open.panes[1].title.as_deref(), Some("Docs"));
        assert!(open.closed_at.is_none());
        assert_eq!(closed.closed_at, Some(5_000));
        assert_eq!(closed.status, RegistryTabStatus::Closed);

        let mut reopened = closed.clone();
        reopened.status = RegistryTabStatus::Open;
        reopened.closed_at = None;
        assert_eq!(reopened, open);
    }

    #[test]
    fn pane_count_matches_snapshot_length() {
        let layout = two_pane_layout();
        let snaps = pane_snapshots(&layout, None, "srv-a");
        assert_eq!(count_pane_leaves(&layout), snaps.len());
    }
}
