use freshell_core::time::MINUTE_MS;

/// Tabs open longer than this are remembered after close.
pub const KEEP_CLOSED_AFTER_MS: i64 = 5 * MINUTE_MS;

/// What the close-time decision looks at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClosedTabFacts {
    pub open_duration_ms: i64,
    pub pane_count: usize,
    pub title_set_by_user: bool,
}

/// Whether a closed tab is worth keeping in closed history.
/// Short-lived, single-pane, auto-titled tabs are scratch and dropped.
pub fn should_keep_closed_tab(facts: &ClosedTabFacts) -> bool {
    facts.open_duration_ms > KEEP_CLOSED_AFTER_MS || facts.pane_count > 1 || facts.title_set_by_user
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(open_duration_ms: i64, pane_count: usize, title_set_by_user: bool) -> ClosedTabFacts {
        ClosedTabFacts {
            open_duration_ms,
            pane_count,
            title_set_by_user,
        }
    }

    #[test]
    fn exactly_five_minutes_is_not_kept() {
        assert!(!should_keep_closed_tab(&facts(300_000, 1, false)));
    }

    #[test]
    fn just_over_five_minutes_is_kept() {
        assert!(should_keep_closed_tab(&facts(300_001, 1, false)));
    }

    #[test]
    fn multiple_panes_are_kept() {
        assert!(should_keep_closed_tab(&facts(1, 2, false)));
    }

    #[test]
    fn user_title_is_kept() {
        assert!(should_keep_closed_tab(&facts(0, 1, true)));
    }

    #[test]
    fn scratch_tab_is_dropped() {
        assert!(!should_keep_closed_tab(&facts(10_000, 1, false)));
    }
}
