use chrono::{DateTime, Utc};

use awc_core::config::{Constraints, Toggles};
use awc_core::types::{AgentStatus, KanbanCard};

/// Picks the next eligible backlog card per the §4.2 selection algorithm:
/// minimise `(-priority, position, createdAt)` over cards that aren't
/// currently running or still within their blocked-retry window, honouring
/// `skipInteractiveOnly`.
///
/// `backlog` must already be restricted to one project's `backlog` column
/// cards; `now` is passed in so the retry-window check is deterministic.
pub fn select_next(
    backlog: &[KanbanCard],
    toggles: &Toggles,
    constraints: &Constraints,
    now: DateTime<Utc>,
) -> Option<KanbanCard> {
    let retry_window = chrono::Duration::minutes(constraints.blocked_retry_minutes as i64);

    backlog
        .iter()
        .filter(|card| is_eligible(card, toggles, retry_window, now))
        .min_by(|a, b| {
            (-a.priority, a.position, a.created_at).cmp(&(-b.priority, b.position, b.created_at))
        })
        .cloned()
}

fn is_eligible(
    card: &KanbanCard,
    toggles: &Toggles,
    retry_window: chrono::Duration,
    now: DateTime<Utc>,
) -> bool {
    if toggles.skip_interactive_only && card.is_interactive_only() {
        return false;
    }

    match card.agent_status {
        Some(AgentStatus::Running) => false,
        Some(AgentStatus::Blocked) => now - card.updated_at >= retry_window,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awc_core::types::Project;

    fn card(priority: i32, position: i32, created_offset_secs: i64) -> KanbanCard {
        let project = Project::new("p", "d");
        let mut c = KanbanCard::new(project.id, "title", "desc");
        c.priority = priority;
        c.position = position;
        c.created_at = Utc::now() - chrono::Duration::seconds(created_offset_secs);
        c.updated_at = c.created_at;
        c
    }

    #[test]
    fn picks_highest_priority_first() {
        let low = card(0, 0, 10);
        let high = card(5, 0, 5);
        let toggles = Toggles::default();
        let constraints = Constraints::default();
        let picked = select_next(&[low.clone(), high.clone()], &toggles, &constraints, Utc::now()).unwrap();
        assert_eq!(picked.id, high.id);
    }

    #[test]
    fn ties_on_priority_break_by_position_then_age() {
        let a = card(1, 1, 100);
        let b = card(1, 0, 1);
        let toggles = Toggles::default();
        let constraints = Constraints::default();
        let picked = select_next(&[a, b.clone()], &toggles, &constraints, Utc::now()).unwrap();
        assert_eq!(picked.id, b.id);
    }

    #[test]
    fn excludes_running_cards() {
        let mut running = card(5, 0, 0);
        running.agent_status = Some(AgentStatus::Running);
        let toggles = Toggles::default();
        let constraints = Constraints::default();
        assert!(select_next(&[running], &toggles, &constraints, Utc::now()).is_none());
    }

    #[test]
    fn blocked_card_becomes_eligible_after_retry_window() {
        let mut blocked = card(5, 0, 0);
        blocked.agent_status = Some(AgentStatus::Blocked);
        blocked.updated_at = Utc::now() - chrono::Duration::minutes(20);
        let toggles = Toggles::default();
        let mut constraints = Constraints::default();
        constraints.blocked_retry_minutes = 15;
        let picked = select_next(&[blocked.clone()], &toggles, &constraints, Utc::now());
        assert_eq!(picked.unwrap().id, blocked.id);
    }

    #[test]
    fn blocked_card_within_retry_window_is_excluded() {
        let mut blocked = card(5, 0, 0);
        blocked.agent_status = Some(AgentStatus::Blocked);
        blocked.updated_at = Utc::now() - chrono::Duration::minutes(5);
        let toggles = Toggles::default();
        let mut constraints = Constraints::default();
        constraints.blocked_retry_minutes = 15;
        assert!(select_next(&[blocked], &toggles, &constraints, Utc::now()).is_none());
    }

    #[test]
    fn skip_interactive_only_excludes_tagged_cards() {
        let mut interactive = card(5, 0, 0);
        interactive.labels.push("agent:interactive".to_string());
        let mut toggles = Toggles::default();
        toggles.skip_interactive_only = true;
        let constraints = Constraints::default();
        assert!(select_next(&[interactive], &toggles, &constraints, Utc::now()).is_none());
    }

    #[test]
    fn empty_backlog_returns_none() {
        let toggles = Toggles::default();
        let constraints = Constraints::default();
        assert!(select_next(&[], &toggles, &constraints, Utc::now()).is_none());
    }
}
