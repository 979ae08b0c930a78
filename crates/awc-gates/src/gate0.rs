//! Gate 0 — preflight a card before an agent is spawned against it. Pure
//! and synchronous: every input is already known to the caller.

use awc_core::types::KanbanCard;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate0Result {
    pub passed: bool,
    pub reasons: Vec<String>,
}

/// Checks the five preflight conditions from the gate table: non-empty
/// title, a description or context snapshot, no other agent already
/// holding this card, a workspace healthy enough to branch from, and at
/// least one matched skill (the matching algorithm itself lives outside
/// this crate — the caller supplies the count).
pub fn run_gate0(
    card: &KanbanCard,
    other_agent_active: bool,
    workspace_healthy: bool,
    matched_skill_count: usize,
) -> Gate0Result {
    let mut reasons = Vec::new();

    if card.title.trim().is_empty() {
        reasons.push("card title is empty".to_string());
    }
    if card.description.trim().is_empty() && card.context_snapshot.is_none() {
        reasons.push("card has neither a description nor a context snapshot".to_string());
    }
    if other_agent_active {
        reasons.push("another agent already holds this card".to_string());
    }
    if !workspace_healthy {
        reasons.push("working tree is not healthy enough to create an isolated workspace".to_string());
    }
    if matched_skill_count == 0 {
        reasons.push("no domain skill matched this card".to_string());
    }

    Gate0Result {
        passed: reasons.is_empty(),
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn healthy_card() -> KanbanCard {
        let mut card = KanbanCard::new(Uuid::new_v4(), "fix the bug", "steps to reproduce");
        card.context_snapshot = None;
        card
    }

    #[test]
    fn passes_when_every_condition_holds() {
        let card = healthy_card();
        let result = run_gate0(&card, false, true, 1);
        assert!(result.passed);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn fails_on_empty_title() {
        let mut card = healthy_card();
        card.title = "   ".to_string();
        let result = run_gate0(&card, false, true, 1);
        assert!(!result.passed);
    }

    #[test]
    fn context_snapshot_satisfies_the_description_requirement() {
        let mut card = healthy_card();
        card.description = String::new();
        card.context_snapshot = Some("prior session notes".to_string());
        let result = run_gate0(&card, false, true, 1);
        assert!(result.passed);
    }

    #[test]
    fn fails_when_another_agent_holds_the_card() {
        let card = healthy_card();
        let result = run_gate0(&card, true, true, 1);
        assert!(!result.passed);
        assert!(result.reasons.iter().any(|r| r.contains("another agent")));
    }

    #[test]
    fn fails_with_zero_matched_skills() {
        let card = healthy_card();
        let result = run_gate0(&card, false, true, 0);
        assert!(!result.passed);
    }

    #[test]
    fn accumulates_every_failing_reason() {
        let mut card = KanbanCard::new(Uuid::new_v4(), "", "");
        card.context_snapshot = None;
        let result = run_gate0(&card, true, false, 0);
        assert_eq!(result.reasons.len(), 5);
    }
}
