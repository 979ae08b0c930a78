use std::path::Path;

use crate::config::Config;

/// The subset of `HEARTBEAT.md` lines this build recognises, each paired
/// with the setting it maps to. Matching is a case-insensitive substring
/// check against the line's text after stripping a leading checkbox marker.
const RECOGNITION_TABLE: &[(&str, ToggleTarget)] = &[
    ("process backlog kanban cards", ToggleTarget::ProcessBacklog),
    ("retry blocked cards", ToggleTarget::RetryBlocked),
    ("skip cards tagged interactive", ToggleTarget::SkipInteractiveOnly),
    ("merge branch-verified cards", ToggleTarget::MergeVerified),
    ("collect campaign metrics", ToggleTarget::CollectMetrics),
    (
        "generate cross-project synthesis",
        ToggleTarget::CrossProjectSynthesis,
    ),
    ("draft prs for merge-verified", ToggleTarget::DraftPrs),
    ("send daily digest", ToggleTarget::SendDigest),
    ("clean up stale worktrees", ToggleTarget::CleanWorktrees),
    (
        "telegram/websocket notifications",
        ToggleTarget::Notifications,
    ),
    ("skip cards with context", ToggleTarget::SkipLargeContext),
];

#[derive(Debug, Clone, Copy)]
enum ToggleTarget {
    ProcessBacklog,
    RetryBlocked,
    SkipInteractiveOnly,
    MergeVerified,
    CollectMetrics,
    CrossProjectSynthesis,
    DraftPrs,
    SendDigest,
    CleanWorktrees,
    Notifications,
    SkipLargeContext,
}

/// The deltas read out of `HEARTBEAT.md`: every field is `None` unless that
/// line was actually present, so parsing an empty or partial checklist never
/// clobbers a setting it doesn't mention.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecklistOverlay {
    pub process_backlog: Option<bool>,
    pub retry_blocked: Option<bool>,
    pub skip_interactive_only: Option<bool>,
    pub merge_verified: Option<bool>,
    pub collect_metrics: Option<bool>,
    pub cross_project_synthesis: Option<bool>,
    pub draft_prs: Option<bool>,
    pub send_digest: Option<bool>,
    pub clean_worktrees: Option<bool>,
    pub notifications: Option<bool>,
    pub skip_large_context: Option<bool>,
    pub max_concurrent_agents: Option<u32>,
    pub blocked_retry_minutes: Option<u32>,
}

impl ChecklistOverlay {
    /// Parse a checklist's raw text. Unmatched lines are silently ignored.
    pub fn parse(text: &str) -> Self {
        let mut overlay = ChecklistOverlay::default();

        for raw_line in text.lines() {
            let line = raw_line.trim();

            if let Some(value) = parse_numeric_toggle(line, "max concurrent agents") {
                overlay.max_concurrent_agents = Some(value);
                continue;
            }
            if let Some(value) = parse_numeric_toggle(line, "blocked retry interval") {
                overlay.blocked_retry_minutes = Some(value);
                continue;
            }

            let Some((checked, rest)) = parse_checkbox(line) else {
                continue;
            };
            let rest_lower = rest.to_lowercase();

            for (pattern, target) in RECOGNITION_TABLE {
                if rest_lower.contains(pattern) {
                    overlay.apply(*target, checked);
                    break;
                }
            }
        }

        overlay
    }

    /// Read and parse a checklist file. A missing file yields an empty
    /// overlay (every default stands), matching spec's "falls back to
    /// defaults" behaviour.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(_) => ChecklistOverlay::default(),
        }
    }

    fn apply(&mut self, target: ToggleTarget, value: bool) {
        match target {
            ToggleTarget::ProcessBacklog => self.process_backlog = Some(value),
            ToggleTarget::RetryBlocked => self.retry_blocked = Some(value),
            ToggleTarget::SkipInteractiveOnly => self.skip_interactive_only = Some(value),
            ToggleTarget::MergeVerified => self.merge_verified = Some(value),
            ToggleTarget::CollectMetrics => self.collect_metrics = Some(value),
            ToggleTarget::CrossProjectSynthesis => self.cross_project_synthesis = Some(value),
            ToggleTarget::DraftPrs => self.draft_prs = Some(value),
            ToggleTarget::SendDigest => self.send_digest = Some(value),
            ToggleTarget::CleanWorktrees => self.clean_worktrees = Some(value),
            ToggleTarget::Notifications => self.notifications = Some(value),
            ToggleTarget::SkipLargeContext => self.skip_large_context = Some(value),
        }
    }

    /// Apply this overlay onto a config's toggles/constraints, in place.
    /// Never touches `data_dir`, `port`, or `bearer_token` — the checklist
    /// overrides runtime toggles, never secrets.
    pub fn apply_to(&self, config: &mut Config) {
        let t = &mut config.toggles;
        if let Some(v) = self.process_backlog {
            t.process_backlog = v;
        }
        if let Some(v) = self.retry_blocked {
            t.retry_blocked = v;
        }
        if let Some(v) = self.skip_interactive_only {
            t.skip_interactive_only = v;
        }
        if let Some(v) = self.merge_verified {
            t.merge_verified = v;
        }
        if let Some(v) = self.collect_metrics {
            t.collect_metrics = v;
        }
        if let Some(v) = self.cross_project_synthesis {
            t.cross_project_synthesis = v;
        }
        if let Some(v) = self.draft_prs {
            t.draft_prs = v;
        }
        if let Some(v) = self.send_digest {
            t.send_digest = v;
        }
        if let Some(v) = self.clean_worktrees {
            t.clean_worktrees = v;
        }
        if let Some(v) = self.notifications {
            t.notifications = v;
        }

        let c = &mut config.constraints;
        if let Some(v) = self.skip_large_context {
            c.skip_large_context = v;
        }
        if let Some(v) = self.max_concurrent_agents {
            c.max_concurrent_agents = v;
        }
        if let Some(v) = self.blocked_retry_minutes {
            c.blocked_retry_minutes = v;
        }
    }
}

fn parse_checkbox(line: &str) -> Option<(bool, &str)> {
    let rest = line.strip_prefix('-')?.trim_start();
    if let Some(rest) = rest.strip_prefix("[x]").or_else(|| rest.strip_prefix("[X]")) {
        Some((true, rest.trim()))
    } else {
        rest.strip_prefix("[ ]").map(|rest| (false, rest.trim()))
    }
}

/// Match `"<label>: <int>"`, case-insensitively on the label.
fn parse_numeric_toggle(line: &str, label: &str) -> Option<u32> {
    let lower = line.to_lowercase();
    let idx = lower.find(label)?;
    let rest = &line[idx + label.len()..];
    let digits: String = rest
        .trim_start_matches([':', ' '])
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
