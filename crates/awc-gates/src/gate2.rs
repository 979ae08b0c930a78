//! Gate 2 — post-merge regression re-verification. Runs the identical
//! static-check procedure as Gate 1, now against the integration branch
//! after a merge, tagged [`Gate::Merge`] instead of [`Gate::Branch`].

use std::time::Duration;

use uuid::Uuid;

use crate::gate1::{run_static_checks, StaticCheckCommands};
use crate::types::{Gate, VerificationResult};

pub async fn run_gate2(
    card_id: Uuid,
    workdir: &str,
    branch_name: &str,
    commands: &StaticCheckCommands,
    deadline: Duration,
) -> VerificationResult {
    run_static_checks(card_id, Gate::Merge, workdir, branch_name, commands, deadline).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gate2_tags_its_result_as_a_merge_gate() {
        let commands = StaticCheckCommands {
            typecheck: "true".to_string(),
            lint: "true".to_string(),
            test: "true".to_string(),
        };
        let result = run_gate2(Uuid::new_v4(), ".", "main", &commands, Duration::from_secs(5)).await;
        assert_eq!(result.gate, Gate::Merge);
        assert!(result.passed);
    }
}
