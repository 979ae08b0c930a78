//! Real [`DraftPrPreparer`] implementation, posting through
//! `awc-integrations::github::pull_requests`.

use async_trait::async_trait;
use tracing::warn;

use awc_core::types::KanbanCard;
use awc_integrations::github::client::GitHubClient;
use awc_integrations::github::pull_requests::create_draft_pull_request;

use crate::daily::DraftPrPreparer;

pub struct GitHubDraftPrPreparer {
    client: GitHubClient,
    base_branch: String,
}

impl GitHubDraftPrPreparer {
    pub fn new(client: GitHubClient, base_branch: impl Into<String>) -> Self {
        Self { client, base_branch: base_branch.into() }
    }
}

#[async_trait]
impl DraftPrPreparer for GitHubDraftPrPreparer {
    async fn prepare(&self, card: &KanbanCard, branch_name: &str) -> bool {
        let body = format!(
            "Autonomous work core opened this draft PR for card `{}` after it passed merge verification.",
            card.id
        );
        match create_draft_pull_request(
            &self.client,
            &card.title,
            Some(&body),
            branch_name,
            &self.base_branch,
        )
        .await
        {
            Ok(pr) => {
                tracing::info!(card_id = %card.id, pr_number = pr.number, "opened draft PR");
                true
            }
            Err(e) => {
                warn!(card_id = %card.id, error = %e, "failed to open draft PR");
                false
            }
        }
    }
}
