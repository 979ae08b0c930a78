//! Parses `:::action` blocks out of assistant chat text and applies them to
//! the Kanban/document/decision state. A block looks like:
//!
//! ```text
//! :::action
//! {"type": "create_card", "project_id": "...", "title": "...", "description": "..."}
//! :::
//! ```
//!
//! Malformed JSON or an unrecognized `type` is silently skipped — a broken
//! action block shouldn't break the rest of the assistant's reply.

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use awc_core::store::Store;
use awc_core::types::{Decision, DocumentType, KanbanCard, ProjectDocument};
use awc_queue::WorkQueue;

const FENCE: &str = ":::action";
const CLOSE: &str = ":::";

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WorkspaceAction {
    CreateCard {
        project_id: Uuid,
        title: String,
        #[serde(default)]
        description: String,
    },
    MoveCard {
        card_id: Uuid,
        column: awc_core::types::Column,
    },
    LogDecision {
        project_id: Uuid,
        title: String,
        reasoning: String,
    },
    AddAssumption {
        project_id: Uuid,
        title: String,
        content: String,
    },
    UpdateState {
        project_id: Uuid,
        content: String,
    },
}

/// Extract every `:::action ... :::` block's raw JSON payload from `text`.
fn extract_blocks(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(FENCE) {
        let after_fence = &rest[start + FENCE.len()..];
        let Some(end) = after_fence.find(CLOSE) else {
            break;
        };
        out.push(after_fence[..end].trim());
        rest = &after_fence[end + CLOSE.len()..];
    }
    out
}

/// Parse and apply every workspace action embedded in `text`, returning the
/// number successfully applied. Parse failures and unknown actions are
/// skipped, not treated as errors — a chat reply with a bad block should
/// still otherwise go through.
pub async fn apply_actions(text: &str, store: &Arc<Store>, queue: &Arc<WorkQueue>) -> usize {
    let mut applied = 0;
    for raw in extract_blocks(text) {
        let Ok(action) = serde_json::from_str::<WorkspaceAction>(raw) else {
            tracing::debug!(raw, "skipping malformed workspace action block");
            continue;
        };
        if apply_one(action, store, queue).await.is_ok() {
            applied += 1;
        }
    }
    applied
}

async fn apply_one(
    action: WorkspaceAction,
    store: &Arc<Store>,
    queue: &Arc<WorkQueue>,
) -> Result<(), awc_core::error::CoreError> {
    match action {
        WorkspaceAction::CreateCard {
            project_id,
            title,
            description,
        } => {
            queue
                .create_card(KanbanCard::new(project_id, title, description))
                .await?;
        }
        WorkspaceAction::MoveCard { card_id, column } => {
            queue.move_card(card_id, column).await?;
        }
        WorkspaceAction::LogDecision {
            project_id,
            title,
            reasoning,
        } => {
            store
                .create_decision(&Decision::new(project_id, title, reasoning))
                .await?;
        }
        WorkspaceAction::AddAssumption {
            project_id,
            title,
            content,
        } => {
            store
                .upsert_document(&ProjectDocument::new(
                    project_id,
                    DocumentType::Assumptions,
                    title,
                    content,
                ))
                .await?;
        }
        WorkspaceAction::UpdateState { project_id, content } => {
            store
                .upsert_document(&ProjectDocument::new(
                    project_id,
                    DocumentType::State,
                    "State",
                    content,
                ))
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use awc_core::types::Project;

    #[tokio::test]
    async fn create_card_action_is_applied() {
        let store = Arc::new(Store::new_in_memory().await.unwrap());
        let project = Project::new("Demo", "demo");
        store.create_project(&project).await.unwrap();
        let queue = Arc::new(WorkQueue::new(store.clone()));

        let text = format!(
            "Sure, I'll add that.\n:::action\n{{\"type\": \"create_card\", \"project_id\": \"{}\", \"title\": \"fix the bug\", \"description\": \"details\"}}\n:::\nDone.",
            project.id
        );

        let applied = apply_actions(&text, &store, &queue).await;
        assert_eq!(applied, 1);
        let cards = store.list_cards_by_project(project.id).await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].title, "fix the bug");
    }

    #[tokio::test]
    async fn malformed_block_is_skipped() {
        let store = Arc::new(Store::new_in_memory().await.unwrap());
        let queue = Arc::new(WorkQueue::new(store.clone()));
        let text = ":::action\nnot json\n:::";
        assert_eq!(apply_actions(text, &store, &queue).await, 0);
    }

    #[tokio::test]
    async fn unknown_action_type_is_skipped() {
        let store = Arc::new(Store::new_in_memory().await.unwrap());
        let queue = Arc::new(WorkQueue::new(store.clone()));
        let text = ":::action\n{\"type\": \"delete_everything\"}\n:::";
        assert_eq!(apply_actions(text, &store, &queue).await, 0);
    }

    #[test]
    fn extract_blocks_handles_multiple_fences() {
        let text = ":::action\n{\"a\":1}\n:::\ntext\n:::action\n{\"b\":2}\n:::";
        let blocks = extract_blocks(text);
        assert_eq!(blocks, vec!["{\"a\":1}", "{\"b\":2}"]);
    }
}
