use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use awc_core::config::Toggles;
use awc_core::store::Store;
use awc_core::types::{KanbanCard, Project, VerificationStatus};
use awc_core::worktree_manager::WorktreeManager;
use awc_drivers::Synthesizer;
use awc_gates::gate1::StaticCheckCommands;
use awc_queue::WorkQueue;

fn git(dir: &std::path::Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("git must be on PATH for this test");
    assert!(status.success(), "git {args:?} failed");
}

fn init_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    git(dir.path(), &["init", "-q", "-b", "main"]);
    git(dir.path(), &["config", "user.email", "test@example.com"]);
    git(dir.path(), &["config", "user.name", "test"]);
    std::fs::write(dir.path().join("README.md"), "hello\n").unwrap();
    git(dir.path(), &["add", "."]);
    git(dir.path(), &["commit", "-q", "-m", "initial"]);
    dir
}

fn passing_commands() -> StaticCheckCommands {
    StaticCheckCommands {
        typecheck: "true".to_string(),
        lint: "true".to_string(),
        test: "true".to_string(),
    }
}

async fn setup(repo: &std::path::Path) -> (Arc<Store>, Arc<WorkQueue>, Arc<WorktreeManager>, Project) {
    let store = Arc::new(Store::new_in_memory().await.unwrap());
    let project = Project::new("Demo", "demo project");
    store.create_project(&project).await.unwrap();
    let queue = Arc::new(WorkQueue::new(store.clone()));
    let worktrees = Arc::new(WorktreeManager::new(repo, store.clone()));
    (store, queue, worktrees, project)
}

#[tokio::test]
async fn merges_a_branch_verified_card_and_marks_it_merge_verified() {
    let repo = init_repo();
    let (store, queue, worktrees, project) = setup(repo.path()).await;

    let mut card = KanbanCard::new(project.id, "ship the feature", "do the work");
    card = queue.create_card(card).await.unwrap();
    let branch = worktrees.branch_name(&card);

    git(repo.path(), &["checkout", "-q", "-b", &branch]);
    std::fs::write(repo.path().join("feature.txt"), "new feature\n").unwrap();
    git(repo.path(), &["add", "."]);
    git(repo.path(), &["commit", "-q", "-m", "add feature"]);
    git(repo.path(), &["checkout", "-q", "main"]);

    card.verification_status = Some(VerificationStatus::BranchVerified);
    let card = queue.update_card(&card, None).await.unwrap();

    let synthesizer = Synthesizer::new(store.clone(), queue.clone(), worktrees, passing_commands());
    let report = synthesizer
        .run(&Toggles::default(), Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(report.merge_attempts, 1);
    assert_eq!(report.merged, 1);
    assert_eq!(report.conflicts, 0);
    assert_eq!(report.gate2_failures, 0);

    let merged = store.get_card(card.id).await.unwrap().unwrap();
    assert_eq!(merged.verification_status, Some(VerificationStatus::MergeVerified));
}

#[tokio::test]
async fn a_conflicting_branch_is_marked_merge_failed() {
    let repo = init_repo();
    let (store, queue, worktrees, project) = setup(repo.path()).await;

    let mut card = KanbanCard::new(project.id, "conflicted card", "do the work");
    card = queue.create_card(card).await.unwrap();
    let branch = worktrees.branch_name(&card);

    git(repo.path(), &["checkout", "-q", "-b", &branch]);
    std::fs::write(repo.path().join("README.md"), "branch version\n").unwrap();
    git(repo.path(), &["add", "."]);
    git(repo.path(), &["commit", "-q", "-m", "branch edit"]);
    git(repo.path(), &["checkout", "-q", "main"]);
    std::fs::write(repo.path().join("README.md"), "main version\n").unwrap();
    git(repo.path(), &["add", "."]);
    git(repo.path(), &["commit", "-q", "-m", "main edit"]);

    card.verification_status = Some(VerificationStatus::BranchVerified);
    let card = queue.update_card(&card, None).await.unwrap();

    let synthesizer = Synthesizer::new(store.clone(), queue.clone(), worktrees, passing_commands());
    let report = synthesizer
        .run(&Toggles::default(), Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(report.conflicts, 1);
    assert_eq!(report.merged, 0);

    let failed = store.get_card(card.id).await.unwrap().unwrap();
    assert_eq!(failed.verification_status, Some(VerificationStatus::MergeFailed));
    assert!(failed.blocked_reason.is_some());
}

#[tokio::test]
async fn merge_verified_toggle_off_skips_everything() {
    let repo = init_repo();
    let (store, queue, worktrees, project) = setup(repo.path()).await;

    let mut card = KanbanCard::new(project.id, "ship the feature", "do the work");
    card = queue.create_card(card).await.unwrap();
    card.verification_status = Some(VerificationStatus::BranchVerified);
    queue.update_card(&card, None).await.unwrap();

    let synthesizer = Synthesizer::new(store, queue, worktrees, passing_commands());
    let mut toggles = Toggles::default();
    toggles.merge_verified = false;

    let report = synthesizer.run(&toggles, Duration::from_secs(5)).await.unwrap();
    assert_eq!(report.merge_attempts, 0);
}
