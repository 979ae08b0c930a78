use thiserror::Error;

/// Errors that can occur when performing read-only git operations.
///
/// These errors are returned by implementations of [`GitReadAdapter`] and
/// cover both low-level I/O failures and git-specific command errors.
#[derive(Debug, Error)]
pub enum GitReadError {
    /// A git command returned a non-zero exit code.
    ///
    /// This typically occurs when:
    /// - The repository path is invalid or not a git repository
    /// - The requested branch or ref doesn't exist
    /// - Git binary is not installed or not in PATH
    /// - Git command encountered an error (stderr is captured in the message)
    #[error("git command failed: {0}")]
    Command(String),

    /// Failed to read from or write to the filesystem during git operations.
    ///
    /// This typically occurs when:
    /// - Repository directory is inaccessible
    /// - Insufficient file permissions
    /// - Disk I/O errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Git command output contained invalid UTF-8.
    ///
    /// This is rare but can occur if:
    /// - File paths in the repository use non-UTF-8 encoding
    /// - Git binary produces unexpected output
    #[error("utf8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Read-only git operations used by orchestration/UI status flows.
///
/// This is intentionally narrow and excludes write operations (merge/rebase/push).
/// Write-paths remain on the existing shell-based runner until parity testing is done.
pub trait GitReadAdapter: Send + Sync {
    fn current_branch(&self, repo_dir: &str) -> Result<String, GitReadError>;
    fn status_porcelain(&self, repo_dir: &str) -> Result<Vec<String>, GitReadError>;
    fn diff_stat(&self, repo_dir: &str, base: &str, head: &str) -> Result<String, GitReadError>;
    fn conflict_files(&self, repo_dir: &str) -> Result<Vec<String>, GitReadError>;
}

/// Shell-based read adapter. This is the baseline behavior for migration.
pub struct ShellGitReadAdapter;

impl ShellGitReadAdapter {
    fn run_git(repo_dir: &str, args: &[&str]) -> Result<String, GitReadError> {
        let output = std::process::Command::new("git")
            .current_dir(repo_dir)
            .args(args)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8(output.stderr)
                .unwrap_or_else(|_| "git returned non-utf8 stderr".to_string());
            return Err(GitReadError::Command(stderr.trim().to_string()));
        }

        let stdout = String::from_utf8(output.stdout)?;
        Ok(stdout.trim().to_string())
    }
}

impl GitReadAdapter for ShellGitReadAdapter {
    fn current_branch(&self, repo_dir: &str) -> Result<String, GitReadError> {
        Self::run_git(repo_dir, &["rev-parse", "--abbrev-ref", "HEAD"])
    }

    fn status_porcelain(&self, repo_dir: &str) -> Result<Vec<String>, GitReadError> {
        let out = Self::run_git(repo_dir, &["status", "--porcelain"])?;
        let lines = out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(ToOwned::to_owned)
            .collect::<Vec<_>>();
        Ok(lines)
    }

    fn diff_stat(&self, repo_dir: &str, base: &str, head: &str) -> Result<String, GitReadError> {
        Self::run_git(repo_dir, &["diff", "--stat", base, head])
    }

    fn conflict_files(&self, repo_dir: &str) -> Result<Vec<String>, GitReadError> {
        let out = Self::run_git(repo_dir, &["diff", "--name-only", "--diff-filter=U"])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(ToOwned::to_owned)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// git2-based read adapter (feature-gated)
// ---------------------------------------------------------------------------

/// Native libgit2 read adapter — no process spawn per query, useful on the
/// hot path (preflight checks, diff summaries feeding gate output). Implements
/// the same trait as [`ShellGitReadAdapter`] via in-process calls to
/// [`crate::git2_ops::Git2ReadOps`].
#[cfg(feature = "libgit2")]
pub struct Git2ReadAdapter;

#[cfg(feature = "libgit2")]
impl GitReadAdapter for Git2ReadAdapter {
    fn current_branch(&self, repo_dir: &str) -> Result<String, GitReadError> {
        crate::git2_ops::Git2ReadOps::current_branch(std::path::Path::new(repo_dir))
            .map_err(|e| GitReadError::Command(e.to_string()))
    }

    fn status_porcelain(&self, repo_dir: &str) -> Result<Vec<String>, GitReadError> {
        let entries = crate::git2_ops::Git2ReadOps::status(std::path::Path::new(repo_dir))
            .map_err(|e| GitReadError::Command(e.to_string()))?;

        let lines = entries
            .iter()
            .map(|e| {
                let prefix = match e.status {
                    crate::repo::DiffStatus::Modified => "M ",
                    crate::repo::DiffStatus::Added => "A ",
                    crate::repo::DiffStatus::Deleted => "D ",
                    crate::repo::DiffStatus::Renamed => "R ",
                    crate::repo::DiffStatus::Copied => "C ",
                    crate::repo::DiffStatus::Untracked => "??",
                };
                format!("{} {}", prefix, e.path)
            })
            .collect();

        Ok(lines)
    }

    fn diff_stat(&self, repo_dir: &str, base: &str, head: &str) -> Result<String, GitReadError> {
        let entries =
            crate::git2_ops::Git2ReadOps::diff_stat_refs(std::path::Path::new(repo_dir), base, head)
                .map_err(|e| GitReadError::Command(e.to_string()))?;

        if entries.is_empty() {
            return Ok(String::new());
        }

        let mut lines = Vec::with_capacity(entries.len() + 1);
        let mut total_adds = 0u32;
        let mut total_dels = 0u32;

        for entry in &entries {
            let changes = entry.additions + entry.deletions;
            let plus = "+".repeat(entry.additions as usize);
            let minus = "-".repeat(entry.deletions as usize);
            lines.push(format!(" {} | {} {}{}", entry.path, changes, plus, minus));
            total_adds += entry.additions;
            total_dels += entry.deletions;
        }

        lines.push(format!(
            " {} files changed, {} insertions(+), {} deletions(-)",
            entries.len(),
            total_adds,
            total_dels,
        ));

        Ok(lines.join("\n"))
    }

    fn conflict_files(&self, repo_dir: &str) -> Result<Vec<String>, GitReadError> {
        let repo = git2::Repository::discover(repo_dir)
            .map_err(|e| GitReadError::Command(e.message().to_string()))?;

        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(false)
            .recurse_untracked_dirs(false)
            .include_ignored(false);

        let statuses = repo
            .statuses(Some(&mut opts))
            .map_err(|e| GitReadError::Command(e.message().to_string()))?;

        Ok(statuses
            .iter()
            .filter(|s| s.status().contains(git2::Status::CONFLICTED))
            .filter_map(|s| s.path().map(ToOwned::to_owned))
            .collect())
    }
}

/// The read adapter used across the core.
///
/// Returns [`Git2ReadAdapter`] when the `libgit2` feature is enabled
/// (the default), otherwise falls back to [`ShellGitReadAdapter`]. Preflight
/// checks, conflict detection and diff summaries for gate output all go
/// through this single entry point so callers don't construct either
/// adapter directly.
pub fn default_read_adapter() -> Box<dyn GitReadAdapter> {
    #[cfg(feature = "libgit2")]
    {
        Box::new(Git2ReadAdapter)
    }
    #[cfg(not(feature = "libgit2"))]
    {
        Box::new(ShellGitReadAdapter)
    }
}
