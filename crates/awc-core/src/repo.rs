use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("git command failed: {0}")]
    GitCommand(String),

    #[error("not a git repository: {0}")]
    NotARepo(String),

    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RepoError>;

// ---------------------------------------------------------------------------
// RepoPath — gitui-inspired gitdir/workdir separation
// ---------------------------------------------------------------------------

/// Represents a git repository's two fundamental paths:
/// - `gitdir`: the `.git` directory (or bare repo path)
/// - `workdir`: the working directory (checkout)
///
/// Inspired by gitui's `RepoPath` which cleanly separates these concerns,
/// enabling support for worktrees, bare repos, and submodules where the
/// gitdir and workdir diverge. Each agent worktree gets its own `RepoPath`
/// whose gitdir points back at the project's main `.git` directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoPath {
    gitdir: PathBuf,
    workdir: PathBuf,
}

impl RepoPath {
    /// Create a RepoPath from a working directory, auto-discovering the gitdir.
    pub fn from_workdir(workdir: impl Into<PathBuf>) -> Result<Self> {
        let workdir = workdir.into();
        if !workdir.exists() {
            return Err(RepoError::PathNotFound(workdir.display().to_string()));
        }

        let gitdir = discover_gitdir(&workdir)?;
        Ok(Self { gitdir, workdir })
    }

    /// Create a RepoPath with explicit gitdir and workdir (for worktrees).
    pub fn new(gitdir: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            gitdir: gitdir.into(),
            workdir: workdir.into(),
        }
    }

    /// The `.git` directory path.
    pub fn gitdir(&self) -> &Path {
        &self.gitdir
    }

    /// The working directory path.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Whether this is a worktree (gitdir differs from workdir/.git).
    pub fn is_worktree(&self) -> bool {
        let expected_gitdir = self.workdir.join(".git");
        self.gitdir != expected_gitdir
    }

    /// Whether this is a bare repository (no workdir checkout).
    pub fn is_bare(&self) -> bool {
        self.gitdir == self.workdir
    }
}

impl std::fmt::Display for RepoPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.workdir.display())
    }
}

/// Discover the gitdir for a working directory.
///
/// When the `libgit2` feature is enabled, uses git2's native discovery (no
/// process spawn). Falls back to `git rev-parse --git-dir` otherwise, and
/// whenever the native discovery itself fails.
fn discover_gitdir(workdir: &Path) -> Result<PathBuf> {
    #[cfg(feature = "libgit2")]
    {
        if let Ok(path) = crate::git2_ops::Git2ReadOps::discover_gitdir(workdir) {
            return Ok(path);
        }
    }

    discover_gitdir_shell(workdir)
}

/// Shell-out fallback for gitdir discovery (`git rev-parse --git-dir`).
fn discover_gitdir_shell(workdir: &Path) -> Result<PathBuf> {
    let output = std::process::Command::new("git")
        .args(["rev-parse", "--git-dir"])
        .current_dir(workdir)
        .output()?;

    if !output.status.success() {
        return Err(RepoError::NotARepo(workdir.display().to_string()));
    }

    let gitdir_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let gitdir = Path::new(&gitdir_str);

    if gitdir.is_absolute() {
        Ok(gitdir.to_path_buf())
    } else {
        Ok(workdir.join(gitdir))
    }
}

// ---------------------------------------------------------------------------
// DiffEntry — structured diff output, used by the Gate Pipeline's metrics pass
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffEntry {
    pub path: String,
    pub status: DiffStatus,
    pub additions: u32,
    pub deletions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    Untracked,
}

/// Parse `git diff --numstat` output into a `DiffEntry` list.
pub fn parse_numstat(output: &str) -> Vec<DiffEntry> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() >= 3 {
                let additions = parts[0].parse::<u32>().unwrap_or(0);
                let deletions = parts[1].parse::<u32>().unwrap_or(0);
                let path = parts[2].to_string();
                Some(DiffEntry {
                    path,
                    status: DiffStatus::Modified,
                    additions,
                    deletions,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Parse `git status --porcelain` output into a `DiffEntry` list.
pub fn parse_porcelain_status(output: &str) -> Vec<DiffEntry> {
    output
        .lines()
        .filter_map(|line| {
            if line.len() < 4 {
                return None;
            }
            let status_code = &line[..2];
            let path = line[3..].to_string();

            let status = match status_code.trim() {
                "A" | "A " | " A" => DiffStatus::Added,
                "M" | "M " | " M" | "MM" => DiffStatus::Modified,
                "D" | "D " | " D" => DiffStatus::Deleted,
                "R" | "R " => DiffStatus::Renamed,
                "C" | "C " => DiffStatus::Copied,
                "??" => DiffStatus::Untracked,
                _ => DiffStatus::Modified,
            };

            Some(DiffEntry {
                path,
                status,
                additions: 0,
                deletions: 0,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_path_new() {
        let rp = RepoPath::new("/repo/.git", "/repo");
        assert_eq!(rp.gitdir(), Path::new("/repo/.git"));
        assert_eq!(rp.workdir(), Path::new("/repo"));
        assert!(!rp.is_worktree());
        assert!(!rp.is_bare());
    }

    #[test]
    fn repo_path_worktree_detection() {
        let rp = RepoPath::new("/repo/.git/worktrees/feat", "/repo/.worktrees/feat");
        assert!(rp.is_worktree());
        assert!(!rp.is_bare());
    }

    #[test]
    fn repo_path_bare_detection() {
        let rp = RepoPath::new("/repo.git", "/repo.git");
        assert!(rp.is_bare());
    }

    #[test]
    fn repo_path_display() {
        let rp = RepoPath::new("/repo/.git", "/repo");
        assert_eq!(rp.to_string(), "/repo");
    }

    #[test]
    fn repo_path_serialize() {
        let rp = RepoPath::new("/repo/.git", "/repo");
        let json = serde_json::to_string(&rp).unwrap();
        let back: RepoPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rp);
    }

    #[test]
    fn parse_numstat_output() {
        let output = "10\t2\tsrc/main.rs\n5\t0\tsrc/lib.rs\n";
        let entries = parse_numstat(output);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "src/main.rs");
        assert_eq!(entries[0].additions, 10);
        assert_eq!(entries[0].deletions, 2);
        assert_eq!(entries[1].path, "src/lib.rs");
        assert_eq!(entries[1].additions, 5);
    }

    #[test]
    fn parse_numstat_empty() {
        assert!(parse_numstat("").is_empty());
        assert!(parse_numstat("\n").is_empty());
    }

    #[test]
    fn parse_porcelain_status_output() {
        let output = " M src/main.rs\nA  src/new.rs\n?? untracked.txt\n D  deleted.rs\n";
        let entries = parse_porcelain_status(output);
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].status, DiffStatus::Modified);
        assert_eq!(entries[0].path, "src/main.rs");
        assert_eq!(entries[1].status, DiffStatus::Added);
        assert_eq!(entries[2].status, DiffStatus::Untracked);
        assert_eq!(entries[3].status, DiffStatus::Deleted);
    }

    #[test]
    fn parse_porcelain_status_empty() {
        assert!(parse_porcelain_status("").is_empty());
    }

    #[test]
    fn diff_status_serialize() {
        let json = serde_json::to_string(&DiffStatus::Added).unwrap();
        assert_eq!(json, "\"added\"");
        let back: DiffStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DiffStatus::Added);
    }

    #[test]
    fn repo_path_hash() {
        use std::collections::HashSet;
        let rp1 = RepoPath::new("/a/.git", "/a");
        let rp2 = RepoPath::new("/b/.git", "/b");
        let rp3 = RepoPath::new("/a/.git", "/a");
        let mut set = HashSet::new();
        set.insert(rp1);
        set.insert(rp2);
        set.insert(rp3);
        assert_eq!(set.len(), 2);
    }
}
