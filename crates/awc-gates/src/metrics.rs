//! Codebase metric harvesting, run between gates to seed campaign
//! baselines and compute report deltas.

use std::path::Path;

use walkdir::WalkDir;

use crate::types::{CodebaseMetrics, CommandOutput};

const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "rs", "py", "go"];
const EXCLUDED_DIRS: &[&str] = &["node_modules", "target", ".git", "dist", "build", ".worktrees"];

/// Counts ESLint-style `problem` lines in plain-text lint output as a
/// fallback when the lint command wasn't run with a structured reporter.
/// Looks for trailing ` error` / ` warning` severity markers, the shape
/// ESLint's default stylish formatter emits per line.
pub fn count_lint_problems(lint_output: &CommandOutput) -> (u32, u32) {
    let mut warnings = 0u32;
    let mut errors = 0u32;
    for line in lint_output.stdout.lines() {
        if line.contains("error") {
            errors += 1;
        } else if line.contains("warning") {
            warnings += 1;
        }
    }
    (warnings, errors)
}

fn is_excluded(entry: &walkdir::DirEntry) -> bool {
    entry
        .path()
        .components()
        .any(|c| EXCLUDED_DIRS.contains(&c.as_os_str().to_string_lossy().as_ref()))
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

fn is_test_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.contains(".test.")
        || name.contains(".spec.")
        || path.components().any(|c| {
            matches!(c.as_os_str().to_str(), Some("tests") | Some("__tests__"))
        })
}

fn count_any_escapes_in(content: &str) -> u32 {
    content.matches(": any").count() as u32 + content.matches("as any").count() as u32
}

/// Walks `source_root`, counting source/test files and `any`-type escapes.
/// Lint counts come from [`count_lint_problems`] on the already-captured
/// Gate 1/2 lint output — this function never re-runs the linter.
pub fn harvest(source_root: &Path, lint_output: &CommandOutput) -> CodebaseMetrics {
    let (lint_warning_count, lint_error_count) = count_lint_problems(lint_output);
    let mut any_type_escapes = 0u32;
    let mut test_file_count = 0u32;
    let mut source_file_count = 0u32;

    for entry in WalkDir::new(source_root)
        .into_iter()
        .filter_entry(|e| !is_excluded(e))
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() || !is_source_file(entry.path()) {
            continue;
        }
        source_file_count += 1;
        if is_test_file(entry.path()) {
            test_file_count += 1;
        }
        if let Ok(content) = std::fs::read_to_string(entry.path()) {
            any_type_escapes += count_any_escapes_in(&content);
        }
    }

    CodebaseMetrics {
        lint_warning_count,
        lint_error_count,
        any_type_escapes,
        test_file_count,
        source_file_count,
    }
}
