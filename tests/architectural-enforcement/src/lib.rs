//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles
//! of the chat client:
//! - No blocking HTTP or sleeping in production code
//! - No panicking shortcuts (`unwrap`/`expect`) in the core library
//!
//! These tests are designed to catch violations early in the development cycle.
//! The helpers here scan source text only; nothing is compiled or executed.

use std::fs;
use std::path::{Path, PathBuf};

/// Workspace root, resolved from this package's manifest directory
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Production source directories checked by the enforcement tests
#[must_use]
pub fn production_dirs() -> Vec<PathBuf> {
    let root = workspace_root();
    vec![root.join("client/core/src"), root.join("client/cli/src")]
}

/// A line of production code
#[derive(Debug, Clone)]
pub struct SourceLine {
    /// File the line belongs to
    pub path: PathBuf,
    /// 1-based line number
    pub number: usize,
    /// Line text without trailing comment
    pub code: String,
}

impl std::fmt::Display for SourceLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.number, self.code.trim())
    }
}

/// Production lines of a source file
///
/// Comment lines are dropped, trailing `//` comments are cut, and everything
/// from a `#[cfg(test)]` attribute directly followed by `mod` onwards is
/// treated as test code and skipped.
#[must_use]
pub fn production_lines(path: &Path, content: &str) -> Vec<SourceLine> {
    let lines: Vec<&str> = content.lines().collect();
    let mut out = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("#[cfg(test)]")
            && lines
                .get(idx + 1)
                .is_some_and(|next| next.trim_start().starts_with("mod "))
        {
            break;
        }
        if trimmed.starts_with("//") {
            continue;
        }

        let code = line.split(" //").next().unwrap_or(line);
        out.push(SourceLine {
            path: path.to_path_buf(),
            number: idx + 1,
            code: code.to_string(),
        });
    }

    out
}

/// Every production line under `dir` for which `is_violation` is true
#[must_use]
pub fn scan<F>(dir: &Path, is_violation: F) -> Vec<SourceLine>
where
    F: Fn(&SourceLine) -> bool,
{
    let mut violations = Vec::new();
    if !dir.exists() {
        return violations;
    }

    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("rs") {
            continue;
        }
        let Ok(content) = fs::read_to_string(path) else {
            continue;
        };
        violations.extend(
            production_lines(path, &content)
                .into_iter()
                .filter(|line| is_violation(line)),
        );
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_module_is_skipped() {
        let content = "fn real() {}\n#[cfg(test)]\nmod tests {\n    fn t() { x.unwrap(); }\n}\n";
        let lines = production_lines(Path::new("a.rs"), content);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].code, "fn real() {}");
    }

    #[test]
    fn test_cfg_test_item_is_not_a_module() {
        let content = "#[cfg(test)]\npub fn helper() {}\nfn after() {}\n";
        let lines = production_lines(Path::new("a.rs"), content);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_comments_are_dropped() {
        let content = "//! docs .unwrap()\nlet a = 1; // trailing .unwrap()\n";
        let lines = production_lines(Path::new("a.rs"), content);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].code, "let a = 1;");
    }

    #[test]
    fn test_production_dirs_exist() {
        for dir in production_dirs() {
            assert!(dir.exists(), "{} is missing", dir.display());
        }
    }
}
