//! Architectural Enforcement Helpers
//!
//! Source scanning shared by the integration tests in `tests/`. The tests
//! enforce the architectural rules of the weather chat workspace:
//! - No blocking I/O in production code that runs on the tokio runtime
//! - No ambient global mutable state in the core crate
//! - No `unwrap()` / `expect()` in production code of the core crate
//!
//! Only production code is scanned: everything from a file's
//! `#[cfg(test)]` module onwards is ignored.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["chat/core/src", "chat/cli/src"];

/// A forbidden pattern found in a source file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// File containing the pattern
    pub path: PathBuf,
    /// 1-based line number
    pub line_number: usize,
    /// The rule that was broken
    pub rule: &'static str,
    /// The offending line, trimmed
    pub line: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} - {}: {}",
            self.path.display(),
            self.line_number,
            self.rule,
            self.line
        )
    }
}

/// A named set of forbidden substrings
#[derive(Clone, Copy, Debug)]
pub struct Rule {
    /// Name printed in violation reports
    pub name: &'static str,
    /// Substrings that break the rule
    pub patterns: &'static [&'static str],
}

/// Workspace root (two levels above this package)
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// All `.rs` files under `dir`, sorted
#[must_use]
pub fn rust_sources(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();
    files
}

/// Lines of production code: stops at the first `#[cfg(test)]`
#[must_use]
pub fn production_lines(content: &str) -> Vec<(usize, &str)> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| line.trim() != "#[cfg(test)]")
        .map(|(idx, line)| (idx + 1, line))
        .collect()
}

/// Code part of a line, without a trailing `//` comment or doc comment
#[must_use]
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Scan `content` for `rules`, reporting against `path`
#[must_use]
pub fn scan_source(path: &Path, content: &str, rules: &[Rule]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (line_number, line) in production_lines(content) {
        let code = code_part(line);
        for rule in rules {
            if rule.patterns.iter().any(|p| code.contains(p)) {
                violations.push(Violation {
                    path: path.to_path_buf(),
                    line_number,
                    rule: rule.name,
                    line: line.trim().to_string(),
                });
            }
        }
    }
    violations
}

/// Scan every source file under the given workspace-relative directories,
/// skipping files whose workspace-relative path is in `exempt`
#[must_use]
pub fn scan_dirs(dirs: &[&str], rules: &[Rule], exempt: &[&str]) -> Vec<Violation> {
    let root = workspace_root();
    let mut violations = Vec::new();

    for dir in dirs {
        for path in rust_sources(&root.join(dir)) {
            let relative = path
                .strip_prefix(&root)
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            if exempt.contains(&relative.as_str()) {
                continue;
            }
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            violations.extend(scan_source(&path, &content, rules));
        }
    }
    violations
}

/// Panic with a readable report if `violations` is non-empty
pub fn assert_no_violations(title: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n{title}");
    for violation in violations {
        eprintln!("  {violation}");
    }
    panic!(
        "\nFound {} violation(s) of: {title}\nFix these before merging!",
        violations.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULE: Rule = Rule {
        name: "Blocking file I/O",
        patterns: &["std::fs::"],
    };

    #[test]
    fn test_test_modules_are_skipped() {
        let source = "fn a() {}\nfn b() { std::fs::read(\"x\"); }\n#[cfg(test)]\nmod tests { fn c() { std::fs::read(\"y\"); } }\n";
        let violations = scan_source(Path::new("x.rs"), source, &[RULE]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line_number, 2);
    }

    #[test]
    fn test_comments_are_ignored() {
        let source = "// std::fs::read is forbidden\nlet x = 1; // see std::fs::write\n";
        assert!(scan_source(Path::new("x.rs"), source, &[RULE]).is_empty());
    }

    #[test]
    fn test_workspace_root_contains_core() {
        assert!(workspace_root().join("chat/core/Cargo.toml").exists());
    }
}
