//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Production code running on the tokio runtime MUST NOT use
//! blocking I/O. Use `tokio::fs`, `tokio::net` and `tokio::io`.
//!
//! Configuration loading is exempt: it runs once, before the first send.

use architectural_enforcement::{assert_no_violations, scan_dirs, Rule, PRODUCTION_DIRS};

/// Files allowed to do blocking I/O
const EXEMPT: &[&str] = &["chat/core/src/config/mod.rs"];

const RULES: &[Rule] = &[
    Rule {
        name: "Blocking file I/O",
        patterns: &["std::fs::", "use std::fs"],
    },
    Rule {
        name: "Blocking network I/O",
        patterns: &["std::net::", "use std::net"],
    },
    Rule {
        name: "Blocking HTTP client",
        patterns: &["reqwest::blocking"],
    },
    Rule {
        name: "Blocking stdin",
        patterns: &["std::io::stdin()"],
    },
    Rule {
        name: "Blocking sleep",
        patterns: &["std::thread::sleep", "thread::sleep("],
    },
];

#[test]
fn test_no_blocking_io_in_production_code() {
    let violations = scan_dirs(PRODUCTION_DIRS, RULES, EXEMPT);
    assert_no_violations("Blocking I/O in production code", &violations);
}
