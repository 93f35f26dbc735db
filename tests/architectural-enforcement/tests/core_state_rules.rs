//! Integration Test: Core State Rules
//!
//! **Policy**: The core crate has no ambient singletons. All conversation
//! state lives in an explicitly constructed store, and production code
//! propagates errors instead of panicking.

use architectural_enforcement::{assert_no_violations, scan_dirs, Rule};

const CORE: &[&str] = &["chat/core/src"];

#[test]
fn test_no_global_mutable_state_in_core() {
    const RULES: &[Rule] = &[Rule {
        name: "Global mutable state",
        patterns: &[
            "static mut ",
            "lazy_static!",
            "thread_local!",
            "OnceLock<Mutex",
            "OnceLock<RwLock",
        ],
    }];

    let violations = scan_dirs(CORE, RULES, &[]);
    assert_no_violations("Global mutable state in the core crate", &violations);
}

#[test]
fn test_no_panicking_unwrap_in_core() {
    const RULES: &[Rule] = &[Rule {
        name: "Panicking unwrap",
        patterns: &[".unwrap()", ".expect("],
    }];

    let violations = scan_dirs(CORE, RULES, &[]);
    assert_no_violations("unwrap()/expect() in core production code", &violations);
}
