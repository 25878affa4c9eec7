//! Production-code rules for `cecy-core`

use architectural_enforcement::{core_src_dir, rust_files, scan_dir, Violation};

fn report(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn test_core_sources_found() {
    let files = rust_files(&core_src_dir());
    assert!(
        files.iter().any(|p| p.ends_with("conductor.rs")),
        "core sources not found under {}",
        core_src_dir().display()
    );
}

#[test]
fn test_no_blocking_sleep() {
    let violations = scan_dir(&core_src_dir(), &["std::thread::sleep", "thread::sleep("]);
    assert!(
        violations.is_empty(),
        "Blocking sleeps in production code:\n{}",
        report(&violations)
    );
}

#[test]
fn test_no_printing() {
    let violations = scan_dir(&core_src_dir(), &["println!", "eprintln!", "dbg!"]);
    assert!(
        violations.is_empty(),
        "Printing in production code (use tracing):\n{}",
        report(&violations)
    );
}

#[test]
fn test_no_unwrap() {
    let violations = scan_dir(&core_src_dir(), &[".unwrap()"]);
    assert!(
        violations.is_empty(),
        "unwrap() in production code:\n{}",
        report(&violations)
    );
}
