//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles
//! on the conversation core's production sources:
//! - No blocking sleeps (timers go through tokio)
//! - No printing (the core logs through `tracing`; surfaces own the terminal)
//! - No `.unwrap()` (errors are propagated or handled)
//!
//! Test modules are exempt. In this workspace they sit at the bottom of each
//! file, so everything after the first `#[cfg(test)]` is skipped.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// A forbidden pattern found in production code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File containing the match
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The pattern that matched
    pub pattern: &'static str,
    /// The offending line, trimmed
    pub text: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: `{}` in: {}",
            self.path.display(),
            self.line,
            self.pattern,
            self.text
        )
    }
}

/// Source directory of the core crate
pub fn core_src_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("conductor")
        .join("core")
        .join("src")
}

/// Every `.rs` file under `dir`
pub fn rust_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|e| e.into_path())
        .collect()
}

/// Production part of a source file: everything before the test module
pub fn production_lines(source: &str) -> impl Iterator<Item = (usize, &str)> {
    source
        .lines()
        .enumerate()
        .take_while(|(_, line)| line.trim() != "#[cfg(test)]")
        .map(|(i, line)| (i + 1, line))
}

fn is_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//")
}

/// Scan one file's contents for `patterns`
pub fn scan_source(path: &Path, source: &str, patterns: &[&'static str]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (line_no, line) in production_lines(source) {
        if is_comment(line) {
            continue;
        }
        for pattern in patterns {
            if line.contains(pattern) {
                violations.push(Violation {
                    path: path.to_path_buf(),
                    line: line_no,
                    pattern,
                    text: line.trim().to_string(),
                });
            }
        }
    }
    violations
}

/// Scan every source file under `dir`
pub fn scan_dir(dir: &Path, patterns: &[&'static str]) -> Vec<Violation> {
    rust_files(dir)
        .iter()
        .flat_map(|path| match fs::read_to_string(path) {
            Ok(source) => scan_source(path, &source, patterns),
            Err(e) => vec![Violation {
                path: path.clone(),
                line: 0,
                pattern: "<unreadable>",
                text: e.to_string(),
            }],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_module_is_skipped() {
        let source = "fn a() { x.unwrap(); }\n#[cfg(test)]\nmod tests { fn b() { y.unwrap(); } }\n";
        let found = scan_source(Path::new("a.rs"), source, &[".unwrap()"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 1);
    }

    #[test]
    fn test_comments_are_skipped() {
        let source = "/// call `.unwrap()` in tests only\nfn a() {}\n";
        assert!(scan_source(Path::new("a.rs"), source, &[".unwrap()"]).is_empty());
    }
}
