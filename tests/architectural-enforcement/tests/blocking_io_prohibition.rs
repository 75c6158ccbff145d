//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: production code in the client crates MUST NOT block the async
//! runtime on I/O or timers.
//! **Required**: use `reqwest`'s async client, `tokio::time::sleep`,
//! `tokio::net`.

use architectural_enforcement::{production_dirs, scan, SourceLine};

fn report(kind: &str, violations: &[SourceLine]) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n❌ {kind} found in production code:\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!(
        "\nFound {} {kind} violation(s) in production code.\nFix these before merging!",
        violations.len()
    );
}

#[test]
fn test_no_blocking_http_client() {
    let violations: Vec<_> = production_dirs()
        .iter()
        .flat_map(|dir| scan(dir, |line| line.code.contains("reqwest::blocking")))
        .collect();
    report("Blocking HTTP client", &violations);
}

#[test]
fn test_no_thread_sleep() {
    let violations: Vec<_> = production_dirs()
        .iter()
        .flat_map(|dir| scan(dir, |line| line.code.contains("thread::sleep")))
        .collect();
    report("Blocking sleep", &violations);
}

#[test]
fn test_no_blocking_network_io() {
    let violations: Vec<_> = production_dirs()
        .iter()
        .flat_map(|dir| scan(dir, |line| line.code.contains("std::net::")))
        .collect();
    report("Blocking network I/O", &violations);
}
