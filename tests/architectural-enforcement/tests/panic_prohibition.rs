//! Integration Test: Panic Prohibition
//!
//! **Policy**: the core library propagates errors with `?` and typed error
//! enums. Production code MUST NOT call `.unwrap()` or `.expect(..)`.
//! Test modules are exempt.

use architectural_enforcement::{production_dirs, scan};

#[test]
fn test_no_unwrap_or_expect_in_production_code() {
    let violations: Vec<_> = production_dirs()
        .iter()
        .flat_map(|dir| {
            scan(dir, |line| {
                line.code.contains(".unwrap()") || line.code.contains(".expect(")
            })
        })
        .collect();

    if !violations.is_empty() {
        eprintln!("\n❌ Panicking shortcuts found in production code:\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ Use `?` with the module's error type, or an explicit fallback.");
        panic!("Found {} unwrap/expect call(s)", violations.len());
    }
}
