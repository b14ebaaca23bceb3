//! Confirmation gates
//!
//! Destructive operations require explicit, contemporaneous operator
//! confirmation. The gate is injected so tests supply deterministic
//! answers without interactive input, and `--yes` swaps in the
//! non-interactive gate.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Decides whether a destructive operation may proceed.
///
/// Invoked exactly once per run, after the match count is known and
/// before any mutation.
pub trait ConfirmationGate {
    /// Returns true to proceed, false to abort with zero changes
    fn confirm(&self, operation: &str, records_matched: usize) -> bool;
}

/// Interactive gate: prints the operation summary and accepts only the
/// literal answer `yes`.
pub struct StdinConfirmation;

impl ConfirmationGate for StdinConfirmation {
    fn confirm(&self, operation: &str, records_matched: usize) -> bool {
        eprintln!(
            "About to run '{}' against {} matched record(s).",
            operation, records_matched
        );
        eprint!("Confirm? (yes/no): ");
        let _ = io::stderr().flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }

        answer.trim().eq_ignore_ascii_case("yes")
    }
}

/// Non-interactive gate for `--yes`
pub struct AssumeYes;

impl ConfirmationGate for AssumeYes {
    fn confirm(&self, _operation: &str, _records_matched: usize) -> bool {
        true
    }
}

/// Deterministic gate for tests: answers a fixed value and counts how
/// often it was asked.
pub struct StaticGate {
    answer: bool,
    calls: AtomicUsize,
}

impl StaticGate {
    /// Gate that always answers `answer`
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times the gate was invoked
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ConfirmationGate for StaticGate {
    fn confirm(&self, _operation: &str, _records_matched: usize) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}
