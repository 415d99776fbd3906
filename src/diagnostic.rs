//! Bounded diagnostic dumps
//!
//! When an update is rejected or a sequence fails verification, the one-line
//! error is always logged. The multi-line audit dump that accompanies it (every
//! tracker update applied so far) is only written while the process-wide
//! budget lasts, so a badly-formed population cannot flood the log.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::FerroError;
use crate::mutate::tracker::SequenceVariantUpdate;

/// Number of audit dumps written per process.
pub const MAX_DIAGNOSTIC_DUMPS: usize = 10;

static GLOBAL_BUDGET: DiagnosticBudget = DiagnosticBudget::new(MAX_DIAGNOSTIC_DUMPS);

/// A counter that hands out a fixed number of dump slots.
#[derive(Debug)]
pub struct DiagnosticBudget {
    limit: usize,
    used: AtomicUsize,
}

impl DiagnosticBudget {
    pub const fn new(limit: usize) -> Self {
        Self {
            limit,
            used: AtomicUsize::new(0),
        }
    }

    /// Take one slot, returning false once the budget is spent.
    pub fn try_acquire(&self) -> bool {
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.limit).then_some(used + 1)
            })
            .is_ok()
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.used.load(Ordering::Acquire))
    }
}

/// Take a slot from the process-wide budget.
pub fn acquire_dump_slot() -> bool {
    GLOBAL_BUDGET.try_acquire()
}

/// Render tracker updates as an indented audit table.
pub fn audit_dump<'a>(
    context: &str,
    updates: impl IntoIterator<Item = &'a SequenceVariantUpdate>,
) -> String {
    let mut out = format!("audit dump for {}", context);
    for (i, update) in updates.into_iter().enumerate() {
        let _ = write!(out, "\n  #{:<3} {}", i, update);
    }
    out
}

/// Log an error, followed by an audit dump if the budget allows.
///
/// The dump is only rendered when a slot is available.
pub fn report<F>(context: &str, error: &FerroError, dump: F)
where
    F: FnOnce() -> String,
{
    log::error!("{}: {}", context, error.detailed_message());
    if acquire_dump_slot() {
        log::error!("{}", dump());
    } else {
        log::debug!("diagnostic budget exhausted, skipping audit dump for {}", context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_caps_acquisitions() {
        let budget = DiagnosticBudget::new(3);
        assert!(budget.try_acquire());
        assert!(budget.try_acquire());
        assert_eq!(budget.remaining(), 1);
        assert!(budget.try_acquire());
        assert!(!budget.try_acquire());
        assert!(!budget.try_acquire());
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn test_budget_across_threads() {
        let budget = DiagnosticBudget::new(10);
        let granted = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..5 {
                        if budget.try_acquire() {
                            granted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });
        assert_eq!(granted.load(Ordering::Relaxed), 10);
    }

    #[test]
    fn test_audit_dump_empty() {
        let dump = audit_dump("chr1 [0, 8)", std::iter::empty());
        assert_eq!(dump, "audit dump for chr1 [0, 8)");
    }
}
