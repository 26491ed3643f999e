//! Re-entrancy guard for analysis calls

use std::sync::atomic::{AtomicBool, Ordering};

/// Single busy flag shared by problem and photo analysis
///
/// A second caller is refused while a token is alive; nothing is queued.
#[derive(Debug, Default)]
pub struct AnalysisGuard {
    busy: AtomicBool,
}

/// Held for the duration of one analysis; clears the flag on drop
#[derive(Debug)]
pub struct BusyToken<'a> {
    flag: &'a AtomicBool,
}

impl AnalysisGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the flag, or `None` if an analysis is already running
    pub fn try_acquire(&self) -> Option<BusyToken<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyToken { flag: &self.busy })
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

impl Drop for BusyToken<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let guard = AnalysisGuard::new();
        let token = guard.try_acquire();
        assert!(token.is_some());
        assert!(guard.is_busy());
        assert!(guard.try_acquire().is_none());

        drop(token);
        assert!(!guard.is_busy());
        assert!(guard.try_acquire().is_some());
    }
}
