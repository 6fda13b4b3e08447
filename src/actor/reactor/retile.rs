/// Single-flight bookkeeping for deferred layout passes.
///
/// The timer it arms cannot be cancelled. Requests arriving while one is
/// pending are absorbed, so a burst of notifications costs one pass.
#[derive(Debug, Default)]
pub(crate) struct RetileScheduler {
    pending: bool,
    passes: u64,
}

impl RetileScheduler {
    /// Returns true if the caller has to arm the debounce timer.
    pub fn request(&mut self) -> bool {
        if self.pending {
            return false;
        }
        self.pending = true;
        true
    }

    /// Called when the timer fires. Clears the pending flag before the pass
    /// runs so that changes made during the pass schedule a new one.
    pub fn begin_pass(&mut self) -> u64 {
        self.pending = false;
        self.passes += 1;
        self.passes
    }

    pub fn is_pending(&self) -> bool { self.pending }

    pub fn passes(&self) -> u64 { self.passes }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_requests_coalesce_until_pass() {
        let mut scheduler = RetileScheduler::default();
        assert!(scheduler.request());
        for _ in 0..9 {
            assert!(!scheduler.request());
        }
        assert!(scheduler.is_pending());

        assert_eq!(scheduler.begin_pass(), 1);
        assert!(!scheduler.is_pending());
        assert!(scheduler.request());
        assert_eq!(scheduler.passes(), 1);
    }
}
