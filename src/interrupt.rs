use std::sync::atomic::{AtomicBool, Ordering};

static SHOULD_INTERRUPT: AtomicBool = AtomicBool::new(false);

/// Request a clean stop. Safe to call from a signal handler; the outer
/// search loop polls between iterations and returns the incumbent.
pub fn set() {
    SHOULD_INTERRUPT.store(true, Ordering::Relaxed);
}

pub fn clear() {
    SHOULD_INTERRUPT.store(false, Ordering::Relaxed);
}

pub fn is_set() -> bool {
    SHOULD_INTERRUPT.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_clear() {
        clear();
        assert!(!is_set());
        set();
        assert!(is_set());
        clear();
        assert!(!is_set());
    }
}
