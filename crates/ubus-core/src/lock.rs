//! Host execution lock
//!
//! A scripting host typically holds a global lock while running script
//! code. The blocking invoke drops it so other host threads keep running,
//! and takes it back on every exit path.

/// Lock the host holds while executing script code
pub trait ExecutionLock: Send + Sync {
    fn release(&self);
    fn acquire(&self);
}

/// For hosts without a global lock
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLock;

impl ExecutionLock for NoLock {
    fn release(&self) {}
    fn acquire(&self) {}
}

/// Releases the lock on creation and reacquires it when dropped
#[must_use = "the lock is reacquired as soon as the guard is dropped"]
pub struct Unlocked<'a> {
    lock: &'a dyn ExecutionLock,
}

impl<'a> Unlocked<'a> {
    pub fn new(lock: &'a dyn ExecutionLock) -> Self {
        lock.release();
        Self { lock }
    }
}

impl Drop for Unlocked<'_> {
    fn drop(&mut self) {
        self.lock.acquire();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct Flag {
        held: AtomicBool,
    }

    impl ExecutionLock for Flag {
        fn release(&self) {
            self.held.store(false, Ordering::SeqCst);
        }

        fn acquire(&self) {
            self.held.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn guard_releases_then_reacquires() {
        let lock = Flag::default();
        lock.acquire();

        {
            let _unlocked = Unlocked::new(&lock);
            assert!(!lock.held.load(Ordering::SeqCst));
        }

        assert!(lock.held.load(Ordering::SeqCst));
    }

    #[test]
    fn guard_reacquires_during_unwind() {
        let lock = Flag::default();
        lock.acquire();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _unlocked = Unlocked::new(&lock);
            panic!("bus library blew up");
        }));

        assert!(result.is_err());
        assert!(lock.held.load(Ordering::SeqCst));
    }
}
