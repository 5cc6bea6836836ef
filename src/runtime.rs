//! Process-wide shared runtime state
//!
//! Bare envelopes can be constructed before any [`crate::client::Client`]
//! exists, so the state they share (the message sequence counter and the
//! default property-map capacity) is initialized lazily on first use. The
//! `OnceCell` guard makes concurrent first use from multiple threads safe:
//! exactly one caller initializes, everyone else observes the same handle.

use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Default upper bound on entries in a message property map
pub const DEFAULT_PROP_MAP_CAPACITY: usize = 10;

static RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// Shared state that outlives any single client
#[derive(Debug)]
pub struct Runtime {
    sequence: AtomicU64,
    default_prop_capacity: usize,
}

impl Runtime {
    fn new() -> Self {
        debug!("initializing process-wide fanbus runtime");
        Runtime {
            sequence: AtomicU64::new(0),
            default_prop_capacity: DEFAULT_PROP_MAP_CAPACITY,
        }
    }

    /// Next process-wide message sequence number
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Default capacity applied when a property map is created without a hint
    pub fn default_prop_capacity(&self) -> usize {
        self.default_prop_capacity
    }
}

/// Get the process-wide runtime, initializing it on first use.
///
/// Idempotent and thread-safe; repeated calls return the same instance.
pub fn handle() -> &'static Runtime {
    RUNTIME.get_or_init(Runtime::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_is_idempotent() {
        let a = handle() as *const Runtime;
        let b = handle() as *const Runtime;
        assert_eq!(a, b);
    }

    #[test]
    fn test_sequence_monotonic() {
        let rt = handle();
        let first = rt.next_sequence();
        let second = rt.next_sequence();
        assert!(second > first);
    }

    #[test]
    fn test_concurrent_first_use() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| handle() as *const Runtime as usize))
            .collect();
        let ptrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ptrs.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(handle().default_prop_capacity(), DEFAULT_PROP_MAP_CAPACITY);
    }
}
