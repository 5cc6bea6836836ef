//! The fan-out dispatcher
//!
//! One producer thread calls [`FanoutDispatcher::deliver`] once per inbound
//! item; the dispatcher hands an independent clone to every live sink whose
//! selector matches the item's classification. Queue sinks absorb the item
//! without blocking the producer; callback sinks run user code synchronously
//! on the delivering thread, so callbacks must not block.
//!
//! A panicking callback is caught at the dispatch boundary and reported
//! through the fault hook; it never crashes the delivering thread and never
//! stops delivery to the remaining sinks.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace, warn};

use super::queue::{AsyncReceiver, FifoQueue, Receiver};

/// Classification selector a sink registers under.
///
/// `All` observes every item; `Request` and `P2p` observe only the matching
/// message class. The same inbound item may match several sinks of
/// different selectors, each receiving its own clone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    All,
    Request,
    P2p,
}

/// Items a dispatcher can classify against a [`Selector`]
pub trait Classify {
    fn matches(&self, selector: Selector) -> bool;
}

impl Classify for crate::envelope::Message {
    fn matches(&self, selector: Selector) -> bool {
        match selector {
            Selector::All => true,
            Selector::Request => self.is_request(),
            Selector::P2p => self.is_p2p(),
        }
    }
}

impl Classify for crate::envelope::Event {
    fn matches(&self, _selector: Selector) -> bool {
        true
    }
}

type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;
type FaultHook = Arc<dyn Fn(String) + Send + Sync>;

enum SinkKind<T> {
    Queue(Arc<FifoQueue<T>>),
    Callback(Callback<T>),
}

struct SinkEntry<T> {
    id: u64,
    selector: Selector,
    kind: SinkKind<T>,
}

impl<T> Clone for SinkEntry<T> {
    fn clone(&self) -> Self {
        SinkEntry {
            id: self.id,
            selector: self.selector,
            kind: match &self.kind {
                SinkKind::Queue(q) => SinkKind::Queue(q.clone()),
                SinkKind::Callback(f) => SinkKind::Callback(f.clone()),
            },
        }
    }
}

/// Broadcast registry bridging one producer thread to N consumer sinks
pub struct FanoutDispatcher<T> {
    sinks: Mutex<Vec<SinkEntry<T>>>,
    fault_hook: Mutex<Option<FaultHook>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl<T: Classify + Clone> FanoutDispatcher<T> {
    pub fn new() -> Self {
        FanoutDispatcher {
            sinks: Mutex::new(Vec::new()),
            fault_hook: Mutex::new(None),
            next_id: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Install the hook invoked when a callback sink faults during dispatch
    pub fn set_fault_hook(&self, hook: impl Fn(String) + Send + Sync + 'static) {
        *self.fault_hook.lock().expect("fault hook lock poisoned") = Some(Arc::new(hook));
    }

    /// Register a queue sink consumed by a blocking [`Receiver`].
    ///
    /// The receiver starts empty: items delivered before this call are never
    /// retroactively delivered.
    pub fn add_receiver(&self, selector: Selector) -> Receiver<T> {
        let queue = FifoQueue::new();
        // Attach the consumer before the sink becomes visible to `deliver`;
        // a push must never observe a consumerless queue and prune it.
        let receiver = Receiver::new(queue.clone());
        self.register_queue(selector, queue);
        receiver
    }

    /// Register a queue sink consumed by an [`AsyncReceiver`]
    pub fn add_async_receiver(&self, selector: Selector) -> AsyncReceiver<T> {
        let queue = FifoQueue::new();
        let receiver = AsyncReceiver::new(queue.clone());
        self.register_queue(selector, queue);
        receiver
    }

    fn register_queue(&self, selector: Selector, queue: Arc<FifoQueue<T>>) {
        if self.closed.load(Ordering::Acquire) {
            // Receivers obtained after close observe Closed immediately.
            queue.close();
            return;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sinks
            .lock()
            .expect("sink registry lock poisoned")
            .push(SinkEntry {
                id,
                selector,
                kind: SinkKind::Queue(queue),
            });
        debug!(sink_id = id, ?selector, "registered queue sink");
    }

    /// Register a direct callback sink invoked synchronously on the
    /// delivering thread. Callbacks must not block.
    pub fn add_callback(&self, selector: Selector, callback: impl Fn(T) + Send + Sync + 'static) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sinks
            .lock()
            .expect("sink registry lock poisoned")
            .push(SinkEntry {
                id,
                selector,
                kind: SinkKind::Callback(Arc::new(callback)),
            });
        debug!(sink_id = id, ?selector, "registered callback sink");
    }

    /// Broadcast one inbound item to every matching live sink.
    ///
    /// Completes in bounded time regardless of consumer behavior: queue
    /// pushes never block, and callback faults are contained.
    pub fn deliver(&self, item: T) {
        if self.closed.load(Ordering::Acquire) {
            trace!("dispatcher closed, dropping item");
            return;
        }
        // Snapshot the registry so user callbacks never run under the lock.
        let entries: Vec<SinkEntry<T>> = self
            .sinks
            .lock()
            .expect("sink registry lock poisoned")
            .clone();

        let mut dead: Vec<u64> = Vec::new();
        for entry in &entries {
            if !item.matches(entry.selector) {
                continue;
            }
            match &entry.kind {
                SinkKind::Queue(queue) => {
                    if !queue.push(item.clone()) {
                        dead.push(entry.id);
                    }
                }
                SinkKind::Callback(callback) => {
                    let cb = callback.clone();
                    let clone = item.clone();
                    if let Err(panic) = catch_unwind(AssertUnwindSafe(|| cb(clone))) {
                        let info = panic_message(panic);
                        warn!(sink_id = entry.id, info, "callback sink faulted");
                        self.report_fault(format!("callback sink faulted: {info}"));
                    }
                }
            }
        }

        if !dead.is_empty() {
            let mut sinks = self.sinks.lock().expect("sink registry lock poisoned");
            sinks.retain(|entry| !dead.contains(&entry.id));
            debug!(pruned = dead.len(), "pruned dead sinks");
        }
    }

    /// Close every queue sink, unblocking all pending consumers with
    /// `Closed`. Items delivered afterwards are dropped.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let sinks = self.sinks.lock().expect("sink registry lock poisoned");
        for entry in sinks.iter() {
            if let SinkKind::Queue(queue) = &entry.kind {
                queue.close();
            }
        }
        debug!(sinks = sinks.len(), "dispatcher closed");
    }

    /// Number of currently registered sinks
    pub fn sink_count(&self) -> usize {
        self.sinks.lock().expect("sink registry lock poisoned").len()
    }

    fn report_fault(&self, info: String) {
        let hook = self
            .fault_hook
            .lock()
            .expect("fault hook lock poisoned")
            .clone();
        if let Some(hook) = hook {
            hook(info);
        }
    }
}

impl<T: Classify + Clone> Default for FanoutDispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
