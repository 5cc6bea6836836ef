//! One FIFO store per sink, two pull adapters
//!
//! The dispatcher pushes into a [`FifoQueue`] without ever blocking; the
//! queue grows instead. Consumers drain it either by parking the calling OS
//! thread ([`Receiver`]) or by suspending the calling task
//! ([`AsyncReceiver`]). Both adapters share the same store, so dispatch
//! logic exists once.
//!
//! `len()` is read under the same lock that guards the contents, so a
//! length observation is never torn against a concurrent pull.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use tokio::sync::Notify;

use crate::error::{RecvError, TryRecvError};

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Shared FIFO between the dispatcher (producer side) and one receiver
/// handle (consumer side).
pub(crate) struct FifoQueue<T> {
    inner: Mutex<Inner<T>>,
    condvar: Condvar,
    notify: Notify,
    consumers: AtomicUsize,
}

impl<T> FifoQueue<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(FifoQueue {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                closed: false,
            }),
            condvar: Condvar::new(),
            notify: Notify::new(),
            consumers: AtomicUsize::new(0),
        })
    }

    /// Enqueue an item. Never blocks. Returns `false` when the queue is
    /// closed or its consumer handle is gone, signalling the dispatcher to
    /// prune this sink.
    pub(crate) fn push(&self, item: T) -> bool {
        if self.consumers.load(Ordering::Acquire) == 0 {
            return false;
        }
        {
            let mut inner = self.inner.lock().expect("queue lock poisoned");
            if inner.closed {
                return false;
            }
            inner.items.push_back(item);
        }
        self.condvar.notify_one();
        self.notify.notify_one();
        true
    }

    /// Close the queue and wake every blocked or suspended consumer
    pub(crate) fn close(&self) {
        {
            let mut inner = self.inner.lock().expect("queue lock poisoned");
            inner.closed = true;
        }
        self.condvar.notify_all();
        self.notify.notify_waiters();
    }

    fn len(&self) -> usize {
        self.inner.lock().expect("queue lock poisoned").items.len()
    }

    fn pop_blocking(&self) -> Result<T, RecvError> {
        let mut inner = self.inner.lock().expect("queue lock poisoned");
        loop {
            if let Some(item) = inner.items.pop_front() {
                return Ok(item);
            }
            if inner.closed {
                return Err(RecvError::Closed);
            }
            inner = self.condvar.wait(inner).expect("queue lock poisoned");
        }
    }

    fn try_pop(&self) -> Result<T, TryRecvError> {
        let mut inner = self.inner.lock().expect("queue lock poisoned");
        match inner.items.pop_front() {
            Some(item) => Ok(item),
            None if inner.closed => Err(TryRecvError::Closed),
            None => Err(TryRecvError::Empty),
        }
    }

    async fn pop_async(&self) -> Result<T, RecvError> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Arm the waiter before inspecting the queue so a push landing
            // between the check and the await is not lost.
            notified.as_mut().enable();
            {
                let mut inner = self.inner.lock().expect("queue lock poisoned");
                if let Some(item) = inner.items.pop_front() {
                    return Ok(item);
                }
                if inner.closed {
                    return Err(RecvError::Closed);
                }
            }
            notified.await;
        }
    }

    fn consumer_attached(&self) {
        self.consumers.fetch_add(1, Ordering::AcqRel);
    }

    fn consumer_dropped(&self) {
        if self.consumers.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Last handle gone: close so the dispatcher prunes this sink.
            self.close();
        }
    }
}

/// Blocking pull adapter over one dispatcher-fed queue.
///
/// Dropping the receiver deregisters its sink; the dispatcher stops
/// delivering to it.
pub struct Receiver<T> {
    queue: Arc<FifoQueue<T>>,
}

impl<T> Receiver<T> {
    pub(crate) fn new(queue: Arc<FifoQueue<T>>) -> Self {
        queue.consumer_attached();
        Receiver { queue }
    }

    /// Current queue depth without consuming
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block the calling thread until an item arrives or the feeding
    /// dispatcher closes
    pub fn recv(&self) -> Result<T, RecvError> {
        self.queue.pop_blocking()
    }

    /// Pull without blocking
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.queue.try_pop()
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        self.queue.consumer_dropped();
    }
}

/// Cooperative pull adapter over one dispatcher-fed queue.
///
/// `recv` suspends only the calling task; the wake is issued by the
/// dispatcher when an item lands or the queue closes.
pub struct AsyncReceiver<T> {
    queue: Arc<FifoQueue<T>>,
}

impl<T> AsyncReceiver<T> {
    pub(crate) fn new(queue: Arc<FifoQueue<T>>) -> Self {
        queue.consumer_attached();
        AsyncReceiver { queue }
    }

    /// Current queue depth without consuming
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Suspend the calling task until an item arrives or the feeding
    /// dispatcher closes
    pub async fn recv(&self) -> Result<T, RecvError> {
        self.queue.pop_async().await
    }

    /// Pull without suspending
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.queue.try_pop()
    }
}

impl<T> Drop for AsyncReceiver<T> {
    fn drop(&mut self) {
        self.queue.consumer_dropped();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fresh_receiver_is_empty() {
        let queue = FifoQueue::<i32>::new();
        let rx = Receiver::new(queue);
        assert_eq!(rx.len(), 0);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_push_then_recv_fifo_order() {
        let queue = FifoQueue::new();
        let rx = Receiver::new(queue.clone());
        assert!(queue.push(1));
        assert!(queue.push(2));
        assert!(queue.push(3));
        assert_eq!(rx.len(), 3);
        assert_eq!(rx.recv().unwrap(), 1);
        assert_eq!(rx.recv().unwrap(), 2);
        assert_eq!(rx.recv().unwrap(), 3);
        assert_eq!(rx.len(), 0);
    }

    #[test]
    fn test_try_recv_empty_and_closed() {
        let queue = FifoQueue::<i32>::new();
        let rx = Receiver::new(queue.clone());
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        queue.close();
        assert_eq!(rx.try_recv(), Err(TryRecvError::Closed));
    }

    #[test]
    fn test_blocking_recv_wakes_on_push() {
        let queue = FifoQueue::new();
        let rx = Receiver::new(queue.clone());
        let producer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            queue.push(99)
        });
        assert_eq!(rx.recv().unwrap(), 99);
        assert!(producer.join().unwrap());
    }

    #[test]
    fn test_blocking_recv_unblocks_on_close() {
        let queue = FifoQueue::<i32>::new();
        let rx = Receiver::new(queue.clone());
        let closer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            queue.close();
        });
        assert_eq!(rx.recv(), Err(RecvError::Closed));
        closer.join().unwrap();
    }

    #[test]
    fn test_drained_items_still_delivered_after_close() {
        let queue = FifoQueue::new();
        let rx = Receiver::new(queue.clone());
        queue.push(7);
        queue.close();
        assert_eq!(rx.recv().unwrap(), 7);
        assert_eq!(rx.recv(), Err(RecvError::Closed));
    }

    #[test]
    fn test_push_after_last_consumer_dropped_fails() {
        let queue = FifoQueue::new();
        let rx = Receiver::new(queue.clone());
        assert!(queue.push(1));
        drop(rx);
        assert!(!queue.push(2));
    }

    #[tokio::test]
    async fn test_async_recv_wakes_on_push() {
        let queue = FifoQueue::new();
        let rx = AsyncReceiver::new(queue.clone());
        let producer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            queue.push(42)
        });
        assert_eq!(rx.recv().await.unwrap(), 42);
        assert!(producer.await.unwrap());
    }

    #[tokio::test]
    async fn test_async_recv_unblocks_on_close() {
        let queue = FifoQueue::<i32>::new();
        let rx = AsyncReceiver::new(queue.clone());
        let closer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            queue.close();
        });
        assert_eq!(rx.recv().await, Err(RecvError::Closed));
        closer.await.unwrap();
    }

    #[tokio::test]
    async fn test_async_recv_sees_already_queued_item() {
        let queue = FifoQueue::new();
        let rx = AsyncReceiver::new(queue.clone());
        queue.push("hello");
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }
}
