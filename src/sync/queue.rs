//! Bounded drop-oldest queue
//!
//! Cross-context handoff of discrete events (edge timestamps, commands).
//! The producer side never blocks: when the ring is full the oldest unread
//! entry is overwritten, so `put` is safe to call from an interrupt handler.
//! The consumer side is an async `get` that parks the task until an entry is
//! available.

use core::cell::RefCell;
use core::future::{poll_fn, Future};
use core::task::Poll;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::WakerRegistration;
use heapless::Deque;

struct QueueState<T, const N: usize> {
    ring: Deque<T, N>,
    receiver: WakerRegistration,
    overwritten: u32,
}

/// Fixed-capacity FIFO with a drop-oldest overflow policy
///
/// `N` is the capacity and must be non-zero.
pub struct DropOldestQueue<M: RawMutex, T, const N: usize> {
    inner: Mutex<M, RefCell<QueueState<T, N>>>,
}

impl<M: RawMutex, T, const N: usize> DropOldestQueue<M, T, N> {
    /// Create an empty queue
    pub const fn new() -> Self {
        assert!(N > 0, "queue capacity must be non-zero");
        Self {
            inner: Mutex::new(RefCell::new(QueueState {
                ring: Deque::new(),
                receiver: WakerRegistration::new(),
                overwritten: 0,
            })),
        }
    }

    /// Append a value without blocking
    ///
    /// If the queue is full the oldest unread entry is discarded first.
    pub fn put(&self, value: T) {
        self.inner.lock(|state| {
            let mut state = state.borrow_mut();
            if state.ring.is_full() {
                state.ring.pop_front();
                state.overwritten = state.overwritten.wrapping_add(1);
            }
            // Room was made above, so this cannot be rejected.
            let _ = state.ring.push_back(value);
            state.receiver.wake();
        })
    }

    /// Take the oldest entry if there is one
    pub fn try_get(&self) -> Option<T> {
        self.inner.lock(|state| state.borrow_mut().ring.pop_front())
    }

    /// Wait for the oldest entry
    ///
    /// Intended for a single consumer task; a second concurrent waiter would
    /// replace the first one's waker.
    pub fn get(&self) -> impl Future<Output = T> + '_ {
        poll_fn(move |cx| {
            self.inner.lock(|state| {
                let mut state = state.borrow_mut();
                match state.ring.pop_front() {
                    Some(value) => Poll::Ready(value),
                    None => {
                        state.receiver.register(cx.waker());
                        Poll::Pending
                    }
                }
            })
        })
    }

    /// Number of unread entries
    pub fn len(&self) -> usize {
        self.inner.lock(|state| state.borrow().ring.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Entries lost to the drop-oldest policy since creation (wrapping)
    pub fn overwritten(&self) -> u32 {
        self.inner.lock(|state| state.borrow().overwritten)
    }

    /// Discard all unread entries
    pub fn clear(&self) {
        self.inner.lock(|state| state.borrow_mut().ring.clear())
    }
}

impl<M: RawMutex, T, const N: usize> Default for DropOldestQueue<M, T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::{block_on, poll_once};
    use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};

    #[test]
    fn test_fifo_order() {
        let queue: DropOldestQueue<NoopRawMutex, u32, 4> = DropOldestQueue::new();
        queue.put(1);
        queue.put(2);
        queue.put(3);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.try_get(), Some(1));
        assert_eq!(queue.try_get(), Some(2));
        assert_eq!(queue.try_get(), Some(3));
        assert_eq!(queue.try_get(), None);
    }

    #[test]
    fn test_overflow_keeps_most_recent() {
        let queue: DropOldestQueue<NoopRawMutex, f32, 2> = DropOldestQueue::new();
        queue.put(1.0);
        queue.put(2.0);
        queue.put(3.0);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.overwritten(), 1);
        assert_eq!(queue.try_get(), Some(2.0));
        assert_eq!(queue.try_get(), Some(3.0));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_capacity_one_holds_latest() {
        let queue: DropOldestQueue<NoopRawMutex, u8, 1> = DropOldestQueue::new();
        for value in 0..10 {
            queue.put(value);
        }
        assert_eq!(queue.overwritten(), 9);
        assert_eq!(queue.try_get(), Some(9));
    }

    #[test]
    fn test_get_pending_until_put() {
        let queue: DropOldestQueue<NoopRawMutex, u32, 2> = DropOldestQueue::new();
        assert!(poll_once(queue.get()).is_pending());
        queue.put(7);
        assert_eq!(poll_once(queue.get()), Poll::Ready(7));
    }

    #[test]
    fn test_get_returns_oldest() {
        let queue: DropOldestQueue<NoopRawMutex, u32, 4> = DropOldestQueue::new();
        queue.put(10);
        queue.put(20);
        assert_eq!(block_on(queue.get()), 10);
        assert_eq!(block_on(queue.get()), 20);
    }

    #[test]
    fn test_clear() {
        let queue: DropOldestQueue<NoopRawMutex, u32, 4> = DropOldestQueue::new();
        queue.put(1);
        queue.put(2);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), 4);
    }

    #[test]
    fn test_cross_thread_handoff() {
        static QUEUE: DropOldestQueue<CriticalSectionRawMutex, u32, 4> = DropOldestQueue::new();

        let producer = std::thread::spawn(|| {
            for value in 0..3 {
                QUEUE.put(value);
                std::thread::sleep(std::time::Duration::from_millis(2));
            }
        });

        let received: std::vec::Vec<u32> = (0..3).map(|_| block_on(QUEUE.get())).collect();
        producer.join().unwrap();
        assert_eq!(received, [0, 1, 2]);
    }
}
