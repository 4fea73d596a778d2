//! Latest-value share
//!
//! Single-slot register for data where only the freshest sample matters.
//! Writers overwrite, readers copy out; neither side ever waits on the other
//! for longer than the copy itself.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// Single-slot overwrite register
pub struct LatestValue<M: RawMutex, T: Copy> {
    slot: Mutex<M, Cell<T>>,
}

impl<M: RawMutex, T: Copy> LatestValue<M, T> {
    /// Create a share that reads `initial` until the first `put`
    pub const fn new(initial: T) -> Self {
        Self {
            slot: Mutex::new(Cell::new(initial)),
        }
    }

    /// Publish a new value, replacing the previous one
    pub fn put(&self, value: T) {
        self.slot.lock(|slot| slot.set(value));
    }

    /// Most recently published value
    pub fn get(&self) -> T {
        self.slot.lock(|slot| slot.get())
    }
}

impl<M: RawMutex, T: Copy + Default> Default for LatestValue<M, T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};

    #[test]
    fn test_initial_value_until_first_put() {
        let share: LatestValue<NoopRawMutex, f32> = LatestValue::new(0.0);
        assert_eq!(share.get(), 0.0);
        assert_eq!(share.get(), 0.0);

        share.put(1500.0);
        share.put(-250.0);
        assert_eq!(share.get(), -250.0);
    }

    #[test]
    fn test_default() {
        let share: LatestValue<NoopRawMutex, u32> = LatestValue::default();
        assert_eq!(share.get(), 0);
    }

    #[test]
    fn test_readers_never_see_torn_values() {
        // Each published pair keeps both halves equal, so a torn read would
        // show up as a mismatch.
        static SHARE: LatestValue<CriticalSectionRawMutex, (u64, u64)> = LatestValue::new((0, 0));

        let writer = std::thread::spawn(|| {
            for i in 0..20_000u64 {
                SHARE.put((i, i));
            }
        });

        for _ in 0..20_000 {
            let (a, b) = SHARE.get();
            assert_eq!(a, b);
        }
        writer.join().unwrap();
        assert_eq!(SHARE.get(), (19_999, 19_999));
    }
}
