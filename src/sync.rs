//! Cross-context data handoff
//!
//! Both primitives are generic over the embassy raw mutex so the same code
//! runs with `CriticalSectionRawMutex` on the target (interrupt plus several
//! executors) and with `NoopRawMutex` in single-threaded tests.

pub mod queue;
pub mod share;

pub use queue::DropOldestQueue;
pub use share::LatestValue;
