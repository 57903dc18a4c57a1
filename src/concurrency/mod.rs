//! Lock-free coordination primitives.
//!
//! Everything here is optimistic: operations either succeed or report that
//! they raced another thread. [`retry`] turns that signal into a loop.

pub mod atomic;
pub mod retry;

pub use atomic::{AtomicWord, FixedAtomicWordGroup};
pub use retry::{BackoffStrategy, RetryError, RetryPolicy};
