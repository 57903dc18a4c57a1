//! # `xact` - Lock-Free Multi-Word Transitions
//!
//! Atomic snapshots and all-or-nothing compare-and-swap across a fixed set of
//! independent 64-bit words, built only from single-word atomics.
//!
//! ## Guarantees
//!
//! - **Consistent reads**: [`FixedAtomicWordGroup::load_exclusive`] either
//!   returns the group's state at one moment, or fails. The read-only
//!   [`FixedAtomicWordGroup::load`] gives the same result as long as no word
//!   returns to an earlier value while it scans.
//! - **All-or-nothing transitions**: [`FixedAtomicWordGroup::compare_exchange`]
//!   moves every word from `expected` to `desired`, or changes nothing.
//! - **Lock-free**: no mutex, no global lock, no side table. A contended call
//!   fails fast and some thread always makes progress.
//!
//! ## Architecture
//!
//! 1. **Atomic words** ([`AtomicWord`]):
//!    - A 64-bit cell whose top bit ([`TAG_BIT`]) is reserved
//!    - 63 bits of logical value
//!    - Usable on its own (`load`, `store`, `fetch_add`) by code outside any group
//!
//! 2. **Group views** ([`FixedAtomicWordGroup`]):
//!    - Borrow `N` words, `N` fixed at compile time
//!    - Claim every word (tag it) before changing any value, untag after
//!    - Carry no state; build one per operation if convenient
//!
//! 3. **Retry policies** ([`RetryPolicy`]):
//!    - Bounded or unbounded attempts with spin, exponential or yield backoff
//!    - Serde-loadable so contention tuning can live in configuration
//!
//! ## Usage contract
//!
//! Code that writes an [`AtomicWord`] directly must never set [`TAG_BIT`]. A
//! stray tag looks like an in-flight transition and stalls every group over
//! that word; overwriting a word a transition has claimed is a bug that the
//! group reports with a panic.
//!
//! ## Example
//!
//! ```rust
//! use xact::{AtomicWord, FixedAtomicWordGroup, RetryPolicy};
//!
//! let words = [AtomicWord::new(0), AtomicWord::new(1), AtomicWord::new(2)];
//!
//! std::thread::scope(|s| {
//!     for _ in 0..4 {
//!         s.spawn(|| {
//!             let group = FixedAtomicWordGroup::<3>::from_slice(&words);
//!             for _ in 0..100 {
//!                 group.fetch_add(&[1, 1, 1], &RetryPolicy::unbounded()).unwrap();
//!             }
//!         });
//!     }
//! });
//!
//! let group = FixedAtomicWordGroup::<3>::from_slice(&words);
//! assert_eq!(group.snapshot(), Some([400, 401, 402]));
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod concurrency;

mod loom;

pub use concurrency::atomic::{AtomicWord, FixedAtomicWordGroup, MAX_VALUE, TAG_BIT};
pub use concurrency::retry::{BackoffStrategy, RetryError, RetryPolicy};
