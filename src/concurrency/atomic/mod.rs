//! Tagged atomic words and the multi-word operations built on them.
//!
//! Important:
//! - Only single-word hardware atomics (load, store, CAS) are used. There is no
//!   lock and no side table; the coordination state is one reserved bit per word.
//! - Operations never block. A lost race is reported to the caller, who picks
//!   the retry strategy.

/// Tagged `AtomicU64`.
pub mod word;
/// Multi-word snapshot and compare-and-swap.
pub mod group;

pub use group::FixedAtomicWordGroup;
pub use word::{is_tagged, tagged, value_of, AtomicWord, MAX_VALUE, TAG_BIT, VALUE_MASK};
