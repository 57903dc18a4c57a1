//! A single 64-bit cell with one reserved tag bit.
//!
//! The top bit of every [`AtomicWord`] belongs to the group protocol in
//! [`super::group`]: it is set while a multi-word transition has claimed the
//! word and cleared when the transition commits or rolls back. Code that
//! writes a word directly (outside any group) must never set it.

use core::fmt;

use crate::loom::hint::spin_loop;
use crate::loom::sync::atomic::{AtomicU64, Ordering};

/// The reserved bit marking a word as claimed by an in-flight transition.
pub const TAG_BIT: u64 = 1 << 63;

/// Mask selecting the logical value bits of a raw word.
pub const VALUE_MASK: u64 = !TAG_BIT;

/// The largest logical value a word can hold.
pub const MAX_VALUE: u64 = VALUE_MASK;

/// Strips the tag bit from a raw word.
#[inline(always)]
pub const fn value_of(raw: u64) -> u64 {
    raw & VALUE_MASK
}

/// Returns whether a raw word carries the tag bit.
#[inline(always)]
pub const fn is_tagged(raw: u64) -> bool {
    raw & TAG_BIT != 0
}

/// Returns `value` with the tag bit set.
#[inline(always)]
pub const fn tagged(value: u64) -> u64 {
    value | TAG_BIT
}

/// An `AtomicU64` whose top bit is reserved for multi-word transitions.
///
/// All methods operate on the *raw* 64 bits, tag included, except
/// [`value`](Self::value) and [`fetch_add`](Self::fetch_add) which work on the
/// logical value.
#[repr(transparent)]
pub struct AtomicWord {
    inner: AtomicU64,
}

impl AtomicWord {
    /// Creates a new word holding `value`.
    ///
    /// # Panics
    /// Panics if `value` has the tag bit set.
    #[inline]
    pub fn new(value: u64) -> Self {
        assert!(
            !is_tagged(value),
            "initial value {value:#x} uses the reserved tag bit"
        );
        Self {
            inner: AtomicU64::new(value),
        }
    }

    /// Loads the raw bits, tag included.
    #[inline(always)]
    pub fn load(&self, order: Ordering) -> u64 {
        self.inner.load(order)
    }

    /// Loads the logical value, or `None` while a transition has claimed the word.
    #[inline]
    pub fn value(&self, order: Ordering) -> Option<u64> {
        let raw = self.load(order);
        (!is_tagged(raw)).then_some(raw)
    }

    /// Overwrites the raw bits.
    ///
    /// Callers outside the group protocol must not pass a tagged value, and
    /// must not store over a word that is currently claimed.
    #[inline(always)]
    pub fn store(&self, raw: u64, order: Ordering) {
        self.inner.store(raw, order);
    }

    /// Swaps the raw bits, returning the previous raw bits.
    #[inline(always)]
    pub fn swap(&self, raw: u64, order: Ordering) -> u64 {
        self.inner.swap(raw, order)
    }

    /// Stores `new` if the raw bits equal `current`.
    ///
    /// This is a strong CAS: it only fails when the comparison fails.
    #[inline(always)]
    pub fn compare_exchange(
        &self,
        current: u64,
        new: u64,
        success: Ordering,
        failure: Ordering,
    ) -> Result<u64, u64> {
        self.inner.compare_exchange(current, new, success, failure)
    }

    /// Performs a strong compare-exchange with `AcqRel`/`Acquire` orderings.
    ///
    /// Returns `true` if the swap happened.
    #[inline(always)]
    pub fn compare_exchange_cas(&self, current: u64, new: u64) -> bool {
        self.compare_exchange(current, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Adds `delta` to the logical value, returning the previous logical value.
    ///
    /// The sum wraps within the value bits, so the tag bit is never set. While
    /// a transition holds the word this spins until it is released.
    #[inline]
    pub fn fetch_add(&self, delta: u64, order: Ordering) -> u64 {
        'fetch_add: loop {
            let current = self.inner.load(Ordering::Relaxed);
            if is_tagged(current) {
                spin_loop();
                continue 'fetch_add;
            }
            let updated = value_of(current.wrapping_add(delta));
            match self
                .inner
                .compare_exchange_weak(current, updated, order, Ordering::Relaxed)
            {
                Ok(prev) => break 'fetch_add prev,
                Err(_) => continue 'fetch_add,
            }
        }
    }
}

impl fmt::Debug for AtomicWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = self.load(Ordering::Relaxed);
        f.debug_struct("AtomicWord")
            .field("value", &value_of(raw))
            .field("tagged", &is_tagged(raw))
            .finish()
    }
}

impl Default for AtomicWord {
    #[inline]
    fn default() -> Self {
        Self::new(0)
    }
}

impl From<u64> for AtomicWord {
    #[inline]
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}
