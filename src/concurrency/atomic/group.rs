//! All-or-nothing operations over a fixed set of [`AtomicWord`]s.
//!
//! A [`FixedAtomicWordGroup`] is a borrowed view over `N` words owned elsewhere.
//! It keeps no state of its own: every bit of coordination lives in the tag
//! bits of the words, so any number of views (on any number of threads) may
//! cover the same words at once, and a view can be built right before an
//! operation and dropped right after.
//!
//! # Protocol
//!
//! [`compare_exchange`](FixedAtomicWordGroup::compare_exchange) runs in two
//! phases over indices `0..N`:
//!
//! 1. **Claim**: CAS each word from `expected[i]` to `desired[i] | TAG_BIT`.
//!    The first mismatch aborts; the claimed prefix is CAS'd back to
//!    `expected` and the call returns `false`.
//! 2. **Commit**: CAS each word from `desired[i] | TAG_BIT` to `desired[i]`.
//!
//! Between the first claim and the last commit at least one word of the group
//! is tagged. Reads come in two forms:
//!
//! - [`load`](FixedAtomicWordGroup::load) is read-only. It fails on any tag it
//!   sees, then re-reads every word and fails if anything moved. This catches
//!   every transition that overlaps the read *unless* a word leaves a value and
//!   returns to it between its two reads (ABA). It is exact when word values
//!   are never reused within one read, e.g. counters that only move forward.
//! - [`load_exclusive`](FixedAtomicWordGroup::load_exclusive) claims every word
//!   in place and then releases it unchanged. While the last claim lands all
//!   words are held, so the values it returns coexisted, whatever the
//!   workload. It writes to every word and so contends like a transition.
//!
//! Neither operation loops. Losing a race returns `false`; pair the call with
//! a [`RetryPolicy`] (or your own loop) to retry.
//!
//! ```rust
//! use xact::{AtomicWord, FixedAtomicWordGroup, RetryPolicy};
//!
//! let words = [AtomicWord::new(0), AtomicWord::new(1)];
//! let group = FixedAtomicWordGroup::<2>::from_slice(&words);
//!
//! assert!(group.compare_exchange(&[0, 1], &[10, 11]));
//! assert!(!group.compare_exchange(&[0, 1], &[20, 21]));
//! assert_eq!(group.load_with(&RetryPolicy::unbounded()), Ok([10, 11]));
//! ```

use core::sync::atomic::Ordering;

use super::word::{is_tagged, tagged, value_of, AtomicWord};
use crate::concurrency::retry::{RetryError, RetryPolicy};

/// Every group access is sequentially consistent, so scans and claims by
/// different threads agree on one global order.
const ORDER: Ordering = Ordering::SeqCst;

/// A transient view over `N` atomic words supporting consistent snapshots and
/// multi-word compare-and-swap.
///
/// All groups touching a word should list their words in the same relative
/// order. Groups that disagree still stay correct (a claim never waits), but
/// they can keep aborting each other under contention.
#[derive(Clone, Copy, Debug)]
pub struct FixedAtomicWordGroup<'a, const N: usize> {
    words: [&'a AtomicWord; N],
}

impl<'a, const N: usize> FixedAtomicWordGroup<'a, N> {
    /// Creates a view over `words`, in order.
    ///
    /// Listing the same word twice makes every `compare_exchange` fail; debug
    /// builds reject it.
    #[inline]
    pub fn new(words: [&'a AtomicWord; N]) -> Self {
        debug_assert!(all_distinct(&words), "a group cannot cover the same word twice");
        Self { words }
    }

    /// Creates a view over a contiguous run of words.
    ///
    /// # Panics
    /// Panics if `words.len() != N`.
    pub fn from_slice(words: &'a [AtomicWord]) -> Self {
        assert_eq!(
            words.len(),
            N,
            "a group of {N} words cannot cover {} words",
            words.len()
        );
        Self::new(core::array::from_fn(|i| &words[i]))
    }

    /// Creates a view over scattered words.
    ///
    /// # Panics
    /// Panics if `words.len() != N`.
    pub fn from_refs(words: &[&'a AtomicWord]) -> Self {
        assert_eq!(
            words.len(),
            N,
            "a group of {N} words cannot cover {} words",
            words.len()
        );
        Self::new(core::array::from_fn(|i| words[i]))
    }

    /// Number of words in the group.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        N
    }

    /// Returns `true` for the degenerate empty group.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// The words covered by this view.
    #[inline]
    pub fn words(&self) -> &[&'a AtomicWord; N] {
        &self.words
    }

    /// Reads a snapshot of all words into `out` without writing to them.
    ///
    /// Returns `false`, leaving `out` untouched, if a transition was in flight
    /// or completed during the read. The caller is expected to retry.
    ///
    /// The result is consistent provided no word goes back to an earlier value
    /// during the read: a word that moves `a -> b -> a` between the first and
    /// second pass goes unnoticed, and the vector returned may never have been
    /// in memory as a whole. Use [`load_exclusive`](Self::load_exclusive) when
    /// values can recur.
    pub fn load(&self, out: &mut [u64; N]) -> bool {
        let mut seen = [0u64; N];
        for (slot, word) in seen.iter_mut().zip(&self.words) {
            let raw = word.load(ORDER);
            if is_tagged(raw) {
                return false;
            }
            *slot = raw;
        }
        // A whole transition can land between two reads above without leaving
        // a tag behind; any such transition changed a word we already read.
        for (&raw, word) in seen.iter().zip(&self.words) {
            if word.load(ORDER) != raw {
                return false;
            }
        }
        *out = seen;
        true
    }

    /// Like [`load`](Self::load), returning the snapshot by value.
    ///
    /// Carries the same no-reuse precondition as `load`.
    #[inline]
    pub fn snapshot(&self) -> Option<[u64; N]> {
        let mut out = [0u64; N];
        self.load(&mut out).then_some(out)
    }

    /// Retries [`snapshot`](Self::snapshot) according to `policy`.
    ///
    /// Carries the same no-reuse precondition as [`load`](Self::load).
    ///
    /// # Errors
    /// Returns [`RetryError::Exhausted`] if every permitted attempt raced a writer.
    pub fn load_with(&self, policy: &RetryPolicy) -> Result<[u64; N], RetryError> {
        policy.run(|| self.snapshot())
    }

    /// Reads all words by claiming each one in place, then releasing it unchanged.
    ///
    /// Once the last claim lands no other transition can touch any word, so
    /// the values written to `out` were all present at that moment. Returns
    /// `false`, leaving `out` and every word untouched, if a word was claimed
    /// by someone else or moved under the claim.
    ///
    /// # Panics
    /// Panics if a word claimed by this call is modified by code outside the
    /// protocol.
    pub fn load_exclusive(&self, out: &mut [u64; N]) -> bool {
        let mut seen = [0u64; N];
        for (i, word) in self.words.iter().enumerate() {
            let raw = word.load(ORDER);
            if is_tagged(raw)
                || word
                    .compare_exchange(raw, tagged(raw), ORDER, ORDER)
                    .is_err()
            {
                self.release(&seen, &seen, i);
                return false;
            }
            seen[i] = raw;
        }
        self.release(&seen, &seen, N);
        *out = seen;
        true
    }

    /// Like [`load_exclusive`](Self::load_exclusive), returning the snapshot by value.
    #[inline]
    pub fn snapshot_exclusive(&self) -> Option<[u64; N]> {
        let mut out = [0u64; N];
        self.load_exclusive(&mut out).then_some(out)
    }

    /// Atomically replaces `expected` with `desired` across all words.
    ///
    /// Returns `true` if every word held its `expected` value and the whole
    /// group now holds `desired`. Returns `false` if any word differed or was
    /// claimed by a concurrent transition; in that case no word was changed.
    ///
    /// # Panics
    /// Panics if any value in `expected` or `desired` uses the tag bit, or if
    /// a word claimed by this call is modified by code outside the protocol.
    pub fn compare_exchange(&self, expected: &[u64; N], desired: &[u64; N]) -> bool {
        assert_untagged("expected", expected);
        assert_untagged("desired", desired);

        for (i, word) in self.words.iter().enumerate() {
            if word
                .compare_exchange(expected[i], tagged(desired[i]), ORDER, ORDER)
                .is_err()
            {
                #[cfg(feature = "tracing")]
                tracing::trace!(index = i, claimed = i, "claim failed, rolling back");
                self.release(desired, expected, i);
                return false;
            }
        }
        self.release(desired, desired, N);
        true
    }

    /// Applies `f` to a snapshot and installs the result, retrying per `policy`.
    ///
    /// Returns the snapshot that was replaced and the values installed. `f`
    /// may run several times and must not return values that use the tag bit.
    /// The claim re-checks every word against the snapshot, so a snapshot
    /// that was never current can only cost a retry.
    ///
    /// # Errors
    /// Returns [`RetryError::Exhausted`] if every permitted attempt lost a race.
    pub fn update<F>(
        &self,
        policy: &RetryPolicy,
        mut f: F,
    ) -> Result<([u64; N], [u64; N]), RetryError>
    where
        F: FnMut(&[u64; N]) -> [u64; N],
    {
        policy.run(|| {
            let current = self.snapshot()?;
            let next = f(&current);
            self.compare_exchange(&current, &next)
                .then_some((current, next))
        })
    }

    /// Adds `deltas[i]` to word `i` for every `i` in one transition.
    ///
    /// Sums wrap within the 63 value bits. Returns the values before the add.
    ///
    /// # Errors
    /// Returns [`RetryError::Exhausted`] if every permitted attempt lost a race.
    pub fn fetch_add(
        &self,
        deltas: &[u64; N],
        policy: &RetryPolicy,
    ) -> Result<[u64; N], RetryError> {
        self.update(policy, |current| {
            core::array::from_fn(|i| value_of(current[i].wrapping_add(deltas[i])))
        })
        .map(|(previous, _)| previous)
    }

    /// Untags the first `count` words, moving each from `claimed[i] | TAG_BIT`
    /// to `restore[i]`.
    fn release(&self, claimed: &[u64; N], restore: &[u64; N], count: usize) {
        for (i, word) in self.words.iter().enumerate().take(count) {
            let owned = tagged(claimed[i]);
            if let Err(observed) = word.compare_exchange(owned, restore[i], ORDER, ORDER) {
                contract_violation(i, owned, observed);
            }
        }
    }
}

fn all_distinct(words: &[&AtomicWord]) -> bool {
    words
        .iter()
        .enumerate()
        .all(|(i, a)| words[i + 1..].iter().all(|b| !core::ptr::eq(*a, *b)))
}

#[inline]
fn assert_untagged<const N: usize>(what: &str, values: &[u64; N]) {
    if let Some(i) = values.iter().position(|&v| is_tagged(v)) {
        panic!("{what}[{i}] = {:#x} uses the reserved tag bit", values[i]);
    }
}

#[cold]
#[inline(never)]
fn contract_violation(index: usize, owned: u64, observed: u64) -> ! {
    #[cfg(feature = "tracing")]
    tracing::error!(index, owned, observed, "claimed word modified outside the group protocol");
    panic!(
        "word {index} was modified while claimed: expected {owned:#x}, found {observed:#x}"
    );
}
