//! Run with `RUSTFLAGS="--cfg loom" cargo test --release --test loom_group`.
#![cfg(loom)]

use loom::sync::atomic::Ordering;
use loom::sync::Arc;
use loom::thread;
use xact::concurrency::atomic::is_tagged;
use xact::{AtomicWord, FixedAtomicWordGroup};

fn pair(a: u64, b: u64) -> Arc<[AtomicWord; 2]> {
    Arc::new([AtomicWord::new(a), AtomicWord::new(b)])
}

fn untagged(words: &[AtomicWord]) -> bool {
    words.iter().all(|w| !is_tagged(w.load(Ordering::SeqCst)))
}

#[test]
fn snapshot_is_never_torn() {
    loom::model(|| {
        let words = pair(0, 1);

        let writer = {
            let words = Arc::clone(&words);
            thread::spawn(move || {
                let group = FixedAtomicWordGroup::<2>::from_slice(&words[..]);
                assert!(group.compare_exchange(&[0, 1], &[5, 6]));
            })
        };

        let group = FixedAtomicWordGroup::<2>::from_slice(&words[..]);
        if let Some(v) = group.snapshot() {
            assert!(v == [0, 1] || v == [5, 6], "torn snapshot {v:?}");
        }

        writer.join().unwrap();
        assert_eq!(group.snapshot(), Some([5, 6]));
    });
}

#[test]
fn competing_transitions_have_one_winner() {
    loom::model(|| {
        let words = pair(0, 0);

        let threads: Vec<_> = [1u64, 2]
            .into_iter()
            .map(|t| {
                let words = Arc::clone(&words);
                thread::spawn(move || {
                    let group = FixedAtomicWordGroup::<2>::from_slice(&words[..]);
                    group.compare_exchange(&[0, 0], &[t, t])
                })
            })
            .collect();

        let wins: Vec<bool> = threads.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(wins.iter().filter(|&&w| w).count(), 1);

        let winner = if wins[0] { 1 } else { 2 };
        assert!(untagged(&words[..]));
        let group = FixedAtomicWordGroup::<2>::from_slice(&words[..]);
        assert_eq!(group.snapshot(), Some([winner, winner]));
    });
}

#[test]
fn partial_claim_rolls_back() {
    loom::model(|| {
        let words = pair(0, 1);

        let single = {
            let words = Arc::clone(&words);
            thread::spawn(move || {
                let group = FixedAtomicWordGroup::<1>::new([&words[1]]);
                group.compare_exchange(&[1], &[9])
            })
        };

        let group = FixedAtomicWordGroup::<2>::from_slice(&words[..]);
        let pair_won = group.compare_exchange(&[0, 1], &[2, 3]);
        let single_won = single.join().unwrap();

        assert_ne!(pair_won, single_won, "exactly one transition must land");
        assert!(untagged(&words[..]));
        let expected = if pair_won { [2, 3] } else { [0, 9] };
        assert_eq!(group.snapshot(), Some(expected));
    });
}

#[test]
fn exclusive_snapshot_survives_value_reuse() {
    const STATES: [[u64; 2]; 4] = [[0, 0], [1, 1], [0, 5], [7, 1]];

    let mut builder = loom::model::Builder::new();
    if builder.preemption_bound.is_none() {
        builder.preemption_bound = Some(3);
    }
    builder.check(|| {
        let words = pair(0, 0);

        let writer = {
            let words = Arc::clone(&words);
            thread::spawn(move || {
                let group = FixedAtomicWordGroup::<2>::from_slice(&words[..]);
                for step in STATES.windows(2) {
                    while !group.compare_exchange(&step[0], &step[1]) {
                        thread::yield_now();
                    }
                }
            })
        };

        let group = FixedAtomicWordGroup::<2>::from_slice(&words[..]);
        if let Some(v) = group.snapshot_exclusive() {
            assert!(STATES.contains(&v), "snapshot {v:?} was never committed");
        }

        writer.join().unwrap();
        assert!(untagged(&words[..]));
        assert_eq!(group.snapshot_exclusive(), Some([7, 1]));
    });
}

#[test]
#[should_panic(expected = "modified while claimed")]
fn foreign_store_over_a_claim_is_fatal() {
    loom::model(|| {
        let words = pair(0, 0);

        let intruder = {
            let words = Arc::clone(&words);
            thread::spawn(move || words[1].store(3, Ordering::SeqCst))
        };

        let group = FixedAtomicWordGroup::<2>::from_slice(&words[..]);
        let _ = group.compare_exchange(&[0, 0], &[5, 5]);
        intruder.join().unwrap();
    });
}
