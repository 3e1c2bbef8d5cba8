//! Property-based tests for the flat k-d tree.
//!
//! These verify structural invariants over arbitrary workloads, using a
//! plain vector multiset as the oracle for membership and counts.

#![allow(clippy::unwrap_used, clippy::cast_possible_truncation)]

use kdflat::layout::{root_of, root_offset, subtree_span};
use kdflat::{CoordIndex, KdTree, SlotState};
use proptest::prelude::*;

type Key = [i32; 2];
type Tree = KdTree<CoordIndex<Key>>;

// ============================================================================
//  Strategies
// ============================================================================

/// Keys from a narrow domain, so duplicate coordinates (and full duplicates)
/// show up often.
fn narrow_key() -> impl Strategy<Value = Key> {
    [-8i32..8, -8i32..8]
}

/// Keys from the full domain.
fn wide_key() -> impl Strategy<Value = Key> {
    [any::<i32>(), any::<i32>()]
}

#[derive(Debug, Clone)]
enum Op {
    Insert(Key),
    Remove(Key),
}

fn operations(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            3 => narrow_key().prop_map(Op::Insert),
            2 => narrow_key().prop_map(Op::Remove),
        ],
        0..=max_ops,
    )
}

// ============================================================================
//  Invariant checkers (over the public slot view)
// ============================================================================

struct Snapshot {
    slots: Vec<(SlotState, Key)>,
    full_state: SlotState,
}

fn snapshot(tree: &Tree) -> Snapshot {
    Snapshot {
        slots: tree
            .slots()
            .map(|s| (s.state(), s.value().copied().unwrap_or([0, 0])))
            .collect(),
        full_state: tree.full_state(),
    }
}

fn live(snap: &Snapshot, pos: usize) -> bool {
    snap.slots[pos].0 != SlotState::Invalid
}

/// Height (in nodes) of the live part of a subtree, checking the balance
/// bound at every live node on the way.
fn checked_height(snap: &Snapshot, offset: usize, node: usize) -> usize {
    if !live(snap, node) {
        return 0;
    }
    if offset == 0 {
        return 1;
    }
    let hl = checked_height(snap, offset / 2, node - offset);
    let hr = checked_height(snap, offset / 2, node + offset);
    assert!(
        hl.abs_diff(hr) <= 1,
        "unbalanced at slot {node}: left height {hl}, right height {hr}"
    );
    hl.max(hr) + 1
}

/// Check the k-d ordering: nothing in a left subtree exceeds its node on
/// the node's split axis, nothing in a right subtree precedes it.
fn check_ordering(snap: &Snapshot, axis: usize, offset: usize, node: usize) {
    if !live(snap, node) || offset == 0 {
        return;
    }
    let key = snap.slots[node].1;
    // A child's subtree is the contiguous range reaching offset - 1 slots
    // to either side of it.
    let reach = offset - 1;
    for pos in (node - offset - reach)..=(node - offset + reach) {
        if live(snap, pos) {
            let child = snap.slots[pos].1;
            assert!(
                child[axis] <= key[axis],
                "left value {child:?} exceeds node {key:?} on axis {axis}"
            );
        }
    }
    for pos in (node + offset - reach)..=(node + offset + reach) {
        if live(snap, pos) {
            let child = snap.slots[pos].1;
            assert!(
                child[axis] >= key[axis],
                "right value {child:?} precedes node {key:?} on axis {axis}"
            );
        }
    }

    check_ordering(snap, (axis + 1) % 2, offset / 2, node - offset);
    check_ordering(snap, (axis + 1) % 2, offset / 2, node + offset);
}

/// Check state accuracy: full-parity bytes mark exactly the perfectly full
/// subtrees, and Invalid slots root entirely empty subtrees. Returns the
/// number of live slots in the subtree.
fn check_states(snap: &Snapshot, offset: usize, node: usize) -> usize {
    let below = if offset == 0 {
        0
    } else {
        check_states(snap, offset / 2, node - offset) + check_states(snap, offset / 2, node + offset)
    };
    let total = below + usize::from(live(snap, node));

    if !live(snap, node) {
        assert_eq!(below, 0, "empty slot {node} has {below} live descendants");
    }
    let is_full = total == subtree_span(offset);
    let marked_full = snap.slots[node].0 == snap.full_state;
    assert_eq!(
        is_full, marked_full,
        "slot {node}: fullness {is_full} but state {:?} under parity {:?}",
        snap.slots[node].0, snap.full_state
    );
    total
}

/// Ordering, state accuracy, and count consistency; holds for every
/// workload, erasure included.
fn assert_search_invariants(tree: &Tree) {
    let snap = snapshot(tree);
    if snap.slots.is_empty() {
        assert_eq!(tree.len(), 0);
        return;
    }
    let span = snap.slots.len();
    let live_count = (0..span).filter(|&p| live(&snap, p)).count();
    assert_eq!(live_count, tree.len(), "live slot count diverged from len()");

    check_ordering(&snap, 0, root_offset(span), root_of(span));
    check_states(&snap, root_offset(span), root_of(span));
}

/// Search invariants plus the height-balance bound, which is guaranteed
/// for trees produced by insertion and bulk building alone.
fn assert_invariants(tree: &Tree) {
    assert_search_invariants(tree);
    let snap = snapshot(tree);
    if !snap.slots.is_empty() {
        let span = snap.slots.len();
        checked_height(&snap, root_offset(span), root_of(span));
    }
}

/// The multiset oracle: how many entries equal `key`.
fn oracle_count(oracle: &[Key], key: Key) -> usize {
    oracle.iter().filter(|&&k| k == key).count()
}

// ============================================================================
//  Insert-only properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Size, balance, ordering, and state invariants hold after every
    /// insert of an arbitrary sequence.
    #[test]
    fn insert_only_invariants(keys in prop::collection::vec(narrow_key(), 0..120)) {
        let mut tree = Tree::new();
        for (n, &key) in keys.iter().enumerate() {
            tree.insert(key);
            prop_assert_eq!(tree.len(), n + 1);
        }
        assert_invariants(&tree);
    }

    /// Every inserted key is findable, including duplicates and wide-domain
    /// coordinates.
    #[test]
    fn round_trip_find(keys in prop::collection::vec(wide_key(), 0..200)) {
        let mut tree = Tree::new();
        for &key in &keys {
            tree.insert(key);
        }
        for &key in &keys {
            let hit = tree.find(&key);
            prop_assert_eq!(hit, Some(&key));
        }
    }

    /// Extrema agree with the oracle on both axes.
    #[test]
    fn extrema_soundness(keys in prop::collection::vec(narrow_key(), 1..150)) {
        let tree: Tree = keys.iter().copied().collect();
        for axis in 0..2 {
            let expect_min = keys.iter().map(|k| k[axis]).min().unwrap();
            let expect_max = keys.iter().map(|k| k[axis]).max().unwrap();
            prop_assert_eq!(tree.min_on_axis(axis).unwrap()[axis], expect_min);
            prop_assert_eq!(tree.max_on_axis(axis).unwrap()[axis], expect_max);
        }
    }

    /// A container hinted at `n` always reports the rounded-up capacity and
    /// zero size.
    #[test]
    fn capacity_geometry(hint in 0usize..10_000) {
        let tree = Tree::with_capacity(hint);
        let cap = tree.capacity();
        prop_assert_eq!(cap, kdflat::bits::fill_trailing_zeros(hint));
        prop_assert_eq!(tree.len(), 0);
        // capacity is 0 or 2^h - 1
        prop_assert!(cap & (cap + 1) == 0);
    }
}

// ============================================================================
//  Resize parity
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After a doubling, every previously-full state byte compares unequal
    /// to the container's parity; after the next doubling they compare
    /// equal again.
    #[test]
    fn resize_parity_flips(height in 1u32..6) {
        let full_span = (1usize << height) - 1;
        let mut tree = Tree::new();
        for i in 0..full_span {
            tree.insert([i as i32, 0]);
        }

        // Perfectly full: every live slot byte equals the parity.
        let parity = tree.full_state();
        for slot in tree.slots() {
            prop_assert_eq!(slot.state(), parity);
        }

        // One more insert doubles the span; the old bytes (now at odd
        // positions) all compare unequal to the new parity.
        tree.insert([-1, 0]);
        let parity = tree.full_state();
        let slots: Vec<_> = tree.slots().collect();
        for i in 0..full_span {
            let old = &slots[2 * i + 1];
            prop_assert!(old.is_valid());
            prop_assert_ne!(old.state(), parity);
        }

        // Fill the new layer completely: parity flips once more and the
        // refreshed bytes compare equal again.
        let new_span = 2 * full_span + 1;
        for i in 0..(new_span - full_span - 1) {
            tree.insert([1000 + i as i32, 0]);
        }
        let parity = tree.full_state();
        for slot in tree.slots() {
            prop_assert_eq!(slot.state(), parity);
        }
    }
}

// ============================================================================
//  Mixed workloads against the oracle
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Arbitrary insert/remove interleavings agree with a vector multiset
    /// on counts and membership, and preserve ordering/state invariants.
    #[test]
    fn mixed_ops_match_oracle(ops in operations(80)) {
        let mut tree = Tree::new();
        let mut oracle: Vec<Key> = Vec::new();

        for op in &ops {
            match *op {
                Op::Insert(key) => {
                    tree.insert(key);
                    oracle.push(key);
                }
                Op::Remove(key) => {
                    let removed = tree.remove(&key);
                    let expect = oracle_count(&oracle, key);
                    prop_assert_eq!(removed, expect, "remove({:?})", key);
                    oracle.retain(|&k| k != key);
                }
            }
            prop_assert_eq!(tree.len(), oracle.len());
        }

        for &key in &oracle {
            prop_assert!(tree.contains(&key), "oracle key {:?} missing", key);
        }
        let snap_keys: Vec<Key> = tree.values().copied().collect();
        prop_assert_eq!(snap_keys.len(), oracle.len());

        let snap = {
            let mut v = snap_keys;
            v.sort_unstable();
            v
        };
        let expect = {
            let mut v = oracle.clone();
            v.sort_unstable();
            v
        };
        prop_assert_eq!(snap, expect);

        // Ordering and state invariants survive the mix (balance is only
        // guaranteed for insert-only workloads).
        assert_search_invariants(&tree);
    }

    /// Inserting after heavy erasure still finds everything.
    #[test]
    fn refill_after_erasure(
        first in prop::collection::vec(narrow_key(), 1..60),
        second in prop::collection::vec(narrow_key(), 1..60),
    ) {
        let mut tree = Tree::new();
        for &key in &first {
            tree.insert(key);
        }
        for &key in &first {
            tree.remove(&key);
        }
        prop_assert!(tree.is_empty());

        for &key in &second {
            tree.insert(key);
        }
        prop_assert_eq!(tree.len(), second.len());
        for &key in &second {
            prop_assert!(tree.contains(&key));
        }
        assert_invariants(&tree);
    }
}

// ============================================================================
//  Copies and bulk builds
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Mutating a clone never affects the source, and both satisfy the
    /// invariants.
    #[test]
    fn copy_independence(
        keys in prop::collection::vec(narrow_key(), 1..80),
        extra in narrow_key(),
    ) {
        let mut source = Tree::new();
        for &key in &keys {
            source.insert(key);
        }

        let mut copy = source.clone();
        prop_assert_eq!(copy.len(), source.len());
        prop_assert_eq!(copy.capacity(), source.capacity());
        prop_assert_eq!(copy.full_state(), source.full_state());

        copy.insert(extra);
        copy.remove(&keys[0]);

        prop_assert!(source.contains(&keys[0]));
        prop_assert_eq!(source.len(), keys.len());
        assert_invariants(&source);
        assert_search_invariants(&copy);
    }

    /// Bulk build holds the same multiset as per-item insertion and
    /// satisfies all structural invariants.
    #[test]
    fn bulk_build_equivalence(keys in prop::collection::vec(narrow_key(), 0..150)) {
        let bulk: Tree = keys.iter().copied().collect();
        prop_assert_eq!(bulk.len(), keys.len());
        assert_invariants(&bulk);

        for &key in &keys {
            prop_assert!(bulk.contains(&key), "bulk build lost {:?}", key);
        }

        let mut got: Vec<Key> = bulk.values().copied().collect();
        let mut expect = keys.clone();
        got.sort_unstable();
        expect.sort_unstable();
        prop_assert_eq!(got, expect);
    }
}
