//! Filepath: src/extremum.rs
//!
//! Per-axis extremum queries over a subtree.
//!
//! `minimum` returns the position of a live value whose key along a fixed
//! axis is less than or equal to every other live key on that axis within
//! the subtree; `maximum` is the mirror image. Both exploit the k-d ordering
//! to prune: when the node's own split axis *is* the fixed axis, the
//! away-side subtree cannot contain a better key and is skipped entirely.
//! On ties the first position encountered wins.
//!
//! Child subtrees whose root slot is Invalid are empty (see the container's
//! erase invariant) and are skipped. The `node` argument itself must be
//! live; callers guarantee it.

use crate::axis::AxisIndex;
use crate::layout::{left_of, next_axis, right_of};
use crate::storage::Storage;

/// Position of a minimal live value along `fixed_axis` within the subtree
/// rooted at `node` (which splits on `axis` with child offset `offset`).
pub(crate) fn minimum<I: AxisIndex>(
    storage: &Storage<I::Value>,
    index: &I,
    fixed_axis: usize,
    axis: usize,
    offset: usize,
    node: usize,
) -> usize {
    debug_assert!(storage.is_live(node));

    let mut best = node;
    if offset == 0 {
        return best;
    }

    let child_axis = next_axis(axis, I::DIMS);
    let child_offset = offset / 2;

    let left = left_of(node, offset);
    if storage.is_live(left) {
        let cand = minimum(storage, index, fixed_axis, child_axis, child_offset, left);
        if better_min(storage, index, fixed_axis, cand, best) {
            best = cand;
        }
    }

    // Everything to the right is >= the node on its own split axis.
    if axis != fixed_axis {
        let right = right_of(node, offset);
        if storage.is_live(right) {
            let cand = minimum(storage, index, fixed_axis, child_axis, child_offset, right);
            if better_min(storage, index, fixed_axis, cand, best) {
                best = cand;
            }
        }
    }

    best
}

/// Position of a maximal live value along `fixed_axis` within the subtree
/// rooted at `node` (which splits on `axis` with child offset `offset`).
pub(crate) fn maximum<I: AxisIndex>(
    storage: &Storage<I::Value>,
    index: &I,
    fixed_axis: usize,
    axis: usize,
    offset: usize,
    node: usize,
) -> usize {
    debug_assert!(storage.is_live(node));

    let mut best = node;
    if offset == 0 {
        return best;
    }

    let child_axis = next_axis(axis, I::DIMS);
    let child_offset = offset / 2;

    let right = right_of(node, offset);
    if storage.is_live(right) {
        let cand = maximum(storage, index, fixed_axis, child_axis, child_offset, right);
        if better_max(storage, index, fixed_axis, cand, best) {
            best = cand;
        }
    }

    // Everything to the left is <= the node on its own split axis.
    if axis != fixed_axis {
        let left = left_of(node, offset);
        if storage.is_live(left) {
            let cand = maximum(storage, index, fixed_axis, child_axis, child_offset, left);
            if better_max(storage, index, fixed_axis, cand, best) {
                best = cand;
            }
        }
    }

    best
}

#[inline]
fn better_min<I: AxisIndex>(
    storage: &Storage<I::Value>,
    index: &I,
    fixed_axis: usize,
    cand: usize,
    best: usize,
) -> bool {
    unsafe { index.axis_less(fixed_axis, storage.value(cand), storage.value(best)) }
}

#[inline]
fn better_max<I: AxisIndex>(
    storage: &Storage<I::Value>,
    index: &I,
    fixed_axis: usize,
    cand: usize,
    best: usize,
) -> bool {
    unsafe { index.axis_less(fixed_axis, storage.value(best), storage.value(cand)) }
}

// ============================================================================
//  Tests
// ============================================================================
