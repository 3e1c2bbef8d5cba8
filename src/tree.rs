//! Filepath: src/tree.rs
//!
//! The flat k-d tree container.
//!
//! [`KdTree`] owns two parallel buffers (values and slot states) that hold
//! an implicit binary tree: the root of a live region of `span` slots sits
//! at `span / 2`, children sit a computed offset to either side, and the
//! offset halves per level. No slot stores a pointer.
//!
//! # Growth
//!
//! `span` and capacity are always of the form `2^k - 1`. When an insert
//! finds the live region full, the region doubles by interleaving: every
//! value moves from position `i` to `2i + 1` and the freed even positions
//! become the new (empty) leaf layer. The move is a right-to-left walk, so
//! it works in place when capacity allows and into a fresh buffer when it
//! does not. Each doubling flips the container's `full_state` parity, which
//! demotes every "perfectly full" state byte at once without rewriting any
//! of them (see [`crate::state`]).
//!
//! # Balanced insertion
//!
//! An insert descends like an ordinary k-d tree insert until it meets a
//! subtree that is already perfectly full on the side it wants. Rather than
//! deepen it, the inserter rotates: the subtree root's value is pushed down
//! into the sibling subtree, the boundary extremum of the full side is
//! lifted into the root, and the descent continues into the vacated side.
//! Every subtree therefore stays within its height budget and the tree is
//! perfectly balanced after every insert.
//!
//! # Erasure
//!
//! Removing a value leaves a hole that is refilled from below: the
//! right-subtree minimum (or, failing that, the left-subtree maximum) along
//! the node's split axis moves up and the hole sinks toward the leaf layer,
//! mirroring the insert rotation. A slot is marked Invalid only once its
//! whole subtree is empty, so an Invalid slot always roots an empty
//! subtree. When erasure empties an entire leaf layer the region collapses
//! back to half its span.

use std::fmt;

use crate::axis::AxisIndex;
use crate::bits::fill_trailing_zeros;
use crate::extremum;
use crate::iter::Slots;
use crate::layout::{left_of, next_axis, right_of, root_of, root_offset, subtree_span};
use crate::state::SlotState;
use crate::storage::Storage;
use crate::trace::{debug_log, trace_log};

// ============================================================================
//  Deferred placement
// ============================================================================

/// A value travelling down the tree, not yet committed to a slot.
///
/// `Fresh` owns a caller-supplied value. `Relocate` names a slot whose value
/// is being moved elsewhere within the buffer; the source slot stays
/// readable for comparisons until the commit, after which the caller
/// overwrites or invalidates it.
enum Pending<V> {
    Fresh(V),
    Relocate(usize),
}

// ============================================================================
//  KdTree
// ============================================================================

/// A k-dimensional search index in contiguous storage.
///
/// Values carry `I::DIMS` ordered coordinates, compared through the
/// injected [`AxisIndex`]. The tree supports insertion, exact-match lookup,
/// per-axis extrema, and erasure, and stays perfectly balanced across
/// insert-only workloads.
///
/// Two values are *the same* when neither precedes the other on any axis;
/// [`KdTree::find`] and [`KdTree::remove`] use exactly this notion, so the
/// comparator supplied by the index decides equality.
///
/// # Example
///
/// ```
/// use kdflat::{CoordIndex, KdTree};
///
/// let mut tree: KdTree<CoordIndex<[i32; 2]>> = KdTree::new();
/// for i in 0..100 {
///     tree.insert([i, 100 - i]);
/// }
///
/// assert_eq!(tree.len(), 100);
/// assert_eq!(tree.find(&[40, 60]), Some(&[40, 60]));
/// assert_eq!(tree.min_on_axis(1), Some(&[99, 1]));
/// ```
pub struct KdTree<I: AxisIndex> {
    storage: Storage<I::Value>,

    /// Length of the live region; 0 or `2^k - 1`, at most the capacity.
    span: usize,

    /// Number of live values.
    count: usize,

    /// Which state byte currently means "subtree perfectly full".
    full_state: SlotState,

    index: I,
}

impl<I: AxisIndex + Default> KdTree<I> {
    /// Empty tree with zero capacity. Does not allocate.
    #[must_use]
    pub fn new() -> Self {
        Self::with_index(I::default())
    }

    /// Empty tree with room for `fill_trailing_zeros(capacity)` values.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_index(capacity, I::default())
    }

    /// Build a tree from `values` in O(n log n) by recursive median split.
    ///
    /// Equivalent to inserting every value one by one, but allocates once
    /// and produces a perfectly balanced shape directly.
    #[must_use]
    pub fn bulk(values: Vec<I::Value>) -> Self {
        Self::bulk_with_index(values, I::default())
    }
}

impl<I: AxisIndex + Default> Default for KdTree<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: AxisIndex> KdTree<I> {
    /// Empty tree with zero capacity and an explicit index.
    #[must_use]
    pub fn with_index(index: I) -> Self {
        assert!(I::DIMS > 0, "index must have at least one axis");

        Self {
            storage: Storage::empty(),
            span: 0,
            count: 0,
            full_state: SlotState::Heads,
            index,
        }
    }

    /// Empty tree with an explicit index and room for
    /// `fill_trailing_zeros(capacity)` values.
    #[must_use]
    pub fn with_capacity_and_index(capacity: usize, index: I) -> Self {
        let mut tree = Self::with_index(index);
        let capacity = fill_trailing_zeros(capacity);
        if capacity > 0 {
            tree.storage = Storage::with_capacity(capacity);
        }
        tree
    }

    /// Median-split bulk build with an explicit index.
    #[must_use]
    pub fn bulk_with_index(values: Vec<I::Value>, index: I) -> Self {
        let mut values = values;
        let n = values.len();
        let span = fill_trailing_zeros(n);

        let mut tree = Self::with_index(index);
        tree.storage = Storage::with_capacity(span);
        tree.span = span;
        tree.count = n;

        // The build moves every element out of the vector exactly once;
        // shortening it first keeps a comparator panic from double-dropping
        // already-moved values (not-yet-moved ones leak instead).
        unsafe { values.set_len(0) };
        let slots = unsafe { std::slice::from_raw_parts_mut(values.as_mut_ptr(), n) };
        if n > 0 {
            tree.build_span(0, root_offset(span), root_of(span), slots);
        }
        tree
    }

    // ========================================================================
    //  Observers
    // ========================================================================

    /// Number of live values. O(1).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the tree holds no values. O(1).
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Total slot capacity; always 0 or `2^h - 1`. O(1).
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// The injected axis-comparison capability.
    #[inline]
    #[must_use]
    pub fn index(&self) -> &I {
        &self.index
    }

    /// The state byte that currently means "subtree perfectly full".
    ///
    /// Flips on every capacity doubling; exposed so slot states observed
    /// through [`KdTree::slots`] can be interpreted.
    #[inline]
    #[must_use]
    pub fn full_state(&self) -> SlotState {
        self.full_state
    }

    /// Iterate every slot of the live region in array order, empty slots
    /// included. Array order is in-order tree traversal.
    #[must_use]
    pub fn slots(&self) -> Slots<'_, I::Value> {
        let (values, states) = self.storage.slices(self.span);
        Slots::new(values, states)
    }

    /// Iterate the live values in array order.
    pub fn values(&self) -> impl Iterator<Item = &I::Value> {
        self.slots().filter_map(|slot| slot.value())
    }

    // ========================================================================
    //  Lookup
    // ========================================================================

    /// Find a value equal to `value` on every axis.
    ///
    /// Equality is "neither precedes the other" per axis; keys equal on a
    /// split axis may sit on either side of a node, so the descent probes
    /// the left subtree before continuing right whenever the split axis
    /// compares equal.
    #[must_use]
    pub fn find(&self, value: &I::Value) -> Option<&I::Value> {
        self.find_pos(value)
            .map(|pos| unsafe { self.storage.value(pos) })
    }

    /// Whether a value equal to `value` on every axis is present.
    #[must_use]
    pub fn contains(&self, value: &I::Value) -> bool {
        self.find_pos(value).is_some()
    }

    /// A live value minimal along `axis`, or `None` when empty.
    ///
    /// Ties resolve to the first position encountered.
    ///
    /// # Panics
    ///
    /// Panics if `axis >= I::DIMS`.
    #[must_use]
    pub fn min_on_axis(&self, axis: usize) -> Option<&I::Value> {
        assert!(axis < I::DIMS, "axis {axis} out of range");
        if self.count == 0 {
            return None;
        }
        let pos = extremum::minimum(
            &self.storage,
            &self.index,
            axis,
            0,
            root_offset(self.span),
            root_of(self.span),
        );
        Some(unsafe { self.storage.value(pos) })
    }

    /// A live value maximal along `axis`, or `None` when empty.
    ///
    /// # Panics
    ///
    /// Panics if `axis >= I::DIMS`.
    #[must_use]
    pub fn max_on_axis(&self, axis: usize) -> Option<&I::Value> {
        assert!(axis < I::DIMS, "axis {axis} out of range");
        if self.count == 0 {
            return None;
        }
        let pos = extremum::maximum(
            &self.storage,
            &self.index,
            axis,
            0,
            root_offset(self.span),
            root_of(self.span),
        );
        Some(unsafe { self.storage.value(pos) })
    }

    // ========================================================================
    //  Mutation
    // ========================================================================

    /// Insert `value`, keeping the tree perfectly balanced.
    ///
    /// Returns a borrow of the slot where the value ultimately landed.
    /// Amortised O(log^2 n): a saturated subtree on the descent path costs
    /// one extremum query and one rotation per level.
    pub fn insert(&mut self, value: I::Value) -> &I::Value {
        self.prepare_insert();
        self.count += 1;
        let pos = self.place(
            0,
            root_offset(self.span),
            root_of(self.span),
            Pending::Fresh(value),
        );
        unsafe { self.storage.value(pos) }
    }

    /// Remove every value equal to `value` on all axes.
    ///
    /// Returns the number of values removed. The tree stays a valid k-d
    /// tree with accurate slot states; entirely emptied leaf layers are
    /// collapsed away.
    pub fn remove(&mut self, value: &I::Value) -> usize {
        let mut removed = 0;
        while let Some(pos) = self.find_pos(value) {
            self.erase_at(0, root_offset(self.span), root_of(self.span), pos);
            self.count -= 1;
            removed += 1;
        }
        if removed > 0 {
            self.try_collapse();
        }
        removed
    }

    /// Drop every live value. Capacity is retained, `len` becomes 0.
    pub fn clear(&mut self) {
        for pos in 0..self.span {
            if self.storage.is_live(pos) {
                drop(unsafe { self.storage.take(pos) });
                self.storage.set_state(pos, SlotState::Invalid);
            }
        }
        self.span = 0;
        self.count = 0;
    }

    // ========================================================================
    //  Growth
    // ========================================================================

    /// Make sure the live region has a free slot for one insert.
    fn prepare_insert(&mut self) {
        if self.count == 0 {
            if self.storage.capacity() == 0 {
                self.storage = Storage::with_capacity(1);
            }
            self.span = 1;
        } else if self.count == self.span {
            if self.count == self.storage.capacity() {
                self.grow_realloc();
            } else {
                self.grow_in_place();
            }
            self.full_state = !self.full_state;
        }
    }

    /// Interleave the live region into `2 * span + 1` slots of the same
    /// buffer: `i -> 2i + 1`, even positions become the empty leaf layer.
    /// The right-to-left walk never overwrites an unread slot.
    fn grow_in_place(&mut self) {
        let old_span = self.span;
        let new_span = 2 * old_span + 1;
        debug_assert!(new_span <= self.storage.capacity());

        for i in (0..old_span).rev() {
            unsafe { self.storage.relocate(i, 2 * i + 1) };
            let state = self.storage.state(i);
            self.storage.set_state(2 * i + 1, state);
        }
        for i in (0..new_span).step_by(2) {
            self.storage.set_state(i, SlotState::Invalid);
        }

        self.span = new_span;
        debug_log!(new_span, "expanded live region in place");
    }

    /// Same interleave, but into a freshly allocated buffer of
    /// `2 * capacity + 1` slots.
    fn grow_realloc(&mut self) {
        let old_span = self.span;
        let new_capacity = 2 * self.storage.capacity() + 1;
        let mut fresh = Storage::with_capacity(new_capacity);

        for i in 0..old_span {
            unsafe { self.storage.relocate_into(i, &mut fresh, 2 * i + 1) };
            fresh.set_state(2 * i + 1, self.storage.state(i));
        }

        self.storage = fresh;
        self.span = 2 * old_span + 1;
        debug_log!(new_capacity, "expanded into fresh buffer");
    }

    // ========================================================================
    //  Rotating inserter
    // ========================================================================

    /// Place `pending` somewhere in the not-full subtree rooted at `node`.
    fn place(
        &mut self,
        axis: usize,
        offset: usize,
        node: usize,
        pending: Pending<I::Value>,
    ) -> usize {
        if offset == 0 {
            self.commit(pending, node);
            self.storage.set_state(node, self.full_state);
            return node;
        }
        if !self.storage.is_live(node) {
            // Only erasure leaves an empty slot above the leaf layer, and
            // then its whole subtree is empty: take the root directly.
            self.commit(pending, node);
            self.storage.set_state(node, SlotState::Unsure);
            return node;
        }
        if offset == 1 {
            self.place_triple(axis, node, pending)
        } else {
            self.place_deep(axis, offset, node, pending)
        }
    }

    /// Placement in a three-slot subtree: `node` and its two leaves.
    fn place_triple(&mut self, axis: usize, node: usize, pending: Pending<I::Value>) -> usize {
        let left = left_of(node, 1);
        let right = right_of(node, 1);
        let full = self.full_state;

        if self.pending_less(axis, &pending, node) {
            if self.storage.is_live(left) {
                // Promote the node into the free right leaf, then settle
                // the pending value against the old left leaf.
                unsafe { self.storage.relocate(node, right) };
                self.storage.set_state(right, full);
                self.storage.set_state(node, full);
                if self.pending_less(axis, &pending, left) {
                    unsafe { self.storage.relocate(left, node) };
                    self.commit(pending, left);
                    left
                } else {
                    self.commit(pending, node);
                    node
                }
            } else {
                let right_live = self.storage.is_live(right);
                self.commit(pending, left);
                self.storage.set_state(left, full);
                if right_live {
                    self.storage.set_state(node, full);
                }
                left
            }
        } else if self.storage.is_live(right) {
            unsafe { self.storage.relocate(node, left) };
            self.storage.set_state(left, full);
            self.storage.set_state(node, full);
            if self.less_pending(axis, right, &pending) {
                unsafe { self.storage.relocate(right, node) };
                self.commit(pending, right);
                right
            } else {
                self.commit(pending, node);
                node
            }
        } else {
            let left_live = self.storage.is_live(left);
            self.commit(pending, right);
            self.storage.set_state(right, full);
            if left_live {
                self.storage.set_state(node, full);
            }
            right
        }
    }

    /// Placement in a subtree of seven or more slots.
    fn place_deep(
        &mut self,
        axis: usize,
        offset: usize,
        node: usize,
        pending: Pending<I::Value>,
    ) -> usize {
        let child_axis = next_axis(axis, I::DIMS);
        let child_offset = offset / 2;
        let left = left_of(node, offset);
        let right = right_of(node, offset);
        let full = self.full_state;

        let placed = if self.pending_less(axis, &pending, node) {
            if self.storage.state(left) == full {
                // Left side saturated: push the node's value down the right
                // side, lift the left maximum into the node, and keep
                // descending into the vacated left subtree.
                trace_log!(node, offset, "rotating through full left subtree");
                self.place(child_axis, child_offset, right, Pending::Relocate(node));
                let tmp = extremum::maximum(
                    &self.storage,
                    &self.index,
                    axis,
                    child_axis,
                    child_offset,
                    left,
                );
                if self.pending_less(axis, &pending, tmp) {
                    unsafe { self.storage.relocate(tmp, node) };
                    self.extract(child_axis, child_offset, left, tmp);
                    self.place(child_axis, child_offset, left, pending)
                } else {
                    self.commit(pending, node);
                    node
                }
            } else {
                self.place(child_axis, child_offset, left, pending)
            }
        } else if self.less_pending(axis, node, &pending) {
            if self.storage.state(right) == full {
                trace_log!(node, offset, "rotating through full right subtree");
                self.place(child_axis, child_offset, left, Pending::Relocate(node));
                let tmp = extremum::minimum(
                    &self.storage,
                    &self.index,
                    axis,
                    child_axis,
                    child_offset,
                    right,
                );
                if self.less_pending(axis, tmp, &pending) {
                    unsafe { self.storage.relocate(tmp, node) };
                    self.extract(child_axis, child_offset, right, tmp);
                    self.place(child_axis, child_offset, right, pending)
                } else {
                    self.commit(pending, node);
                    node
                }
            } else {
                self.place(child_axis, child_offset, right, pending)
            }
        } else {
            // Equal on the split axis: either side preserves the ordering,
            // so take one with room, right first. At most one side can be
            // full here, or the whole subtree would be.
            if self.storage.state(right) == full {
                self.place(child_axis, child_offset, left, pending)
            } else {
                self.place(child_axis, child_offset, right, pending)
            }
        };

        let merged = self.storage.state(left) + self.storage.state(right);
        self.storage.set_state(node, merged);
        placed
    }

    /// Move `pending` into slot `dst`. Previous contents of `dst` must be
    /// dead or already moved away.
    fn commit(&mut self, pending: Pending<I::Value>, dst: usize) {
        match pending {
            Pending::Fresh(value) => self.storage.write(dst, value),
            Pending::Relocate(src) => unsafe { self.storage.relocate(src, dst) },
        }
    }

    /// Whether the pending value precedes the value in slot `pos` on `axis`.
    fn pending_less(&self, axis: usize, pending: &Pending<I::Value>, pos: usize) -> bool {
        let value = unsafe { self.storage.value(pos) };
        self.index.axis_less(axis, self.pending_ref(pending), value)
    }

    /// Whether the value in slot `pos` precedes the pending value on `axis`.
    fn less_pending(&self, axis: usize, pos: usize, pending: &Pending<I::Value>) -> bool {
        let value = unsafe { self.storage.value(pos) };
        self.index.axis_less(axis, value, self.pending_ref(pending))
    }

    fn pending_ref<'a>(&'a self, pending: &'a Pending<I::Value>) -> &'a I::Value {
        match pending {
            Pending::Fresh(value) => value,
            Pending::Relocate(src) => unsafe { self.storage.value(*src) },
        }
    }

    // ========================================================================
    //  Erasure
    // ========================================================================

    /// Descend to `target`, drop its value, and refill the hole.
    ///
    /// Which side holds `target` falls out of index order: a subtree is a
    /// contiguous slot range centred on its root.
    fn erase_at(&mut self, axis: usize, offset: usize, node: usize, target: usize) {
        if node == target {
            drop(unsafe { self.storage.take(node) });
            self.vacate(axis, offset, node);
            return;
        }

        let child_axis = next_axis(axis, I::DIMS);
        let child_offset = offset / 2;
        let child = if target < node {
            left_of(node, offset)
        } else {
            right_of(node, offset)
        };
        self.erase_at(child_axis, child_offset, child, target);
        self.storage.set_state(node, SlotState::Unsure);
    }

    /// Remove slot `target`, whose value has already been moved away, from
    /// the subtree rooted at `node`.
    fn extract(&mut self, axis: usize, offset: usize, node: usize, target: usize) {
        if node == target {
            self.vacate(axis, offset, node);
            return;
        }

        let child_axis = next_axis(axis, I::DIMS);
        let child_offset = offset / 2;
        let child = if target < node {
            left_of(node, offset)
        } else {
            right_of(node, offset)
        };
        self.extract(child_axis, child_offset, child, target);
        self.storage.set_state(node, SlotState::Unsure);
    }

    /// Refill the logically empty slot `node` from its subtree, or mark it
    /// Invalid when the subtree below holds nothing.
    ///
    /// Pulling the right-subtree minimum (or left-subtree maximum) along
    /// the node's own split axis keeps the k-d ordering intact, and the
    /// hole sinks one level per step until it reaches an empty frontier.
    fn vacate(&mut self, axis: usize, offset: usize, node: usize) {
        if offset == 0 {
            self.storage.set_state(node, SlotState::Invalid);
            return;
        }

        let child_axis = next_axis(axis, I::DIMS);
        let child_offset = offset / 2;
        let left = left_of(node, offset);
        let right = right_of(node, offset);

        if self.storage.is_live(right) {
            let tmp = extremum::minimum(
                &self.storage,
                &self.index,
                axis,
                child_axis,
                child_offset,
                right,
            );
            unsafe { self.storage.relocate(tmp, node) };
            self.storage.set_state(node, SlotState::Unsure);
            self.extract(child_axis, child_offset, right, tmp);
        } else if self.storage.is_live(left) {
            let tmp = extremum::maximum(
                &self.storage,
                &self.index,
                axis,
                child_axis,
                child_offset,
                left,
            );
            unsafe { self.storage.relocate(tmp, node) };
            self.storage.set_state(node, SlotState::Unsure);
            self.extract(child_axis, child_offset, left, tmp);
        } else {
            self.storage.set_state(node, SlotState::Invalid);
        }
    }

    // ========================================================================
    //  Collapse
    // ========================================================================

    /// Shed entirely empty leaf layers after erasure.
    fn try_collapse(&mut self) {
        while self.span > 1 && self.count <= self.span / 2 && self.leaf_layer_empty() {
            self.collapse();
        }
    }

    fn leaf_layer_empty(&self) -> bool {
        (0..self.span)
            .step_by(2)
            .all(|pos| !self.storage.is_live(pos))
    }

    /// Inverse of [`KdTree::grow_in_place`]: drop the (empty) leaf layer by
    /// moving `2i + 1 -> i`, halve the span, flip parity, and rebuild the
    /// state bytes bottom-up for the new height.
    fn collapse(&mut self) {
        let old_span = self.span;
        let new_span = old_span / 2;

        for i in 0..new_span {
            let src = 2 * i + 1;
            if self.storage.is_live(src) {
                unsafe { self.storage.relocate(src, i) };
            }
            let state = self.storage.state(src);
            self.storage.set_state(i, state);
        }
        for i in new_span..old_span {
            self.storage.set_state(i, SlotState::Invalid);
        }

        self.span = new_span;
        self.full_state = !self.full_state;
        if new_span > 0 && self.storage.is_live(root_of(new_span)) {
            self.restate(root_offset(new_span), root_of(new_span));
        }
        debug_log!(new_span, "collapsed empty leaf layer");
    }

    /// Recompute accurate state bytes for the subtree rooted at `node`
    /// under the current parity. Returns the state written.
    fn restate(&mut self, offset: usize, node: usize) -> SlotState {
        if !self.storage.is_live(node) {
            return SlotState::Invalid;
        }
        if offset == 0 {
            self.storage.set_state(node, self.full_state);
            return self.full_state;
        }

        let child_offset = offset / 2;
        let ls = self.restate(child_offset, left_of(node, offset));
        let rs = self.restate(child_offset, right_of(node, offset));
        let state = if ls + rs == self.full_state {
            self.full_state
        } else {
            SlotState::Unsure
        };
        self.storage.set_state(node, state);
        state
    }

    // ========================================================================
    //  Lookup internals
    // ========================================================================

    fn find_pos(&self, value: &I::Value) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        self.find_at(0, root_offset(self.span), root_of(self.span), value)
    }

    fn find_at(
        &self,
        mut axis: usize,
        mut offset: usize,
        mut node: usize,
        value: &I::Value,
    ) -> Option<usize> {
        loop {
            if !self.storage.is_live(node) {
                return None;
            }
            let node_value = unsafe { self.storage.value(node) };
            let left_only = self.index.axis_less(axis, value, node_value);
            let right_only = self.index.axis_less(axis, node_value, value);

            if !left_only && !right_only && self.axes_equal_except(node_value, value, axis) {
                return Some(node);
            }
            if offset == 0 {
                return None;
            }

            let child_axis = next_axis(axis, I::DIMS);
            let child_offset = offset / 2;
            if !right_only {
                // Keys equal on the split axis may sit on either side.
                let probe = self.find_at(child_axis, child_offset, left_of(node, offset), value);
                if probe.is_some() {
                    return probe;
                }
            }
            if left_only {
                return None;
            }
            node = right_of(node, offset);
            axis = child_axis;
            offset = child_offset;
        }
    }

    /// Axis equality on every dimension except `skip`, which the caller
    /// already compared.
    fn axes_equal_except(&self, a: &I::Value, b: &I::Value, skip: usize) -> bool {
        (0..I::DIMS)
            .filter(|&axis| axis != skip)
            .all(|axis| !self.index.axis_less(axis, a, b) && !self.index.axis_less(axis, b, a))
    }

    // ========================================================================
    //  Bulk build internals
    // ========================================================================

    /// Move every element of `slice` into the subtree rooted at `node`.
    ///
    /// The median on the split axis becomes the subtree root; the halves
    /// recurse into the children. Elements are moved out by raw read,
    /// exactly once each; the caller owns the (already length-zeroed)
    /// backing buffer.
    fn build_span(&mut self, axis: usize, offset: usize, node: usize, slice: &mut [I::Value]) {
        if slice.is_empty() {
            return;
        }
        if offset == 0 {
            debug_assert_eq!(slice.len(), 1);
            let value = unsafe { std::ptr::read(&slice[0]) };
            self.storage.write(node, value);
            self.storage.set_state(node, self.full_state);
            return;
        }
        debug_assert!(slice.len() <= subtree_span(offset));

        let mid = slice.len() / 2;
        {
            let index = &self.index;
            slice.select_nth_unstable_by(mid, |a, b| {
                if index.axis_less(axis, a, b) {
                    std::cmp::Ordering::Less
                } else if index.axis_less(axis, b, a) {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            });
        }

        let state = if slice.len() == subtree_span(offset) {
            self.full_state
        } else {
            SlotState::Unsure
        };
        let value = unsafe { std::ptr::read(&slice[mid]) };
        self.storage.write(node, value);
        self.storage.set_state(node, state);

        let child_axis = next_axis(axis, I::DIMS);
        let child_offset = offset / 2;
        let (low, high) = slice.split_at_mut(mid);
        self.build_span(child_axis, child_offset, left_of(node, offset), low);
        self.build_span(child_axis, child_offset, right_of(node, offset), &mut high[1..]);
    }
}

// ============================================================================
//  Trait plumbing
// ============================================================================

impl<I: AxisIndex> Drop for KdTree<I> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<I> Clone for KdTree<I>
where
    I: AxisIndex + Clone,
    I::Value: Clone,
{
    /// Deep copy into a fresh buffer of the source's capacity, preserving
    /// slot states and the fullness parity.
    fn clone(&self) -> Self {
        let mut storage = Storage::with_capacity(self.storage.capacity());
        for pos in 0..self.span {
            let state = self.storage.state(pos);
            if state.is_live() {
                storage.write(pos, unsafe { self.storage.value(pos) }.clone());
            }
            storage.set_state(pos, state);
        }

        Self {
            storage,
            span: self.span,
            count: self.count,
            full_state: self.full_state,
            index: self.index.clone(),
        }
    }
}

impl<I: AxisIndex> fmt::Debug for KdTree<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KdTree")
            .field("len", &self.count)
            .field("span", &self.span)
            .field("capacity", &self.storage.capacity())
            .field("full_state", &self.full_state)
            .finish_non_exhaustive()
    }
}

impl<I: AxisIndex + Default> FromIterator<I::Value> for KdTree<I> {
    fn from_iter<T: IntoIterator<Item = I::Value>>(iter: T) -> Self {
        Self::bulk(iter.into_iter().collect())
    }
}

impl<I: AxisIndex> Extend<I::Value> for KdTree<I> {
    fn extend<T: IntoIterator<Item = I::Value>>(&mut self, iter: T) {
        for value in iter {
            self.insert(value);
        }
    }
}

// ============================================================================
//  Tests
// ============================================================================
