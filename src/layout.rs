//! Filepath: src/layout.rs
//!
//! Implicit-tree geometry over a flat array.
//!
//! The tree stores no pointers: a node is an array position, and its
//! relatives are computed arithmetically. A live region of `span = 2^k - 1`
//! slots holds its root at `span / 2`; a node at position `p` whose children
//! head subtrees `offset` slots away sits between them (`p - offset` and
//! `p + offset`), and the offset halves with each level of descent. In-order
//! array traversal is therefore in-order tree traversal.
//!
//! All functions here are pure; bounds are the caller's contract.

/// Position of the left child of `pos` given the current child offset.
#[inline]
#[must_use]
pub const fn left_of(pos: usize, offset: usize) -> usize {
    pos - offset
}

/// Position of the right child of `pos` given the current child offset.
#[inline]
#[must_use]
pub const fn right_of(pos: usize, offset: usize) -> usize {
    pos + offset
}

/// Root position of a live region of `span` slots.
#[inline]
#[must_use]
pub const fn root_of(span: usize) -> usize {
    span / 2
}

/// Child offset at the root of a region of `span` slots.
///
/// This is the distance from the root to either of its children; it halves
/// at each level. `root_offset(1) == 0`: a single-slot region is a leaf.
#[inline]
#[must_use]
pub const fn root_offset(span: usize) -> usize {
    (span + 1) / 4
}

/// Number of slots in the subtree headed by a node with child offset
/// `offset`: `1` for a leaf, `4 * offset - 1` otherwise.
#[inline]
#[must_use]
pub const fn subtree_span(offset: usize) -> usize {
    if offset == 0 { 1 } else { 4 * offset - 1 }
}

/// The split axis one level below a node splitting on `axis`, cycling
/// through `dims` dimensions.
#[inline]
#[must_use]
pub const fn next_axis(axis: usize, dims: usize) -> usize {
    (axis + 1) % dims
}

// ============================================================================
//  Tests
// ============================================================================
