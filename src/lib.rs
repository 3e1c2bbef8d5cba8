//! # kdflat
//!
//! A k-dimensional search index stored as an implicit, always-balanced
//! binary tree in one contiguous flat array.
//!
//! The tree stores no pointers: parent/child relationships are computed
//! from array offsets, the root of a `2^k - 1`-slot region sits in the
//! middle, and in-order array traversal is in-order tree traversal.
//!
//! ## Design
//!
//! - **Pointer-free layout**: geometry is arithmetic ([`layout`]), so a
//!   node costs exactly one value plus one state byte.
//! - **Rotating insertion**: when a subtree on the descent path is already
//!   perfectly full, the insert rotates values through the sibling subtree
//!   via per-axis extrema instead of deepening, keeping the tree perfectly
//!   balanced after every insert.
//! - **Interleaved doubling**: growth moves position `i` to `2i + 1`,
//!   opening a fresh leaf layer in the even slots in O(n) without
//!   reshuffling the tree order. A per-tree parity bit re-labels every
//!   "perfectly full" subtree marker on resize for free ([`state`]).
//!
//! Value types stay opaque: the tree only consults an injected
//! [`AxisIndex`] capability for per-axis ordering ([`axis`]).
//!
//! ## Example
//!
//! ```
//! use kdflat::{CoordIndex, KdTree};
//!
//! let mut tree: KdTree<CoordIndex<[i64; 2]>> = KdTree::with_capacity(100);
//! tree.insert([2, 3]);
//! tree.insert([5, 4]);
//! tree.insert([9, 6]);
//! tree.insert([4, 7]);
//!
//! assert_eq!(tree.capacity(), 127);
//! assert_eq!(tree.find(&[5, 4]), Some(&[5, 4]));
//! assert_eq!(tree.max_on_axis(1), Some(&[4, 7]));
//! assert_eq!(tree.remove(&[2, 3]), 1);
//! assert_eq!(tree.len(), 3);
//! ```
//!
//! Single-threaded by design: the tree has no interior mutability, and all
//! mutation requires `&mut`. Iterators are invalidated (by the borrow
//! checker) across any operation that changes the live region.

pub mod axis;
pub mod bits;
pub mod iter;
pub mod layout;
pub mod state;
pub mod tree;

mod extremum;
mod storage;
mod trace;

pub use axis::{AxisFn, AxisIndex, CoordIndex, Coordinates};
pub use iter::{Slot, Slots};
pub use state::SlotState;
pub use tree::KdTree;
