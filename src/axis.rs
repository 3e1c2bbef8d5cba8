//! Filepath: src/axis.rs
//!
//! The axis-comparison capability injected into the tree.
//!
//! The container never inspects a value directly; it asks an [`AxisIndex`]
//! whether one value precedes another along a given axis. The capability is
//! a compile-time parameter of the tree, so dispatch is static and a
//! zero-sized index costs nothing inside the container.
//!
//! Two adapter shapes are provided:
//!
//! - [`AxisFn`] wraps a single combined predicate `(axis, &a, &b) -> bool`;
//! - [`CoordIndex`] composes a per-axis coordinate accessor (the
//!   [`Coordinates`] trait on the value type) with the coordinate's
//!   `PartialOrd`.
//!
//! Either way the tree only ever consumes the combined form.

use std::marker::PhantomData;

/// Capability bundle: a static dimension count and a per-axis ordering.
///
/// # Contract
///
/// `axis_less(d, ..)` must be a strict weak ordering along axis `d` for
/// every `d < DIMS`. Lookups and erasure treat two values as equal when
/// *neither* precedes the other on *every* axis, so the supplied ordering
/// decides what "the same value" means.
pub trait AxisIndex {
    /// The value type being indexed.
    type Value;

    /// Number of ordered coordinates per value. Must be at least 1.
    const DIMS: usize;

    /// Whether `a` strictly precedes `b` along `axis` (`axis < DIMS`).
    fn axis_less(&self, axis: usize, a: &Self::Value, b: &Self::Value) -> bool;
}

// ============================================================================
//  Combined predicate adapter
// ============================================================================

/// [`AxisIndex`] built from one combined comparison closure.
///
/// ```
/// use kdflat::axis::{AxisFn, AxisIndex};
///
/// struct City { lat: f32, lon: f32 }
///
/// let index = AxisFn::<City, _, 2>::new(|axis, a: &City, b: &City| match axis {
///     0 => a.lat < b.lat,
///     _ => a.lon < b.lon,
/// });
/// let (p, q) = (City { lat: 1.0, lon: 9.0 }, City { lat: 2.0, lon: 3.0 });
/// assert!(index.axis_less(0, &p, &q));
/// assert!(!index.axis_less(1, &p, &q));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct AxisFn<V, F, const K: usize> {
    cmp: F,
    _value: PhantomData<fn(&V)>,
}

impl<V, F, const K: usize> AxisFn<V, F, K>
where
    F: Fn(usize, &V, &V) -> bool,
{
    /// Wrap a combined predicate as an index over `K` dimensions.
    #[must_use]
    pub const fn new(cmp: F) -> Self {
        Self {
            cmp,
            _value: PhantomData,
        }
    }
}

impl<V, F, const K: usize> AxisIndex for AxisFn<V, F, K>
where
    F: Fn(usize, &V, &V) -> bool,
{
    type Value = V;

    const DIMS: usize = K;

    #[inline]
    fn axis_less(&self, axis: usize, a: &V, b: &V) -> bool {
        (self.cmp)(axis, a, b)
    }
}

// ============================================================================
//  Accessor adapter
// ============================================================================

/// Per-axis coordinate accessor, implemented on the value type itself.
///
/// Composing this with the coordinate's `PartialOrd` yields an
/// [`AxisIndex`] via [`CoordIndex`]; arrays of `Copy + PartialOrd` elements
/// implement it out of the box.
pub trait Coordinates {
    /// One coordinate of the value.
    type Coord: PartialOrd;

    /// Number of coordinates. Must be at least 1.
    const DIMS: usize;

    /// The coordinate of `self` along `axis` (`axis < DIMS`).
    fn coord(&self, axis: usize) -> Self::Coord;
}

impl<T: Copy + PartialOrd, const K: usize> Coordinates for [T; K] {
    type Coord = T;

    const DIMS: usize = K;

    #[inline]
    fn coord(&self, axis: usize) -> T {
        self[axis]
    }
}

/// Zero-sized [`AxisIndex`] over any [`Coordinates`] value.
///
/// ```
/// use kdflat::axis::{AxisIndex, CoordIndex};
///
/// let index = CoordIndex::<[i32; 2]>::default();
/// assert!(index.axis_less(1, &[5, 1], &[0, 2]));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct CoordIndex<V> {
    _value: PhantomData<fn(&V)>,
}

impl<V> Default for CoordIndex<V> {
    fn default() -> Self {
        Self {
            _value: PhantomData,
        }
    }
}

impl<V: Coordinates> AxisIndex for CoordIndex<V> {
    type Value = V;

    const DIMS: usize = V::DIMS;

    #[inline]
    fn axis_less(&self, axis: usize, a: &V, b: &V) -> bool {
        a.coord(axis) < b.coord(axis)
    }
}

// ============================================================================
//  Tests
// ============================================================================
