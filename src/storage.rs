//! Filepath: src/storage.rs
//!
//! Backing storage for the flat tree: two parallel arrays.
//!
//! A [`Storage`] owns a value buffer and a state buffer of equal length,
//! allocated and released together. Values are manually initialized:
//! a slot's bytes are meaningful only while its parallel state byte is
//! live, which is the invariant every `unsafe` accessor here leans on.
//! The container above is responsible for dropping live values before the
//! buffers go away; [`Storage`] itself never runs value destructors.

use std::mem::MaybeUninit;

use crate::state::SlotState;

/// Parallel value/state buffers of identical capacity.
pub(crate) struct Storage<V> {
    values: Box<[MaybeUninit<V>]>,
    states: Box<[SlotState]>,
}

impl<V> Storage<V> {
    /// Empty storage with zero capacity. Does not allocate.
    pub(crate) fn empty() -> Self {
        Self {
            values: Box::new([]),
            states: Box::new([]),
        }
    }

    /// Allocate both buffers for `capacity` slots, all states Invalid.
    ///
    /// The caller rounds `capacity` to a tree shape first; this function
    /// allocates exactly what it is given.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let values: Vec<MaybeUninit<V>> =
            std::iter::repeat_with(MaybeUninit::uninit).take(capacity).collect();
        let states: Vec<SlotState> = vec![SlotState::Invalid; capacity];

        Self {
            values: values.into_boxed_slice(),
            states: states.into_boxed_slice(),
        }
    }

    /// Total slot capacity.
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.states.len()
    }

    /// State byte of slot `pos`.
    #[inline]
    pub(crate) fn state(&self, pos: usize) -> SlotState {
        self.states[pos]
    }

    /// Overwrite the state byte of slot `pos`.
    #[inline]
    pub(crate) fn set_state(&mut self, pos: usize, state: SlotState) {
        self.states[pos] = state;
    }

    /// Whether slot `pos` holds a live value.
    #[inline]
    pub(crate) fn is_live(&self, pos: usize) -> bool {
        self.states[pos].is_live()
    }

    /// Parallel views of the first `span` slots, for iteration.
    pub(crate) fn slices(&self, span: usize) -> (&[MaybeUninit<V>], &[SlotState]) {
        (&self.values[..span], &self.states[..span])
    }

    /// Borrow the value in slot `pos`.
    ///
    /// # Safety
    ///
    /// Slot `pos` must hold an initialized value (its state byte is live).
    #[inline]
    pub(crate) unsafe fn value(&self, pos: usize) -> &V {
        debug_assert!(self.is_live(pos), "read of dead slot {pos}");
        unsafe { self.values[pos].assume_init_ref() }
    }

    /// Move `value` into slot `pos` without dropping previous contents.
    ///
    /// The previous contents must already be dead or moved away; the caller
    /// updates the state byte separately.
    #[inline]
    pub(crate) fn write(&mut self, pos: usize, value: V) {
        self.values[pos].write(value);
    }

    /// Move the value out of slot `pos`.
    ///
    /// # Safety
    ///
    /// Slot `pos` must hold an initialized value, and the caller must mark
    /// the slot dead (or overwrite it) before it is ever read again.
    #[inline]
    pub(crate) unsafe fn take(&mut self, pos: usize) -> V {
        unsafe { self.values[pos].assume_init_read() }
    }

    /// Bitwise-move the value from slot `src` to slot `dst` within this
    /// buffer. `dst`'s previous contents must be dead or moved away.
    ///
    /// # Safety
    ///
    /// Slot `src` must hold an initialized value. Afterwards `src` is
    /// logically dead: the caller must update state bytes so it is either
    /// marked Invalid or overwritten before any further read.
    #[inline]
    pub(crate) unsafe fn relocate(&mut self, src: usize, dst: usize) {
        if src != dst {
            let v = unsafe { self.values[src].assume_init_read() };
            self.values[dst].write(v);
        }
    }

    /// Bitwise-move a value across buffers: from `src` in `self` to `dst`
    /// in `other`.
    ///
    /// # Safety
    ///
    /// Same contract as [`Storage::relocate`], with `src` in `self`.
    #[inline]
    pub(crate) unsafe fn relocate_into(&mut self, src: usize, other: &mut Self, dst: usize) {
        let v = unsafe { self.values[src].assume_init_read() };
        other.values[dst].write(v);
    }
}

// ============================================================================
//  Tests
// ============================================================================
