//! Filepath: src/state.rs
//!
//! Per-slot occupancy state for the flat tree.
//!
//! Each slot in the tree carries a [`SlotState`] in a parallel byte array.
//! Besides marking a slot live or empty, the state encodes whether the
//! subtree rooted at the slot is *perfectly full* for the current tree
//! height. Fullness is tested against a single per-tree parity value (the
//! container's `full_state`) rather than a fixed constant: the parity flips
//! on every capacity doubling, which instantly demotes every previously-full
//! subtree without rewriting a single state byte. The newly deepened tree is
//! in fact no longer full at its new height, so the stale bytes are correct
//! by construction.

use std::ops::{Add, Not};

/// Occupancy tag of one slot, one byte per slot.
///
/// - `Invalid`: no live value in the slot.
/// - `Heads` / `Tails`: the slot is live and its subtree was perfectly full
///   when the byte was written; which of the two means "full *now*" is
///   decided by comparing against the container's current parity.
/// - `Unsure`: the slot is live but at least one descendant slot is empty.
///
/// `Heads`/`Tails` and `Invalid`/`Unsure` are complement pairs under [`Not`],
/// mirroring an XOR with `0x3` on the discriminant.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// Slot holds no live value.
    Invalid = 0x0,

    /// Live, subtree full under one parity.
    Heads = 0x1,

    /// Live, subtree full under the other parity.
    Tails = 0x2,

    /// Live, subtree known to have an empty descendant.
    Unsure = 0x3,
}

impl SlotState {
    /// Whether the slot holds a live value.
    #[inline]
    #[must_use]
    pub const fn is_live(self) -> bool {
        !matches!(self, Self::Invalid)
    }

    /// Merge two child states into the parent's state.
    ///
    /// Equal states propagate unchanged; differing states yield
    /// [`SlotState::Unsure`]. A parent whose children are both marked full
    /// under the current parity is itself full; any disagreement means a
    /// hole exists somewhere below.
    #[inline]
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        if self as u8 == other as u8 {
            self
        } else {
            Self::Unsure
        }
    }

    /// Complement: `Heads <-> Tails`, `Invalid <-> Unsure`.
    #[inline]
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Invalid => Self::Unsure,
            Self::Heads => Self::Tails,
            Self::Tails => Self::Heads,
            Self::Unsure => Self::Invalid,
        }
    }
}

impl Not for SlotState {
    type Output = Self;

    #[inline]
    fn not(self) -> Self {
        self.flipped()
    }
}

impl Add for SlotState {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.merge(rhs)
    }
}

// ============================================================================
//  Tests
// ============================================================================
