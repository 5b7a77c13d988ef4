//! Component signatures.
//!
//! A [`Signature`] is a fixed-width bitset with one bit per registered
//! component type. Bit *i* is set when the entity owns the component type that
//! was assigned index *i* at registration time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

use crate::component::ComponentType;

/// Maximum number of distinct component types a scene can register.
pub const MAX_COMPONENTS: usize = 64;

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Bitset of owned component types.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(u64);

impl Signature {
    /// The empty signature (no components).
    pub const EMPTY: Self = Self(0);

    /// Signature with only the bit for `ty` set.
    #[inline]
    pub fn of(ty: ComponentType) -> Self {
        Self(1u64 << ty.index())
    }

    /// Set the bit for `ty`.
    #[inline]
    pub fn set(&mut self, ty: ComponentType) {
        self.0 |= 1u64 << ty.index();
    }

    /// Clear the bit for `ty`.
    #[inline]
    pub fn clear(&mut self, ty: ComponentType) {
        self.0 &= !(1u64 << ty.index());
    }

    /// Whether the bit for `ty` is set.
    #[inline]
    pub fn contains(self, ty: ComponentType) -> bool {
        self.0 & (1u64 << ty.index()) != 0
    }

    /// `self ⊇ other`.
    #[inline]
    pub fn is_superset_of(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any bit is set in both signatures.
    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of component types in the signature.
    #[inline]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Raw bit representation.
    #[inline]
    pub fn bits(self) -> u64 {
        self.0
    }

    /// Iterate the component types whose bits are set, lowest index first.
    pub fn iter(self) -> impl Iterator<Item = ComponentType> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let idx = bits.trailing_zeros();
            bits &= bits - 1;
            Some(ComponentType(idx as u8))
        })
    }
}

impl BitOr for Signature {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Signature {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Signature {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for Signature {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({:#b})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
