// SPDX-License-Identifier: MIT OR Apache-2.0

//! The capability mask: a fixed-width bitfield of fine-grained permissions
//! over catalog objects.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use serde::{Deserialize, Serialize};

/// Bitfield over the twelve capability flags.
///
/// Grant and deny masks are both expressed as a `PermMask`; combination rules
/// (deny-overrides-grant, local-overrides-inherited) live in the permission
/// resolver, this type only provides the set algebra.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermMask(u16);

impl PermMask {
    pub const NONE: Self = Self(0x0000);

    /// Read record info (title, description, details).
    pub const READ_RECORD: Self = Self(0x0001);
    /// Read structured metadata.
    pub const READ_METADATA: Self = Self(0x0002);
    /// Read raw data.
    pub const READ_DATA: Self = Self(0x0004);
    /// Write record info.
    pub const WRITE_RECORD: Self = Self(0x0008);
    /// Write structured metadata.
    pub const WRITE_METADATA: Self = Self(0x0010);
    /// Write raw data.
    pub const WRITE_DATA: Self = Self(0x0020);
    /// Find the object and view id, alias, title and owner.
    pub const LIST: Self = Self(0x0040);
    /// Link/unlink child objects (collections only).
    pub const LINK: Self = Self(0x0080);
    /// Create new child objects (collections only).
    pub const CREATE: Self = Self(0x0100);
    /// Delete the object.
    pub const DELETE: Self = Self(0x0200);
    /// View and set ACLs.
    pub const SHARE: Self = Self(0x0400);
    /// Lock the object.
    pub const LOCK: Self = Self(0x0800);

    /// All read flags.
    pub const READ_ALL: Self = Self(0x0007);
    /// All write flags.
    pub const WRITE_ALL: Self = Self(0x0038);
    /// Capabilities granted to everyone on a published (topic-bearing)
    /// object: list plus all read flags.
    pub const PUBLIC: Self = Self(0x0047);
    /// Every capability; the owner/admin bypass mask.
    pub const ALL: Self = Self(0x0fff);

    const FLAG_NAMES: [(u16, &'static str); 12] = [
        (0x0001, "read-record"),
        (0x0002, "read-metadata"),
        (0x0004, "read-data"),
        (0x0008, "write-record"),
        (0x0010, "write-metadata"),
        (0x0020, "write-data"),
        (0x0040, "list"),
        (0x0080, "link"),
        (0x0100, "create"),
        (0x0200, "delete"),
        (0x0400, "share"),
        (0x0800, "lock"),
    ];

    /// Create a mask from raw bits, rejecting bits outside the defined flags.
    pub const fn from_bits(bits: u16) -> Option<Self> {
        if bits & !Self::ALL.0 != 0 {
            None
        } else {
            Some(Self(bits))
        }
    }

    /// Raw bits of the mask.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// All bits of `other` are set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// At least one bit of `other` is set in `self`.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Bits of `self` with all bits of `other` cleared.
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for PermMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PermMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for PermMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for PermMask {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for PermMask {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0 & Self::ALL.0)
    }
}

impl fmt::Display for PermMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }

        let mut first = true;
        for (bits, name) in Self::FLAG_NAMES {
            if self.0 & bits != 0 {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

// Debug prints the flag list rather than raw bits; masks show up in test
// assertions and trace output constantly.
impl fmt::Debug for PermMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PermMask({})", self)
    }
}
