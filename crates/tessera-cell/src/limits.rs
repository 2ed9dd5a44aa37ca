//! Platform capacity limits.

use std::ops::Add;

pub const MAX_CELL_BITS: u16 = 1023;
pub const MAX_CELL_REFS: u8 = 4;

/// Reference slots kept free in every cell for the continuation link.
pub const CHAIN_RESERVED_REFS: u8 = 1;

/// Reference slots available to fields.
pub const USABLE_CELL_REFS: u8 = MAX_CELL_REFS - CHAIN_RESERVED_REFS;

/// Message discriminator width.
pub const HEADER_BITS: u16 = 32;

/// `addr_std$10 anycast:(Maybe Anycast) workchain_id:int8 address:bits256`.
pub const ADDRESS_BITS: u16 = 267;

/// Exit code thrown by a with-opcode parser on a discriminator mismatch.
pub const OPCODE_MISMATCH_EXIT_CODE: u32 = 129;

/// Bytes of string data per snake cell.
pub const STRING_CHUNK_BYTES: usize = 127;

/// Bits and references consumed by a field or a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CellSize {
    pub bits: u16,
    pub refs: u8,
}

impl CellSize {
    pub const ZERO: Self = Self { bits: 0, refs: 0 };

    pub const fn new(bits: u16, refs: u8) -> Self {
        Self { bits, refs }
    }

    pub const fn bits(bits: u16) -> Self {
        Self { bits, refs: 0 }
    }

    pub const fn refs(refs: u8) -> Self {
        Self { bits: 0, refs }
    }

    /// Whether this size fits a cell's field budget.
    pub fn fits_cell(self) -> bool {
        self.bits <= MAX_CELL_BITS && self.refs <= USABLE_CELL_REFS
    }
}

impl Add for CellSize {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            bits: self.bits.saturating_add(rhs.bits),
            refs: self.refs.saturating_add(rhs.refs),
        }
    }
}
