//! Cell data model.
//!
//! A [`Cell`] holds up to 1023 data bits and up to four references to child
//! cells. Cells are written with a [`CellBuilder`] and read back through a
//! [`CellSlice`] cursor. Bits are packed most significant first.

use std::fmt;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;
use tessera_core::{Address, IntFormat, VarWidth};

use crate::limits::{ADDRESS_BITS, MAX_CELL_BITS, MAX_CELL_REFS, STRING_CHUNK_BYTES};
use crate::{CellError, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: u16,
    refs: Vec<Cell>,
}

impl Cell {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bit_len(&self) -> u16 {
        self.bit_len
    }

    pub fn refs(&self) -> &[Cell] {
        &self.refs
    }

    pub fn bit(&self, index: u16) -> bool {
        bit_at(&self.data, index)
    }

    pub fn parse(&self) -> CellSlice<'_> {
        CellSlice {
            cell: self,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    /// Number of cells in the tree rooted here.
    pub fn tree_size(&self) -> usize {
        1 + self.refs.iter().map(Cell::tree_size).sum::<usize>()
    }

    /// Encodes a string as a snake chain: full chunks linked through the first reference.
    pub fn from_string(text: &str) -> Result<Self> {
        let bytes = text.as_bytes();
        let mut tail: Option<Cell> = None;
        for chunk in bytes.chunks(STRING_CHUNK_BYTES).rev() {
            let mut b = CellBuilder::new();
            for byte in chunk {
                b.store_uint(u128::from(*byte), 8)?;
            }
            if let Some(next) = tail.take() {
                b.store_ref(next)?;
            }
            tail = Some(b.end_cell());
        }
        Ok(tail.unwrap_or_default())
    }

    /// Reads a snake chain back into a string.
    pub fn read_string(&self) -> Result<String> {
        let mut bytes = Vec::new();
        let mut current = self;
        loop {
            let mut slice = current.parse();
            while slice.remaining_bits() >= 8 {
                // The guard keeps the value below 256.
                bytes.push(slice.load_uint(8)? as u8);
            }
            match current.refs.first() {
                Some(next) => current = next,
                None => break,
            }
        }
        String::from_utf8(bytes).map_err(|_| CellError::InvalidUtf8)
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:depth$}x{{{}}}", "", self.hex())?;
        for child in &self.refs {
            writeln!(f)?;
            child.fmt_tree(f, depth + 1)?;
        }
        Ok(())
    }

    /// Hex form of the data bits; an incomplete last nibble gets a completion tag and `_`.
    fn hex(&self) -> String {
        let mut bits: Vec<bool> = (0..self.bit_len).map(|i| self.bit(i)).collect();
        let partial = bits.len() % 4 != 0;
        if partial {
            bits.push(true);
            while bits.len() % 4 != 0 {
                bits.push(false);
            }
        }

        let mut out = String::with_capacity(bits.len() / 4 + 1);
        for nibble in bits.chunks(4) {
            let v = nibble.iter().fold(0u32, |acc, b| (acc << 1) | u32::from(*b));
            out.push(char::from_digit(v, 16).unwrap_or('0').to_ascii_uppercase());
        }
        if partial {
            out.push('_');
        }
        out
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

fn bit_at(data: &[u8], index: u16) -> bool {
    let byte = data[usize::from(index / 8)];
    byte & (0x80 >> (index % 8)) != 0
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: u16,
    refs: Vec<Cell>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bits_used(&self) -> u16 {
        self.bit_len
    }

    pub fn refs_used(&self) -> u8 {
        // Bounded by MAX_CELL_REFS.
        self.refs.len() as u8
    }

    pub fn end_cell(self) -> Cell {
        Cell {
            data: self.data,
            bit_len: self.bit_len,
            refs: self.refs,
        }
    }

    fn ensure_bits(&self, requested: u16) -> Result<()> {
        let available = MAX_CELL_BITS - self.bit_len;
        if requested > available {
            return Err(CellError::BitOverflow {
                requested,
                available,
            });
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let last = self.data.len() - 1;
            self.data[last] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<()> {
        self.ensure_bits(1)?;
        self.push_bit(bit);
        Ok(())
    }

    /// Machine-word store for headers, prefixes and bytes; wider values use
    /// [`CellBuilder::store_biguint`].
    pub fn store_uint(&mut self, value: u128, bits: u16) -> Result<()> {
        if bits < 128 && value >> bits != 0 {
            return Err(CellError::ValueOutOfRange { bits });
        }
        self.ensure_bits(bits)?;
        for i in (0..bits).rev() {
            self.push_bit(i < 128 && (value >> i) & 1 == 1);
        }
        Ok(())
    }

    pub fn store_int(&mut self, value: i128, bits: u16) -> Result<()> {
        if !fits_signed(value, bits) {
            return Err(CellError::ValueOutOfRange { bits });
        }
        self.ensure_bits(bits)?;
        for i in (0..bits).rev() {
            let bit = if i >= 128 {
                value < 0
            } else {
                (value >> i) & 1 == 1
            };
            self.push_bit(bit);
        }
        Ok(())
    }

    /// Two's complement store of an arbitrary-precision integer.
    pub fn store_bigint(&mut self, value: &BigInt, bits: u16) -> Result<()> {
        if bits == 0 || !IntFormat::Int(bits).fits(value) {
            return Err(CellError::ValueOutOfRange { bits });
        }
        self.ensure_bits(bits)?;
        let bytes = value.to_signed_bytes_be();
        let fill = if value.sign() == Sign::Minus { 0xff } else { 0 };
        self.push_right_aligned(&bytes, fill, bits);
        Ok(())
    }

    pub fn store_biguint(&mut self, value: &BigUint, bits: u16) -> Result<()> {
        if value.bits() > u64::from(bits) {
            return Err(CellError::ValueOutOfRange { bits });
        }
        self.ensure_bits(bits)?;
        self.push_right_aligned(&value.to_bytes_be(), 0, bits);
        Ok(())
    }

    /// Pushes the low `bits` bits of a big-endian byte string, extended with `fill`.
    fn push_right_aligned(&mut self, bytes: &[u8], fill: u8, bits: u16) {
        for i in (0..usize::from(bits)).rev() {
            let byte = bytes
                .len()
                .checked_sub(1 + i / 8)
                .map_or(fill, |at| bytes[at]);
            self.push_bit(byte & (1 << (i % 8)) != 0);
        }
    }

    /// `len:(## len_bits) value:(uint (len * 8))`.
    pub fn store_var_uint(&mut self, value: &BigUint, width: VarWidth) -> Result<()> {
        let len = u16::try_from(value.bits().div_ceil(8))
            .ok()
            .filter(|len| *len <= width.max_bytes())
            .ok_or(CellError::ValueOutOfRange {
                bits: 8 * width.max_bytes(),
            })?;
        self.ensure_bits(width.len_bits() + 8 * len)?;
        self.store_uint(u128::from(len), width.len_bits())?;
        self.store_biguint(value, 8 * len)
    }

    /// `len:(## len_bits) value:(int (len * 8))`.
    pub fn store_var_int(&mut self, value: &BigInt, width: VarWidth) -> Result<()> {
        let len = (0..=width.max_bytes())
            .find(|len| {
                if *len == 0 {
                    value.is_zero()
                } else {
                    IntFormat::Int(8 * len).fits(value)
                }
            })
            .ok_or(CellError::ValueOutOfRange {
                bits: 8 * width.max_bytes(),
            })?;
        self.ensure_bits(width.len_bits() + 8 * len)?;
        self.store_uint(u128::from(len), width.len_bits())?;
        if len > 0 {
            self.store_bigint(value, 8 * len)?;
        }
        Ok(())
    }

    /// Stores the first `bits` bits of `data`.
    pub fn store_bits(&mut self, data: &[u8], bits: u16) -> Result<()> {
        if usize::from(bits) > data.len() * 8 {
            return Err(CellError::ValueOutOfRange { bits });
        }
        self.ensure_bits(bits)?;
        for i in 0..bits {
            self.push_bit(bit_at(data, i));
        }
        Ok(())
    }

    pub fn store_ref(&mut self, cell: Cell) -> Result<()> {
        if self.refs.len() >= usize::from(MAX_CELL_REFS) {
            return Err(CellError::RefOverflow);
        }
        self.refs.push(cell);
        Ok(())
    }

    pub fn store_address(&mut self, address: &Address) -> Result<()> {
        self.ensure_bits(ADDRESS_BITS)?;
        self.store_uint(0b10, 2)?;
        self.store_bit(false)?;
        self.store_int(i128::from(address.workchain), 8)?;
        self.store_bits(&address.hash, 256)
    }
}

fn fits_signed(value: i128, bits: u16) -> bool {
    match bits {
        0 => false,
        128.. => true,
        _ => {
            let half = 1i128 << (bits - 1);
            (-half..half).contains(&value)
        }
    }
}

// ============================================================================
// Slice
// ============================================================================

/// Read cursor over a cell's bits and references.
#[derive(Clone, Copy, Debug)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_pos: u16,
    ref_pos: u8,
}

impl<'a> CellSlice<'a> {
    pub fn remaining_bits(&self) -> u16 {
        self.cell.bit_len - self.bit_pos
    }

    pub fn remaining_refs(&self) -> u8 {
        // Bounded by MAX_CELL_REFS.
        self.cell.refs.len() as u8 - self.ref_pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining_bits() == 0 && self.remaining_refs() == 0
    }

    fn take_bits(&mut self, bits: u16) -> Result<Vec<bool>> {
        let available = self.remaining_bits();
        if bits > available {
            return Err(CellError::Underflow {
                requested: bits,
                available,
            });
        }
        let out = (self.bit_pos..self.bit_pos + bits)
            .map(|i| self.cell.bit(i))
            .collect();
        self.bit_pos += bits;
        Ok(out)
    }

    pub fn load_bit(&mut self) -> Result<bool> {
        Ok(self.take_bits(1)?[0])
    }

    /// Fails on values above `u128`; see [`CellSlice::load_biguint`].
    pub fn load_uint(&mut self, bits: u16) -> Result<u128> {
        let raw = self.take_bits(bits)?;
        let split = raw.len().saturating_sub(128);
        if raw[..split].iter().any(|b| *b) {
            return Err(CellError::ValueOutOfRange { bits });
        }
        Ok(raw[split..]
            .iter()
            .fold(0u128, |acc, b| (acc << 1) | u128::from(*b)))
    }

    pub fn load_int(&mut self, bits: u16) -> Result<i128> {
        let raw = self.take_bits(bits)?;
        let Some(&sign) = raw.first() else {
            return Ok(0);
        };
        let split = raw.len().saturating_sub(128);
        let (prefix, tail) = raw.split_at(split);
        if prefix.iter().any(|b| *b != sign) || (split > 0 && tail[0] != sign) {
            return Err(CellError::ValueOutOfRange { bits });
        }
        let start: i128 = if sign { -1 } else { 0 };
        Ok(tail.iter().fold(start, |acc, b| (acc << 1) | i128::from(*b)))
    }

    pub fn load_bigint(&mut self, bits: u16) -> Result<BigInt> {
        let raw = self.take_bits(bits)?;
        let Some(&sign) = raw.first() else {
            return Ok(BigInt::zero());
        };
        Ok(BigInt::from_signed_bytes_be(&right_aligned(&raw, sign)))
    }

    pub fn load_biguint(&mut self, bits: u16) -> Result<BigUint> {
        let raw = self.take_bits(bits)?;
        Ok(BigUint::from_bytes_be(&right_aligned(&raw, false)))
    }

    pub fn load_var_uint(&mut self, width: VarWidth) -> Result<BigUint> {
        // The prefix is at most five bits wide.
        let len = self.load_uint(width.len_bits())? as u16;
        self.load_biguint(8 * len)
    }

    pub fn load_var_int(&mut self, width: VarWidth) -> Result<BigInt> {
        let len = self.load_uint(width.len_bits())? as u16;
        self.load_bigint(8 * len)
    }

    /// Loads `bits` bits, packed most significant first and zero padded to whole bytes.
    pub fn load_bits(&mut self, bits: u16) -> Result<Vec<u8>> {
        let raw = self.take_bits(bits)?;
        let mut out = vec![0u8; raw.len().div_ceil(8)];
        for (i, bit) in raw.iter().enumerate() {
            if *bit {
                out[i / 8] |= 0x80 >> (i % 8);
            }
        }
        Ok(out)
    }

    pub fn load_ref(&mut self) -> Result<&'a Cell> {
        let cell = self
            .cell
            .refs
            .get(usize::from(self.ref_pos))
            .ok_or(CellError::RefUnderflow)?;
        self.ref_pos += 1;
        Ok(cell)
    }

    pub fn load_address(&mut self) -> Result<Address> {
        if self.load_uint(2)? != 0b10 || self.load_bit()? {
            return Err(CellError::InvalidAddress);
        }
        // Eight-bit field.
        let workchain = self.load_int(8)? as i8;
        let bytes = self.load_bits(256)?;
        let hash: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CellError::InvalidAddress)?;
        Ok(Address { workchain, hash })
    }
}

/// Packs bits into whole bytes, padding the front with `fill`.
fn right_aligned(raw: &[bool], fill: bool) -> Vec<u8> {
    let pad = raw.len().div_ceil(8) * 8 - raw.len();
    let mut out = vec![0u8; raw.len().div_ceil(8)];
    let bits = std::iter::repeat_n(fill, pad).chain(raw.iter().copied());
    for (i, bit) in bits.enumerate() {
        if bit {
            out[i / 8] |= 0x80 >> (i % 8);
        }
    }
    out
}
