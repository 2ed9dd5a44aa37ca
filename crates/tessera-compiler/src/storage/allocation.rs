//! Layout descriptors: where every field of a type lands in its cell chain.
//!
//! An [`Allocation`] is immutable once computed. Cell 0 starts with the
//! reserved prefix (message header, contract initialized flag); each later
//! cell hangs off the last reference slot of its predecessor.

use std::fmt::{self, Write as _};

use indexmap::IndexMap;
use tessera_core::TypeKind;
use tessera_cell::{
    CellSize, DefaultValue, FieldOp, HEADER_BITS, MAX_CELL_BITS, USABLE_CELL_REFS, names,
};

/// Key of a memoized allocation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AllocationId {
    /// Full layout of a struct, message or contract.
    Type(String),
    /// First-cell subset of a message, as seen by a bounce handler.
    Bounced(String),
    /// Contract init arguments.
    Init(String),
}

impl AllocationId {
    pub fn type_name(&self) -> &str {
        match self {
            Self::Type(name) | Self::Bounced(name) | Self::Init(name) => name,
        }
    }

    /// Name used in procedure identifiers (`$Name$_store`).
    pub fn procedure_type(&self) -> String {
        match self {
            Self::Init(name) => names::init_id(name),
            Self::Type(name) | Self::Bounced(name) => name.clone(),
        }
    }
}

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(name) => f.write_str(name),
            Self::Bounced(name) => write!(f, "{name} (bounced)"),
            Self::Init(name) => write!(f, "{name} (init)"),
        }
    }
}

/// A field placed within a cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub field: String,
    pub op: FieldOp,
    pub bit_offset: u16,
    pub bits: u16,
    /// First reference slot the field occupies.
    pub ref_offset: u8,
    pub refs: u8,
}

impl Placement {
    pub fn size(&self) -> CellSize {
        CellSize::new(self.bits, self.refs)
    }
}

/// One physical cell of a chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocationCell {
    pub placements: Vec<Placement>,
    /// Bits and field references used, reserved prefix included.
    pub used: CellSize,
}

impl AllocationCell {
    pub(crate) fn new(reserved_bits: u16) -> Self {
        Self {
            placements: Vec::new(),
            used: CellSize::bits(reserved_bits),
        }
    }

    pub fn free(&self) -> CellSize {
        CellSize::new(
            MAX_CELL_BITS - self.used.bits,
            USABLE_CELL_REFS - self.used.refs,
        )
    }

    pub fn can_fit(&self, size: CellSize) -> bool {
        (self.used + size).fits_cell()
    }

    pub(crate) fn place(&mut self, field: &str, op: FieldOp, size: CellSize) {
        self.placements.push(Placement {
            field: field.to_owned(),
            op,
            bit_offset: self.used.bits,
            bits: size.bits,
            ref_offset: self.used.refs,
            refs: size.refs,
        });
        self.used = self.used + size;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub(crate) id: AllocationId,
    pub(crate) reserved: u16,
    pub(crate) header: Option<u32>,
    pub(crate) cells: Vec<AllocationCell>,
    /// Every field of the source type in declaration order.
    pub(crate) fields: Vec<String>,
    /// Fields a bounced parser cannot reach, with the value it assigns.
    pub(crate) omitted: Vec<(String, DefaultValue)>,
    pub(crate) lookup: IndexMap<String, (usize, usize)>,
    pub(crate) boxed_when_nested: bool,
}

/// Nested structs whose first cell exceeds this are stored behind a reference.
pub const INLINE_STRUCT_MAX_BITS: u16 = 767;

impl Allocation {
    pub(crate) fn new(
        id: AllocationId,
        reserved: u16,
        header: Option<u32>,
        cells: Vec<AllocationCell>,
        fields: Vec<String>,
        omitted: Vec<(String, DefaultValue)>,
    ) -> Self {
        let mut lookup = IndexMap::new();
        for (ci, cell) in cells.iter().enumerate() {
            for (pi, placement) in cell.placements.iter().enumerate() {
                lookup.insert(placement.field.clone(), (ci, pi));
            }
        }
        let boxed_when_nested =
            cells.len() > 1 || cells.first().is_some_and(|c| c.used.bits > INLINE_STRUCT_MAX_BITS);
        Self {
            id,
            reserved,
            header,
            cells,
            fields,
            omitted,
            lookup,
            boxed_when_nested,
        }
    }

    pub fn id(&self) -> &AllocationId {
        &self.id
    }

    /// Reserved prefix bits at the start of cell 0.
    pub fn reserved(&self) -> u16 {
        self.reserved
    }

    pub fn header(&self) -> Option<u32> {
        self.header
    }

    pub fn cells(&self) -> &[AllocationCell] {
        &self.cells
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn omitted(&self) -> &[(String, DefaultValue)] {
        &self.omitted
    }

    /// Cell index and placement of a field.
    pub fn placement(&self, field: &str) -> Option<(usize, &Placement)> {
        let &(ci, pi) = self.lookup.get(field)?;
        Some((ci, &self.cells[ci].placements[pi]))
    }

    /// Inline placements of a cell (fields that use bits and no references).
    pub fn inline_fields(&self, cell: usize) -> impl Iterator<Item = &Placement> {
        self.cells
            .get(cell)
            .into_iter()
            .flat_map(|c| c.placements.iter())
            .filter(|p| p.refs == 0)
    }

    /// Placements of a cell that occupy reference slots.
    pub fn ref_fields(&self, cell: usize) -> impl Iterator<Item = &Placement> {
        self.cells
            .get(cell)
            .into_iter()
            .flat_map(|c| c.placements.iter())
            .filter(|p| p.refs > 0)
    }

    /// Index of the cell following `cell`, if the chain continues.
    pub fn next(&self, cell: usize) -> Option<usize> {
        (cell + 1 < self.cells.len()).then_some(cell + 1)
    }

    pub fn is_boxed_when_nested(&self) -> bool {
        self.boxed_when_nested
    }

    /// Size of cell 0 as seen by a containing struct, continuation link included.
    pub fn first_cell_size(&self) -> CellSize {
        let used = self.cells.first().map_or(CellSize::ZERO, |c| c.used);
        match self.next(0) {
            Some(_) => used + CellSize::refs(1),
            None => used,
        }
    }

    pub fn total_bits(&self) -> u32 {
        self.cells.iter().map(|c| u32::from(c.used.bits)).sum()
    }

    /// Field references plus continuation links.
    pub fn total_refs(&self) -> u32 {
        let field_refs: u32 = self.cells.iter().map(|c| u32::from(c.used.refs)).sum();
        field_refs + self.cells.len().saturating_sub(1) as u32
    }

    /// Stable text form used by snapshot tests.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "{}", self.id);
        if let Some(header) = self.header {
            let _ = write!(out, " header=0x{header:08x}");
        }
        if self.reserved > 0 {
            let _ = write!(out, " reserved={}", self.reserved);
        }
        if self.boxed_when_nested {
            out.push_str(" boxed");
        }
        for (ci, cell) in self.cells.iter().enumerate() {
            let _ = write!(
                out,
                "\n  cell {ci}: {} bits, {} refs",
                cell.used.bits, cell.used.refs
            );
            for p in &cell.placements {
                let _ = write!(out, "\n    {} {}", p.field, p.op);
                if p.bits > 0 {
                    let _ = write!(out, " @{}+{}", p.bit_offset, p.bits);
                }
                if p.refs > 0 {
                    let _ = write!(out, " ref{}", p.ref_offset);
                }
            }
            if self.next(ci).is_some() {
                let _ = write!(out, "\n    -> cell {}", ci + 1);
            }
        }
        for (field, value) in &self.omitted {
            let _ = write!(out, "\n  omitted {field} = {value:?}");
        }
        out
    }
}

/// Bits reserved at the start of cell 0.
///
/// Messages carry their header; contract data and init data start with the
/// initialized flag.
pub(crate) fn reserved_bits(id: &AllocationId, kind: TypeKind) -> u16 {
    match (id, kind) {
        (AllocationId::Init(_), _) => 1,
        (_, TypeKind::Message) => HEADER_BITS,
        (_, TypeKind::Contract) => 1,
        _ => 0,
    }
}
