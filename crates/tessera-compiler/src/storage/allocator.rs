//! Greedy first-fit cell allocator.
//!
//! Fields are placed in declaration order; a field that does not fit the
//! current cell opens the next one. Fields are never split or reordered.
//!
//! Costs:
//! - value types take their fixed width (varints their maximum width)
//! - `Cell`, `Slice`, `Builder`, `String` take one reference slot
//! - maps and optional structs/references take a presence bit and a reference
//! - other optionals take a presence bit plus the inner cost, boxed only when
//!   that cannot fit a cell
//! - nested structs take their first cell inline or a single reference boxed

use tessera_cell::{
    ADDRESS_BITS, CellSize, DefaultValue, FieldOp, MAX_CELL_BITS, RefKind, USABLE_CELL_REFS,
};
use tessera_core::{Field, FieldType, TypeStore};

use super::allocation::{Allocation, AllocationCell, AllocationId, reserved_bits};
use super::resolve::AllocationCache;
use crate::{CompileError, Result};

/// A field type lowered to its serialization op, before placement.
enum Lowered {
    Fixed {
        op: FieldOp,
        size: CellSize,
        /// What must fit an empty cell: the size itself, or the boxed payload.
        payload: CellSize,
    },
    /// Nested struct; inline or boxed depending on the current cell.
    Nested(String),
}

impl Lowered {
    fn fixed(op: FieldOp, size: CellSize) -> Self {
        Self::Fixed {
            op,
            size,
            payload: size,
        }
    }
}

fn lower(ty: &FieldType) -> Lowered {
    match ty {
        FieldType::Int { format } => {
            Lowered::fixed(FieldOp::Int(*format), CellSize::bits(format.max_bits()))
        }
        FieldType::Bool => Lowered::fixed(FieldOp::Bool, CellSize::bits(1)),
        FieldType::Address => Lowered::fixed(FieldOp::Address, CellSize::bits(ADDRESS_BITS)),
        FieldType::Bits { bits } => Lowered::fixed(FieldOp::Bits(*bits), CellSize::bits(*bits)),
        FieldType::Cell => Lowered::fixed(FieldOp::Ref(RefKind::Cell), CellSize::refs(1)),
        FieldType::Slice => Lowered::fixed(FieldOp::Ref(RefKind::Slice), CellSize::refs(1)),
        FieldType::Builder => Lowered::fixed(FieldOp::Ref(RefKind::Builder), CellSize::refs(1)),
        FieldType::String => Lowered::fixed(FieldOp::Ref(RefKind::String), CellSize::refs(1)),
        FieldType::Map { .. } => Lowered::fixed(FieldOp::Dict, CellSize::new(1, 1)),
        FieldType::Struct { name } => Lowered::Nested(name.clone()),
        FieldType::Optional { inner } => lower_optional(inner),
    }
}

fn lower_optional(inner: &FieldType) -> Lowered {
    let presence_and_ref = CellSize::new(1, 1);

    match lower(inner) {
        // Dictionaries already encode absence.
        Lowered::Fixed {
            op: FieldOp::Dict, ..
        } => Lowered::fixed(FieldOp::Dict, presence_and_ref),
        // A presence bit next to the reference slot.
        Lowered::Fixed {
            op: op @ FieldOp::Ref(_),
            ..
        } => Lowered::fixed(FieldOp::optional(op, false), presence_and_ref),
        Lowered::Fixed { op, size, payload } => {
            let inline = CellSize::bits(1) + size;
            if inline.fits_cell() {
                Lowered::Fixed {
                    op: FieldOp::optional(op, false),
                    size: inline,
                    payload: CellSize::bits(1) + payload,
                }
            } else {
                Lowered::Fixed {
                    op: FieldOp::optional(op, true),
                    size: presence_and_ref,
                    payload,
                }
            }
        }
        Lowered::Nested(name) => Lowered::fixed(
            FieldOp::optional(FieldOp::Struct { name, boxed: false }, true),
            presence_and_ref,
        ),
    }
}

pub(super) fn check_payload(type_name: &str, field: &str, payload: CellSize) -> Result<()> {
    if payload.bits > MAX_CELL_BITS {
        return Err(CompileError::FieldTooLarge {
            type_name: type_name.to_owned(),
            field: field.to_owned(),
            bits: payload.bits,
        });
    }
    if payload.refs > USABLE_CELL_REFS {
        return Err(CompileError::AllocationLimitExceeded {
            type_name: type_name.to_owned(),
            field: field.to_owned(),
        });
    }
    Ok(())
}

/// Nested struct references, optional or not, must name a known type.
fn check_resolved(store: &TypeStore, type_name: &str, field: &Field) -> Result<()> {
    let mut ty = &field.ty;
    while let FieldType::Optional { inner } = ty {
        ty = inner;
    }
    match ty {
        FieldType::Struct { name } if !store.contains(name) => Err(CompileError::UnresolvedType {
            type_name: type_name.to_owned(),
            field: field.name.clone(),
            referenced: name.clone(),
        }),
        _ => Ok(()),
    }
}

/// Compute the allocation for `id`, pulling nested layouts through the cache.
#[tracing::instrument(level = "debug", skip_all, fields(id = %id))]
pub(crate) fn allocate(
    cache: &mut AllocationCache,
    store: &TypeStore,
    id: &AllocationId,
) -> Result<Allocation> {
    let name = id.type_name();
    let ty = store
        .get(name)
        .ok_or_else(|| CompileError::UnknownEntryType(name.to_owned()))?;

    let fields: &[Field] = match id {
        AllocationId::Type(_) => &ty.fields,
        AllocationId::Init(_) => ty.init.as_deref().unwrap_or(&[]),
        AllocationId::Bounced(_) => {
            let full = cache.ensure(store, &AllocationId::Type(name.to_owned()))?;
            return Ok(bounced(full, id.clone(), &ty.fields));
        }
    };

    let reserved = reserved_bits(id, ty.kind);
    let header = match id {
        AllocationId::Type(_) if ty.is_message() => ty.header_value,
        _ => None,
    };

    let mut cells = vec![AllocationCell::new(reserved)];
    for field in fields {
        check_resolved(store, name, field)?;
        let last = cells.len() - 1;
        let (op, size, payload) = match lower(&field.ty) {
            Lowered::Fixed { op, size, payload } => (op, size, payload),
            Lowered::Nested(nested) => {
                let (inline, must_box) = {
                    let n = cache.ensure(store, &AllocationId::Type(nested.clone()))?;
                    (n.first_cell_size(), n.is_boxed_when_nested())
                };
                let current = &cells[last];
                let boxed = must_box
                    || (!current.can_fit(inline) && current.can_fit(CellSize::refs(1)));
                if boxed {
                    tracing::debug!(field = %field.name, nested = %nested, "boxing nested struct");
                    let size = CellSize::refs(1);
                    (
                        FieldOp::Struct {
                            name: nested,
                            boxed: true,
                        },
                        size,
                        size,
                    )
                } else {
                    (
                        FieldOp::Struct {
                            name: nested,
                            boxed: false,
                        },
                        inline,
                        inline,
                    )
                }
            }
        };

        check_payload(name, &field.name, payload)?;

        if !cells[last].can_fit(size) {
            check_payload(name, &field.name, size)?;
            tracing::debug!(
                field = %field.name,
                cell = cells.len(),
                "field does not fit, opening next cell"
            );
            cells.push(AllocationCell::new(0));
        }

        let current = cells.len() - 1;
        tracing::trace!(
            field = %field.name,
            cell = current,
            bits = size.bits,
            refs = size.refs,
            "placed"
        );
        cells[current].place(&field.name, op, size);
    }

    let field_names = fields.iter().map(|f| f.name.clone()).collect();
    Ok(Allocation::new(
        id.clone(),
        reserved,
        header,
        cells,
        field_names,
        Vec::new(),
    ))
}

/// Leading reference-free fields of cell 0; everything after the first
/// omission falls back to a default.
fn bounced(full: &Allocation, id: AllocationId, fields: &[Field]) -> Allocation {
    let mut cell = AllocationCell::new(full.reserved());
    if let Some(first) = full.cells().first() {
        for p in first.placements.iter().take_while(|p| p.refs == 0) {
            cell.place(&p.field, p.op.clone(), p.size());
        }
    }

    let kept = cell.placements.len();
    let omitted = fields
        .iter()
        .skip(kept)
        .map(|f| (f.name.clone(), default_value(&f.ty)))
        .collect();

    Allocation::new(
        id,
        full.reserved(),
        full.header(),
        vec![cell],
        fields.iter().map(|f| f.name.clone()).collect(),
        omitted,
    )
}

fn default_value(ty: &FieldType) -> DefaultValue {
    match ty {
        FieldType::Int { .. } => DefaultValue::Zero,
        FieldType::Bool => DefaultValue::False,
        _ => DefaultValue::Null,
    }
}
