//! Cell allocation.
//!
//! Packs each type's ordered fields into a chain of cells within the platform
//! limits and records the result as an immutable [`Allocation`].

pub mod allocation;
mod allocator;
pub mod resolve;


pub use allocation::{
    Allocation, AllocationCell, AllocationId, INLINE_STRUCT_MAX_BITS, Placement,
};
pub use resolve::{AllocationCache, resolve_allocations};
