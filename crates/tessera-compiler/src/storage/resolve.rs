//! Memoized allocations for one compilation run.

use indexmap::IndexMap;
use tessera_core::TypeStore;

use super::allocation::{Allocation, AllocationId};
use super::allocator;
use crate::analyze::DependencyOrder;
use crate::{CompileError, Result};

/// Allocations keyed by id, filled lazily and never invalidated.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AllocationCache {
    entries: IndexMap<AllocationId, Allocation>,
    in_progress: Vec<AllocationId>,
}

impl AllocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &AllocationId) -> Option<&Allocation> {
        self.entries.get(id)
    }

    /// Full layout of a type.
    pub fn get_type(&self, name: &str) -> Option<&Allocation> {
        self.get(&AllocationId::Type(name.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Allocations in the order they were computed.
    pub fn iter(&self) -> impl Iterator<Item = &Allocation> {
        self.entries.values()
    }

    /// Return the allocation for `id`, computing it on first request.
    pub fn ensure(&mut self, store: &TypeStore, id: &AllocationId) -> Result<&Allocation> {
        if !self.entries.contains_key(id) {
            if let Some(start) = self.in_progress.iter().position(|p| p == id) {
                let cycle = self.in_progress[start..]
                    .iter()
                    .map(|p| p.type_name().to_owned())
                    .collect();
                return Err(CompileError::CyclicDependency { cycle });
            }

            self.in_progress.push(id.clone());
            let result = allocator::allocate(self, store, id);
            self.in_progress.pop();
            self.entries.insert(id.clone(), result?);
        }
        Ok(&self.entries[id])
    }
}

/// Allocate every type of the store in dependency order.
///
/// Messages also get their bounced subset; contracts with an init
/// parameter list get an init allocation.
#[tracing::instrument(level = "debug", skip_all, fields(types = order.len()))]
pub fn resolve_allocations(store: &TypeStore, order: &DependencyOrder) -> Result<AllocationCache> {
    let mut cache = AllocationCache::new();
    for name in order.iter() {
        let Some(ty) = store.get(name) else {
            continue;
        };
        if !ty.kind.is_allocated() {
            continue;
        }

        cache.ensure(store, &AllocationId::Type(name.to_owned()))?;
        if ty.is_message() {
            cache.ensure(store, &AllocationId::Bounced(name.to_owned()))?;
        }
        if ty.is_contract() && ty.init.is_some() {
            cache.ensure(store, &AllocationId::Init(name.to_owned()))?;
        }
    }
    Ok(cache)
}
