//! Per-run compiler state.
//!
//! A [`CompilerContext`] is built once by [`CompilerContext::analyze`] and is
//! read-only afterwards. It owns the allocation cache, so two runs never share
//! state.

use tessera_core::{ConstEnv, ConstEvaluator, TypeStore};

use crate::Result;
use crate::analyze::{DependencyOrder, resolve_signatures, sort_types};
use crate::comptime::evaluate_store;
use crate::storage::{Allocation, AllocationCache, AllocationId, resolve_allocations};

#[derive(Debug, Clone)]
pub struct CompilerContext {
    store: TypeStore,
    constants: ConstEnv,
    order: DependencyOrder,
    allocations: AllocationCache,
}

impl CompilerContext {
    /// Evaluate, sort, sign and allocate every type of `store`.
    #[tracing::instrument(level = "debug", skip_all, fields(types = store.len()))]
    pub fn analyze(mut store: TypeStore, evaluator: &dyn ConstEvaluator) -> Result<Self> {
        let constants = evaluate_store(&mut store, evaluator)?;
        let order = sort_types(&store)?;
        let store = resolve_signatures(&store)?;
        let allocations = resolve_allocations(&store, &order)?;
        tracing::debug!(allocations = allocations.len(), "analysis complete");

        Ok(Self {
            store,
            constants,
            order,
            allocations,
        })
    }

    pub fn store(&self) -> &TypeStore {
        &self.store
    }

    /// Free-standing constants by name.
    pub fn constants(&self) -> &ConstEnv {
        &self.constants
    }

    pub fn order(&self) -> &DependencyOrder {
        &self.order
    }

    pub fn allocations(&self) -> &AllocationCache {
        &self.allocations
    }

    pub fn allocation(&self, id: &AllocationId) -> Option<&Allocation> {
        self.allocations.get(id)
    }
}
