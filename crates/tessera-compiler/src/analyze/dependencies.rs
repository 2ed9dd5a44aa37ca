//! Dependency ordering of type descriptors.
//!
//! Only inline containment (a `Struct(S)` field, in the field list or in
//! contract init parameters) is an edge. Optionals, maps and reference types
//! break cycles, so they add no edge, but the structs they name must exist.
//!
//! The order is a depth-first post-order over declaration order: every type
//! appears after everything it contains inline.

use indexmap::{IndexMap, IndexSet};
use tessera_core::{Field, TypeDescriptor, TypeKind, TypeStore};

use crate::{CompileError, Result};

/// Types in dependency order (dependencies first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyOrder {
    order: Vec<String>,
}

impl DependencyOrder {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.order
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Sort all types of the store, rejecting inline containment cycles.
#[tracing::instrument(level = "debug", skip_all, fields(types = store.len()))]
pub fn sort_types(store: &TypeStore) -> Result<DependencyOrder> {
    let adj = build_edges(store)?;
    let order = TopoSorter::sort(&adj)?;
    tracing::debug!(order = ?order, "dependency order");
    Ok(DependencyOrder { order })
}

fn fields_of(ty: &TypeDescriptor) -> impl Iterator<Item = &Field> {
    ty.fields.iter().chain(ty.init.iter().flatten())
}

/// Inline edges per type, in declaration order of types and fields.
fn build_edges(store: &TypeStore) -> Result<IndexMap<&str, Vec<&str>>> {
    let mut adj = IndexMap::new();
    for ty in store.iter() {
        let mut targets = Vec::new();
        for field in fields_of(ty) {
            for referenced in field.ty.referenced_structs() {
                let known = store
                    .get(referenced)
                    .is_some_and(|t| matches!(t.kind, TypeKind::Struct | TypeKind::Message));
                if !known {
                    return Err(CompileError::UnresolvedType {
                        type_name: ty.name.clone(),
                        field: field.name.clone(),
                        referenced: referenced.to_owned(),
                    });
                }
            }
            if let Some(target) = field.ty.inline_struct() {
                targets.push(target);
            }
        }
        adj.insert(ty.name.as_str(), targets);
    }
    Ok(adj)
}

/// Three-colour depth-first search: `on_path` is grey, `visited` is black.
struct TopoSorter<'a, 'q> {
    adj: &'a IndexMap<&'q str, Vec<&'q str>>,
    visited: IndexSet<&'q str>,
    on_path: IndexMap<&'q str, usize>,
    path: Vec<&'q str>,
    order: Vec<String>,
}

impl<'a, 'q> TopoSorter<'a, 'q> {
    fn sort(adj: &'a IndexMap<&'q str, Vec<&'q str>>) -> Result<Vec<String>> {
        let mut sorter = Self {
            adj,
            visited: IndexSet::new(),
            on_path: IndexMap::new(),
            path: Vec::new(),
            order: Vec::with_capacity(adj.len()),
        };

        for name in adj.keys() {
            sorter.dfs(name)?;
        }
        Ok(sorter.order)
    }

    fn dfs(&mut self, current: &'q str) -> Result<()> {
        if self.visited.contains(current) {
            return Ok(());
        }

        self.on_path.insert(current, self.path.len());
        self.path.push(current);

        let adj = self.adj;
        for &target in adj.get(current).into_iter().flatten() {
            if let Some(&start) = self.on_path.get(target) {
                let cycle = self.path[start..].iter().map(|s| (*s).to_owned()).collect();
                return Err(CompileError::CyclicDependency { cycle });
            }
            self.dfs(target)?;
        }

        self.path.pop();
        self.on_path.swap_remove(current);
        self.visited.insert(current);
        self.order.push(current.to_owned());
        Ok(())
    }
}
