//! The type store: every resolved descriptor, indexed by name in declaration order.

use indexmap::IndexMap;

use crate::types::{ConstantDescriptor, TypeDescriptor};

// ============================================================================
// Deserialization Layer
// ============================================================================

/// Raw store as produced by the resolver.
#[derive(Debug, Clone, serde::Deserialize)]
struct RawStore {
    #[serde(default)]
    types: Vec<TypeDescriptor>,
    #[serde(default)]
    constants: Vec<ConstantDescriptor>,
    /// Native source files passed through untouched, as `(path, content)`.
    #[serde(default)]
    native_sources: Vec<(String, String)>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("malformed type store: {0}")]
    Json(#[from] serde_json::Error),
    #[error("type `{0}` is declared more than once")]
    DuplicateType(String),
}

// ============================================================================
// Store Layer
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeStore {
    types: IndexMap<String, TypeDescriptor>,
    constants: Vec<ConstantDescriptor>,
    native_sources: Vec<(String, String)>,
}

impl TypeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let raw: RawStore = serde_json::from_str(json)?;
        let mut store = Self::new();
        for ty in raw.types {
            store.insert(ty)?;
        }
        store.constants = raw.constants;
        store.native_sources = raw.native_sources;
        Ok(store)
    }

    pub fn insert(&mut self, ty: TypeDescriptor) -> Result<(), StoreError> {
        if self.types.contains_key(&ty.name) {
            return Err(StoreError::DuplicateType(ty.name));
        }
        self.types.insert(ty.name.clone(), ty);
        Ok(())
    }

    /// Chained insertion for fixtures; panics on duplicates.
    pub fn with(mut self, ty: TypeDescriptor) -> Self {
        assert!(
            !self.types.contains_key(&ty.name),
            "duplicate type `{}`",
            ty.name
        );
        self.types.insert(ty.name.clone(), ty);
        self
    }

    pub fn with_constant(mut self, constant: ConstantDescriptor) -> Self {
        self.constants.push(constant);
        self
    }

    pub fn with_native_source(mut self, path: impl Into<String>, code: impl Into<String>) -> Self {
        self.native_sources.push((path.into(), code.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TypeDescriptor> {
        self.types.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Descriptors in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TypeDescriptor> {
        self.types.values_mut()
    }

    pub fn constants(&self) -> &[ConstantDescriptor] {
        &self.constants
    }

    pub fn constants_mut(&mut self) -> &mut [ConstantDescriptor] {
        &mut self.constants
    }

    pub fn native_sources(&self) -> &[(String, String)] {
        &self.native_sources
    }
}
