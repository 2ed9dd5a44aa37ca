//! High-level pipeline facade.
//!
//! ```ignore
//! let artifact = Session::new(store).compile(&CompileOptions::new("Wallet"))?;
//! ```

use tessera_core::{ConstEvaluator, LiteralEvaluator, TypeStore};

use crate::abi::{ContentAddresser, Crc32Addresser};
use crate::generator::{Emitter, FuncEmitter, ProgramArtifact, write_program};
use crate::{CompileError, CompileOptions, CompilerContext, Result};

/// A type store together with the pluggable pieces of the pipeline.
pub struct Session {
    store: TypeStore,
    evaluator: Box<dyn ConstEvaluator>,
    emitter: Box<dyn Emitter>,
    addresser: Box<dyn ContentAddresser>,
}

impl Session {
    pub fn new(store: TypeStore) -> Self {
        Self {
            store,
            evaluator: Box::new(LiteralEvaluator),
            emitter: Box::new(FuncEmitter),
            addresser: Box::new(Crc32Addresser),
        }
    }

    pub fn evaluator(mut self, evaluator: impl ConstEvaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    pub fn emitter(mut self, emitter: impl Emitter + 'static) -> Self {
        self.emitter = Box::new(emitter);
        self
    }

    pub fn addresser(mut self, addresser: impl ContentAddresser + 'static) -> Self {
        self.addresser = Box::new(addresser);
        self
    }

    pub fn store(&self) -> &TypeStore {
        &self.store
    }

    /// Run every analysis pass over a copy of the store.
    pub fn analyze(&self) -> Result<CompilerContext> {
        CompilerContext::analyze(self.store.clone(), self.evaluator.as_ref())
    }

    /// Full pipeline. The entry contract is checked before any allocation work.
    #[tracing::instrument(level = "debug", skip_all, fields(entry = %options.entry()))]
    pub fn compile(&self, options: &CompileOptions) -> Result<ProgramArtifact> {
        if !self.store.get(options.entry()).is_some_and(|t| t.is_contract()) {
            return Err(CompileError::UnknownEntryType(options.entry().to_owned()));
        }
        let ctx = self.analyze()?;
        write_program(&ctx, options, self.emitter.as_ref(), self.addresser.as_ref())
    }
}
