//! Output assembly.
//!
//! Procedures are generated per type in dependency order, registered once in a
//! [`WriterContext`], then grouped into files by their [`SectionTag`]:
//! headers, stdlib, native, constants, storage, code. The code file takes
//! every procedure no earlier file claimed.

use std::collections::HashSet;
use std::fmt::Write as _;

use serde::Serialize;
use tessera_cell::ProgramSet;
use tessera_core::{TypeDescriptor, TypeKind};

use super::accessors::write_accessors;
use super::constants::{ConstantOutput, constant_outputs, write_constants};
use super::contract::{write_contract_ops, write_init_data};
use super::emitter::{EmitInput, Emitter};
use super::render::TypeRenderer;
use super::serialization::{ParserMode, write_parser, write_serializer, write_wrappers};
use super::stdlib::write_stdlib;
use super::writer::{Modifier, SectionTag, WriterContext, WrittenFunction};
use crate::abi::{ContentAddresser, ContractAbi};
use crate::storage::AllocationId;
use crate::{CompileError, CompileOptions, CompilerContext, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutputFile {
    pub name: String,
    pub code: String,
}

/// Everything one compilation run produces.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgramArtifact {
    /// Name of the file holding the entry code.
    pub entrypoint: String,
    pub code: String,
    pub files: Vec<OutputFile>,
    pub constants: Vec<ConstantOutput>,
    pub abi: String,
    pub abi_link: String,
    /// Structured programs behind every serializer and parser.
    pub programs: ProgramSet,
}

impl ProgramArtifact {
    pub fn file(&self, name: &str) -> Option<&OutputFile> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// Look up the entry contract.
pub(crate) fn entry_contract<'a>(
    ctx: &'a CompilerContext,
    options: &CompileOptions,
) -> Result<&'a TypeDescriptor> {
    ctx.store()
        .get(options.entry())
        .filter(|t| t.is_contract())
        .ok_or_else(|| CompileError::UnknownEntryType(options.entry().to_owned()))
}

fn write_type(
    w: &mut WriterContext,
    ctx: &CompilerContext,
    types: &TypeRenderer<'_>,
    ty: &TypeDescriptor,
) {
    let name = &ty.name;
    let tag = SectionTag::Type(name.clone());
    let Some(full) = ctx.allocation(&AllocationId::Type(name.clone())) else {
        return;
    };

    let contract = ty.kind == TypeKind::Contract;
    write_serializer(w, types, full, &ty.fields, tag.clone(), contract);
    write_parser(w, types, full, &ty.fields, tag.clone(), ParserMode::WithOpcode, contract);
    write_parser(w, types, full, &ty.fields, tag.clone(), ParserMode::NoOpcode, contract);

    if contract {
        write_contract_ops(w, types, ty);
        let init_tag = SectionTag::TypeInit(name.clone());
        if let (Some(init), Some(params)) =
            (ctx.allocation(&AllocationId::Init(name.clone())), &ty.init)
        {
            write_serializer(w, types, init, params, init_tag.clone(), true);
            write_parser(w, types, init, params, init_tag, ParserMode::WithOpcode, true);
        }
        write_init_data(w, types, ty);
        return;
    }

    if let Some(bounced) = ctx.allocation(&AllocationId::Bounced(name.clone())) {
        write_parser(w, types, bounced, &ty.fields, tag.clone(), ParserMode::Bounced, false);
    }
    write_wrappers(w, types, name, &ty.fields, &tag);
    write_accessors(w, types, name, &ty.fields, &tag);
}

/// Generate every procedure of a run into a fresh writer.
#[tracing::instrument(level = "debug", skip_all, fields(entry = %options.entry()))]
pub(crate) fn write_procedures(
    ctx: &CompilerContext,
    options: &CompileOptions,
    abi_link: &str,
) -> Result<WriterContext> {
    entry_contract(ctx, options)?;
    let store = ctx.store();
    let types = TypeRenderer::new(store);

    let mut w = WriterContext::new();
    write_stdlib(&mut w);
    write_constants(&mut w, &types, store);

    for name in ctx.order().iter() {
        let Some(ty) = store.get(name) else {
            continue;
        };
        if ty.kind.is_allocated() {
            write_type(&mut w, ctx, &types, ty);
        }
    }

    w.add(
        WrittenFunction::new(
            "get_abi_link",
            "slice get_abi_link()",
            SectionTag::Untagged,
        )
        .modifier(Modifier::MethodId)
        .body(vec![format!("return \"{abi_link}\";")]),
    );

    Ok(w)
}

fn tagged<'a>(
    functions: &'a [WrittenFunction],
    tag: &'a SectionTag,
) -> impl Iterator<Item = &'a WrittenFunction> {
    functions.iter().filter(move |f| &f.context == tag)
}

/// Records the group's procedures as placed.
fn claim(placed: &mut HashSet<String>, group: Vec<WrittenFunction>) -> Vec<WrittenFunction> {
    placed.extend(group.iter().map(|f| f.name.clone()));
    group
}

fn emit_group(emitter: &dyn Emitter, header: Vec<String>, functions: Vec<WrittenFunction>) -> String {
    emitter.emit(&EmitInput {
        header,
        functions: &functions,
    })
}

fn storage_header(ty: &TypeDescriptor) -> Vec<String> {
    let mut lines = vec![";;".to_owned(), format!(";; Type: {}", ty.name)];
    if let Some(header) = ty.header_value {
        lines.push(format!(";; Header: 0x{header:08x}"));
    }
    if let Some(schema) = &ty.schema {
        lines.push(format!(";; TLB: {schema}"));
    }
    lines.push(";;".to_owned());
    lines
}

/// Compile the analyzed context into an artifact for `options.entry`.
#[tracing::instrument(level = "debug", skip_all, fields(entry = %options.entry()))]
pub fn write_program(
    ctx: &CompilerContext,
    options: &CompileOptions,
    emitter: &dyn Emitter,
    addresser: &dyn ContentAddresser,
) -> Result<ProgramArtifact> {
    let entry = entry_contract(ctx, options)?;
    let store = ctx.store();
    let abi = ContractAbi::build(store, &entry.name).render()?;
    let abi_link = addresser.link(&abi);

    let writer = write_procedures(ctx, options, &abi_link)?;
    let functions = writer.extract(options.debug);
    let prefix = options.file_prefix();
    let mut files = Vec::new();
    let mut placed = HashSet::new();

    files.push(OutputFile {
        name: format!("{prefix}.headers.fc"),
        code: emitter.declare(&EmitInput {
            header: vec![
                ";;".to_owned(),
                format!(";; Header files for {}", entry.name),
                ";;".to_owned(),
            ],
            functions: &functions,
        }),
    });

    let mut stdlib_header = writer.globals().to_vec();
    stdlib_header.push(String::new());
    stdlib_header.push(";; Stdlib".to_owned());
    files.push(OutputFile {
        name: format!("{prefix}.stdlib.fc"),
        code: emit_group(
            emitter,
            stdlib_header,
            claim(
                &mut placed,
                tagged(&functions, &SectionTag::Stdlib).cloned().collect(),
            ),
        ),
    });

    if !store.native_sources().is_empty() {
        let mut code = String::new();
        for (path, source) in store.native_sources() {
            let _ = writeln!(code, ";; {path}\n{source}");
        }
        files.push(OutputFile {
            name: format!("{prefix}.native.fc"),
            code,
        });
    }

    files.push(OutputFile {
        name: format!("{prefix}.constants.fc"),
        code: emit_group(
            emitter,
            vec![";; Constants".to_owned()],
            claim(
                &mut placed,
                tagged(&functions, &SectionTag::Constants).cloned().collect(),
            ),
        ),
    });

    let mut storage = Vec::new();
    for name in ctx.order().iter() {
        let Some(ty) = store.get(name) else {
            continue;
        };
        let type_tag = SectionTag::Type(name.to_owned());
        let init_tag = SectionTag::TypeInit(name.to_owned());
        let group: Vec<WrittenFunction> = tagged(&functions, &type_tag)
            .chain(tagged(&functions, &init_tag))
            .cloned()
            .collect();
        if group.is_empty() {
            continue;
        }
        storage.push(emit_group(emitter, storage_header(ty), claim(&mut placed, group)));
    }
    files.push(OutputFile {
        name: format!("{prefix}.storage.fc"),
        code: storage.join("\n"),
    });

    let mut header = vec![
        format!("#pragma version ={};", options.pragma_version),
        "#pragma allow-post-modification;".to_owned(),
        "#pragma compute-asm-ltr;".to_owned(),
        String::new(),
    ];
    header.extend(files.iter().map(|f| format!("#include \"{}\";", f.name)));
    header.push(String::new());
    header.push(format!(";; Contract {} functions", entry.name));
    let rest = functions
        .iter()
        .filter(|f| !placed.contains(&f.name))
        .cloned()
        .collect();
    let code = emit_group(emitter, header, rest);
    let entrypoint = format!("{prefix}.code.fc");
    files.push(OutputFile {
        name: entrypoint.clone(),
        code: code.clone(),
    });

    tracing::debug!(files = files.len(), procedures = functions.len(), "artifact assembled");

    Ok(ProgramArtifact {
        entrypoint,
        code,
        files,
        constants: constant_outputs(store, &entry.name),
        abi,
        abi_link,
        programs: writer.programs(),
    })
}
