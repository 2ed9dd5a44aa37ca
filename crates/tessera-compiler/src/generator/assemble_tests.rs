use indoc::indoc;

use tessera_core::{Field, FieldType, TypeDescriptor};

use super::ConstantOutput;
use super::write_procedures;
use crate::abi::ContentAddresser;
use crate::test_utils::{analyze, deep_store, geometry, wallet};
use crate::{CompileError, CompileOptions, ProgramArtifact, Session};

struct FixedLink;

impl ContentAddresser for FixedLink {
    fn link(&self, _content: &str) -> String {
        "fixed".to_owned()
    }
}

fn compile(options: CompileOptions) -> ProgramArtifact {
    Session::new(wallet())
        .addresser(FixedLink)
        .compile(&options)
        .unwrap()
}

fn file<'a>(artifact: &'a ProgramArtifact, name: &str) -> &'a str {
    &artifact.file(name).expect(name).code
}

#[test]
fn file_layout() {
    let artifact = compile(CompileOptions::new("Wallet"));
    let names: Vec<&str> = artifact.files.iter().map(|f| f.name.as_str()).collect();

    assert_eq!(
        names,
        [
            "Wallet.headers.fc",
            "Wallet.stdlib.fc",
            "Wallet.constants.fc",
            "Wallet.storage.fc",
            "Wallet.code.fc",
        ]
    );
    assert_eq!(artifact.entrypoint, "Wallet.code.fc");
    assert_eq!(artifact.code, file(&artifact, "Wallet.code.fc"));
}

#[test]
fn entry_code() {
    let artifact = compile(CompileOptions::new("Wallet"));
    insta::assert_snapshot!(artifact.code, @r#"
    #pragma version =0.4.6;
    #pragma allow-post-modification;
    #pragma compute-asm-ltr;

    #include "Wallet.headers.fc";
    #include "Wallet.stdlib.fc";
    #include "Wallet.constants.fc";
    #include "Wallet.storage.fc";

    ;; Contract Wallet functions

    slice get_abi_link() method_id {
        return "fixed";
    }
    "#);
}

#[test]
fn native_sources_are_passed_through() {
    let store = wallet().with_native_source("math.fc", "int twice(int x) inline { return x * 2; }");
    let artifact = Session::new(store)
        .compile(&CompileOptions::new("Wallet").basename("out"))
        .unwrap();

    assert_eq!(
        file(&artifact, "out.native.fc"),
        ";; math.fc\nint twice(int x) inline { return x * 2; }\n"
    );
    assert!(artifact.code.contains("#include \"out.native.fc\";"));
}

#[test]
fn storage_follows_dependency_order() {
    let artifact = compile(CompileOptions::new("Wallet"));
    let storage = file(&artifact, "Wallet.storage.fc");

    let pos = |needle: &str| storage.find(needle).unwrap_or_else(|| panic!("missing {needle}"));
    assert!(pos(";; Type: Point") < pos(";; Type: Transfer"));
    assert!(pos(";; Type: Transfer") < pos(";; Type: Wallet"));
    assert!(pos("$Wallet$_contract_store(") < pos("$Wallet$init$_store("));
    assert!(pos("$Wallet$init$_load(") < pos("$Wallet$_init_data("));
    assert_eq!(storage.matches("builder $Point$_store(").count(), 1);

    let header = artifact
        .abi
        .lines()
        .find(|l| l.contains("\"header\""))
        .expect("Transfer carries a header");
    let value: u32 = header
        .trim()
        .trim_start_matches("\"header\": ")
        .trim_end_matches(',')
        .parse()
        .unwrap();
    assert!(storage.contains(&format!(";; Header: 0x{value:08x}")));
    assert!(storage.contains(&format!(";; TLB: transfer#{value:08x} amount:coins to:address memo:Maybe ^string = Transfer")));
}

#[test]
fn contract_storage_ops() {
    let artifact = compile(CompileOptions::new("Wallet"));
    let storage = file(&artifact, "Wallet.storage.fc");

    assert!(storage.contains(indoc! {"
        (slice, int, tuple) $Wallet$_contract_init(slice v'owner) impure inline {
            return (v'owner, 0, null());
        }
    "}));
    assert!(storage.contains(indoc! {"
        (slice, int, tuple) $Wallet$_contract_load() impure inline {
            slice $sc = get_data().begin_parse();
            int $loaded = $sc~load_int(1);
            if ($loaded) {
                return $sc~$Wallet$_load_no_opcode();
            }
            var (v'owner) = $sc~$Wallet$init$_load();
            $sc.end_parse();
            return $Wallet$_contract_init(v'owner);
        }
    "}));
    assert!(storage.contains(indoc! {"
        cell $Wallet$_init_data(slice v'owner) inline {
            builder b = begin_cell();
            b = b.store_int(false, 1);
            b = $Wallet$init$_store(b, (v'owner));
            return b.end_cell();
        }
    "}));
}

#[test]
fn headers_declare_everything_but_getters() {
    let artifact = compile(CompileOptions::new("Wallet"));
    let headers = file(&artifact, "Wallet.headers.fc");

    assert!(headers.starts_with(";;\n;; Header files for Wallet\n;;\n"));
    assert!(headers.contains("\nbuilder $Point$_store(builder build_0, (int, int) v) inline;\n"));
    assert!(headers.contains("\n() $Wallet$_contract_store((slice, int, tuple) v) impure inline;\n"));
    assert!(!headers.contains("get_abi_link"));
}

#[test]
fn constants() {
    let artifact = compile(CompileOptions::new("Wallet"));

    assert_eq!(
        artifact.constants,
        [
            ConstantOutput {
                name: "MAX_SUPPLY".to_owned(),
                value: "1000000n".to_owned(),
                from_contract: false,
            },
            ConstantOutput {
                name: "FEE".to_owned(),
                value: "1000n".to_owned(),
                from_contract: true,
            },
        ]
    );
    assert!(file(&artifact, "Wallet.constants.fc").contains(indoc! {"
        int $const_MAX_SUPPLY() inline {
            return 1000000;
        }
    "}));
    assert!(file(&artifact, "Wallet.storage.fc").contains("int $Wallet$_const_FEE() inline {"));
}

#[test]
fn stdlib_carries_globals() {
    let artifact = compile(CompileOptions::new("Wallet"));
    let stdlib = file(&artifact, "Wallet.stdlib.fc");

    assert!(stdlib.starts_with("global (int, slice, int, slice) __tessera_context;\n\n;; Stdlib\n\n"));
    assert!(stdlib.contains("forall X -> X __tessera_not_null(X x) inline {"));
    assert!(stdlib.contains("cell __tessera_string_to_cell(slice s) inline_ref {"));
}

#[test]
fn debug_keeps_layout_comments() {
    let plain = compile(CompileOptions::new("Wallet"));
    let debug = compile(CompileOptions::new("Wallet").debug(true));

    let comment = ";; Point: 1 cell(s), 514 bits, 0 refs";
    assert!(!file(&plain, "Wallet.storage.fc").contains(comment));
    assert!(file(&debug, "Wallet.storage.fc").contains(comment));
}

#[test]
fn programs_ship_with_artifact() {
    let artifact = compile(CompileOptions::new("Wallet"));

    for name in [
        "$Point$_store",
        "$Point$_load",
        "$Point$_load_no_opcode",
        "$Transfer$_load_bounced",
        "$Wallet$init$_store",
        "$Wallet$init$_load",
    ] {
        assert!(artifact.programs.contains(name), "{name}");
    }
    assert!(!artifact.programs.contains("$Point$_store_cell"));
}

#[test]
fn abi_lists_structs_and_messages() {
    let artifact = Session::new(wallet())
        .compile(&CompileOptions::new("Wallet"))
        .unwrap();
    let abi: serde_json::Value = serde_json::from_str(&artifact.abi).unwrap();

    assert_eq!(abi["name"], "Wallet");
    let names: Vec<&str> = abi["types"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Point", "Transfer"]);
    assert_eq!(abi["types"][0]["fields"][0]["type"], "int257");
    assert!(abi["types"][0].get("header").is_none());

    assert!(artifact.abi_link.starts_with("crc32:"));
    assert_eq!(artifact.abi_link.len(), "crc32:".len() + 8);
    assert!(artifact.code.contains(&format!("return \"{}\";", artifact.abi_link)));
}

#[test]
fn compilation_is_deterministic() {
    let first = compile(CompileOptions::new("Wallet"));
    let second = compile(CompileOptions::new("Wallet"));
    assert_eq!(first, second);
}

#[test]
fn unknown_entry() {
    let err = Session::new(geometry())
        .compile(&CompileOptions::new("Missing"))
        .unwrap_err();
    assert!(matches!(err, CompileError::UnknownEntryType(ref name) if name == "Missing"));

    let err = Session::new(geometry())
        .compile(&CompileOptions::new("Point"))
        .unwrap_err();
    assert!(matches!(err, CompileError::UnknownEntryType(_)));
}

#[test]
fn entry_is_checked_before_allocation() {
    let store = wallet().with(
        tessera_core::TypeDescriptor::structure("Huge")
            .with_field("data", tessera_core::FieldType::Bits { bits: 2000 }),
    );
    let err = Session::new(store)
        .compile(&CompileOptions::new("Nope"))
        .unwrap_err();
    assert!(matches!(err, CompileError::UnknownEntryType(_)));
}

/// Files holding a definition of `name`; headers only declare.
fn defined_in(artifact: &ProgramArtifact, name: &str) -> Vec<String> {
    let needle = format!(" {name}(");
    artifact
        .files
        .iter()
        .filter(|f| !f.name.ends_with(".headers.fc"))
        .filter(|f| {
            f.code
                .lines()
                .any(|line| line.contains(&needle) && line.ends_with('{') && !line.starts_with(' '))
        })
        .map(|f| f.name.clone())
        .collect()
}

#[test]
fn every_procedure_is_emitted_exactly_once() {
    let mut store = wallet();
    for ty in deep_store().iter().chain(geometry().iter()) {
        if !store.contains(&ty.name) {
            store = store.with(ty.clone());
        }
    }
    let options = CompileOptions::new("Wallet");
    let procedures = write_procedures(&analyze(store.clone()), &options, "fixed")
        .unwrap()
        .extract(false);
    let artifact = Session::new(store)
        .addresser(FixedLink)
        .compile(&options)
        .unwrap();

    assert!(procedures.len() > 20);
    for procedure in &procedures {
        assert_eq!(defined_in(&artifact, &procedure.name).len(), 1, "{}", procedure.name);
    }
}

#[test]
fn every_contract_gets_storage_ops() {
    let store = wallet().with(
        TypeDescriptor::contract("Vault")
            .with_field("balance", FieldType::coins())
            .with_field("keeper", FieldType::Address)
            .with_init([Field::new("keeper", FieldType::Address)]),
    );
    let artifact = Session::new(store)
        .addresser(FixedLink)
        .compile(&CompileOptions::new("Wallet"))
        .unwrap();
    let storage = file(&artifact, "Wallet.storage.fc");

    for contract in ["Wallet", "Vault"] {
        for op in ["_contract_init", "_contract_load", "_contract_store", "_init_data"] {
            let name = format!("${contract}${op}");
            assert_eq!(defined_in(&artifact, &name), ["Wallet.storage.fc"], "{name}");
        }
        assert!(artifact.programs.contains(&format!("${contract}$init$_store")));
        assert!(artifact.programs.contains(&format!("${contract}$init$_load")));
    }
    assert!(storage.contains(indoc! {"
        cell $Vault$_init_data(slice v'keeper) inline {
            builder b = begin_cell();
            b = b.store_int(false, 1);
            b = $Vault$init$_store(b, (v'keeper));
            return b.end_cell();
        }
    "}));
    assert!(!artifact.code.contains("$Vault$"));
}
