use super::emitter::{EmitInput, Emitter, FuncEmitter};
use super::writer::{Modifier, SectionTag, WriterContext, WrittenFunction};

fn sample() -> Vec<WrittenFunction> {
    vec![
        WrittenFunction::new("add", "int add(int a, int b)", SectionTag::Stdlib)
            .inline()
            .comment("sum")
            .body(vec!["return a + b;".to_owned()]),
        WrittenFunction::new("save", "() save(cell c)", SectionTag::Untagged)
            .impure()
            .modifier(Modifier::InlineRef)
            .body(vec!["set_data(c);".to_owned()]),
        WrittenFunction::new("version", "int version()", SectionTag::Untagged)
            .modifier(Modifier::MethodId)
            .body(vec!["return 1;".to_owned()]),
    ]
}

#[test]
fn emit_definitions() {
    let functions = sample();
    let out = FuncEmitter.emit(&EmitInput {
        header: vec![";; Test".to_owned()],
        functions: &functions,
    });

    insta::assert_snapshot!(out, @r"
    ;; Test

    ;; sum
    int add(int a, int b) inline {
        return a + b;
    }

    () save(cell c) impure inline_ref {
        set_data(c);
    }

    int version() method_id {
        return 1;
    }
    ");
}

#[test]
fn declarations_skip_getters() {
    let functions = sample();
    let out = FuncEmitter.declare(&EmitInput {
        header: Vec::new(),
        functions: &functions,
    });

    insta::assert_snapshot!(out, @r"
    int add(int a, int b) inline;
    () save(cell c) impure inline_ref;
    ");
}

#[test]
fn first_registration_wins() {
    let mut ctx = WriterContext::new();
    let first = sample().remove(0);
    let shadow = WrittenFunction::new("add", "int add(int a)", SectionTag::Constants);

    assert!(ctx.add(first));
    assert!(!ctx.add(shadow));
    assert_eq!(ctx.get("add").unwrap().context, SectionTag::Stdlib);
}

#[test]
fn comments_only_in_debug() {
    let mut ctx = WriterContext::new();
    for f in sample() {
        ctx.add(f);
    }

    assert!(ctx.extract(false).iter().all(|f| f.comment.is_none()));
    assert_eq!(ctx.extract(true)[0].comment.as_deref(), Some("sum"));
}

#[test]
fn globals_are_deduplicated() {
    let mut ctx = WriterContext::new();
    ctx.global("global int x;");
    ctx.global("global int x;");
    assert_eq!(ctx.globals(), ["global int x;"]);
}
