//! End-to-end behavior of the compiler on notebook-shaped inputs.

use std::sync::Arc;

use juno_core::compile::{parse_template, transpile_template};
use oxc::allocator::Allocator;
use oxc::parser::Parser;
use oxc::span::SourceType;
use juno_core::{Cell, Compiler, ErrorKind, Mode, NotebookResolver, Position, strip_types};

fn compile(value: &str) -> juno_core::Result<juno_core::TranspiledUnit> {
    Compiler::default().compile(&Cell::js(1, value))
}

fn parses(source: &str) -> bool {
    let allocator = Allocator::default();
    Parser::new(&allocator, source, SourceType::mjs()).parse().errors.is_empty()
}

#[test]
fn test_closed_text_has_no_inputs() {
    for value in ["1 + 2", "[1, 2, 3].map((x) => x * 2)", "Math.max(1, 2)", "`a${1}b`"] {
        let unit = compile(value).unwrap();
        assert!(unit.inputs.is_empty(), "{value}");
        assert_eq!(unit.outputs, None, "{value}");
    }
    for value in ["if (true) {}", "for (let i = 0; i < 3; ++i) {}", ";"] {
        let unit = compile(value).unwrap();
        assert!(unit.inputs.is_empty(), "{value}");
        assert_eq!(unit.outputs, Some(vec![]), "{value}");
    }
}

#[test]
fn test_free_reference_is_listed_once() {
    let unit = compile("x + x * x; { x; }\nfunction f() { return x; }").unwrap();
    assert_eq!(unit.inputs, vec!["x"]);
}

#[test]
fn test_shadowing_is_legal() {
    let unit = compile("const y = 1;\n{ let y = 2; y = 3; }\nfunction f(y) { y = 4; }").unwrap();
    assert!(unit.inputs.is_empty());
    assert_eq!(unit.outputs, Some(vec!["y".to_string(), "f".to_string()]));
}

#[test]
fn test_assignment_to_free_variable() {
    let error = compile("foo = 1;").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ScopeViolation);
    match &error {
        juno_core::Error::ScopeViolation { name, position, .. } => {
            assert_eq!(name, "foo");
            assert_eq!(*position, Position { line: 1, column: 0 });
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(error.to_string(), "Assignment to external variable 'foo' (1:0)");
}

#[test]
fn test_reassigning_a_declaration() {
    let unit = compile("let foo = 1;\nfoo = 2;").unwrap();
    assert!(unit.inputs.is_empty());
    assert_eq!(unit.outputs, Some(vec!["foo".to_string()]));
}

#[test]
fn test_import_binds_its_names() {
    let unit = compile("import {a} from \"npm:pkg\";\na + 1").unwrap();
    assert!(unit.inputs.is_empty());
    assert!(unit.body.starts_with("async () => {\n"));
    assert!(unit.body.contains("https://cdn.jsdelivr.net/npm/pkg/+esm"));
    assert_eq!(unit.outputs, Some(vec!["a".to_string()]));
    assert!(!unit.autodisplay);
}

#[test]
fn test_markdown_template_structure() {
    let input = r#"Hello, ${"world"}!"#;
    let template = parse_template(input).unwrap();
    let quasis: Vec<&str> = template.quasis.iter().map(|span| span.text(input)).collect();
    assert_eq!(quasis, vec!["Hello, ", "!"]);
    assert_eq!(template.exprs.len(), 1);

    let rendered = transpile_template(&Cell::new(1, input, Mode::Md)).unwrap();
    assert_eq!(rendered, r#"md`Hello, ${"world"}!`"#);
}

#[test]
fn test_template_output_always_parses() {
    let values = [
        "plain text",
        "back`tick",
        r"trailing\",
        r"escaped \${x} and $\{y}",
        "${a} and ${b + 1}",
        "multi\nline\n`text`",
        "",
    ];
    let modes = ["md", "html", "tex", "dot", "sql", "node", "python"];
    for mode in modes {
        for value in values {
            let cell = Cell::new(1, value, mode.parse().unwrap());
            let rendered = transpile_template(&cell).unwrap();
            assert!(parses(&rendered), "{mode}: {rendered}");
        }
    }
}

#[test]
fn test_stripping_plain_javascript() {
    let squash = |text: &str| text.chars().filter(|c| !c.is_whitespace()).collect::<String>();
    for value in ["const a = 1 + 2;", "a ? b : c", "function f(x) {\n  return x;\n}", "({x: 1})"] {
        assert_eq!(squash(&strip_types(value).unwrap()), squash(value));
    }
}

#[test]
fn test_typescript_errors_point_into_the_cell() {
    let error = Compiler::default()
        .compile(&Cell::new(1, "const x: number = 1;\nx = 2 +;", Mode::Ts))
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Syntax);
    match error {
        juno_core::Error::Syntax { position, .. } => assert_eq!(position.line, 2),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_batch_compile() {
    let cells = vec![
        Cell::js(1, "const data = [1, 2, 3];"),
        Cell::js(2, "data.length"),
        Cell::js(3, "export const x = 1;"),
        Cell::new(4, "Total: ${data.length}", Mode::Md),
        Cell::new(5, "viewof k = Inputs.range([0, 1])", Mode::Ojs),
    ];
    let results = Compiler::default().compile_all(&cells);
    assert_eq!(results.len(), cells.len());
    assert_eq!(results[0].as_ref().unwrap().outputs, Some(vec!["data".to_string()]));
    assert_eq!(results[1].as_ref().unwrap().inputs, vec!["data"]);
    assert_eq!(results[2].as_ref().unwrap_err().kind(), ErrorKind::UnsupportedConstruct);
    assert_eq!(results[3].as_ref().unwrap().inputs, vec!["md", "data"]);
    assert_eq!(results[4].as_ref().unwrap().output.as_deref(), Some("viewof$k"));
}

#[test]
fn test_private_brand_checks() {
    let unit = compile("class A { #p; m(o) { return #p in o } }").unwrap();
    assert_eq!(unit.outputs, Some(vec!["A".to_string()]));
    assert!(unit.inputs.is_empty());
}

#[test]
fn test_parenthesized_named_function_declares_nothing() {
    let unit = compile("(function foo(){})").unwrap();
    assert_eq!(unit.outputs, Some(vec![]));
    assert!(!unit.body.contains("return"));
    assert!(!unit.autodisplay);
}

#[test]
fn test_observable_declarations_name_the_cell() {
    let compile = |value: &str| Compiler::default().compile(&Cell::new(1, value, Mode::Ojs)).unwrap();
    assert_eq!(compile("function f() { return 1 }").output.as_deref(), Some("f"));
    assert_eq!(compile("class F {}").output.as_deref(), Some("F"));
}

#[test]
fn test_deep_nesting_fails_only_its_cell() {
    let deep = format!("{}1{}", "(".repeat(1000), ")".repeat(1000));
    let cells = vec![Cell::js(1, deep), Cell::js(2, "y * 2")];
    let results = Compiler::default().compile_all(&cells);
    assert_eq!(results[0].as_ref().unwrap_err().kind(), ErrorKind::Syntax);
    assert_eq!(results[1].as_ref().unwrap().inputs, vec!["y"]);

    let moderate = format!("{}1{}", "(".repeat(20), ")".repeat(20));
    assert!(compile(&moderate).is_ok());
}

struct Notebooks;

impl NotebookResolver for Notebooks {
    fn exports(&self, url: &str) -> Option<Vec<String>> {
        url.contains("@mbostock/scrubber")
            .then(|| vec!["Scrubber".to_string(), "viewof$Scrubber".to_string()])
    }
}

#[test]
fn test_notebook_resolver() {
    let compiler = Compiler::default().with_resolver(Arc::new(Notebooks));
    let found = Cell::js(1, "import {Scrubber} from \"observable:@mbostock/scrubber\";");
    assert!(compiler.compile(&found).is_ok());

    let missing = Cell::js(2, "import {Slider} from \"observable:@mbostock/scrubber\";");
    assert_eq!(compiler.compile(&missing).unwrap_err().kind(), ErrorKind::ImportResolution);

    let unknown = Cell::js(3, "import {Slider} from \"observable:@someone/else\";");
    assert!(compiler.compile(&unknown).is_ok());
}

#[test]
fn test_cells_from_json() {
    let cell: Cell = serde_json::from_str(r#"{"id": 3, "value": "SELECT 1", "mode": "sql", "output": "t"}"#).unwrap();
    let unit = Compiler::default().compile(&cell).unwrap();
    assert_eq!(unit.output.as_deref(), Some("viewof$t"));
    assert!(unit.autoview);
}

#[test]
fn test_logging_does_not_affect_output() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("juno_core=trace"))
        .with_test_writer()
        .try_init();
    let unit = compile("import {a} from \"npm:pkg\";\na").unwrap();
    assert_eq!(unit.outputs, Some(vec!["a".to_string()]));
}
