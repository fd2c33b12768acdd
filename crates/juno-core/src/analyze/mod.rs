//! Static analysis of JavaScript cell bodies.
//!
//! [`parse_unit`] decides whether a cell is a bare expression or a program,
//! resolves its scopes with `oxc_semantic`, then runs the passes that compute
//! its top-level declarations (outputs) and free references (inputs) and
//! reject illegal assignments.

mod assignments;
mod awaits;
mod declarations;
pub mod globals;
mod references;

pub use assignments::check_assignments;
pub use awaits::{has_top_level_await, has_top_level_yield};
pub use declarations::{bound_names, find_declarations};
pub use globals::Globals;
pub use references::{FreeReference, find_references};

use oxc::allocator::Allocator;
use oxc::ast::ast::{Program, Statement};
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;

use crate::error::Result;
use crate::syntax::{Frame, Ident, is_wrapped_expression, parse_module, syntax_error};

/// A parsed and analyzed cell body.
#[derive(Debug)]
pub struct ParsedUnit<'a> {
    /// The parsed program. An expression cell is parsed inside parentheses.
    pub program: &'a Program<'a>,
    /// Maps offsets in `program` back to the cell value.
    pub frame: Frame,
    /// Top-level bindings; `None` exactly when the body is an expression.
    pub declarations: Option<Vec<Ident>>,
    /// Every free identifier occurrence, in source order.
    pub references: Vec<Ident>,
    pub is_expression: bool,
    pub has_top_level_await: bool,
}

impl ParsedUnit<'_> {
    /// Referenced names with duplicates removed, in first-occurrence order.
    pub fn input_names(&self) -> Vec<String> {
        unique_names(&self.references)
    }

    /// Declared names with duplicates removed, or `None` for expressions.
    pub fn output_names(&self) -> Option<Vec<String>> {
        self.declarations.as_deref().map(unique_names)
    }

    /// Whether the body contains a static `import` declaration.
    pub fn has_imports(&self) -> bool {
        self.program
            .body
            .iter()
            .any(|statement| matches!(statement, Statement::ImportDeclaration(_)))
    }
}

fn unique_names(idents: &[Ident]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for ident in idents {
        if !names.contains(&ident.name) {
            names.push(ident.name.clone());
        }
    }
    names
}

/// Parse `input` as a cell body and analyze it against `globals`.
///
/// The input is first tried as one parenthesized expression. Named function
/// and class expressions are treated as declarations instead, so they fall
/// back to a program parse like any other statement list.
pub fn parse_unit<'a>(
    allocator: &'a Allocator,
    input: &'a str,
    globals: &Globals,
) -> Result<ParsedUnit<'a>> {
    let wrapped: &'a str = allocator.alloc_str(&format!("({input}\n)"));
    let (program, frame) = match parse_module(allocator, wrapped, SourceType::mjs()) {
        Ok(program) if is_wrapped_expression(&program, wrapped.len()) => {
            (program, Frame::wrapped(1, 0, input.len()))
        }
        _ => {
            let frame = Frame::identity(input.len());
            let program = parse_module(allocator, input, SourceType::mjs())
                .map_err(|diagnostic| syntax_error(&diagnostic, frame, input))?;
            (program, frame)
        }
    };
    let program: &'a Program<'a> = allocator.alloc(program);
    let is_expression = frame.is_wrapped();
    let declarations = if is_expression {
        None
    } else {
        Some(find_declarations(program, globals, input)?)
    };

    let semantic = SemanticBuilder::new()
        .with_check_syntax_error(true)
        .build(program);
    if let Some(diagnostic) = semantic.errors.first() {
        return Err(syntax_error(diagnostic, frame, input));
    }
    let scoping = semantic.semantic.into_scoping();
    let free = find_references(&program.body, &scoping, frame);
    check_assignments(&free, globals, input, |_| false)?;
    let references: Vec<Ident> = free
        .into_iter()
        .filter(|reference| reference.is_input(globals))
        .map(|reference| reference.ident)
        .collect();
    let has_top_level_await = has_top_level_await(&program.body);
    tracing::trace!(
        is_expression,
        references = references.len(),
        has_top_level_await,
        "parsed cell body"
    );
    Ok(ParsedUnit {
        program,
        frame,
        declarations,
        references,
        is_expression,
        has_top_level_await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn with_unit<T>(input: &str, f: impl FnOnce(&ParsedUnit<'_>) -> T) -> T {
        let allocator = Allocator::default();
        let unit = parse_unit(&allocator, input, &Globals::default()).unwrap();
        f(&unit)
    }

    fn is_expression(input: &str) -> bool {
        with_unit(input, |unit| unit.is_expression)
    }

    #[test]
    fn test_expression_cells() {
        with_unit("a + b", |unit| {
            assert!(unit.is_expression);
            assert!(unit.declarations.is_none());
            assert_eq!(unit.input_names(), vec!["a", "b"]);
        });
        assert!(is_expression("  {x: 1}  "));
        assert!(is_expression("function () {}"));
        assert!(is_expression("\"use strict\""));
    }

    #[test]
    fn test_program_cells() {
        with_unit("const x = y * 2;", |unit| {
            assert!(!unit.is_expression);
            assert_eq!(unit.output_names(), Some(vec!["x".to_string()]));
            assert_eq!(unit.input_names(), vec!["y"]);
        });
        with_unit("a; b", |unit| assert_eq!(unit.output_names(), Some(vec![])));
    }

    #[test]
    fn test_named_functions_are_declarations() {
        with_unit("function f() { return g; }", |unit| {
            assert!(!unit.is_expression);
            assert_eq!(unit.output_names(), Some(vec!["f".to_string()]));
            assert_eq!(unit.input_names(), vec!["g"]);
        });
        with_unit("class A {}", |unit| {
            assert_eq!(unit.output_names(), Some(vec!["A".to_string()]));
        });
    }

    #[test]
    fn test_parenthesized_named_function_is_a_program() {
        for input in ["(function foo() {})", "((class Foo {}))"] {
            with_unit(input, |unit| {
                assert!(!unit.is_expression, "{input}");
                assert_eq!(unit.output_names(), Some(vec![]), "{input}");
            });
        }
    }

    #[test]
    fn test_empty_input() {
        with_unit("", |unit| {
            assert!(!unit.is_expression);
            assert_eq!(unit.output_names(), Some(vec![]));
            assert!(unit.references.is_empty());
        });
    }

    #[test]
    fn test_references_keep_every_occurrence() {
        with_unit("x + x * x", |unit| {
            assert_eq!(unit.references.len(), 3);
            assert_eq!(unit.input_names(), vec!["x"]);
        });
    }

    #[test]
    fn test_expression_spans_point_into_the_cell() {
        with_unit("  a + b", |unit| {
            let spans: Vec<(usize, usize)> = unit
                .references
                .iter()
                .map(|ident| (ident.span.start, ident.span.end))
                .collect();
            assert_eq!(spans, vec![(2, 3), (6, 7)]);
        });
    }

    #[test]
    fn test_top_level_await() {
        assert!(with_unit("await fetch(url)", |unit| unit.has_top_level_await));
        assert!(!with_unit("async () => await x", |unit| unit.has_top_level_await));
    }

    #[test]
    fn test_private_brand_check() {
        with_unit("class A { #p; m(o) { return #p in o; } }", |unit| {
            assert_eq!(unit.output_names(), Some(vec!["A".to_string()]));
            assert!(unit.references.is_empty());
        });
    }

    #[test]
    fn test_syntax_errors() {
        let allocator = Allocator::default();
        for input in ["a = ;", "let a; let a;", "{ const b = 1; const b = 2; }"] {
            let error = parse_unit(&allocator, input, &Globals::default()).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::Syntax, "{input}");
        }
    }

    #[test]
    fn test_imports_are_detected() {
        with_unit("import {a} from \"npm:pkg\";\na + 1", |unit| {
            assert!(!unit.is_expression);
            assert!(unit.has_imports());
            assert!(unit.references.is_empty());
            assert_eq!(unit.output_names(), Some(vec!["a".to_string()]));
        });
    }
}
