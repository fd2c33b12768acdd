//! Free reference detection.

use oxc::ast::ast::{Function, IdentifierReference, Statement};
use oxc::ast_visit::{Visit, walk};
use oxc::semantic::Scoping;
use oxc::syntax::scope::ScopeFlags;

use super::globals::Globals;
use crate::syntax::{Frame, Ident};

/// An identifier occurrence that no enclosing scope binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeReference {
    pub ident: Ident,
    /// Whether the occurrence is assigned to.
    pub is_write: bool,
}

impl FreeReference {
    /// Whether this reference is a cell input rather than a host global.
    pub fn is_input(&self, globals: &Globals) -> bool {
        self.ident.name != "undefined" && !globals.contains(&self.ident.name)
    }
}

/// Find identifiers in `statements` that resolve to no symbol in `scoping`.
///
/// Every occurrence is reported in source order, with spans mapped through
/// `frame`. `arguments` inside a non-arrow function is not free.
pub fn find_references<'a>(
    statements: &[Statement<'a>],
    scoping: &Scoping,
    frame: Frame,
) -> Vec<FreeReference> {
    let mut finder = FindReferences {
        scoping,
        frame,
        functions: 0,
        references: Vec::new(),
    };
    for statement in statements {
        finder.visit_statement(statement);
    }
    finder.references
}

struct FindReferences<'s> {
    scoping: &'s Scoping,
    frame: Frame,
    /// Enclosing non-arrow functions.
    functions: usize,
    references: Vec<FreeReference>,
}

impl<'a> Visit<'a> for FindReferences<'_> {
    fn visit_function(&mut self, it: &Function<'a>, flags: ScopeFlags) {
        self.functions += 1;
        walk::walk_function(self, it, flags);
        self.functions -= 1;
    }

    fn visit_identifier_reference(&mut self, it: &IdentifierReference<'a>) {
        if it.name.as_str() == "arguments" && self.functions > 0 {
            return;
        }
        let Some(reference_id) = it.reference_id.get() else {
            return;
        };
        let reference = self.scoping.get_reference(reference_id);
        if reference.symbol_id().is_some() {
            return;
        }
        self.references.push(FreeReference {
            ident: Ident {
                name: it.name.to_string(),
                span: self.frame.span(it.span),
            },
            is_write: reference.is_write(),
        });
    }
}

#[cfg(test)]
mod tests {
    use oxc::allocator::Allocator;
    use oxc::semantic::SemanticBuilder;
    use oxc::span::SourceType;

    use super::*;
    use crate::syntax::parse_module;

    fn references(source: &str) -> Vec<String> {
        let allocator = Allocator::default();
        let program = parse_module(&allocator, source, SourceType::mjs()).unwrap();
        let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();
        let globals = Globals::default();
        find_references(&program.body, &scoping, Frame::identity(source.len()))
            .into_iter()
            .filter(|reference| reference.is_input(&globals))
            .map(|reference| reference.ident.name)
            .collect()
    }

    #[test]
    fn test_free_references() {
        assert_eq!(references("a + b; a;"), vec!["a", "b", "a"]);
        assert_eq!(references("const a = 1; a + b;"), vec!["b"]);
    }

    #[test]
    fn test_skips_globals_and_undefined() {
        assert!(references("Math.max(undefined, window.x);").is_empty());
    }

    #[test]
    fn test_block_scopes() {
        assert_eq!(references("{ let a = 1; } a;"), vec!["a"]);
        assert!(references("{ var a = 1; } a;").is_empty());
        assert_eq!(references("for (let i = 0; i < n; ++i) {} i;"), vec!["n", "i"]);
    }

    #[test]
    fn test_function_scopes() {
        assert!(references("function f(x) { return x + arguments.length; } f(1);").is_empty());
        assert_eq!(references("const g = () => arguments;"), vec!["arguments"]);
        assert!(references("(function h() { return h; })").is_empty());
        assert_eq!(references("function k(a = b) {}"), vec!["b"]);
    }

    #[test]
    fn test_hoisted_declarations() {
        assert!(references("f(); function f() {}").is_empty());
        assert!(references("{ g(); } function g() {}").is_empty());
    }

    #[test]
    fn test_classes_and_catch() {
        assert!(references("class A extends Array { m() { return A; } }").is_empty());
        assert_eq!(references("const B = class C {}; C;"), vec!["C"]);
        assert!(references("try {} catch (e) { e; }").is_empty());
        assert_eq!(references("try {} catch (e) {} e;"), vec!["e"]);
    }

    #[test]
    fn test_property_names_are_not_references() {
        assert_eq!(references("a.b; ({c: d, [e]: 1}); f?.g;"), vec!["a", "d", "e", "f"]);
    }

    #[test]
    fn test_private_names_are_not_references() {
        assert_eq!(references("class A { #p; m() { return #p in o; } }"), vec!["o"]);
    }

    #[test]
    fn test_writes_are_flagged() {
        let allocator = Allocator::default();
        let source = "a = b; c++;";
        let program = parse_module(&allocator, source, SourceType::mjs()).unwrap();
        let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();
        let writes: Vec<(String, bool)> =
            find_references(&program.body, &scoping, Frame::identity(source.len()))
                .into_iter()
                .map(|reference| (reference.ident.name, reference.is_write))
                .collect();
        assert_eq!(
            writes,
            vec![
                ("a".to_string(), true),
                ("b".to_string(), false),
                ("c".to_string(), true)
            ]
        );
    }
}
