//! Top-level declarations, which become a program cell's outputs.

use oxc::ast::ast::{
    AssignmentPattern, BindingIdentifier, BindingPattern, ImportDeclarationSpecifier, Program,
    PropertyKey, Statement, VariableDeclarationKind,
};
use oxc::ast_visit::Visit;
use oxc::span::GetSpan;
use rustc_hash::FxHashMap;

use super::globals::Globals;
use crate::error::{Error, Result};
use crate::syntax::Ident;

/// Collect the names bound at the top level of `program`, in source order.
///
/// Fails when a declaration redefines a reserved global (or `arguments`), or
/// when a name is declared twice where one of the declarations is lexical.
/// Cells cannot export, so any export statement is rejected too.
pub fn find_declarations(program: &Program<'_>, globals: &Globals, input: &str) -> Result<Vec<Ident>> {
    let mut collector = Declarations {
        globals,
        input,
        seen: FxHashMap::default(),
        names: Vec::new(),
    };
    for statement in &program.body {
        match statement {
            Statement::VariableDeclaration(declaration) => {
                let is_var = declaration.kind == VariableDeclarationKind::Var;
                for declarator in &declaration.declarations {
                    for ident in bound_names(&declarator.id) {
                        collector.declare(ident, is_var)?;
                    }
                }
            }
            Statement::FunctionDeclaration(function) => {
                if let Some(id) = &function.id {
                    collector.declare(binding(id), false)?;
                }
            }
            Statement::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    collector.declare(binding(id), false)?;
                }
            }
            Statement::ImportDeclaration(import) => {
                for specifier in import.specifiers.iter().flatten() {
                    let local = match specifier {
                        ImportDeclarationSpecifier::ImportSpecifier(specifier) => &specifier.local,
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(specifier) => {
                            &specifier.local
                        }
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(specifier) => {
                            &specifier.local
                        }
                    };
                    collector.declare(binding(local), false)?;
                }
            }
            Statement::ExportNamedDeclaration(_)
            | Statement::ExportDefaultDeclaration(_)
            | Statement::ExportAllDeclaration(_) => {
                return Err(Error::unsupported(
                    "Unexpected token 'export'",
                    statement.span().into(),
                    input,
                ));
            }
            _ => {}
        }
    }
    Ok(collector.names)
}

fn binding(id: &BindingIdentifier<'_>) -> Ident {
    Ident {
        name: id.name.to_string(),
        span: id.span.into(),
    }
}

/// The names a binding pattern introduces, in source order.
pub fn bound_names(pattern: &BindingPattern<'_>) -> Vec<Ident> {
    let mut names = BoundNames { names: Vec::new() };
    names.visit_binding_pattern(pattern);
    names.names
}

struct BoundNames {
    names: Vec<Ident>,
}

impl<'a> Visit<'a> for BoundNames {
    fn visit_binding_identifier(&mut self, it: &BindingIdentifier<'a>) {
        self.names.push(binding(it));
    }

    // Defaults and computed keys may hold functions with their own bindings.
    fn visit_assignment_pattern(&mut self, it: &AssignmentPattern<'a>) {
        self.visit_binding_pattern(&it.left);
    }

    fn visit_property_key(&mut self, _it: &PropertyKey<'a>) {}
}

struct Declarations<'a> {
    globals: &'a Globals,
    input: &'a str,
    /// Whether each name seen so far was declared with `var`.
    seen: FxHashMap<String, bool>,
    names: Vec<Ident>,
}

impl Declarations<'_> {
    fn declare(&mut self, ident: Ident, is_var: bool) -> Result<()> {
        if self.globals.contains(&ident.name) || ident.name == "arguments" {
            return Err(Error::scope_violation(
                format!("Global '{}' cannot be redefined", ident.name),
                &ident.name,
                ident.span,
                self.input,
            ));
        }
        match self.seen.get(&ident.name) {
            Some(&previous_var) if !(previous_var && is_var) => {
                return Err(Error::syntax(
                    format!("Identifier '{}' has already been declared", ident.name),
                    ident.span,
                    self.input,
                ));
            }
            Some(_) => {}
            None => {
                self.seen.insert(ident.name.clone(), is_var);
            }
        }
        self.names.push(ident);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use oxc::allocator::Allocator;
    use oxc::span::SourceType;

    use super::*;
    use crate::error::ErrorKind;
    use crate::syntax::{Frame, parse_module, syntax_error};

    fn declarations(source: &str) -> Result<Vec<String>> {
        let allocator = Allocator::default();
        let program = parse_module(&allocator, source, SourceType::mjs())
            .map_err(|diagnostic| syntax_error(&diagnostic, Frame::identity(source.len()), source))?;
        let names = find_declarations(&program, &Globals::default(), source)?;
        Ok(names.into_iter().map(|ident| ident.name).collect())
    }

    #[test]
    fn test_top_level_only() {
        let names = declarations(
            "const a = 1, {b, c: [d, ...e]} = f;\nfunction g() { var h; }\nclass I {}\n{ let j; }\nimport k, {l as m} from \"npm:n\";",
        )
        .unwrap();
        assert_eq!(names, vec!["a", "b", "d", "e", "g", "I", "k", "m"]);
    }

    #[test]
    fn test_defaults_bind_only_the_target() {
        let names = declarations("const {a = function b() {}, [c]: d = 1} = e;").unwrap();
        assert_eq!(names, vec!["a", "d"]);
    }

    #[test]
    fn test_redefining_a_global() {
        let error = declarations("const Math = 1;").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ScopeViolation);
        assert!(error.to_string().starts_with("Global 'Math' cannot be redefined"));
        let error = declarations("class window {}").unwrap_err();
        assert!(error.to_string().starts_with("Global 'window' cannot be redefined"));
    }

    #[test]
    fn test_shadowing_a_global_in_a_block_is_allowed() {
        assert!(declarations("{ const Math = 1; }").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_declarations() {
        let error = declarations("let a = 1;\nconst a = 2;").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Syntax);
        assert!(declarations("function f() {}\nlet f;").is_err());
        assert_eq!(declarations("var a; var a;").unwrap(), vec!["a", "a"]);
    }

    #[test]
    fn test_exports_are_unsupported() {
        for source in ["export const x = 1;", "export default 1;", "export * from \"npm:a\";"] {
            let error = declarations(source).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::UnsupportedConstruct, "{source}");
        }
    }
}
