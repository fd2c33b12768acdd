//! Top-level `await` and `yield` detection.

use oxc::ast::ast::{
    ArrowFunctionExpression, AwaitExpression, ForOfStatement, Function, Statement,
    VariableDeclaration, VariableDeclarationKind, YieldExpression,
};
use oxc::ast_visit::{Visit, walk};
use oxc::syntax::scope::ScopeFlags;

/// Whether `statements` await outside of any function.
///
/// Counts `await` expressions, `for await` loops and `await using`
/// declarations. Function bodies are skipped; class bodies are not, since
/// computed keys and static blocks run when the class is defined.
pub fn has_top_level_await(statements: &[Statement<'_>]) -> bool {
    let mut finder = FindAwait { found: false };
    for statement in statements {
        finder.visit_statement(statement);
    }
    finder.found
}

struct FindAwait {
    found: bool,
}

impl<'a> Visit<'a> for FindAwait {
    fn visit_function(&mut self, _it: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _it: &ArrowFunctionExpression<'a>) {}

    fn visit_await_expression(&mut self, _it: &AwaitExpression<'a>) {
        self.found = true;
    }

    fn visit_for_of_statement(&mut self, it: &ForOfStatement<'a>) {
        if it.r#await {
            self.found = true;
            return;
        }
        walk::walk_for_of_statement(self, it);
    }

    fn visit_variable_declaration(&mut self, it: &VariableDeclaration<'a>) {
        if it.kind == VariableDeclarationKind::AwaitUsing {
            self.found = true;
            return;
        }
        walk::walk_variable_declaration(self, it);
    }
}

/// Whether `statements` yield outside of any function.
pub fn has_top_level_yield(statements: &[Statement<'_>]) -> bool {
    let mut finder = FindYield { found: false };
    for statement in statements {
        finder.visit_statement(statement);
    }
    finder.found
}

struct FindYield {
    found: bool,
}

impl<'a> Visit<'a> for FindYield {
    fn visit_function(&mut self, _it: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_yield_expression(&mut self, _it: &YieldExpression<'a>) {
        self.found = true;
    }
}
