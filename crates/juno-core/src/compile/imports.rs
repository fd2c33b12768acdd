//! Import rewriting.
//!
//! Static imports become an awaited dynamic-import prelude, and the
//! specifiers of dynamic imports and `import.meta.resolve` calls are resolved
//! in place.

use oxc::ast::ast::{
    Argument, CallExpression, Expression, ImportAttributeKey, ImportDeclaration,
    ImportDeclarationSpecifier, ImportExpression, ModuleExportName, Program, Statement,
    StaticMemberExpression, StringLiteral,
};
use oxc::ast_visit::{Visit, walk};

use super::resolve::{is_local_specifier, resolve_specifier};
use super::types::CompilerConfig;
use crate::error::{Error, Result};
use crate::sourcemap::Sourcemap;
use crate::syntax::{Frame, Span};

/// Name of the input through which notebook imports reach the runtime.
pub const OBSERVABLE_RUNTIME: &str = "__ojs_runtime";

/// Supplies the export lists of notebooks referenced by notebook imports.
pub trait NotebookResolver: Send + Sync {
    /// Names exported by the notebook at the resolved `url`, if known.
    fn exports(&self, url: &str) -> Option<Vec<String>>;
}

/// What import rewriting needs besides the source.
#[derive(Clone, Copy)]
pub struct ImportOptions<'a> {
    pub config: &'a CompilerConfig,
    pub resolver: Option<&'a dyn NotebookResolver>,
}

/// Replace the static imports of `program` with an awaited prelude.
///
/// `program` must have been parsed from the sourcemap's input as is.
/// Notebook imports add [`OBSERVABLE_RUNTIME`] to `inputs`.
pub fn rewrite_import_declarations(
    output: &mut Sourcemap,
    program: &Program<'_>,
    inputs: &mut Vec<String>,
    options: ImportOptions<'_>,
) -> Result<()> {
    let declarations: Vec<&ImportDeclaration<'_>> = program
        .body
        .iter()
        .filter_map(|statement| match statement {
            Statement::ImportDeclaration(import) => Some(&**import),
            _ => None,
        })
        .collect();

    let mut bindings = Vec::with_capacity(declarations.len());
    let mut imports = Vec::with_capacity(declarations.len());
    for import in &declarations {
        let span = Span::from(import.span);
        let trailing_newline = output.input().as_bytes().get(span.end) == Some(&b'\n');
        output.delete(span.start, span.end + usize::from(trailing_newline));
        bindings.push(render_bindings(import, output.input()));
        let resolution = resolve_specifier(&import.source.value, options.config)?;
        if is_observable_import(import) {
            imports.push(render_observable_import(import, &resolution, inputs, options)?);
        } else {
            let source = quote(&resolution);
            let source = if options.config.resolve_local_imports && is_local_specifier(&resolution)
            {
                format!("new URL({source}, document.baseURI)")
            } else {
                source
            };
            imports.push(render_import(&source, import, output.input()));
        }
    }

    match declarations.len() {
        0 => {}
        1 => {
            output.insert_left(0, format!("const {} = await {};\n", bindings[0], imports[0]));
        }
        _ => {
            output.insert_left(
                0,
                format!(
                    "const [{}] = await Promise.all([{}]);\n",
                    bindings.join(", "),
                    imports.join(", ")
                ),
            );
        }
    }
    Ok(())
}

/// Resolve the specifiers of dynamic imports and `import.meta.resolve` calls.
///
/// With `resolve_local_imports`, local specifiers and `import.meta.url`
/// resolve against `document.baseURI` at runtime. Spans are mapped back to
/// the sourcemap's input through `frame`.
pub fn rewrite_import_expressions(
    output: &mut Sourcemap,
    statements: &[Statement<'_>],
    frame: Frame,
    options: ImportOptions<'_>,
) -> Result<()> {
    let mut finder = ImportExpressions {
        config: options.config,
        frame,
        edits: Vec::new(),
        error: None,
    };
    for statement in statements {
        finder.visit_statement(statement);
    }
    if let Some(error) = finder.error {
        return Err(error);
    }
    for (span, replacement) in finder.edits {
        output.replace_left(span.start, span.end, replacement);
    }
    Ok(())
}

struct ImportExpressions<'c> {
    config: &'c CompilerConfig,
    frame: Frame,
    edits: Vec<(Span, String)>,
    error: Option<Error>,
}

impl ImportExpressions<'_> {
    fn rewrite_source(&mut self, source: &StringLiteral<'_>, span: oxc::span::Span) {
        match resolve_specifier(&source.value, self.config) {
            Ok(resolution) => {
                let quoted = quote(&resolution);
                let replacement =
                    if self.config.resolve_local_imports && is_local_specifier(&resolution) {
                        format!("new URL({quoted}, document.baseURI).href")
                    } else {
                        quoted
                    };
                self.edits.push((self.frame.span(span), replacement));
            }
            Err(error) => {
                self.error.get_or_insert(error);
            }
        }
    }
}

impl<'a> Visit<'a> for ImportExpressions<'_> {
    fn visit_import_expression(&mut self, it: &ImportExpression<'a>) {
        if let Expression::StringLiteral(source) = &it.source {
            self.rewrite_source(source, source.span);
        }
        walk::walk_import_expression(self, it);
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if let Expression::StaticMemberExpression(callee) = &it.callee {
            if is_import_meta_member(callee, "resolve") {
                if let Some(Argument::StringLiteral(source)) = it.arguments.first() {
                    self.rewrite_source(source, it.span);
                    return;
                }
            }
        }
        walk::walk_call_expression(self, it);
    }

    fn visit_static_member_expression(&mut self, it: &StaticMemberExpression<'a>) {
        if self.config.resolve_local_imports && is_import_meta_member(it, "url") {
            self.edits
                .push((self.frame.span(it.span), "document.baseURI".to_string()));
            return;
        }
        walk::walk_static_member_expression(self, it);
    }
}

/// Whether `member` is `import.meta.<name>`.
fn is_import_meta_member(member: &StaticMemberExpression<'_>, name: &str) -> bool {
    !member.optional
        && member.property.name.as_str() == name
        && matches!(
            &member.object,
            Expression::MetaProperty(meta)
                if meta.meta.name.as_str() == "import" && meta.property.name.as_str() == "meta"
        )
}

/// Whether `import` loads an Observable notebook rather than an ES module.
fn is_observable_import(import: &ImportDeclaration<'_>) -> bool {
    import.source.value.starts_with("observable:") || attribute(import, "type") == Some("observable")
}

/// The value of the import attribute `key`, if present.
fn attribute<'i>(import: &'i ImportDeclaration<'_>, key: &str) -> Option<&'i str> {
    let clause = import.with_clause.as_ref()?;
    clause
        .with_entries
        .iter()
        .find(|entry| match &entry.key {
            ImportAttributeKey::Identifier(ident) => ident.name.as_str() == key,
            ImportAttributeKey::StringLiteral(lit) => lit.value.as_str() == key,
        })
        .map(|entry| entry.value.value.as_str())
}

/// The source text of the import attributes, without their braces.
fn attributes_text<'s>(import: &ImportDeclaration<'_>, input: &'s str) -> Option<&'s str> {
    let entries = &import.with_clause.as_ref()?.with_entries;
    let (first, last) = (entries.first()?, entries.last()?);
    Some(Span::new(first.span.start as usize, last.span.end as usize).text(input))
}

fn specifiers<'i, 'a>(
    import: &'i ImportDeclaration<'a>,
) -> impl Iterator<Item = &'i ImportDeclarationSpecifier<'a>> {
    import.specifiers.iter().flatten()
}

/// The name a specifier imports, as it appears in the module's exports.
fn imported_name<'i>(specifier: &'i ImportDeclarationSpecifier<'_>) -> Option<&'i str> {
    match specifier {
        ImportDeclarationSpecifier::ImportDefaultSpecifier(_) => Some("default"),
        ImportDeclarationSpecifier::ImportSpecifier(specifier) => Some(match &specifier.imported {
            ModuleExportName::IdentifierName(ident) => ident.name.as_str(),
            ModuleExportName::IdentifierReference(ident) => ident.name.as_str(),
            ModuleExportName::StringLiteral(lit) => lit.value.as_str(),
        }),
        ImportDeclarationSpecifier::ImportNamespaceSpecifier(_) => None,
    }
}

/// The destructuring pattern for one import: `{a, b: c}`, a namespace name, or `{}`.
fn render_bindings(import: &ImportDeclaration<'_>, input: &str) -> String {
    let named: Vec<String> = specifiers(import)
        .filter_map(|specifier| match specifier {
            ImportDeclarationSpecifier::ImportNamespaceSpecifier(_) => None,
            ImportDeclarationSpecifier::ImportSpecifier(named) => {
                let local = named.local.name.as_str();
                Some(match &named.imported {
                    ModuleExportName::StringLiteral(lit) => {
                        format!("{}: {local}", Span::from(lit.span).text(input))
                    }
                    _ => match imported_name(specifier) {
                        Some(name) if name == local => local.to_string(),
                        Some(name) => format!("{name}: {local}"),
                        None => local.to_string(),
                    },
                })
            }
            ImportDeclarationSpecifier::ImportDefaultSpecifier(default) => {
                Some(format!("default: {}", default.local.name))
            }
        })
        .collect();
    if !named.is_empty() {
        return format!("{{{}}}", named.join(", "));
    }
    specifiers(import)
        .find_map(|specifier| match specifier {
            ImportDeclarationSpecifier::ImportNamespaceSpecifier(namespace) => {
                Some(namespace.local.name.to_string())
            }
            _ => None,
        })
        .unwrap_or_else(|| "{}".to_string())
}

fn render_import(source: &str, import: &ImportDeclaration<'_>, input: &str) -> String {
    let mut rendered = format!("import({source}");
    if let Some(attributes) = attributes_text(import, input) {
        rendered.push_str(&format!(", {{with: {{{attributes}}}}}"));
    }
    rendered.push(')');
    let names: Vec<&str> = specifiers(import).filter_map(imported_name).collect();
    if !names.is_empty() {
        rendered.push_str(".then((module) => {");
        for name in names {
            rendered.push_str(&format!(
                "\n  if (!({} in module)) throw new SyntaxError(`export '{name}' not found`);",
                quote(name)
            ));
        }
        rendered.push_str("\n  return module;\n})");
    }
    rendered
}

fn render_observable_import(
    import: &ImportDeclaration<'_>,
    resolution: &str,
    inputs: &mut Vec<String>,
    options: ImportOptions<'_>,
) -> Result<String> {
    let names: Vec<&str> = specifiers(import).filter_map(imported_name).collect();
    if let Some(exports) = options.resolver.and_then(|resolver| resolver.exports(resolution)) {
        if let Some(missing) = names.iter().find(|name| !exports.iter().any(|e| e == *name)) {
            return Err(Error::import_resolution(
                import.source.value.as_str(),
                format!("export '{missing}' not found"),
            ));
        }
    }
    if !inputs.iter().any(|input| input == OBSERVABLE_RUNTIME) {
        inputs.push(OBSERVABLE_RUNTIME.to_string());
    }
    let names: Vec<String> = names.iter().map(|name| quote(name)).collect();
    Ok(format!(
        "import({}).then((module) => {OBSERVABLE_RUNTIME}.module(module.default, [{}]))",
        quote(resolution),
        names.join(", ")
    ))
}

/// `value` as a JavaScript string literal.
pub(crate) fn quote(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}
