//! Observable JavaScript cells.
//!
//! An Observable cell is empty, a notebook import, or an optionally named
//! expression or block:
//!
//! ```text
//! import {a, b as c, viewof d, mutable e as f} from "@user/notebook"
//! viewof x = html`<input type=range>`
//! { for (let i = 0; ; ++i) yield i; }
//! ```
//!
//! `viewof x` reads the input `viewof$x`, and `mutable x` reads and writes
//! `mutable$x.value`. Operators are substituted with same-length identifiers
//! before parsing, so the rest of the cell parses as plain JavaScript with
//! unchanged offsets. A body is parsed inside an async generator function,
//! which allows `await`, `yield` and (in blocks) `return`. Imports are
//! lowered to notebook imports and compiled as ordinary JavaScript.

use oxc::allocator::Allocator;
use oxc::ast::ast::{
    Expression, Function, ImportDeclarationSpecifier, ModuleExportName, Program, Statement,
};
use oxc::semantic::SemanticBuilder;
use oxc::span::{GetSpan, SourceType};

use super::imports::ImportOptions;
use super::transpile_javascript;
use super::types::TranspiledUnit;
use crate::analyze::{
    check_assignments, find_references, has_top_level_await, has_top_level_yield,
};
use crate::error::{Error, Result};
use crate::sourcemap::Sourcemap;
use crate::syntax::{
    Frame, Scanner, Span, Token, TokenKind, check_nesting, parenthesized, parse_module,
    syntax_error,
};

/// How a named cell exposes its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    None,
    ViewOf,
    Mutable,
}

impl Modifier {
    fn from_word(word: &str) -> Self {
        match word {
            "viewof" => Modifier::ViewOf,
            "mutable" => Modifier::Mutable,
            _ => Modifier::None,
        }
    }

    fn prefixed(self, name: &str) -> String {
        match self {
            Modifier::None => name.to_string(),
            Modifier::ViewOf => format!("viewof${name}"),
            Modifier::Mutable => format!("mutable${name}"),
        }
    }
}

/// A `viewof x` or `mutable x` occurrence in the cell.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Operator {
    modifier: Modifier,
    name: String,
    /// From the modifier keyword through the name.
    span: Span,
}

/// Replace every operator in `input` with its prefixed identifier, padded
/// with spaces to the operator's length.
fn substitute_operators(input: &str) -> (String, Vec<Operator>) {
    let tokens: Vec<Token> = Scanner::new(input).collect();
    let mut source = input.to_string();
    let mut operators: Vec<Operator> = Vec::new();
    for (i, pair) in tokens.windows(2).enumerate() {
        let (keyword, name) = (pair[0], pair[1]);
        if keyword.kind != TokenKind::Word || name.kind != TokenKind::Word {
            continue;
        }
        let modifier = Modifier::from_word(keyword.text(input));
        if modifier == Modifier::None
            || matches!(name.text(input), "in" | "instanceof" | "of")
            || operators.last().is_some_and(|last| last.span.end > keyword.span.start)
            || (i > 0 && tokens[i - 1].is_punct(b'.'))
            || !input[keyword.span.end..name.span.start].trim().is_empty()
        {
            continue;
        }
        let span = Span::new(keyword.span.start, name.span.end);
        let identifier = modifier.prefixed(name.text(input));
        source.replace_range(
            span.start..span.end,
            &format!("{identifier:<width$}", width = span.len()),
        );
        operators.push(Operator {
            modifier,
            name: name.text(input).to_string(),
            span,
        });
    }
    (source, operators)
}

/// Compile an Observable JavaScript cell.
pub fn transpile_observable(input: &str, options: ImportOptions<'_>) -> Result<TranspiledUnit> {
    if input.trim().is_empty() {
        return transpile_javascript(input, options);
    }
    check_nesting(input, options.config.max_nesting)?;
    let (source, operators) = substitute_operators(input);
    let tokens: Vec<Token> = Scanner::new(&source).take(4).collect();
    let start = input.len() - input.trim_start().len();
    let word = |token: &Token| (token.kind == TokenKind::Word).then(|| token.text(&source));
    let (name, modifier, body_start) = match tokens.as_slice() {
        [first, second, ..] if first.is_word(&source, "import") && second.is_punct(b'{') => {
            return transpile_import(input, &source, &operators, options);
        }
        [first, eq, body, ..]
            if word(first).is_some()
                && eq.is_punct(b'=')
                && !body.is_punct(b'=')
                && !body.is_punct(b'>') =>
        {
            let (name, modifier) = match operators.iter().find(|op| op.span.start == first.span.start) {
                Some(op) => (op.name.clone(), op.modifier),
                None => (first.text(&source).to_string(), Modifier::None),
            };
            (Some(name), modifier, body.span.start)
        }
        [first, eq] if word(first).is_some() && eq.is_punct(b'=') => {
            return Err(Error::syntax(
                "Unexpected end of input",
                Span::new(input.len(), input.len()),
                input,
            ));
        }
        _ => (declared_name(&source, &tokens), Modifier::None, start),
    };
    transpile_body(input, &source, &operators, name, modifier, body_start, options)
}

/// The name of a leading function or class declaration, which names the cell.
fn declared_name(source: &str, tokens: &[Token]) -> Option<String> {
    let is = |token: &Token, word: &str| token.is_word(source, word);
    let name = match tokens {
        [function, star, name, ..] if is(function, "function") && star.is_punct(b'*') => name,
        [function, name, ..] if is(function, "function") || is(function, "class") => name,
        [asynk, function, star, name] if is(asynk, "async") && is(function, "function") && star.is_punct(b'*') => {
            name
        }
        [asynk, function, name, ..] if is(asynk, "async") && is(function, "function") => name,
        _ => return None,
    };
    (name.kind == TokenKind::Word).then(|| name.text(source).to_string())
}

/// The generator function a cell body was wrapped in, if the wrapper still
/// spans the whole text after parsing.
fn wrapper_function<'p, 'a>(program: &'p Program<'a>, len: usize) -> Option<&'p Function<'a>> {
    match parenthesized(program, len)? {
        Expression::FunctionExpression(function) => Some(function),
        _ => None,
    }
}

fn transpile_body(
    input: &str,
    source: &str,
    operators: &[Operator],
    name: Option<String>,
    modifier: Modifier,
    body_start: usize,
    options: ImportOptions<'_>,
) -> Result<TranspiledUnit> {
    let body = &source[body_start..];
    let is_block = body.starts_with('{');
    let (prefix, suffix) = if is_block {
        ("(async function* () ", "\n)")
    } else {
        ("(async function* () { return (", "\n) })")
    };
    let text = format!("{prefix}{body}{suffix}");
    let frame = Frame::wrapped(prefix.len(), body_start, input.len());
    let allocator = Allocator::default();
    let program = parse_module(&allocator, &text, SourceType::mjs())
        .map_err(|diagnostic| syntax_error(&diagnostic, frame, input))?;
    let function = wrapper_function(&program, text.len()).ok_or_else(|| {
        Error::syntax("Unexpected token", Span::new(body_start, input.len()), input)
    })?;
    let statements = match &function.body {
        Some(body) => body.statements.as_slice(),
        None => &[],
    };

    let semantic = SemanticBuilder::new()
        .with_check_syntax_error(true)
        .build(&program);
    if let Some(diagnostic) = semantic.errors.first() {
        return Err(syntax_error(diagnostic, frame, input));
    }
    let scoping = semantic.semantic.into_scoping();
    let references = find_references(statements, &scoping, frame);
    let operators: Vec<&Operator> = operators
        .iter()
        .filter(|op| op.span.start >= body_start)
        .collect();
    let globals = &options.config.globals;
    check_assignments(&references, globals, input, |reference| {
        operators
            .iter()
            .any(|op| op.modifier == Modifier::Mutable && op.span.start == reference.ident.span.start)
    })?;
    let mut inputs: Vec<String> = Vec::new();
    for reference in references.iter().filter(|reference| reference.is_input(globals)) {
        if !inputs.contains(&reference.ident.name) {
            inputs.push(reference.ident.name.clone());
        }
    }

    let is_async = has_top_level_await(statements);
    let is_generator = has_top_level_yield(statements);

    let mut output = Sourcemap::new(input);
    for op in &operators {
        let replacement = match op.modifier {
            Modifier::Mutable => format!("{}.value", op.modifier.prefixed(&op.name)),
            modifier => modifier.prefixed(&op.name),
        };
        output.replace_left(op.span.start, op.span.end, replacement);
    }
    let leading = if name.is_some() {
        body_start
    } else {
        input.len() - input.trim_start().len()
    };
    if leading > 0 {
        output.delete(0, leading);
    }
    let content_end = input.trim_end().len();
    if content_end < input.len() {
        output.delete(content_end, input.len());
    }
    if is_block {
        let block = function
            .body
            .as_ref()
            .map(|body| frame.span(body.span()))
            .unwrap_or_default();
        output.delete(block.start, block.start + 1);
        output.delete(block.end - 1, block.end);
    } else {
        output.insert_left(0, "return (\n");
    }
    let header = match (is_async, is_generator) {
        (false, false) => format!("({}) => {{\n", inputs.join(",")),
        (true, false) => format!("async ({}) => {{\n", inputs.join(",")),
        (false, true) => format!("function*({}) {{\n", inputs.join(",")),
        (true, true) => format!("async function*({}) {{\n", inputs.join(",")),
    };
    output.insert_left(0, header);
    if !is_block {
        output.insert_right(input.len(), "\n)");
    }
    output.insert_right(input.len(), "\n}");

    Ok(TranspiledUnit {
        body: output.to_string(),
        inputs,
        outputs: None,
        output: name.as_deref().map(|name| modifier.prefixed(name)),
        autodisplay: true,
        autoview: modifier == Modifier::ViewOf,
        automutable: modifier == Modifier::Mutable,
    })
}

/// One name in an Observable import clause.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ImportedCell {
    modifier: Modifier,
    imported: String,
    local: String,
}

impl ImportedCell {
    /// The specifiers of the equivalent notebook import.
    fn specifiers(&self) -> Vec<String> {
        let specifier = |imported: &str, local: &str| {
            if imported == local {
                imported.to_string()
            } else {
                format!("{imported} as {local}")
            }
        };
        let prefixed = specifier(
            &self.modifier.prefixed(&self.imported),
            &self.modifier.prefixed(&self.local),
        );
        match self.modifier {
            Modifier::ViewOf => vec![prefixed, specifier(&self.imported, &self.local)],
            Modifier::None | Modifier::Mutable => vec![prefixed],
        }
    }
}

/// Lower `import {…} from "notebook"` to a notebook import and compile it.
///
/// `source` is `input` with operators substituted.
fn transpile_import(
    input: &str,
    source: &str,
    operators: &[Operator],
    options: ImportOptions<'_>,
) -> Result<TranspiledUnit> {
    let allocator = Allocator::default();
    let frame = Frame::identity(input.len());
    let program = parse_module(&allocator, source, SourceType::mjs())
        .map_err(|diagnostic| syntax_error(&diagnostic, frame, input))?;
    let import = match program.body.as_slice() {
        [Statement::ImportDeclaration(import)] => import,
        [first, rest @ ..] => {
            let span = rest.first().unwrap_or(first).span();
            return Err(Error::syntax("Unexpected token", span.into(), input));
        }
        [] => return Err(Error::syntax("Unexpected token", Span::default(), input)),
    };

    // An operator starting where a name starts names the cell it prefixes.
    let unprefixed = |name: &str, start: u32| match operators
        .iter()
        .find(|op| op.span.start == start as usize)
    {
        Some(op) => (op.modifier, op.name.clone()),
        None => (Modifier::None, name.to_string()),
    };
    let mut cells = Vec::new();
    for specifier in import.specifiers.iter().flatten() {
        let ImportDeclarationSpecifier::ImportSpecifier(specifier) = specifier else {
            return Err(Error::syntax("Unexpected token", specifier.span().into(), input));
        };
        let ModuleExportName::IdentifierName(imported) = &specifier.imported else {
            return Err(Error::unsupported(
                "Unexpected string",
                specifier.imported.span().into(),
                input,
            ));
        };
        let (modifier, imported_name) = unprefixed(imported.name.as_str(), imported.span.start);
        let local = if specifier.local.span == imported.span {
            imported_name.clone()
        } else {
            unprefixed(specifier.local.name.as_str(), specifier.local.span.start).1
        };
        cells.push(ImportedCell {
            modifier,
            imported: imported_name,
            local,
        });
    }

    let notebook = import.source.value.as_str();
    let specifiers: Vec<String> = cells.iter().flat_map(ImportedCell::specifiers).collect();
    let javascript = format!(
        "import {{{}}} from {};",
        specifiers.join(", "),
        notebook_source(notebook)?
    );
    tracing::trace!(notebook, lowered = %javascript, "lowered notebook import");
    let mut unit = transpile_javascript(&javascript, options)?;
    unit.autodisplay = false;
    Ok(unit)
}

/// The source clause of a notebook import: `observable:` shorthands or a URL
/// marked with the `observable` type attribute.
fn notebook_source(notebook: &str) -> Result<String> {
    use super::imports::quote;
    if notebook.starts_with("https://") || notebook.starts_with("http://") {
        return Ok(format!("{} with {{type: \"observable\"}}", quote(notebook)));
    }
    if notebook.starts_with("observable:") {
        return Ok(quote(notebook));
    }
    if notebook.starts_with('@') || notebook.starts_with("d/") {
        return Ok(quote(&format!("observable:{notebook}")));
    }
    Err(Error::import_resolution(
        notebook,
        "expected a notebook such as @user/notebook, d/id or a URL",
    ))
}
