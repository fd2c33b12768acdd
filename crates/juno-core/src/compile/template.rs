//! Template cells.
//!
//! Markdown, HTML, TeX, dot, SQL and interpreter cells compile to a tagged
//! template literal whose tag renders the cell. The cell value is the body of
//! the template: literal text with `${…}` interpolations, except for
//! interpreter cells whose value is passed through as opaque source.

use oxc::allocator::Allocator;
use oxc::span::SourceType;

use crate::cell::{Cell, DEFAULT_DATABASE, Mode};
use crate::compile::imports::quote;
use crate::compile::interpreters::decode_method;
use crate::error::{Error, Result};
use crate::sourcemap::Sourcemap;
use crate::syntax::{
    DEFAULT_MAX_NESTING, Frame, Scanner, Span, parenthesized, parse_module, syntax_error,
};

/// A cell value parsed as the inside of a template literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateBody {
    /// Literal chunks; always one more than `exprs`.
    pub quasis: Vec<Span>,
    /// The source of each interpolated expression, without `${` and `}`.
    pub exprs: Vec<Span>,
}

/// Parse `input` as the contents of a template literal.
///
/// Backticks need no escaping here; a backslash escapes the following
/// character, so `\${` stays literal. Each interpolation must hold exactly
/// one JavaScript expression.
pub fn parse_template(input: &str) -> Result<TemplateBody> {
    let bytes = input.as_bytes();
    let mut quasis = Vec::new();
    let mut exprs = Vec::new();
    let mut pos = 0;
    loop {
        let start = pos;
        while pos < bytes.len() {
            match bytes[pos] {
                b'\\' if pos + 1 < bytes.len() => pos += 1,
                b'$' if bytes.get(pos + 1) == Some(&b'{') => break,
                _ => {}
            }
            pos += 1;
        }
        quasis.push(Span::new(start, pos));
        if pos >= bytes.len() {
            break;
        }
        let expr = interpolation(input, pos)?;
        check_expression(input, expr)?;
        exprs.push(expr);
        pos = expr.end + 1;
    }
    Ok(TemplateBody { quasis, exprs })
}

/// The source of the interpolation opening with the `${` at `open`.
fn interpolation(input: &str, open: usize) -> Result<Span> {
    let start = open + 2;
    let mut scanner = Scanner::at(input, start);
    let mut braces = 0usize;
    while let Some(token) = scanner.next() {
        if scanner.depth() > DEFAULT_MAX_NESTING {
            return Err(Error::syntax(
                format!("Brackets nested deeper than {DEFAULT_MAX_NESTING} levels"),
                token.span,
                input,
            ));
        }
        if token.is_punct(b'{') {
            braces += 1;
        } else if token.is_punct(b'}') {
            match braces.checked_sub(1) {
                Some(depth) => braces = depth,
                None => return Ok(Span::new(start, token.span.start)),
            }
        }
    }
    Err(Error::syntax(
        "Unterminated template",
        Span::new(open, input.len()),
        input,
    ))
}

/// Fail unless `expr` is a single JavaScript expression.
fn check_expression(input: &str, expr: Span) -> Result<()> {
    let text = expr.text(input);
    if text.trim().is_empty() {
        return Err(Error::syntax(
            "Unexpected token",
            Span::new(expr.end, expr.end + 1),
            input,
        ));
    }
    let allocator = Allocator::default();
    let wrapped = format!("({text}\n)");
    let frame = Frame::wrapped(1, expr.start, input.len());
    let program = parse_module(&allocator, &wrapped, SourceType::mjs())
        .map_err(|diagnostic| syntax_error(&diagnostic, frame, input))?;
    match parenthesized(&program, wrapped.len()) {
        Some(_) => Ok(()),
        None => Err(Error::syntax("Unexpected token", expr, input)),
    }
}

/// Compile a template cell into a tagged template expression.
///
/// Empty cells compile to the empty string.
pub fn transpile_template(cell: &Cell) -> Result<String> {
    let input = cell.value.as_str();
    if input.is_empty() {
        return Ok(String::new());
    }
    let mut source = Sourcemap::new(input);
    let whole = Span::new(0, input.len());
    if cell.mode.is_interpreter() {
        escape_backticks(&mut source, whole);
        escape_backslashes(&mut source, whole);
        escape_dollar_curly(&mut source, whole);
    } else {
        let template = parse_template(input)?;
        if cell.mode == Mode::Md {
            for &quasi in &template.quasis {
                escape_backticks(&mut source, quasi);
                escape_literal_backslashes(&mut source, quasi);
            }
        } else {
            for &quasi in &template.quasis {
                escape_backticks(&mut source, quasi);
            }
            interpolate_terminal_backslash(&mut source);
        }
    }
    source
        .insert_left(0, "`")
        .insert_right(input.len(), "`")
        .insert_left(0, tag(cell));
    Ok(format!("{source}{}", suffix(cell)))
}

fn tag(cell: &Cell) -> String {
    match &cell.mode {
        Mode::Tex => "tex.block".to_string(),
        Mode::Sql => sql_tag(cell),
        Mode::Interpreter(name) => interpreter_tag(cell, name),
        mode => mode.name().to_string(),
    }
}

fn sql_tag(cell: &Cell) -> String {
    let database = cell.database.as_deref().unwrap_or(DEFAULT_DATABASE);
    if let Some(name) = database.strip_prefix("var:") {
        return format!("{name}.sql");
    }
    let mut options = format!("id: {}", cell.id);
    if let Some(since) = cell.since_iso() {
        options.push_str(&format!(", since: {}", quote(&since)));
    }
    format!("DatabaseClient({}, {{{options}}}).sql", quote(database))
}

fn interpreter_tag(cell: &Cell, name: &str) -> String {
    let mut options = format!("id: {}", cell.id);
    if let Some(format) = cell.format {
        options.push_str(&format!(", format: {}", quote(format.name())));
    }
    if let Some(since) = cell.since_iso() {
        options.push_str(&format!(", since: {}", quote(&since)));
    }
    format!("Interpreter({}, {{{options}}}).run(", quote(name))
}

fn suffix(cell: &Cell) -> String {
    match &cell.mode {
        Mode::Sql if !cell.hidden => ".then(Inputs.table)".to_string(),
        Mode::Interpreter(_) => match cell.format {
            Some(format) => format!(").then((file) => file{})", decode_method(format)),
            None => ")".to_string(),
        },
        _ => String::new(),
    }
}

fn escape_backticks(source: &mut Sourcemap, span: Span) {
    escape_each(source, span, b'`');
}

fn escape_backslashes(source: &mut Sourcemap, span: Span) {
    escape_each(source, span, b'\\');
}

fn escape_each(source: &mut Sourcemap, span: Span, target: u8) {
    let positions: Vec<usize> = (span.start..span.end)
        .filter(|&i| source.input().as_bytes()[i] == target)
        .collect();
    for i in positions {
        source.insert_right(i, "\\");
    }
}

/// Turn `${` into `$\{` so it survives as literal text.
fn escape_dollar_curly(source: &mut Sourcemap, span: Span) {
    let bytes = source.input().as_bytes();
    let positions: Vec<usize> = (span.start.max(1)..span.end)
        .filter(|&i| bytes[i] == b'{' && bytes[i - 1] == b'$')
        .collect();
    for i in positions {
        source.insert_right(i, "\\");
    }
}

/// Escape backslashes, except those that keep a `${` literal (`\${` or `$\{`).
fn escape_literal_backslashes(source: &mut Sourcemap, span: Span) {
    let bytes = source.input().as_bytes();
    let at = |i: usize| bytes.get(i).copied();
    let mut positions = Vec::new();
    let mut after_dollar = false;
    let mut odd_backslashes = false;
    for i in span.start..span.end {
        match bytes[i] {
            b'$' => {
                after_dollar = true;
                odd_backslashes = false;
            }
            b'\\' => {
                odd_backslashes = !odd_backslashes;
                if after_dollar && at(i + 1) == Some(b'{') {
                    continue;
                }
                if odd_backslashes && at(i + 1) == Some(b'$') && at(i + 2) == Some(b'{') {
                    continue;
                }
                positions.push(i);
            }
            _ => {
                after_dollar = false;
                odd_backslashes = false;
            }
        }
    }
    for i in positions {
        source.insert_right(i, "\\");
    }
}

/// Keep an odd run of trailing backslashes from escaping the closing backtick.
fn interpolate_terminal_backslash(source: &mut Sourcemap) {
    let len = source.input().len();
    let trailing = source
        .input()
        .bytes()
        .rev()
        .take_while(|&b| b == b'\\')
        .count();
    if trailing % 2 == 1 {
        source.replace_right(len - 1, len, r"${'\\'}");
    }
}
