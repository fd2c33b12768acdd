//! Parsing cell source with oxc.
//!
//! Cells are parsed as ES modules. Some cell shapes are parsed inside a
//! small wrapper (a bare expression inside parentheses, an Observable cell
//! inside a generator function); a [`Frame`] maps offsets in the wrapped
//! text back to the cell value so errors and rewrites point at the cell.

mod scan;

use oxc::allocator::Allocator;
use oxc::ast::ast::{Expression, Program, Statement};
use oxc::diagnostics::OxcDiagnostic;
use oxc::parser::{ParseOptions, Parser};
use oxc::span::SourceType;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use scan::{Scanner, Token, TokenKind};

/// Brackets may nest this deep before a cell is rejected.
pub const DEFAULT_MAX_NESTING: usize = 64;

/// A byte range in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Create a span covering `start..end`.
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length in bytes.
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span covers no bytes.
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The source text covered by this span.
    pub fn text(self, source: &str) -> &str {
        &source[self.start..self.end]
    }
}

impl From<oxc::span::Span> for Span {
    fn from(span: oxc::span::Span) -> Self {
        Self::new(span.start as usize, span.end as usize)
    }
}

/// A named occurrence in cell source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// Where a cell's text sits inside the text handed to the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Bytes of wrapper text before the cell text.
    prefix: usize,
    /// Offset of the wrapped text within the cell value.
    origin: usize,
    /// Length of the cell value.
    len: usize,
}

impl Frame {
    /// Text parsed as is.
    pub const fn identity(len: usize) -> Self {
        Self {
            prefix: 0,
            origin: 0,
            len,
        }
    }

    /// `value[origin..]` parsed after `prefix` bytes of wrapper text.
    pub const fn wrapped(prefix: usize, origin: usize, len: usize) -> Self {
        Self { prefix, origin, len }
    }

    /// Whether the cell text was wrapped before parsing.
    pub const fn is_wrapped(&self) -> bool {
        self.prefix > 0
    }

    /// Map an offset in the parsed text to an offset in the cell value.
    pub fn offset(&self, offset: usize) -> usize {
        (offset.saturating_sub(self.prefix) + self.origin).min(self.len)
    }

    /// Map a span of the parsed text to a span of the cell value.
    pub fn span(&self, span: oxc::span::Span) -> Span {
        Span::new(
            self.offset(span.start as usize),
            self.offset(span.end as usize),
        )
    }
}

/// Parse `text` as an ES module, failing on the first diagnostic.
pub fn parse_module<'a>(
    allocator: &'a Allocator,
    text: &'a str,
    source_type: SourceType,
) -> std::result::Result<Program<'a>, OxcDiagnostic> {
    let ret = Parser::new(allocator, text, source_type)
        .with_options(ParseOptions {
            preserve_parens: true,
            ..ParseOptions::default()
        })
        .parse();
    match ret.errors.into_iter().next() {
        Some(diagnostic) => Err(diagnostic),
        None => Ok(ret.program),
    }
}

/// The byte range a diagnostic points at, in cell coordinates.
pub fn diagnostic_span(diagnostic: &OxcDiagnostic, frame: Frame) -> Span {
    diagnostic
        .labels
        .as_ref()
        .and_then(|labels| labels.first())
        .map(|label| {
            Span::new(
                frame.offset(label.offset()),
                frame.offset(label.offset() + label.len()),
            )
        })
        .unwrap_or_default()
}

/// Convert a parser diagnostic into a syntax error against `input`.
pub fn syntax_error(diagnostic: &OxcDiagnostic, frame: Frame, input: &str) -> Error {
    Error::syntax(
        diagnostic.message.to_string(),
        diagnostic_span(diagnostic, frame),
        input,
    )
}

/// Whether `program` is exactly one parenthesized expression spanning all
/// `len` bytes of its source.
///
/// Named function and class expressions do not count; a cell holding one
/// declares that name instead of evaluating to a value.
pub fn is_wrapped_expression(program: &Program<'_>, len: usize) -> bool {
    parenthesized(program, len).is_some_and(|expression| !is_named_declaration(expression))
}

/// The expression inside the parentheses when `program` is exactly one
/// parenthesized expression spanning all `len` bytes of its source.
pub fn parenthesized<'p, 'a>(program: &'p Program<'a>, len: usize) -> Option<&'p Expression<'a>> {
    let [Statement::ExpressionStatement(statement)] = program.body.as_slice() else {
        return None;
    };
    let Expression::ParenthesizedExpression(paren) = &statement.expression else {
        return None;
    };
    (program.directives.is_empty() && paren.span.start == 0 && paren.span.end as usize == len)
        .then_some(&paren.expression)
}

fn is_named_declaration(expression: &Expression<'_>) -> bool {
    let mut expression = expression;
    while let Expression::ParenthesizedExpression(paren) = expression {
        expression = &paren.expression;
    }
    match expression {
        Expression::FunctionExpression(function) => function.id.is_some(),
        Expression::ClassExpression(class) => class.id.is_some(),
        _ => false,
    }
}

/// Fail when brackets in `source` nest deeper than `limit`.
///
/// Parsing and every later pass recurse on nesting, so this runs before any
/// of them.
pub fn check_nesting(source: &str, limit: usize) -> Result<()> {
    let mut scanner = Scanner::new(source);
    while let Some(token) = scanner.next() {
        if scanner.depth() > limit {
            return Err(Error::syntax(
                format!("Brackets nested deeper than {limit} levels"),
                token.span,
                source,
            ));
        }
    }
    Ok(())
}
