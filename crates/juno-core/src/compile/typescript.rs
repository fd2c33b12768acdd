//! TypeScript cells.
//!
//! Types are removed with the oxc transformer and the result is printed
//! back as JavaScript. Syntax errors point into the cell; the printed code
//! does not keep the cell's layout.

use std::path::Path;

use oxc::allocator::Allocator;
use oxc::codegen::Codegen;
use oxc::parser::{ParseOptions, Parser};
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;
use oxc::transformer::{TransformOptions, Transformer};

use crate::error::{Error, Result};
use crate::syntax::{
    DEFAULT_MAX_NESTING, Frame, check_nesting, diagnostic_span, is_wrapped_expression,
    parse_module, syntax_error,
};

/// Strip TypeScript-only syntax from `input`.
///
/// Input shaped like a single expression is stripped as an expression, so
/// `{x: 42}` stays an object literal rather than becoming a block.
pub fn strip_types(input: &str) -> Result<String> {
    check_nesting(input, DEFAULT_MAX_NESTING)?;
    let wrapped = format!("({input}\n)");
    let is_expression = {
        let allocator = Allocator::default();
        parse_module(&allocator, &wrapped, SourceType::ts())
            .is_ok_and(|program| is_wrapped_expression(&program, wrapped.len()))
    };
    if is_expression {
        let code = transpile(&wrapped, Frame::wrapped(1, 0, input.len()), input)?;
        let code = code.trim_end();
        return Ok(code.strip_suffix(';').unwrap_or(code).to_string());
    }
    let code = transpile(input, Frame::identity(input.len()), input)?;
    Ok(code.trim_end().to_string())
}

/// Parse `text` as TypeScript, remove the types and print JavaScript.
fn transpile(text: &str, frame: Frame, input: &str) -> Result<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, text, SourceType::ts())
        .with_options(ParseOptions {
            preserve_parens: false,
            ..ParseOptions::default()
        })
        .parse();
    if let Some(diagnostic) = ret.errors.first() {
        return Err(syntax_error(diagnostic, frame, input));
    }
    let mut program = ret.program;
    if frame.is_wrapped() {
        // A trailing comment would otherwise be printed after the semicolon.
        program.comments.clear();
    }

    let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();
    let mut options = TransformOptions::default();
    options.typescript.only_remove_type_imports = true;
    let transformed = Transformer::new(&allocator, Path::new("cell.ts"), &options)
        .build_with_scoping(scoping, &mut program);
    if let Some(diagnostic) = transformed.errors.first() {
        return Err(Error::unsupported(
            diagnostic.message.to_string(),
            diagnostic_span(diagnostic, frame),
            input,
        ));
    }
    let code = Codegen::new().build(&program).code;
    tracing::trace!(bytes = code.len(), "stripped types");
    Ok(code)
}
