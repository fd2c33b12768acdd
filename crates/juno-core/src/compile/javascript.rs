//! JavaScript cells.

use oxc::allocator::Allocator;

use super::imports::{ImportOptions, rewrite_import_declarations, rewrite_import_expressions};
use super::types::TranspiledUnit;
use crate::analyze::parse_unit;
use crate::error::Result;
use crate::sourcemap::Sourcemap;
use crate::syntax::check_nesting;

/// Compile JavaScript source into the body of a cell function.
///
/// The function takes the free references of `input` as arguments, in order
/// of first use. Expressions return their value; programs return an object of
/// their top-level declarations. Static imports make the function async.
pub fn transpile_javascript(input: &str, options: ImportOptions<'_>) -> Result<TranspiledUnit> {
    check_nesting(input, options.config.max_nesting)?;
    let allocator = Allocator::default();
    let unit = parse_unit(&allocator, input, &options.config.globals)?;
    let mut inputs = unit.input_names();
    let outputs = unit.output_names();
    let is_async = unit.has_top_level_await || unit.has_imports();

    let mut output = Sourcemap::new(input);
    output.trim();
    if !unit.is_expression {
        rewrite_import_declarations(&mut output, unit.program, &mut inputs, options)?;
    }
    rewrite_import_expressions(&mut output, &unit.program.body, unit.frame, options)?;
    if unit.is_expression {
        output.insert_left(0, "return (\n");
    }
    let header = format!("{}({}) => {{\n", if is_async { "async " } else { "" }, inputs.join(","));
    output.insert_left(0, header);
    if let Some(outputs) = outputs.as_ref().filter(|outputs| !outputs.is_empty()) {
        output.insert_right(input.len(), format!("\nreturn {{{}}};", outputs.join(",")));
    }
    if unit.is_expression {
        output.insert_right(input.len(), "\n)");
    }
    output.insert_right(input.len(), "\n}");

    let autodisplay =
        unit.is_expression && !inputs.iter().any(|name| name == "display" || name == "view");
    Ok(TranspiledUnit {
        body: output.to_string(),
        inputs,
        outputs,
        output: None,
        autodisplay,
        autoview: false,
        automutable: false,
    })
}
