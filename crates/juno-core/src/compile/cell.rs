//! Cell compiler for Juno notebooks.
//!
//! Dispatches each cell on its mode: JavaScript compiles directly,
//! TypeScript after its types are stripped, Observable JavaScript through its
//! own lowering, and every other mode as a tagged template expression.

use std::sync::Arc;

use rayon::prelude::*;

use crate::cell::{Cell, Mode};
use crate::error::Result;
use crate::syntax::check_nesting;

use super::imports::{ImportOptions, NotebookResolver};
use super::javascript::transpile_javascript;
use super::observable::transpile_observable;
use super::template::transpile_template;
use super::types::{CompilerConfig, TranspiledUnit};
use super::typescript::strip_types;

/// Compiles notebook cells into function bodies.
///
/// A compiler holds no per-cell state, so one instance can compile cells
/// from many threads at once.
#[derive(Clone, Default)]
pub struct Compiler {
    /// Compiler configuration
    config: CompilerConfig,

    /// Export lists for notebook imports
    resolver: Option<Arc<dyn NotebookResolver>>,
}

impl Compiler {
    /// Create a new compiler.
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            resolver: None,
        }
    }

    /// Check notebook imports against the exports `resolver` reports.
    pub fn with_resolver(mut self, resolver: Arc<dyn NotebookResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile one cell.
    pub fn compile(&self, cell: &Cell) -> Result<TranspiledUnit> {
        let options = ImportOptions {
            config: &self.config,
            resolver: self.resolver.as_deref(),
        };
        let mut unit = match &cell.mode {
            Mode::Js => transpile_javascript(&cell.value, options)?,
            Mode::Ts => {
                check_nesting(&cell.value, self.config.max_nesting)?;
                transpile_javascript(&strip_types(&cell.value)?, options)?
            }
            Mode::Ojs => transpile_observable(&cell.value, options)?,
            _ => transpile_javascript(&transpile_template(cell)?, options)?,
        };

        if unit.output.is_none() {
            unit.output.clone_from(&cell.output);
        }
        if cell.hidden {
            unit.autodisplay = false;
        } else if !cell.mode.is_script() {
            unit.autodisplay = !cell.value.is_empty();
            unit.autoview = cell.mode == Mode::Sql && unit.autodisplay && unit.output.is_some();
            if unit.autoview {
                unit.output = unit.output.map(|output| format!("viewof${output}"));
            }
        }

        tracing::debug!(
            cell = %cell.id,
            mode = cell.mode.name(),
            inputs = unit.inputs.len(),
            outputs = unit.outputs.as_ref().map_or(0, Vec::len),
            "compiled cell"
        );
        Ok(unit)
    }

    /// Compile `cells` in parallel.
    ///
    /// Results are in the order of `cells`; a failing cell does not stop the
    /// others.
    pub fn compile_all(&self, cells: &[Cell]) -> Vec<Result<TranspiledUnit>> {
        cells
            .par_iter()
            .map(|cell| {
                let result = self.compile(cell);
                if let Err(e) = &result {
                    tracing::warn!("Failed to compile cell {}: {}", cell.id, e);
                }
                result
            })
            .collect()
    }
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("config", &self.config)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Format;
    use crate::error::ErrorKind;

    fn compile(cell: Cell) -> TranspiledUnit {
        Compiler::default().compile(&cell).unwrap()
    }

    #[test]
    fn test_output_defaults_to_cell_output() {
        let unit = compile(Cell::js(1, "1 + 2").with_output("three"));
        assert_eq!(unit.output.as_deref(), Some("three"));
        assert!(unit.autodisplay);
    }

    #[test]
    fn test_hidden_cells_never_display() {
        assert!(!compile(Cell::js(1, "1 + 2").with_hidden(true)).autodisplay);
        assert!(!compile(Cell::new(2, "# Hi", Mode::Md).with_hidden(true)).autodisplay);
        assert!(!compile(Cell::new(3, "x", Mode::Ojs).with_hidden(true)).autodisplay);
    }

    #[test]
    fn test_markdown() {
        let unit = compile(Cell::new(1, r#"Hello, ${"world"}!"#, Mode::Md));
        assert_eq!(unit.body, "(md) => {\nreturn (\nmd`Hello, ${\"world\"}!`\n)\n}");
        assert_eq!(unit.inputs, vec!["md"]);
        assert!(unit.autodisplay);
        assert!(!unit.autoview);
    }

    #[test]
    fn test_empty_template() {
        let unit = compile(Cell::new(1, "", Mode::Html));
        assert_eq!(unit.body, "() => {\n\n}");
        assert!(!unit.autodisplay);
    }

    #[test]
    fn test_sql_view() {
        let unit = compile(Cell::new(1, "SELECT 1", Mode::Sql).with_output("rows"));
        assert_eq!(unit.output.as_deref(), Some("viewof$rows"));
        assert!(unit.autoview);
        assert_eq!(unit.inputs, vec!["db", "Inputs"]);

        let unit = compile(Cell::new(2, "SELECT 1", Mode::Sql));
        assert!(unit.autodisplay);
        assert!(!unit.autoview);
        assert_eq!(unit.output, None);
    }

    #[test]
    fn test_typescript() {
        let unit = compile(Cell::new(1, "const x: number = y;", Mode::Ts));
        assert_eq!(unit.inputs, vec!["y"]);
        assert_eq!(unit.outputs, Some(vec!["x".to_string()]));
        assert_eq!(unit.body, "(y) => {\nconst x = y;\nreturn {x};\n}");
    }

    #[test]
    fn test_interpreter() {
        let cell = Cell::new(7, "print(1)", "python".parse().unwrap()).with_format(Format::Json);
        let unit = compile(cell);
        assert_eq!(unit.inputs, vec!["Interpreter"]);
        assert!(unit.body.contains(r#"Interpreter("python", {id: 7, format: "json"}).run(`print(1)`).then((file) => file.json())"#));
        assert!(unit.autodisplay);
    }

    #[test]
    fn test_observable_output_wins() {
        let unit = compile(Cell::new(1, "x = 1", Mode::Ojs).with_output("ignored"));
        assert_eq!(unit.output.as_deref(), Some("x"));
    }

    #[test]
    fn test_compile_all_keeps_order() {
        let cells = vec![
            Cell::js(1, "a + 1"),
            Cell::js(2, "foo = 1;"),
            Cell::new(3, "b", Mode::Ojs),
        ];
        let results = Compiler::default().compile_all(&cells);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().inputs, vec!["a"]);
        assert_eq!(results[1].as_ref().unwrap_err().kind(), ErrorKind::ScopeViolation);
        assert_eq!(results[2].as_ref().unwrap().inputs, vec!["b"]);
    }

    #[test]
    fn test_deeply_nested_cell_fails_alone() {
        let deep = format!("{}1{}", "(".repeat(1000), ")".repeat(1000));
        let cells = vec![
            Cell::js(1, deep.clone()),
            Cell::js(2, "x + 1"),
            Cell::new(3, deep.clone(), Mode::Ts),
            Cell::new(4, deep, Mode::Ojs),
            Cell::js(5, format!("{}1{}", "[".repeat(20), "]".repeat(20))),
        ];
        let results = Compiler::default().compile_all(&cells);
        for i in [0, 2, 3] {
            assert_eq!(results[i].as_ref().unwrap_err().kind(), ErrorKind::Syntax);
        }
        assert_eq!(results[1].as_ref().unwrap().inputs, vec!["x"]);
        assert!(results[4].is_ok());
    }

    #[test]
    fn test_nesting_limit_is_configurable() {
        let compiler = Compiler::new(CompilerConfig::default().with_max_nesting(2));
        assert!(compiler.compile(&Cell::js(1, "[[1]]")).is_ok());
        assert!(compiler.compile(&Cell::js(2, "[[[1]]]")).is_err());
    }

    #[test]
    fn test_compiler_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Compiler>();
    }
}
