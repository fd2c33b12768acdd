//! Core compiler for Juno notebook cells.
//!
//! This crate provides:
//! - Parsing and scope resolution with oxc, plus a token scanner for cell headers
//! - Static analysis of cell inputs, outputs and assignments
//! - Import rewriting and specifier resolution
//! - Template, TypeScript and Observable JavaScript front ends
//! - The cell compiler producing [`TranspiledUnit`] function bodies
//!
//! ```
//! use juno_core::{Cell, Compiler};
//!
//! let unit = Compiler::default().compile(&Cell::js(1, "x * 2")).unwrap();
//! assert_eq!(unit.inputs, vec!["x"]);
//! assert_eq!(unit.body, "(x) => {\nreturn (\nx * 2\n)\n}");
//! ```

pub mod analyze;
pub mod cell;
pub mod compile;
pub mod error;
pub mod sourcemap;
pub mod syntax;

pub use analyze::Globals;
pub use cell::{Cell, CellId, Format, Mode, ParseCellError};
pub use compile::{Compiler, CompilerConfig, NotebookResolver, TranspiledUnit, strip_types};
pub use error::{Error, ErrorKind, Position, Result};
pub use sourcemap::Sourcemap;
