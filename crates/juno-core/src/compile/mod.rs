//! Compilation pipeline for Juno notebook cells.
//!
//! This module provides:
//! - The cell compiler (mode dispatch, display flags)
//! - JavaScript compilation (inputs, outputs, function body)
//! - Import rewriting and specifier resolution
//! - Template, TypeScript and Observable JavaScript front ends
//!
//! # Architecture
//!
//! ```text
//! Cell
//!   │
//!   ├── js ─────────────────────────────┐
//!   ├── ts ──► strip_types ─────────────┤
//!   ├── md, html, sql, … ──► template ──┴──► transpile_javascript ──► TranspiledUnit
//!   └── ojs ──► transpile_observable ────────────────────────────────► TranspiledUnit
//! ```

mod cell;
mod imports;
mod interpreters;
mod javascript;
mod observable;
mod resolve;
mod template;
mod types;
mod typescript;

pub use cell::Compiler;
pub use imports::{ImportOptions, NotebookResolver, OBSERVABLE_RUNTIME};
pub use interpreters::{decode_method, file_extension};
pub use javascript::transpile_javascript;
pub use observable::transpile_observable;
pub use resolve::{is_local_specifier, resolve_specifier};
pub use template::{TemplateBody, parse_template, transpile_template};
pub use types::{CompilerConfig, TranspiledUnit};
pub use typescript::strip_types;
