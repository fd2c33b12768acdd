//! Assignment legality.
//!
//! Free references are read-only inside a cell, and reserved globals can
//! never be assigned.

use super::globals::Globals;
use super::references::FreeReference;
use crate::error::{Error, Result};

/// Reject the first write among `references` that `exempt` does not allow.
///
/// `references` must be the free references of one body, in source order.
/// Writes to reserved globals are reported as such; any other free write is
/// an assignment to an external variable.
pub fn check_assignments(
    references: &[FreeReference],
    globals: &Globals,
    input: &str,
    exempt: impl Fn(&FreeReference) -> bool,
) -> Result<()> {
    let Some(reference) = references
        .iter()
        .find(|reference| reference.is_write && !exempt(reference))
    else {
        return Ok(());
    };
    let name = &reference.ident.name;
    let message = if globals.contains(name) {
        format!("Assignment to global '{name}'")
    } else {
        format!("Assignment to external variable '{name}'")
    };
    Err(Error::scope_violation(
        message,
        name,
        reference.ident.span,
        input,
    ))
}
