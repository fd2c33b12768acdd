//! Import specifier resolution.
//!
//! Registry shorthands resolve to CDN URLs; every other specifier is kept.
//!
//! ```text
//! npm:d3@7/dist/d3.js      https://cdn.jsdelivr.net/npm/d3@7/dist/d3.js
//! npm:@observablehq/plot   https://cdn.jsdelivr.net/npm/@observablehq/plot/+esm
//! jsr:@std/fmt@1/colors    https://esm.sh/jsr/@std/fmt@1/colors
//! observable:@user/nb      https://api.observablehq.com/@user/nb.js?v=4
//! ```

use super::types::CompilerConfig;
use crate::error::{Error, Result};

/// Resolve `specifier` according to `config`.
pub fn resolve_specifier(specifier: &str, config: &CompilerConfig) -> Result<String> {
    let resolution = if let Some(rest) = specifier.strip_prefix("npm:") {
        resolve_npm(specifier, rest, config)?
    } else if let Some(rest) = specifier.strip_prefix("jsr:") {
        resolve_jsr(specifier, rest, config)?
    } else if let Some(rest) = specifier.strip_prefix("observable:") {
        resolve_observable(specifier, rest, config)?
    } else {
        return Ok(specifier.to_string());
    };
    tracing::trace!(specifier, resolution = %resolution, "resolved import");
    Ok(resolution)
}

/// Whether `specifier` is relative to the current document.
pub fn is_local_specifier(specifier: &str) -> bool {
    ["./", "../", "/"]
        .iter()
        .any(|prefix| specifier.starts_with(prefix))
}

/// A registry specifier split into package name, optional range and optional path.
#[derive(Debug, PartialEq, Eq)]
struct PackageSpecifier<'a> {
    name: &'a str,
    range: Option<&'a str>,
    path: Option<&'a str>,
}

fn parse_package<'a>(specifier: &str, rest: &'a str) -> Result<PackageSpecifier<'a>> {
    let invalid = |message: &str| Error::import_resolution(specifier, message);
    // The package segment ends at the first slash, or the second for scoped names.
    let package_end = if rest.starts_with('@') {
        let scope_end = rest
            .find('/')
            .ok_or_else(|| invalid("scoped package name is missing a '/'"))?;
        if scope_end == 1 {
            return Err(invalid("empty package scope"));
        }
        rest[scope_end + 1..]
            .find('/')
            .map_or(rest.len(), |i| scope_end + 1 + i)
    } else {
        rest.find('/').unwrap_or(rest.len())
    };
    let package = &rest[..package_end];
    let path = rest.get(package_end + 1..).filter(|path| !path.is_empty());
    // Skip the scope's leading '@' when looking for a version separator.
    let (name, range) = match package.get(1..).and_then(|tail| tail.find('@')) {
        Some(i) => (&package[..i + 1], Some(&package[i + 2..])),
        None => (package, None),
    };
    if name.is_empty() || name.ends_with('/') {
        return Err(invalid("missing package name"));
    }
    if range == Some("") {
        return Err(invalid("empty version range"));
    }
    Ok(PackageSpecifier { name, range, path })
}

fn resolve_npm(specifier: &str, rest: &str, config: &CompilerConfig) -> Result<String> {
    let package = parse_package(specifier, rest)?;
    let version = package
        .range
        .or_else(|| config.npm_pins.get(package.name).map(String::as_str));
    Ok(format!(
        "{}/{}{}/{}",
        config.npm_cdn,
        package.name,
        version.map(|v| format!("@{v}")).unwrap_or_default(),
        package.path.unwrap_or("+esm"),
    ))
}

fn resolve_jsr(specifier: &str, rest: &str, config: &CompilerConfig) -> Result<String> {
    if !rest.starts_with('@') {
        return Err(Error::import_resolution(
            specifier,
            "jsr packages must be scoped (jsr:@scope/name)",
        ));
    }
    let package = parse_package(specifier, rest)?;
    Ok(format!(
        "{}/{}{}{}",
        config.jsr_cdn,
        package.name,
        package.range.map(|v| format!("@{v}")).unwrap_or_default(),
        package.path.map(|p| format!("/{p}")).unwrap_or_default(),
    ))
}

fn resolve_observable(specifier: &str, rest: &str, config: &CompilerConfig) -> Result<String> {
    let valid = match rest.split_once('/') {
        Some((owner, notebook)) => {
            ((owner.len() > 1 && owner.starts_with('@')) || owner == "d")
                && !notebook.is_empty()
                && !notebook.contains('/')
        }
        None => false,
    };
    if !valid {
        return Err(Error::import_resolution(
            specifier,
            "expected observable:@user/notebook or observable:d/id",
        ));
    }
    Ok(format!("{}/{}.js?v=4", config.observable_api, rest))
}
