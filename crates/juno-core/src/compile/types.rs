//! Common types for the compilation pipeline.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::analyze::Globals;
use crate::syntax::DEFAULT_MAX_NESTING;

/// Configuration for the compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Names the host always provides; never inputs, never assignable.
    pub globals: Globals,

    /// Rewrite local specifiers (`./`, `../`, `/`) to resolve against
    /// `document.baseURI`, for output that is served from another location.
    pub resolve_local_imports: bool,

    /// Base URL for `npm:` specifiers.
    pub npm_cdn: String,

    /// Base URL for `jsr:` specifiers.
    pub jsr_cdn: String,

    /// Base URL for `observable:` notebook specifiers.
    pub observable_api: String,

    /// Versions used for `npm:` specifiers that name no range.
    pub npm_pins: IndexMap<String, String>,

    /// Deepest bracket nesting a script cell may have.
    pub max_nesting: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            globals: Globals::default(),
            resolve_local_imports: false,
            npm_cdn: "https://cdn.jsdelivr.net/npm".to_string(),
            jsr_cdn: "https://esm.sh/jsr".to_string(),
            observable_api: "https://api.observablehq.com".to_string(),
            npm_pins: IndexMap::new(),
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }
}

impl CompilerConfig {
    /// Parse a config from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn with_globals(mut self, globals: Globals) -> Self {
        self.globals = globals;
        self
    }

    pub fn with_resolve_local_imports(mut self, resolve: bool) -> Self {
        self.resolve_local_imports = resolve;
        self
    }

    pub fn with_npm_cdn(mut self, base: impl Into<String>) -> Self {
        self.npm_cdn = base.into();
        self
    }

    pub fn with_jsr_cdn(mut self, base: impl Into<String>) -> Self {
        self.jsr_cdn = base.into();
        self
    }

    pub fn with_observable_api(mut self, base: impl Into<String>) -> Self {
        self.observable_api = base.into();
        self
    }

    /// Pin `package` to `version` when imported without a range.
    pub fn with_npm_pin(mut self, package: impl Into<String>, version: impl Into<String>) -> Self {
        self.npm_pins.insert(package.into(), version.into());
        self
    }

    pub fn with_max_nesting(mut self, limit: usize) -> Self {
        self.max_nesting = limit;
        self
    }
}

/// Result of compiling a cell.
///
/// `body` is the source of a JavaScript function taking `inputs` in order.
/// The function returns an object of `outputs` when present, otherwise the
/// single value named by `output`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranspiledUnit {
    pub body: String,
    pub inputs: Vec<String>,
    /// Top-level declarations; `None` when the body is an expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Implicitly display the value.
    pub autodisplay: bool,
    /// Derive a view; the output is `viewof$<name>`.
    pub autoview: bool,
    /// Derive a mutable; the output is `mutable$<name>`.
    pub automutable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert!(config.globals.contains("Math"));
        assert!(!config.resolve_local_imports);
        assert_eq!(config.npm_cdn, "https://cdn.jsdelivr.net/npm");
        assert_eq!(config.max_nesting, 64);
    }

    #[test]
    fn test_config_from_json() {
        let config = CompilerConfig::from_json(
            r#"{"resolve_local_imports": true, "globals": ["d3"], "npm_pins": {"d3": "7.9.0"}}"#,
        )
        .unwrap();
        assert!(config.resolve_local_imports);
        assert!(config.globals.contains("d3"));
        assert!(!config.globals.contains("Math"));
        assert_eq!(config.npm_pins.get("d3").map(String::as_str), Some("7.9.0"));
        assert_eq!(config.jsr_cdn, "https://esm.sh/jsr");
        assert!(CompilerConfig::from_json("{\"globals\": 1}").is_err());
    }

    #[test]
    fn test_builder() {
        let config = CompilerConfig::default()
            .with_resolve_local_imports(true)
            .with_npm_pin("lodash", "4.17.21")
            .with_npm_cdn("https://example.com/npm")
            .with_max_nesting(8);
        assert!(config.resolve_local_imports);
        assert_eq!(config.npm_pins.len(), 1);
        assert_eq!(config.npm_cdn, "https://example.com/npm");
        assert_eq!(config.max_nesting, 8);
    }

    #[test]
    fn test_transpiled_unit_json() {
        let unit = TranspiledUnit {
            body: "() => {\nreturn (\n1\n)\n}".into(),
            autodisplay: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&unit).unwrap();
        assert_eq!(json["autodisplay"], true);
        assert!(json.get("outputs").is_none());
        let back: TranspiledUnit = serde_json::from_value(json).unwrap();
        assert_eq!(back, unit);
    }
}
