//! Error types for juno-core.

use thiserror::Error;

use crate::syntax::Span;

/// Result type for juno-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A line/column position in cell source.
///
/// Lines are 1-indexed and columns are 0-indexed byte offsets within the
/// line, matching what JavaScript tooling reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Compute the position of a byte offset within `input`.
    pub fn locate(input: &str, offset: usize) -> Self {
        let offset = offset.min(input.len());
        let before = &input.as_bytes()[..offset];
        let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
        let line_start = before.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
        Self {
            line,
            column: offset - line_start,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The category of a compilation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Syntax,
    ScopeViolation,
    ImportResolution,
    UnsupportedConstruct,
}

/// Errors that can occur while compiling a cell.
///
/// Every error is fatal to the cell being compiled and to nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed source in any parse stage.
    #[error("{message} ({position})")]
    Syntax {
        message: String,
        span: Span,
        position: Position,
    },

    /// Assignment to a free variable or reserved global, or redeclaration
    /// of a reserved global at top level.
    #[error("{message} ({position})")]
    ScopeViolation {
        message: String,
        name: String,
        span: Span,
        position: Position,
    },

    /// An import specifier that cannot be resolved, or a notebook import of
    /// a name the notebook does not export.
    #[error("import resolution failed for '{specifier}': {message}")]
    ImportResolution { specifier: String, message: String },

    /// Syntax that is valid but not allowed in a cell (e.g. exports).
    #[error("{message} ({position})")]
    UnsupportedConstruct {
        message: String,
        span: Span,
        position: Position,
    },
}

impl Error {
    /// Create a syntax error at `span` within `input`.
    pub fn syntax(message: impl Into<String>, span: Span, input: &str) -> Self {
        Self::Syntax {
            message: message.into(),
            span,
            position: Position::locate(input, span.start),
        }
    }

    /// Create a scope violation for the identifier `name` at `span`.
    pub fn scope_violation(
        message: impl Into<String>,
        name: impl Into<String>,
        span: Span,
        input: &str,
    ) -> Self {
        Self::ScopeViolation {
            message: message.into(),
            name: name.into(),
            span,
            position: Position::locate(input, span.start),
        }
    }

    /// Create an import resolution error.
    pub fn import_resolution(specifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ImportResolution {
            specifier: specifier.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported-construct error at `span` within `input`.
    pub fn unsupported(message: impl Into<String>, span: Span, input: &str) -> Self {
        Self::UnsupportedConstruct {
            message: message.into(),
            span,
            position: Position::locate(input, span.start),
        }
    }

    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax { .. } => ErrorKind::Syntax,
            Self::ScopeViolation { .. } => ErrorKind::ScopeViolation,
            Self::ImportResolution { .. } => ErrorKind::ImportResolution,
            Self::UnsupportedConstruct { .. } => ErrorKind::UnsupportedConstruct,
        }
    }

    /// The source span this error points at, if any.
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Syntax { span, .. }
            | Self::ScopeViolation { span, .. }
            | Self::UnsupportedConstruct { span, .. } => Some(*span),
            Self::ImportResolution { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_position() {
        let input = "let a = 1;\nfoo = 2;";
        assert_eq!(Position::locate(input, 0), Position { line: 1, column: 0 });
        assert_eq!(Position::locate(input, 11), Position { line: 2, column: 0 });
        assert_eq!(Position::locate(input, 15), Position { line: 2, column: 4 });
    }

    #[test]
    fn test_error_display() {
        let input = "foo = 1;";
        let error = Error::scope_violation(
            "Assignment to external variable 'foo'",
            "foo",
            Span::new(0, 3),
            input,
        );
        assert_eq!(error.to_string(), "Assignment to external variable 'foo' (1:0)");
        assert_eq!(error.kind(), ErrorKind::ScopeViolation);
        assert_eq!(error.span(), Some(Span::new(0, 3)));
    }
}
