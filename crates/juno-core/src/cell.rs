//! Cell data model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a cell within a notebook.
///
/// Assigned by the caller; synthetic cells may use negative ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(pub(crate) i64);

impl CellId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CellId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A short name did not match any known mode or format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCellError {
    #[error("invalid cell mode '{0}'")]
    Mode(String),
    #[error("invalid interpreter format '{0}'")]
    Format(String),
}

/// The language a cell is written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Mode {
    /// JavaScript.
    Js,
    /// TypeScript, compiled by stripping types.
    Ts,
    /// Observable JavaScript.
    Ojs,
    /// Markdown template.
    Md,
    /// HTML template.
    Html,
    /// TeX template.
    Tex,
    /// Graphviz dot template.
    Dot,
    /// SQL query against the cell's database.
    Sql,
    /// Source run by an external interpreter, such as `node` or `python`.
    Interpreter(String),
}

impl Mode {
    /// The short name of this mode, as stored in notebooks.
    pub fn name(&self) -> &str {
        match self {
            Mode::Js => "js",
            Mode::Ts => "ts",
            Mode::Ojs => "ojs",
            Mode::Md => "md",
            Mode::Html => "html",
            Mode::Tex => "tex",
            Mode::Dot => "dot",
            Mode::Sql => "sql",
            Mode::Interpreter(name) => name,
        }
    }

    /// Whether cells in this mode are compiled as script.
    pub fn is_script(&self) -> bool {
        matches!(self, Mode::Js | Mode::Ts | Mode::Ojs)
    }

    pub fn is_interpreter(&self) -> bool {
        matches!(self, Mode::Interpreter(_))
    }

    /// Whether new cells in this mode default to showing their source.
    fn pinned_by_default(&self) -> bool {
        matches!(self, Mode::Js | Mode::Ts | Mode::Ojs | Mode::Sql | Mode::Interpreter(_))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = ParseCellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "js" => Mode::Js,
            "ts" => Mode::Ts,
            "ojs" => Mode::Ojs,
            "md" => Mode::Md,
            "html" => Mode::Html,
            "tex" => Mode::Tex,
            "dot" => Mode::Dot,
            "sql" => Mode::Sql,
            name if is_interpreter_name(name) => Mode::Interpreter(name.to_string()),
            other => return Err(ParseCellError::Mode(other.to_string())),
        })
    }
}

fn is_interpreter_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

impl TryFrom<String> for Mode {
    type Error = ParseCellError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.to_string()
    }
}

/// How an interpreter cell's output file is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Text,
    Blob,
    Buffer,
    Json,
    Csv,
    Tsv,
    Jpeg,
    Gif,
    Webp,
    Png,
    Arrow,
    Parquet,
    Html,
    Svg,
    Xml,
}

impl Format {
    pub const ALL: [Format; 15] = [
        Format::Text,
        Format::Blob,
        Format::Buffer,
        Format::Json,
        Format::Csv,
        Format::Tsv,
        Format::Jpeg,
        Format::Gif,
        Format::Webp,
        Format::Png,
        Format::Arrow,
        Format::Parquet,
        Format::Html,
        Format::Svg,
        Format::Xml,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Format::Text => "text",
            Format::Blob => "blob",
            Format::Buffer => "buffer",
            Format::Json => "json",
            Format::Csv => "csv",
            Format::Tsv => "tsv",
            Format::Jpeg => "jpeg",
            Format::Gif => "gif",
            Format::Webp => "webp",
            Format::Png => "png",
            Format::Arrow => "arrow",
            Format::Parquet => "parquet",
            Format::Html => "html",
            Format::Svg => "svg",
            Format::Xml => "xml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = ParseCellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .into_iter()
            .find(|format| format.name() == s)
            .ok_or_else(|| ParseCellError::Format(s.to_string()))
    }
}

/// Database used by SQL cells that do not name one.
pub const DEFAULT_DATABASE: &str = "var:db";

/// One unit of notebook source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    pub value: String,
    pub mode: Mode,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub hidden: bool,
    /// Name the cell's value is bound to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Database queried by SQL cells.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Output format of interpreter cells.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
    /// Freshness bound passed to query and interpreter clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
}

impl Cell {
    /// Create a cell with the defaults of its mode.
    ///
    /// JavaScript-like, SQL and interpreter cells are pinned, SQL cells query
    /// [`DEFAULT_DATABASE`] and interpreter cells produce [`Format::Buffer`].
    pub fn new(id: i64, value: impl Into<String>, mode: Mode) -> Self {
        Self {
            id: CellId(id),
            value: value.into(),
            pinned: mode.pinned_by_default(),
            hidden: false,
            output: None,
            database: (mode == Mode::Sql).then(|| DEFAULT_DATABASE.to_string()),
            format: mode.is_interpreter().then_some(Format::Buffer),
            since: None,
            mode,
        }
    }

    /// A JavaScript cell.
    pub fn js(id: i64, value: impl Into<String>) -> Self {
        Self::new(id, value, Mode::Js)
    }

    pub fn with_pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Set the database; ignored unless this is a SQL cell.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        if self.mode == Mode::Sql {
            self.database = Some(database.into());
        }
        self
    }

    /// Set the output format; ignored unless this is an interpreter cell.
    pub fn with_format(mut self, format: Format) -> Self {
        if self.mode.is_interpreter() {
            self.format = Some(format);
        }
        self
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// `since` as the ISO 8601 string a JavaScript `Date` serializes to.
    pub fn since_iso(&self) -> Option<String> {
        self.since
            .map(|since| since.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}
