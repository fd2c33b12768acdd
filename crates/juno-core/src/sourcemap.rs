//! Edit-log overlay on cell source.
//!
//! A [`Sourcemap`] never mutates its input. Edits are appended to a log keyed
//! by original byte offset and applied in a single pass when the map is
//! rendered, so every edit can be expressed in terms of positions reported by
//! the parser without tracking how earlier edits shifted the text.

use std::cmp::Ordering;
use std::fmt;

/// Which side of existing edits at the same offset a new edit lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bias {
    Left,
    Right,
}

#[derive(Debug, Clone)]
struct Edit {
    start: usize,
    end: usize,
    value: String,
    bias: Bias,
    seq: usize,
}

/// An append-only log of text edits over an immutable input.
#[derive(Debug, Clone)]
pub struct Sourcemap {
    input: String,
    edits: Vec<Edit>,
}

impl Sourcemap {
    /// Create a sourcemap over `input` with no edits.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            edits: Vec::new(),
        }
    }

    /// The original, unedited text.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Insert `value` at `index`, before any edit already recorded there.
    pub fn insert_left(&mut self, index: usize, value: impl Into<String>) -> &mut Self {
        self.replace_left(index, index, value)
    }

    /// Insert `value` at `index`, after any edit already recorded there.
    pub fn insert_right(&mut self, index: usize, value: impl Into<String>) -> &mut Self {
        self.replace_right(index, index, value)
    }

    /// Delete the original text in `start..end`.
    pub fn delete(&mut self, start: usize, end: usize) -> &mut Self {
        self.replace_right(start, end, "")
    }

    /// Replace `start..end` with `value`, ordered before other edits at `start`.
    pub fn replace_left(&mut self, start: usize, end: usize, value: impl Into<String>) -> &mut Self {
        self.push(start, end, value.into(), Bias::Left)
    }

    /// Replace `start..end` with `value`, ordered after other edits at `start`.
    pub fn replace_right(&mut self, start: usize, end: usize, value: impl Into<String>) -> &mut Self {
        self.push(start, end, value.into(), Bias::Right)
    }

    /// Delete leading and trailing whitespace of the input.
    pub fn trim(&mut self) -> &mut Self {
        let len = self.input.len();
        let leading = len - self.input.trim_start().len();
        let trailing = len - self.input.trim_end().len();
        if leading == len {
            if len > 0 {
                self.delete(0, len);
            }
            return self;
        }
        if leading > 0 {
            self.delete(0, leading);
        }
        if trailing > 0 {
            self.delete(len - trailing, len);
        }
        self
    }

    /// Number of recorded edits.
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Whether no edits have been recorded.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    fn push(&mut self, start: usize, end: usize, value: String, bias: Bias) -> &mut Self {
        assert!(
            start <= end && end <= self.input.len(),
            "sourcemap edit {start}..{end} out of bounds for input of length {}",
            self.input.len()
        );
        let seq = self.edits.len();
        self.edits.push(Edit {
            start,
            end,
            value,
            bias,
            seq,
        });
        self
    }

    /// Edits in application order.
    fn ordered(&self) -> Vec<&Edit> {
        let mut edits: Vec<&Edit> = self.edits.iter().collect();
        edits.sort_by(|a, b| {
            a.start.cmp(&b.start).then_with(|| match (a.bias, b.bias) {
                (Bias::Left, Bias::Right) => Ordering::Less,
                (Bias::Right, Bias::Left) => Ordering::Greater,
                // Later left edits wrap earlier ones.
                (Bias::Left, Bias::Left) => b.seq.cmp(&a.seq),
                (Bias::Right, Bias::Right) => a.seq.cmp(&b.seq),
            })
        });
        edits
    }
}

impl fmt::Display for Sourcemap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut index = 0;
        for edit in self.ordered() {
            if edit.start > index {
                f.write_str(&self.input[index..edit.start])?;
            }
            f.write_str(&edit.value)?;
            index = index.max(edit.end);
        }
        f.write_str(&self.input[index..])
    }
}
