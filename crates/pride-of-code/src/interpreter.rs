//! Tree-walking interpreter for formation scripts.
//!
//! Scripts see only what the [`Namespace`] binds plus the built-in functions
//! in [`Builtin`]. Nothing here touches the filesystem, the network or the
//! host's stdout: `print` writes into an [`OutputBuffer`].

use crate::band::RosterError;
use crate::config::ExecutorConfig;
use serde::Serialize;
use std::fmt;
use std::ops::Range;
use thiserror::Error;

mod value;
pub use value::{BandMethod, BoundedText, ListMethod, MAX_COMPARED_ITEMS, Method, Value};

mod namespace;
pub use namespace::{ALLOWED_NAMES, Namespace};

mod builtins;
pub use builtins::{Arguments, Builtin};

mod evaluator;
pub use evaluator::Interpreter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    NameError,
    TypeError,
    ValueError,
    IndexError,
    ZeroDivisionError,
    AttributeError,
    OverflowError,
    UnknownSection,
    StepLimitExceeded,
    SyntaxError,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::NameError => "NameError",
            Self::TypeError => "TypeError",
            Self::ValueError => "ValueError",
            Self::IndexError => "IndexError",
            Self::ZeroDivisionError => "ZeroDivisionError",
            Self::AttributeError => "AttributeError",
            Self::OverflowError => "OverflowError",
            Self::UnknownSection => "UnknownSection",
            Self::StepLimitExceeded => "StepLimitExceeded",
            Self::SyntaxError => "SyntaxError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An error raised by a running script.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    /// Byte range of the script construct that raised, when known.
    pub span: Option<Range<usize>>,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValueError, message)
    }

    pub fn index_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IndexError, message)
    }

    pub fn overflow() -> Self {
        Self::new(ErrorKind::OverflowError, "integer overflow")
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::ZeroDivisionError, "division by zero")
    }

    /// Attaches `span` unless a more precise one is already set.
    pub fn at(mut self, span: Range<usize>) -> Self {
        self.span.get_or_insert(span);
        self
    }
}

impl From<RosterError> for RuntimeError {
    fn from(error: RosterError) -> Self {
        let kind = match error {
            RosterError::InvalidConfiguration { .. } => ErrorKind::ValueError,
            RosterError::UnknownSection(_) => ErrorKind::UnknownSection,
        };
        Self::new(kind, error.to_string())
    }
}

/// Budgets a single run may not exceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_steps: u64,
    pub max_collection_len: usize,
    pub max_output_bytes: usize,
}

impl From<&ExecutorConfig> for Limits {
    fn from(config: &ExecutorConfig) -> Self {
        Self {
            max_steps: config.max_steps,
            max_collection_len: config.max_collection_len,
            max_output_bytes: config.max_output_bytes,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::from(&ExecutorConfig::default())
    }
}

pub const OUTPUT_TRUNCATED_MARKER: &str = "[output truncated]";

/// Captured script output, capped at a byte limit.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    text: String,
    limit: usize,
    truncated: bool,
}

impl OutputBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            text: String::new(),
            limit,
            truncated: false,
        }
    }

    /// Appends `text`. Past the limit the rest is dropped and the marker is
    /// written once.
    pub fn write(&mut self, text: &str) {
        if self.truncated {
            return;
        }
        let room = self.limit.saturating_sub(self.text.len());
        if text.len() <= room {
            self.text.push_str(text);
            return;
        }
        let mut cut = room;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        self.text.push_str(&text[..cut]);
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
        self.text.push_str(OUTPUT_TRUNCATED_MARKER);
        self.text.push('\n');
        self.truncated = true;
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Bytes that can still be written before the output is cut off.
    pub fn remaining(&self) -> usize {
        if self.truncated {
            0
        } else {
            self.limit.saturating_sub(self.text.len())
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.truncated = false;
    }

    pub fn into_string(self) -> String {
        self.text
    }
}
