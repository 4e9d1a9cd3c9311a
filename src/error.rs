//! Error types.

use std::fmt;

use thiserror::Error;

use crate::syntax::Position;

/// What kind of failure a [`ParseError`] describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A complete markup element is directly followed by another one, eg. `<A /><B />`.
    AdjacentElements,
    /// The source starts with a construct which is only valid as a statement, eg. `import`.
    StatementOnly,
    /// Any other syntax error.
    UnexpectedToken,
    /// Parsing was abandoned because it took longer than the configured timeout.
    Cancelled,
    /// The grammar could not be loaded into the parser.
    Language,
}

impl ParseErrorKind {
    /// Is this an error in the source text itself (as opposed to the parser giving up)?
    pub fn is_syntax(self) -> bool {
        matches!(
            self,
            ParseErrorKind::AdjacentElements
                | ParseErrorKind::StatementOnly
                | ParseErrorKind::UnexpectedToken
        )
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParseErrorKind::AdjacentElements => "adjacent elements must be wrapped",
            ParseErrorKind::StatementOnly => "statement cannot be used as an expression",
            ParseErrorKind::UnexpectedToken => "syntax error",
            ParseErrorKind::Cancelled => "parse cancelled",
            ParseErrorKind::Language => "grammar error",
        };
        f.write_str(s)
    }
}

/// A source buffer could not be parsed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    /// Classification used by mask building to pick a recovery strategy.
    pub kind: ParseErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Location of the first error, if the parser got far enough to know it.
    pub position: Option<Position>,
}

impl ParseError {
    /// Create an error without location information.
    pub fn new(kind: ParseErrorKind, message: impl Into<String>) -> ParseError {
        ParseError {
            kind,
            message: message.into(),
            position: None,
        }
    }

    /// Create an error pointing at `position`.
    pub fn at(kind: ParseErrorKind, position: Position) -> ParseError {
        ParseError {
            kind,
            message: format!("{} ({})", kind, position),
            position: Some(position),
        }
    }
}

/// The search pattern could not be turned into masks. Fatal for the whole run.
#[derive(Debug, Error)]
pub enum MaskBuildError {
    /// The pattern did not parse under any recovery strategy.
    #[error("cannot parse pattern: {0}")]
    Parse(#[from] ParseError),

    /// The pattern contains no code.
    #[error("pattern is empty")]
    Empty,

    /// A top-level mask came out without a kind that can be searched for.
    #[error("pattern produced a mask without a usable node kind ({kind:?})")]
    MissingKind {
        /// Offending kind tag.
        kind: String,
    },

    /// A `'/.../'` string in the pattern is not a valid regular expression.
    #[error("invalid regular expression in pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// A hand-built mask is malformed. Raised before any traversal starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    /// A node mask has an empty kind tag.
    #[error("mask has no node kind")]
    MissingKind,

    /// A top-level mask is not a node mask, so there is no kind to dispatch on.
    #[error("top-level mask #{index} is not a node mask")]
    NotANodeMask {
        /// Position of the offending mask in the list.
        index: usize,
    },
}
