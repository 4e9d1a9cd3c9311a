#![warn(missing_docs)]
//! codegrep -- Search JavaScript and TypeScript sources for code shaped like a snippet.
//!
//! A pattern such as `import ___ from 'react'` is parsed into one or more
//! [`mask::NodeMask`]s, and every node of a parsed source satisfying one of
//! them is reported as a [`run::Match`].

mod argparse;
pub mod compiler;
pub mod error;
pub mod language;
pub mod mask;
pub mod options;
pub mod parser;
pub mod query;
pub mod render;
pub mod run;
pub mod syntax;
pub mod traverse;
pub mod wrappers;

pub use error::{MaskBuildError, ParseError, UsageError};
pub use query::Query;
pub use run::{search, Collector, Match, Searcher};
