//! Wrapper types adding comparison and serialization to foreign types.

use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A regex which compares and hashes by its pattern, so masks holding one can be compared.
#[derive(Clone, Debug)]
pub struct RegexEq(pub Regex);

impl RegexEq {
    /// Compile `pattern`.
    pub fn new(pattern: &str) -> Result<RegexEq, regex::Error> {
        Regex::new(pattern).map(RegexEq)
    }
}

impl Hash for RegexEq {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_str().hash(state);
    }
}

impl PartialEq for RegexEq {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str().eq(other.0.as_str())
    }
}
impl Eq for RegexEq {}

impl std::ops::Deref for RegexEq {
    type Target = Regex;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for RegexEq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.0.as_str())
    }
}

impl Serialize for RegexEq {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
