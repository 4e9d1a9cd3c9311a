//! Command-line tokenizer.

use std::ffi::{OsStr, OsString};

#[derive(Debug, Clone, PartialEq)]
enum Kind {
    Short(char),
    Long(String),
    Positional,
}

/// What an [`Arg`] is, borrowed for matching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flag<'a> {
    /// `-x`, one per character of a short flag group.
    Short(char),
    /// `--name`, without the dashes.
    Long(&'a str),
    /// Anything else, including flag values.
    Positional,
}

/// A single token of the command line.
///
/// Tokens split from the same argument (`-vj4`, `--cwd=dir`) share its index,
/// which lets a flag take the rest of its own argument as a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    kind: Kind,
    raw: OsString,
    index: usize,
}

impl Arg {
    fn short(c: char, raw: impl Into<OsString>, index: usize) -> Arg {
        Arg {
            kind: Kind::Short(c),
            raw: raw.into(),
            index,
        }
    }

    fn long(name: &str, index: usize) -> Arg {
        Arg {
            kind: Kind::Long(name.to_string()),
            raw: name.into(),
            index,
        }
    }

    fn positional(raw: impl Into<OsString>, index: usize) -> Arg {
        Arg {
            kind: Kind::Positional,
            raw: raw.into(),
            index,
        }
    }

    /// Borrow the flag for matching.
    pub fn flag(&self) -> Flag<'_> {
        match &self.kind {
            Kind::Short(c) => Flag::Short(*c),
            Kind::Long(name) => Flag::Long(name),
            Kind::Positional => Flag::Positional,
        }
    }

    /// The text this token was read from. For a short flag, this is the
    /// flag and everything after it in the same argument.
    pub fn into_raw(self) -> OsString {
        self.raw
    }

    /// 1-based position of the argument this token came from.
    pub fn index(&self) -> usize {
        self.index
    }
}

fn split_shorts(arg: &str, index: usize, out: &mut Vec<Arg>) {
    let flags = &arg[1..];
    for (offset, c) in flags.char_indices() {
        if offset == 0 {
            out.push(Arg::short(c, arg, index));
        } else {
            out.push(Arg::short(c, &flags[offset..], index));
        }
    }
}

/// Split `args` (without the program name) into tokens.
///
/// `--name=value` becomes a long flag followed by a positional with the same
/// index, so it reads the same as `--name value`. Everything after `--` is
/// positional.
pub fn parse_args<S: AsRef<OsStr>>(args: &[S]) -> Vec<Arg> {
    let mut result = Vec::new();
    let mut rest = args.iter().enumerate().map(|(i, s)| (i + 1, s.as_ref()));

    for (index, arg) in rest.by_ref() {
        let lossy = arg.to_string_lossy();
        match &*lossy {
            "--" => break,
            // stdin
            "-" => result.push(Arg::positional(arg, index)),
            s if s.starts_with("--") => match s[2..].split_once('=') {
                Some((name, value)) => {
                    result.push(Arg::long(name, index));
                    result.push(Arg::positional(value, index));
                }
                None => result.push(Arg::long(&s[2..], index)),
            },
            s if s.starts_with('-') => split_shorts(s, index, &mut result),
            _ => result.push(Arg::positional(arg, index)),
        }
    }
    result.extend(rest.map(|(index, arg)| Arg::positional(arg, index)));

    result
}
