//! Console output for multi-file runs.

use itertools::Itertools;
use log::warn;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use termcolor::{Buffer, BufferWriter, Color, ColorSpec, WriteColor};

use crate::error::ParseError;
use crate::options::Options;
use crate::run::{Match, Outcome, Report, Summary, STDIN};

/// Prints matches to stdout and everything else to stderr.
///
/// Output for a file is buffered and printed in one go, so lines of files
/// handled by different threads never interleave.
pub struct Console {
    stdout: BufferWriter,
    stderr: BufferWriter,
    cwd: PathBuf,
    verbose: bool,
    max_size: u64,
}

fn colored(buffer: &mut Buffer, color: Color, text: &str) -> io::Result<()> {
    buffer.set_color(ColorSpec::new().set_fg(Some(color)))?;
    write!(buffer, "{}", text)?;
    buffer.reset()
}

impl Console {
    /// Create a console reporter for `options`.
    pub fn new(options: &Options) -> Console {
        Console {
            stdout: BufferWriter::stdout(options.color),
            stderr: BufferWriter::stderr(options.color),
            cwd: options.cwd.clone(),
            verbose: options.verbose,
            max_size: options.max_size,
        }
    }

    /// Path as shown to the user, relative to the working directory when possible.
    pub fn display_path(&self, path: &Path) -> String {
        if path == Path::new(STDIN) {
            return STDIN.to_string();
        }
        match path.strip_prefix(&self.cwd) {
            Ok(relative) => format!("./{}", relative.display()),
            Err(_) => path.display().to_string(),
        }
    }

    fn write_matches(&self, path: &Path, matches: &[Match]) -> io::Result<()> {
        if matches.is_empty() {
            return Ok(());
        }
        let name = self.display_path(path);
        let mut buffer = self.stdout.buffer();
        for m in matches {
            write!(buffer, "{}: ", name)?;
            colored(&mut buffer, Color::Blue, &m.text)?;
            writeln!(buffer)?;
        }
        self.stdout.print(&buffer)
    }

    fn write_error(&self, path: &Path, err: &ParseError) -> io::Result<()> {
        let mut buffer = self.stderr.buffer();
        colored(&mut buffer, Color::Red, "Failed to parse ")?;
        writeln!(buffer, "{}: {}", self.display_path(path), err)?;
        self.stderr.print(&buffer)
    }

    fn write_summary(&self, summary: &Summary) -> io::Result<()> {
        let mut buffer = self.stderr.buffer();
        writeln!(
            buffer,
            "\nScanned {} files in {:.3}s.",
            summary.scanned,
            summary.elapsed.as_secs_f64()
        )?;

        if !summary.failed.is_empty() && !self.verbose {
            writeln!(buffer)?;
            colored(
                &mut buffer,
                Color::Red,
                "Failed to parse following files. Pass --verbose argument to see the errors:",
            )?;
            writeln!(buffer)?;
            writeln!(
                buffer,
                "{}",
                summary
                    .failed
                    .iter()
                    .map(|(path, _)| format!("  {}", self.display_path(path)))
                    .join("\n")
            )?;
        }

        if !summary.skipped.is_empty() {
            writeln!(buffer)?;
            if self.verbose {
                colored(
                    &mut buffer,
                    Color::Yellow,
                    "Following files were skipped because they were too large:",
                )?;
                writeln!(buffer)?;
                writeln!(
                    buffer,
                    "{}",
                    summary
                        .skipped
                        .iter()
                        .map(|path| format!("  {}", self.display_path(path)))
                        .sorted()
                        .join("\n")
                )?;
            } else {
                colored(
                    &mut buffer,
                    Color::Yellow,
                    &format!(
                        "Skipped {} files because they were larger than {} KB. \
                         Pass --verbose argument to see the list.",
                        summary.skipped.len(),
                        self.max_size / 1000
                    ),
                )?;
                writeln!(buffer)?;
            }
        }
        self.stderr.print(&buffer)
    }
}

impl Report for Console {
    fn file(&self, path: &Path, outcome: &Outcome) {
        let result = match outcome {
            Outcome::Matched(matches) => self.write_matches(path, matches),
            Outcome::Failed(err) if self.verbose => self.write_error(path, err),
            Outcome::Failed(_) | Outcome::Skipped { .. } => Ok(()),
        };
        if let Err(err) = result {
            warn!("Cannot write output: {}", err);
        }
    }

    fn summary(&self, summary: &Summary) {
        if let Err(err) = self.write_summary(summary) {
            warn!("Cannot write summary: {}", err);
        }
    }
}
