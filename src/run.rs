//! Searching buffers and file trees.

use ignore::overrides::{Override, OverrideBuilder};
use ignore::{WalkBuilder, WalkState};
use log::{debug, info, warn};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::error::ParseError;
use crate::language::Language;
use crate::options::Options;
use crate::parser::Parser;
use crate::query::Query;
use crate::syntax::{Position, Span, SyntaxTree};
use crate::traverse::NodePath;

/// A located node which satisfied one of the query's masks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    /// Kind of the matched node.
    pub kind: &'static str,
    /// Location of the node in the source.
    pub span: Span,
    /// Start of the node.
    pub start: Position,
    /// End of the node.
    pub end: Position,
    /// Source text of the node.
    pub text: String,
    /// Kinds and spans of the ancestors, root first.
    pub ancestors: Vec<(&'static str, Span)>,
}

impl Match {
    fn new(tree: &SyntaxTree, path: &NodePath<'_>) -> Match {
        Match {
            kind: path.node.kind,
            span: path.node.span,
            start: path.node.start,
            end: path.node.end,
            text: tree.text(path.node.span).to_string(),
            ancestors: path.ancestors.iter().map(|n| (n.kind, n.span)).collect(),
        }
    }
}

/// Engine settings.
#[derive(Clone, Debug, Default)]
pub struct SearchConfig {
    /// Give up parsing a single source after this long.
    pub timeout: Option<Duration>,
}

/// Sink for streamed search results.
pub trait Reporter {
    /// Called for every match, mask by mask, in traversal order.
    fn on_match(&mut self, m: Match);
    /// Called instead of `on_match` when the source does not parse.
    fn on_error(&mut self, err: &ParseError);
}

/// Keeps everything it is given.
#[derive(Debug, Default)]
pub struct Collector {
    /// Matches, in the order they were found.
    pub matches: Vec<Match>,
    /// Parse errors, one per source which did not parse.
    pub errors: Vec<ParseError>,
}

impl Reporter for Collector {
    fn on_match(&mut self, m: Match) {
        self.matches.push(m);
    }

    fn on_error(&mut self, err: &ParseError) {
        self.errors.push(err.clone());
    }
}

/// Get all matches of `query` in an already parsed tree.
pub fn search_tree(tree: &SyntaxTree, query: &Query) -> Vec<Match> {
    query
        .matches(tree.root())
        .map(|path| Match::new(tree, &path))
        .collect()
}

/// Searches one buffer at a time, reusing its parser.
pub struct Searcher {
    parser: Parser,
}

impl Searcher {
    /// Create a searcher.
    pub fn new(config: &SearchConfig) -> Searcher {
        Searcher {
            parser: Parser::with_timeout(config.timeout),
        }
    }

    /// Parse `source` and get all matches of `query` in it.
    pub fn search(
        &mut self,
        source: &str,
        language: Language,
        query: &Query,
    ) -> Result<Vec<Match>, ParseError> {
        let tree = self.parser.parse(source, language)?;
        Ok(search_tree(&tree, query))
    }

    /// Like [`Searcher::search`], but stream the results to `reporter`.
    pub fn search_with(
        &mut self,
        source: &str,
        language: Language,
        query: &Query,
        reporter: &mut dyn Reporter,
    ) {
        match self.parser.parse(source, language) {
            Ok(tree) => {
                for path in query.matches(tree.root()) {
                    reporter.on_match(Match::new(&tree, &path));
                }
            }
            Err(err) => reporter.on_error(&err),
        }
    }
}

/// Parse `source` and get all matches of `query` in it.
///
/// ```
/// use codegrep::language::Language;
/// use codegrep::query::Query;
/// use codegrep::run::search;
/// let query = Query::new("foo(___)", Language::JavaScript).unwrap();
/// let matches = search("foo(a); bar(b);", Language::JavaScript, &query).unwrap();
/// assert_eq!(matches.len(), 2);
/// assert_eq!(matches[1].text, "foo(a)");
/// ```
pub fn search(source: &str, language: Language, query: &Query) -> Result<Vec<Match>, ParseError> {
    Searcher::new(&SearchConfig::default()).search(source, language, query)
}

/// What happened to a single file.
#[derive(Debug)]
pub enum Outcome {
    /// The file parsed; these are its matches (maybe none).
    Matched(Vec<Match>),
    /// The file did not parse.
    Failed(ParseError),
    /// The file was larger than the size ceiling and was not read.
    Skipped {
        /// Size of the file in bytes.
        size: u64,
    },
}

/// Sink for multi-file results. Called from several threads at once.
pub trait Report: Sync {
    /// Called once per file, in no particular order.
    fn file(&self, path: &Path, outcome: &Outcome);
    /// Called once after every file has been handled.
    fn summary(&self, summary: &Summary);
}

/// Totals of a multi-file run.
#[derive(Debug, Default)]
pub struct Summary {
    /// Files which were parsed, successfully or not.
    pub scanned: usize,
    /// Total number of matches.
    pub matches: usize,
    /// Files which did not parse, sorted by path.
    pub failed: Vec<(PathBuf, ParseError)>,
    /// Files over the size ceiling, sorted by path.
    pub skipped: Vec<PathBuf>,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
}

#[derive(Default)]
struct Tally {
    scanned: AtomicUsize,
    matches: AtomicUsize,
    failed: Mutex<Vec<(PathBuf, ParseError)>>,
    skipped: Mutex<Vec<PathBuf>>,
}

impl Tally {
    fn record(&self, path: &Path, outcome: &Outcome) {
        match outcome {
            Outcome::Matched(matches) => {
                self.scanned.fetch_add(1, Ordering::Relaxed);
                self.matches.fetch_add(matches.len(), Ordering::Relaxed);
            }
            Outcome::Failed(err) => {
                self.scanned.fetch_add(1, Ordering::Relaxed);
                self.failed
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((path.to_path_buf(), err.clone()));
            }
            Outcome::Skipped { .. } => {
                self.skipped
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(path.to_path_buf());
            }
        }
    }

    fn into_summary(self, elapsed: Duration) -> Summary {
        let mut failed = self.failed.into_inner().unwrap_or_else(PoisonError::into_inner);
        let mut skipped = self.skipped.into_inner().unwrap_or_else(PoisonError::into_inner);
        failed.sort_by(|a, b| a.0.cmp(&b.0));
        skipped.sort();
        Summary {
            scanned: self.scanned.into_inner(),
            matches: self.matches.into_inner(),
            failed,
            skipped,
            elapsed,
        }
    }
}

/// Path shown for standard input.
pub const STDIN: &str = "<stdin>";

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn search_source(
    searcher: &mut Searcher,
    source: &str,
    language: Language,
    query: &Query,
) -> Outcome {
    match searcher.search(source, language, query) {
        Ok(matches) => Outcome::Matched(matches),
        Err(err) => Outcome::Failed(err),
    }
}

fn search_file(
    searcher: &mut Searcher,
    path: &Path,
    options: &Options,
    query: &Query,
) -> io::Result<Outcome> {
    let size = fs::metadata(path)?.len();
    if size > options.max_size {
        debug!("Skipping {}: {} bytes", path.display(), size);
        return Ok(Outcome::Skipped { size });
    }
    let bytes = fs::read(path)?;
    let source = String::from_utf8_lossy(&bytes);
    let language = options
        .language
        .or_else(|| Language::for_path(path))
        .unwrap_or_default();
    debug!("Searching {} as {:?}", path.display(), language);
    Ok(search_source(searcher, &source, language, query))
}

fn search_stdin(searcher: &mut Searcher, options: &Options, query: &Query) -> io::Result<Outcome> {
    let mut source = String::new();
    io::stdin().read_to_string(&mut source)?;
    let language = options.language.unwrap_or_default();
    Ok(search_source(searcher, &source, language, query))
}

fn build_overrides(options: &Options) -> Result<Override, ignore::Error> {
    let mut builder = OverrideBuilder::new(&options.cwd);
    builder.add(&options.glob)?;
    for glob in &options.ignore {
        builder.add(&format!("!{}", glob))?;
    }
    builder.build()
}

/// Search every file under the paths in `options` and report the outcomes.
///
/// Files are handled in parallel, each with its own parser. A file which fails
/// to parse is reported and the run continues.
pub fn run(options: &Options, query: &Query, report: &dyn Report) -> Result<Summary, ignore::Error> {
    let started = Instant::now();
    let tally = Tally::default();
    let config = options.search_config();

    let (stdin, paths): (Vec<&PathBuf>, Vec<&PathBuf>) =
        options.paths.iter().partition(|p| is_stdin(p));
    if !stdin.is_empty() {
        let mut searcher = Searcher::new(&config);
        match search_stdin(&mut searcher, options, query) {
            Ok(outcome) => {
                let path = Path::new(STDIN);
                tally.record(path, &outcome);
                report.file(path, &outcome);
            }
            Err(err) => warn!("Cannot read standard input: {}", err),
        }
    }

    let roots = if paths.is_empty() && stdin.is_empty() {
        vec![options.cwd.clone()]
    } else {
        paths.iter().map(|p| options.cwd.join(p)).collect()
    };

    if let Some((first, rest)) = roots.split_first() {
        let mut walker = WalkBuilder::new(first);
        for root in rest {
            walker.add(root);
        }
        walker
            .overrides(build_overrides(options)?)
            .hidden(false)
            .threads(options.threads);
        info!("Walking {} roots", roots.len());

        walker.build_parallel().run(|| {
            let mut searcher = Searcher::new(&config);
            let tally = &tally;
            Box::new(move |entry: Result<ignore::DirEntry, ignore::Error>| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!("{}", err);
                        return WalkState::Continue;
                    }
                };
                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    return WalkState::Continue;
                }
                let path = entry.path();
                match search_file(&mut searcher, path, options, query) {
                    Ok(outcome) => {
                        tally.record(path, &outcome);
                        report.file(path, &outcome);
                    }
                    Err(err) => warn!("Cannot read {}: {}", path.display(), err),
                }
                WalkState::Continue
            })
        });
    }

    let summary = tally.into_summary(started.elapsed());
    report.summary(&summary);
    Ok(summary)
}
