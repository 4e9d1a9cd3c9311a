//! Options parsing and handling.

use crate::argparse::{parse_args, Arg, Flag};
use crate::language::{default_glob, languages, Language};
use crate::run::SearchConfig;
use std::ffi::{OsStr, OsString};
use std::iter::Peekable;
use std::path::PathBuf;
use std::time::Duration;
use termcolor::ColorChoice;

/// Files larger than this many bytes are skipped by default.
pub const DEFAULT_MAX_SIZE: u64 = 1_000_000;

/// Ignore globs used unless `--ignore` is given.
pub const DEFAULT_IGNORE: &[&str] = &["**/node_modules/**"];

/// Parsed options.
#[derive(Clone, Debug)]
pub struct Options {
    /// Code snippet to search for.
    pub pattern: String,
    /// File search paths, relative to `cwd`. `-` is standard input.
    pub paths: Vec<PathBuf>,
    /// Directory paths are resolved against and printed relative to.
    pub cwd: PathBuf,
    /// Only files matching this glob are searched.
    pub glob: String,
    /// Files matching any of these globs are not searched.
    pub ignore: Vec<String>,
    /// Grammar for the pattern and every file, instead of picking by extension.
    pub language: Option<Language>,
    /// Files larger than this many bytes are skipped.
    pub max_size: u64,
    /// Per-file parse timeout.
    pub timeout: Option<Duration>,
    /// Number of walker threads, 0 for automatic.
    pub threads: usize,
    /// Print parse errors as they happen and list every skipped file.
    pub verbose: bool,
    /// Enable debug logging.
    pub debug: bool,
    /// Whether to colour the output.
    pub color: ColorChoice,
    /// Print the compiled masks and quit.
    pub print_masks: bool,
}

#[derive(Clone, Debug)]
enum OptionCommand {
    Glob(String),
    Cwd(OsString),
    Ignore(String),
    Language(Language),
    MaxSize(u64),
    Timeout(Duration),
    Threads(usize),
    Color(ColorChoice),
    Verbose,
    Debug,
    PrintMasks,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            pattern: "".to_string(),
            paths: Vec::new(),
            cwd: ".".into(),
            glob: default_glob(),
            ignore: DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
            language: None,
            max_size: DEFAULT_MAX_SIZE,
            timeout: None,
            threads: 0,
            verbose: false,
            debug: false,
            color: ColorChoice::Auto,
            print_masks: false,
        }
    }
}

fn print_help(long: bool, status: i32) -> ! {
    let filename = std::env::args()
        .next()
        .unwrap_or_else(|| "codegrep".to_string());
    if !long {
        println!(
            "Usage: {} [OPTION]... PATTERN [PATH]...
Pass --help for more information.",
            filename
        );
    } else {
        println!(
            r#"Usage: {} [OPTION]... PATTERN [PATH]...
Search for code shaped like PATTERN in PATHs (default: the working directory).
PATTERN is a JavaScript or TypeScript snippet. ___ matches anything, and a
string written as '/REGEX/' matches strings by regex.

Options:
  -h, --help                 Display this message
  -g, --glob GLOB            Search files matching GLOB
                             (default: {})
  -C, --cwd DIR              Resolve and print paths relative to DIR
  -i, --ignore GLOB          Skip files matching GLOB. Can be repeated; replaces
                             the default ({})
  --lang LANGUAGE            Parse the pattern and every file as LANGUAGE. Call
                             'codegrep --lang' to display available languages.
  --max-size BYTES           Skip files larger than BYTES (default: {})
  --timeout MS               Give up parsing a file after MS milliseconds
  -j, --threads N            Use N threads (default: 0, automatic)
  --color, --no-color        Force coloured output on or off
  -v, --verbose              Print parse errors and every skipped file
  --debug                    Print debug logs
  --masks                    Print the masks compiled from PATTERN as JSON
"#,
            filename,
            default_glob(),
            DEFAULT_IGNORE.join(", "),
            DEFAULT_MAX_SIZE
        );
    }
    std::process::exit(status)
}

fn print_langs() -> ! {
    println!("Available languages:");
    for (lang, extensions) in languages() {
        println!("- {} [{}]", lang, extensions.join(", "));
    }
    std::process::exit(0)
}

fn usage_error(message: &str) -> ! {
    println!("{}\n", message);
    print_help(false, 2)
}

fn get_whole_arg<I: Iterator<Item = Arg>>(iter: &mut Peekable<I>) -> Option<OsString> {
    let arg = iter.next()?;
    let index = arg.index();
    while iter.peek().map(|a| a.index()) == Some(index) {
        iter.next();
    }
    Some(arg.into_raw())
}

fn required_arg<I: Iterator<Item = Arg>>(iter: &mut Peekable<I>, flag: &str) -> String {
    match get_whole_arg(iter) {
        Some(arg) => arg.to_string_lossy().to_string(),
        None => usage_error(&format!("Missing argument for {}", flag)),
    }
}

fn number_arg<I: Iterator<Item = Arg>, T: std::str::FromStr>(
    iter: &mut Peekable<I>,
    flag: &str,
) -> T {
    let arg = required_arg(iter, flag);
    match arg.parse() {
        Ok(value) => value,
        Err(_) => usage_error(&format!("Invalid number for {}: {}", flag, arg)),
    }
}

fn parse_options<S: AsRef<OsStr>>(args: &[S]) -> (Vec<OptionCommand>, Vec<OsString>) {
    let mut opts = Vec::new();
    let mut positionals = Vec::new();
    let parsed = parse_args(args.get(1..).unwrap_or_default());
    let mut arg_iter = parsed.into_iter().peekable();

    while let Some(arg) = arg_iter.next() {
        let cmd = match arg.flag() {
            Flag::Short('h') => print_help(false, 0),
            Flag::Long("help") => print_help(true, 0),
            Flag::Long("lang") => {
                if let Some(arg) = get_whole_arg(&mut arg_iter) {
                    let name = arg.to_string_lossy();
                    match Language::by_name(&name) {
                        Some(lang) => OptionCommand::Language(lang),
                        None => usage_error(&format!("Unknown language: {}", name)),
                    }
                } else {
                    print_langs()
                }
            }

            Flag::Short('g') | Flag::Long("glob") => {
                OptionCommand::Glob(required_arg(&mut arg_iter, "--glob"))
            }
            Flag::Short('C') | Flag::Long("cwd") => match get_whole_arg(&mut arg_iter) {
                Some(dir) => OptionCommand::Cwd(dir),
                None => usage_error("Missing argument for --cwd"),
            },
            Flag::Short('i') | Flag::Long("ignore") => {
                OptionCommand::Ignore(required_arg(&mut arg_iter, "--ignore"))
            }
            Flag::Long("max-size") => {
                OptionCommand::MaxSize(number_arg(&mut arg_iter, "--max-size"))
            }
            Flag::Long("timeout") => OptionCommand::Timeout(Duration::from_millis(
                number_arg(&mut arg_iter, "--timeout"),
            )),
            Flag::Short('j') | Flag::Long("threads") => {
                OptionCommand::Threads(number_arg(&mut arg_iter, "--threads"))
            }

            Flag::Long("color") => OptionCommand::Color(ColorChoice::Always),
            Flag::Long("no-color") => OptionCommand::Color(ColorChoice::Never),
            Flag::Short('v') | Flag::Long("verbose") => OptionCommand::Verbose,
            Flag::Long("debug") => OptionCommand::Debug,
            Flag::Long("masks") => OptionCommand::PrintMasks,

            Flag::Positional => {
                positionals.push(arg.into_raw());
                continue;
            }

            Flag::Short(s) => usage_error(&format!("Unknown flag: -{}", s)),
            Flag::Long(s) => usage_error(&format!("Unknown flag: --{}", s)),
        };
        opts.push(cmd);
    }

    (opts, positionals)
}

impl Options {
    /// Parse options from `args`. Exits the process on `--help` or bad usage.
    ///
    /// ```
    /// use codegrep::options::Options;
    /// let options = Options::new(&["codegrep", "foo(___)", "src", "-v"]);
    /// assert_eq!(options.pattern, "foo(___)");
    /// assert_eq!(options.paths, vec![std::path::PathBuf::from("src")]);
    /// assert!(options.verbose);
    /// ```
    pub fn new<S: AsRef<OsStr>>(args: &[S]) -> Options {
        let (cmds, positionals) = parse_options(args);
        let mut positionals = positionals.into_iter();
        let pattern = match positionals.next() {
            Some(pattern) => pattern.to_string_lossy().to_string(),
            None => usage_error("Missing required argument: PATTERN"),
        };

        let mut opts = Options {
            pattern,
            paths: positionals.map(PathBuf::from).collect(),
            ..Options::default()
        };
        let mut ignore = Vec::new();

        for cmd in cmds {
            match cmd {
                OptionCommand::Glob(glob) => opts.glob = glob,
                OptionCommand::Cwd(dir) => opts.cwd = dir.into(),
                OptionCommand::Ignore(glob) => ignore.push(glob),
                OptionCommand::Language(lang) => opts.language = Some(lang),
                OptionCommand::MaxSize(size) => opts.max_size = size,
                OptionCommand::Timeout(timeout) => opts.timeout = Some(timeout),
                OptionCommand::Threads(threads) => opts.threads = threads,
                OptionCommand::Color(color) => opts.color = color,
                OptionCommand::Verbose => opts.verbose = true,
                OptionCommand::Debug => opts.debug = true,
                OptionCommand::PrintMasks => opts.print_masks = true,
            }
        }
        if !ignore.is_empty() {
            opts.ignore = ignore;
        }

        opts
    }

    /// Grammar the pattern is compiled with.
    pub fn pattern_language(&self) -> Language {
        self.language.unwrap_or_default()
    }

    /// Engine settings derived from these options.
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_options() {
        let options = Options::new(&["codegrep", "query", "filename"]);
        assert_eq!(options.pattern, "query");
        assert_eq!(options.paths[0], PathBuf::from("filename"));
        assert_eq!(options.cwd, PathBuf::from("."));
        assert_eq!(options.max_size, DEFAULT_MAX_SIZE);
        assert_eq!(options.ignore, vec!["**/node_modules/**"]);
        assert_eq!(options.glob, default_glob());
        assert_eq!(options.pattern_language(), Language::JavaScript);
    }

    #[test]
    fn flags_with_arguments() {
        let options = Options::new(&[
            "codegrep",
            "-g",
            "**/*.ts",
            "--cwd=project",
            "-i",
            "dist/**",
            "--ignore",
            "build/**",
            "--lang",
            "typescript",
            "--max-size",
            "10",
            "--timeout=250",
            "-j4",
            "--no-color",
            "--masks",
            "let a: A;",
        ]);
        assert_eq!(options.pattern, "let a: A;");
        assert!(options.paths.is_empty());
        assert_eq!(options.glob, "**/*.ts");
        assert_eq!(options.cwd, PathBuf::from("project"));
        assert_eq!(options.ignore, vec!["dist/**", "build/**"]);
        assert_eq!(options.language, Some(Language::TypeScript));
        assert_eq!(options.max_size, 10);
        assert_eq!(options.timeout, Some(Duration::from_millis(250)));
        assert_eq!(options.search_config().timeout, options.timeout);
        assert_eq!(options.threads, 4);
        assert_eq!(options.color, ColorChoice::Never);
        assert!(options.print_masks);
        assert!(!options.verbose);
    }

    #[test]
    fn stdin_and_double_dash() {
        let options = Options::new(&["codegrep", "--debug", "--", "-x", "-"]);
        assert!(options.debug);
        assert_eq!(options.pattern, "-x");
        assert_eq!(options.paths, vec![PathBuf::from("-")]);
    }
}
