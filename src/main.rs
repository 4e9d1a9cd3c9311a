#![warn(missing_docs)]
#![warn(clippy::unwrap_used)]

//! codegrep -- Search JavaScript and TypeScript sources for code shaped like a snippet.

use log::{debug, info};
use std::env;
use std::ffi::OsString;
use std::process;

use codegrep::options::Options;
use codegrep::render::Console;
use codegrep::{run, Query};

#[cfg(not(tarpaulin_include))]
fn main() {
    let args: Vec<OsString> = env::args_os().collect();
    let options = Options::new(&args);
    let filter = if options.debug { "debug" } else { "warn" };
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, filter),
    );
    info!("Using options: {:#?}", options);

    let query = match Query::new(&options.pattern, options.pattern_language()) {
        Ok(query) => query,
        Err(err) => {
            eprintln!("Invalid pattern: {}", err);
            process::exit(2);
        }
    };

    if options.print_masks {
        match serde_json::to_string_pretty(&query) {
            Ok(json) => println!("{}", json),
            Err(err) => {
                eprintln!("Cannot print masks: {}", err);
                process::exit(2);
            }
        }
        return;
    }

    let console = Console::new(&options);
    match run::run(&options, &query, &console) {
        Ok(summary) => debug!("{} matches", summary.matches),
        Err(err) => {
            eprintln!("{}", err);
            process::exit(2);
        }
    }
}
