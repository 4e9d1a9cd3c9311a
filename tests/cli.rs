use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*; // Used for writing assertions
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command; // Run programs
use tempfile::TempDir;

fn run(path: &str, query: &str) -> Command {
    let mut d = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    d.push(path);

    let mut cmd = Command::cargo_bin("codegrep").unwrap();
    cmd.arg("--no-color").arg(query).arg(d);
    cmd
}

fn write(root: &Path, path: &str, content: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A small project: two sources, a dependency, a broken file, a large file and a text file.
fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/a.js", "foo(a);\n");
    write(root, "src/b.ts", "let b: number = foo(b);\n");
    write(root, "node_modules/dep/index.js", "foo(dep);\n");
    write(root, "broken.js", "foo(;\n");
    write(root, "big.js", &"foo(big);\n".repeat(20));
    write(root, "notes.txt", "foo(notes);\n");
    dir
}

fn in_project(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("codegrep").unwrap();
    cmd.arg("--no-color")
        .arg("--max-size")
        .arg("100")
        .arg("-C")
        .arg(dir.path());
    cmd
}

#[test]
fn file_doesnt_exist() {
    let mut cmd = run("test/file/doesnt/exist", "foo");

    cmd.assert()
        .code(0)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No such file or directory"));
}

#[test]
fn test_match_find_single_file() {
    let mut cmd = run("test-files/fixtures/imports.js", "import ___ from 'xxx';");

    cmd.assert().code(0).stdout(
        predicate::str::is_match(
            "^.*test-files/fixtures/imports.js: import abc, \\{ something \\} from 'xxx';
.*test-files/fixtures/imports.js: import bcd from 'xxx';
$",
        )
        .unwrap(),
    );
}

#[test]
fn test_no_match_single_file() {
    let mut cmd = run("test-files/fixtures/imports.js", "import nothing from 'xxx';");

    cmd.assert()
        .code(0)
        .stdout(predicate::str::is_match("^$").unwrap())
        .stderr(predicate::str::contains("Scanned 1 files"));
}

#[test]
fn test_multiline_match_single_file() {
    let mut cmd = run("test-files/fixtures/neighbours.jsx", "<A /><B />");

    cmd.assert().code(0).stdout(
        predicate::str::is_match(
            "neighbours.jsx: <C>
            <A />
            <B />
        </C>
$",
        )
        .unwrap(),
    );
}

#[test]
fn parse_failures_are_not_fatal() {
    let mut cmd = run("test-files/fixtures/broken.js", "foo(___)");

    cmd.assert()
        .code(0)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Failed to parse following files"))
        .stderr(predicate::str::contains("broken.js"));
}

#[test]
fn invalid_pattern() {
    let mut cmd = run("test-files/fixtures/imports.js", "foo(;");

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid pattern"));
}

#[test]
fn invalid_regex_in_pattern() {
    let mut cmd = run("test-files/fixtures/imports.js", "import ___ from '/(/';");

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("invalid regular expression"));
}

#[test]
fn missing_pattern() {
    let mut cmd = Command::cargo_bin("codegrep").unwrap();

    cmd.assert()
        .code(2)
        .stdout(predicate::str::contains("Missing required argument: PATTERN"));
}

#[test]
fn unknown_flag() {
    let mut cmd = Command::cargo_bin("codegrep").unwrap();
    cmd.arg("--frobnicate").arg("foo");

    cmd.assert()
        .code(2)
        .stdout(predicate::str::contains("Unknown flag: --frobnicate"));
}

#[test]
fn list_languages() {
    let mut cmd = Command::cargo_bin("codegrep").unwrap();
    cmd.arg("--lang");

    cmd.assert()
        .code(0)
        .stdout(predicate::str::contains("- javascript [js, jsx, mjs, cjs]"))
        .stdout(predicate::str::contains("- tsx [tsx]"));
}

#[test]
fn print_masks() {
    let mut cmd = Command::cargo_bin("codegrep").unwrap();
    cmd.arg("--masks").arg("foo(___)");

    cmd.assert()
        .code(0)
        .stdout(predicate::str::contains(r#""type": "expression_statement""#))
        .stdout(predicate::str::contains(r#""type": "call_expression""#))
        .stdout(predicate::str::contains("___").not());
}

#[test]
fn search_project() {
    let dir = project();
    let mut cmd = in_project(&dir);
    cmd.arg("foo(___)");

    cmd.assert()
        .code(0)
        .stdout(predicate::str::contains("./src/a.js: foo(a);\n"))
        .stdout(predicate::str::contains("./src/a.js: foo(a)\n"))
        .stdout(predicate::str::contains("./src/b.ts: foo(b)\n"))
        .stdout(predicate::str::contains("node_modules").not())
        .stdout(predicate::str::contains("notes").not())
        .stdout(predicate::str::contains("big").not())
        .stderr(predicate::str::contains("Scanned 3 files"))
        .stderr(predicate::str::contains("  ./broken.js"))
        .stderr(predicate::str::contains("Skipped 1 files"));
}

#[test]
fn search_project_verbose() {
    let dir = project();
    let mut cmd = in_project(&dir);
    cmd.arg("-v").arg("foo(___)");

    cmd.assert()
        .code(0)
        .stderr(predicate::str::contains("Failed to parse ./broken.js: "))
        .stderr(predicate::str::contains("too large:\n  ./big.js"));
}

#[test]
fn ignore_replaces_defaults() {
    let dir = project();
    let mut cmd = in_project(&dir);
    cmd.arg("-i").arg("**/src/**").arg("foo(___)");

    cmd.assert()
        .code(0)
        .stdout(predicate::str::contains("./node_modules/dep/index.js: foo(dep)"))
        .stdout(predicate::str::contains("./src/").not());
}

#[test]
fn glob_and_paths() {
    let dir = project();
    let mut cmd = in_project(&dir);
    cmd.arg("-g").arg("**/*.ts").arg("foo(___)").arg("src");

    cmd.assert()
        .code(0)
        .stdout(predicate::str::contains("./src/b.ts: foo(b)\n"))
        .stdout(predicate::str::contains("a.js").not())
        .stderr(predicate::str::contains("Scanned 1 files"));
}

#[test]
fn search_stdin() {
    let mut cmd = assert_cmd::Command::cargo_bin("codegrep").unwrap();
    cmd.arg("--no-color").arg("foo(___)").arg("-");
    cmd.write_stdin("foo(a);\nbar(b);\n");

    cmd.assert()
        .code(0)
        .stdout(predicate::str::contains("<stdin>: foo(a)\n"))
        .stdout(predicate::str::contains("bar").not());
}

#[test]
fn typescript_pattern() {
    let mut cmd = assert_cmd::Command::cargo_bin("codegrep").unwrap();
    cmd.arg("--no-color")
        .arg("--lang")
        .arg("typescript")
        .arg("let ___: number = ___;")
        .arg("-");
    cmd.write_stdin("let a: number = x;\nlet b: string = y;\n");

    cmd.assert()
        .code(0)
        .stdout("<stdin>: let a: number = x;\n");
}

#[test]
fn colored_output() {
    let mut cmd = assert_cmd::Command::cargo_bin("codegrep").unwrap();
    cmd.arg("--color").arg("foo(___)").arg("-");
    cmd.write_stdin("foo(a);\n");

    cmd.assert()
        .code(0)
        .stdout(predicate::str::contains("\u{1b}["));
}
