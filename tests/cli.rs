use std::{fs, path::Path, process::Command};

use assert_cmd::prelude::{CommandCargoExt, OutputAssertExt};
use predicates::prelude::*;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn rev(dir: &Path, args: &[&str]) -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("rev")?;
    cmd.current_dir(dir).args(args);
    Ok(cmd)
}

fn rev_ok(dir: &Path, args: &[&str]) -> Result<String, Box<dyn std::error::Error>> {
    let output = rev(dir, args)?.output()?;
    assert!(output.status.success(), "{:?} failed", args);
    Ok(String::from_utf8(output.stdout)?)
}

fn commit_file(dir: &Path, name: &str, content: &str, message: &str) -> TestResult {
    fs::write(dir.join(name), content)?;
    rev_ok(dir, &["add", name])?;
    rev_ok(dir, &["commit", message])?;
    Ok(())
}

#[test]
fn init_creates_master() -> TestResult {
    let dir = tempfile::tempdir()?;
    rev(dir.path(), &["init"])?.assert().success().stdout("");
    assert!(dir.path().join(".rev").is_dir());
    rev(dir.path(), &["status"])?
        .assert()
        .success()
        .stdout(predicate::str::starts_with("=== Branches ===\n*master\n"));
    Ok(())
}

#[test]
fn failures_print_one_line_and_succeed() -> TestResult {
    let dir = tempfile::tempdir()?;
    rev(dir.path(), &["log"])?
        .assert()
        .success()
        .stdout("Not in an initialized .rev directory.\n");
    rev_ok(dir.path(), &["init"])?;
    rev(dir.path(), &["init"])?
        .assert()
        .success()
        .stdout("A revision store already exists in the current directory.\n");
    rev(dir.path(), &["frobnicate"])?
        .assert()
        .success()
        .stdout("No command with that name exists.\n");
    rev(dir.path(), &["add"])?
        .assert()
        .success()
        .stdout("Incorrect operands.\n");
    rev(dir.path(), &["checkout"])?
        .assert()
        .success()
        .stdout("Incorrect operands.\n");
    rev(dir.path(), &["add", "missing.txt"])?
        .assert()
        .success()
        .stdout("File does not exist.\n");
    rev(dir.path(), &["commit", "nothing staged"])?
        .assert()
        .success()
        .stdout("No changes added to the commit.\n");
    fs::write(dir.path().join("f"), "x")?;
    rev_ok(dir.path(), &["add", "f"])?;
    rev(dir.path(), &["commit", ""])?
        .assert()
        .success()
        .stdout("Please enter a commit message.\n");
    Ok(())
}

#[test]
fn commit_log_checkout_reset() -> TestResult {
    let dir = tempfile::tempdir()?;
    let dir = dir.path();
    rev_ok(dir, &["init"])?;
    commit_file(dir, "f", "x", "m1")?;
    commit_file(dir, "f", "y", "m2")?;

    let log = rev_ok(dir, &["log"])?;
    let messages: Vec<&str> = log
        .split("===\n")
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.lines().nth(2).unwrap_or_default())
        .collect();
    assert_eq!(messages, vec!["m2", "m1", "initial commit"]);

    fs::write(dir.join("f"), "scribble")?;
    rev_ok(dir, &["checkout", "--", "f"])?;
    assert_eq!(fs::read_to_string(dir.join("f"))?, "y");

    let m1 = rev_ok(dir, &["find", "m1"])?;
    let m1 = m1.trim();
    assert_eq!(m1.len(), 64);
    rev_ok(dir, &["checkout", &m1[..8], "--", "f"])?;
    assert_eq!(fs::read_to_string(dir.join("f"))?, "x");

    fs::write(dir.join("f"), "scribble")?;
    rev_ok(dir, &["reset", m1])?;
    rev_ok(dir, &["checkout", "--", "f"])?;
    assert_eq!(fs::read_to_string(dir.join("f"))?, "x");
    rev(dir, &["log"])?
        .assert()
        .success()
        .stdout(predicate::str::contains("m2").not());
    Ok(())
}

#[test]
fn find_reports_no_match() -> TestResult {
    let dir = tempfile::tempdir()?;
    rev_ok(dir.path(), &["init"])?;
    rev(dir.path(), &["find", "nope"])?
        .assert()
        .success()
        .stdout("Found no commit with that message.\n");
    rev(dir.path(), &["global-log"])?
        .assert()
        .success()
        .stdout(predicate::str::contains("initial commit"));
    Ok(())
}

#[test]
fn branch_checkout_and_conflict() -> TestResult {
    let dir = tempfile::tempdir()?;
    let dir = dir.path();
    rev_ok(dir, &["init"])?;
    rev_ok(dir, &["branch", "other"])?;
    commit_file(dir, "g", "1", "add g")?;
    rev_ok(dir, &["checkout", "other"])?;
    assert!(!dir.join("g").exists());

    fs::write(dir.join("g"), "2")?;
    fs::write(dir.join("p"), "p")?;
    rev_ok(dir, &["add", "p"])?;
    rev(dir, &["checkout", "master"])?
        .assert()
        .success()
        .stdout("There is an untracked file in the way; delete it, or add and commit it first.\n");
    assert_eq!(fs::read_to_string(dir.join("g"))?, "2");
    rev(dir, &["status"])?
        .assert()
        .success()
        .stdout(predicate::str::contains("*other\n"))
        .stdout(predicate::str::contains("=== Staged Files ===\np\n"));

    fs::remove_file(dir.join("g"))?;
    rev_ok(dir, &["checkout", "master"])?;
    assert_eq!(fs::read_to_string(dir.join("g"))?, "1");
    rev(dir, &["checkout", "master"])?
        .assert()
        .success()
        .stdout("No need to check out the current branch.\n");
    Ok(())
}

#[test]
fn branch_removal() -> TestResult {
    let dir = tempfile::tempdir()?;
    rev_ok(dir.path(), &["init"])?;
    rev_ok(dir.path(), &["branch", "b1"])?;
    rev(dir.path(), &["rm-branch", "b1"])?.assert().success().stdout("");
    rev(dir.path(), &["rm-branch", "master"])?
        .assert()
        .success()
        .stdout("Cannot remove the current branch.\n");
    rev(dir.path(), &["merge", "b1"])?
        .assert()
        .success()
        .stdout("A branch with that name does not exist.\n");
    Ok(())
}

#[test]
fn status_sections() -> TestResult {
    let dir = tempfile::tempdir()?;
    let dir = dir.path();
    rev_ok(dir, &["init"])?;
    commit_file(dir, "tracked", "t", "m1")?;
    fs::write(dir.join("tracked"), "changed")?;
    fs::write(dir.join("new"), "n")?;
    let status = rev_ok(dir, &["status"])?;
    assert_eq!(
        status,
        "=== Branches ===\n*master\n\n\
         === Staged Files ===\n\n\
         === Removed Files ===\n\n\
         === Modifications Not Staged For Commit ===\ntracked (modified)\n\n\
         === Untracked Files ===\nnew\n"
    );
    Ok(())
}
