use assert_cmd::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;
use vcsreport::cancel::Cancellation;
use vcsreport::git::GitRepo;
use vcsreport::query::NativeFilter;
use vcsreport::{Backend, ReportError};

fn has_git() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn git(dir: &Path, args: &[&str]) {
    assert!(Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
}

/// Run a git command as `who` with author and committer dates pinned to `date`.
fn git_as(dir: &Path, who: &str, date: &str, args: &[&str]) {
    assert!(Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", who)
        .env("GIT_AUTHOR_EMAIL", format!("{who}@example.com"))
        .env("GIT_COMMITTER_NAME", who)
        .env("GIT_COMMITTER_EMAIL", format!("{who}@example.com"))
        .env("GIT_AUTHOR_DATE", date)
        .env("GIT_COMMITTER_DATE", date)
        .status()
        .unwrap()
        .success());
}

fn init_git_repo(dir: &Path) {
    git(dir, &["init"]);
    git(dir, &["config", "core.autocrlf", "false"]);
    git(dir, &["config", "core.safecrlf", "false"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
    git(dir, &["config", "user.email", "you@example.com"]);
    git(dir, &["config", "user.name", "Your Name"]);
}

fn commit_file(dir: &Path, who: &str, date: &str, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut f = File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f.sync_all().unwrap();
    git(dir, &["add", "."]);
    git_as(dir, who, date, &["commit", "-m", &format!("{who} edits {name}")]);
}

/// alice +2/-1 on a.txt, bob +5 on b.txt, a merge by carol, alice -3 on a.txt.
fn scenario_repo(dir: &Path) {
    init_git_repo(dir);
    commit_file(dir, "carol", "2013-04-23T08:00:00+00:00", "a.txt", "one\ntwo\nthree\n");
    commit_file(dir, "carol", "2013-04-23T08:30:00+00:00", "b.txt", "b\n");

    commit_file(dir, "alice", "2013-04-24T09:00:00+00:00", "a.txt", "one\n2\nthree\nfour\n");
    commit_file(dir, "bob", "2013-04-24T10:00:00+00:00", "b.txt", "b\n1\n2\n3\n4\n5\n");

    git(dir, &["checkout", "-b", "side", "HEAD~1"]);
    commit_file(dir, "carol", "2013-04-23T12:00:00+00:00", "c.txt", "side\n");
    git(dir, &["checkout", "-"]);
    git_as(dir, "carol", "2013-04-24T11:00:00+00:00", &["merge", "--no-ff", "side", "-m", "merge side"]);

    commit_file(dir, "alice", "2013-04-24T11:30:00+00:00", "a.txt", "one\n");
}

#[test]
fn writes_report_and_json_summary() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    scenario_repo(dir.path());
    let report = dir.path().join("out").join("report.html");
    fs::create_dir_all(report.parent().unwrap()).unwrap();

    let mut cmd = Command::cargo_bin("vcsreport").unwrap();
    cmd.current_dir(dir.path())
        .arg("-r")
        .arg(dir.path())
        .arg("-f")
        .arg(&report)
        .args(["-d", "2013-04-24", "-u", "https://example.com/commit/", "--json"]);
    let out = cmd.assert().success().get_output().stdout.clone();

    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let committers = v["committers"].as_array().unwrap();
    let names: Vec<&str> = committers.iter().map(|c| c["committer"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["alice", "bob"]);
    assert_eq!(committers[0]["added"], 2);
    assert_eq!(committers[0]["removed"], 4);
    assert_eq!(committers[1]["added"], 5);
    assert_eq!(committers[1]["removed"], 0);

    let html = fs::read_to_string(&report).unwrap();
    assert_eq!(html.matches("class=\"simpleTabsContent\"").count(), 2);
    assert!(html.contains("https://example.com/commit/"));
    assert!(!html.contains("merge side"));
    assert!(!report.with_file_name("report.html.partial").exists());
}

#[test]
fn window_pair_and_default_output_name() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    scenario_repo(dir.path());

    let mut cmd = Command::cargo_bin("vcsreport").unwrap();
    cmd.current_dir(dir.path())
        .args(["-d", "2013-04-23 2013-04-25", "--json"]);
    let out = cmd.assert().success().get_output().stdout.clone();

    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let names: Vec<&str> = v["committers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["committer"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alice", "bob", "carol"]);
    assert!(dir.path().join("vcs_report.html").exists());
}

#[test]
fn bad_date_fails_without_output() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    scenario_repo(dir.path());

    let mut cmd = Command::cargo_bin("vcsreport").unwrap();
    cmd.current_dir(dir.path()).args(["-d", "next tuesday"]);
    cmd.assert().failure();
    assert!(!dir.path().join("vcs_report.html").exists());
}

#[test]
fn missing_repository_fails() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope");

    let mut cmd = Command::cargo_bin("vcsreport").unwrap();
    cmd.current_dir(dir.path()).arg("-r").arg(&missing);
    cmd.assert().failure();
}

#[test]
fn branch_flag_follows_only_that_branch() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    scenario_repo(dir.path());

    let mut cmd = Command::cargo_bin("vcsreport").unwrap();
    cmd.current_dir(dir.path())
        .args(["-d", "2013-04-23 2013-04-25", "-b", "side", "--json"]);
    let out = cmd.assert().success().get_output().stdout.clone();

    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let names: Vec<&str> = v["committers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["committer"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alice", "carol"]);
}

#[test]
fn expired_timeout_fails_without_output() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    scenario_repo(dir.path());

    let mut cmd = Command::cargo_bin("vcsreport").unwrap();
    cmd.current_dir(dir.path())
        .args(["-d", "2013-04-24", "--timeout", "0s"]);
    cmd.assert().failure();
    assert!(!dir.path().join("vcs_report.html").exists());
    assert!(!dir.path().join("vcs_report.html.partial").exists());
}

#[test]
fn cancelled_git_scan_stops() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    scenario_repo(dir.path());

    let cancel = Cancellation::new();
    let repo = GitRepo::open(Some(dir.path()))
        .unwrap()
        .with_cancellation(cancel.clone());
    assert_eq!(repo.changesets(&NativeFilter::default()).unwrap().len(), 7);

    cancel.cancel();
    assert!(matches!(
        repo.changesets(&NativeFilter::default()),
        Err(ReportError::Cancelled)
    ));
}

#[test]
fn git_history_stops_at_previous_revision() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    scenario_repo(dir.path());

    let repo = GitRepo::open(Some(dir.path())).unwrap();
    let changesets = repo.changesets(&NativeFilter::default()).unwrap();
    let latest = changesets.last().unwrap();
    assert_eq!(latest.committer_name, "alice");

    let file = repo.changed(latest).unwrap().remove(0);
    assert_eq!(file.path, "a.txt");
    let history = repo.history(&file).unwrap();
    let committers: Vec<&str> = history.iter().map(|c| c.committer_name.as_str()).collect();
    assert_eq!(committers, vec!["alice", "alice"]);
    assert_eq!(history[0].id, latest.id);
}
