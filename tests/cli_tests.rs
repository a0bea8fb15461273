use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_documents_the_two_flags() {
    let mut cmd = Command::cargo_bin("gh-profile-stats").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--exclude-forks"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn missing_github_token_fails_with_exit_code_one() {
    let mut cmd = Command::cargo_bin("gh-profile-stats").unwrap();
    cmd.env_remove("GITHUB_TOKEN")
        .env_remove("GITHUB_USERNAME")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn short_github_token_fails_with_exit_code_one() {
    let mut cmd = Command::cargo_bin("gh-profile-stats").unwrap();
    cmd.env("GITHUB_TOKEN", "short")
        .env("GITHUB_USERNAME", "octocat")
        .assert()
        .failure()
        .code(1);
}
