//! Integration tests for the pdfscribe binary.

use std::process::{Command, Output};

fn pdfscribe(args: &[&str], dir: &std::path::Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pdfscribe"))
        .args(args)
        .current_dir(dir)
        .env_remove("BOT_TOKEN")
        .env_remove("WEBHOOK_URL")
        .env_remove("OPENROUTER_API_KEY")
        .env("RUST_LOG", "error")
        .output()
        .expect("Failed to run pdfscribe")
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    let output = pdfscribe(&["--help"], dir.path());
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["serve", "extract", "webhook"] {
        assert!(stdout.contains(command), "help should mention {}", command);
    }
}

#[test]
fn test_serve_without_token_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = pdfscribe(&["serve"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("BOT_TOKEN"));
}

#[test]
fn test_extract_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = pdfscribe(&["extract", "does-not-exist.pdf"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("does-not-exist.pdf"));
}

#[test]
fn test_extract_rejects_non_pdf() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.pdf"), "plain text, not a PDF").unwrap();

    let output = pdfscribe(&["extract", "notes.pdf", "--no-structure"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not a PDF"));
}

#[test]
fn test_invalid_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pdfscribe.toml"), "[server\nport =").unwrap();

    let output = pdfscribe(&["extract", "any.pdf"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load configuration"));
}
