use rotating_logger::archive::read_lines;
use std::process::Command;

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rotating_logger"))
}

#[test]
fn test_cli_writes_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cli.log");

    let output = binary()
        .args(["--lines", "200", "--threads", "2", "--max-size", "4096", "--flush-ms", "0"])
        .arg("--file")
        .arg(&path)
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("wrote 400 lines"), "stdout: {}", stdout);
    assert!(stdout.contains("rotations:"), "stdout: {}", stdout);

    let lines = read_lines(&path).unwrap();
    let produced = lines.iter().filter(|l| l.contains("producer=")).count();
    assert_eq!(produced, 400);
    assert!(lines.iter().any(|l| l.ends_with("shutting down")));
}

#[test]
fn test_cli_exit_on_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exit.log");

    let output = binary()
        .args(["--lines", "10", "--threads", "1", "--exit-on-error", "7"])
        .arg("--file")
        .arg(&path)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(7));
    let lines = read_lines(&path).unwrap();
    let last_error = lines.iter().rev().find(|l| l.contains("[ERROR]")).unwrap();
    assert!(last_error.ends_with("exit requested after 10 lines"), "line: {}", last_error);
    assert!(!lines.iter().any(|l| l.ends_with("shutting down")));
}

#[test]
fn test_cli_rejects_bad_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.toml");
    std::fs::write(&config, "queue_capacity = 0\n").unwrap();

    let output = binary().arg("--config").arg(&config).output().unwrap();
    assert!(!output.status.success());
}
