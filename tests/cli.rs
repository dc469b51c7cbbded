use assert_cmd::prelude::*;
use predicates::prelude::*;

#[test]
fn test_cli_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = assert_cmd::cargo_bin_cmd!("notify-metrics");
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("experiments"))
        .stdout(predicate::str::contains("economic-impact"));
    Ok(())
}

#[test]
fn completions_command_outputs_bash_script() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("notify-metrics");
    cmd.args(["completions", "bash"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("notify-metrics"));
}

#[test]
fn invalid_channel_is_rejected_by_the_parser() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("notify-metrics");
    cmd.args(["summary", "--channel", "SMS"]);

    cmd.assert().failure();
}

#[test]
fn missing_config_file_is_reported() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("notify-metrics");
    cmd.args(["summary", "-c", "/nonexistent/console.yaml"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error loading configuration"));
}
