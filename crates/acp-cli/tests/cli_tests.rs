//! Integration tests for the `acp` CLI binary.
use assert_cmd::Command;
use predicates::str::contains;

fn acp() -> Command {
    Command::cargo_bin("acp").expect("binary `acp` should be built")
}

#[test]
fn help_flag_prints_usage() {
    acp()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("start"))
        .stdout(contains("status"))
        .stdout(contains("drain"))
        .stdout(contains("retry-dlq"));
}

#[test]
fn version_flag_prints_version() {
    acp()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_durable_store_exits_fatal() {
    acp()
        .arg("status")
        .env_remove("ACP_STORE_URL")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("no durable store configured"));
}

#[test]
fn unreachable_store_without_sql_feature_exits_fatal() {
    acp()
        .arg("status")
        .env("ACP_STORE_URL", "postgres://localhost/doesnotexist")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn config_overlay_file_not_found_exits_fatal() {
    acp()
        .args(["--config", "/nonexistent/acp.toml", "status"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("config file not found"));
}

#[test]
fn invalid_overlay_trust_threshold_fails_validation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("acp.toml");
    std::fs::write(&path, "trust_threshold = 5.0\n").expect("write overlay");

    acp()
        .args(["--config", path.to_str().unwrap(), "status"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("trust_threshold"));
}

#[test]
fn retry_dlq_requires_tenant_and_envelope_flags() {
    acp().args(["retry-dlq", "--tenant", "t1"]).assert().failure();
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    acp().arg("frobnicate").assert().failure();
}
