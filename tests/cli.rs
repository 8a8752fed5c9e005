use assert_cmd::Command;
use predicates::prelude::*;

/// With the listing unreachable the run degrades to "nothing found" and still exits 0.
#[test]
fn cli_completes_when_listing_is_unreachable() {
    let mut cmd = Command::cargo_bin("cnpj-bucket").expect("Binary exists");

    cmd.env("cnpj_url", "http://127.0.0.1:1/dados_abertos_cnpj/")
        .env("base_url", "http://127.0.0.1:1/dados_abertos_cnpj/")
        .env("minio_host", "127.0.0.1")
        .env("minio_port", "1")
        .env("minio_access_key", "test")
        .env("minio_secret_key", "test")
        .env("http_timeout_secs", "5")
        .env("RUST_LOG", "info");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Synchronise complete: 0 stored, 0 failed"));
}

#[test]
fn cli_rejects_malformed_tunable() {
    let mut cmd = Command::cargo_bin("cnpj-bucket").expect("Binary exists");

    cmd.env("max_directories", "all").env("RUST_LOG", "error");

    cmd.assert().failure();
}

#[test]
fn cli_prints_version() {
    let mut cmd = Command::cargo_bin("cnpj-bucket").expect("Binary exists");
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cnpj-bucket"));
}
