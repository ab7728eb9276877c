use assert_cmd::prelude::*;
use predicates::str::contains;
use std::process::Command;
use tempfile::TempDir;

fn tower(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tower").unwrap();
    cmd.current_dir(dir.path());
    cmd
}

// `tower` with no args should exit with a non-zero code.
#[test]
fn cli_no_args() {
    Command::cargo_bin("tower").unwrap().assert().failure();
}

#[test]
fn cli_version() {
    Command::cargo_bin("tower")
        .unwrap()
        .args(&["-V"])
        .assert()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn cli_get_non_existent_key() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    tower(&temp_dir)
        .args(&["get", "key1"])
        .assert()
        .failure()
        .stdout(contains("Key not found"));
}

#[test]
fn cli_set_then_get_persists() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    tower(&temp_dir)
        .args(&["set", "key1", "value1"])
        .assert()
        .success();
    tower(&temp_dir)
        .args(&["get", "key1"])
        .assert()
        .success()
        .stdout(contains("value1"));
    tower(&temp_dir)
        .args(&["del", "key1"])
        .assert()
        .success();
    tower(&temp_dir)
        .args(&["exists", "key1"])
        .assert()
        .success()
        .stdout(contains("false"));
}

#[test]
fn cli_path_flag_selects_the_database() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let data = TempDir::new().expect("unable to create temporary data directory");
    let path = data.path().to_str().unwrap();
    tower(&temp_dir)
        .args(&["--path", path, "set", "-t", "int", "n", "41"])
        .assert()
        .success();
    tower(&temp_dir)
        .args(&["--path", path, "incr", "n"])
        .assert()
        .success()
        .stdout(contains("42"));
    tower(&temp_dir)
        .args(&["get", "n"])
        .assert()
        .failure();
}

#[test]
fn cli_lists() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    tower(&temp_dir)
        .args(&["rpush", "l", "a", "b"])
        .assert()
        .success()
        .stdout(contains("2"));
    tower(&temp_dir)
        .args(&["lpush", "l", "z"])
        .assert()
        .success();
    tower(&temp_dir)
        .args(&["lrange", "l", "0", "-1"])
        .assert()
        .success()
        .stdout(contains("z\na\nb\n"));
    tower(&temp_dir)
        .args(&["rpop", "l"])
        .assert()
        .success()
        .stdout(contains("b"));
    tower(&temp_dir)
        .args(&["llen", "l"])
        .assert()
        .success()
        .stdout(contains("2"));
}

#[test]
fn cli_maps_and_sets() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    tower(&temp_dir)
        .args(&["hset", "m", "colour", "blue"])
        .assert()
        .success();
    tower(&temp_dir)
        .args(&["hget", "m", "colour"])
        .assert()
        .success()
        .stdout(contains("blue"));
    tower(&temp_dir)
        .args(&["sadd", "s", "x", "y", "x"])
        .assert()
        .success()
        .stdout(contains("2"));
    tower(&temp_dir)
        .args(&["sismember", "s", "y"])
        .assert()
        .success()
        .stdout(contains("true"));
}

#[test]
fn cli_bloom_and_series() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    tower(&temp_dir)
        .args(&["bfadd", "seen", "alice"])
        .assert()
        .success();
    tower(&temp_dir)
        .args(&["bfexists", "seen", "bob"])
        .assert()
        .success()
        .stdout(contains("false"));
    tower(&temp_dir)
        .args(&["tsadd", "-t", "float", "temp", "2020-01-01T00:00:00Z", "20.5"])
        .assert()
        .success();
    tower(&temp_dir)
        .args(&["tsrange", "temp", "2019-12-31T00:00:00Z", "2020-01-02T00:00:00Z"])
        .assert()
        .success()
        .stdout(contains("20.5"));
}

#[test]
fn cli_expire_and_persist() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    tower(&temp_dir)
        .args(&["set", "k", "v"])
        .assert()
        .success();
    tower(&temp_dir)
        .args(&["expire", "k", "3600"])
        .assert()
        .success()
        .stdout(contains("true"));
    tower(&temp_dir)
        .args(&["persist", "k"])
        .assert()
        .success();
    tower(&temp_dir)
        .args(&["ttl", "k"])
        .assert()
        .success()
        .stdout(contains("none"));
    tower(&temp_dir)
        .args(&["sweep"])
        .assert()
        .success()
        .stdout(contains("deleted 0"));
}

#[test]
fn cli_expire_rejects_huge_ttl() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    tower(&temp_dir)
        .args(&["set", "k", "v"])
        .assert()
        .success();
    tower(&temp_dir)
        .args(&["expire", "k", "9223372036854775807"])
        .assert()
        .failure()
        .stdout(contains("SECONDS out of range"));
    tower(&temp_dir)
        .args(&["ttl", "k"])
        .assert()
        .success()
        .stdout(contains("none"));
}

#[test]
fn cli_invalid_subcommand() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    tower(&temp_dir).args(&["unknown"]).assert().failure();
}
