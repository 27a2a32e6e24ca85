use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::{tempdir, TempDir};

fn rollout(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rollout"))
        .env("HOME", home)
        .args(args)
        .output()
        .unwrap()
}

fn envelope(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

/// A target on localhost whose deploy root lives in a temp dir.
fn local_target(releases: &[&str]) -> (TempDir, String) {
    let dir = tempdir().unwrap();
    let deploy_to = dir.path().join("site");
    fs::create_dir_all(deploy_to.join("releases")).unwrap();
    for id in releases {
        fs::create_dir_all(deploy_to.join("releases").join(id)).unwrap();
    }
    if let Some(last) = releases.last() {
        std::os::unix::fs::symlink(
            deploy_to.join("releases").join(last),
            deploy_to.join("current"),
        )
        .unwrap();
    }

    let config = dir.path().join("target.json");
    fs::write(
        &config,
        serde_json::json!({
            "deploy_to": deploy_to,
            "server": { "host": "localhost", "user": "deploy" },
            "db_type": "mysql",
            "db_name": "app",
            "db_username": "u",
            "db_password": "p",
            "command_timeout_secs": 30
        })
        .to_string(),
    )
    .unwrap();

    let config = config.display().to_string();
    (dir, config)
}

#[test]
fn invalid_target_file_exits_with_config_code() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("broken.json");
    fs::write(&config, r#"{ "deploy_to": "relative/path" }"#).unwrap();

    let output = rollout(dir.path(), &["--config", config.to_str().unwrap(), "deploy"]);

    assert_eq!(output.status.code(), Some(2));
    let json = envelope(&output);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "config.multiple_errors");
}

#[test]
fn unknown_target_id_is_not_found() {
    let home = tempdir().unwrap();
    let output = rollout(home.path(), &["releases", "staging"]);

    assert_eq!(output.status.code(), Some(4));
    assert_eq!(envelope(&output)["error"]["code"], "target.not_found");
}

#[test]
fn rollback_with_single_release_exits_with_precondition_code() {
    let (dir, config) = local_target(&["20240101000000"]);

    let output = rollout(dir.path(), &["--config", &config, "rollback"]);

    assert_eq!(output.status.code(), Some(3));
    let json = envelope(&output);
    assert_eq!(json["error"]["code"], "rollback.no_prior_release");
    assert_eq!(
        json["error"]["message"],
        "could not rollback the code because there is no prior release"
    );
    let live = fs::read_link(dir.path().join("site/current")).unwrap();
    assert!(live.ends_with("20240101000000"));
}

#[test]
fn releases_lists_local_target() {
    let (dir, config) = local_target(&["20240101000000", "20240102000000"]);

    let output = rollout(dir.path(), &["--config", &config, "releases"]);

    assert_eq!(output.status.code(), Some(0));
    let json = envelope(&output);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["live"], "20240102000000");
    let ids: Vec<&str> = json["data"]["releases"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["20240101000000", "20240102000000"]);
}

#[test]
fn cleanup_prunes_local_releases() {
    let (dir, config) = local_target(&["20240101000000", "20240102000000", "20240103000000"]);
    let backups = dir.path().join("site/db_backups/default");
    fs::create_dir_all(&backups).unwrap();
    fs::write(backups.join("20240101000000.sql"), "-- dump").unwrap();

    let output = rollout(dir.path(), &["--config", &config, "cleanup", "--keep", "1"]);

    assert_eq!(output.status.code(), Some(0));
    let removed = &envelope(&output)["data"]["steps"][0]["removed"];
    assert_eq!(removed.as_array().unwrap().len(), 2);
    assert!(!dir.path().join("site/releases/20240101000000").exists());
    assert!(!dir.path().join("site/releases/20240102000000").exists());
    assert!(dir.path().join("site/releases/20240103000000").exists());
    assert!(!backups.join("20240101000000.sql").exists());
}

#[test]
fn unknown_task_is_rejected_before_connecting() {
    let home = tempdir().unwrap();
    let output = rollout(home.path(), &["task", "staging", "deploy:migrate"]);

    assert_eq!(output.status.code(), Some(2));
    assert_eq!(envelope(&output)["error"]["code"], "validation.invalid_argument");
}

#[test]
fn missing_target_and_config_is_a_usage_error() {
    let home = tempdir().unwrap();
    let output = rollout(home.path(), &["setup"]);

    assert_eq!(output.status.code(), Some(2));
    assert_eq!(envelope(&output)["error"]["code"], "validation.invalid_argument");
}
