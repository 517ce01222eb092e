use podsync::config::Config;
use podsync::errors::NotAContainerError;
use podsync_cli::run_from_args;

#[test]
fn missing_subcommand_is_rejected() {
    assert!(run_from_args(["podsync"]).is_err());
}

#[test]
fn unknown_subcommand_is_rejected() {
    assert!(run_from_args(["podsync", "sync", "https://x/doc"]).is_err());
}

#[test]
fn put_requires_a_file() {
    assert!(run_from_args(["podsync", "put", "https://x/doc"]).is_err());
}

#[test]
fn rm_container_requires_container_location() {
    let err = run_from_args(["podsync", "rm", "--container", "https://x/doc"]).unwrap_err();
    assert!(err.downcast_ref::<NotAContainerError>().is_some());
}

#[test]
fn edit_without_changes_is_rejected() {
    let err = run_from_args(["podsync", "edit", "https://x/doc"]).unwrap_err();
    assert!(err.to_string().contains("Nothing to edit"));
}

#[test]
fn missing_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let result = run_from_args([
        "podsync",
        "--config",
        path.to_str().unwrap(),
        "rm",
        "--container",
        "https://x/c/",
    ]);
    assert!(result.is_err());
}

#[test]
fn config_file_is_loaded_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("podsync.json");
    Config::builder()
        .timeout_secs(5)
        .user_agent("podsync-test")
        .build()
        .unwrap()
        .save_to_file(&path)
        .unwrap();
    let err = run_from_args([
        "podsync",
        "--config",
        path.to_str().unwrap(),
        "--timeout",
        "1",
        "rm",
        "--container",
        "https://x/doc",
    ])
    .unwrap_err();
    assert!(err.downcast_ref::<NotAContainerError>().is_some());
}
