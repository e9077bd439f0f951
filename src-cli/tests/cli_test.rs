//! End-to-end checks of the command line shell that need no browser.

use clap::Parser;
use waypoint_cli::{run, AppState, Cli, Command};

fn write_config(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    let contents = format!(
        "[geocode]\nbilling_rate_per_thousand = 17.0\nmonthly_allowance = 200.0\n\n\
         [storage]\ndatabase_path = \"{}\"\n\n[state]\npath = \"{}\"\n",
        dir.join("places.db").display(),
        dir.join(".scraper.dat").display()
    );
    std::fs::write(&path, contents).expect("write config");
    path
}

#[tokio::test]
async fn test_usage_command_with_config_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = write_config(dir.path());

    let cli = Cli::try_parse_from([
        "waypoint",
        "--config",
        config.to_str().expect("utf-8 path"),
        "usage",
    ])
    .expect("parse");
    assert!(matches!(cli.command, Command::Usage));

    run(cli).await.expect("usage runs");

    // reporting usage never creates the state file or the cache
    assert!(!dir.path().join(".scraper.dat").exists());
    assert!(!dir.path().join("places.db").exists());
}

#[tokio::test]
async fn test_invalid_query_fails_before_launch() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = write_config(dir.path());

    let cli = Cli::try_parse_from([
        "waypoint",
        "--config",
        config.to_str().expect("utf-8 path"),
        "scrape",
        "--query",
        "   ",
        "--lat",
        "27.04",
        "--lng",
        "88.26",
        "--radius",
        "1000",
    ])
    .expect("parse");

    let err = run(cli).await.expect_err("blank term rejected");
    assert!(err.to_string().contains("invalid search query"));
    assert!(!dir.path().join("places.db").exists());
}

#[test]
fn test_state_from_config_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = write_config(dir.path());

    let state = AppState::load(Some(&config)).expect("state");
    assert!((state.config.geocode.monthly_allowance - 200.0).abs() < f64::EPSILON);
    assert_eq!(state.database_path, dir.path().join("places.db"));
}
