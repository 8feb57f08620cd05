//! Integration tests for CLI argument handling
//!
//! Tests argument validation and the saved-city flags from the command
//! line. Nothing here hits the network; invalid combinations fail before
//! any fetch is attempted.

use std::process::Command;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_skywatch"))
        .args(args)
        .output()
        .expect("Failed to execute skywatch")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(
        output.status.success(),
        "Expected --help to exit successfully"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("skywatch"), "Help should mention skywatch");
    assert!(stdout.contains("--lat"), "Help should mention --lat");
    assert!(stdout.contains("--save"), "Help should mention --save");
    assert!(stdout.contains("--cities"), "Help should mention --cities");
}

#[test]
fn test_version_flag_exits_successfully() {
    let output = run_cli(&["--version"]);
    assert!(output.status.success());
}

#[test]
fn test_no_args_prints_error_and_exits() {
    let output = run_cli(&[]);
    assert!(!output.status.success(), "Expected bare invocation to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Nothing to do"),
        "Should explain that a target is required: {}",
        stderr
    );
}

#[test]
fn test_lat_without_lon_fails() {
    let output = run_cli(&["--lat", "51.5"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("together"),
        "Should explain that --lat and --lon pair up: {}",
        stderr
    );
}

#[test]
fn test_city_and_coords_together_fail() {
    let output = run_cli(&["London", "--lat", "51.5", "--lon", "-0.12"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("not both"),
        "Should reject the conflicting target: {}",
        stderr
    );
}

#[test]
fn test_zero_days_fails() {
    let output = run_cli(&["London", "--days", "0"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("at least 1"), "stderr was: {}", stderr);
}

#[test]
fn test_save_without_target_fails() {
    let output = run_cli(&["--cities", "--save"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--save"), "stderr was: {}", stderr);
}

#[test]
fn test_cities_command_runs_without_network() {
    // Listing saved cities never needs an API key or a connection
    let output = run_cli(&["--cities"]);
    assert!(output.status.success());
}

#[test]
fn test_forget_unknown_id_reports_miss() {
    let output = run_cli(&["--forget", "no_such_city@coords_0_0"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("no saved city"),
        "stdout was: {}",
        stdout
    );
}

#[test]
fn test_fetch_without_api_key_fails_cleanly() {
    let output = Command::new(env!("CARGO_BIN_EXE_skywatch"))
        .args(["London"])
        .env_remove("OPENWEATHER_API_KEY")
        .output()
        .expect("Failed to execute skywatch");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("API key"),
        "Should ask for an API key: {}",
        stderr
    );
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use skywatch::cli::{Cli, CityCommand, FetchTarget, StartupConfig};

    #[test]
    fn test_city_positional_becomes_target() {
        let cli = Cli::parse_from(["skywatch", "Oslo"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.target, Some(FetchTarget::City("Oslo".to_string())));
    }

    #[test]
    fn test_coords_become_target() {
        let cli = Cli::parse_from(["skywatch", "--lat", "59.91", "--lon", "10.75"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert!(matches!(config.target, Some(FetchTarget::Coords { .. })));
    }

    #[test]
    fn test_forget_flag_parses_into_command() {
        let cli = Cli::parse_from(["skywatch", "--forget", "oslo@coords_5991_1075"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(
            config.command,
            Some(CityCommand::Forget("oslo@coords_5991_1075".to_string()))
        );
    }

    #[test]
    fn test_cities_flag_combines_with_fetch_target() {
        // Listing first and then fetching in one invocation is allowed
        let cli = Cli::parse_from(["skywatch", "London", "--cities"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.command, Some(CityCommand::List));
        assert!(config.target.is_some());
    }

    #[test]
    fn test_days_default_is_seven() {
        let cli = Cli::parse_from(["skywatch", "London"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.days, 7);
    }
}
