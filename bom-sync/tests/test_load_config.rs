use bom_sync::load_config::{FunctionConfig, DEFAULT_SMARTSHEET_API_BASE};
use serial_test::serial;
use std::env;

const VARS: [&str; 5] = [
    "SMARTSHEET_ACCESS_TOKEN",
    "SMARTSHEET_ID",
    "SMARTSHEET_API_BASE",
    "AZURE_STORAGE_CONNECTION_STRING",
    "BLOB_CONTAINER_NAME",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_from_env_captures_all_settings() {
    clear_env();
    env::set_var("SMARTSHEET_ACCESS_TOKEN", "token-123");
    env::set_var("SMARTSHEET_ID", "4583173393803140");
    env::set_var("AZURE_STORAGE_CONNECTION_STRING", "UseDevelopmentStorage=true");
    env::set_var("BLOB_CONTAINER_NAME", "boms");

    let config = FunctionConfig::from_env();
    assert_eq!(config.smartsheet_access_token.as_deref(), Some("token-123"));
    assert_eq!(config.smartsheet_api_base, DEFAULT_SMARTSHEET_API_BASE);

    let run = config.resolve().expect("valid configuration should resolve");
    assert_eq!(run.sheet_id, 4583173393803140);
    assert_eq!(run.container.as_deref(), Some("boms"));

    // Secrets stay out of debug output.
    let debug = format!("{config:?}");
    assert!(!debug.contains("token-123"));
    assert!(!debug.contains("UseDevelopmentStorage"));
    clear_env();
}

#[test]
#[serial]
fn test_missing_sheet_id_is_reported_by_name() {
    clear_env();
    let err = FunctionConfig::from_env().resolve().unwrap_err();
    assert_eq!(err.kind(), "config");
    assert_eq!(err.to_string(), "Environment variable SMARTSHEET_ID is not set");
}

#[test]
#[serial]
fn test_non_integer_sheet_id_is_rejected() {
    clear_env();
    env::set_var("SMARTSHEET_ID", "not-a-number");
    let err = FunctionConfig::from_env().resolve().unwrap_err();
    assert!(err.to_string().starts_with("SMARTSHEET_ID must be a valid integer"));
    clear_env();
}

#[test]
#[serial]
fn test_container_and_storage_are_optional_until_upload() {
    clear_env();
    env::set_var("SMARTSHEET_ID", "7");
    env::set_var("SMARTSHEET_API_BASE", "http://127.0.0.1:8080/2.0");

    let config = FunctionConfig::from_env();
    assert_eq!(config.smartsheet_api_base, "http://127.0.0.1:8080/2.0");
    assert!(config.storage_connection_string.is_none());

    let run = config.resolve().expect("container is checked at publish time");
    assert_eq!(run.sheet_id, 7);
    assert_eq!(run.container, None);
    clear_env();
}
