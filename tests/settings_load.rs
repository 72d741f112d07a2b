mod support;

use std::io::Write;

use support::EnvGuard;
use workhub_auth::settings;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn load_reads_file_then_applies_env() {
    let mut env = EnvGuard::new();
    let file = write_config(
        r#"
        [identity]
        api_key = "file-key"
        project_id = "workhub-demo"
        endpoint = "http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1/"

        [telemetry]
        enabled = false

        [logging]
        directory = "  "
        "#,
    );
    env.set_var("WORKHUB_PROJECT_ID", "workhub-staging");

    let loaded = settings::load(Some(file.path())).expect("load");
    assert_eq!(loaded.identity.api_key, "file-key");
    assert_eq!(loaded.identity.project_id, "workhub-staging");
    assert_eq!(
        loaded.identity.endpoint,
        "http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1"
    );
    assert!(!loaded.telemetry.enabled);
    assert_eq!(loaded.logging.directory, None);
}

#[test]
fn load_without_file_needs_api_key_from_env() {
    let mut env = EnvGuard::new();
    let err = settings::load(None).expect_err("no api key");
    assert_eq!(err.code(), "CONFIG_INVALID");

    env.set_var("WORKHUB_API_KEY", "env-key");
    let loaded = settings::load(None).expect("load");
    assert_eq!(loaded.identity.api_key, "env-key");
    assert_eq!(loaded.identity.endpoint, settings::DEFAULT_IDENTITY_ENDPOINT);
}

#[test]
fn missing_file_is_read_error() {
    let _env = EnvGuard::new();
    let dir = tempfile::tempdir().expect("tempdir");
    let err = settings::load(Some(&dir.path().join("absent.toml"))).expect_err("missing");
    assert_eq!(err.code(), "CONFIG_READ");
}

#[test]
fn malformed_file_is_config_error() {
    let _env = EnvGuard::new();
    let file = write_config("[identity\napi_key = 1");
    let err = settings::load(Some(file.path())).expect_err("malformed");
    assert_eq!(err.code(), "CONFIG_INVALID");
}
