//! YAML configuration loading.

use odata_client::{load_config, ClientConfig};
use odata_query::BooleanFormat;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_minimal_config_uses_defaults() {
    let file = write_config("baseUrl: https://host/data/\n");

    let config = load_config(file.path()).unwrap();

    assert_eq!(config, ClientConfig::new("https://host/data/"));
}

#[test]
fn test_full_config() {
    let file = write_config(
        r#"
baseUrl: https://usnconeboxax1aos.cloud.onebox.dynamics.com/data
token: abc123
crossCompany: true
pageSize: 1000
maxAuthRetries: 2
requestTimeoutSecs: 90
booleanFormat:
  mode: sentinel
  type_name: Microsoft.Dynamics.DataEntities.NoYes
  true_label: "Yes"
  false_label: "No"
"#,
    );

    let config = load_config(file.path()).unwrap();

    assert_eq!(config.token.as_deref(), Some("abc123"));
    assert!(config.cross_company);
    assert_eq!(config.page_size, Some(1000));
    assert_eq!(config.max_auth_retries, 2);
    assert_eq!(config.request_timeout_secs, 90);
    assert_eq!(config.boolean_format, BooleanFormat::no_yes());
}

#[test]
fn test_missing_file_reports_path() {
    let err = load_config("/nonexistent/odata.yml").unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/odata.yml"));
}

#[test]
fn test_malformed_yaml_is_error() {
    let file = write_config("crossCompany: [not, a, bool\n");
    assert!(load_config(file.path()).is_err());
}
