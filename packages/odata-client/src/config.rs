use anyhow::{Context, Result};
use odata_query::BooleanFormat;
use serde::Deserialize;
use std::fs;
use std::path::Path;

fn default_max_auth_retries() -> u32 {
    1
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Connection settings for one OData service.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Service root, e.g. `https://host/data/`.
    pub base_url: String,
    /// Bearer token. When absent the token is read from `ODATA_TOKEN`.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub cross_company: bool,
    #[serde(default)]
    pub boolean_format: BooleanFormat,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default = "default_max_auth_retries")]
    pub max_auth_retries: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            cross_company: false,
            boolean_format: BooleanFormat::default(),
            page_size: None,
            max_auth_retries: default_max_auth_retries(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Reads `ODATA_*` variables, loading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Same as [`ClientConfig::from_env`] over an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = var("ODATA_BASE_URL").context("ODATA_BASE_URL is not set")?;
        let mut config = Self::new(base_url);
        config.token = var("ODATA_TOKEN");

        if let Some(raw) = var("ODATA_CROSS_COMPANY") {
            config.cross_company = raw
                .parse()
                .context(format!("Invalid ODATA_CROSS_COMPANY: {raw}"))?;
        }
        if let Some(raw) = var("ODATA_BOOLEAN_FORMAT") {
            config.boolean_format = match raw.to_ascii_lowercase().as_str() {
                "native" => BooleanFormat::Native,
                "noyes" | "sentinel" => BooleanFormat::no_yes(),
                other => anyhow::bail!("Invalid ODATA_BOOLEAN_FORMAT: {other}"),
            };
        }
        if let Some(raw) = var("ODATA_PAGE_SIZE") {
            config.page_size = Some(
                raw.parse()
                    .context(format!("Invalid ODATA_PAGE_SIZE: {raw}"))?,
            );
        }
        if let Some(raw) = var("ODATA_MAX_AUTH_RETRIES") {
            config.max_auth_retries = raw
                .parse()
                .context(format!("Invalid ODATA_MAX_AUTH_RETRIES: {raw}"))?;
        }
        if let Some(raw) = var("ODATA_TIMEOUT_SECS") {
            config.request_timeout_secs = raw
                .parse()
                .context(format!("Invalid ODATA_TIMEOUT_SECS: {raw}"))?;
        }

        Ok(config)
    }
}

/// Load client configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ClientConfig> {
    let path = path.as_ref();

    let raw = fs::read_to_string(path)
        .context(format!("Failed to read client config: {:?}", path))?;

    let config: ClientConfig =
        serde_yaml::from_str(&raw).context("Failed to parse client config")?;

    if config.max_auth_retries > 5 {
        tracing::warn!(
            max_auth_retries = config.max_auth_retries,
            "Unusually high auth retry bound"
        );
    }

    Ok(config)
}
