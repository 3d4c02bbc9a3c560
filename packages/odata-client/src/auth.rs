use crate::config::ClientConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

pub const TOKEN_ENV: &str = "ODATA_TOKEN";

/// Source of bearer tokens. `force_refresh` is set after the service answered
/// 401 to the previous token.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self, force_refresh: bool) -> Result<String>;
}

/// A fixed token; refreshing returns the same value.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self, _force_refresh: bool) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Reads the token from an environment variable, caching it until a refresh
/// is forced. An external process can rotate the variable (or `.env`).
pub struct EnvToken {
    var: String,
    cached: RwLock<Option<String>>,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            cached: RwLock::new(None),
        }
    }
}

#[async_trait]
impl TokenProvider for EnvToken {
    async fn token(&self, force_refresh: bool) -> Result<String> {
        if !force_refresh {
            if let Some(token) = self.cached.read().await.as_ref() {
                return Ok(token.clone());
            }
        }

        debug!(var = %self.var, force_refresh, "Loading bearer token");
        let token = dotenvy::var(&self.var).context(format!("{} is not set", self.var))?;
        *self.cached.write().await = Some(token.clone());
        Ok(token)
    }
}

/// Static token from config when given, else `ODATA_TOKEN`.
pub fn token_provider(config: &ClientConfig) -> Arc<dyn TokenProvider> {
    match &config.token {
        Some(token) => Arc::new(StaticToken::new(token.clone())),
        None => Arc::new(EnvToken::new(TOKEN_ENV)),
    }
}
