pub mod auth;
pub mod client;
pub mod config;
pub mod http;

pub use auth::{token_provider, EnvToken, StaticToken, TokenProvider, TOKEN_ENV};
pub use client::EntityClient;
pub use config::{load_config, ClientConfig};
pub use http::HttpTransport;
