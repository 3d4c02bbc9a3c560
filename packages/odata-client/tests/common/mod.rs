//! Shared helpers for odata-client integration tests

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use odata_client::{ClientConfig, TokenProvider};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Serves `app` on an ephemeral local port and returns the service root.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/data/")
}

pub fn config(base_url: &str) -> ClientConfig {
    let mut config = ClientConfig::new(base_url);
    config.token = Some("secret".to_string());
    config
}

/// Hands out `stale` until a refresh is forced, then `fresh`.
#[derive(Default)]
pub struct RotatingToken {
    refreshes: AtomicUsize,
    issued: Mutex<Vec<String>>,
}

impl RotatingToken {
    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn issued(&self) -> Vec<String> {
        self.issued.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenProvider for RotatingToken {
    async fn token(&self, force_refresh: bool) -> Result<String> {
        if force_refresh {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
        }
        let token = if self.refreshes() == 0 { "stale" } else { "fresh" };
        self.issued.lock().unwrap().push(token.to_string());
        Ok(token.to_string())
    }
}
