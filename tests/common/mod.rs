#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{Map, Value};

use byteware_inventory_api::{
    app,
    config::{AppConfig, StoreKind},
    database::MemoryDocumentStore,
    AppState,
};

pub const TEST_SECRET: &str = "integration-test-secret";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
    state: AppState,
}

impl TestServer {
    /// Serve the app on a free port inside the calling test's runtime, backed
    /// by a fresh in-memory store so tests never share documents.
    async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut config = AppConfig::development();
        config.server.bind_address = "127.0.0.1".to_string();
        config.server.port = port;
        config.database.store = StoreKind::Memory;
        config.security.access_token_secret = TEST_SECRET.to_string();
        config.api.enable_request_logging = false;

        let state = AppState::new(config, Arc::new(MemoryDocumentStore::new()))?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;

        let router = app(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            port,
            base_url,
            client: reqwest::Client::new(),
            state,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sign a token with the server's secret without going through /getToken
    pub fn issue_token(&self, payload: Value) -> Result<String> {
        let payload: Map<String, Value> = payload
            .as_object()
            .cloned()
            .context("token payload must be an object")?;
        Ok(self.state.tokens.issue(payload)?)
    }

    /// POST a document to `path` and return the parsed response body
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let res = self.client.post(self.url(path)).json(body).send().await?;
        anyhow::ensure!(res.status().is_success(), "POST {} failed: {}", path, res.status());
        Ok(res.json().await?)
    }

    pub async fn get_json(&self, path: &str) -> Result<Value> {
        let res = self.client.get(self.url(path)).send().await?;
        anyhow::ensure!(res.status().is_success(), "GET {} failed: {}", path, res.status());
        Ok(res.json().await?)
    }
}

pub async fn start_server() -> Result<TestServer> {
    let server = TestServer::spawn().await?;
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}
