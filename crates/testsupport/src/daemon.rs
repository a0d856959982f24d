use anyhow::Result;
use ocr_models::Config;
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::{Child, Command};

use crate::helpers::{poll_until, workspace_root};
use crate::http_client::OcrClient;

#[derive(Debug)]
pub struct TestDaemon {
    pub base_url: String,
    pub config_dir: TempDir,
    process: Child,
}

impl TestDaemon {
    pub fn client(&self) -> OcrClient {
        OcrClient::new(self.base_url.clone())
    }

    pub async fn kill(&mut self) -> Result<()> {
        self.process.kill().await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConfigOverride {
    pub max_concurrency: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub cooldown_seconds: Option<u64>,
    pub default_language: Option<String>,
    pub tesseract_binary: Option<String>,
    pub port: Option<u16>,
}

fn free_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

pub async fn spawn_daemon(config_override: Option<ConfigOverride>) -> Result<TestDaemon> {
    let config_dir = tempfile::tempdir()?;

    let mut config = Config::default();
    config.server.bind = "127.0.0.1".to_string();
    config.server.port = free_port()?;
    if let Some(over) = config_override {
        if let Some(max_concurrency) = over.max_concurrency {
            config.limits.max_concurrency = max_concurrency;
        }
        if let Some(timeout_ms) = over.timeout_ms {
            config.engine.timeout_ms = timeout_ms;
        }
        if let Some(seconds) = over.cooldown_seconds {
            config.cooldown.seconds = seconds;
        }
        if let Some(language) = over.default_language {
            config.engine.default_language = language;
        }
        if let Some(binary) = over.tesseract_binary {
            config.engine.binary = binary;
        }
        if let Some(port) = over.port {
            config.server.port = port;
        }
    }

    let config_path = config_dir.path().join("ocr.toml");
    std::fs::write(&config_path, toml::to_string(&config)?)?;

    let mut cmd = Command::new("cargo");
    cmd.args(["run", "--bin", "ocr-at-home-server"]);
    cmd.env("OCR_CONFIG", &config_path);
    cmd.env_remove("PORT");
    cmd.current_dir(workspace_root());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::null());
    cmd.kill_on_drop(true);

    let process = cmd.spawn()?;

    let base_url = format!("http://{}:{}", config.server.bind, config.server.port);
    let client = OcrClient::new(base_url.clone());
    // First run may include a build.
    poll_until("daemon to answer /healthz", Duration::from_secs(180), || {
        let client = client.clone();
        async move { Ok(client.health().await.unwrap_or(false)) }
    })
    .await?;

    Ok(TestDaemon {
        base_url,
        config_dir,
        process,
    })
}
