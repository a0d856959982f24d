use anyhow::Result;
use base64::Engine;
use std::path::PathBuf;
use std::time::Duration;

/// Base64 encode bytes
pub fn b64<T: AsRef<[u8]>>(bytes: T) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Poll until a condition is met or timeout
pub async fn poll_until<F, Fut>(
    description: &str,
    timeout_duration: Duration,
    mut condition: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<bool>>,
{
    let start = std::time::Instant::now();
    let poll_interval = Duration::from_millis(100);

    loop {
        if start.elapsed() >= timeout_duration {
            anyhow::bail!("Timeout waiting for: {}", description);
        }

        if condition().await? {
            return Ok(());
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Workspace root, where `cargo run` finds the server binary.
pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// True when a `tesseract` binary answers `--version` on this host.
pub fn tesseract_installed() -> bool {
    std::process::Command::new("tesseract")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}
