use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    #[allow(dead_code)]
    pub port: u16,
    pub base_url: String,
    #[allow(dead_code)]
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // In-memory storage keeps test runs from touching the working tree
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_h5p-content-api"));
        cmd.env("H5P_PORT", port.to_string())
            .env("H5P_STORAGE", "memory")
            .env("H5P_PUBLIC_URL", &base_url)
            .env("API_ENABLE_REQUEST_LOGGING", "false")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}
