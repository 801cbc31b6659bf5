use std::path::Path;

use anyhow::{Result, anyhow};
use catalog_server::{
    build_state,
    config::{Parser, ServerConfig},
    run::run_graceful_with_state,
};
use rand::Rng as _;
use reqwest::Url;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tracing::{debug, error};

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str, base_dir: &Path) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), base_dir)?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?.to_string();
    let args = &[
        "catalog-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

/// Running server, stopped when dropped.
pub struct TestServer {
    pub base_url: Url,
    _shutdown: oneshot::Sender<()>,
    _config_guard: ConfigGuard,
}

impl TestServer {
    pub fn url(&self, path: &str) -> Url {
        self.base_url.join(path).expect("valid test path")
    }
}

pub async fn launch_server(test_name: &str) -> Result<TestServer> {
    let (args, config_guard) = test_config(test_name, &std::env::temp_dir())?;
    let base_url: Url = format!("http://127.0.0.1:{}/", args.port).parse()?;
    let state = build_state(&args).await?;

    let (shutdown, shutdown_signal) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let signal = async move {
            shutdown_signal.await.ok();
        };
        if let Err(e) = run_graceful_with_state(args, state, signal).await {
            error!("Test server failed: {e}");
        }
    });

    let client = reqwest::Client::new();
    let health = base_url.join("health")?;
    for _ in 0..50 {
        if client.get(health.clone()).send().await.is_ok() {
            debug!("Test server is up at {base_url}");
            return Ok(TestServer {
                base_url,
                _shutdown: shutdown,
                _config_guard: config_guard,
            });
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    Err(anyhow!("Test server did not start"))
}

/// Client which does not follow redirects, so they can be checked.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("client configuration is valid")
}
