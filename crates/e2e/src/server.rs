//! Site server management - serving the documentation site and checking it answers

use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

/// Handle to a running site server process
pub struct ServerHandle {
    child: Child,
    pub base_url: String,
    pub port: u16,
}

impl ServerHandle {
    /// Spawn the serve command and wait until the site answers
    pub async fn spawn(config: ServerConfig) -> E2eResult<Self> {
        let port = match config.port {
            Some(port) => port,
            None => find_free_port()?,
        };
        let base_url = format!("http://127.0.0.1:{}", port);

        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| E2eError::ServerStartup("empty serve command".to_string()))?;
        let args: Vec<String> = args
            .iter()
            .map(|a| a.replace("{port}", &port.to_string()))
            .collect();

        info!("Spawning site server on port {}: {} {}", port, program, args.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(&args)
            .env("PORT", port.to_string())
            .env("BROWSER", "none")
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        if let Some(dir) = &config.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!("Failed to spawn {}: {}", program, e))
        })?;
        if let Some(stderr) = child.stderr.take() {
            drain_stderr(stderr);
        }

        let handle = ServerHandle {
            child,
            base_url: base_url.clone(),
            port,
        };

        // Wait for server to be healthy
        handle
            .wait_for_healthy(Duration::from_secs(config.startup_timeout_secs))
            .await?;

        info!("Site is up at {}", base_url);
        Ok(handle)
    }

    /// Poll the site root until it responds successfully
    async fn wait_for_healthy(&self, timeout_duration: Duration) -> E2eResult<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&self.base_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Site answered {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for site to start...");
                    }
                    // Connection refused is expected while the server is starting
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(250)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    /// Get the base URL for this server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the server; a no-op once the process has been reaped
    pub fn stop(&mut self) -> E2eResult<()> {
        if let Ok(Some(_)) = self.child.try_wait() {
            return Ok(());
        }
        info!("Stopping site server (pid: {})", self.child.id());

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                let deadline = Instant::now() + Duration::from_millis(500);
                while Instant::now() < deadline {
                    if let Ok(Some(_)) = self.child.try_wait() {
                        return Ok(());
                    }
                    std::thread::sleep(Duration::from_millis(25));
                }
            }
        }

        // Force kill if still running
        let _ = self.child.kill();
        let _ = self.child.wait();

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Forward the server's stderr to the debug log so the pipe never fills up.
/// The thread ends when the process closes its stderr; it returns the
/// number of bytes read.
fn drain_stderr<R: Read + Send + 'static>(stderr: R) -> JoinHandle<u64> {
    std::thread::spawn(move || {
        let mut reader = BufReader::new(stderr);
        let mut line = Vec::new();
        let mut total = 0;
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    total += n as u64;
                    debug!(target: "site_server", "{}", String::from_utf8_lossy(&line).trim_end());
                }
            }
        }
        total
    })
}

/// Check once that the root page of an already running site answers
pub async fn probe(url: &str) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    match client.get(url).send().await {
        Ok(resp) if resp.status().is_success() => Ok(()),
        Ok(resp) => Err(E2eError::Navigation(format!("{} returned {}", url, resp.status()))),
        Err(e) => Err(E2eError::Navigation(format!("{} is unreachable: {}", url, e))),
    }
}

/// Configuration for serving the site locally
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Program and arguments; `{port}` in an argument is replaced with the port
    pub command: Vec<String>,

    /// Directory to run the command in
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Port to listen on (None = find free port)
    #[serde(default)]
    pub port: Option<u16>,

    /// Timeout for startup
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,
}

fn default_startup_timeout() -> u64 {
    120
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "npm".to_string(),
                "run".to_string(),
                "serve".to_string(),
                "--".to_string(),
                "--port".to_string(),
                "{port}".to_string(),
            ],
            working_dir: None,
            port: None,
            startup_timeout_secs: default_startup_timeout(),
        }
    }
}

/// Find a free port to use
fn find_free_port() -> E2eResult<u16> {
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|e| E2eError::ServerStartup(format!("no free port: {}", e)))?;
    Ok(listener.local_addr()?.port())
}
