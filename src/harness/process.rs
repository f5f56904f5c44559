//! Server process lifecycle
//!
//! A [`ServerGuard`] owns one launched server for the duration of a scenario
//! and terminates it exactly once: through [`ServerGuard::stop`] on the normal
//! path, or from `Drop` when the scenario unwinds or its future is cancelled.
//! Only `stop` waits for the process to exit; `Drop` can merely signal it.

use crate::error::{Result, TesterError};
use futures::future::{self, BoxFuture};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

/// Upper bound on waiting for a killed server to exit
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// A running server that can be forcibly terminated
pub trait ServerHandle: Send {
    /// OS process id, if the process still has one
    fn id(&self) -> Option<u32>;

    /// Forcibly terminate the server. Called at most once per handle.
    fn terminate(&mut self) -> std::io::Result<()>;

    /// Resolve once the server has exited and released its resources
    fn wait_exit(&mut self) -> BoxFuture<'_, std::io::Result<()>> {
        Box::pin(future::ready(Ok(())))
    }
}

/// Starts server executables
pub trait ServerLauncher: Send + Sync {
    fn launch(&self, path: &Path, arguments: &[String]) -> std::io::Result<Box<dyn ServerHandle>>;
}

/// Launches servers as child processes of the runner
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl ServerLauncher for ProcessLauncher {
    fn launch(&self, path: &Path, arguments: &[String]) -> std::io::Result<Box<dyn ServerHandle>> {
        let child = Command::new(path)
            .args(arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            // Backstop in case the handle is leaked without terminate()
            .kill_on_drop(true)
            .spawn()?;

        Ok(Box::new(ChildProcess { child }))
    }
}

struct ChildProcess {
    child: Child,
}

impl ServerHandle for ChildProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn terminate(&mut self) -> std::io::Result<()> {
        if let Some(status) = self.child.try_wait()? {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("server already exited with {}", status),
            ));
        }
        self.child.start_kill()
    }

    fn wait_exit(&mut self) -> BoxFuture<'_, std::io::Result<()>> {
        Box::pin(async move {
            let status = self.child.wait().await?;
            log::debug!("Server exited with {}", status);
            Ok(())
        })
    }
}

/// Exclusive owner of one server for the lifetime of one scenario
pub struct ServerGuard {
    handle: Option<Box<dyn ServerHandle>>,
    label: String,
}

impl ServerGuard {
    /// Launch `path` with `arguments`.
    ///
    /// Does not wait for the server to be ready; see [`super::Readiness`].
    pub fn start(launcher: &dyn ServerLauncher, path: &Path, arguments: &[String]) -> Result<Self> {
        let handle = launcher
            .launch(path, arguments)
            .map_err(|source| TesterError::ProcessLaunch {
                path: path.to_path_buf(),
                source,
            })?;

        let label = path.display().to_string();
        match handle.id() {
            Some(pid) => log::info!("Started server {} (pid {})", label, pid),
            None => log::info!("Started server {}", label),
        }

        Ok(Self {
            handle: Some(handle),
            label,
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.handle.as_ref().and_then(|h| h.id())
    }

    /// Terminate the server and wait, up to [`STOP_TIMEOUT`], for it to exit.
    /// Ownership ends here.
    pub async fn stop(mut self) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };

        Self::signal(&self.label, handle.as_mut());

        // Logged, never escalated
        match tokio::time::timeout(STOP_TIMEOUT, handle.wait_exit()).await {
            Ok(Ok(())) => log::debug!("Server {} stopped", self.label),
            Ok(Err(e)) => log::warn!("Could not reap server {}: {}", self.label, e),
            Err(_) => log::warn!(
                "Server {} still running {:?} after kill",
                self.label,
                STOP_TIMEOUT
            ),
        }
    }

    fn signal(label: &str, handle: &mut dyn ServerHandle) {
        log::info!("All done, killing server {}", label);
        if let Err(e) = handle.terminate() {
            log::warn!("Could not terminate server {}: {}", label, e);
        }
    }
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            Self::signal(&self.label, handle.as_mut());
        }
    }
}
