//! Where commands run.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use swesh_protocol::Observation;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::trace;

use crate::config::EnvironmentConfig;
use crate::error::EnvironmentError;

/// Executes a single shell command and reports its result.
///
/// A timeout is reported as [`EnvironmentError::Timeout`] carrying whatever
/// output was captured; the step loop treats that as recoverable.
#[async_trait]
pub trait Environment: Send + Sync {
    async fn execute(&self, command: &str) -> Result<Observation, EnvironmentError>;
}

/// Runs commands as `<shell> -c <command>` on the local machine.
#[derive(Debug, Clone)]
pub struct LocalEnvironment {
    shell: String,
    cwd: Option<PathBuf>,
    env: HashMap<String, String>,
    timeout: Duration,
}

impl LocalEnvironment {
    pub fn new(config: &EnvironmentConfig) -> Self {
        Self {
            shell: config.shell.clone(),
            cwd: config.cwd.clone(),
            env: config.env.clone(),
            timeout: config.timeout(),
        }
    }
}

type SharedOutput = Arc<Mutex<Vec<u8>>>;

fn spawn_reader<R>(reader: Option<R>, output: SharedOutput) -> Option<JoinHandle<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = reader?;
    Some(tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => output
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .extend_from_slice(&chunk[..n]),
                Err(err) => {
                    trace!("stopped reading command output: {err}");
                    break;
                }
            }
        }
    }))
}

fn take_output(output: &SharedOutput) -> String {
    let bytes = output
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    String::from_utf8_lossy(&bytes).into_owned()
}

#[async_trait]
impl Environment for LocalEnvironment {
    async fn execute(&self, command: &str) -> Result<Observation, EnvironmentError> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(command);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd.envs(&self.env);
        // No stdin: commands waiting for input would otherwise hang until the
        // timeout.
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EnvironmentError::Spawn {
                command: command.to_string(),
                source,
            })?;
        debug!(command, "spawned command");

        let output: SharedOutput = Arc::new(Mutex::new(Vec::new()));
        let mut readers: Vec<JoinHandle<()>> = [
            spawn_reader(child.stdout.take(), Arc::clone(&output)),
            spawn_reader(child.stderr.take(), Arc::clone(&output)),
        ]
        .into_iter()
        .flatten()
        .collect();

        // The deadline covers draining the pipes too: a background job can keep
        // them open long after the shell itself has exited.
        let finished = tokio::time::timeout(self.timeout, async {
            let status = child.wait().await?;
            for reader in &mut readers {
                reader.await.ok();
            }
            Ok::<_, std::io::Error>(status)
        })
        .await;

        match finished {
            Ok(status) => Ok(Observation::new(
                status?.code().unwrap_or(-1),
                take_output(&output),
            )),
            Err(_) => {
                child.start_kill().ok();
                for reader in &readers {
                    reader.abort();
                }
                Err(EnvironmentError::Timeout {
                    command: command.to_string(),
                    timeout: self.timeout,
                    output: take_output(&output),
                })
            }
        }
    }
}
