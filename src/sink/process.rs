//! Player process that consumes the PCM stream on stdin
//!
//! The process is owned for its whole life: spawned once, fed through its
//! stdin pipe, then stopped with [`SinkProcess::terminate`] which closes the
//! pipe, asks the player to exit and reaps it.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, info, warn};

use crate::config::SinkConfig;
use crate::error::{Error, Result};
use crate::relay::ChunkSink;

/// Running player process
pub struct SinkProcess {
    /// Child handle, killed on drop if never terminated
    child: Child,

    /// Write end of the player's stdin; `None` once closed
    stdin: Option<ChildStdin>,

    /// Executable name, for messages
    program: String,

    /// OS process id captured at spawn
    pid: Option<u32>,

    /// Time allowed between SIGTERM and a hard kill
    grace: Duration,

    /// Set once `terminate` has run
    terminated: bool,

    /// Exit status collected while reaping
    exit_status: Option<ExitStatus>,

    /// Total bytes accepted by the pipe
    bytes_written: u64,
}

impl SinkProcess {
    /// Spawn the configured player with a piped stdin
    pub fn spawn(config: &SinkConfig) -> Result<Self> {
        let program = config.program().to_string();
        let args = config.args();
        info!("Starting audio sink: {} {}", program, args.join(" "));

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| Error::Spawn {
            program: program.clone(),
            source: io::Error::new(io::ErrorKind::Other, "stdin was not captured"),
        })?;
        let pid = child.id();

        debug!("Audio sink {} running with pid {:?}", program, pid);

        Ok(Self {
            child,
            stdin: Some(stdin),
            program,
            pid,
            grace: config.terminate_grace(),
            terminated: false,
            exit_status: None,
            bytes_written: 0,
        })
    }

    /// Write every byte and flush, blocking while the pipe is full
    pub async fn write_chunk(&mut self, bytes: &[u8]) -> io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "sink input is closed"))?;

        stdin.write_all(bytes).await?;
        stdin.flush().await?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Close stdin, ask the player to stop, and reap it.
    ///
    /// Idempotent and infallible: an already exited player is simply reaped,
    /// and one that ignores SIGTERM is killed after the grace period.
    pub async fn terminate(&mut self) -> Option<ExitStatus> {
        if self.terminated {
            return self.exit_status;
        }
        self.terminated = true;

        drop(self.stdin.take());

        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!("Audio sink {} had already exited: {}", self.program, status);
                self.exit_status = Some(status);
                return self.exit_status;
            }
            Ok(None) => {}
            Err(e) => warn!("Could not poll audio sink {}: {}", self.program, e),
        }

        self.request_stop();

        self.exit_status = match tokio::time::timeout(self.grace, self.child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                warn!("Failed to wait for audio sink {}: {}", self.program, e);
                None
            }
            Err(_) => {
                warn!(
                    "Audio sink {} still running after {:?}, killing it",
                    self.program, self.grace
                );
                if let Err(e) = self.child.kill().await {
                    warn!("Failed to kill audio sink {}: {}", self.program, e);
                }
                self.child.try_wait().ok().flatten()
            }
        };

        match self.exit_status {
            Some(status) => info!("Audio sink {} stopped ({})", self.program, status),
            None => info!("Audio sink {} stopped", self.program),
        }
        self.exit_status
    }

    #[cfg(unix)]
    fn request_stop(&mut self) {
        let Some(pid) = self.child.id() else {
            return;
        };
        // SAFETY: `pid` belongs to our own unreaped child, so it cannot have
        // been recycled for another process.
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc != 0 {
            warn!(
                "Failed to signal audio sink {}: {}",
                self.program,
                io::Error::last_os_error()
            );
        }
    }

    #[cfg(not(unix))]
    fn request_stop(&mut self) {
        if let Err(e) = self.child.start_kill() {
            warn!("Failed to stop audio sink {}: {}", self.program, e);
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

impl ChunkSink for SinkProcess {
    async fn write_chunk(&mut self, bytes: &[u8]) -> io::Result<()> {
        SinkProcess::write_chunk(self, bytes).await
    }
}
