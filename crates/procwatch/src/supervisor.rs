//! The process supervisor.
//!
//! A [`Supervisor`] owns exactly one child process, the line channels its
//! streams flow through, and the reader/writer tasks that service them.
//! Channels and the child handle are never shared between supervisors;
//! tearing the supervisor down force-kills a still-running child as a
//! safety net against orphans.

mod tasks;

use std::process::Stdio;
use std::time::Duration;

use bytes::BytesMut;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::channel::{LineReceiver, LineSender, line_channel};
use crate::config::SupervisorConfig;
use crate::error::{Result, SpawnError, SupervisorError};
use crate::types::{Line, ProcessStatus};

/// Supervises one long-lived child process.
///
/// Created channels follow the configuration: the output channel always
/// exists; a dedicated error channel only with
/// [`dedicated_error_stream`](SupervisorConfig::dedicated_error_stream)
/// (otherwise stderr lines are merged into the output channel); an input
/// channel only with [`manage_input`](SupervisorConfig::manage_input).
///
/// The output channels are lossy under sustained overload: when a channel
/// is full the oldest buffered line is evicted to admit the newest.
/// Consumers that must not miss data need to keep up.
///
/// Dropping a supervisor whose child is still running kills the child
/// (SIGKILL, not a graceful shutdown); use [`shutdown`](Self::shutdown)
/// for the grace-then-kill protocol.
#[derive(Debug)]
pub struct Supervisor {
    config: SupervisorConfig,
    child: Option<Child>,
    pid: Option<u32>,
    output_rx: Option<LineReceiver>,
    error_rx: Option<LineReceiver>,
    input_tx: Option<LineSender>,
    exit_status: Option<ProcessStatus>,
}

impl Supervisor {
    /// Create a supervisor for the given configuration, without starting
    /// the child.
    #[must_use]
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            child: None,
            pid: None,
            output_rx: None,
            error_rx: None,
            input_tx: None,
            exit_status: None,
        }
    }

    /// Create a supervisor and start the child immediately.
    pub fn spawn(config: SupervisorConfig) -> Result<Self> {
        let mut supervisor = Self::new(config);
        supervisor.start()?;
        Ok(supervisor)
    }

    /// The supervisor's configuration.
    #[must_use]
    pub const fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// OS process id of the child, if it has been started.
    #[must_use]
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Spawn the child process and launch the stream tasks.
    ///
    /// Fails with [`SupervisorError::AlreadyStarted`] on a second call
    /// and with [`SpawnError`] if the OS cannot create the process.
    pub fn start(&mut self) -> Result<()> {
        if self.child.is_some() {
            return Err(SupervisorError::AlreadyStarted);
        }
        if self.config.command.is_empty() {
            return Err(SpawnError::EmptyCommand.into());
        }

        let mut command = Command::new(&self.config.command);
        command.args(&self.config.args);
        if !self.config.inherit_env {
            command.env_clear();
        }
        command.envs(&self.config.env);
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }
        command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if self.config.manage_input {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| SpawnError::from_io(&self.config.command, e))?;
        self.pid = child.id();
        info!(
            command = %self.config.command,
            pid = self.pid,
            "spawned child process"
        );

        let capacity = self.config.channel_capacity;
        let (output_tx, output_rx) = line_channel(capacity);
        self.output_rx = Some(output_rx);

        // The child was configured with piped handles, so these are
        // always present.
        let stdout = child.stdout.take().ok_or_else(|| {
            SupervisorError::Io(std::io::Error::other("child stdout not captured"))
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            SupervisorError::Io(std::io::Error::other("child stderr not captured"))
        })?;

        tasks::spawn_reader("stdout", stdout, output_tx.clone());
        if self.config.dedicated_error_stream {
            let (error_tx, error_rx) = line_channel(capacity);
            self.error_rx = Some(error_rx);
            tasks::spawn_reader("stderr", stderr, error_tx);
        } else {
            // Merged mode: a second producer feeds the output channel;
            // end-of-stream is reported once, after both close.
            tasks::spawn_reader("stderr", stderr, output_tx.clone());
        }
        drop(output_tx);

        if self.config.manage_input {
            let (input_tx, input_rx) = line_channel(capacity);
            let stdin = child.stdin.take().ok_or_else(|| {
                SupervisorError::Io(std::io::Error::other("child stdin not captured"))
            })?;
            tasks::spawn_writer(stdin, input_rx);
            self.input_tx = Some(input_tx);
        }

        self.child = Some(child);
        Ok(())
    }

    /// Read the next line from the output channel.
    ///
    /// Suspends until a line is available; returns `Ok(None)` once the
    /// child has exited and all buffered output is drained. A child crash
    /// is not an error here — exit for any reason conflates into
    /// end-of-stream, and the status is reported by
    /// [`status`](Self::status) or [`wait`](Self::wait).
    pub async fn read(&mut self) -> Result<Option<Line>> {
        let rx = self
            .output_rx
            .as_mut()
            .ok_or(SupervisorError::NotStarted)?;
        Ok(rx.recv().await)
    }

    /// Read the next line from the dedicated error channel.
    ///
    /// Fails with [`SupervisorError::ErrorStreamNotManaged`] when stderr
    /// is merged into the output channel.
    pub async fn read_err(&mut self) -> Result<Option<Line>> {
        if self.output_rx.is_none() {
            return Err(SupervisorError::NotStarted);
        }
        let rx = self
            .error_rx
            .as_mut()
            .ok_or(SupervisorError::ErrorStreamNotManaged)?;
        Ok(rx.recv().await)
    }

    /// Enqueue data for the child's stdin.
    ///
    /// Appends the configured line terminator when the payload does not
    /// already end with `\n` or with that terminator, then enqueues onto
    /// the input channel.
    /// Fire-and-forget: the call never waits for the child to consume the
    /// data. If the child has already exited the data is dropped with a
    /// debug log — a documented no-op, not an error.
    pub fn write(&mut self, data: impl AsRef<[u8]>) -> Result<()> {
        if self.child.is_none() && self.exit_status.is_none() {
            return Err(SupervisorError::NotStarted);
        }
        if !self.config.manage_input {
            return Err(SupervisorError::InputNotManaged);
        }

        let exited = self.poll_status().is_some();
        let Some(tx) = self.input_tx.as_ref().filter(|_| !exited) else {
            debug!("write after process exit, dropping data");
            return Ok(());
        };

        let data = data.as_ref();
        let terminator = self.config.line_ending.as_bytes();
        let mut payload = BytesMut::with_capacity(data.len() + terminator.len());
        payload.extend_from_slice(data);
        if !data.ends_with(b"\n") && !data.ends_with(terminator) {
            payload.extend_from_slice(terminator);
        }
        if let Some(evicted) = tx.send(Line::new(payload.freeze())) {
            warn!(
                evicted_bytes = evicted.len(),
                "input channel full, evicted oldest line"
            );
        }
        Ok(())
    }

    /// Non-blocking exit-status check.
    ///
    /// Returns `None` while the child is still running (or was never
    /// started).
    pub fn status(&mut self) -> Option<ProcessStatus> {
        self.poll_status()
    }

    /// Check whether the child has been started and has not yet exited.
    pub fn is_running(&mut self) -> bool {
        self.child.is_some() && self.poll_status().is_none()
    }

    /// Wait for the child to exit.
    pub async fn wait(&mut self) -> Result<ProcessStatus> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }
        let child = self.child.as_mut().ok_or(SupervisorError::NotStarted)?;
        let status = ProcessStatus::from(child.wait().await?);
        self.exit_status = Some(status);
        Ok(status)
    }

    /// Wait for the child to exit, bounded by a deadline.
    ///
    /// Returns `Ok(None)` if the deadline elapses first.
    pub async fn wait_timeout(&mut self, deadline: Duration) -> Result<Option<ProcessStatus>> {
        match tokio::time::timeout(deadline, self.wait()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Shut the child down: close the input channel, wait the configured
    /// grace period for a voluntary exit, then force-kill and reap.
    pub async fn shutdown(&mut self) -> Result<ProcessStatus> {
        // Closing the input channel lets the writer task drain and exit.
        self.input_tx = None;

        if let Some(status) = self.exit_status {
            return Ok(status);
        }
        let child = self.child.as_mut().ok_or(SupervisorError::NotStarted)?;

        let grace = self.config.shutdown_grace;
        let status = match tokio::time::timeout(grace, child.wait()).await {
            Ok(status) => ProcessStatus::from(status?),
            Err(_) => {
                warn!(pid = self.pid, grace = ?grace, "grace period elapsed, killing child");
                child.kill().await?;
                match child.try_wait()? {
                    Some(status) => ProcessStatus::from(status),
                    None => ProcessStatus::from(child.wait().await?),
                }
            }
        };
        info!(pid = self.pid, %status, "child shut down");
        self.exit_status = Some(status);
        Ok(status)
    }

    fn poll_status(&mut self) -> Option<ProcessStatus> {
        if let Some(status) = self.exit_status {
            return Some(status);
        }
        let status = self
            .child
            .as_mut()?
            .try_wait()
            .ok()
            .flatten()
            .map(ProcessStatus::from);
        if status.is_some() {
            self.exit_status = status;
        }
        status
    }
}
