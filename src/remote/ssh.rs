//! `ssh`/`scp` implementation of [`RemoteExecutor`].
//!
//! Both programs run non-interactively (`BatchMode`), so a missing key or an
//! unknown host fails fast instead of waiting for a password prompt. Each
//! child is polled until it exits or the configured timeout passes, at which
//! point it is killed and reported as [`RemoteStatus::TimedOut`].

use anyhow::{Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use super::{RemoteExecutor, RemoteStatus};
use crate::common::constants::*;
use crate::common::utils::private_path;

/// Remote access through the system OpenSSH client.
#[derive(Debug, Clone)]
pub struct SshRemote {
    timeout: Duration,
    port: Option<u16>,
    identity_file: Option<PathBuf>,
    debug_enabled: bool,
}

impl SshRemote {
    pub fn new(timeout: Duration, port: Option<u16>, identity_file: Option<PathBuf>) -> Self {
        Self {
            timeout,
            port,
            identity_file,
            debug_enabled: false,
        }
    }

    pub fn with_debug(mut self, debug_enabled: bool) -> Self {
        self.debug_enabled = debug_enabled;
        self
    }

    fn common_options(&self) -> Vec<String> {
        vec![
            "-o".into(),
            "BatchMode=yes".into(),
            "-o".into(),
            format!("ConnectTimeout={SSH_CONNECT_TIMEOUT_SECS}"),
        ]
    }

    /// Arguments for `ssh host command`.
    pub fn ssh_args(&self, host: &str, command: &str) -> Vec<String> {
        let mut args = self.common_options();
        if let Some(port) = self.port {
            args.push("-p".into());
            args.push(port.to_string());
        }
        if let Some(ref identity) = self.identity_file {
            args.push("-i".into());
            args.push(identity.display().to_string());
        }
        args.push(host.to_string());
        args.push(command.to_string());
        args
    }

    /// Arguments for `scp -p local host:remote_dir/`.
    pub fn scp_args(&self, local: &Path, host: &str, remote_dir: &str) -> Vec<String> {
        let mut args = vec!["-p".to_string(), "-B".to_string()];
        args.extend(self.common_options());
        if let Some(port) = self.port {
            args.push("-P".into());
            args.push(port.to_string());
        }
        if let Some(ref identity) = self.identity_file {
            args.push("-i".into());
            args.push(identity.display().to_string());
        }
        args.push(local.display().to_string());
        args.push(format!("{host}:{}/", remote_dir.trim_end_matches('/')));
        args
    }

    fn run(&self, program: &str, args: &[String]) -> Result<RemoteStatus> {
        if self.debug_enabled {
            log_debug!("{} {}", program, args.join(" "));
        }
        run_with_timeout(program, args, self.timeout)
    }
}

impl RemoteExecutor for SshRemote {
    fn run_remote_command(&self, host: &str, command: &str) -> Result<RemoteStatus> {
        self.run("ssh", &self.ssh_args(host, command))
    }

    fn copy_file(&self, local: &Path, host: &str, remote_dir: &str) -> Result<RemoteStatus> {
        if !local.is_file() {
            anyhow::bail!("{} is not a readable file", private_path(local));
        }
        self.run("scp", &self.scp_args(local, host, remote_dir))
    }
}

/// Spawn `program`, wait up to `timeout`, kill it if it overruns.
pub fn run_with_timeout(program: &str, args: &[String], timeout: Duration) -> Result<RemoteStatus> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to start {program}"))?;

    // Drained concurrently so a chatty child cannot fill the pipe and stall
    let stderr_reader = child.stderr.take().map(|mut pipe| {
        std::thread::spawn(move || {
            let mut stderr = String::new();
            let _ = pipe.read_to_string(&mut stderr);
            stderr
        })
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(RemoteStatus::TimedOut);
        }
        std::thread::sleep(Duration::from_millis(CHILD_POLL_INTERVAL_MS));
    };

    let stderr = stderr_reader
        .and_then(|reader| reader.join().ok())
        .unwrap_or_default();

    if status.success() {
        return Ok(RemoteStatus::Success);
    }

    Ok(RemoteStatus::Failed {
        code: status.code(),
        stderr,
    })
}
