//! # Toolchain Port
//!
//! The single seam through which the pipeline runs external processes: the
//! compiler, and the compiled artifact during verification.
//!
//! Abstracted to allow mocking command execution in tests without requiring a
//! toolchain to be installed.

use crate::cancel::CancelToken;
use crate::error::{AppError, AppResult};
use std::ffi::OsString;
use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A process to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable (looked up on `PATH` when not a path).
    pub program: OsString,
    /// Arguments.
    pub args: Vec<OsString>,
    /// Bytes fed to the process' stdin, which is closed afterwards.
    pub stdin: Option<Vec<u8>>,
}

impl Invocation {
    /// An invocation of `program` without arguments.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    /// Appends an argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets the stdin payload.
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Program and arguments as one line, for logs and diagnostics.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|s| s.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Interface for executing external commands.
pub trait CommandExecutor {
    /// Runs `invocation` to completion and returns its output.
    ///
    /// Fails with [`AppError::CompileInvocation`] when the process cannot be started
    /// and with [`AppError::Cancelled`] when `cancel` fires first; the child is
    /// killed in that case.
    fn execute(&self, invocation: &Invocation, cancel: &CancelToken) -> AppResult<Output>;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    fn execute(&self, invocation: &Invocation, cancel: &CancelToken) -> AppResult<Output> {
        (**self).execute(invocation, cancel)
    }
}

/// Standard executor using `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellExecutor;

impl CommandExecutor for ShellExecutor {
    fn execute(&self, invocation: &Invocation, cancel: &CancelToken) -> AppResult<Output> {
        tracing::debug!(command = %invocation.display(), "spawning");

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AppError::CompileInvocation(format!(
                    "Failed to start {}: {}",
                    invocation.program.to_string_lossy(),
                    e
                ))
            })?;

        // Pipes are drained on their own threads so a chatty child never blocks.
        let writer = match (child.stdin.take(), invocation.stdin.clone()) {
            (Some(mut pipe), Some(input)) => Some(thread::spawn(move || {
                // A child exiting early closes the pipe; that is not our error.
                let _ = pipe.write_all(&input);
            })),
            _ => None,
        };
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = wait(&mut child, cancel)?;

        if let Some(writer) = writer {
            let _ = writer.join();
        }
        Ok(Output {
            status,
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }
}

fn wait(child: &mut Child, cancel: &CancelToken) -> AppResult<ExitStatus> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(AppError::Cancelled(cancel.reason().to_string()));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<thread::JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<thread::JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
