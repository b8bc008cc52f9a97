//! Subprocess execution.
//!
//! The orchestrator never spawns processes directly; it runs on an injected
//! [`CommandRunner`] so tests can substitute execution without process-wide
//! global state. [`ProcessRunner`] is the production implementation on
//! `tokio::process`. Children are spawned with `kill_on_drop`, so cancelling
//! (dropping) a pipeline future aborts the in-flight subprocess.

pub mod args;

use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Errors from running an external command.
#[derive(Debug, Error)]
pub enum CmdError {
  /// The command could not be spawned at all.
  #[error("spawning `{command}`: {source}")]
  Spawn {
    command: String,
    source: std::io::Error,
  },

  /// The command ran and exited non-zero.
  #[error("`{command}` exited with status {code:?}: {stderr}")]
  Failed {
    command: String,
    code: Option<i32>,
    stderr: String,
  },

  /// Piping input to the command failed.
  #[error("writing to `{command}` stdin: {source}")]
  Stdin {
    command: String,
    source: std::io::Error,
  },
}

/// Capability to run external commands.
#[async_trait]
pub trait CommandRunner: Send + Sync {
  /// Run a command, streaming its output to the parent's stdio.
  async fn run(&self, program: &str, args: &[String]) -> Result<(), CmdError>;

  /// Run a command, capturing its stdout.
  async fn output(&self, program: &str, args: &[String]) -> Result<Vec<u8>, CmdError>;

  /// Run a command with `input` piped to stdin, capturing its stdout.
  async fn output_with_input(
    &self,
    program: &str,
    args: &[String],
    input: &[u8],
  ) -> Result<Vec<u8>, CmdError>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
  pub fn new() -> Self {
    Self
  }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
  async fn run(&self, program: &str, args: &[String]) -> Result<(), CmdError> {
    let command_line = command_line(program, args);
    debug!(command = %command_line, "running");

    let status = Command::new(program)
      .args(args)
      .kill_on_drop(true)
      .status()
      .await
      .map_err(|source| CmdError::Spawn {
        command: command_line.clone(),
        source,
      })?;

    if !status.success() {
      return Err(CmdError::Failed {
        command: command_line,
        code: status.code(),
        stderr: String::new(),
      });
    }

    Ok(())
  }

  async fn output(&self, program: &str, args: &[String]) -> Result<Vec<u8>, CmdError> {
    let command_line = command_line(program, args);
    debug!(command = %command_line, "running (captured)");

    let output = Command::new(program)
      .args(args)
      .stdin(Stdio::null())
      .kill_on_drop(true)
      .output()
      .await
      .map_err(|source| CmdError::Spawn {
        command: command_line.clone(),
        source,
      })?;

    check_status(command_line, output)
  }

  async fn output_with_input(
    &self,
    program: &str,
    args: &[String],
    input: &[u8],
  ) -> Result<Vec<u8>, CmdError> {
    let command_line = command_line(program, args);
    debug!(command = %command_line, bytes = input.len(), "running (piped)");

    let mut child = Command::new(program)
      .args(args)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|source| CmdError::Spawn {
        command: command_line.clone(),
        source,
      })?;

    if let Some(mut stdin) = child.stdin.take() {
      stdin
        .write_all(input)
        .await
        .map_err(|source| CmdError::Stdin {
          command: command_line.clone(),
          source,
        })?;
    }

    let output = child
      .wait_with_output()
      .await
      .map_err(|source| CmdError::Spawn {
        command: command_line.clone(),
        source,
      })?;

    check_status(command_line, output)
  }
}

fn command_line(program: &str, args: &[String]) -> String {
  let mut line = program.to_string();
  for arg in args {
    line.push(' ');
    line.push_str(arg);
  }
  line
}

fn check_status(command: String, output: std::process::Output) -> Result<Vec<u8>, CmdError> {
  if !output.status.success() {
    return Err(CmdError::Failed {
      command,
      code: output.status.code(),
      stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    });
  }
  Ok(output.stdout)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  #[cfg(unix)]
  async fn output_captures_stdout() {
    let out = ProcessRunner::new()
      .output("/bin/echo", &["hello".to_string()])
      .await
      .unwrap();
    assert_eq!(String::from_utf8_lossy(&out).trim(), "hello");
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn output_with_input_pipes_stdin() {
    let out = ProcessRunner::new()
      .output_with_input("/bin/cat", &[], b"stream")
      .await
      .unwrap();
    assert_eq!(out, b"stream");
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn failed_command_reports_exit_code() {
    let err = ProcessRunner::new()
      .run("/bin/sh", &["-c".to_string(), "exit 3".to_string()])
      .await
      .unwrap_err();
    assert!(matches!(err, CmdError::Failed { code: Some(3), .. }));
  }

  #[tokio::test]
  async fn missing_program_is_a_spawn_error() {
    let err = ProcessRunner::new()
      .output("drydock-no-such-binary", &[])
      .await
      .unwrap_err();
    assert!(matches!(err, CmdError::Spawn { .. }));
  }
}
