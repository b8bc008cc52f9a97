//! Test utilities for drydock-lib.
//!
//! [`FakeRunner`] substitutes subprocess execution in tests: expectations map
//! full command lines to canned stdout, a failure, or a created file (for
//! commands like `kpt live init` that materialize state on disk). Every
//! invocation is recorded so tests can assert order and count.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::exec::{CmdError, CommandRunner};

#[derive(Debug, Default)]
struct Expectation {
  output: Vec<u8>,
  stderr: Option<String>,
  creates: Option<PathBuf>,
}

/// A command runner that replays canned responses and records invocations.
///
/// Panics on a command it has no expectation for, which keeps test failures
/// close to the unexpected invocation.
#[derive(Debug, Default)]
pub struct FakeRunner {
  expectations: Mutex<HashMap<String, Expectation>>,
  calls: Mutex<Vec<String>>,
  inputs: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Expect `command`, replying with `output` on stdout.
  pub fn on(self, command: impl Into<String>, output: impl Into<Vec<u8>>) -> Self {
    self.expect(
      command.into(),
      Expectation {
        output: output.into(),
        ..Expectation::default()
      },
    )
  }

  /// Expect `command`, additionally creating `path` when it runs.
  pub fn on_create(
    self,
    command: impl Into<String>,
    output: impl Into<Vec<u8>>,
    path: impl Into<PathBuf>,
  ) -> Self {
    self.expect(
      command.into(),
      Expectation {
        output: output.into(),
        creates: Some(path.into()),
        ..Expectation::default()
      },
    )
  }

  /// Expect `command`, failing it with `stderr` and exit code 1.
  pub fn fail_on(self, command: impl Into<String>, stderr: impl Into<String>) -> Self {
    self.expect(
      command.into(),
      Expectation {
        stderr: Some(stderr.into()),
        ..Expectation::default()
      },
    )
  }

  /// Every command line run so far, in order.
  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }

  /// How many times `command` was run.
  pub fn call_count(&self, command: &str) -> usize {
    self.calls.lock().unwrap().iter().filter(|c| *c == command).count()
  }

  /// The bytes piped to `command`'s stdin, if it was run with input.
  pub fn input_for(&self, command: &str) -> Option<Vec<u8>> {
    self.inputs.lock().unwrap().get(command).cloned()
  }

  fn expect(self, command: String, expectation: Expectation) -> Self {
    self.expectations.lock().unwrap().insert(command, expectation);
    self
  }

  fn command_line(program: &str, args: &[String]) -> String {
    let mut command = program.to_string();
    for arg in args {
      command.push(' ');
      command.push_str(arg);
    }
    command
  }

  fn invoke(&self, program: &str, args: &[String]) -> Result<Vec<u8>, CmdError> {
    let command = Self::command_line(program, args);
    self.calls.lock().unwrap().push(command.clone());

    let expectations = self.expectations.lock().unwrap();
    let Some(expectation) = expectations.get(&command) else {
      panic!("unexpected command: {command}");
    };

    if let Some(stderr) = &expectation.stderr {
      return Err(CmdError::Failed {
        command,
        code: Some(1),
        stderr: stderr.clone(),
      });
    }

    if let Some(path) = &expectation.creates {
      if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
      }
      std::fs::write(path, "").unwrap();
    }

    Ok(expectation.output.clone())
  }
}

#[async_trait]
impl CommandRunner for FakeRunner {
  async fn run(&self, program: &str, args: &[String]) -> Result<(), CmdError> {
    self.invoke(program, args).map(|_| ())
  }

  async fn output(&self, program: &str, args: &[String]) -> Result<Vec<u8>, CmdError> {
    self.invoke(program, args)
  }

  async fn output_with_input(
    &self,
    program: &str,
    args: &[String],
    input: &[u8],
  ) -> Result<Vec<u8>, CmdError> {
    let command = Self::command_line(program, args);
    self.inputs.lock().unwrap().insert(command, input.to_vec());
    self.invoke(program, args)
  }
}
