//! External command execution for the listing tools
//!
//! Every listing tool runs through [`CommandRunner`] so the parsers and the
//! facade can be fed captured output in tests.

use crate::device::error::{DeviceError, DeviceResult};

/// Captured result of one finished process.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

pub trait CommandRunner {
    /// Run a command to completion and hand back its raw exit status.
    fn run(&self, program: &str, args: &[&str]) -> DeviceResult<CommandOutput>;

    /// Run a command and fail on a non-zero exit status.
    fn run_checked(&self, program: &str, args: &[&str]) -> DeviceResult<String> {
        let output = self.run(program, args)?;
        if !output.success() {
            return Err(DeviceError::CommandFailed {
                command: command_line(program, args),
                code: output.code.unwrap_or(-1),
                stderr: output.stderr.trim_end().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

pub fn command_line(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Runs commands on the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> DeviceResult<CommandOutput> {
        let command = command_line(program, args);
        tracing::debug!(%command, "executing command");

        let output = duct::cmd(program, args.iter().copied())
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|source| DeviceError::Spawn {
                command: command.clone(),
                source,
            })?;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        tracing::trace!(%command, code = ?result.code, stdout = %result.stdout, "command finished");
        Ok(result)
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Replays canned output keyed by the full command line.
    #[derive(Debug, Default)]
    pub struct FakeRunner {
        outputs: HashMap<String, CommandOutput>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(self, command: &str, stdout: &str) -> Self {
            self.with_status(command, 0, stdout, "")
        }

        pub fn with_failure(self, command: &str, code: i32, stderr: &str) -> Self {
            self.with_status(command, code, "", stderr)
        }

        pub fn with_status(mut self, command: &str, code: i32, stdout: &str, stderr: &str) -> Self {
            self.outputs.insert(
                command.to_string(),
                CommandOutput {
                    code: Some(code),
                    stdout: stdout.to_string(),
                    stderr: stderr.to_string(),
                },
            );
            self
        }

        pub fn calls(&self, command: &str) -> usize {
            self.calls.borrow().iter().filter(|c| *c == command).count()
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, args: &[&str]) -> DeviceResult<CommandOutput> {
            let command = command_line(program, args);
            self.calls.borrow_mut().push(command.clone());
            self.outputs
                .get(&command)
                .cloned()
                .ok_or_else(|| DeviceError::Spawn {
                    command,
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no canned output"),
                })
        }
    }
}
