use anyhow::Result;
use std::process::Command;

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Run the built binary inside the test environment, logging into it.
pub fn run_sd2usb_command(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    let log_file = env.log_file();
    let output = Command::new(env!("CARGO_BIN_EXE_sd2usb"))
        .arg("-l")
        .arg(&log_file)
        .args(args)
        .current_dir(env.path())
        .output()?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

pub fn running_as_root() -> bool {
    matches!(sudo::check(), sudo::RunningAs::Root)
}
