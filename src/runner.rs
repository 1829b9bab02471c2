use anyhow::{Context, Result};
use declarative::{CommandOutput, CommandRunner, render_command};
use std::process::{Command, Stdio};

/// Runs commands on the local machine, capturing their output
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput> {
        let line = render_command(cmd, args);
        log::debug!("Running: {line}");
        let output = Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to execute: {line}"))?;
        Ok(output.into())
    }
}

/// Check if a command exists
pub fn command_exists(runner: &dyn CommandRunner, cmd: &str) -> bool {
    runner.run_status("which", &[cmd]).unwrap_or(false)
}
