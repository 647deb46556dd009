//! Running the external tools

use std::io;
use std::process::Command;

use crate::error::{PymcuprogError, Result};

/// Captured result of a tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` if killed by a signal
    pub code: Option<i32>,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl ToolOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: &str) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    /// Whether the tool exited with status 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Last non-empty line of stderr, falling back to stdout
    pub fn last_message(&self) -> &str {
        [&self.stderr, &self.stdout]
            .into_iter()
            .find_map(|s| s.lines().rev().map(str::trim).find(|l| !l.is_empty()))
            .unwrap_or("no output")
    }
}

/// Executes external programs
///
/// The backend never spawns processes directly so tests can substitute
/// scripted output.
pub trait CommandRunner {
    /// Run `program` with `args` and wait for it to finish
    fn run(&mut self, program: &str, args: &[String]) -> Result<ToolOutput>;
}

/// Runs programs with [`std::process::Command`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, program: &str, args: &[String]) -> Result<ToolOutput> {
        log::debug!("Running: {} {}", program, args.join(" "));

        let output = Command::new(program).args(args).output().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                PymcuprogError::ToolNotFound(program.to_string())
            } else {
                PymcuprogError::Spawn {
                    program: program.to_string(),
                    source: e,
                }
            }
        })?;

        let result = ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        log::trace!("{} stdout:\n{}", program, result.stdout);
        if !result.stderr.is_empty() {
            log::trace!("{} stderr:\n{}", program, result.stderr);
        }
        Ok(result)
    }
}

/// Run a tool and turn a non-zero exit into [`PymcuprogError::ToolFailed`]
pub(crate) fn run_checked(
    runner: &mut dyn CommandRunner,
    program: &str,
    args: &[String],
) -> Result<ToolOutput> {
    let output = runner.run(program, args)?;
    if output.success() {
        return Ok(output);
    }
    Err(PymcuprogError::ToolFailed {
        command: format!("{} {}", program, args.first().map(String::as_str).unwrap_or("")),
        status: match output.code {
            Some(code) => format!("exit code {}", code),
            None => "terminated".to_string(),
        },
        message: output.last_message().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_message_prefers_stderr() {
        let out = ToolOutput {
            code: Some(1),
            stdout: "Connecting...\n".into(),
            stderr: "pymcuprog.pymcuprog_errors.PymcuprogToolConnectionError\nUnable to connect to USB device\n\n".into(),
        };
        assert!(!out.success());
        assert_eq!(out.last_message(), "Unable to connect to USB device");

        let out = ToolOutput {
            code: Some(1),
            stdout: "Done.\n".into(),
            stderr: String::new(),
        };
        assert_eq!(out.last_message(), "Done.");
    }

    #[test]
    fn test_missing_program() {
        let err = SystemRunner
            .run("kitcommander-no-such-tool", &[])
            .unwrap_err();
        assert!(matches!(err, PymcuprogError::ToolNotFound(_)));
    }
}
