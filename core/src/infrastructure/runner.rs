//! Command runner abstraction for executing local programs.
//!
//! `CommandRunner` is the trait the SSH port uses to execute `ssh`/`scp`.
//! `ShellRunner` is the production implementation that spawns the program
//! directly. `MockRunner` is the test double that records calls and returns
//! preset responses.

use std::process::{Command, Stdio};
use std::sync::Mutex;

/// Captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn stdout(text: &str) -> Self {
        CommandOutput {
            stdout: text.to_string(),
            stderr: String::new(),
        }
    }
}

/// Trait for executing a program with an argument vector.
pub trait CommandRunner: Send {
    /// Run to completion, capturing stdout and stderr. A non-zero exit is an
    /// error carrying stderr.
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, String>;

    /// Run to completion with output streamed to this process's terminal.
    fn run_attached(&self, program: &str, args: &[String]) -> Result<(), String>;
}

/// Production runner that spawns the program with no shell in between.
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, String> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| format!("failed to execute {}: {}", program, e))?;
        let captured = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        if output.status.success() {
            Ok(captured)
        } else {
            Err(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                captured.stderr.trim()
            ))
        }
    }

    fn run_attached(&self, program: &str, args: &[String]) -> Result<(), String> {
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| format!("failed to execute {}: {}", program, e))?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("{} exited with {}", program, status))
        }
    }
}

/// Test-double runner that records command lines and returns pre-configured
/// responses in order. Once the responses run out every call succeeds with
/// empty output.
pub struct MockRunner {
    responses: Mutex<Vec<Result<CommandOutput, String>>>,
    commands: Mutex<Vec<String>>,
}

impl MockRunner {
    pub fn with_responses(responses: Vec<Result<CommandOutput, String>>) -> Self {
        let mut reversed = responses;
        reversed.reverse();
        MockRunner {
            responses: Mutex::new(reversed),
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    /// Every command line seen so far, program and arguments joined by spaces.
    pub fn executed_commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    fn next(&self, program: &str, args: &[String]) -> Result<CommandOutput, String> {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(line);
        }
        match self.responses.lock() {
            Ok(mut responses) => responses.pop().unwrap_or_else(|| Ok(CommandOutput::default())),
            Err(_) => Err("mock runner poisoned".to_string()),
        }
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, String> {
        self.next(program, args)
    }

    fn run_attached(&self, program: &str, args: &[String]) -> Result<(), String> {
        self.next(program, args).map(|_| ())
    }
}
