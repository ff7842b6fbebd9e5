use std::process::{Command, Output, Stdio};

use crate::output::{Level, emit};

use super::error::ProvisionError;

/// Runs package manager commands, with dry-run support.
///
/// Output is captured rather than inherited so that failures can be
/// classified from stderr. Callers inspect the exit status themselves; a
/// non-zero exit is not automatically an error (package queries legitimately
/// exit non-zero when some packages are missing).
pub struct CommandExecutor {
    pub dry_run: bool,
}

impl CommandExecutor {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Run the command and capture its output. Returns `None` in dry-run
    /// mode after printing what would have been executed.
    pub fn run_capture(&self, command: &mut Command) -> Result<Option<Output>, ProvisionError> {
        if self.dry_run {
            self.print_dry_run(command);
            return Ok(None);
        }

        emit(
            Level::Debug,
            "exec.run",
            &format!("Running: {}", render_command(command)),
            None,
        );

        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let output = command.output().map_err(|e| {
            ProvisionError::fatal(format!("Failed to execute {}: {}", render_command(command), e))
        })?;

        Ok(Some(output))
    }

    fn print_dry_run(&self, command: &Command) {
        emit(
            Level::Info,
            "exec.dry_run",
            &format!("[DRY RUN] {}", render_command(command)),
            None,
        );
    }
}

fn render_command(command: &Command) -> String {
    let program = command.get_program().to_string_lossy();
    let args: Vec<_> = command.get_args().map(|a| a.to_string_lossy()).collect();
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}
