//! Package manager adapter.
//!
//! [`PackageManager`] is the narrow seam between plan computation and the
//! system: one query operation, one install operation. [`SystemManager`] is
//! the production implementation driving a [`Backend`] binary as a
//! subprocess; tests substitute an in-memory fake.

use std::process::Command;

use duct::cmd;
use sudo::RunningAs;

use crate::output::{Level, emit};

use super::backend::{Backend, InstalledState, parse_query_output};
use super::error::ProvisionError;
use super::executor::CommandExecutor;
use super::spec::PackageSpec;

/// Narrow capability abstraction over a system package manager.
pub trait PackageManager {
    /// Report which of the given packages are installed, and at what version.
    fn query(&self, specs: &[PackageSpec]) -> Result<InstalledState, ProvisionError>;

    /// Install all given packages in one non-interactive transaction.
    fn install(&self, specs: &[PackageSpec]) -> Result<(), ProvisionError>;
}

/// Drives a native package backend through subprocess invocations.
pub struct SystemManager {
    backend: Backend,
    executor: CommandExecutor,
    noninteractive: bool,
}

impl SystemManager {
    pub fn new(backend: Backend, executor: CommandExecutor, noninteractive: bool) -> Self {
        Self {
            backend,
            executor,
            noninteractive,
        }
    }
}

impl PackageManager for SystemManager {
    fn query(&self, specs: &[PackageSpec]) -> Result<InstalledState, ProvisionError> {
        let (program, args) = self.backend.query_invocation(specs);

        // The query legitimately exits non-zero when some packages are not
        // installed; stdout still lists the installed ones.
        let output = cmd(program, &args)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|e| {
                ProvisionError::fatal(format!("Failed to run {} query: {}", program, e))
            })?;

        if !output.status.success() {
            emit(
                Level::Debug,
                "manager.query.partial",
                &format!("{} query exited non-zero (packages missing)", program),
                None,
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_query_output(&stdout, specs))
    }

    fn install(&self, specs: &[PackageSpec]) -> Result<(), ProvisionError> {
        let apt_noninteractive = self.noninteractive && self.backend == Backend::Apt;
        let mut command = build_install_command(
            self.backend,
            specs,
            apt_noninteractive,
            matches!(sudo::check(), RunningAs::Root),
        )?;

        match self.executor.run_capture(&mut command)? {
            // Dry run: nothing was executed
            None => Ok(()),
            Some(output) if output.status.success() => {
                emit(
                    Level::Debug,
                    "manager.install.output",
                    String::from_utf8_lossy(&output.stdout).trim(),
                    None,
                );
                Ok(())
            }
            Some(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(ProvisionError::from_invocation(
                    self.backend.binary(),
                    output.status.code(),
                    &stderr,
                ))
            }
        }
    }
}

/// Build the install command for one transaction.
///
/// Without root, the invocation is prefixed with `sudo`; the actual
/// escalation mechanism stays outside the provisioner. Non-interactive mode
/// for APT travels as an explicit `DEBIAN_FRONTEND` assignment on the child
/// invocation, never as process-global state.
fn build_install_command(
    backend: Backend,
    specs: &[PackageSpec],
    apt_noninteractive: bool,
    as_root: bool,
) -> Result<Command, ProvisionError> {
    let args = backend.install_args(specs)?;
    let binary = backend.binary();

    let command = if as_root {
        let mut c = Command::new(binary);
        if apt_noninteractive {
            c.env("DEBIAN_FRONTEND", "noninteractive");
        }
        c.args(&args);
        c
    } else {
        // sudo resets the environment, so the frontend selection has to ride
        // along as an assignment argument
        let mut c = Command::new("sudo");
        if apt_noninteractive {
            c.arg("DEBIAN_FRONTEND=noninteractive");
        }
        c.arg(binary);
        c.args(&args);
        c
    };

    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered_args(command: &Command) -> Vec<String> {
        command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_install_command_without_root_uses_sudo() {
        let specs = vec![PackageSpec::new("git")];
        let command = build_install_command(Backend::Pacman, &specs, false, false).unwrap();

        assert_eq!(command.get_program(), "sudo");
        assert_eq!(
            rendered_args(&command),
            ["pacman", "-S", "--noconfirm", "--needed", "git"]
        );
    }

    #[test]
    fn test_install_command_as_root_runs_directly() {
        let specs = vec![PackageSpec::new("git")];
        let command = build_install_command(Backend::Pacman, &specs, false, true).unwrap();

        assert_eq!(command.get_program(), "pacman");
        assert_eq!(
            rendered_args(&command),
            ["-S", "--noconfirm", "--needed", "git"]
        );
    }

    #[test]
    fn test_apt_noninteractive_env_as_root() {
        let specs = vec![PackageSpec::new("git")];
        let command = build_install_command(Backend::Apt, &specs, true, true).unwrap();

        assert_eq!(command.get_program(), "apt-get");
        let has_frontend = command.get_envs().any(|(k, v)| {
            k == "DEBIAN_FRONTEND" && v.map(|v| v == "noninteractive").unwrap_or(false)
        });
        assert!(has_frontend);
    }

    #[test]
    fn test_apt_noninteractive_rides_sudo_argv() {
        let specs = vec![PackageSpec::new("git")];
        let command = build_install_command(Backend::Apt, &specs, true, false).unwrap();

        assert_eq!(command.get_program(), "sudo");
        assert_eq!(
            rendered_args(&command),
            [
                "DEBIAN_FRONTEND=noninteractive",
                "apt-get",
                "install",
                "-y",
                "git"
            ]
        );
    }

    #[test]
    fn test_pin_rejection_propagates() {
        let specs = vec![PackageSpec::pinned("git", "2.43.0")];
        let result = build_install_command(Backend::Pacman, &specs, false, false);
        assert!(result.is_err());
    }
}
