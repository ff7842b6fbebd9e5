//! Package backend definitions - SINGLE SOURCE OF TRUTH for the supported
//! package managers and their argument protocols.

use std::collections::HashMap;

use crate::common::distro::OperatingSystem;

use super::error::ConfigError;
use super::spec::PackageSpec;

/// Installed package state as reported by a backend query: name to version.
pub type InstalledState = HashMap<String, String>;

/// A native system package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// APT - Debian/Ubuntu family
    Apt,
    /// Pacman - Arch Linux family
    Pacman,
    /// DNF - Fedora/RHEL family
    Dnf,
    /// Zypper - OpenSUSE
    Zypper,
}

impl Backend {
    /// Parse a backend name as used in manifests and on the command line.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.to_lowercase().as_str() {
            "apt" | "apt-get" => Ok(Self::Apt),
            "pacman" => Ok(Self::Pacman),
            "dnf" => Ok(Self::Dnf),
            "zypper" => Ok(Self::Zypper),
            _ => Err(ConfigError::UnknownBackend(name.to_string())),
        }
    }

    /// Pick the native backend for the current system.
    pub fn detect() -> Result<Self, ConfigError> {
        OperatingSystem::detect()
            .native_backend()
            .ok_or(ConfigError::NoBackend)
    }

    /// The package manager binary this backend drives.
    pub fn binary(&self) -> &'static str {
        match self {
            Self::Apt => "apt-get",
            Self::Pacman => "pacman",
            Self::Dnf => "dnf",
            Self::Zypper => "zypper",
        }
    }

    /// Check if this backend's binary is present on the current system.
    pub fn is_available(&self) -> bool {
        which::which(self.binary()).is_ok()
    }

    /// Get a human-readable name for this backend.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Apt => "APT",
            Self::Pacman => "Pacman",
            Self::Dnf => "DNF",
            Self::Zypper => "Zypper",
        }
    }

    /// Encode one spec the way this backend's install command expects it.
    ///
    /// Pacman has no syntax for installing a specific version from the sync
    /// database, so pinned specs are rejected up front.
    pub fn encode_spec(&self, spec: &PackageSpec) -> Result<String, ConfigError> {
        match &spec.version {
            None => Ok(spec.name.clone()),
            Some(version) => match self {
                Self::Apt | Self::Zypper => Ok(format!("{}={}", spec.name, version)),
                Self::Dnf => Ok(format!("{}-{}", spec.name, version)),
                Self::Pacman => Err(ConfigError::UnsupportedPin {
                    backend: self.display_name(),
                    package: spec.name.clone(),
                    version: version.clone(),
                }),
            },
        }
    }

    /// Build the full non-interactive install argument list for one
    /// transaction over the given specs.
    pub fn install_args(&self, specs: &[PackageSpec]) -> Result<Vec<String>, ConfigError> {
        let base: &[&str] = match self {
            Self::Apt => &["install", "-y"],
            Self::Pacman => &["-S", "--noconfirm", "--needed"],
            Self::Dnf => &["install", "-y"],
            Self::Zypper => &["--non-interactive", "install"],
        };

        let mut args: Vec<String> = base.iter().map(|s| s.to_string()).collect();
        for spec in specs {
            args.push(self.encode_spec(spec)?);
        }
        Ok(args)
    }

    /// Build the query invocation reporting installed versions for the given
    /// specs. The command may exit non-zero when some packages are missing;
    /// stdout still lists the installed ones, one `name version` per line.
    pub fn query_invocation(&self, specs: &[PackageSpec]) -> (&'static str, Vec<String>) {
        match self {
            Self::Apt => {
                let mut args = vec![
                    "-W".to_string(),
                    "--showformat=${Package} ${Version}\\n".to_string(),
                ];
                args.extend(specs.iter().map(|s| s.name.clone()));
                ("dpkg-query", args)
            }
            Self::Pacman => {
                let mut args = vec!["-Q".to_string()];
                args.extend(specs.iter().map(|s| s.name.clone()));
                ("pacman", args)
            }
            // Both rpm families answer installed-version queries via rpm
            Self::Dnf | Self::Zypper => {
                let mut args = vec![
                    "-q".to_string(),
                    "--queryformat".to_string(),
                    "%{NAME} %{VERSION}-%{RELEASE}\\n".to_string(),
                ];
                args.extend(specs.iter().map(|s| s.name.clone()));
                ("rpm", args)
            }
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Parse query output into installed state.
///
/// Keeps only lines of the form `name version` where the name was actually
/// requested; diagnostic lines like rpm's `package foo is not installed`
/// fall out naturally.
pub fn parse_query_output(stdout: &str, specs: &[PackageSpec]) -> InstalledState {
    let requested: std::collections::HashSet<&str> =
        specs.iter().map(|s| s.name.as_str()).collect();

    let mut state = InstalledState::new();
    for line in stdout.lines() {
        let mut fields = line.split_whitespace();
        let (Some(name), Some(version), None) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        if requested.contains(name) {
            state.insert(name.to_string(), version.to_string());
        }
    }
    state
}
