use thiserror::Error;

/// Configuration problems in the declared package set or manifest.
///
/// These are caller mistakes and never retryable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Package set is empty")]
    EmptySet,

    #[error("Duplicate package name: {0}")]
    DuplicateName(String),

    #[error("Invalid package spec '{0}'")]
    InvalidSpec(String),

    #[error("Unknown backend '{0}' (expected apt, pacman, dnf or zypper)")]
    UnknownBackend(String),

    #[error("{backend} does not support version pins (requested {package}={version})")]
    UnsupportedPin {
        backend: &'static str,
        package: String,
        version: String,
    },

    #[error("No supported package backend found for this system")]
    NoBackend,
}

/// Failures while reconciling the system against the package set.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Package not found: {0}")]
    UnknownPackage(String),

    #[error("{message}")]
    Backend { message: String, retryable: bool },
}

impl ProvisionError {
    /// A backend failure the caller may retry (lock contention, network).
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            retryable: true,
        }
    }

    /// A backend failure that will not go away on its own.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Backend { retryable, .. } => *retryable,
            Self::Config(_) | Self::UnknownPackage(_) => false,
        }
    }

    /// Classify a failed package manager invocation from its exit code and
    /// stderr. Lock contention and network failures are retryable; unknown
    /// package names are not.
    pub fn from_invocation(binary: &str, code: Option<i32>, stderr: &str) -> Self {
        let lower = stderr.to_lowercase();

        const LOCK_MARKERS: &[&str] = &[
            "could not get lock",
            "unable to lock database",
            "waiting for cache lock",
            "failed to init transaction",
            "lock file is held",
            "system management is locked",
        ];
        const NETWORK_MARKERS: &[&str] = &[
            "temporary failure resolving",
            "failed to fetch",
            "failed retrieving file",
            "connection timed out",
            "connection failed",
            "network is unreachable",
            "download error",
        ];
        const UNKNOWN_PACKAGE_MARKERS: &[&str] = &[
            "unable to locate package",
            "target not found",
            "no match for argument",
            "not found in package names",
            "no provider of",
        ];

        if LOCK_MARKERS.iter().any(|m| lower.contains(m))
            || NETWORK_MARKERS.iter().any(|m| lower.contains(m))
        {
            return Self::retryable(format!(
                "{} failed (exit {}): {}",
                binary,
                code.map(|c| c.to_string()).unwrap_or_else(|| "?".into()),
                stderr.trim()
            ));
        }

        if UNKNOWN_PACKAGE_MARKERS.iter().any(|m| lower.contains(m)) {
            return Self::UnknownPackage(stderr.trim().to_string());
        }

        Self::fatal(format!(
            "{} failed (exit {}): {}",
            binary,
            code.map(|c| c.to_string()).unwrap_or_else(|| "?".into()),
            stderr.trim()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_error_is_retryable() {
        let err = ProvisionError::from_invocation(
            "apt-get",
            Some(100),
            "E: Could not get lock /var/lib/dpkg/lock-frontend",
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_pacman_lock_is_retryable() {
        let err = ProvisionError::from_invocation(
            "pacman",
            Some(1),
            "error: failed to init transaction (unable to lock database)",
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_network_error_is_retryable() {
        let err = ProvisionError::from_invocation(
            "apt-get",
            Some(100),
            "E: Failed to fetch http://archive.ubuntu.com/... Connection timed out",
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_unknown_package_is_not_retryable() {
        let err = ProvisionError::from_invocation(
            "apt-get",
            Some(100),
            "E: Unable to locate package no-such-package",
        );
        assert!(!err.is_retryable());
        assert!(matches!(err, ProvisionError::UnknownPackage(_)));
    }

    #[test]
    fn test_pacman_unknown_target_is_not_retryable() {
        let err =
            ProvisionError::from_invocation("pacman", Some(1), "error: target not found: nope");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_other_failures_are_not_retryable() {
        let err = ProvisionError::from_invocation("apt-get", Some(1), "E: something exploded");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_config_error_is_not_retryable() {
        let err = ProvisionError::from(ConfigError::EmptySet);
        assert!(!err.is_retryable());
    }
}
