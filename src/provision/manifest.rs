//! TOML manifest declaring the package set and provisioner settings.
//!
//! ```toml
//! [settings]
//! backend = "apt"
//! noninteractive = true
//!
//! [[packages]]
//! name = "git"
//!
//! [[packages]]
//! name = "pylint"
//! version = "2.17.4-1"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::backend::Backend;
use super::error::ConfigError;
use super::spec::{PackageSet, PackageSpec};

/// Environment variable overriding the manifest's non-interactive setting.
pub const NONINTERACTIVE_ENV: &str = "SYSPROV_NONINTERACTIVE";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub packages: Vec<PackageSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Backend override; defaults to the native backend of the detected OS.
    pub backend: Option<String>,
    /// Suppress package manager prompts. Defaults to true.
    #[serde(default = "default_noninteractive")]
    pub noninteractive: bool,
}

fn default_noninteractive() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: None,
            noninteractive: default_noninteractive(),
        }
    }
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading manifest from {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("parsing manifest {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(contents).context("parsing manifest")?;
        Ok(manifest)
    }

    /// Validate the declared packages into a PackageSet.
    pub fn package_set(&self) -> Result<PackageSet, ConfigError> {
        PackageSet::new(self.packages.clone())
    }

    /// Resolve the backend: manifest override if present, otherwise the
    /// native backend for the detected OS.
    pub fn backend(&self) -> Result<Backend, ConfigError> {
        match &self.settings.backend {
            Some(name) => Backend::from_name(name),
            None => Backend::detect(),
        }
    }

    /// Non-interactive mode: the manifest setting, overridden by the
    /// `SYSPROV_NONINTERACTIVE` environment variable (`0` or `1`).
    pub fn noninteractive(&self) -> bool {
        match std::env::var(NONINTERACTIVE_ENV) {
            Ok(value) => value != "0",
            Err(_) => self.settings.noninteractive,
        }
    }

    /// Default manifest location: `<config dir>/sysprov/packages.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("could not determine config directory")?;
        Ok(config_dir.join("sysprov").join("packages.toml"))
    }

    /// Resolve a manifest path argument: expand `~`, fall back to the
    /// default location when no argument was given.
    pub fn resolve_path(arg: Option<&str>) -> Result<PathBuf> {
        match arg {
            Some(path) => Ok(PathBuf::from(shellexpand::tilde(path).to_string())),
            None => Self::default_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_full_manifest() {
        let manifest = Manifest::parse(
            r#"
[settings]
backend = "apt"
noninteractive = false

[[packages]]
name = "git"

[[packages]]
name = "pylint"
version = "2.17.4-1"
"#,
        )
        .unwrap();

        assert_eq!(manifest.settings.backend.as_deref(), Some("apt"));
        assert!(!manifest.settings.noninteractive);
        assert_eq!(manifest.packages.len(), 2);
        assert_eq!(
            manifest.packages[1],
            PackageSpec::pinned("pylint", "2.17.4-1")
        );
    }

    #[test]
    fn test_settings_default_to_noninteractive() {
        let manifest = Manifest::parse(
            r#"
[[packages]]
name = "git"
"#,
        )
        .unwrap();

        assert!(manifest.settings.noninteractive);
        assert!(manifest.settings.backend.is_none());
    }

    #[test]
    fn test_empty_manifest_fails_validation() {
        let manifest = Manifest::parse("").unwrap();
        assert_eq!(manifest.package_set(), Err(ConfigError::EmptySet));
    }

    #[test]
    fn test_duplicate_packages_fail_validation() {
        let manifest = Manifest::parse(
            r#"
[[packages]]
name = "git"

[[packages]]
name = "git"
"#,
        )
        .unwrap();

        assert_eq!(
            manifest.package_set(),
            Err(ConfigError::DuplicateName("git".to_string()))
        );
    }

    #[test]
    fn test_unknown_backend_name() {
        let manifest = Manifest::parse(
            r#"
[settings]
backend = "brew"

[[packages]]
name = "git"
"#,
        )
        .unwrap();

        assert!(matches!(
            manifest.backend(),
            Err(ConfigError::UnknownBackend(_))
        ));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result = Manifest::parse(
            r#"
[settings]
backnd = "apt"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_noninteractive_env_override() {
        let manifest = Manifest::parse(
            r#"
[[packages]]
name = "git"
"#,
        )
        .unwrap();

        unsafe { std::env::set_var(NONINTERACTIVE_ENV, "0") };
        assert!(!manifest.noninteractive());

        unsafe { std::env::set_var(NONINTERACTIVE_ENV, "1") };
        assert!(manifest.noninteractive());

        unsafe { std::env::remove_var(NONINTERACTIVE_ENV) };
        assert!(manifest.noninteractive());
    }

    #[test]
    fn test_resolve_path_expands_tilde() {
        let path = Manifest::resolve_path(Some("~/packages.toml")).unwrap();
        assert!(!path.to_string_lossy().contains('~'));
    }
}
