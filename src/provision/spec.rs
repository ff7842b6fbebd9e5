//! Declared package requirements.

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// A single required package, optionally pinned to an exact version.
///
/// The version is compared verbatim against what the backend reports, so a
/// pin must be the full version string of the target backend (including
/// epoch/revision where the backend uses them).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    pub fn pinned(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
        }
    }

    /// Parse a spec from its command line form: `name` or `name=version`.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let input = input.trim();
        match input.split_once('=') {
            None => {
                if input.is_empty() {
                    return Err(ConfigError::InvalidSpec(input.to_string()));
                }
                Ok(Self::new(input))
            }
            Some((name, version)) => {
                if name.is_empty() || version.is_empty() {
                    return Err(ConfigError::InvalidSpec(input.to_string()));
                }
                Ok(Self::pinned(name, version))
            }
        }
    }

    /// Whether the given installed version satisfies this spec.
    pub fn satisfied_by(&self, installed: &str) -> bool {
        match &self.version {
            None => true,
            Some(pin) => pin == installed,
        }
    }
}

impl std::fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}={}", self.name, version),
            None => write!(f, "{}", self.name),
        }
    }
}

/// An ordered set of required packages, unique by name.
///
/// Construction is the validation point: an empty list or a repeated name is
/// a configuration error, so every `PackageSet` in circulation is valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSet {
    specs: Vec<PackageSpec>,
}

impl PackageSet {
    pub fn new(specs: Vec<PackageSpec>) -> Result<Self, ConfigError> {
        if specs.is_empty() {
            return Err(ConfigError::EmptySet);
        }

        let mut seen = std::collections::HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigError::DuplicateName(spec.name.clone()));
            }
        }

        Ok(Self { specs })
    }

    /// Build a set from command line arguments (`name` or `name=version`).
    pub fn parse(inputs: &[String]) -> Result<Self, ConfigError> {
        let specs = inputs
            .iter()
            .map(|s| PackageSpec::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(specs)
    }

    pub fn specs(&self) -> &[PackageSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PackageSpec> {
        self.specs.iter()
    }
}
