//! Install plan computation.

use super::backend::InstalledState;
use super::spec::{PackageSet, PackageSpec};

/// The delta between a declared package set and the queried system state.
///
/// Ephemeral: computed fresh for every run and discarded afterwards. Always
/// a subset of the package set it was computed from; applying the plan and
/// recomputing yields an empty plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    missing: Vec<PackageSpec>,
}

impl InstallPlan {
    /// Select the specs not satisfied by the installed state: absent
    /// packages, and pinned packages installed at a different version.
    pub fn compute(set: &PackageSet, state: &InstalledState) -> Self {
        let missing = set
            .iter()
            .filter(|spec| match state.get(&spec.name) {
                None => true,
                Some(installed) => !spec.satisfied_by(installed),
            })
            .cloned()
            .collect();

        Self { missing }
    }

    pub fn packages(&self) -> &[PackageSpec] {
        &self.missing
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn len(&self) -> usize {
        self.missing.len()
    }

    pub fn into_packages(self) -> Vec<PackageSpec> {
        self.missing
    }
}

/// The packages actually handed to the backend in one run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppliedSet {
    packages: Vec<PackageSpec>,
}

impl AppliedSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_plan(plan: InstallPlan) -> Self {
        Self {
            packages: plan.into_packages(),
        }
    }

    pub fn packages(&self) -> &[PackageSpec] {
        &self.packages
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }
}
