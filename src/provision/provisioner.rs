//! The provisioner core: reconcile a declared package set against the
//! system.

use crate::output::{Level, emit};

use super::manager::PackageManager;
use super::plan::{AppliedSet, InstallPlan};
use super::spec::PackageSet;

use super::error::ProvisionError;

/// Reconciles desired vs. actual installed packages.
///
/// The provisioner itself holds no state between runs: every invocation
/// queries the system fresh, computes the delta and applies it in a single
/// backend transaction. It performs no retries; callers that want a retry
/// policy wrap [`Provisioner::apply`].
pub struct Provisioner<M: PackageManager> {
    manager: M,
}

impl<M: PackageManager> Provisioner<M> {
    pub fn new(manager: M) -> Self {
        Self { manager }
    }

    /// Compute the install plan for the given set without applying it.
    pub fn plan(&self, packages: &PackageSet) -> Result<InstallPlan, ProvisionError> {
        let state = self.manager.query(packages.specs())?;
        Ok(InstallPlan::compute(packages, &state))
    }

    /// Reconcile the system against the package set.
    ///
    /// Queries current state, computes the delta, and installs it in one
    /// non-interactive transaction. Returns the packages that were handed to
    /// the backend; an empty set means the system was already satisfied.
    pub fn apply(&self, packages: &PackageSet) -> Result<AppliedSet, ProvisionError> {
        let plan = self.plan(packages)?;

        if plan.is_empty() {
            emit(
                Level::Debug,
                "provision.apply.noop",
                "All packages already installed",
                None,
            );
            return Ok(AppliedSet::empty());
        }

        self.manager.install(plan.packages())?;
        Ok(AppliedSet::from_plan(plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::backend::InstalledState;
    use crate::provision::spec::PackageSpec;
    use std::cell::RefCell;

    /// In-memory package manager: query reflects previous installs.
    #[derive(Default)]
    struct FakeManager {
        installed: RefCell<InstalledState>,
        install_error: Option<fn() -> ProvisionError>,
    }

    impl FakeManager {
        fn with_installed(packages: &[(&str, &str)]) -> Self {
            let installed = packages
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect();
            Self {
                installed: RefCell::new(installed),
                install_error: None,
            }
        }

        fn failing_with(error: fn() -> ProvisionError) -> Self {
            Self {
                installed: RefCell::new(InstalledState::new()),
                install_error: Some(error),
            }
        }
    }

    impl PackageManager for FakeManager {
        fn query(&self, specs: &[PackageSpec]) -> Result<InstalledState, ProvisionError> {
            let installed = self.installed.borrow();
            Ok(specs
                .iter()
                .filter_map(|s| {
                    installed
                        .get(&s.name)
                        .map(|v| (s.name.clone(), v.clone()))
                })
                .collect())
        }

        fn install(&self, specs: &[PackageSpec]) -> Result<(), ProvisionError> {
            if let Some(error) = self.install_error {
                return Err(error());
            }
            let mut installed = self.installed.borrow_mut();
            for spec in specs {
                let version = spec.version.clone().unwrap_or_else(|| "1.0-1".to_string());
                installed.insert(spec.name.clone(), version);
            }
            Ok(())
        }
    }

    fn set(names: &[&str]) -> PackageSet {
        PackageSet::new(names.iter().map(|n| PackageSpec::new(*n)).collect()).unwrap()
    }

    #[test]
    fn test_fresh_system_installs_everything() {
        let provisioner = Provisioner::new(FakeManager::default());
        let packages = set(&["git", "pylint"]);

        let applied = provisioner.apply(&packages).unwrap();
        assert_eq!(applied.packages(), packages.specs());
    }

    #[test]
    fn test_already_installed_applies_nothing() {
        let manager = FakeManager::with_installed(&[("git", "2.43.0-1")]);
        let provisioner = Provisioner::new(manager);
        let packages = set(&["git"]);

        let applied = provisioner.apply(&packages).unwrap();
        assert!(applied.is_empty());
    }

    #[test]
    fn test_apply_is_idempotent() {
        let provisioner = Provisioner::new(FakeManager::default());
        let packages = set(&["git", "pylint", "curl"]);

        let first = provisioner.apply(&packages).unwrap();
        assert_eq!(first.len(), 3);

        // Second run: everything satisfied, plan is empty
        let second_plan = provisioner.plan(&packages).unwrap();
        assert!(second_plan.is_empty());

        let second = provisioner.apply(&packages).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn test_partial_state_installs_the_delta() {
        let manager = FakeManager::with_installed(&[("pylint", "2.17.4-1")]);
        let provisioner = Provisioner::new(manager);
        let packages = set(&["git", "pylint"]);

        let applied = provisioner.apply(&packages).unwrap();
        let names: Vec<_> = applied.packages().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["git"]);
    }

    #[test]
    fn test_pin_mismatch_reinstalls() {
        let manager = FakeManager::with_installed(&[("pylint", "3.0.0-1")]);
        let provisioner = Provisioner::new(manager);
        let packages = PackageSet::new(vec![PackageSpec::pinned("pylint", "2.17.4-1")]).unwrap();

        let applied = provisioner.apply(&packages).unwrap();
        assert_eq!(applied.len(), 1);

        // Fake now has the pinned version, so the next run is a no-op
        let second = provisioner.apply(&packages).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn test_lock_error_surfaces_as_retryable() {
        let manager = FakeManager::failing_with(|| {
            ProvisionError::from_invocation(
                "apt-get",
                Some(100),
                "E: Could not get lock /var/lib/dpkg/lock-frontend",
            )
        });
        let provisioner = Provisioner::new(manager);
        let packages = set(&["git"]);

        let err = provisioner.apply(&packages).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_unknown_package_surfaces_as_fatal() {
        let manager = FakeManager::failing_with(|| {
            ProvisionError::from_invocation(
                "apt-get",
                Some(100),
                "E: Unable to locate package no-such-package",
            )
        });
        let provisioner = Provisioner::new(manager);
        let packages = set(&["no-such-package"]);

        let err = provisioner.apply(&packages).unwrap_err();
        assert!(!err.is_retryable());
    }
}
