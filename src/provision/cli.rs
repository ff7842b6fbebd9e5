use anyhow::Result;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use serde_json::json;

use crate::common::distro::OperatingSystem;
use crate::output::{Level, OutputFormat, emit, get_output_format};

use super::backend::Backend;
use super::executor::CommandExecutor;
use super::manager::{PackageManager, SystemManager};
use super::manifest::{Manifest, NONINTERACTIVE_ENV};
use super::provisioner::Provisioner;
use super::spec::{PackageSet, PackageSpec};

/// Everything a provisioner run needs, resolved from the command line and
/// manifest.
struct RunContext {
    packages: PackageSet,
    backend: Backend,
    noninteractive: bool,
}

/// Packages given on the command line take precedence over the manifest;
/// with none, the manifest (explicit path or default location) is loaded.
fn load_context(manifest_arg: Option<&str>, packages: &[String]) -> Result<RunContext> {
    if !packages.is_empty() {
        return Ok(RunContext {
            packages: PackageSet::parse(packages)?,
            backend: Backend::detect()?,
            noninteractive: std::env::var(NONINTERACTIVE_ENV)
                .map(|v| v != "0")
                .unwrap_or(true),
        });
    }

    let path = Manifest::resolve_path(manifest_arg)?;
    let manifest = Manifest::load(&path)?;
    Ok(RunContext {
        packages: manifest.package_set()?,
        backend: manifest.backend()?,
        noninteractive: manifest.noninteractive(),
    })
}

fn spec_names(specs: &[PackageSpec]) -> Vec<String> {
    specs.iter().map(|s| s.to_string()).collect()
}

pub fn handle_apply(
    manifest_arg: Option<String>,
    packages: Vec<String>,
    dry_run: bool,
) -> Result<()> {
    let ctx = load_context(manifest_arg.as_deref(), &packages)?;

    emit(
        Level::Info,
        "provision.apply.start",
        &format!(
            "Reconciling {} package{} via {}...",
            ctx.packages.len(),
            if ctx.packages.len() == 1 { "" } else { "s" },
            ctx.backend
        ),
        None,
    );

    let executor = CommandExecutor::new(dry_run);
    let manager = SystemManager::new(ctx.backend, executor, ctx.noninteractive);
    let provisioner = Provisioner::new(manager);

    let applied = provisioner.apply(&ctx.packages)?;

    if applied.is_empty() {
        emit(
            Level::Success,
            "provision.apply.satisfied",
            "All packages already installed.",
            None,
        );
    } else {
        let names = spec_names(applied.packages());
        let verb = if dry_run { "Would install" } else { "Installed" };
        emit(
            Level::Success,
            "provision.apply.done",
            &format!("{} {}: {}", verb, applied.len(), names.join(", ")),
            Some(json!({ "packages": names, "dry_run": dry_run })),
        );
    }

    Ok(())
}

pub fn handle_plan(manifest_arg: Option<String>, packages: Vec<String>) -> Result<()> {
    let ctx = load_context(manifest_arg.as_deref(), &packages)?;

    let executor = CommandExecutor::new(false);
    let manager = SystemManager::new(ctx.backend, executor, ctx.noninteractive);
    let provisioner = Provisioner::new(manager);

    let plan = provisioner.plan(&ctx.packages)?;

    if plan.is_empty() {
        emit(
            Level::Success,
            "provision.plan.empty",
            "Nothing to install.",
            Some(json!({ "packages": [] })),
        );
        return Ok(());
    }

    let names = spec_names(plan.packages());
    emit(
        Level::Info,
        "provision.plan",
        &format!(
            "{} package{} to install via {}:",
            plan.len(),
            if plan.len() == 1 { "" } else { "s" },
            ctx.backend
        ),
        Some(json!({ "packages": names })),
    );
    if get_output_format() == OutputFormat::Text {
        for name in &names {
            println!("  {}", name);
        }
    }

    Ok(())
}

pub fn handle_status(manifest_arg: Option<String>) -> Result<()> {
    let ctx = load_context(manifest_arg.as_deref(), &[])?;

    let executor = CommandExecutor::new(false);
    let manager = SystemManager::new(ctx.backend, executor, ctx.noninteractive);
    let state = manager.query(ctx.packages.specs())?;

    if get_output_format() == OutputFormat::Json {
        let rows: Vec<_> = ctx
            .packages
            .iter()
            .map(|spec| {
                json!({
                    "name": spec.name,
                    "required": spec.version,
                    "installed": state.get(&spec.name),
                    "satisfied": state
                        .get(&spec.name)
                        .map(|v| spec.satisfied_by(v))
                        .unwrap_or(false),
                })
            })
            .collect();
        emit(
            Level::Info,
            "provision.status",
            "package status",
            Some(json!({ "backend": ctx.backend.display_name(), "packages": rows })),
        );
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Package", "Required", "Installed", "Status"]);

    for spec in ctx.packages.iter() {
        let required = spec.version.clone().unwrap_or_else(|| "any".to_string());
        let (installed, status) = match state.get(&spec.name) {
            None => ("-".to_string(), "missing"),
            Some(version) if spec.satisfied_by(version) => (version.clone(), "ok"),
            Some(version) => (version.clone(), "version mismatch"),
        };
        table.add_row(vec![
            spec.name.as_str(),
            required.as_str(),
            installed.as_str(),
            status,
        ]);
    }

    println!("{table}");
    Ok(())
}

pub fn handle_detect() -> Result<()> {
    let os = OperatingSystem::detect();

    match os.native_backend() {
        Some(backend) => {
            let available = backend.is_available();
            emit(
                Level::Info,
                "provision.detect",
                &format!(
                    "{} detected, native backend {} ({})",
                    os,
                    backend,
                    if available {
                        "available"
                    } else {
                        "binary not found"
                    }
                ),
                Some(json!({
                    "os": os.name(),
                    "backend": backend.display_name(),
                    "available": available,
                })),
            );
        }
        None => {
            emit(
                Level::Warn,
                "provision.detect.unsupported",
                &format!("{} detected, no supported package backend", os),
                Some(json!({ "os": os.name(), "backend": null })),
            );
        }
    }

    Ok(())
}
