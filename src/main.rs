mod common;
mod output;
mod provision;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use output::{Level, OutputFormat, emit};
use provision::ProvisionError;

/// Declarative system package provisioner
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit machine-readable JSON events
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile the system against the declared package set
    Apply {
        /// Path to the package manifest (defaults to the config directory)
        manifest: Option<String>,
        /// Provision these packages instead of reading a manifest
        #[arg(short, long = "package", value_name = "NAME[=VERSION]")]
        packages: Vec<String>,
        /// Print the install commands without executing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show what apply would install, without applying
    Plan {
        /// Path to the package manifest (defaults to the config directory)
        manifest: Option<String>,
        /// Plan for these packages instead of reading a manifest
        #[arg(short, long = "package", value_name = "NAME[=VERSION]")]
        packages: Vec<String>,
    },

    /// Show desired vs. installed state for every declared package
    Status {
        /// Path to the package manifest (defaults to the config directory)
        manifest: Option<String>,
    },

    /// Report the detected operating system and native backend
    Detect,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    output::init(format, !cli.no_color);
    output::set_debug_mode(cli.debug);

    let result = match cli.command {
        Commands::Apply {
            manifest,
            packages,
            dry_run,
        } => provision::cli::handle_apply(manifest, packages, dry_run),
        Commands::Plan { manifest, packages } => provision::cli::handle_plan(manifest, packages),
        Commands::Status { manifest } => provision::cli::handle_status(manifest),
        Commands::Detect => provision::cli::handle_detect(),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "sysprov", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        let data = e
            .downcast_ref::<ProvisionError>()
            .map(|pe| serde_json::json!({ "retryable": pe.is_retryable() }));
        emit(Level::Error, "sysprov.error", &format!("Error: {e:#}"), data);
        std::process::exit(1);
    }
}
