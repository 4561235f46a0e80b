//! Package Verifier CLI
//!
//! Command-line tool for checking package archives and recipe directories.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use pkg_verify::formatter::{HumanFormatter, JsonFormatter, ReportFormatter};
use pkg_verify::{check_names, verify_package, verify_recipe, Report, VerifierOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Static verifier for conda package archives and recipes.
///
/// Each path is either a package archive (`.tar.bz2` or `.tar`) or a
/// recipe directory containing `meta.yaml`.
#[derive(Parser, Debug)]
#[command(name = "pkg-verify")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Package archives or recipe directories to verify
    #[arg(required_unless_present = "list_checks")]
    paths: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "human")]
    format: OutputFormat,

    /// Stop at the first failing check
    #[arg(short = 'x', long = "exit")]
    exit_on_error: bool,

    /// Checks to skip (comma separated)
    #[arg(short, long, value_delimiter = ',', env = "PKG_VERIFY_IGNORE")]
    ignore: Vec<String>,

    /// Print the names of all checks and exit
    #[arg(long)]
    list_checks: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (one line per path)
    #[arg(short, long)]
    quiet: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

impl Args {
    fn options(&self) -> VerifierOptions {
        let base = if self.exit_on_error {
            VerifierOptions::strict()
        } else {
            VerifierOptions::new()
        };
        self.ignore
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .fold(base, |options, name| options.ignoring(name))
    }

    fn formatter(&self) -> Box<dyn ReportFormatter> {
        match self.format {
            OutputFormat::Human => Box::new(HumanFormatter {
                verbose: self.verbose,
                quiet: self.quiet,
            }),
            OutputFormat::Json => Box::new(JsonFormatter::new()),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging if verbose
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("pkg_verify=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    if args.list_checks {
        for name in check_names() {
            println!("{name}");
        }
        return ExitCode::SUCCESS;
    }

    let options = args.options();
    let formatter = args.formatter();
    let mut success = true;

    for path in &args.paths {
        match verify_path(path, &options) {
            Ok(report) => {
                println!("{}", formatter.format_report(&report).trim_end());
                success &= report.passed();
            }
            Err(e) => {
                if !args.quiet {
                    eprintln!("Error verifying {}: {e:#}", path.display());
                }
                success = false;
            }
        }
    }

    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn verify_path(path: &Path, options: &VerifierOptions) -> anyhow::Result<Report> {
    if path.is_dir() {
        verify_recipe(path, options).context("recipe could not be loaded")
    } else {
        verify_package(path, options).context("package could not be opened")
    }
}
