use {anyhow::Result, clap::Subcommand};

use chatnest_config::{
    ChatnestConfig,
    validate::{self, Severity},
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the effective configuration and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the effective configuration with secrets redacted.
    Show,
}

pub fn handle_config(action: ConfigAction, cfg: &ChatnestConfig) -> Result<()> {
    match action {
        ConfigAction::Check { verbose } => check(cfg, verbose),
        ConfigAction::Show => {
            println!("{cfg:#?}");
            Ok(())
        },
    }
}

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(cfg: &ChatnestConfig, verbose: bool) -> Result<()> {
    let result = validate::validate(cfg);

    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
            Severity::Info => CYAN,
        };
        eprintln!(
            "  {BOLD}{color}{}{RESET} [{}] {}: {}",
            d.severity, d.category, d.path, d.message
        );
        shown += 1;
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if result.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}
