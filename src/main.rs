use anyhow::{Context, Result};
use clap::Parser;
use oas_brake::spec::{Compatibility, Spec};
use oas_brake::{BrakeConfig, BreakingResult, CheckerOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "oas-brake")]
#[command(about = "Detect breaking changes between two OpenAPI documents")]
#[command(version)]
struct Args {
    #[arg(long, global = true, help = "Log pipeline details to stderr")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    #[command(about = "Check a new API document for breaking changes against an old one")]
    Check {
        #[arg(help = "Path to the old API document")]
        old_file: PathBuf,
        #[arg(help = "Path to the new API document")]
        new_file: PathBuf,
        #[command(flatten)]
        checker: CheckerArgs,
        #[arg(long, help = "Output format", value_enum, default_value = "text")]
        format: OutputFormat,
    },
    #[command(about = "Generate the semantic fingerprint of an API document")]
    Fingerprint {
        #[arg(help = "Path to the API document")]
        file: PathBuf,
        #[command(flatten)]
        checker: CheckerArgs,
    },
    #[command(about = "Print the compatibility level of two API documents")]
    Compare {
        #[arg(help = "Path to the old API document")]
        old_file: PathBuf,
        #[arg(help = "Path to the new API document")]
        new_file: PathBuf,
        #[command(flatten)]
        checker: CheckerArgs,
    },
}

/// Options shared by every command: a configuration file plus flags
/// overriding it.
#[derive(clap::Args)]
struct CheckerArgs {
    #[arg(long, help = "YAML configuration file with a `breaking:` section")]
    config: Option<PathBuf>,
    #[arg(long = "excluded-path", help = "Path prefix to leave out (repeatable)")]
    excluded_paths: Vec<String>,
    #[arg(long = "ignore", help = "Rule code to drop from the report (repeatable)")]
    ignored_rules: Vec<String>,
    #[arg(long, help = "Vendor extension marking beta operations")]
    beta_api_extension_name: Option<String>,
    #[arg(long, help = "Whether deprecated operations may be deleted")]
    deprecated_api_deletion_allowed: Option<bool>,
    #[arg(long, help = "Fail on schemas without a resolvable type")]
    strict_validation: Option<bool>,
    #[arg(long, help = "Nesting limit of transformed schemas (1-100)")]
    max_schema_transformation_depth: Option<i64>,
    #[arg(long, help = "Nesting limit of schemas rendered into logs (1-20)")]
    max_log_serialization_depth: Option<i64>,
}

impl CheckerArgs {
    /// Loads the configuration file, if any, and applies the flags on top.
    fn load(self) -> Result<BrakeConfig> {
        let mut config = match &self.config {
            Some(path) => BrakeConfig::from_yaml_file(path)
                .with_context(|| format!("Failed to load config '{}'", path.display()))?,
            None => BrakeConfig::default(),
        };

        let mut options: CheckerOptions = config.checker;
        options.excluded_paths.extend(self.excluded_paths);
        if let Some(name) = self.beta_api_extension_name {
            options = options.with_beta_api_extension_name(name);
        }
        if let Some(allowed) = self.deprecated_api_deletion_allowed {
            options = options.with_deprecated_api_deletion_allowed(allowed);
        }
        if let Some(strict) = self.strict_validation {
            options = options.with_strict_validation(strict);
        }
        if let Some(depth) = self.max_schema_transformation_depth {
            options = options.with_max_schema_transformation_depth(depth)?;
        }
        if let Some(depth) = self.max_log_serialization_depth {
            options = options.with_max_log_serialization_depth(depth)?;
        }
        config.checker = options;
        config.ignored_rule_codes.extend(self.ignored_rules);
        Ok(config)
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    Text,
    Json,
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file '{}'", path.display()))
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_text(result: &BreakingResult) {
    if !result.has_breaking_changes {
        println!("No breaking changes detected.");
        println!("Rules executed: {}", result.executed_rules.len());
        return;
    }
    println!("Breaking changes detected:");
    for change in &result.changes {
        println!("  [{}] {}", change.rule_code(), change.message());
    }
    println!();
    println!("Summary:");
    println!("  Total breaking changes: {}", result.changes.len());
    for (category, count) in &result.summary {
        println!("  {category}: {count}");
    }
    println!("  Rules executed: {}", result.executed_rules.len());
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::Check {
            old_file,
            new_file,
            checker,
            format,
        } => {
            let config = checker.load()?;
            let old_content = read(&old_file)?;
            let new_content = read(&new_file)?;
            let result = oas_brake::check_documents(&old_content, &new_content, &config.checker)
                .context("Breaking change check failed")?
                .without_rules(&config.ignored_rule_codes);

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&result.report())?);
                }
                OutputFormat::Text => print_text(&result),
            }

            if result.has_breaking_changes {
                std::process::exit(1);
            }
        }
        Commands::Fingerprint { file, checker } => {
            let config = checker.load()?;
            let content = read(&file)?;
            let spec = Spec::try_from(&content, &config.checker)
                .with_context(|| format!("Failed to analyze '{}'", file.display()))?;
            println!("{}", spec.fingerprint);
        }
        Commands::Compare {
            old_file,
            new_file,
            checker,
        } => {
            let config = checker.load()?;
            let old_content = read(&old_file)?;
            let new_content = read(&new_file)?;
            let old_spec = Spec::try_from(&old_content, &config.checker)?;
            let new_spec = Spec::try_from(&new_content, &config.checker)?;

            let (compatibility, changes) = old_spec.assess(&new_spec)?;
            let changes: Vec<_> = changes
                .into_iter()
                .filter(|change| !config.ignored_rule_codes.contains(change.rule_code()))
                .collect();
            let compatibility = match compatibility {
                Compatibility::Green => Compatibility::Green,
                _ => Compatibility::of(&changes),
            };
            match compatibility {
                Compatibility::Green => println!("Green: Documents describe the same API"),
                Compatibility::Yellow => {
                    println!("Yellow: New document is backward-compatible with the old one")
                }
                Compatibility::Red => {
                    println!("Red: Breaking change detected");
                    for change in &changes {
                        println!("  - {change}");
                    }
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_accepts_checker_options() {
        let args = Args::try_parse_from([
            "oas-brake",
            "compare",
            "old.yaml",
            "new.yaml",
            "--excluded-path",
            "/pet",
            "--ignore",
            "R016",
            "--max-schema-transformation-depth",
            "7",
        ])
        .unwrap();
        let Commands::Compare { checker, .. } = args.command else {
            panic!("expected the compare command");
        };
        let config = checker.load().unwrap();
        assert!(config.checker.excluded_paths.contains("/pet"));
        assert_eq!(config.checker.max_schema_transformation_depth, 7);
        assert!(config.ignored_rule_codes.contains("R016"));
    }

    #[test]
    fn test_fingerprint_reads_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"breaking:\n  strict_validation: false\n").unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let args = Args::try_parse_from(["oas-brake", "fingerprint", "api.yaml", "--config", &path]).unwrap();
        let Commands::Fingerprint { checker, .. } = args.command else {
            panic!("expected the fingerprint command");
        };
        assert!(!checker.load().unwrap().checker.strict_validation);
    }

    #[test]
    fn test_out_of_range_flag_is_rejected() {
        let args = Args::try_parse_from([
            "oas-brake",
            "fingerprint",
            "api.yaml",
            "--max-log-serialization-depth",
            "50",
        ])
        .unwrap();
        let Commands::Fingerprint { checker, .. } = args.command else {
            panic!("expected the fingerprint command");
        };
        assert!(checker.load().is_err());
    }
}
