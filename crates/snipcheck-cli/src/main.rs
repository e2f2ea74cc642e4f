use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use snipcheck_core::{Config, ConfigError, Diagnostic, Report, Severity, ValidationStatus};
use snipcheck_engine::{load_schema, load_seed, Pipeline};

/// snipcheck - Verify query examples in course material against a reference schema
#[derive(Parser)]
#[command(name = "snipcheck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: snipcheck.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every query snippet in the given documents or directories
    Check {
        /// Documents or directories (default: the project root)
        paths: Vec<PathBuf>,

        /// Reference schema (.toml, .json or .sql), overrides the config
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Collection seed (.json), overrides the config
        #[arg(long)]
        seed: Option<PathBuf>,

        /// Format printed to stdout
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Also write report.json to this path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write a markdown report to this path
        #[arg(short, long)]
        markdown: Option<PathBuf>,
    },

    /// List the tables of the reference schema and the seed collections
    Tables {
        /// Reference schema, overrides the config
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Collection seed, overrides the config
        #[arg(long)]
        seed: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = run(cli);
    if let Err(e) = &outcome {
        eprintln!("{} {:#}", "error:".red().bold(), e);
    }
    ExitCode::from(exit_status(&outcome))
}

/// 0 when every block passed, 1 on any failure, 2 when the run could not complete
fn exit_status(outcome: &Result<bool>) -> u8 {
    match outcome {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(_) => 2,
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

/// Returns whether the run passed
fn run(cli: Cli) -> Result<bool> {
    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Check {
            paths,
            schema,
            seed,
            format,
            output,
            markdown,
        } => {
            let config = with_overrides(config, schema, seed)?;
            check_command(config, &paths, format, output.as_deref(), markdown.as_deref(), cli.verbose)
        }
        Commands::Tables { schema, seed } => {
            let config = with_overrides(config, schema, seed)?;
            tables_command(&config)?;
            Ok(true)
        }
    }
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config, ConfigError> {
    if let Some(path) = path {
        tracing::debug!("loading config from {}", path.display());
        return Config::from_file(path);
    }

    let default = Path::new("snipcheck.toml");
    if default.exists() {
        return Config::from_file(default);
    }

    if verbose {
        eprintln!("{}", "No config file found, using defaults".yellow());
    }
    Ok(Config::default())
}

/// Command-line paths are relative to the working directory, not the config
fn with_overrides(mut config: Config, schema: Option<PathBuf>, seed: Option<PathBuf>) -> Result<Config> {
    let cwd = std::env::current_dir().context("Cannot determine the working directory")?;
    if let Some(schema) = schema {
        config.schema_path = Some(cwd.join(schema));
    }
    if let Some(seed) = seed {
        config.seed_path = Some(cwd.join(seed));
    }
    Ok(config)
}

/// Check command - extract and validate every snippet
fn check_command(
    config: Config,
    paths: &[PathBuf],
    format: OutputFormat,
    output: Option<&Path>,
    markdown: Option<&Path>,
    verbose: bool,
) -> Result<bool> {
    if verbose {
        eprintln!("{} dialect: {:?}", "Using".cyan(), config.dialect);
        eprintln!("{}", "Loading reference data...".cyan());
    }

    let inputs = if paths.is_empty() {
        vec![config.project_root.clone()]
    } else {
        paths.to_vec()
    };

    let pipeline = Pipeline::from_config(config)?;
    if verbose {
        eprintln!(
            "{} {} tables, {} collections",
            "Loaded".cyan(),
            pipeline.schema().len(),
            pipeline.collections().len()
        );
    }

    let report = pipeline.run(&inputs);

    match format {
        OutputFormat::Text => print_report_summary(&report),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    if let Some(output) = output {
        report
            .save_to_file(output)
            .with_context(|| format!("Cannot write report to {}", output.display()))?;
        if verbose {
            eprintln!("{} {}", "Report written to:".green(), output.display());
        }
    }

    if let Some(markdown) = markdown {
        std::fs::write(markdown, generate_markdown_report(&report))
            .with_context(|| format!("Cannot write markdown report to {}", markdown.display()))?;
        if verbose {
            eprintln!("{} {}", "Markdown report written to:".green(), markdown.display());
        }
    }

    Ok(!report.has_failures())
}

/// Tables command - list the reference data
fn tables_command(config: &Config) -> Result<()> {
    let schema = load_schema(&config.schema_file()?, &config.dialect)?;

    println!("{}", "Tables:".bold());
    for table in schema.tables() {
        println!("  {}", table.name.bold());
        for column in &table.columns {
            let key = if table.primary_key.iter().any(|k| k.eq_ignore_ascii_case(&column.name)) {
                " PK".yellow().to_string()
            } else {
                String::new()
            };
            println!("    {} {}{}", column.name, column.declared_type.dimmed(), key);
        }
        for fk in &table.foreign_keys {
            println!(
                "    {} {} -> {}.{}",
                "FK".cyan(),
                fk.column,
                fk.referenced_table,
                fk.referenced_column
            );
        }
    }

    if config.seed_path.is_some() {
        let seed = load_seed(&config.seed_file()?)?;
        println!();
        println!("{}", "Collections:".bold());
        for collection in seed.collections() {
            let fields: Vec<&str> = collection.fields.iter().map(String::as_str).collect();
            println!("  {} {}", collection.name.bold(), fields.join(", ").dimmed());
        }
    }

    Ok(())
}

/// Print report summary to stdout
fn print_report_summary(report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Query Example Check Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!();

    for document in &report.documents {
        let marker = if document.is_pass() { "✓".green() } else { "✗".red().bold() };
        println!(
            "{} {} ({} blocks, {} passed, {} failed)",
            marker, document.document, document.blocks_checked, document.passed, document.failed
        );

        if let Some(error) = &document.input_error {
            print_diagnostic(error);
        }
        for warning in &document.extraction_warnings {
            print_diagnostic(warning);
        }

        for result in &document.results {
            if result.diagnostics.is_empty() {
                continue;
            }

            let status = match result.status {
                ValidationStatus::Valid => result.status.to_string().green(),
                ValidationStatus::UnknownReference => result.status.to_string().red().bold(),
                ValidationStatus::ParseError => result.status.to_string().magenta().bold(),
            };
            let heading = if result.block.heading.is_empty() {
                String::new()
            } else {
                format!(" under \"{}\"", result.block.heading)
            };
            println!(
                "  block {} ({}, lines {}){}: {}",
                result.block.position, result.block.language, result.block.span, heading, status
            );
            for diag in &result.diagnostics {
                print_diagnostic(diag);
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  Documents:      {}", report.summary.documents);
    println!("  Blocks checked: {}", report.summary.blocks_checked);
    println!("  Passed:         {}", format!("{}", report.summary.passed).green());

    if report.summary.failed > 0 {
        println!("  Failed:         {}", format!("{}", report.summary.failed).red().bold());
    } else {
        println!("  Failed:         {}", format!("{}", report.summary.failed).green());
    }

    if report.summary.input_errors > 0 {
        println!("  Unreadable:     {}", format!("{}", report.summary.input_errors).red().bold());
    }

    if report.summary.warnings > 0 {
        println!("  Warnings:       {}", format!("{}", report.summary.warnings).yellow());
    } else {
        println!("  Warnings:       {}", format!("{}", report.summary.warnings).green());
    }

    println!("  Info:           {}", report.summary.info);
    println!();

    if !report.has_failures() {
        println!("{}", "✓ All query examples resolve!".green().bold());
    }

    println!("{}", "=".repeat(60).bright_blue());
}

fn print_diagnostic(diag: &Diagnostic) {
    let severity_str = match diag.severity {
        Severity::Error => "ERROR".red().bold(),
        Severity::Warn => "WARN".yellow().bold(),
        Severity::Info => "INFO".cyan(),
    };

    println!("    [{}] {}: {}", severity_str, diag.code, diag.message);

    if let Some(loc) = &diag.location {
        println!("      at {}", loc);
    }
}

/// Generate markdown report
fn generate_markdown_report(report: &Report) -> String {
    let mut md = String::new();

    md.push_str("# Query Example Check Report\n\n");
    md.push_str(&format!("**Version:** {}\n\n", report.version));

    md.push_str("## Summary\n\n");
    md.push_str(&format!("- Documents: {}\n", report.summary.documents));
    md.push_str(&format!("- Blocks checked: {}\n", report.summary.blocks_checked));
    md.push_str(&format!("- Passed: {}\n", report.summary.passed));
    md.push_str(&format!("- Failed: {}\n", report.summary.failed));
    md.push_str(&format!("- Unreadable documents: {}\n", report.summary.input_errors));
    md.push_str(&format!("- Errors: {}\n", report.summary.errors));
    md.push_str(&format!("- Warnings: {}\n", report.summary.warnings));
    md.push_str(&format!("- Info: {}\n", report.summary.info));
    md.push('\n');

    if !report.has_failures() && report.summary.warnings == 0 {
        md.push_str("✅ **All query examples resolve!**\n");
        return md;
    }

    md.push_str("## Documents\n\n");
    for document in &report.documents {
        let diagnostics: Vec<&Diagnostic> = document.diagnostics().collect();
        if diagnostics.is_empty() {
            continue;
        }

        md.push_str(&format!(
            "### {} `{}`\n\n",
            if document.is_pass() { "✅" } else { "❌" },
            document.document
        ));

        for diag in diagnostics {
            let severity_emoji = match diag.severity {
                Severity::Error => "❌",
                Severity::Warn => "⚠️",
                Severity::Info => "ℹ️",
            };

            md.push_str(&format!("- {} **{}** {}", severity_emoji, diag.code, diag.message));
            if let Some(loc) = &diag.location {
                md.push_str(&format!(" ({})", loc));
            }
            md.push('\n');
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use snipcheck_core::{DiagnosticCode, DocumentReport, Location};

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_check_arguments() {
        let cli = Cli::try_parse_from([
            "snipcheck", "-v", "check", "lessons", "--schema", "schema.sql", "--format", "json",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Check { paths, schema, format, .. } => {
                assert_eq!(paths, vec![PathBuf::from("lessons")]);
                assert_eq!(schema, Some(PathBuf::from("schema.sql")));
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected check"),
        }
    }

    const SCHEMA: &str = r#"
[[tables]]
name = "customers"
columns = [
  { name = "customerNumber", type = "INT" },
  { name = "country", type = "VARCHAR(50)" },
]
"#;

    /// A course directory with a config, a schema and one lesson
    fn course(lesson: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("snipcheck.toml"), "schema_path = \"schema.toml\"\n").unwrap();
        std::fs::write(dir.path().join("schema.toml"), SCHEMA).unwrap();
        std::fs::create_dir(dir.path().join("lessons")).unwrap();
        std::fs::write(dir.path().join("lessons/a.md"), lesson).unwrap();
        dir
    }

    fn check(dir: &Path, extra: &[&str]) -> u8 {
        let config = dir.join("snipcheck.toml");
        let mut args = vec!["snipcheck", "--config", config.to_str().unwrap(), "check"];
        args.extend_from_slice(extra);
        exit_status(&run(Cli::try_parse_from(args).unwrap()))
    }

    #[test]
    fn clean_course_exits_zero() {
        let dir = course("# Select\n```sql\nSELECT country FROM customers;\n```\n");
        assert_eq!(check(dir.path(), &[]), 0);
    }

    #[test]
    fn failed_block_exits_one() {
        let dir = course("```sql\nSELECT region FROM customers;\n```\n");
        assert_eq!(check(dir.path(), &[]), 1);
    }

    #[test]
    fn unreadable_document_exits_one() {
        let dir = course("```sql\nSELECT country FROM customers;\n```\n");
        let missing = dir.path().join("lessons/missing.md");
        assert_eq!(check(dir.path(), &[missing.to_str().unwrap()]), 1);
    }

    #[test]
    fn broken_reference_exits_two() {
        let dir = course("```sql\nSELECT country FROM customers;\n```\n");
        std::fs::write(dir.path().join("schema.toml"), "tables = 3").unwrap();
        assert_eq!(check(dir.path(), &[]), 2);
    }

    #[test]
    fn default_config_checks_the_working_directory() {
        let dir = course("```sql\nSELECT region FROM customers;\n```\n");
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let config = load_config(None, false);
        let outcome = Cli::try_parse_from(["snipcheck", "check", "--format", "json"])
            .map_err(anyhow::Error::from)
            .and_then(run);
        std::env::set_current_dir(previous).unwrap();

        let config = config.unwrap();
        assert!(!config.project_root.as_os_str().is_empty());
        // the lesson is found and fails
        assert_eq!(exit_status(&outcome), 1);

        let pipeline = Pipeline::from_config(config).unwrap();
        let report = pipeline.run(&[pipeline.config().project_root.clone()]);
        assert_eq!(report.summary.documents, 1);
        assert_eq!(report.summary.input_errors, 0);
        assert_eq!(report.summary.failed, 1);
    }

    #[test]
    fn markdown_lists_failing_documents() {
        let report = Report::from_documents(vec![
            DocumentReport::new("ok.md", vec![], vec![]),
            DocumentReport::unreadable(
                "gone.md",
                Diagnostic::new(DiagnosticCode::InputUnreadable, Severity::Error, "Cannot read gone.md")
                    .with_location(Location::new("gone.md")),
            ),
        ]);

        let md = generate_markdown_report(&report);
        assert!(md.contains("- Unreadable documents: 1"));
        assert!(md.contains("`gone.md`"));
        assert!(md.contains("INPUT_UNREADABLE"));
        assert!(!md.contains("`ok.md`"));
    }

    #[test]
    fn markdown_for_clean_run() {
        let report = Report::from_documents(vec![DocumentReport::new("ok.md", vec![], vec![])]);
        assert!(generate_markdown_report(&report).contains("All query examples resolve"));
    }
}
