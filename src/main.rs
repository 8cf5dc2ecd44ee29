use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::io::Write;
use std::path::{Path, PathBuf};

use tcxrs::config::{AppConfig, OutputFormat};
use tcxrs::export::{self, ActivitySummary};
use tcxrs::import::parallel::{
    FileImportResult, ParallelImportConfig, ParallelImportSummary, ParallelImporter,
};
use tcxrs::import::{ImportFormat, TcxImporter};
use tcxrs::logging::{self, LogLevel};

/// tcxrs - Training Center XML reader
///
/// Decodes TCX activity files into activities, laps and trackpoints.
#[derive(Parser)]
#[command(name = "tcxrs")]
#[command(version)]
#[command(about = "Training Center XML activity reader", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the activities in TCX files or directories
    Summary {
        /// Files or directories to read
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Export every decoded activity of one file as JSON
    Export {
        /// Input TCX file
        file: PathBuf,

        /// Output file path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Indent the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Check that files decode without errors
    Validate {
        /// Files or directories to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Show or initialize the configuration
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,

        /// Write a default configuration file
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.logging.level = LogLevel::from_verbosity(config.logging.level, cli.verbose);
    logging::init_logging(&config.logging)?;

    match cli.command {
        Commands::Summary { paths, json } => {
            let summary = import_paths(&config, &paths)?;
            let summaries: Vec<ActivitySummary> = summary
                .activities()
                .map(ActivitySummary::from_activity)
                .collect();

            if json || config.output.format == OutputFormat::Json {
                println!("{}", export::to_json(&summaries, config.output.pretty_json)?);
            } else {
                println!("{}", export::render_table(&summaries));
            }
            report_failures(&summary);
        }

        Commands::Export {
            file,
            output,
            pretty,
        } => {
            let importer = TcxImporter::from_config(&config.import);
            let activities = importer
                .import_file(&file)
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            let json = export::to_json(&activities, pretty || config.output.pretty_json)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!(
                        "{}",
                        format!("✓ Exported {} activities to {}", activities.len(), path.display())
                            .green()
                    );
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    writeln!(stdout, "{}", json)?;
                }
            }
        }

        Commands::Validate { paths } => {
            let summary = import_paths(&config, &paths)?;
            for result in &summary.results {
                println!("{}", validation_line(result));
            }

            if !summary.is_fully_successful() {
                anyhow::bail!("{} of {} files failed to decode", summary.failed_files, summary.total_files);
            }
        }

        Commands::Config { show, init } => {
            if init {
                let path = cli
                    .config
                    .clone()
                    .unwrap_or_else(AppConfig::default_config_path);
                AppConfig::default().save_to_file(&path)?;
                println!("{}", format!("✓ Wrote default configuration to {}", path.display()).green());
            }
            if show || !init {
                print!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

/// Expand directories, then decode every file in parallel
fn import_paths(config: &AppConfig, paths: &[PathBuf]) -> Result<ParallelImportSummary> {
    let importer = ParallelImporter::with_config(
        ParallelImportConfig {
            num_threads: config.import.num_threads,
            show_progress: config.import.show_progress && paths.len() > 1,
        },
        TcxImporter::from_config(&config.import),
    );

    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(importer.collect_importable_files(path)?);
        } else {
            files.push(path.clone());
        }
    }

    Ok(importer.import_files(&files)?)
}

fn report_failures(summary: &ParallelImportSummary) {
    for (path, error) in summary.errors() {
        eprintln!("{} {}: {}", "✗".red(), display_name(path), error);
    }
}

/// One status line per file; failures always name the file they belong to
fn validation_line(result: &FileImportResult) -> String {
    match &result.error {
        None => format!(
            "{} {} ({} activities)",
            "✓".green(),
            result.file_path.display(),
            result.activities.len()
        ),
        Some(error) => format!("{} {}: {}", "✗".red(), result.file_path.display(), error),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_line_names_the_failed_file() {
        colored::control::set_override(false);

        let failed = FileImportResult {
            file_path: PathBuf::from("rides/missing.tcx"),
            activities: Vec::new(),
            duration_ms: 0,
            error: Some("Could not find the activity file.".to_string()),
        };
        assert_eq!(
            validation_line(&failed),
            "✗ rides/missing.tcx: Could not find the activity file."
        );

        let passed = FileImportResult {
            error: None,
            ..failed
        };
        assert_eq!(validation_line(&passed), "✓ rides/missing.tcx (0 activities)");
    }
}
