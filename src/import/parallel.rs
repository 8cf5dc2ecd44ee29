//! Parallel batch import of TCX files using rayon
//!
//! Decoding shares no state between documents, so files are processed
//! independently. Each file is still all-or-nothing; one bad file does not
//! stop the others.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn, Level};

use super::{ImportFormat, TcxImporter};
use crate::error::{Result, TcxRsError};
use crate::models::Activity;

/// Configuration for parallel import operations
#[derive(Debug, Clone)]
pub struct ParallelImportConfig {
    /// Number of threads; `None` uses the rayon default (number of CPUs)
    pub num_threads: Option<usize>,
    /// Show progress bar during import
    pub show_progress: bool,
}

impl Default for ParallelImportConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            show_progress: true,
        }
    }
}

/// Outcome of importing one file
#[derive(Debug, Clone)]
pub struct FileImportResult {
    /// Path to the file that was processed
    pub file_path: PathBuf,
    /// Activities decoded from this file (empty on failure)
    pub activities: Vec<Activity>,
    /// Duration in milliseconds for this file
    pub duration_ms: u128,
    /// Error message if import failed
    pub error: Option<String>,
}

impl FileImportResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of a parallel import operation
#[derive(Debug, Clone, Default)]
pub struct ParallelImportSummary {
    /// Total files processed
    pub total_files: usize,
    /// Files successfully imported
    pub successful_files: usize,
    /// Files with errors
    pub failed_files: usize,
    /// Total activities imported
    pub total_activities: usize,
    /// Total duration in milliseconds
    pub total_duration_ms: u128,
    /// Per-file results, in input order
    pub results: Vec<FileImportResult>,
}

impl ParallelImportSummary {
    fn from_results(results: Vec<FileImportResult>, total_duration_ms: u128) -> Self {
        let successful_files = results.iter().filter(|r| r.is_success()).count();

        Self {
            total_files: results.len(),
            successful_files,
            failed_files: results.len() - successful_files,
            total_activities: results.iter().map(|r| r.activities.len()).sum(),
            total_duration_ms,
            results,
        }
    }

    /// Get throughput (files per second)
    pub fn throughput_files_per_sec(&self) -> f64 {
        if self.total_duration_ms == 0 {
            return 0.0;
        }
        (self.successful_files as f64 / self.total_duration_ms as f64) * 1000.0
    }

    /// Get average time per file
    pub fn avg_time_per_file_ms(&self) -> f64 {
        if self.successful_files == 0 {
            return 0.0;
        }
        self.total_duration_ms as f64 / self.successful_files as f64
    }

    /// Check if import was completely successful
    pub fn is_fully_successful(&self) -> bool {
        self.failed_files == 0
    }

    /// Failed files with their error messages
    pub fn errors(&self) -> Vec<(&Path, &str)> {
        self.results
            .iter()
            .filter_map(|r| r.error.as_deref().map(|e| (r.file_path.as_path(), e)))
            .collect()
    }

    /// All decoded activities, file order first, then document order
    pub fn activities(&self) -> impl Iterator<Item = &Activity> + '_ {
        self.results.iter().flat_map(|r| r.activities.iter())
    }

    /// Get human-readable summary
    pub fn to_string_pretty(&self) -> String {
        format!(
            "Parallel Import Summary\n  \
             Total Files: {}\n  \
             Successful: {}\n  \
             Failed: {}\n  \
             Total Activities: {}\n  \
             Total Time: {:.2}s\n  \
             Throughput: {:.2} files/sec\n  \
             Avg Time/File: {:.2}ms",
            self.total_files,
            self.successful_files,
            self.failed_files,
            self.total_activities,
            self.total_duration_ms as f64 / 1000.0,
            self.throughput_files_per_sec(),
            self.avg_time_per_file_ms()
        )
    }
}

/// Parallel import manager
pub struct ParallelImporter {
    pub config: ParallelImportConfig,
    importer: TcxImporter,
}

impl ParallelImporter {
    /// Create new parallel importer with default config
    pub fn new() -> Self {
        Self::with_config(ParallelImportConfig::default(), TcxImporter::new())
    }

    /// Create with custom configuration
    pub fn with_config(config: ParallelImportConfig, importer: TcxImporter) -> Self {
        Self { config, importer }
    }

    /// Import multiple files in parallel. Results keep the input order.
    pub fn import_files(&self, file_paths: &[PathBuf]) -> Result<ParallelImportSummary> {
        let start_time = Instant::now();
        info!("Starting parallel import of {} files", file_paths.len());

        let progress = if self.config.show_progress {
            let pb = ProgressBar::new(file_paths.len() as u64);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({msg})")
                .map_err(|e| TcxRsError::Configuration(format!("Invalid progress template: {}", e)))?
                .progress_chars("#>-");
            pb.set_style(style);
            Some(pb)
        } else {
            None
        };

        let results = match self.config.num_threads {
            Some(num_threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build()
                    .map_err(|e| {
                        TcxRsError::Configuration(format!("Failed to create thread pool: {}", e))
                    })?;
                pool.install(|| self.process_files_parallel(file_paths, progress.as_ref()))
            }
            None => self.process_files_parallel(file_paths, progress.as_ref()),
        };

        if let Some(pb) = progress {
            pb.finish_with_message("Complete");
        }

        let summary = ParallelImportSummary::from_results(results, start_time.elapsed().as_millis());
        info!("{}", summary.to_string_pretty());

        Ok(summary)
    }

    /// Import every matching file in a directory, sorted by path
    pub fn import_directory(&self, dir_path: &Path) -> Result<ParallelImportSummary> {
        debug!("Scanning directory for importable files: {:?}", dir_path);

        let files = self.collect_importable_files(dir_path)?;
        if files.is_empty() {
            warn!("No TCX files found in directory: {}", dir_path.display());
            return Ok(ParallelImportSummary::default());
        }

        info!("Found {} TCX files in directory", files.len());
        self.import_files(&files)
    }

    /// Collect all files the importer accepts from a directory
    pub fn collect_importable_files(&self, dir_path: &Path) -> Result<Vec<PathBuf>> {
        if !dir_path.is_dir() {
            return Err(TcxRsError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Path is not a directory: {}", dir_path.display()),
            )));
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir_path)? {
            let path = entry?.path();
            if path.is_file() && self.importer.can_import(&path) {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    fn process_files_parallel(
        &self,
        file_paths: &[PathBuf],
        progress: Option<&ProgressBar>,
    ) -> Vec<FileImportResult> {
        file_paths
            .par_iter()
            .map(|file_path| {
                let file_start = Instant::now();
                let outcome = self.importer.import_file(file_path);
                let duration_ms = file_start.elapsed().as_millis();

                let result = match outcome {
                    Ok(activities) => {
                        debug!(
                            "Imported {:?} ({} activities, {}ms)",
                            file_path,
                            activities.len(),
                            duration_ms
                        );
                        FileImportResult {
                            file_path: file_path.clone(),
                            activities,
                            duration_ms,
                            error: None,
                        }
                    }
                    Err(e) => {
                        // A missing file is only a warning; anything unreadable is an error.
                        if e.severity().to_tracing_level() == Level::WARN {
                            warn!("Failed to import {:?}: {} ({}ms)", file_path, e, duration_ms);
                        } else {
                            error!("Failed to import {:?}: {} ({}ms)", file_path, e, duration_ms);
                        }
                        FileImportResult {
                            file_path: file_path.clone(),
                            activities: Vec::new(),
                            duration_ms,
                            error: Some(e.user_message()),
                        }
                    }
                };

                if let Some(pb) = progress {
                    pb.inc(1);
                }
                result
            })
            .collect()
    }
}

impl Default for ParallelImporter {
    fn default() -> Self {
        Self::new()
    }
}
