use std::path::Path;
use tracing::debug;

use crate::error::{DecodeError, Result, TcxRsError};
use crate::models::Activity;
use crate::xml::XmlDocument;

pub mod parallel;
pub mod tcx;

pub use tcx::Namespaces;

/// Parse the text of a TCX document into its activities, in document order.
///
/// Fails on the first problem found; there are no partial results.
pub fn parse(text: &str) -> std::result::Result<Vec<Activity>, DecodeError> {
    parse_with(text, &Namespaces::garmin())
}

/// Like [`parse`], with explicit namespace URIs
pub fn parse_with(text: &str, ns: &Namespaces) -> std::result::Result<Vec<Activity>, DecodeError> {
    let document = XmlDocument::load(text)?;
    let root = document.root();

    if !root.matches(ns.tcx("TrainingCenterDatabase")) {
        return Err(DecodeError::MissingStructure {
            path: "TrainingCenterDatabase".to_string(),
        });
    }

    let activities = root
        .child(ns.tcx("Activities"))
        .ok_or_else(|| DecodeError::MissingStructure {
            path: "TrainingCenterDatabase.Activities".to_string(),
        })?;

    let activities = tcx::decode_activities(activities, ns)?;
    debug!(
        activities = activities.len(),
        points = activities.iter().map(Activity::point_count).sum::<usize>(),
        "parsed TCX document"
    );

    Ok(activities)
}

/// Trait for importing activities from files of a given format
pub trait ImportFormat {
    /// Check if this importer can handle the given file
    fn can_import(&self, file_path: &Path) -> bool;

    /// Import every activity in the file
    fn import_file(&self, file_path: &Path) -> Result<Vec<Activity>>;

    /// Get the format name for this importer
    fn get_format_name(&self) -> &'static str;
}

/// Reads `.tcx` files from disk and hands their text to the decoder
#[derive(Debug, Clone)]
pub struct TcxImporter {
    namespaces: Namespaces,
    extensions: Vec<String>,
}

impl TcxImporter {
    pub fn new() -> Self {
        Self::with_settings(Namespaces::garmin(), vec!["tcx".to_string()])
    }

    pub fn with_settings(namespaces: Namespaces, extensions: Vec<String>) -> Self {
        Self {
            namespaces,
            extensions,
        }
    }

    pub fn from_config(settings: &crate::config::ImportSettings) -> Self {
        Self::with_settings(settings.namespaces.clone(), settings.extensions.clone())
    }
}

impl Default for TcxImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportFormat for TcxImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.extensions
                    .iter()
                    .any(|accepted| accepted.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    fn import_file(&self, file_path: &Path) -> Result<Vec<Activity>> {
        debug!("Importing {}", file_path.display());

        let bytes = std::fs::read(file_path)?;
        let text = String::from_utf8(bytes).map_err(|e| TcxRsError::Import {
            path: file_path.to_path_buf(),
            source: DecodeError::malformed(format!("invalid UTF-8: {}", e)),
        })?;

        parse_with(&text, &self.namespaces).map_err(|source| TcxRsError::Import {
            path: file_path.to_path_buf(),
            source,
        })
    }

    fn get_format_name(&self) -> &'static str {
        "TCX"
    }
}
