//! File selection.
//!
//! Resolves the `files` / `directories` parameters into an ordered list of candidate files:
//!
//! - `files` (when non-blank) is used as-is, in input order.
//! - otherwise each directory in `directories` contributes its immediate children, oldest first.
//!
//! Entries that do not exist or do not carry a configured suffix are skipped with a warning.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{DataStoreParams, DIRS_PARAM, FILES_PARAM};
use crate::error::{DataStoreError, DataStoreResult};

/// Ordered set of lowercase, dot-prefixed file suffixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSuffixes(Vec<String>);

impl FileSuffixes {
    /// Suffixes are stored lowercased so matching is case-insensitive on both sides.
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(suffixes.into_iter().map(|s| s.as_ref().to_lowercase()).collect())
    }

    /// The configured suffixes, lowercased.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Returns `true` if the lowercased `filename` ends with one of the suffixes.
    pub fn matches(&self, filename: &str) -> bool {
        let name = filename.to_lowercase();
        self.0.iter().any(|suffix| name.ends_with(suffix.as_str()))
    }
}

impl Default for FileSuffixes {
    fn default() -> Self {
        Self::new([".json", ".jsonl"])
    }
}

/// Suffix predicate used by the selector.
pub fn is_desired_file(filename: &str, suffixes: &FileSuffixes) -> bool {
    suffixes.matches(filename)
}

/// A resolved file together with its ordering key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl CandidateFile {
    fn from_path(path: PathBuf) -> Self {
        let modified = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        Self { path, modified }
    }
}

/// Select the files to process for a run.
///
/// Fails only when both `files` and `directories` are blank. An empty result is not an error.
pub fn select_files(params: &DataStoreParams, suffixes: &FileSuffixes) -> DataStoreResult<Vec<CandidateFile>> {
    let (key, value, files) = match non_blank(params, FILES_PARAM) {
        Some(value) => (FILES_PARAM, value, files_from_list(value, suffixes)),
        None => {
            let value = non_blank(params, DIRS_PARAM).ok_or_else(|| DataStoreError::Configuration {
                message: format!("{FILES_PARAM} and {DIRS_PARAM} are blank."),
            })?;
            (DIRS_PARAM, value, files_from_directories(value, suffixes))
        }
    };

    info!("{key}={value}");
    if files.is_empty() {
        debug!("No files in {value}");
    }
    Ok(files)
}

fn non_blank<'a>(params: &'a DataStoreParams, key: &str) -> Option<&'a str> {
    params.get_as_string(key).filter(|v| !v.trim().is_empty())
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

fn files_from_list(value: &str, suffixes: &FileSuffixes) -> Vec<CandidateFile> {
    let mut files = Vec::new();
    for entry in value.split(',') {
        let path = PathBuf::from(entry);
        let wanted = path.is_file() && file_name(&path).is_some_and(|n| is_desired_file(n, suffixes));
        if wanted {
            files.push(CandidateFile::from_path(path));
        } else {
            warn!("{entry} is not found.");
        }
    }
    files
}

fn files_from_directories(value: &str, suffixes: &FileSuffixes) -> Vec<CandidateFile> {
    let mut files = Vec::new();
    for entry in value.split(',') {
        let dir = Path::new(entry);
        if !dir.is_dir() {
            warn!("{entry} is not a directory.");
            continue;
        }

        let mut found: Vec<CandidateFile> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| match e {
                Ok(e) => Some(e),
                Err(err) => {
                    warn!(error = %err, "failed to read entry in {entry}");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.file_name().to_str().is_some_and(|n| is_desired_file(n, suffixes)))
            .map(|e| CandidateFile::from_path(e.into_path()))
            .collect();

        // Stable: equal timestamps keep file-name order.
        found.sort_by_key(|f| f.modified);
        files.extend(found);
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_suffixes_match_json_and_jsonl_case_insensitively() {
        let suffixes = FileSuffixes::default();
        assert!(is_desired_file("data.json", &suffixes));
        assert!(is_desired_file("DATA.JSONL", &suffixes));
        assert!(is_desired_file("a.b.Json", &suffixes));
        assert!(!is_desired_file("data.txt", &suffixes));
        assert!(!is_desired_file("json", &suffixes));
    }

    #[test]
    fn suffixes_are_matched_verbatim_without_dot_insertion() {
        let suffixes = FileSuffixes::new(["log"]);
        assert!(is_desired_file("catalog", &suffixes));
        assert!(is_desired_file("x.LOG", &suffixes));
    }

    #[test]
    fn configured_suffixes_are_lowercased() {
        let suffixes = FileSuffixes::new([".NDJSON"]);
        assert_eq!(suffixes.as_slice(), &[".ndjson".to_string()]);
        assert!(is_desired_file("events.ndjson", &suffixes));
    }

    #[test]
    fn blank_locations_are_a_configuration_error() {
        let params = DataStoreParams::new().with(FILES_PARAM, " ").with(DIRS_PARAM, "");
        let err = select_files(&params, &FileSuffixes::default()).unwrap_err();
        assert!(matches!(err, DataStoreError::Configuration { .. }));
    }
}
