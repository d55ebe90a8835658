//! Upload staging: validated, deduplicated lists of pending documents.
//!
//! Staging is a pure data transform over user-selected files. Nothing here
//! touches the session state machine; staged files are handed to the
//! dispatcher or stream session when a run starts and are not retained
//! afterwards.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StudykitError};

/// Document types the generation backend can parse.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["docx", "pptx", "pdf", "doc", "ppt"];

/// Returns the lowercased substring after the last `.` of a file name,
/// or `None` when the name has no extension.
pub fn file_extension(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Formats a byte count for display: `0 B`, `14.5 KB`, `1.2 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["B", "KB", "MB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let exponent = ((bytes as f64).log2() / 10.0).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    let formatted = format!("{value:.1}");
    let formatted = formatted.strip_suffix(".0").unwrap_or(&formatted);
    format!("{} {}", formatted, UNITS[exponent])
}

/// A user-selected file before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    pub size_bytes: u64,
    pub path: PathBuf,
}

impl FileCandidate {
    /// Builds a candidate from a path on disk, taking the display name
    /// from the final path component.
    ///
    /// # Errors
    ///
    /// Returns an error if the file metadata cannot be read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                StudykitError::validation(format!("Not a file path: {}", path.display()))
            })?;
        let metadata = std::fs::metadata(path)?;
        Ok(Self {
            name,
            size_bytes: metadata.len(),
            path: path.to_path_buf(),
        })
    }
}

/// A validated file pending upload.
///
/// Ephemeral: created on selection, destroyed on removal or when a
/// generation run is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedFile {
    /// Opaque identifier, unique within the staging list.
    pub id: String,
    /// Display name, used for deduplication.
    pub name: String,
    /// Lowercased extension.
    pub extension: String,
    pub size_bytes: u64,
    /// Location of the file on disk.
    pub path: PathBuf,
}

impl StagedFile {
    fn from_candidate(candidate: FileCandidate, extension: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: candidate.name,
            extension,
            size_bytes: candidate.size_bytes,
            path: candidate.path,
        }
    }

    /// Human-readable size for display next to the file name.
    pub fn size_display(&self) -> String {
        format_size(self.size_bytes)
    }
}

/// The staged list of pending uploads.
///
/// Two staging policies exist, deliberately distinct per flow:
/// [`UploadStaging::stage_documents`] (flashcard/document flow) appends
/// with name-based deduplication, while [`UploadStaging::stage_single`]
/// (quiz flow) replaces the entire list with at most one file.
#[derive(Debug, Clone, Default)]
pub struct UploadStaging {
    files: Vec<StagedFile>,
}

impl UploadStaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// The staged files, in staging order.
    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The first staged file, if any.
    pub fn first(&self) -> Option<&StagedFile> {
        self.files.first()
    }

    /// Keeps only allow-listed candidates, pairing each with its
    /// lowercased extension.
    fn filter_allowed(candidates: Vec<FileCandidate>) -> Vec<(FileCandidate, String)> {
        candidates
            .into_iter()
            .filter_map(|candidate| {
                let extension = file_extension(&candidate.name)?;
                ALLOWED_EXTENSIONS
                    .contains(&extension.as_str())
                    .then_some((candidate, extension))
            })
            .collect()
    }

    /// Document-flow staging: deduplicating append.
    ///
    /// Files whose display name is already staged are dropped (exact,
    /// case-sensitive match); prior entries and their order are preserved.
    /// Returns the number of files actually appended.
    ///
    /// # Errors
    ///
    /// Returns [`StudykitError::NoValidFiles`] without mutating the list
    /// when no candidate carries an allowed extension.
    pub fn stage_documents(&mut self, candidates: Vec<FileCandidate>) -> Result<usize> {
        let allowed = Self::filter_allowed(candidates);
        if allowed.is_empty() {
            return Err(StudykitError::NoValidFiles);
        }

        let mut names: HashSet<String> =
            self.files.iter().map(|file| file.name.clone()).collect();
        let mut appended = 0;
        for (candidate, extension) in allowed {
            if names.insert(candidate.name.clone()) {
                self.files
                    .push(StagedFile::from_candidate(candidate, extension));
                appended += 1;
            }
        }
        Ok(appended)
    }

    /// Quiz-flow staging: single-file replace.
    ///
    /// A new selection replaces the entire staged list, keeping at most
    /// the first allow-listed file.
    ///
    /// # Errors
    ///
    /// Returns [`StudykitError::NoValidFiles`] without mutating the list
    /// when no candidate carries an allowed extension.
    pub fn stage_single(&mut self, candidates: Vec<FileCandidate>) -> Result<usize> {
        let mut allowed = Self::filter_allowed(candidates);
        if allowed.is_empty() {
            return Err(StudykitError::NoValidFiles);
        }
        let (candidate, extension) = allowed.remove(0);
        self.files = vec![StagedFile::from_candidate(candidate, extension)];
        Ok(1)
    }

    /// Removes a staged file by id. Returns whether an entry was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.files.len();
        self.files.retain(|file| file.id != id);
        self.files.len() != before
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}
