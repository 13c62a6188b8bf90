//! Selection and ordering of the files to ingest

use crate::error::{IngestError, Result};
use asa_common::types::FILE_PATTERN;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Builds the ordered list of files for a run
///
/// Directory matches come first (sorted by name), explicit files after
/// them; the combined list is then stable-sorted by modification time, so
/// files with equal mtimes keep that order. A path reachable through both
/// sources is processed twice.
#[derive(Debug, Clone, Default)]
pub struct FileSequencer {
    dir: Option<PathBuf>,
    files: Vec<PathBuf>,
    latest_only: bool,
}

impl FileSequencer {
    pub fn new(dir: Option<PathBuf>, files: Vec<PathBuf>, latest_only: bool) -> Self {
        Self {
            dir,
            files,
            latest_only,
        }
    }

    /// Resolve the sources into the processing order
    pub fn sequence(&self) -> Result<Vec<PathBuf>> {
        let mut candidates = Vec::new();

        if let Some(dir) = &self.dir {
            let found = scan_dir(dir)?;
            info!(dir = %dir.display(), count = found.len(), "Globbing files to be processed");
            candidates.extend(found);
        }

        if !self.files.is_empty() {
            info!(count = self.files.len(), "Adding explicitly named files");
            candidates.extend(self.files.iter().cloned());
        }

        let mut dated = candidates
            .into_iter()
            .map(|path| modified(&path).map(|mtime| (path, mtime)))
            .collect::<Result<Vec<_>>>()?;
        dated.sort_by_key(|(_, mtime)| *mtime);

        let mut ordered: Vec<PathBuf> = dated.into_iter().map(|(path, _)| path).collect();

        if self.latest_only {
            let newest = ordered.pop().ok_or(IngestError::NoFiles)?;
            info!(file = %newest.display(), "Only using the latest file");
            ordered = vec![newest];
        }

        Ok(ordered)
    }
}

/// Regular files directly inside `dir` whose name matches [`FILE_PATTERN`]
///
/// Symlinks count when they resolve to a regular file. A missing directory
/// yields no matches.
fn scan_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "Directory does not exist, no files matched");
        return Ok(Vec::new());
    }

    let (prefix, suffix) = FILE_PATTERN.split_once('*').unwrap_or((FILE_PATTERN, ""));
    let mut found = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| IngestError::FileMetadata {
            path: e.path().unwrap_or(dir).to_path_buf(),
            source: e.into(),
        })?;

        if !entry.path().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if name.len() >= prefix.len() + suffix.len()
            && name.starts_with(prefix)
            && name.ends_with(suffix)
        {
            debug!(file = %entry.path().display(), "Matched telegram file");
            found.push(entry.into_path());
        }
    }

    Ok(found)
}

fn modified(path: &Path) -> Result<SystemTime> {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|source| IngestError::FileMetadata {
            path: path.to_path_buf(),
            source,
        })
}
