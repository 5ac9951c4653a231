//! Durable resume points.
//!
//! One JSON file per procedure identifier holds the last confirmed position
//! within that procedure. Saving overwrites the file, so a procedure never
//! has more than one resume point.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for checkpoint store operations.
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Errors that can occur while reading or writing checkpoints.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The identifier cannot be used as a file name.
    #[error("Procedure id {0:?} cannot be used as a save name")]
    InvalidId(String),

    /// Filesystem failure.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A save file exists but does not hold a checkpoint.
    #[error("Malformed save file {path:?}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Position to fast-forward a run to.
///
/// `step_index` is the last *confirmed* step, not the next one to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResumePosition {
    /// Subprocedure to re-enter
    pub subprocedure_index: usize,

    /// Last confirmed step within that subprocedure
    pub step_index: usize,
}

impl ResumePosition {
    /// Create a resume position.
    pub fn new(subprocedure_index: usize, step_index: usize) -> Self {
        Self { subprocedure_index, step_index }
    }

    /// First step to run when re-entering the resumed subprocedure.
    ///
    /// A stored index of zero means nothing in the subprocedure was
    /// confirmed yet, so it restarts from its first step.
    pub fn first_step(&self) -> usize {
        if self.step_index > 0 {
            self.step_index + 1
        } else {
            0
        }
    }
}

/// The persisted record for one procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Procedure identifier (also the file name)
    pub procedure_id: String,

    /// Title, for display when the procedure is not loaded
    #[serde(default)]
    pub procedure_title: String,

    /// Subprocedure of the last confirmation
    #[serde(default, alias = "subprocedure_idx")]
    pub subprocedure_index: usize,

    /// Last confirmed step within that subprocedure
    #[serde(default, alias = "step_idx")]
    pub step_index: usize,

    /// When the record was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl Checkpoint {
    /// Where a run restarting from this record picks up.
    pub fn resume_position(&self) -> ResumePosition {
        ResumePosition::new(self.subprocedure_index, self.step_index)
    }

    /// Step number shown to users as "next step".
    ///
    /// This is the stored index plus one, which is the 1-based number of
    /// the last confirmed step (or the 0-based index of the next one).
    pub fn next_step_display(&self) -> usize {
        self.step_index + 1
    }

    /// Relative age of the record, e.g. "5m ago".
    pub fn saved_display(&self) -> Option<String> {
        let saved_at = self.saved_at?;
        let diff = Utc::now().signed_duration_since(saved_at);

        Some(if diff.num_seconds() < 60 {
            "just now".to_string()
        } else if diff.num_minutes() < 60 {
            format!("{}m ago", diff.num_minutes())
        } else if diff.num_hours() < 24 {
            format!("{}h ago", diff.num_hours())
        } else {
            format!("{}d ago", diff.num_days())
        })
    }
}

/// One row of a store listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointEntry {
    /// A readable record
    Saved(Checkpoint),

    /// A save file that could not be read, keyed by its file stem
    Unreadable { procedure_id: String, reason: String },
}

impl CheckpointEntry {
    /// Identifier the entry is filed under.
    pub fn procedure_id(&self) -> &str {
        match self {
            Self::Saved(checkpoint) => &checkpoint.procedure_id,
            Self::Unreadable { procedure_id, .. } => procedure_id,
        }
    }

    /// Human-readable label, e.g. "Hood Latch (Remove and Replace) - step 3".
    pub fn label(&self) -> String {
        match self {
            Self::Saved(checkpoint) => {
                let title = if checkpoint.procedure_title.is_empty() {
                    checkpoint.procedure_id.as_str()
                } else {
                    checkpoint.procedure_title.as_str()
                };
                format!("{} - step {}", title, checkpoint.next_step_display())
            }
            Self::Unreadable { procedure_id, .. } => format!("{procedure_id} - step 0"),
        }
    }
}

/// Directory-backed checkpoint store keyed by procedure identifier.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the save files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the save file for `procedure_id`.
    pub fn path_for(&self, procedure_id: &str) -> CheckpointResult<PathBuf> {
        validate_id(procedure_id)?;
        Ok(self.dir.join(format!("{procedure_id}.json")))
    }

    /// Overwrite the record for `procedure_id` with a new position.
    pub fn save(
        &self,
        procedure_id: &str,
        procedure_title: &str,
        subprocedure_index: usize,
        step_index: usize,
    ) -> CheckpointResult<Checkpoint> {
        let path = self.path_for(procedure_id)?;
        let checkpoint = Checkpoint {
            procedure_id: procedure_id.to_string(),
            procedure_title: procedure_title.to_string(),
            subprocedure_index,
            step_index,
            saved_at: Some(Utc::now()),
        };

        fs::create_dir_all(&self.dir)
            .map_err(|source| CheckpointError::Io { path: self.dir.clone(), source })?;

        let content = serde_json::to_string_pretty(&checkpoint)
            .map_err(|source| CheckpointError::Malformed { path: path.clone(), source })?;
        write_atomic(&self.dir, &path, content.as_bytes())?;

        tracing::debug!(
            procedure = procedure_id,
            subprocedure = subprocedure_index,
            step = step_index,
            "Checkpoint saved"
        );
        Ok(checkpoint)
    }

    /// Load the record for `procedure_id`, if there is one.
    pub fn load(&self, procedure_id: &str) -> CheckpointResult<Option<Checkpoint>> {
        let path = self.path_for(procedure_id)?;
        match fs::read_to_string(&path) {
            Ok(content) => read_checkpoint(&path, &content).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CheckpointError::Io { path, source }),
        }
    }

    /// List every record in the store, sorted by identifier.
    ///
    /// A file that cannot be read or parsed does not abort the listing; it
    /// shows up as [`CheckpointEntry::Unreadable`].
    pub fn list_all(&self) -> CheckpointResult<Vec<CheckpointEntry>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(CheckpointError::Io { path: self.dir.clone(), source }),
        };

        let mut listing = Vec::new();
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("unknown").to_string();

            let parsed = fs::read_to_string(&path)
                .map_err(|source| CheckpointError::Io { path: path.clone(), source })
                .and_then(|content| read_checkpoint(&path, &content));

            match parsed {
                Ok(checkpoint) => listing.push(CheckpointEntry::Saved(checkpoint)),
                Err(e) => {
                    tracing::warn!(path = ?path, error = %e, "Skipping unreadable checkpoint");
                    listing.push(CheckpointEntry::Unreadable {
                        procedure_id: stem,
                        reason: e.to_string(),
                    });
                }
            }
        }

        listing.sort_by(|a, b| a.procedure_id().cmp(b.procedure_id()));
        Ok(listing)
    }

    /// Remove the record for `procedure_id`. Returns whether one existed.
    pub fn delete(&self, procedure_id: &str) -> CheckpointResult<bool> {
        let path = self.path_for(procedure_id)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(procedure = procedure_id, "Checkpoint deleted");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CheckpointError::Io { path, source }),
        }
    }
}

/// Replace `path` in one rename, so an interrupted save never leaves a
/// truncated record behind.
fn write_atomic(dir: &Path, path: &Path, content: &[u8]) -> CheckpointResult<()> {
    let io_error = |source: io::Error| CheckpointError::Io { path: path.to_path_buf(), source };

    let mut file = tempfile::Builder::new()
        .prefix(".stepguide-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(io_error)?;
    file.write_all(content).map_err(io_error)?;
    file.as_file().sync_all().map_err(io_error)?;
    file.persist(path).map_err(|e| io_error(e.error))?;
    Ok(())
}

fn read_checkpoint(path: &Path, content: &str) -> CheckpointResult<Checkpoint> {
    serde_json::from_str(content)
        .map_err(|source| CheckpointError::Malformed { path: path.to_path_buf(), source })
}

/// Check that a procedure id can name a save file.
pub fn validate_id(procedure_id: &str) -> CheckpointResult<()> {
    let invalid = procedure_id.is_empty()
        || procedure_id.starts_with('.')
        || procedure_id.contains(['/', '\\', '\0'])
        || procedure_id.contains("..");
    if invalid {
        return Err(CheckpointError::InvalidId(procedure_id.to_string()));
    }
    Ok(())
}
