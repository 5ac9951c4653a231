//! Procedure library loading.
//!
//! Parses JSON or YAML procedure files into an indexed [`ProcedureLibrary`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::Procedure;
use crate::core::validate_id;

/// Result type for library operations.
pub type ProcedureResult<T> = Result<T, ProcedureError>;

/// Errors that can occur while loading procedures.
#[derive(Debug, Error)]
pub enum ProcedureError {
    /// The library file could not be read.
    #[error("Cannot read procedure library {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parse failure.
    #[error("Invalid procedure JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse failure.
    #[error("Invalid procedure YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File extension is neither JSON nor YAML.
    #[error("Unsupported procedure file format: {0:?}")]
    UnsupportedFormat(PathBuf),

    /// Two procedures share an identifier.
    #[error("Duplicate procedure id '{0}'")]
    DuplicateId(String),

    /// A procedure fails validation.
    #[error("Invalid procedure: {0}")]
    Invalid(String),
}

/// Serialization format of a library file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryFormat {
    Json,
    Yaml,
}

impl LibraryFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(Self::Json),
            Some("yaml" | "yml") => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// A file holds either a list of procedures or a single one.
#[derive(Deserialize)]
#[serde(untagged)]
enum LibraryDocument {
    Many(Vec<Procedure>),
    One(Box<Procedure>),
}

/// Procedures indexed by identifier, in document order.
#[derive(Debug, Clone, Default)]
pub struct ProcedureLibrary {
    procedures: Vec<Procedure>,
    index: HashMap<String, usize>,
}

impl ProcedureLibrary {
    /// Build a library, normalising and validating each procedure.
    pub fn from_procedures(procedures: Vec<Procedure>) -> ProcedureResult<Self> {
        let mut library = Self::default();

        for mut procedure in procedures {
            normalize(&mut procedure);
            validate_procedure(&procedure)?;

            if library.index.contains_key(&procedure.id) {
                return Err(ProcedureError::DuplicateId(procedure.id));
            }
            library.index.insert(procedure.id.clone(), library.procedures.len());
            library.procedures.push(procedure);
        }

        Ok(library)
    }

    /// Look up a procedure by identifier.
    pub fn get(&self, id: &str) -> Option<&Procedure> {
        self.index.get(id).map(|&i| &self.procedures[i])
    }

    /// Procedures in document order.
    pub fn procedures(&self) -> &[Procedure] {
        &self.procedures
    }

    /// Get the number of procedures.
    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    /// Check if the library is empty.
    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

/// Load a procedure library from a file.
pub fn load_library(path: &Path) -> ProcedureResult<ProcedureLibrary> {
    let format =
        LibraryFormat::from_path(path).ok_or_else(|| ProcedureError::UnsupportedFormat(path.to_path_buf()))?;
    let content = std::fs::read_to_string(path)
        .map_err(|source| ProcedureError::Io { path: path.to_path_buf(), source })?;

    let library = parse_library_str(&content, format)?;
    tracing::debug!(path = ?path, procedures = library.len(), "Loaded procedure library");
    Ok(library)
}

/// Parse a procedure library from a string.
pub fn parse_library_str(content: &str, format: LibraryFormat) -> ProcedureResult<ProcedureLibrary> {
    let document: LibraryDocument = match format {
        LibraryFormat::Json => serde_json::from_str(content)?,
        LibraryFormat::Yaml => serde_yaml::from_str(content)?,
    };

    let procedures = match document {
        LibraryDocument::Many(procedures) => procedures,
        LibraryDocument::One(procedure) => vec![*procedure],
    };

    ProcedureLibrary::from_procedures(procedures)
}

/// Promote prerequisites kept under metadata to the procedure itself.
fn normalize(procedure: &mut Procedure) {
    if procedure.prerequisites.is_empty() && !procedure.metadata.prerequisites.is_empty() {
        procedure.prerequisites = std::mem::take(&mut procedure.metadata.prerequisites);
    }
}

/// Validate a procedure for common errors.
fn validate_procedure(procedure: &Procedure) -> ProcedureResult<()> {
    if procedure.id.trim().is_empty() {
        return Err(ProcedureError::Invalid(format!(
            "procedure '{}' has no id",
            procedure.display_title()
        )));
    }
    validate_id(&procedure.id).map_err(|e| ProcedureError::Invalid(e.to_string()))?;

    if procedure.subprocedures.is_empty() {
        tracing::warn!(procedure = procedure.id, "Procedure has no subprocedures");
    }

    for (s, section) in procedure.subprocedures.iter().enumerate() {
        if section.steps.is_empty() {
            tracing::warn!(procedure = procedure.id, subprocedure = s, "Subprocedure has no steps");
        }
        for (i, step) in section.steps.iter().enumerate() {
            if step.instruction.trim().is_empty() {
                tracing::warn!(
                    procedure = procedure.id,
                    subprocedure = s,
                    step = i + 1,
                    "Step has no instruction"
                );
            }
        }
    }

    Ok(())
}
