//! Procedure document definitions.
//!
//! Field aliases accept the scraped service-manual export (`full_url`,
//! `procedure_sections`, `section_title`, `tips_notes`, `llm_metadata`)
//! alongside the canonical names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A repair procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    /// Unique identifier
    pub id: String,

    /// Title of the procedure
    #[serde(default)]
    pub title: String,

    /// Source document URL
    #[serde(default, alias = "full_url", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Statements that must hold before starting
    #[serde(default)]
    pub prerequisites: Vec<String>,

    /// Ordered phases of the procedure
    #[serde(default, alias = "procedure_sections")]
    pub subprocedures: Vec<Subprocedure>,

    /// Descriptive metadata
    #[serde(default, alias = "llm_metadata")]
    pub metadata: ProcedureMetadata,
}

/// Descriptive metadata attached to a procedure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcedureMetadata {
    /// Short summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Safety warnings shown before starting
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub safety_flags: Vec<String>,

    /// Prerequisites, when the export keeps them here
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,

    /// Technical keywords
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

/// A named, ordered phase of a procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subprocedure {
    /// Name of the subprocedure
    #[serde(default, alias = "section_title")]
    pub title: String,

    /// Steps, confirmed in order
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A single instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// What to do
    #[serde(default)]
    pub instruction: String,

    /// Notes, tips and warnings
    #[serde(default, alias = "tips_notes", skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,

    /// Related links
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hyperlinks: Vec<Hyperlink>,
}

/// A labelled remark attached to a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Kind of remark
    #[serde(default, alias = "type")]
    pub label: NoteLabel,

    /// Free text
    #[serde(default)]
    pub content: String,
}

/// Note kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteLabel {
    #[serde(alias = "Tip")]
    Tip,
    #[default]
    #[serde(alias = "Note")]
    Note,
    #[serde(alias = "Caution")]
    Caution,
    #[serde(alias = "Warning")]
    Warning,
}

impl fmt::Display for NoteLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Tip => "Tip",
            Self::Note => "Note",
            Self::Caution => "Caution",
            Self::Warning => "Warning",
        };
        f.write_str(label)
    }
}

/// A link shown with a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hyperlink {
    /// Display text
    #[serde(default)]
    pub text: String,

    /// Target URL
    pub url: String,
}

impl Procedure {
    /// Title for display, with a placeholder for untitled documents.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Unknown Procedure"
        } else {
            &self.title
        }
    }

    /// Get the number of subprocedures.
    #[must_use]
    pub fn subprocedure_count(&self) -> usize {
        self.subprocedures.len()
    }

    /// Get the total number of steps across all subprocedures.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.subprocedures.iter().map(|s| s.steps.len()).sum()
    }
}

impl Subprocedure {
    /// Title for display; untitled sections are numbered by position.
    pub fn display_title(&self, index: usize) -> String {
        if self.title.trim().is_empty() {
            format!("Section {}", index + 1)
        } else {
            self.title.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_procedure() {
        let yaml = r#"
id: GUID-100
title: Hood Latch (Remove and Replace)
url: https://example.com/hood-latch.html
prerequisites:
  - Open the hood
subprocedures:
  - title: Remove
    steps:
      - instruction: Release the clips.
        notes:
          - label: caution
            content: Clips break easily.
        hyperlinks:
          - text: Torque table
            url: https://example.com/torque.html
      - instruction: Remove the latch.
"#;

        let procedure: Procedure = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(procedure.id, "GUID-100");
        assert_eq!(procedure.subprocedure_count(), 1);
        assert_eq!(procedure.step_count(), 2);

        let step = &procedure.subprocedures[0].steps[0];
        assert_eq!(step.notes[0].label, NoteLabel::Caution);
        assert_eq!(step.hyperlinks[0].text, "Torque table");
    }

    #[test]
    fn test_parse_scraped_export_shape() {
        let json = r#"{
            "id": "GUID-3854CC14",
            "full_url": "https://example.com/GUID-3854CC14.html",
            "llm_metadata": {
                "summary": "Replaces the fender.",
                "safety_flags": ["Wear gloves"],
                "prerequisites": ["Remove the wheel"]
            },
            "procedure_sections": [
                {
                    "section_title": "Remove",
                    "steps": [
                        {
                            "instruction": "Remove the bolts.",
                            "tips_notes": [{"type": "Tip", "content": "Use a 10mm socket."}]
                        }
                    ]
                }
            ]
        }"#;

        let procedure: Procedure = serde_json::from_str(json).unwrap();

        assert_eq!(procedure.url.as_deref(), Some("https://example.com/GUID-3854CC14.html"));
        assert_eq!(procedure.display_title(), "Unknown Procedure");
        assert_eq!(procedure.metadata.prerequisites, vec!["Remove the wheel"]);
        assert_eq!(procedure.subprocedures[0].title, "Remove");
        assert_eq!(procedure.subprocedures[0].steps[0].notes[0].label, NoteLabel::Tip);
    }

    #[test]
    fn test_note_label_defaults_to_note() {
        let note: Note = serde_json::from_str(r#"{"content": "Keep the screws."}"#).unwrap();
        assert_eq!(note.label, NoteLabel::Note);
        assert_eq!(note.label.to_string(), "Note");
    }

    #[test]
    fn test_untitled_subprocedure_is_numbered() {
        let section = Subprocedure { title: String::new(), steps: Vec::new() };
        assert_eq!(section.display_title(2), "Section 3");
    }
}
