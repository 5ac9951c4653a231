//! # Stepguide
//!
//! Checkpointed, hands-free walkthroughs of repair procedures.
//!
//! Stepguide presents a procedure one step at a time and waits for an
//! explicit "yes" before moving on. Every confirmation is saved, so an
//! interrupted session picks up where it stopped.
//!
//! ## Features
//!
//! - **Confirmation Gate**: Nothing advances without an explicit "yes"
//! - **Checkpoints**: Progress survives crashes and restarts
//! - **Text or Voice**: Type answers, or say them through a configurable recorder
//! - **Procedure Libraries**: JSON or YAML, including scraped service-manual exports
//!
//! ## Quick Start
//!
//! ```bash
//! # Walk through a procedure
//! stepguide start
//!
//! # Resume or start a specific one
//! stepguide start GUID-3854CC14
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::cast_possible_truncation)]

pub mod core;
pub mod input;
pub mod procedure;

// Re-export commonly used types
pub use core::{Checkpoint, CheckpointStore, Config, ResumePosition};
pub use input::{InputChannel, InputMode};
pub use procedure::{Procedure, ProcedureLibrary, StepManager};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "stepguide";
