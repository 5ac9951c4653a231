//! Guided procedures.
//!
//! A procedure is an ordered list of subprocedures, each an ordered list of
//! steps, preceded by prerequisites. Procedures are loaded from a JSON or
//! YAML library and executed one confirmation at a time by a
//! [`StepManager`].
//!
//! ## Example Library
//!
//! ```yaml
//! - id: GUID-3854CC14
//!   title: Fascia - Front Bumper (Remove and Replace)
//!   prerequisites:
//!     - Raise and support the vehicle
//!   subprocedures:
//!     - title: Remove
//!       steps:
//!         - instruction: Remove the splash shield.
//!           notes:
//!             - label: caution
//!               content: The clips are single use.
//! ```

mod parser;
mod runner;
mod schema;
mod session;

pub use parser::{
    load_library, parse_library_str, LibraryFormat, ProcedureError, ProcedureLibrary,
    ProcedureResult,
};
pub use runner::{is_affirmative, write_outline, RunPhase, StepManager};
pub use schema::{Hyperlink, Note, NoteLabel, Procedure, ProcedureMetadata, Step, Subprocedure};
pub use session::{choose_procedure, select_startup, StartupChoice};
