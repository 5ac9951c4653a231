//! Startup dialogue: resume a saved procedure or pick a new one.

use std::io::Write;

use super::{Procedure, ProcedureLibrary};
use crate::core::{CheckpointEntry, CheckpointStore, ResumePosition};
use crate::input::{parse_choice, InputChannel};

/// What the user decided to do at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum StartupChoice<'a> {
    /// Continue a saved procedure from its checkpoint
    Resume { procedure: &'a Procedure, position: ResumePosition },

    /// Start a procedure from the beginning
    Fresh,
}

/// List saved checkpoints and let the user pick one to resume.
///
/// Any answer that does not select a resumable save falls back to
/// [`StartupChoice::Fresh`] after telling the user why.
pub fn select_startup<'a>(
    channel: &mut InputChannel,
    store: &CheckpointStore,
    library: &'a ProcedureLibrary,
) -> anyhow::Result<StartupChoice<'a>> {
    let saves = store.list_all()?;

    if saves.is_empty() {
        writeln!(channel.console(), "No saved procedures found.")?;
        return Ok(StartupChoice::Fresh);
    }

    {
        let out = channel.console();
        writeln!(out, "\nSaved procedures:")?;
        for (i, entry) in saves.iter().enumerate() {
            writeln!(out, "{}. {}", i + 1, entry.label())?;
        }
        writeln!(out, "{}. Start a new procedure", saves.len() + 1)?;
    }

    let answer = channel.get_input("Select option (number):")?;
    let Some(choice) = parse_choice(&answer).and_then(|c| usize::try_from(c).ok()) else {
        writeln!(channel.console(), "Invalid input. Starting new procedure.")?;
        return Ok(StartupChoice::Fresh);
    };

    if choice == 0 || choice > saves.len() {
        if choice != saves.len() + 1 {
            tracing::debug!(choice, "Selection out of range, starting fresh");
        }
        return Ok(StartupChoice::Fresh);
    }

    match &saves[choice - 1] {
        CheckpointEntry::Saved(checkpoint) => match library.get(&checkpoint.procedure_id) {
            Some(procedure) => {
                tracing::info!(
                    procedure = checkpoint.procedure_id,
                    subprocedure = checkpoint.subprocedure_index,
                    step = checkpoint.step_index,
                    "Resuming saved procedure"
                );
                Ok(StartupChoice::Resume { procedure, position: checkpoint.resume_position() })
            }
            None => {
                writeln!(channel.console(), "Saved procedure not found. Starting new procedure.")?;
                Ok(StartupChoice::Fresh)
            }
        },
        CheckpointEntry::Unreadable { procedure_id, reason } => {
            tracing::warn!(procedure = procedure_id, error = %reason, "Selected save is unreadable");
            writeln!(channel.console(), "Saved progress for '{procedure_id}' could not be read. Starting new procedure.")?;
            Ok(StartupChoice::Fresh)
        }
    }
}

/// Number the library and ask which procedure to run.
pub fn choose_procedure<'a>(
    channel: &mut InputChannel,
    library: &'a ProcedureLibrary,
) -> anyhow::Result<&'a Procedure> {
    let max = u32::try_from(library.len())?;
    if max == 0 {
        anyhow::bail!("The procedure library is empty");
    }

    {
        let out = channel.console();
        writeln!(out, "\nAvailable procedures:")?;
        for (i, procedure) in library.procedures().iter().enumerate() {
            writeln!(out, "{}. {}", i + 1, procedure.display_title())?;
        }
    }

    let choice = channel.get_choice("Select procedure (number):", Some(max))?;
    let index = usize::try_from(choice)? - 1;
    Ok(&library.procedures()[index])
}
