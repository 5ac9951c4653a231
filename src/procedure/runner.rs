//! Procedure execution engine.
//!
//! Walks a procedure's prerequisites, subprocedures and steps, blocking on
//! an explicit confirmation after each unit and checkpointing every
//! confirmation before moving on.

use std::io::Write;

use super::{Procedure, Step, Subprocedure};
use crate::core::{CheckpointStore, ResumePosition};
use crate::input::InputChannel;

const RULE_WIDE: usize = 80;
const RULE_SECTION: usize = 50;
const RULE_STEP: usize = 30;

/// Phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Header,
    Prerequisites,
    Subprocedures,
    Footer,
    Complete,
}

/// Whether an answer counts as an explicit confirmation.
///
/// Accepts exactly "y" or anything containing "yes", ignoring case.
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    answer == "y" || answer.contains("yes")
}

/// Step-by-step executor for a single procedure.
#[derive(Debug)]
pub struct StepManager<'a> {
    /// The procedure being executed
    procedure: &'a Procedure,

    /// Where confirmations come from
    channel: &'a mut InputChannel,

    /// Where confirmations are persisted
    store: &'a CheckpointStore,

    /// Position restored from a checkpoint, if resuming
    resume: Option<ResumePosition>,

    /// Ask for prerequisites again on a resumed run
    reconfirm_prerequisites: bool,

    /// Current subprocedure index
    subprocedure_index: usize,

    /// Current step index (last confirmed, once confirmed)
    step_index: usize,

    /// Runner phase
    phase: RunPhase,
}

impl<'a> StepManager<'a> {
    /// Create a runner that starts at the beginning of the procedure.
    pub fn new(
        procedure: &'a Procedure,
        channel: &'a mut InputChannel,
        store: &'a CheckpointStore,
    ) -> Self {
        Self {
            procedure,
            channel,
            store,
            resume: None,
            reconfirm_prerequisites: false,
            subprocedure_index: 0,
            step_index: 0,
            phase: RunPhase::Header,
        }
    }

    /// Fast-forward past work confirmed in an earlier session.
    ///
    /// A resumed run skips the prerequisites phase entirely unless
    /// [`reconfirm_prerequisites`](Self::reconfirm_prerequisites) is set.
    #[must_use]
    pub fn resume_from(mut self, position: ResumePosition) -> Self {
        self.resume = Some(position);
        self.subprocedure_index = position.subprocedure_index;
        self.step_index = position.step_index;
        self
    }

    /// Ask for the prerequisites again when resuming.
    #[must_use]
    pub fn reconfirm_prerequisites(mut self, reconfirm: bool) -> Self {
        self.reconfirm_prerequisites = reconfirm;
        self
    }

    /// Get the current phase.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Current position as it would be checkpointed.
    pub fn position(&self) -> ResumePosition {
        ResumePosition::new(self.subprocedure_index, self.step_index)
    }

    /// Run the procedure to completion.
    ///
    /// On success the procedure's checkpoint is deleted. Any error leaves
    /// the last saved checkpoint in place.
    pub fn run(&mut self) -> anyhow::Result<()> {
        tracing::info!(
            procedure = self.procedure.id,
            resume = ?self.resume,
            "Starting procedure"
        );

        self.phase = RunPhase::Header;
        self.print_header()?;

        self.phase = RunPhase::Prerequisites;
        self.run_prerequisites()?;

        self.phase = RunPhase::Subprocedures;
        self.run_subprocedures()?;

        self.phase = RunPhase::Footer;
        self.print_footer()?;

        self.phase = RunPhase::Complete;
        if self.store.delete(&self.procedure.id)? {
            writeln!(self.channel.console(), "\nSave cleared as procedure is complete.")?;
        }
        tracing::info!(procedure = self.procedure.id, "Procedure complete");
        Ok(())
    }

    /// Block until the user explicitly confirms, then checkpoint.
    fn require_yes(&mut self, prompt: &str) -> anyhow::Result<()> {
        let prompt = format!("{prompt}:");
        loop {
            let answer = self.channel.get_input(&prompt)?;
            if is_affirmative(&answer) {
                self.save_state()?;
                return Ok(());
            }
            writeln!(self.channel.console(), "Please explicitly confirm by typing or saying 'yes'.")?;
        }
    }

    fn save_state(&self) -> anyhow::Result<()> {
        self.store.save(
            &self.procedure.id,
            self.procedure.display_title(),
            self.subprocedure_index,
            self.step_index,
        )?;
        Ok(())
    }

    fn print_header(&mut self) -> anyhow::Result<()> {
        let procedure = self.procedure;
        let out = self.channel.console();

        writeln!(out, "\n{}", "=".repeat(RULE_WIDE))?;
        writeln!(out, "PROCEDURE START")?;
        writeln!(out, "{}", "=".repeat(RULE_WIDE))?;
        writeln!(out, "\nTitle: {}", procedure.display_title())?;
        if let Some(ref url) = procedure.url {
            writeln!(out, "URL: {url}")?;
        }
        if let Some(ref summary) = procedure.metadata.summary {
            writeln!(out, "Summary: {summary}")?;
        }
        if !procedure.metadata.safety_flags.is_empty() {
            writeln!(out, "\nSafety:")?;
            for flag in &procedure.metadata.safety_flags {
                writeln!(out, "- {flag}")?;
            }
        }
        Ok(())
    }

    fn print_footer(&mut self) -> anyhow::Result<()> {
        let out = self.channel.console();
        writeln!(out, "\n{}", "=".repeat(RULE_WIDE))?;
        writeln!(out, "PROCEDURE COMPLETE")?;
        writeln!(out, "{}", "=".repeat(RULE_WIDE))?;
        Ok(())
    }

    fn run_prerequisites(&mut self) -> anyhow::Result<()> {
        let prerequisites = &self.procedure.prerequisites;
        if prerequisites.is_empty() {
            return Ok(());
        }

        if self.resume.is_some() && !self.reconfirm_prerequisites {
            tracing::debug!(procedure = self.procedure.id, "Prerequisites confirmed in an earlier session");
            return Ok(());
        }

        let out = self.channel.console();
        writeln!(out, "\n--- STEP 0: PREREQUISITES ---")?;
        for (i, item) in prerequisites.iter().enumerate() {
            writeln!(out, "{}. {}", i + 1, item)?;
        }

        self.require_yes("Have all prerequisites been reviewed and satisfied")
    }

    fn run_subprocedures(&mut self) -> anyhow::Result<()> {
        let procedure = self.procedure;
        let first = self.resume.map_or(0, |r| r.subprocedure_index);
        let first_step = self.resume.map_or(0, |r| r.first_step());

        if first >= procedure.subprocedures.len() && self.resume.is_some() {
            tracing::warn!(
                procedure = procedure.id,
                subprocedure = first,
                "Resume position is past the last subprocedure"
            );
        }

        for (index, section) in procedure.subprocedures.iter().enumerate().skip(first) {
            let start_step = if index == first { first_step } else { 0 };
            self.subprocedure_index = index;
            self.run_single_subprocedure(section, index, start_step)?;
        }

        Ok(())
    }

    fn run_single_subprocedure(
        &mut self,
        section: &Subprocedure,
        index: usize,
        start_step: usize,
    ) -> anyhow::Result<()> {
        let title = section.display_title(index);

        let out = self.channel.console();
        writeln!(out, "\n{}", "=".repeat(RULE_SECTION))?;
        writeln!(out, "SUBPROCEDURE: {title}")?;
        writeln!(out, "{}", "=".repeat(RULE_SECTION))?;

        tracing::debug!(
            procedure = self.procedure.id,
            subprocedure = index,
            start_step = start_step,
            "Entering subprocedure"
        );

        for (step_index, step) in section.steps.iter().enumerate().skip(start_step) {
            self.step_index = step_index;
            self.run_single_step(step_index + 1, step)?;
        }

        self.step_index = 0;
        self.require_yes(&format!(
            "Subprocedure '{title}' completed. Confirm before moving to the next subprocedure"
        ))
    }

    fn run_single_step(&mut self, step_number: usize, step: &Step) -> anyhow::Result<()> {
        let out = self.channel.console();

        writeln!(out, "\n{}", "=".repeat(RULE_STEP))?;
        writeln!(out, "Step {step_number}")?;
        writeln!(out, "{}", step.instruction.trim())?;

        let notes: Vec<_> = step.notes.iter().filter(|n| !n.content.trim().is_empty()).collect();
        if !notes.is_empty() {
            writeln!(out, "\nNotes / Tips:")?;
            for note in notes {
                writeln!(out, "- {}: {}", note.label, note.content.trim())?;
            }
        }

        if !step.hyperlinks.is_empty() {
            writeln!(out, "\nRelated Links:")?;
            for link in &step.hyperlinks {
                writeln!(out, "- {}: {}", link.text, link.url)?;
            }
        }

        self.require_yes(&format!("Finished step {step_number}"))
    }
}

/// Print a procedure's structure without running it.
pub fn write_outline(out: &mut impl Write, procedure: &Procedure) -> std::io::Result<()> {
    writeln!(out, "{} [{}]", procedure.display_title(), procedure.id)?;
    if let Some(ref url) = procedure.url {
        writeln!(out, "URL: {url}")?;
    }
    writeln!(
        out,
        "{} subprocedure(s), {} step(s)",
        procedure.subprocedure_count(),
        procedure.step_count()
    )?;

    if !procedure.prerequisites.is_empty() {
        writeln!(out, "\nPrerequisites:")?;
        for (i, item) in procedure.prerequisites.iter().enumerate() {
            writeln!(out, "  {}. {}", i + 1, item)?;
        }
    }

    for (index, section) in procedure.subprocedures.iter().enumerate() {
        writeln!(out, "\n{}. {}", index + 1, section.display_title(index))?;
        for (i, step) in section.steps.iter().enumerate() {
            writeln!(out, "   {}. {}", i + 1, step.instruction.trim())?;
        }
    }

    Ok(())
}
