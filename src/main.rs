//! Stepguide - checkpointed, hands-free repair procedure walkthroughs.
//!
//! Presents a procedure one step at a time, waits for an explicit "yes"
//! after each one and saves progress so interrupted sessions can resume.

#![allow(clippy::single_match_else)]

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stepguide::core::{CheckpointEntry, CheckpointStore, Config};
use stepguide::input::{Console, InputChannel, InputError, InputMode};
use stepguide::procedure::{
    choose_procedure, load_library, select_startup, write_outline, Procedure, ProcedureLibrary,
    StartupChoice, StepManager,
};
use stepguide::ResumePosition;

/// Checkpointed, hands-free repair procedure walkthroughs
#[derive(Parser)]
#[command(name = "stepguide")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (skips the usual lookup)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Input mode to start in
    #[arg(short, long, global = true, env = "STEPGUIDE_INPUT_MODE")]
    mode: Option<InputMode>,

    /// Procedure library file (JSON or YAML)
    #[arg(long, global = true, env = "STEPGUIDE_PROCEDURES")]
    procedures: Option<PathBuf>,

    /// Directory holding saved progress
    #[arg(long, global = true, env = "STEPGUIDE_SAVES_DIR")]
    saves_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk through a procedure (default)
    Start {
        /// Procedure to run; resumes its saved progress if there is any
        procedure_id: Option<String>,

        /// Discard saved progress and start from the beginning
        #[arg(long, requires = "procedure_id")]
        fresh: bool,
    },

    /// List the procedures in the library
    Procedures {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print a procedure's outline without running it
    Show {
        /// Procedure identifier
        procedure_id: String,
    },

    /// List saved progress
    Saves {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Delete saved progress for a procedure
    Clear {
        /// Procedure identifier
        procedure_id: String,
    },

    /// Show the effective configuration
    Config {
        /// Show the config directory path instead
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; stdout carries the dialogue, so logs go to stderr
    let filter = if cli.verbose { EnvFilter::new("debug") } else { EnvFilter::new("warn") };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    if let Some(Commands::Completions { shell }) = cli.command {
        cmd_completions(shell);
        return Ok(());
    }

    let config = load_config(&cli)?;

    match cli.command {
        None => cmd_start(&config, None, false)?,
        Some(Commands::Start { procedure_id, fresh }) => {
            cmd_start(&config, procedure_id.as_deref(), fresh)?;
        }
        Some(Commands::Procedures { format }) => {
            cmd_procedures(&config, &format)?;
        }
        Some(Commands::Show { procedure_id }) => {
            cmd_show(&config, &procedure_id)?;
        }
        Some(Commands::Saves { format }) => {
            cmd_saves(&config, &format)?;
        }
        Some(Commands::Clear { procedure_id }) => {
            cmd_clear(&config, &procedure_id)?;
        }
        Some(Commands::Config { path }) => {
            cmd_config(&config, path)?;
        }
        Some(Commands::Completions { .. }) => {}
    }

    Ok(())
}

/// Load the configuration and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config {
        Some(ref path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };

    if let Some(mode) = cli.mode {
        config.general.input_mode = mode;
    }
    if let Some(ref path) = cli.procedures {
        config.paths.procedures = Some(path.to_string_lossy().into_owned());
    }
    if let Some(ref dir) = cli.saves_dir {
        config.paths.saves_dir = Some(dir.to_string_lossy().into_owned());
    }

    Ok(config)
}

fn open_library(config: &Config) -> Result<ProcedureLibrary> {
    let path = config.procedures_path();
    load_library(&path).with_context(|| {
        format!("Could not load procedures from {} (set --procedures or [paths] procedures)", path.display())
    })
}

fn find_procedure<'a>(library: &'a ProcedureLibrary, procedure_id: &str) -> Result<&'a Procedure> {
    library
        .get(procedure_id)
        .ok_or_else(|| anyhow::anyhow!("No procedure with id '{procedure_id}' in the library"))
}

/// Build the input channel described by the configuration.
fn build_channel(config: &Config) -> InputChannel {
    let mut channel = InputChannel::new(config.general.input_mode, Console::stdio())
        .with_voice_sentinel(config.general.voice_sentinel.clone());

    if let Some(speech) = config.speech() {
        channel = channel.with_speech(Box::new(speech));
    }

    channel
}

/// Walk through a procedure, resuming saved progress where appropriate.
fn cmd_start(config: &Config, procedure_id: Option<&str>, fresh: bool) -> Result<()> {
    let library = open_library(config)?;
    let store = CheckpointStore::new(config.saves_dir());
    let mut channel = build_channel(config);

    ctrlc::set_handler(|| {
        eprintln!("\nInterrupted. Progress is kept at the last confirmed step.");
        std::process::exit(130);
    })?;

    let (procedure, resume) = match procedure_id {
        Some(id) => {
            let procedure = find_procedure(&library, id)?;
            (procedure, direct_resume(&store, procedure, fresh)?)
        }
        None => match select_startup(&mut channel, &store, &library)? {
            StartupChoice::Resume { procedure, position } => (procedure, Some(position)),
            StartupChoice::Fresh => (choose_procedure(&mut channel, &library)?, None),
        },
    };

    let mut manager = StepManager::new(procedure, &mut channel, &store)
        .reconfirm_prerequisites(config.general.reconfirm_prerequisites_on_resume);
    if let Some(position) = resume {
        manager = manager.resume_from(position);
    }

    match manager.run() {
        Ok(()) => Ok(()),
        Err(e) if matches!(e.downcast_ref::<InputError>(), Some(InputError::Closed)) => {
            anyhow::bail!("Input closed before the procedure finished. Progress is kept at the last confirmed step.")
        }
        Err(e) => Err(e),
    }
}

/// Resume point for `start <ID>`, discarding it first with `--fresh`.
fn direct_resume(
    store: &CheckpointStore,
    procedure: &Procedure,
    fresh: bool,
) -> Result<Option<ResumePosition>> {
    if fresh {
        if store.delete(&procedure.id)? {
            println!("Discarded saved progress for '{}'.", procedure.display_title());
        }
        return Ok(None);
    }

    match store.load(&procedure.id) {
        Ok(Some(checkpoint)) => {
            println!(
                "Resuming '{}' (step {}).",
                procedure.display_title(),
                checkpoint.next_step_display()
            );
            tracing::info!(
                procedure = procedure.id,
                subprocedure = checkpoint.subprocedure_index,
                step = checkpoint.step_index,
                "Resuming saved procedure"
            );
            Ok(Some(checkpoint.resume_position()))
        }
        Ok(None) => Ok(None),
        Err(e) => {
            tracing::warn!(procedure = procedure.id, error = %e, "Ignoring unreadable save");
            println!("Saved progress could not be read. Starting from the beginning.");
            Ok(None)
        }
    }
}

#[derive(Serialize)]
struct ProcedureSummary<'a> {
    id: &'a str,
    title: &'a str,
    subprocedures: usize,
    steps: usize,
}

/// List library procedures.
fn cmd_procedures(config: &Config, format: &str) -> Result<()> {
    let library = open_library(config)?;

    match format {
        "json" => {
            let summaries: Vec<_> = library
                .procedures()
                .iter()
                .map(|p| ProcedureSummary {
                    id: &p.id,
                    title: p.display_title(),
                    subprocedures: p.subprocedure_count(),
                    steps: p.step_count(),
                })
                .collect();
            let json = serde_json::to_string_pretty(&summaries)?;
            println!("{json}");
        }
        _ => {
            for procedure in library.procedures() {
                println!(
                    "{} - {} ({} steps)",
                    procedure.id,
                    procedure.display_title(),
                    procedure.step_count()
                );
            }
            println!("\nTotal: {} procedures", library.len());
        }
    }

    Ok(())
}

/// Print a procedure outline.
fn cmd_show(config: &Config, procedure_id: &str) -> Result<()> {
    let library = open_library(config)?;
    let procedure = find_procedure(&library, procedure_id)?;

    let mut stdout = io::stdout().lock();
    write_outline(&mut stdout, procedure)?;
    stdout.flush()?;

    Ok(())
}

/// List saved progress.
fn cmd_saves(config: &Config, format: &str) -> Result<()> {
    let store = CheckpointStore::new(config.saves_dir());
    let saves = store.list_all()?;

    match format {
        "json" => {
            let records: Vec<_> = saves
                .iter()
                .map(|entry| match entry {
                    CheckpointEntry::Saved(checkpoint) => serde_json::to_value(checkpoint),
                    CheckpointEntry::Unreadable { procedure_id, reason } => {
                        Ok(serde_json::json!({ "procedure_id": procedure_id, "error": reason }))
                    }
                })
                .collect::<Result<_, _>>()?;
            let json = serde_json::to_string_pretty(&records)?;
            println!("{json}");
        }
        _ => {
            if saves.is_empty() {
                println!("No saved procedures found.");
                return Ok(());
            }

            for entry in &saves {
                match entry {
                    CheckpointEntry::Saved(checkpoint) => {
                        let saved = checkpoint
                            .saved_display()
                            .map(|s| format!(" (saved {s})"))
                            .unwrap_or_default();
                        println!("{}  {}{}", checkpoint.procedure_id, entry.label(), saved);
                    }
                    CheckpointEntry::Unreadable { procedure_id, reason } => {
                        println!("{procedure_id}  unreadable: {reason}");
                    }
                }
            }
            println!("\nTotal: {} saved", saves.len());
        }
    }

    Ok(())
}

/// Delete saved progress.
fn cmd_clear(config: &Config, procedure_id: &str) -> Result<()> {
    let store = CheckpointStore::new(config.saves_dir());

    if store.delete(procedure_id)? {
        println!("Cleared saved progress for '{procedure_id}'.");
    } else {
        println!("No saved progress for '{procedure_id}'.");
    }

    Ok(())
}

/// Show configuration.
fn cmd_config(config: &Config, show_path: bool) -> Result<()> {
    if show_path {
        if let Some(path) = Config::config_dir() {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let toml = toml::to_string_pretty(config)?;
    println!("{toml}");

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "stepguide", &mut io::stdout());
}
