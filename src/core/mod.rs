//! Core types shared by the executor and the command line.
//!
//! This module contains configuration and the checkpoint store that makes
//! every confirmation durable.

mod checkpoint;
mod config;

pub use checkpoint::{
    Checkpoint, CheckpointEntry, CheckpointError, CheckpointResult, CheckpointStore,
    ResumePosition, validate_id,
};
pub use config::{Config, GeneralConfig, PathsConfig, VoiceConfig};
