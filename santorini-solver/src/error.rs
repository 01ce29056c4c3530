//! Error types for checkpoints and configuration.

use std::io;
use std::path::PathBuf;

use santorini_core::DecodeError;
use thiserror::Error;

/// Errors reading or writing a checkpoint file.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid checkpoint magic: {found:?}")]
    BadMagic { found: [u8; 4] },

    #[error("unsupported checkpoint version: {0}")]
    UnsupportedVersion(u32),

    #[error("checkpoint checksum mismatch: stored {stored:#018x}, computed {computed:#018x}")]
    ChecksumMismatch { stored: u64, computed: u64 },

    #[error("invalid label {label} for key {key:#x}")]
    InvalidLabel { key: u128, label: i8 },

    #[error("checkpoint key {key:#x} is not a position")]
    InvalidKey {
        key: u128,
        #[source]
        source: DecodeError,
    },
}

/// Errors loading solver configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value {value:?} for {key}")]
    InvalidOverride { key: &'static str, value: String },
}
