use std::{io, path::PathBuf};

use dotmatrix_core::CartridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Cartridge(#[from] CartridgeError),

    #[error("failed to read config {path}: {source}")]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("failed to write config {path}: {source}")]
    ConfigWrite { path: PathBuf, source: io::Error },

    #[error("unknown button '{0}' (expected up, down, left, right, a, b, select or start)")]
    UnknownButton(String),

    #[error("failed to create {path}: {source}")]
    Output { path: PathBuf, source: io::Error },

    #[error("failed to encode PNG: {0}")]
    Png(#[from] png::EncodingError),
}
