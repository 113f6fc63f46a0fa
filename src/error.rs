use std::path::PathBuf;
use thiserror::Error;

/// Failures while extracting embedded metadata from a card container.
///
/// A single bad chunk fails the whole decode: accepting the remaining
/// chunks could silently hand corrupted metadata downstream.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("bad or missing card signature: {0}")]
    Format(String),
    #[error("integrity check failed for chunk {chunk_type}")]
    Integrity { chunk_type: String },
    #[error("no text metadata chunk present")]
    NotFound,
    #[error("metadata payload undecodable: {0}")]
    Encoding(String),
}

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("card source directory missing: {}", .0.display())]
    DirectoryMissing(PathBuf),
    #[error("companion tag document missing: {}", .0.display())]
    ExternalStoreMissing(PathBuf),
}
