//! Error types for pdfshrink library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pdfshrink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while shrinking a PDF.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted and requires a password.
    #[error("Document is encrypted")]
    Encrypted,

    /// The PDF structure is corrupted or malformed.
    #[error("Corrupted PDF structure: {0}")]
    Corrupted(String),

    /// A required PDF object is missing.
    #[error("Missing required object: {0}")]
    MissingObject(String),

    /// Error decoding an embedded image.
    #[error("Image decoding error: {0}")]
    ImageDecode(String),

    /// Error re-encoding a processed image.
    #[error("Image encoding error: {0}")]
    ImageEncode(String),

    /// The placement of an image on its page could not be resolved.
    #[error("Image placement error: {0}")]
    Placement(String),

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Invalid page range specification.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    /// An option value was rejected.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// The external compressor binary could not be started.
    #[error("Compressor not found: {}", .0.display())]
    CompressorNotFound(PathBuf),

    /// The external compressor ran but reported failure.
    #[error("Compressor exited with status {status}: {stderr}")]
    CompressorFailed { status: i32, stderr: String },

    /// Report serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageDecode(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
