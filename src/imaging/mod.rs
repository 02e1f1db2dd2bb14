//! Pixel work: decoding image XObjects, converting them to gray,
//! shrinking them and encoding the result.

mod decode;
mod encode;
mod resample;

pub use decode::decode_image;
pub use encode::{encode_gray_stream, replace_image};
pub use resample::{downsample, fit_within, to_grayscale, ResampleFilter};

use crate::error::Error;

/// Why an image stream could not be turned into pixels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The stream uses a filter or color space we do not handle.
    #[error("unsupported {0}")]
    Unsupported(String),
    /// The stream claims a supported encoding but its data is broken.
    #[error("{0}")]
    Invalid(String),
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        Error::ImageDecode(err.to_string())
    }
}
