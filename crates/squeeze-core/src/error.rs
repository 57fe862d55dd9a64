//! Error types for the recompression engine.

use thiserror::Error;

use crate::format::Codec;

/// Errors that abort a compression request.
///
/// An unreachable byte budget is deliberately absent: the engine always returns
/// its best attempt and callers check [`crate::CompressionResult::fits`].
#[derive(Debug, Error)]
pub enum CompressError {
    /// The source cannot be rasterized by the available primitives
    /// (vector graphics, multi-image or live-photo containers, unknown data).
    #[error("Unsupported source format: {0}")]
    UnsupportedSourceFormat(String),

    /// Bytes looked like a supported format but failed to decode.
    #[error("Corrupted or unreadable image: {0}")]
    DecodeFailure(String),

    /// The underlying codec refused to encode the pixels.
    #[error("Compression failed ({codec}): {message}")]
    EncodeFailure { codec: Codec, message: String },

    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 4), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// A search parameter is out of range.
    #[error("Invalid search configuration: {0}")]
    InvalidConfig(String),
}

impl CompressError {
    /// Build an [`CompressError::EncodeFailure`] from any displayable error.
    pub fn encode_failed(codec: Codec, message: impl ToString) -> Self {
        CompressError::EncodeFailure {
            codec,
            message: message.to_string(),
        }
    }

    /// Returns true for errors caused by the input file rather than the encoder.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CompressError::UnsupportedSourceFormat(_) | CompressError::DecodeFailure(_)
        )
    }
}
