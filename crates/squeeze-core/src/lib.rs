//! Squeeze Core - Adaptive raster recompression engine
//!
//! Given a decoded image and an [`OutputContract`] (format, quality policy,
//! optional byte budget, optional maximum dimensions), produces the encoding
//! that best satisfies the size/quality trade-off, using only an opaque
//! "encode at quality Q" primitive ([`Encoder`]).
//!
//! ```ignore
//! use squeeze_core::{compress, progress::no_progress, OutputContract, RasterEncoder, SearchConfig};
//!
//! let source = squeeze_core::decode_source(&bytes, "photo.jpg", "image/jpeg")?;
//! let contract = OutputContract::new().with_target_bytes(500_000);
//! let result = compress(&source, &contract, &RasterEncoder::new(), &SearchConfig::default(), &mut no_progress())?;
//! ```

pub mod compress;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod format;
pub mod guard;
pub mod progress;
pub mod resize;
pub mod search;
mod types;

#[cfg(test)]
mod test_support;

pub use compress::{compress, compress_file};
pub use config::{Mode, OutputContract, SearchConfig};
pub use decode::{decode_source, Orientation};
pub use encode::{Encoder, RasterEncoder};
pub use error::CompressError;
pub use format::{resolve, resolve_output, Codec, OutputFormat, ResolvedFormat, SourceFormat};
pub use progress::{Phase, Progress};
pub use resize::{fit_within, rescale, FilterType, MIN_DIMENSION};
pub use search::{SearchOutcome, Strategy};
pub use types::{CompressionResult, EncodeAttempt, PixelBuffer, SourceImage};
