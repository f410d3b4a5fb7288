//! volpair - paired volumetric scan streaming
//!
//! Feeds registration-style models with endless `(inputs, targets)` pairs
//! built from preprocessed 3-D scans and, optionally, their segmentation
//! masks.
//!
//! # Architecture
//!
//! - **Loader**: a [`data::VolumeLoader`] produces lazy volume sequences
//!   with configurable looping and shuffling
//! - **Pair streamers**: [`stream::ScanPairStreamer`] and
//!   [`stream::ScanSegPairStreamer`] pair consecutive volumes and shape
//!   them into `(1, w, h, d, 1)` tensors plus zero flow placeholders
//!
//! # Example
//!
//! ```ignore
//! use volpair::{StreamConfig, VolumeShape};
//! use volpair::data::NpyVolumeLoader;
//! use volpair::stream::{PairStream, Pull, ScanPairStreamer};
//!
//! let loader = NpyVolumeLoader::new("data/lungs")?;
//! let ids = loader.identifiers()?;
//! let config = StreamConfig::single_pass(VolumeShape::new(64, 64, 64));
//! let mut stream = ScanPairStreamer::new(&loader, &ids, &config)?;
//!
//! while let Pull::Emission(emission) = stream.next_pull()? {
//!     // feed emission.inputs / emission.targets to the model
//! }
//! ```

pub mod config;
pub mod data;
pub mod stream;

// Re-export commonly used items
pub use config::{StreamConfig, VolumeShape};
pub use stream::{Emission, EndOfStream, PairStream, Pull, ScanPairStreamer, ScanSegPairStreamer};

/// Library error types
#[derive(Debug, thiserror::Error)]
pub enum VolPairError {
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize, usize),
        actual: Vec<usize>,
    },

    #[error("Loader error: {0}")]
    Loader(String),

    #[error("NumPy error: {0}")]
    Npy(String),

    #[error("Stream faulted earlier: {0}")]
    StreamFaulted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VolPairError>;
