/// Volume loading for the pair streamers
pub mod memory;
pub mod npy_loader;
pub mod sequence;

pub use memory::InMemoryVolumeLoader;
pub use npy_loader::{DatasetManifest, NpyVolumeLoader};
pub use sequence::VolumeSequence;

use ndarray::Array3;

use crate::config::VolumeShape;

/// Single-channel 3-D volume laid out as (width, height, depth)
pub type Volume = Array3<f32>;

/// Per-volume bookkeeping produced alongside each loaded volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMetadata {
    /// Identifier the volume was loaded for
    pub identifier: String,
    /// Position within the current pass
    pub position: usize,
    /// Completed passes over the identifier list
    pub epoch: usize,
}

/// Lazy, pull-based sequence of loaded volumes
pub type VolumeStream = Box<dyn Iterator<Item = crate::Result<(Volume, VolumeMetadata)>>>;

/// Source of preprocessed scans and segmentation masks
pub trait VolumeLoader {
    /// Lazy sequence of scan volumes for `ids`
    fn preprocess_scans(
        &self,
        ids: &[String],
        shape: VolumeShape,
        looping: bool,
        shuffle: bool,
    ) -> crate::Result<VolumeStream>;

    /// Lazy sequence of segmentation masks for `ids`
    fn preprocess_segmentations(
        &self,
        ids: &[String],
        shape: VolumeShape,
        looping: bool,
        shuffle: bool,
    ) -> crate::Result<VolumeStream>;
}
