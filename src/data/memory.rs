/// In-memory volume loader
use std::collections::HashMap;
use std::sync::Arc;

use super::{Volume, VolumeLoader, VolumeSequence, VolumeStream};
use crate::config::VolumeShape;

/// Loader serving pre-built volumes from memory
///
/// Useful for tests and for datasets small enough to keep resident.
/// Volumes are cloned out on every draw, so the stream never aliases the
/// stored data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVolumeLoader {
    scans: Arc<HashMap<String, Volume>>,
    segmentations: Arc<HashMap<String, Volume>>,
    seed: Option<u64>,
}

impl InMemoryVolumeLoader {
    /// Create new loader from scan and segmentation maps
    pub fn new(scans: HashMap<String, Volume>, segmentations: HashMap<String, Volume>) -> Self {
        Self {
            scans: Arc::new(scans),
            segmentations: Arc::new(segmentations),
            seed: None,
        }
    }

    /// Fix the shuffle seed of every stream this loader creates
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of scans held
    pub fn len(&self) -> usize {
        self.scans.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    fn stream(
        &self,
        volumes: &Arc<HashMap<String, Volume>>,
        kind: &'static str,
        ids: &[String],
        looping: bool,
        shuffle: bool,
    ) -> VolumeStream {
        let volumes = Arc::clone(volumes);
        let read = move |id: &str| {
            volumes
                .get(id)
                .cloned()
                .ok_or_else(|| {
                    crate::VolPairError::Loader(format!("no {} for identifier '{}'", kind, id))
                })
        };

        Box::new(VolumeSequence::new(ids.to_vec(), looping, shuffle, self.seed, read))
    }
}

impl VolumeLoader for InMemoryVolumeLoader {
    fn preprocess_scans(
        &self,
        ids: &[String],
        shape: VolumeShape,
        looping: bool,
        shuffle: bool,
    ) -> crate::Result<VolumeStream> {
        log::debug!("In-memory scan stream over {} ids, target {:?}", ids.len(), shape);
        Ok(self.stream(&self.scans, "scan", ids, looping, shuffle))
    }

    fn preprocess_segmentations(
        &self,
        ids: &[String],
        shape: VolumeShape,
        looping: bool,
        shuffle: bool,
    ) -> crate::Result<VolumeStream> {
        log::debug!("In-memory segmentation stream over {} ids, target {:?}", ids.len(), shape);
        Ok(self.stream(&self.segmentations, "segmentation", ids, looping, shuffle))
    }
}
