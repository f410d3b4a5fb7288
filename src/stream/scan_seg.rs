/// Scan + segmentation pair streamer
use rand::seq::SliceRandom;
use rand::Rng;

use super::{batched, draw_pair, next_item, Emission, PairStream, Pull, StreamCore, StreamState};
use crate::config::StreamConfig;
use crate::data::{VolumeLoader, VolumeStream};

/// Streams `([src, tgt, src_seg], [tgt, tgt_seg, zeros, zeros])`
///
/// Scans and masks come from two independent loader sequences that must
/// stay positionally aligned. The identifiers are therefore shuffled once,
/// up front, and both sequences are requested with shuffling disabled.
pub struct ScanSegPairStreamer {
    scans: VolumeStream,
    segmentations: VolumeStream,
    core: StreamCore,
}

impl ScanSegPairStreamer {
    /// Create new streamer, shuffling `ids` in place with the thread RNG
    /// when `config.shuffle` is set
    pub fn new<L: VolumeLoader + ?Sized>(
        loader: &L,
        ids: &mut [String],
        config: &StreamConfig,
    ) -> crate::Result<Self> {
        Self::with_rng(loader, ids, config, &mut rand::thread_rng())
    }

    /// Create new streamer using `rng` for the one-off shuffle
    ///
    /// # Arguments
    /// * `loader` - Source of scans and masks
    /// * `ids` - Identifiers, permuted in place if shuffling
    /// * `config` - Volume shape plus loop/shuffle switches
    /// * `rng` - Random source for the shuffle
    pub fn with_rng<L, R>(
        loader: &L,
        ids: &mut [String],
        config: &StreamConfig,
        rng: &mut R,
    ) -> crate::Result<Self>
    where
        L: VolumeLoader + ?Sized,
        R: Rng + ?Sized,
    {
        config.validate()?;

        if config.shuffle {
            ids.shuffle(rng);
        }

        let scans = loader.preprocess_scans(ids, config.shape, config.looping, false)?;
        let segmentations =
            loader.preprocess_segmentations(ids, config.shape, config.looping, false)?;

        log::info!(
            "Scan+segmentation pair stream over {} ids ({}x{}x{}, loop={}, shuffle={})",
            ids.len(),
            config.shape.width,
            config.shape.height,
            config.shape.depth,
            config.looping,
            config.shuffle
        );

        Ok(Self {
            scans,
            segmentations,
            core: StreamCore::new(config.shape, ids.len()),
        })
    }

    fn emit(&mut self) -> crate::Result<Option<Emission>> {
        let (src_scan, tgt_scan) = match draw_pair(&mut self.scans)? {
            Some(pair) => pair,
            None => return Ok(None),
        };
        let (src_seg, tgt_seg) = match draw_pair(&mut self.segmentations)? {
            Some(pair) => pair,
            None => return Ok(None),
        };

        let shape = self.core.shape;
        let src_scan = batched(src_scan, shape)?;
        let tgt_scan = batched(tgt_scan, shape)?;
        let src_seg = batched(src_seg, shape)?;
        let tgt_seg = batched(tgt_seg, shape)?;

        Ok(Some(Emission {
            inputs: vec![src_scan, tgt_scan.clone(), src_seg],
            targets: vec![
                tgt_scan,
                tgt_seg,
                self.core.zeros.clone(),
                self.core.zeros.clone(),
            ],
        }))
    }
}

impl PairStream for ScanSegPairStreamer {
    fn next_pull(&mut self) -> crate::Result<Pull> {
        if let Some(pull) = self.core.terminal()? {
            return Ok(pull);
        }

        let outcome = self.emit();
        self.core.settle(outcome)
    }

    fn emitted(&self) -> usize {
        self.core.emitted()
    }

    fn state(&self) -> StreamState {
        self.core.state()
    }
}

impl Iterator for ScanSegPairStreamer {
    type Item = crate::Result<Emission>;

    fn next(&mut self) -> Option<Self::Item> {
        next_item(self)
    }
}
