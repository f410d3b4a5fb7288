/// Scan-only pair streamer
use super::{batched, draw_pair, next_item, Emission, PairStream, Pull, StreamCore, StreamState};
use crate::config::StreamConfig;
use crate::data::{VolumeLoader, VolumeStream};

/// Streams `([src, tgt], [tgt, zeros, zeros])` from one scan sequence
///
/// The loader's sequence is configured with the stream's own loop and
/// shuffle settings; consecutive items form each source/target pair.
pub struct ScanPairStreamer {
    scans: VolumeStream,
    core: StreamCore,
}

impl ScanPairStreamer {
    /// Create new streamer
    ///
    /// # Arguments
    /// * `loader` - Source of preprocessed scans
    /// * `ids` - Scan identifiers
    /// * `config` - Volume shape plus loop/shuffle switches
    pub fn new<L: VolumeLoader + ?Sized>(
        loader: &L,
        ids: &[String],
        config: &StreamConfig,
    ) -> crate::Result<Self> {
        config.validate()?;

        let scans = loader.preprocess_scans(ids, config.shape, config.looping, config.shuffle)?;

        log::info!(
            "Scan pair stream over {} ids ({}x{}x{}, loop={}, shuffle={})",
            ids.len(),
            config.shape.width,
            config.shape.height,
            config.shape.depth,
            config.looping,
            config.shuffle
        );

        Ok(Self {
            scans,
            core: StreamCore::new(config.shape, ids.len()),
        })
    }

    fn emit(&mut self) -> crate::Result<Option<Emission>> {
        let (src, tgt) = match draw_pair(&mut self.scans)? {
            Some(pair) => pair,
            None => return Ok(None),
        };

        let src = batched(src, self.core.shape)?;
        let tgt = batched(tgt, self.core.shape)?;

        Ok(Some(Emission {
            inputs: vec![src, tgt.clone()],
            targets: vec![tgt, self.core.zeros.clone(), self.core.zeros.clone()],
        }))
    }
}

impl PairStream for ScanPairStreamer {
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

impl Iterator for ScanPairStreamer {
    type Item = crate::Result<Emission>;

    fn next(&mut self) -> Option<Self::Item> {
        next_item(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VolumeShape;
    use crate::stream::fixtures::{ids, sentinel, sentinel_loader, value_of};
    use crate::stream::{EndOfStream, TensorPairLoader};
    use crate::VolPairError;
    use candle_core::Device;

    fn cube(side: usize) -> VolumeShape {
        VolumeShape::new(side, side, side)
    }

    #[test]
    fn test_four_ids_yield_two_pairs_then_end() -> crate::Result<()> {
        let shape = cube(2);
        let ids = ids(4);
        let loader = sentinel_loader(&ids, shape);
        let mut stream = ScanPairStreamer::new(&loader, &ids, &StreamConfig::single_pass(shape))?;

        let first = stream.next_pull()?.into_emission().unwrap();
        assert_eq!(value_of(&first.inputs[0]), sentinel("A"));
        assert_eq!(value_of(&first.inputs[1]), sentinel("B"));

        let second = stream.next_pull()?.into_emission().unwrap();
        assert_eq!(value_of(&second.inputs[0]), sentinel("C"));
        assert_eq!(value_of(&second.inputs[1]), sentinel("D"));

        match stream.next_pull()? {
            Pull::EndOfStream(end) => {
                assert_eq!(end, EndOfStream { identifiers: 4, emitted: 2 });
                assert!(end.to_string().contains('4'));
            }
            Pull::Emission(_) => panic!("expected end of stream"),
        }
        assert_eq!(stream.state(), StreamState::Exhausted);

        Ok(())
    }

    #[test]
    fn test_pair_count_is_half_the_sequence() -> crate::Result<()> {
        let shape = cube(1);

        for count in 1..=7 {
            let ids = ids(count);
            let loader = sentinel_loader(&ids, shape);
            let stream = ScanPairStreamer::new(&loader, &ids, &StreamConfig::single_pass(shape))?;

            let emissions = stream.collect::<crate::Result<Vec<_>>>()?;
            assert_eq!(emissions.len(), count / 2, "ids={}", count);
        }

        Ok(())
    }

    #[test]
    fn test_emission_layout_and_shapes() -> crate::Result<()> {
        let shape = VolumeShape::new(2, 3, 4);
        let ids = ids(2);
        let loader = sentinel_loader(&ids, shape);
        let mut stream = ScanPairStreamer::new(&loader, &ids, &StreamConfig::single_pass(shape))?;

        let emission = stream.next().unwrap()?;
        assert_eq!(emission.inputs.len(), 2);
        assert_eq!(emission.targets.len(), 3);

        for tensor in &emission.inputs {
            assert_eq!(tensor.shape(), &[1, 2, 3, 4, 1]);
        }
        assert_eq!(emission.targets[0], emission.inputs[1]);
        for zeros in &emission.targets[1..] {
            assert_eq!(zeros.shape(), &[1, 2, 3, 4, 3]);
            assert!(zeros.iter().all(|&v| v == 0.0));
        }

        Ok(())
    }

    #[test]
    fn test_end_of_stream_repeats() -> crate::Result<()> {
        let shape = cube(1);
        let ids = ids(2);
        let loader = sentinel_loader(&ids, shape);
        let mut stream = ScanPairStreamer::new(&loader, &ids, &StreamConfig::single_pass(shape))?;

        assert!(!stream.next_pull()?.is_end_of_stream());
        for _ in 0..3 {
            assert!(stream.next_pull()?.is_end_of_stream());
        }
        assert_eq!(stream.emitted(), 1);

        Ok(())
    }

    #[test]
    fn test_looping_never_ends() -> crate::Result<()> {
        let shape = cube(1);
        let ids = ids(2);
        let loader = sentinel_loader(&ids, shape);
        let config = StreamConfig {
            shape,
            looping: true,
            shuffle: false,
        };
        let mut stream = ScanPairStreamer::new(&loader, &ids, &config)?;

        for _ in 0..50 {
            let emission = stream.next_pull()?.into_emission().unwrap();
            assert_eq!(value_of(&emission.inputs[0]), sentinel("A"));
            assert_eq!(value_of(&emission.inputs[1]), sentinel("B"));
        }
        assert_eq!(stream.state(), StreamState::Running);

        Ok(())
    }

    #[test]
    fn test_shuffled_pairs_cover_every_id() -> crate::Result<()> {
        let shape = cube(1);
        let ids = ids(6);
        let loader = sentinel_loader(&ids, shape).with_seed(11);
        let config = StreamConfig {
            shape,
            looping: false,
            shuffle: true,
        };
        let stream = ScanPairStreamer::new(&loader, &ids, &config)?;

        let mut seen: Vec<f32> = Vec::new();
        for emission in stream {
            let emission = emission?;
            seen.push(value_of(&emission.inputs[0]));
            seen.push(value_of(&emission.inputs[1]));
        }
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(seen, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        Ok(())
    }

    #[test]
    fn test_shape_mismatch_faults_stream() -> crate::Result<()> {
        let ids = ids(4);
        let loader = sentinel_loader(&ids, cube(2));
        let mut stream = ScanPairStreamer::new(&loader, &ids, &StreamConfig::single_pass(cube(3)))?;

        assert!(matches!(
            stream.next_pull(),
            Err(VolPairError::ShapeMismatch { .. })
        ));
        assert_eq!(stream.state(), StreamState::Faulted);
        assert!(matches!(
            stream.next_pull(),
            Err(VolPairError::StreamFaulted(_))
        ));
        assert!(stream.next().is_none());

        Ok(())
    }

    #[test]
    fn test_loader_fault_propagates() -> crate::Result<()> {
        let shape = cube(1);
        let known = ids(1);
        let loader = sentinel_loader(&known, shape);
        let requested = ids(2);
        let config = StreamConfig::single_pass(shape);
        let mut stream = ScanPairStreamer::new(&loader, &requested, &config)?;

        assert!(matches!(stream.next_pull(), Err(VolPairError::Loader(_))));
        assert_eq!(stream.emitted(), 0);

        Ok(())
    }

    #[test]
    fn test_invalid_config_rejected() {
        let ids = ids(2);
        let loader = sentinel_loader(&ids, cube(1));
        let config = StreamConfig::single_pass(VolumeShape::new(0, 1, 1));

        assert!(matches!(
            ScanPairStreamer::new(&loader, &ids, &config),
            Err(VolPairError::Config(_))
        ));
    }

    #[test]
    fn test_oversized_shape_rejected_before_allocation() {
        let ids = ids(2);
        let loader = sentinel_loader(&ids, cube(1));
        let config = StreamConfig::single_pass(cube(1 << 21));

        assert!(matches!(
            ScanPairStreamer::new(&loader, &ids, &config),
            Err(VolPairError::Config(_))
        ));
    }

    #[test]
    fn test_tensor_batches() -> crate::Result<()> {
        let shape = cube(2);
        let ids = ids(2);
        let loader = sentinel_loader(&ids, shape);
        let mut stream = ScanPairStreamer::new(&loader, &ids, &StreamConfig::single_pass(shape))?;

        let (inputs, targets) = stream.next_batch(&Device::Cpu)?.unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(targets.len(), 3);
        assert_eq!(inputs[0].dims(), &[1, 2, 2, 2, 1]);
        assert_eq!(targets[2].dims(), &[1, 2, 2, 2, 3]);

        assert!(stream.next_batch(&Device::Cpu)?.is_none());

        Ok(())
    }
}
