//! Paired-sample streaming
//!
//! Turns the flat volume sequences produced by a [`VolumeLoader`] into an
//! endless stream of `(inputs, targets)` emissions for a two-branch
//! registration model. Items `2k` and `2k + 1` of a sequence form the
//! source/target pair of emission `k`.
//!
//! Consumers pull with [`PairStream::next_pull`]. Exhaustion of a
//! non-looping sequence is reported as [`Pull::EndOfStream`], a value
//! distinct from genuine faults, which arrive as `Err`.
//!
//! [`VolumeLoader`]: crate::data::VolumeLoader

pub mod emission;
pub mod scan;
pub mod scan_seg;

pub use emission::{batched, to_tensor, zero_flow, Emission};
pub use scan::ScanPairStreamer;
pub use scan_seg::ScanSegPairStreamer;

use candle_core::{Device, Tensor};
use std::fmt;

use crate::config::VolumeShape;
use crate::data::{Volume, VolumeStream};
use crate::VolPairError;

/// Terminal marker returned once the underlying sequence runs dry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfStream {
    /// Size of the identifier collection the stream was built from
    pub identifiers: usize,
    /// Emissions produced before the end
    pub emitted: usize,
}

impl fmt::Display for EndOfStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Completed iteration over the {} scans", self.identifiers)
    }
}

/// Outcome of one pull
#[derive(Debug, Clone, PartialEq)]
pub enum Pull {
    Emission(Emission),
    EndOfStream(EndOfStream),
}

impl Pull {
    pub fn into_emission(self) -> Option<Emission> {
        match self {
            Pull::Emission(emission) => Some(emission),
            Pull::EndOfStream(_) => None,
        }
    }

    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Pull::EndOfStream(_))
    }
}

/// Lifecycle of a pair streamer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Drawing and emitting pairs
    Running,
    /// Sequence exhausted, every further pull repeats the end marker
    Exhausted,
    /// A draw failed mid-pair; positional alignment is lost
    Faulted,
}

/// Pull-based source of emissions
pub trait PairStream {
    /// Produce the next emission or the end-of-stream marker
    fn next_pull(&mut self) -> crate::Result<Pull>;

    /// Emissions produced so far
    fn emitted(&self) -> usize;

    /// Current lifecycle state
    fn state(&self) -> StreamState;
}

/// Candle-facing batch loader
pub trait TensorPairLoader {
    /// Next `(inputs, targets)` as tensors, `None` once the stream ends
    fn next_batch(&mut self, device: &Device) -> crate::Result<Option<(Vec<Tensor>, Vec<Tensor>)>>;
}

impl<S: PairStream> TensorPairLoader for S {
    fn next_batch(&mut self, device: &Device) -> crate::Result<Option<(Vec<Tensor>, Vec<Tensor>)>> {
        match self.next_pull()? {
            Pull::Emission(emission) => Ok(Some(emission.to_tensors(device)?)),
            Pull::EndOfStream(_) => Ok(None),
        }
    }
}

/// Bookkeeping shared by both streamers
#[derive(Debug)]
pub(crate) struct StreamCore {
    pub(crate) shape: VolumeShape,
    pub(crate) zeros: ndarray::Array5<f32>,
    identifiers: usize,
    emitted: usize,
    state: StreamState,
    fault: Option<String>,
}

impl StreamCore {
    pub(crate) fn new(shape: VolumeShape, identifiers: usize) -> Self {
        Self {
            shape,
            zeros: zero_flow(shape),
            identifiers,
            emitted: 0,
            state: StreamState::Running,
            fault: None,
        }
    }

    pub(crate) fn emitted(&self) -> usize {
        self.emitted
    }

    pub(crate) fn state(&self) -> StreamState {
        self.state
    }

    fn end_of_stream(&self) -> EndOfStream {
        EndOfStream {
            identifiers: self.identifiers,
            emitted: self.emitted,
        }
    }

    /// Short-circuit pulls on a stream that already ended
    pub(crate) fn terminal(&self) -> crate::Result<Option<Pull>> {
        match self.state {
            StreamState::Running => Ok(None),
            StreamState::Exhausted => Ok(Some(Pull::EndOfStream(self.end_of_stream()))),
            StreamState::Faulted => Err(VolPairError::StreamFaulted(
                self.fault.clone().unwrap_or_default(),
            )),
        }
    }

    /// Record the outcome of one draw-and-emit attempt
    pub(crate) fn settle(
        &mut self,
        outcome: crate::Result<Option<Emission>>,
    ) -> crate::Result<Pull> {
        match outcome {
            Ok(Some(emission)) => {
                self.emitted += 1;
                log::debug!("Emitted pair {}", self.emitted);
                Ok(Pull::Emission(emission))
            }
            Ok(None) => {
                self.state = StreamState::Exhausted;
                let end = self.end_of_stream();
                log::info!("{} ({} pairs emitted)", end, end.emitted);
                Ok(Pull::EndOfStream(end))
            }
            Err(e) => {
                self.state = StreamState::Faulted;
                self.fault = Some(e.to_string());
                log::error!("Pair stream faulted after {} pairs: {}", self.emitted, e);
                Err(e)
            }
        }
    }
}

/// Draw the next two consecutive volumes, `None` if the sequence ends first
pub(crate) fn draw_pair(stream: &mut VolumeStream) -> crate::Result<Option<(Volume, Volume)>> {
    let src = match stream.next() {
        Some(item) => item?.0,
        None => return Ok(None),
    };
    let tgt = match stream.next() {
        Some(item) => item?.0,
        None => return Ok(None),
    };
    Ok(Some((src, tgt)))
}

/// Iterator adapter: ends at end-of-stream and after the first fault
pub(crate) fn next_item<S: PairStream + ?Sized>(stream: &mut S) -> Option<crate::Result<Emission>> {
    if stream.state() == StreamState::Faulted {
        return None;
    }

    match stream.next_pull() {
        Ok(Pull::Emission(emission)) => Some(Ok(emission)),
        Ok(Pull::EndOfStream(_)) => None,
        Err(e) => Some(Err(e)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_of_stream_message_names_identifier_count() {
        let end = EndOfStream {
            identifiers: 4,
            emitted: 2,
        };
        assert_eq!(end.to_string(), "Completed iteration over the 4 scans");
    }

    #[test]
    fn test_core_exhaustion_is_terminal() -> crate::Result<()> {
        let mut core = StreamCore::new(VolumeShape::new(1, 1, 1), 3);
        assert!(core.terminal()?.is_none());

        let pull = core.settle(Ok(None))?;
        assert!(pull.is_end_of_stream());
        assert_eq!(core.state(), StreamState::Exhausted);

        let again = core.terminal()?.unwrap();
        assert_eq!(
            again,
            Pull::EndOfStream(EndOfStream {
                identifiers: 3,
                emitted: 0
            })
        );

        Ok(())
    }

    #[test]
    fn test_core_fault_is_sticky() {
        let mut core = StreamCore::new(VolumeShape::new(1, 1, 1), 2);

        let result = core.settle(Err(VolPairError::Loader("disk gone".to_string())));
        assert!(matches!(result, Err(VolPairError::Loader(_))));
        assert_eq!(core.state(), StreamState::Faulted);

        match core.terminal() {
            Err(VolPairError::StreamFaulted(message)) => assert!(message.contains("disk gone")),
            other => panic!("expected StreamFaulted, got {:?}", other),
        }
    }

    #[test]
    fn test_draw_pair_drops_dangling_source() -> crate::Result<()> {
        use crate::data::VolumeLoader;

        let shape = VolumeShape::new(1, 1, 1);
        let ids = fixtures::ids(3);
        let loader = fixtures::sentinel_loader(&ids, shape);
        let mut stream = loader.preprocess_scans(&ids, shape, false, false)?;

        assert!(draw_pair(&mut stream)?.is_some());
        assert!(draw_pair(&mut stream)?.is_none());

        Ok(())
    }
}
