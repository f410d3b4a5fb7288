/// Restartable lazy sequence over an identifier list
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::{Volume, VolumeMetadata};

/// Lazy sequence that reads one volume per identifier on demand
///
/// Traversal follows the identifier order, or a fresh random permutation
/// on every pass when shuffling. With `looping` the sequence wraps back to
/// the start forever; otherwise it ends after one pass. Nothing is cached.
pub struct VolumeSequence<F> {
    ids: Vec<String>,
    order: Vec<usize>,
    cursor: usize,
    epoch: usize,
    looping: bool,
    shuffle: bool,
    rng: StdRng,
    read: F,
}

impl<F> VolumeSequence<F>
where
    F: FnMut(&str) -> crate::Result<Volume>,
{
    /// Create new sequence
    ///
    /// # Arguments
    /// * `ids` - Identifiers in their base traversal order
    /// * `looping` - Wrap around after the last identifier
    /// * `shuffle` - Permute the order on every pass
    /// * `seed` - Fixed RNG seed, entropy-seeded when `None`
    /// * `read` - Loads the volume for one identifier
    pub fn new(ids: Vec<String>, looping: bool, shuffle: bool, seed: Option<u64>, read: F) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut sequence = Self {
            order: (0..ids.len()).collect(),
            ids,
            cursor: 0,
            epoch: 0,
            looping,
            shuffle,
            rng,
            read,
        };
        sequence.begin_pass();
        sequence
    }

    /// Rewind to the first item of the first pass
    pub fn restart(&mut self) {
        self.epoch = 0;
        self.begin_pass();
    }

    /// Number of identifiers per pass
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Completed passes
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    fn begin_pass(&mut self) {
        self.cursor = 0;

        if self.shuffle {
            self.order.shuffle(&mut self.rng);
        }
    }
}

impl<F> Iterator for VolumeSequence<F>
where
    F: FnMut(&str) -> crate::Result<Volume>,
{
    type Item = crate::Result<(Volume, VolumeMetadata)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.ids.is_empty() {
            return None;
        }

        if self.cursor >= self.order.len() {
            if !self.looping {
                return None;
            }
            self.epoch += 1;
            self.begin_pass();
            log::debug!("Volume sequence wrapped, starting pass {}", self.epoch);
        }

        let position = self.cursor;
        let identifier = self.ids[self.order[position]].clone();
        self.cursor += 1;

        let item = (self.read)(&identifier).map(|volume| {
            let metadata = VolumeMetadata {
                identifier,
                position,
                epoch: self.epoch,
            };
            (volume, metadata)
        });

        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.looping && !self.ids.is_empty() {
            (usize::MAX, None)
        } else {
            let remaining = self.order.len().saturating_sub(self.cursor);
            (remaining, Some(remaining))
        }
    }
}
