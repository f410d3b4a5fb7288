/// Configuration for paired volume streaming
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Spatial extent every volume is expected to have after preprocessing
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VolumeShape {
    /// Size along the first axis
    pub width: usize,

    /// Size along the second axis
    pub height: usize,

    /// Size along the third axis
    pub depth: usize,
}

impl VolumeShape {
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        Self { width, height, depth }
    }

    /// Shape as an `(width, height, depth)` tuple
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.width, self.height, self.depth)
    }

    /// Number of voxels in one volume, `None` on overflow
    pub fn voxels(&self) -> Option<usize> {
        self.width
            .checked_mul(self.height)?
            .checked_mul(self.depth)
    }
}

impl Default for VolumeShape {
    fn default() -> Self {
        Self::new(64, 64, 64)
    }
}

/// Configuration shared by both pair streamers
///
/// Mirrors the arguments the streamers hand to the loader: the target
/// volume shape plus the loop and shuffle switches.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StreamConfig {
    /// Target volume shape
    pub shape: VolumeShape,

    /// Wrap around to the first identifier once the list is exhausted
    #[serde(default = "default_true")]
    pub looping: bool,

    /// Randomize identifier traversal order
    #[serde(default = "default_true")]
    pub shuffle: bool,
}

/// Channels of the zero flow placeholder target
pub const FLOW_CHANNELS: usize = 3;

fn default_true() -> bool {
    true
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            shape: VolumeShape::default(),
            looping: true,
            shuffle: true,
        }
    }
}

impl StreamConfig {
    /// Single pass over the identifiers in their given order
    pub fn single_pass(shape: VolumeShape) -> Self {
        Self {
            shape,
            looping: false,
            shuffle: false,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        let VolumeShape { width, height, depth } = self.shape;

        if width == 0 || height == 0 || depth == 0 {
            return Err(crate::VolPairError::Config(format!(
                "volume shape must be non-zero in every axis, got {}x{}x{}",
                width, height, depth
            )));
        }

        // Largest array built per stream is the (1, w, h, d, 3) zero flow
        let flow_bytes = self
            .shape
            .voxels()
            .and_then(|voxels| voxels.checked_mul(FLOW_CHANNELS))
            .and_then(|elements| elements.checked_mul(std::mem::size_of::<f32>()));

        match flow_bytes {
            Some(bytes) if bytes <= isize::MAX as usize => Ok(()),
            _ => Err(crate::VolPairError::Config(format!(
                "volume shape {}x{}x{} is too large to allocate",
                width, height, depth
            ))),
        }
    }

    /// Load and validate a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let file = File::open(path.as_ref())?;
        let config: StreamConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;

        log::info!("Loaded stream config from {:?}: {:?}", path.as_ref(), config);

        Ok(config)
    }
}
