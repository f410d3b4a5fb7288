/// NumPy volume loader for scan/segmentation datasets (.npy format)
use ndarray::Array3;
use ndarray_npy::{ReadNpyError, ReadNpyExt, ReadableElement};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::{Volume, VolumeLoader, VolumeSequence, VolumeStream};
use crate::config::VolumeShape;

/// Subdirectory holding scan volumes
pub const SCANS_DIR: &str = "scans";

/// Subdirectory holding segmentation masks
pub const SEGMENTATIONS_DIR: &str = "segmentations";

/// Optional manifest stored as dataset.json
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatasetManifest {
    pub identifiers: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// Loader reading one .npy file per identifier
///
/// Expected layout:
///
/// ```text
/// <root>/dataset.json            (optional)
/// <root>/scans/<id>.npy
/// <root>/segmentations/<id>.npy
/// ```
///
/// Volumes must already be stored at the training resolution; they are
/// converted to `f32` but otherwise returned as stored.
#[derive(Debug, Clone)]
pub struct NpyVolumeLoader {
    root: PathBuf,
    seed: Option<u64>,
}

impl NpyVolumeLoader {
    /// Create loader over a dataset directory
    pub fn new<P: AsRef<Path>>(root: P) -> crate::Result<Self> {
        let root = root.as_ref().to_path_buf();

        let scans = root.join(SCANS_DIR);
        if !scans.is_dir() {
            return Err(crate::VolPairError::Config(format!(
                "scan directory not found: {:?}",
                scans
            )));
        }

        log::info!("Using NumPy volume dataset at: {:?}", root);

        Ok(Self { root, seed: None })
    }

    /// Fix the shuffle seed of every stream this loader creates
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Dataset root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Identifiers available in the dataset
    ///
    /// Taken from dataset.json when present, otherwise the sorted file
    /// stems of every .npy file in the scan directory.
    pub fn identifiers(&self) -> crate::Result<Vec<String>> {
        let manifest_path = self.root.join("dataset.json");

        if manifest_path.exists() {
            let file = File::open(&manifest_path)?;
            let manifest: DatasetManifest = serde_json::from_reader(BufReader::new(file))?;
            log::info!(
                "Manifest lists {} identifiers ({})",
                manifest.identifiers.len(),
                manifest.description
            );
            return Ok(manifest.identifiers);
        }

        log::warn!("dataset.json not found, scanning {:?}", self.root.join(SCANS_DIR));

        let mut ids = Vec::new();
        for entry in std::fs::read_dir(self.root.join(SCANS_DIR))? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("npy") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();

        Ok(ids)
    }

    fn stream(
        &self,
        subdir: &'static str,
        ids: &[String],
        looping: bool,
        shuffle: bool,
    ) -> VolumeStream {
        let dir = self.root.join(subdir);
        let read = move |id: &str| read_volume(&dir.join(format!("{}.npy", id)));

        Box::new(VolumeSequence::new(ids.to_vec(), looping, shuffle, self.seed, read))
    }
}

impl VolumeLoader for NpyVolumeLoader {
    fn preprocess_scans(
        &self,
        ids: &[String],
        shape: VolumeShape,
        looping: bool,
        shuffle: bool,
    ) -> crate::Result<VolumeStream> {
        log::info!(
            "Streaming {} scans (target {}x{}x{}, loop={}, shuffle={})",
            ids.len(),
            shape.width,
            shape.height,
            shape.depth,
            looping,
            shuffle
        );
        Ok(self.stream(SCANS_DIR, ids, looping, shuffle))
    }

    fn preprocess_segmentations(
        &self,
        ids: &[String],
        shape: VolumeShape,
        looping: bool,
        shuffle: bool,
    ) -> crate::Result<VolumeStream> {
        let dir = self.root.join(SEGMENTATIONS_DIR);
        if !dir.is_dir() {
            return Err(crate::VolPairError::Config(format!(
                "segmentation directory not found: {:?}",
                dir
            )));
        }

        log::info!(
            "Streaming {} segmentations (target {}x{}x{}, loop={}, shuffle={})",
            ids.len(),
            shape.width,
            shape.height,
            shape.depth,
            looping,
            shuffle
        );
        Ok(self.stream(SEGMENTATIONS_DIR, ids, looping, shuffle))
    }
}

/// Read a 3-D .npy array of f32, f64, i64, i32, i16 or u8 elements as f32
pub fn read_volume(path: &Path) -> crate::Result<Volume> {
    if let Some(volume) = try_read::<f32>(path, |x| x)? {
        return Ok(volume);
    }
    if let Some(volume) = try_read::<f64>(path, |x| x as f32)? {
        return Ok(volume);
    }
    // NumPy's default integer type, common for label masks
    if let Some(volume) = try_read::<i64>(path, |x| x as f32)? {
        return Ok(volume);
    }
    if let Some(volume) = try_read::<i32>(path, |x| x as f32)? {
        return Ok(volume);
    }
    if let Some(volume) = try_read::<i16>(path, f32::from)? {
        return Ok(volume);
    }
    if let Some(volume) = try_read::<u8>(path, f32::from)? {
        return Ok(volume);
    }

    Err(crate::VolPairError::Npy(format!(
        "Unsupported element type in {:?} (expected f32, f64, i64, i32, i16 or u8)",
        path
    )))
}

/// `Ok(None)` when the file holds a different element type
fn try_read<A>(path: &Path, convert: fn(A) -> f32) -> crate::Result<Option<Volume>>
where
    A: ReadableElement + Clone,
{
    let file = File::open(path).map_err(|e| {
        crate::VolPairError::Loader(format!("Failed to open {:?}: {}", path, e))
    })?;

    match Array3::<A>::read_npy(BufReader::new(file)) {
        Ok(array) => Ok(Some(array.mapv(convert))),
        Err(ReadNpyError::WrongDescriptor(_)) => Ok(None),
        Err(e) => Err(crate::VolPairError::Npy(format!(
            "Failed to read {:?}: {}",
            path, e
        ))),
    }
}
