/// Emission layout and tensor shaping
use candle_core::{Device, Tensor};
use ndarray::{Array5, Axis};

use crate::config::{VolumeShape, FLOW_CHANNELS};
use crate::data::Volume;

/// One `(inputs, targets)` sample for a paired-input model
///
/// Scan-only streams emit `[src, tgt]` / `[tgt, zeros, zeros]`; streams with
/// segmentation emit `[src, tgt, src_seg]` / `[tgt, tgt_seg, zeros, zeros]`.
/// Volume tensors are `(1, w, h, d, 1)`, zero tensors `(1, w, h, d, 3)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub inputs: Vec<Array5<f32>>,
    pub targets: Vec<Array5<f32>>,
}

impl Emission {
    /// Convert every array into a candle tensor of the same shape
    pub fn to_tensors(&self, device: &Device) -> crate::Result<(Vec<Tensor>, Vec<Tensor>)> {
        let inputs = self
            .inputs
            .iter()
            .map(|array| to_tensor(array, device))
            .collect::<crate::Result<Vec<_>>>()?;
        let targets = self
            .targets
            .iter()
            .map(|array| to_tensor(array, device))
            .collect::<crate::Result<Vec<_>>>()?;

        Ok((inputs, targets))
    }
}

/// Wrap a volume with a leading batch axis and a trailing channel axis
///
/// Fails with `ShapeMismatch` when the volume does not have the configured
/// shape.
pub fn batched(volume: Volume, shape: VolumeShape) -> crate::Result<Array5<f32>> {
    if volume.dim() != shape.dims() {
        return Err(crate::VolPairError::ShapeMismatch {
            expected: shape.dims(),
            actual: volume.shape().to_vec(),
        });
    }

    Ok(volume.insert_axis(Axis(0)).insert_axis(Axis(4)))
}

/// All-zero placeholder target of shape `(1, w, h, d, 3)`
pub fn zero_flow(shape: VolumeShape) -> Array5<f32> {
    Array5::zeros((1, shape.width, shape.height, shape.depth, FLOW_CHANNELS))
}

/// Copy an array into a CPU/GPU tensor in logical (row-major) order
pub fn to_tensor(array: &Array5<f32>, device: &Device) -> crate::Result<Tensor> {
    let data: Vec<f32> = array.iter().copied().collect();
    Ok(Tensor::from_vec(data, array.shape().to_vec(), device)?)
}
