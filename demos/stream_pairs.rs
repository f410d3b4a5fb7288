/// Stream scan pairs from a NumPy volume dataset and report tensor shapes
///
/// Usage: stream_pairs <dataset_dir> [config.json] [max_pairs]
use candle_core::Device;
use volpair::data::NpyVolumeLoader;
use volpair::stream::{PairStream, ScanSegPairStreamer, TensorPairLoader};
use volpair::{StreamConfig, VolumeShape};

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let data_path = args.next().ok_or_else(|| {
        anyhow::anyhow!("usage: stream_pairs <dataset_dir> [config.json] [max_pairs]")
    })?;

    let config = match args.next() {
        Some(path) => StreamConfig::from_json_file(path)?,
        None => StreamConfig {
            shape: VolumeShape::new(64, 64, 64),
            looping: false,
            shuffle: true,
        },
    };
    let max_pairs: usize = match args.next() {
        Some(n) => n.parse()?,
        None => 8,
    };

    let device = if candle_core::utils::cuda_is_available() {
        Device::new_cuda(0)?
    } else {
        Device::Cpu
    };
    log::info!("Using device: {:?}", device);

    let loader = NpyVolumeLoader::new(&data_path)?;
    let mut ids = loader.identifiers()?;
    log::info!("Dataset at {} holds {} scans", data_path, ids.len());

    let mut stream = ScanSegPairStreamer::new(&loader, &mut ids, &config)?;

    while stream.emitted() < max_pairs {
        let Some((inputs, targets)) = stream.next_batch(&device)? else {
            log::info!("Stream ended after {} pairs", stream.emitted());
            break;
        };

        let input_dims: Vec<_> = inputs.iter().map(|t| t.dims().to_vec()).collect();
        let target_dims: Vec<_> = targets.iter().map(|t| t.dims().to_vec()).collect();
        log::info!(
            "Pair {}: inputs {:?}, targets {:?}",
            stream.emitted(),
            input_dims,
            target_dims
        );
    }

    Ok(())
}
