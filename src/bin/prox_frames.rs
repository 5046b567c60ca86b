use clap::Parser;
use prox_fit_data::data_loader::{DatasetConfig, create_dataset};
use prox_fit_data::io::{FrameReport, object_from_json, write_loading_report};
use prox_fit_data::visualization::log_frame;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(version, about, author)]
struct ProxFramesCli {
    /// dataset root with images/ and optional Depth/, BodyIndex/
    data_folder: PathBuf,

    /// OpenPose json folder, defaults to <data_folder>/keypoints
    #[arg(long)]
    keyp_folder: Option<PathBuf>,

    /// dataset config json, missing fields use defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    calib_dir: Option<PathBuf>,

    #[arg(long)]
    read_depth: bool,

    #[arg(long)]
    read_mask: bool,

    #[arg(long)]
    mask_on_color: bool,

    #[arg(long)]
    drop_noise: bool,

    #[arg(long)]
    use_hands: bool,

    #[arg(long)]
    use_face: bool,

    #[arg(long)]
    flip: bool,

    /// 1-based first frame
    #[arg(long, default_value = "1")]
    start: usize,

    #[arg(long, default_value = "1")]
    step: usize,

    /// loading report
    #[arg(short, long, default_value = "frames.json")]
    output: PathBuf,

    /// save a rerun recording (.rrd)
    #[arg(long)]
    rerun: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = ProxFramesCli::parse();

    let mut config: DatasetConfig = match &cli.config {
        Some(path) => object_from_json(path)?,
        None => DatasetConfig::default(),
    };
    config.data_folder = cli.data_folder.clone();
    if let Some(keyp_folder) = cli.keyp_folder {
        config.keyp_folder = keyp_folder;
    } else if cli.config.is_none() {
        config.keyp_folder = cli.data_folder.join("keypoints");
    }
    if let Some(calib_dir) = cli.calib_dir {
        config.calib_dir = calib_dir;
    }
    config.read_depth |= cli.read_depth;
    config.read_mask |= cli.read_mask;
    config.mask_on_color |= cli.mask_on_color;
    config.drop_noise |= cli.drop_noise;
    config.use_hands |= cli.use_hands;
    config.use_face |= cli.use_face;
    config.flip |= cli.flip;
    if cli.config.is_none() {
        config.start = cli.start;
        config.step = cli.step;
    }

    let dataset = create_dataset("openpose", config)?;
    let recording = match &cli.rerun {
        Some(path) => Some(rerun::RecordingStreamBuilder::new("prox_frames").save(path)?),
        None => None,
    };

    let now = Instant::now();
    let results = dataset.map_frames(|idx, frame| {
        if let Some(recording) = &recording {
            if let Err(e) = log_frame(recording, idx, &frame) {
                log::warn!("{}: rerun logging failed: {}", frame.fn_stem, e);
            }
        }
        FrameReport::from(&frame)
    });
    let duration_sec = now.elapsed().as_secs_f64();
    log::info!("loading {} frames took {:.3} sec", results.len(), duration_sec);

    let mut reports = Vec::new();
    let mut failed = Vec::new();
    for (path, result) in dataset.img_paths().iter().zip(results) {
        match result {
            Ok(Some(report)) => reports.push(report),
            Ok(None) => log::info!("{}: no people", path.display()),
            Err(e) => {
                log::warn!("{}: {}", path.display(), e);
                failed.push(path.to_string_lossy().into_owned());
            }
        }
    }

    write_loading_report(&cli.output, &reports, dataset.len(), &failed)?;
    println!(
        "{} frames, {} with people, {} failed, report at {}",
        dataset.len(),
        reports.len(),
        failed.len(),
        cli.output.display()
    );
    Ok(())
}
