use image::{DynamicImage, Rgb32FImage};
use nalgebra as na;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rerun::RecordingStream;
use std::io::Cursor;

use crate::data_loader::FrameData;
use crate::projection::Scan;

type VisResult = Result<(), Box<dyn std::error::Error>>;

pub fn log_image_as_compressed(
    recording: &RecordingStream,
    topic: &str,
    img: &Rgb32FImage,
    format: image::ImageFormat,
) -> VisResult {
    let mut bytes: Vec<u8> = Vec::new();
    DynamicImage::ImageRgb32F(img.clone())
        .to_rgb8()
        .write_to(&mut Cursor::new(&mut bytes), format)?;

    recording.log(
        format!("{}/image", topic),
        &rerun::EncodedImage::from_file_contents(bytes),
    )?;
    Ok(())
}

/// Stable pseudo-random color per id.
pub fn id_to_color(id: usize) -> (u8, u8, u8, u8) {
    let mut rng = ChaCha8Rng::seed_from_u64(id as u64);
    let color_num = rng.random_range(0..2u32.pow(24));
    (
        ((color_num >> 16) % 256) as u8,
        ((color_num >> 8) % 256) as u8,
        (color_num % 256) as u8,
        255,
    )
}

/// rerun use top left corner as (0, 0)
pub fn rerun_shift(p2ds: &[(f32, f32)]) -> Vec<(f32, f32)> {
    p2ds.iter().map(|(x, y)| (*x + 0.5, *y + 0.5)).collect()
}

/// Logs confident keypoints, one color per person, labelled by joint index.
pub fn log_keypoints(recording: &RecordingStream, topic: &str, keypoints: &[na::DMatrix<f32>]) -> VisResult {
    let ((pts, colors), labels): ((Vec<_>, Vec<_>), Vec<_>) = keypoints
        .iter()
        .enumerate()
        .flat_map(|(person, kp)| {
            let color = id_to_color(person);
            kp.row_iter()
                .enumerate()
                .filter(|(_, r)| r[2] > 0.0)
                .map(|(j, r)| (((r[0], r[1]), color), format!("{}:{}", person, j)))
                .collect::<Vec<_>>()
        })
        .unzip();
    let pts = rerun_shift(&pts);

    recording.log(
        format!("{}/keypoints", topic),
        &rerun::Points2D::new(pts)
            .with_colors(colors)
            .with_labels(labels)
            .with_radii([rerun::Radius::new_ui_points(3.0)]),
    )?;
    Ok(())
}

pub fn log_scan(recording: &RecordingStream, topic: &str, scan: &Scan) -> VisResult {
    let pts: Vec<_> = scan.points.iter().map(|p| (p.x, p.y, p.z)).collect();
    recording.log(
        format!("{}/scan", topic),
        &rerun::Points3D::new(pts).with_radii([rerun::Radius::new_ui_points(1.0)]),
    )?;
    Ok(())
}

/// Logs image, keypoints and scan of a frame at sequence `frame_idx`.
pub fn log_frame(recording: &RecordingStream, frame_idx: usize, frame: &FrameData) -> VisResult {
    recording.set_time("frame", rerun::TimeCell::from_sequence(frame_idx as i64));
    log_image_as_compressed(recording, "color", &frame.img, image::ImageFormat::Png)?;
    log_keypoints(recording, "color", &frame.keypoints)?;
    if let Some(scan) = &frame.scan {
        log_scan(recording, "world", scan)?;
    }
    Ok(())
}
