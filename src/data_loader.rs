use std::path::{Path, PathBuf};

use glob::glob;
use image::{GrayImage, ImageReader, Rgb32FImage};
use indicatif::ParallelProgressIterator;
use nalgebra as na;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::joints::{self, ModelType, OpenPoseFormat};
use crate::keypoints::{KeypointOptions, read_keypoints};
use crate::projection::{DepthImage, Projection, Scan, ScanOptions};

/// Raw depth PNGs store millimetres times 8.
const DEPTH_RAW_DIVISOR: f32 = 8.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub data_folder: PathBuf,
    pub img_folder: PathBuf,
    /// Used as given, not rooted at `data_folder`.
    pub keyp_folder: PathBuf,
    /// Used as given; empty disables scans.
    pub calib_dir: PathBuf,
    pub use_hands: bool,
    pub use_face: bool,
    pub use_face_contour: bool,
    pub model_type: ModelType,
    pub joints_to_ign: Option<Vec<i64>>,
    pub openpose_format: OpenPoseFormat,
    pub depth_folder: PathBuf,
    pub mask_folder: PathBuf,
    pub mask_color_folder: PathBuf,
    pub read_depth: bool,
    pub read_mask: bool,
    pub mask_on_color: bool,
    pub depth_scale: f32,
    pub flip: bool,
    /// 1-based index of the first frame.
    pub start: usize,
    pub step: usize,
    /// 1-based frame indices; overrides `start` and `step`.
    pub frame_ids: Option<Vec<usize>>,
    pub drop_noise: bool,
    pub eps: f32,
    pub min_samples: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data_folder: PathBuf::from("data"),
            img_folder: PathBuf::from("images"),
            keyp_folder: PathBuf::from("keypoints"),
            calib_dir: PathBuf::new(),
            use_hands: false,
            use_face: false,
            use_face_contour: false,
            model_type: ModelType::Smplx,
            joints_to_ign: None,
            openpose_format: OpenPoseFormat::Coco25,
            depth_folder: PathBuf::from("Depth"),
            mask_folder: PathBuf::from("BodyIndex"),
            mask_color_folder: PathBuf::from("BodyIndexColor"),
            read_depth: false,
            read_mask: false,
            mask_on_color: false,
            depth_scale: 1e-3,
            flip: false,
            start: 1,
            step: 1,
            frame_ids: None,
            drop_noise: false,
            eps: 0.2,
            min_samples: 100,
        }
    }
}

impl DatasetConfig {
    fn keypoint_options(&self) -> KeypointOptions {
        KeypointOptions {
            use_hands: self.use_hands,
            use_face: self.use_face,
            use_face_contour: self.use_face_contour,
        }
    }

    fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            mask_on_color: self.mask_on_color,
            drop_noise: self.drop_noise,
            eps: self.eps,
            min_samples: self.min_samples,
        }
    }
}

/// Everything known about one frame.
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Image file name without extension.
    pub fn_stem: String,
    pub img_path: PathBuf,
    /// One `N x 3` matrix per person.
    pub keypoints: Vec<na::DMatrix<f32>>,
    /// RGB in `[0, 1]`.
    pub img: Rgb32FImage,
    /// Scan centroid, the initial body translation.
    pub init_trans: Option<na::Vector3<f32>>,
    pub depth_im: Option<DepthImage>,
    /// `0` for body, `255` for background.
    pub mask: Option<GrayImage>,
    pub scan: Option<Scan>,
    pub gender_gt: Vec<String>,
    pub gender_pd: Vec<String>,
}

/// Keeps `.png` and `.jpg` files; dotfiles of either kind are skipped.
fn img_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    if let Ok(p) = rp {
        let name = p.file_name()?.to_string_lossy().into_owned();
        if name.starts_with('.') {
            return None;
        }
        for ext in &[".png", ".jpg"] {
            if name.ends_with(ext) {
                return Some(p);
            }
        }
    }
    None
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn open_image(path: &Path) -> Result<image::DynamicImage> {
    ImageReader::open(path)
        .map_err(|e| Error::io(path, e))?
        .decode()
        .map_err(|e| Error::image(path, e))
}

/// Reads a 16-bit depth PNG and converts it to metres.
///
/// Any other pixel format is rejected, widening 8-bit data would scale it.
pub fn read_depth_image(path: &Path, depth_scale: f32, flip: bool) -> Result<DepthImage> {
    let raw = match open_image(path)? {
        image::DynamicImage::ImageLuma16(raw) => raw,
        other => {
            return Err(Error::InvalidImage {
                path: path.to_path_buf(),
                reason: format!("depth must be 16-bit grayscale, got {:?}", other.color()),
            });
        }
    };
    let depth = DepthImage::from_fn(raw.width(), raw.height(), |x, y| {
        image::Luma([raw.get_pixel(x, y)[0] as f32 / DEPTH_RAW_DIVISOR * depth_scale])
    });
    Ok(if flip {
        image::imageops::flip_horizontal(&depth)
    } else {
        depth
    })
}

/// Reads a body mask. Masks in depth resolution are binarized, anything
/// above 254 becomes background.
pub fn read_mask_image(path: &Path, binarize: bool, flip: bool) -> Result<GrayImage> {
    let mut mask = open_image(path)?.to_luma8();
    if binarize {
        for p in mask.pixels_mut() {
            p[0] = if p[0] > 254 { 255 } else { 0 };
        }
    }
    Ok(if flip {
        image::imageops::flip_horizontal(&mask)
    } else {
        mask
    })
}

/// Sorted OpenPose frame dataset backed by an image folder.
pub struct OpenPoseDataset {
    config: DatasetConfig,
    img_paths: Vec<PathBuf>,
    keyp_folder: PathBuf,
    depth_folder: PathBuf,
    mask_folder: PathBuf,
    mask_color_folder: PathBuf,
    projection: Projection,
    cnt: usize,
}

pub fn create_dataset(dataset: &str, config: DatasetConfig) -> Result<OpenPoseDataset> {
    if dataset.to_lowercase() == "openpose" {
        OpenPoseDataset::new(config)
    } else {
        Err(Error::UnknownDataset(dataset.to_string()))
    }
}

impl OpenPoseDataset {
    pub fn new(config: DatasetConfig) -> Result<OpenPoseDataset> {
        if config.step == 0 {
            return Err(Error::InvalidConfig("step must be at least 1".to_string()));
        }
        if config.start == 0 && config.frame_ids.is_none() {
            return Err(Error::InvalidConfig("start is 1-based".to_string()));
        }
        let data_folder = &config.data_folder;
        let img_folder = data_folder.join(&config.img_folder);
        log::trace!("listing {}", img_folder.display());
        let pattern = img_folder.join("*");
        let mut sorted_path: Vec<PathBuf> = glob(&pattern.to_string_lossy())?
            .filter_map(img_filter)
            .collect();
        sorted_path.sort();

        let img_paths = match &config.frame_ids {
            Some(ids) => ids
                .iter()
                .map(|&id| {
                    id.checked_sub(1)
                        .and_then(|i| sorted_path.get(i))
                        .cloned()
                        .ok_or_else(|| {
                            Error::InvalidConfig(format!(
                                "frame id {} out of range 1..={}",
                                id,
                                sorted_path.len()
                            ))
                        })
                })
                .collect::<Result<Vec<_>>>()?,
            None => sorted_path
                .into_iter()
                .skip(config.start - 1)
                .step_by(config.step)
                .collect(),
        };
        log::info!("{} frames selected from {}", img_paths.len(), img_folder.display());

        let projection = Projection::new(&config.calib_dir)?;

        Ok(OpenPoseDataset {
            keyp_folder: config.keyp_folder.clone(),
            depth_folder: data_folder.join(&config.depth_folder),
            mask_folder: data_folder.join(&config.mask_folder),
            mask_color_folder: data_folder.join(&config.mask_color_folder),
            img_paths,
            projection,
            config,
            cnt: 0,
        })
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn img_paths(&self) -> &[PathBuf] {
        &self.img_paths
    }

    pub fn len(&self) -> usize {
        self.img_paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.img_paths.is_empty()
    }

    pub fn num_joints(&self) -> usize {
        joints::num_joints(self.config.use_hands)
    }

    pub fn get_model2data(&self) -> Vec<usize> {
        joints::model_to_openpose(
            self.config.model_type,
            self.config.use_hands,
            self.config.use_face,
            self.config.use_face_contour,
            self.config.openpose_format,
        )
    }

    pub fn get_left_shoulder(&self) -> usize {
        joints::LEFT_SHOULDER
    }

    pub fn get_right_shoulder(&self) -> usize {
        joints::RIGHT_SHOULDER
    }

    pub fn get_joint_weights(&self) -> Result<na::DVector<f32>> {
        joints::joint_weights(
            self.config.use_hands,
            self.config.use_face,
            self.config.use_face_contour,
            self.config.joints_to_ign.as_deref(),
        )
    }

    pub fn get(&self, idx: usize) -> Result<Option<FrameData>> {
        let path = self.img_paths.get(idx).ok_or_else(|| {
            Error::InvalidConfig(format!("frame index {} out of range 0..{}", idx, self.len()))
        })?;
        self.read_item(path)
    }

    /// Rewinds the iterator.
    pub fn reset(&mut self) {
        self.cnt = 0;
    }

    /// Reads one frame. `Ok(None)` when the keypoint file holds no person.
    pub fn read_item(&self, img_path: &Path) -> Result<Option<FrameData>> {
        log::trace!("reading {}", img_path.display());
        let img = open_image(img_path)?.to_rgb32f();
        let img = if self.config.flip {
            image::imageops::flip_horizontal(&img)
        } else {
            img
        };
        let fn_stem = file_stem(img_path);

        let keypoint_path = self.keyp_folder.join(format!("{}_keypoints.json", fn_stem));
        let keyp = read_keypoints(&keypoint_path, &self.config.keypoint_options())?;
        if keyp.is_empty() {
            log::debug!("{}: no people detected", fn_stem);
            return Ok(None);
        }

        let depth_im = if self.config.read_depth {
            let path = self.depth_folder.join(format!("{}.png", fn_stem));
            Some(read_depth_image(&path, self.config.depth_scale, self.config.flip)?)
        } else {
            None
        };

        let mask = if self.config.read_mask {
            let (folder, binarize) = if self.config.mask_on_color {
                (&self.mask_color_folder, false)
            } else {
                (&self.mask_folder, true)
            };
            let path = folder.join(format!("{}.png", fn_stem));
            Some(read_mask_image(&path, binarize, self.config.flip)?)
        } else {
            None
        };

        let (scan, init_trans) = match (&depth_im, &mask) {
            (Some(depth_im), Some(mask)) => {
                let body = read_keypoints(&keypoint_path, &KeypointOptions::body_only())?;
                let scan = self.projection.create_scan(
                    mask,
                    depth_im,
                    body.keypoints.first(),
                    &self.config.scan_options(),
                )?;
                let init_trans = scan.centroid();
                if init_trans.is_none() {
                    log::warn!("{}: empty scan, no initial translation", fn_stem);
                }
                (Some(scan), init_trans)
            }
            _ => (None, None),
        };

        Ok(Some(FrameData {
            fn_stem,
            img_path: img_path.to_path_buf(),
            keypoints: keyp.keypoints,
            img,
            init_trans,
            depth_im,
            mask,
            scan,
            gender_gt: keyp.gender_gt,
            gender_pd: keyp.gender_pd,
        }))
    }

    /// Reads every frame in parallel and hands it to `f` together with its
    /// index. Frames are dropped after `f` returns, so only the outputs stay
    /// in memory; they keep frame order.
    pub fn map_frames<R, F>(&self, f: F) -> Vec<Result<Option<R>>>
    where
        R: Send,
        F: Fn(usize, FrameData) -> R + Sync,
    {
        self.img_paths
            .par_iter()
            .enumerate()
            .progress_count(self.img_paths.len() as u64)
            .map(|(idx, path)| Ok(self.read_item(path)?.map(|frame| f(idx, frame))))
            .collect()
    }

    /// Reads every frame in parallel; results keep frame order.
    ///
    /// Holds every frame at once, use `map_frames` or the iterator for long
    /// recordings.
    pub fn load_all(&self) -> Vec<Result<Option<FrameData>>> {
        self.map_frames(|_, frame| frame)
    }
}

impl Iterator for OpenPoseDataset {
    type Item = Result<Option<FrameData>>;

    fn next(&mut self) -> Option<Self::Item> {
        let img_path = self.img_paths.get(self.cnt)?.clone();
        self.cnt += 1;
        Some(self.read_item(&img_path))
    }
}
