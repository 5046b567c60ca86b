//! Depth + body mask to point cloud.
//!
//! Calibration lives in a directory holding `IR.json` (depth camera),
//! optionally `Color.json` (color camera) and `IR2Color.json`
//! (`{"trans": [[..4]; 4]}`, depth frame to color frame). Every JSON camera
//! file is `{"f": [fx, fy], "c": [cx, cy]}`.

use std::path::Path;

use image::GrayImage;
use nalgebra as na;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::camera::CameraModel;
use crate::cluster::{clusters, dbscan};
use crate::error::{Error, Result};
use crate::io::object_from_json;

/// Depth in metres, `0` where the sensor has no reading.
pub type DepthImage = image::ImageBuffer<image::Luma<f32>, Vec<f32>>;

/// Mask values strictly below this are body pixels.
pub const MASK_BACKGROUND: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub f: [f64; 2],
    pub c: [f64; 2],
}

impl CameraIntrinsics {
    pub fn unproject_one(&self, u: f64, v: f64, depth: f64) -> na::Vector3<f64> {
        na::Vector3::new(
            (u - self.c[0]) * depth / self.f[0],
            (v - self.c[1]) * depth / self.f[1],
            depth,
        )
    }
}

impl CameraModel<f64> for CameraIntrinsics {
    fn project_one(&self, pt: &na::Vector3<f64>) -> na::Vector2<f64> {
        na::Vector2::new(
            self.f[0] * pt.x / pt.z + self.c[0],
            self.f[1] * pt.y / pt.z + self.c[1],
        )
    }
}

#[derive(Debug, Deserialize)]
struct DepthToColor {
    trans: [[f64; 4]; 4],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub depth: CameraIntrinsics,
    pub color: Option<CameraIntrinsics>,
    pub depth_to_color: na::Matrix4<f64>,
}

impl Calibration {
    pub fn load<P: AsRef<Path>>(calib_dir: P) -> Result<Calibration> {
        let dir = calib_dir.as_ref();
        let depth: CameraIntrinsics = object_from_json(dir.join("IR.json"))?;

        let color_path = dir.join("Color.json");
        let color = if color_path.exists() {
            Some(object_from_json(color_path)?)
        } else {
            None
        };

        let trans_path = dir.join("IR2Color.json");
        let depth_to_color = if trans_path.exists() {
            let t: DepthToColor = object_from_json(trans_path)?;
            na::Matrix4::from_fn(|i, j| t.trans[i][j])
        } else {
            log::debug!("no IR2Color.json in {}, using identity", dir.display());
            na::Matrix4::identity()
        };

        Ok(Calibration {
            depth,
            color,
            depth_to_color,
        })
    }

    fn depth_point_to_color(&self, p: &na::Vector3<f64>) -> na::Vector3<f64> {
        (self.depth_to_color * p.push(1.0)).xyz()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanOptions {
    /// The mask is in color-camera resolution instead of depth resolution.
    pub mask_on_color: bool,
    pub drop_noise: bool,
    /// DBSCAN radius in metres.
    pub eps: f32,
    pub min_samples: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            mask_on_color: false,
            drop_noise: false,
            eps: 0.2,
            min_samples: 100,
        }
    }
}

/// Body points in the color camera frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scan {
    pub points: Vec<na::Point3<f32>>,
}

impl Scan {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn centroid(&self) -> Option<na::Vector3<f32>> {
        if self.points.is_empty() {
            return None;
        }
        let sum: na::Vector3<f32> = self.points.iter().map(|p| p.coords).sum();
        Some(sum / self.points.len() as f32)
    }
}

fn is_body(mask: &GrayImage, x: u32, y: u32) -> bool {
    mask.get_pixel(x, y)[0] < MASK_BACKGROUND
}

/// Mean pixel of the keypoints with positive confidence.
fn keypoint_center(keypoints: &na::DMatrix<f32>) -> Option<na::Vector2<f64>> {
    let confident: Vec<_> = keypoints
        .row_iter()
        .filter(|r| r[2] > 0.0)
        .map(|r| na::Vector2::new(r[0] as f64, r[1] as f64))
        .collect();
    if confident.is_empty() {
        return None;
    }
    Some(confident.iter().sum::<na::Vector2<f64>>() / confident.len() as f64)
}

pub struct Projection {
    calibration: Option<Calibration>,
}

impl Projection {
    /// An empty `calib_dir` yields a projection that cannot create scans.
    pub fn new<P: AsRef<Path>>(calib_dir: P) -> Result<Projection> {
        let dir = calib_dir.as_ref();
        if dir.as_os_str().is_empty() {
            return Ok(Projection { calibration: None });
        }
        Ok(Projection {
            calibration: Some(Calibration::load(dir)?),
        })
    }

    pub fn from_calibration(calibration: Calibration) -> Projection {
        Projection {
            calibration: Some(calibration),
        }
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    /// Back-projects the body pixels of `depth` into a point cloud.
    ///
    /// `keypoints` are body keypoints of the person in color-image pixels;
    /// they pick which cluster survives when `drop_noise` is set.
    pub fn create_scan(
        &self,
        mask: &GrayImage,
        depth: &DepthImage,
        keypoints: Option<&na::DMatrix<f32>>,
        options: &ScanOptions,
    ) -> Result<Scan> {
        let calib = self
            .calibration
            .as_ref()
            .ok_or_else(|| Error::MissingCalibration("no calibration directory".to_string()))?;

        let color = if options.mask_on_color {
            Some(calib.color.ok_or_else(|| {
                Error::MissingCalibration("Color.json is needed for masks on color".to_string())
            })?)
        } else {
            if mask.dimensions() != depth.dimensions() {
                return Err(Error::ShapeMismatch {
                    expected: depth.dimensions(),
                    actual: mask.dimensions(),
                });
            }
            None
        };

        let (w, h) = depth.dimensions();
        let points: Vec<na::Point3<f32>> = (0..h)
            .into_par_iter()
            .flat_map(|v| {
                (0..w)
                    .filter_map(|u| {
                        let d = depth.get_pixel(u, v)[0];
                        if !d.is_finite() || d <= 0.0 {
                            return None;
                        }
                        let p_depth = calib.depth.unproject_one(u as f64, v as f64, d as f64);
                        let p_color = calib.depth_point_to_color(&p_depth);
                        let keep = match &color {
                            None => is_body(mask, u, v),
                            Some(color) => {
                                if p_color.z <= 0.0 {
                                    return None;
                                }
                                let px = color.project_one(&p_color);
                                let (x, y) = (px.x.round(), px.y.round());
                                x >= 0.0
                                    && y >= 0.0
                                    && (x as u32) < mask.width()
                                    && (y as u32) < mask.height()
                                    && is_body(mask, x as u32, y as u32)
                            }
                        };
                        keep.then(|| {
                            na::Point3::new(p_color.x as f32, p_color.y as f32, p_color.z as f32)
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        log::debug!("scan: {} masked depth points", points.len());

        let points = if options.drop_noise {
            Self::drop_noise(points, calib.color.as_ref(), keypoints, options)
        } else {
            points
        };
        Ok(Scan { points })
    }

    fn drop_noise(
        points: Vec<na::Point3<f32>>,
        color: Option<&CameraIntrinsics>,
        keypoints: Option<&na::DMatrix<f32>>,
        options: &ScanOptions,
    ) -> Vec<na::Point3<f32>> {
        let labels = dbscan(&points, options.eps, options.min_samples);
        let groups = clusters(&labels);
        if groups.is_empty() {
            log::warn!("scan: every point was classified as noise");
            return Vec::new();
        }

        let centroid = |g: &Vec<usize>| -> na::Vector3<f64> {
            let sum: na::Vector3<f64> = g.iter().map(|&i| points[i].coords.cast::<f64>()).sum();
            sum / g.len() as f64
        };

        let target = color.zip(keypoints.and_then(keypoint_center));
        let best = match target {
            Some((color, center)) => groups
                .iter()
                .enumerate()
                .filter_map(|(i, g)| {
                    let c = centroid(g);
                    (c.z > 0.0).then(|| (i, (color.project_one(&c) - center).norm()))
                })
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i),
            None => None,
        }
        .unwrap_or_else(|| {
            groups
                .iter()
                .enumerate()
                .max_by_key(|(_, g)| g.len())
                .map(|(i, _)| i)
                .unwrap_or(0)
        });

        log::debug!(
            "scan: {} clusters, keeping #{} with {} points",
            groups.len(),
            best,
            groups[best].len()
        );
        groups[best].iter().map(|&i| points[i]).collect()
    }
}
