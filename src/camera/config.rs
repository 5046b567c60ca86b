use serde::{Deserialize, Serialize};

use super::perspective::{CameraBatch, FOCAL_LENGTH, PerspectiveCamera};
use crate::error::{Error, Result};
use nalgebra as na;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub camera_type: String,
    pub batch_size: usize,
    pub focal_length_x: Option<f64>,
    pub focal_length_y: Option<f64>,
    pub center: Option<[f64; 2]>,
    /// Row-major 3x3.
    pub rotation: Option<[[f64; 3]; 3]>,
    pub translation: Option<[f64; 3]>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            camera_type: "persp".to_string(),
            batch_size: 1,
            focal_length_x: None,
            focal_length_y: None,
            center: None,
            rotation: None,
            translation: None,
        }
    }
}

/// Builds a batch of identical cameras from `config`.
///
/// Only the `"persp"` camera type exists.
pub fn create_camera(config: &CameraConfig) -> Result<CameraBatch<f64>> {
    if config.camera_type.to_lowercase() != "persp" {
        return Err(Error::UnknownCameraType(config.camera_type.clone()));
    }
    let center = config
        .center
        .map(|c| na::Vector2::new(c[0], c[1]))
        .unwrap_or_else(na::Vector2::zeros);
    let rotation = config
        .rotation
        .map(|r| na::Matrix3::from_fn(|i, j| r[i][j]))
        .unwrap_or_else(na::Matrix3::identity);
    let translation = config
        .translation
        .map(|t| na::Vector3::new(t[0], t[1], t[2]))
        .unwrap_or_else(na::Vector3::zeros);
    let camera = PerspectiveCamera::new(
        config.focal_length_x.unwrap_or(FOCAL_LENGTH),
        config.focal_length_y.unwrap_or(FOCAL_LENGTH),
        center,
    )
    .with_extrinsics(rotation, translation);
    log::debug!(
        "created {} perspective camera(s), f = ({}, {})",
        config.batch_size,
        camera.focal_length_x,
        camera.focal_length_y
    );
    Ok(CameraBatch::new(vec![camera; config.batch_size]))
}
