use std::collections::HashMap;

use nalgebra as na;
use tiny_solver::LevenbergMarquardtOptimizer;
use tiny_solver::optimizer::{Optimizer, OptimizerOptions};
use tiny_solver::problem::Problem;

use super::factors::KeypointReprojectionFactor;
use crate::camera::PerspectiveCamera;
use crate::error::{Error, Result};

const MIN_CORRESPONDENCES: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    /// Only the translation is optimized.
    pub fix_rotation: bool,
    pub max_iteration: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            fix_rotation: false,
            max_iteration: 100,
        }
    }
}

/// Fits the camera extrinsics so that `points3d` project onto `keypoints`.
///
/// `keypoints` is `N x 3` (`x, y, confidence`) with row `i` observing
/// `points3d[i]`; `weights` scales each row. Rows with zero weight or zero
/// confidence are skipped.
pub fn fit_camera_pose(
    camera: &PerspectiveCamera<f64>,
    points3d: &[na::Vector3<f64>],
    keypoints: &na::DMatrix<f32>,
    weights: Option<&na::DVector<f32>>,
    options: &FitOptions,
) -> Result<PerspectiveCamera<f64>> {
    if keypoints.ncols() != 3 {
        return Err(Error::InvalidKeypoints(format!(
            "expected 3 columns, got {}",
            keypoints.ncols()
        )));
    }
    let n = points3d.len().min(keypoints.nrows());

    let mut problem = Problem::new();
    let mut used = 0;
    for i in 0..n {
        let w = weights.and_then(|w| w.get(i).copied()).unwrap_or(1.0);
        let conf = keypoints[(i, 2)];
        let weight = (w * conf) as f64;
        if weight <= 0.0 {
            continue;
        }
        let p2d = na::Vector2::new(keypoints[(i, 0)] as f64, keypoints[(i, 1)] as f64);
        let factor = KeypointReprojectionFactor::new(camera, &points3d[i], &p2d, weight);
        problem.add_residual_block(2, &["rvec", "tvec"], Box::new(factor), None);
        used += 1;
    }
    if used < MIN_CORRESPONDENCES {
        return Err(Error::InsufficientData {
            required: MIN_CORRESPONDENCES,
            available: used,
        });
    }
    if options.fix_rotation {
        for idx in 0..3 {
            problem.fix_variable("rvec", idx);
        }
    }

    let (rvec, tvec) = camera.pose_params();
    let initial_values = HashMap::<String, na::DVector<f64>>::from([
        ("rvec".to_string(), na::DVector::from_column_slice(rvec.as_slice())),
        ("tvec".to_string(), na::DVector::from_column_slice(tvec.as_slice())),
    ]);

    let optimizer = LevenbergMarquardtOptimizer::default();
    let solver_options = OptimizerOptions {
        max_iteration: options.max_iteration,
        ..OptimizerOptions::default()
    };
    let result = optimizer
        .optimize(&problem, &initial_values, Some(solver_options))
        .ok_or_else(|| Error::Optimization("levenberg-marquardt did not converge".to_string()))?;

    let rvec = result
        .get("rvec")
        .ok_or_else(|| Error::Optimization("rvec missing from solution".to_string()))?;
    let tvec = result
        .get("tvec")
        .ok_or_else(|| Error::Optimization("tvec missing from solution".to_string()))?;
    let rvec = na::Vector3::new(rvec[0], rvec[1], rvec[2]);
    let tvec = na::Vector3::new(tvec[0], tvec[1], tvec[2]);
    log::debug!("fitted camera pose from {} keypoints: rvec {:?}, tvec {:?}", used, rvec, tvec);

    Ok(camera.clone().with_pose_params(&rvec, &tvec))
}
