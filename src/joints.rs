use std::fmt;
use std::str::FromStr;

use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const NUM_BODY_JOINTS: usize = 25;
pub const NUM_HAND_JOINTS: usize = 20;

pub const LEFT_SHOULDER: usize = 2;
pub const RIGHT_SHOULDER: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Smpl,
    Smplh,
    #[default]
    Smplx,
}

impl FromStr for ModelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "smpl" => Ok(ModelType::Smpl),
            "smplh" => Ok(ModelType::Smplh),
            "smplx" => Ok(ModelType::Smplx),
            _ => Err(Error::InvalidConfig(format!("unknown model type: {}", s))),
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelType::Smpl => "smpl",
            ModelType::Smplh => "smplh",
            ModelType::Smplx => "smplx",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenPoseFormat {
    #[default]
    Coco25,
}

impl FromStr for OpenPoseFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "coco25" => Ok(OpenPoseFormat::Coco25),
            _ => Err(Error::InvalidConfig(format!("unknown openpose format: {}", s))),
        }
    }
}

/// Body joints plus both hands when `use_hands`.
pub fn num_joints(use_hands: bool) -> usize {
    NUM_BODY_JOINTS + 2 * NUM_HAND_JOINTS * use_hands as usize
}

const SMPL_BODY: [usize; 25] = [
    24, 12, 17, 19, 21, 16, 18, 20, 0, 2, 5, 8, 1, 4, 7, 25, 26, 27, 28, 29, 30, 31, 32, 33, 34,
];

const SMPLH_BODY: [usize; 25] = [
    52, 12, 17, 19, 21, 16, 18, 20, 0, 2, 5, 8, 1, 4, 7, 53, 54, 55, 56, 57, 58, 59, 60, 61, 62,
];
const SMPLH_LHAND: [usize; 21] = [
    20, 34, 35, 36, 63, 22, 23, 24, 64, 25, 26, 27, 65, 31, 32, 33, 66, 28, 29, 30, 67,
];
const SMPLH_RHAND: [usize; 21] = [
    21, 49, 50, 51, 68, 37, 38, 39, 69, 40, 41, 42, 70, 46, 47, 48, 71, 43, 44, 45, 72,
];

const SMPLX_BODY: [usize; 25] = [
    55, 12, 17, 19, 21, 16, 18, 20, 0, 2, 5, 8, 1, 4, 7, 56, 57, 58, 59, 60, 61, 62, 63, 64, 65,
];
const SMPLX_LHAND: [usize; 21] = [
    20, 37, 38, 39, 66, 25, 26, 27, 67, 28, 29, 30, 68, 34, 35, 36, 69, 31, 32, 33, 70,
];
const SMPLX_RHAND: [usize; 21] = [
    21, 52, 53, 54, 71, 40, 41, 42, 72, 43, 44, 45, 73, 49, 50, 51, 74, 46, 47, 48, 75,
];
const SMPLX_FACE_START: usize = 76;
const SMPLX_FACE_END: usize = 127;

/// Indices of body-model joints in OpenPose keypoint order.
///
/// SMPL has no hand or face joints and SMPL-H has no face joints; those
/// groups are left out of the mapping when requested.
pub fn model_to_openpose(
    model_type: ModelType,
    use_hands: bool,
    use_face: bool,
    use_face_contour: bool,
    openpose_format: OpenPoseFormat,
) -> Vec<usize> {
    let OpenPoseFormat::Coco25 = openpose_format;
    let mut mapping = Vec::new();
    match model_type {
        ModelType::Smpl => {
            if use_hands || use_face {
                log::warn!("smpl has no hand or face joints, mapping body only");
            }
            mapping.extend_from_slice(&SMPL_BODY);
        }
        ModelType::Smplh => {
            mapping.extend_from_slice(&SMPLH_BODY);
            if use_hands {
                mapping.extend_from_slice(&SMPLH_LHAND);
                mapping.extend_from_slice(&SMPLH_RHAND);
            }
            if use_face {
                log::warn!("smplh has no face joints, face mapping skipped");
            }
        }
        ModelType::Smplx => {
            mapping.extend_from_slice(&SMPLX_BODY);
            if use_hands {
                mapping.extend_from_slice(&SMPLX_LHAND);
                mapping.extend_from_slice(&SMPLX_RHAND);
            }
            if use_face {
                let end = SMPLX_FACE_END + 17 * use_face_contour as usize;
                mapping.extend(SMPLX_FACE_START..end);
            }
        }
    }
    mapping
}

/// Optimization weight per OpenPose keypoint.
///
/// All ones, except for indices in `joints_to_ign` which are zeroed. A `-1`
/// anywhere in `joints_to_ign` disables ignoring altogether.
pub fn joint_weights(
    use_hands: bool,
    use_face: bool,
    use_face_contour: bool,
    joints_to_ign: Option<&[i64]>,
) -> Result<na::DVector<f32>> {
    let len = num_joints(use_hands)
        + 2 * use_hands as usize
        + 51 * use_face as usize
        + 17 * use_face_contour as usize;
    let mut weights = na::DVector::from_element(len, 1.0f32);

    if let Some(ign) = joints_to_ign {
        if !ign.contains(&-1) {
            for &idx in ign {
                if idx < 0 || idx as usize >= len {
                    return Err(Error::InvalidConfig(format!(
                        "joint to ignore {} out of range 0..{}",
                        idx, len
                    )));
                }
                weights[idx as usize] = 0.0;
            }
        }
    }
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_length_matches_keypoint_layout() {
        // 25 body + 2 * 21 hands + 51 face + 17 contour
        let w = joint_weights(true, true, true, None).unwrap();
        assert_eq!(w.len(), 25 + 42 + 51 + 17);
    }

    #[test]
    fn model_type_parses_case_insensitive() {
        assert_eq!("SMPLX".parse::<ModelType>().unwrap(), ModelType::Smplx);
        assert!("mano".parse::<ModelType>().is_err());
    }
}
