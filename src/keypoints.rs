//! OpenPose keypoint files.
//!
//! Each file holds `{"people": [...]}`, one entry per detected person, with
//! flat `x, y, confidence` arrays per joint group. A person is turned into an
//! `N x 3` matrix whose row layout depends on [`KeypointOptions`]:
//!
//! | rows | group |
//! |------|-------|
//! | 25   | body (BODY_25) |
//! | 21   | left hand, if `use_hands` |
//! | 21   | right hand, if `use_hands` |
//! | 51   | face landmarks 17..68, if `use_face` |
//! | 17   | face contour 0..17, if `use_face` and `use_face_contour` |

use std::path::Path;

use nalgebra as na;
use serde::Deserialize;

use crate::error::{Error, Result};

pub const FACE_LANDMARK_START: usize = 17;
pub const FACE_LANDMARK_COUNT: usize = 51;
pub const FACE_CONTOUR_COUNT: usize = 17;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeypointOptions {
    pub use_hands: bool,
    pub use_face: bool,
    pub use_face_contour: bool,
}

impl KeypointOptions {
    pub fn body_only() -> KeypointOptions {
        KeypointOptions::default()
    }
}

#[derive(Debug, Deserialize)]
struct PersonData {
    pose_keypoints_2d: Vec<f32>,
    hand_left_keypoints_2d: Option<Vec<f32>>,
    hand_right_keypoints_2d: Option<Vec<f32>>,
    face_keypoints_2d: Option<Vec<f32>>,
    gender_pd: Option<String>,
    gender_gt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeypointFile {
    people: Vec<PersonData>,
}

/// Keypoints of every person in one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Keypoints {
    /// One `N x 3` matrix (`x, y, confidence`) per person.
    pub keypoints: Vec<na::DMatrix<f32>>,
    pub gender_gt: Vec<String>,
    pub gender_pd: Vec<String>,
}

impl Keypoints {
    pub fn num_people(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// `M x N x 3` as a list of equally shaped matrices.
    pub fn stacked(&self) -> Vec<na::DMatrix<f32>> {
        self.keypoints.clone()
    }
}

fn to_rows(flat: &[f32], group: &str) -> Result<na::DMatrix<f32>> {
    if flat.len() % 3 != 0 {
        return Err(Error::InvalidKeypoints(format!(
            "{} has {} values, not a multiple of 3",
            group,
            flat.len()
        )));
    }
    Ok(na::DMatrix::from_row_slice(flat.len() / 3, 3, flat))
}

fn required<'a>(values: &'a Option<Vec<f32>>, group: &str) -> Result<&'a [f32]> {
    values
        .as_deref()
        .ok_or_else(|| Error::InvalidKeypoints(format!("{} is missing", group)))
}

fn concat_rows(blocks: &[na::DMatrix<f32>]) -> na::DMatrix<f32> {
    let rows = blocks.iter().map(|b| b.nrows()).sum();
    let mut out = na::DMatrix::zeros(rows, 3);
    let mut offset = 0;
    for b in blocks {
        out.rows_mut(offset, b.nrows()).copy_from(b);
        offset += b.nrows();
    }
    out
}

fn person_to_matrix(person: &PersonData, options: &KeypointOptions) -> Result<na::DMatrix<f32>> {
    let mut blocks = vec![to_rows(&person.pose_keypoints_2d, "pose_keypoints_2d")?];

    if options.use_hands {
        let left = required(&person.hand_left_keypoints_2d, "hand_left_keypoints_2d")?;
        let right = required(&person.hand_right_keypoints_2d, "hand_right_keypoints_2d")?;
        blocks.push(to_rows(left, "hand_left_keypoints_2d")?);
        blocks.push(to_rows(right, "hand_right_keypoints_2d")?);
    }

    if options.use_face {
        let face = to_rows(
            required(&person.face_keypoints_2d, "face_keypoints_2d")?,
            "face_keypoints_2d",
        )?;
        let needed = FACE_LANDMARK_START + FACE_LANDMARK_COUNT;
        if face.nrows() < needed {
            return Err(Error::InvalidKeypoints(format!(
                "face_keypoints_2d has {} points, need at least {}",
                face.nrows(),
                needed
            )));
        }
        blocks.push(face.rows(FACE_LANDMARK_START, FACE_LANDMARK_COUNT).into_owned());
        if options.use_face_contour {
            blocks.push(face.rows(0, FACE_CONTOUR_COUNT).into_owned());
        }
    }

    Ok(concat_rows(&blocks))
}

/// Parses the content of an OpenPose keypoint file.
pub fn parse_keypoints(contents: &str, options: &KeypointOptions) -> Result<Keypoints> {
    let data: KeypointFile = serde_json::from_str(contents)?;
    let mut out = Keypoints::default();
    for person in &data.people {
        out.keypoints.push(person_to_matrix(person, options)?);
        if let Some(g) = &person.gender_pd {
            out.gender_pd.push(g.clone());
        }
        if let Some(g) = &person.gender_gt {
            out.gender_gt.push(g.clone());
        }
    }
    Ok(out)
}

pub fn read_keypoints<P: AsRef<Path>>(keypoint_path: P, options: &KeypointOptions) -> Result<Keypoints> {
    let path = keypoint_path.as_ref();
    log::trace!("reading keypoints {}", path.display());
    let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_keypoints(&contents, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_keeps_order() {
        let a = na::DMatrix::from_row_slice(1, 3, &[1.0, 2.0, 3.0]);
        let b = na::DMatrix::from_row_slice(2, 3, &[4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let c = concat_rows(&[a, b]);
        assert_eq!(c.nrows(), 3);
        assert_eq!(c[(0, 0)], 1.0);
        assert_eq!(c[(2, 2)], 9.0);
    }

    #[test]
    fn rejects_ragged_arrays() {
        assert!(to_rows(&[1.0, 2.0], "x").is_err());
    }
}
