use std::io::Write;
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::data_loader::FrameData;
use crate::error::{Error, Result};

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize, P: AsRef<Path>>(output_path: P, object: &T) -> Result<()> {
    let path = output_path.as_ref();
    let j = serde_json::to_string_pretty(object)?;
    let mut file = std::fs::File::create(path).map_err(|e| Error::io(path, e))?;
    file.write_all(j.as_bytes()).map_err(|e| Error::io(path, e))
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned, P: AsRef<Path>>(file_path: P) -> Result<T> {
    let path = file_path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Per-frame entry of a loading report.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FrameReport {
    pub name: String,
    pub img_path: String,
    pub num_people: usize,
    pub num_keypoints: usize,
    pub has_depth: bool,
    pub has_mask: bool,
    pub scan_points: usize,
    pub init_trans: Option<[f32; 3]>,
    pub gender_gt: Vec<String>,
    pub gender_pd: Vec<String>,
}

impl From<&FrameData> for FrameReport {
    fn from(frame: &FrameData) -> Self {
        FrameReport {
            name: frame.fn_stem.clone(),
            img_path: frame.img_path.to_string_lossy().into_owned(),
            num_people: frame.keypoints.len(),
            num_keypoints: frame.keypoints.first().map(|k| k.nrows()).unwrap_or(0),
            has_depth: frame.depth_im.is_some(),
            has_mask: frame.mask.is_some(),
            scan_points: frame.scan.as_ref().map(|s| s.len()).unwrap_or(0),
            init_trans: frame.init_trans.map(|t| [t.x, t.y, t.z]),
            gender_gt: frame.gender_gt.clone(),
            gender_pd: frame.gender_pd.clone(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct LoadingReport {
    pub timestamp: String,
    pub total_frames: usize,
    pub frames_with_people: usize,
    pub failed_frames: Vec<String>,
    pub frames: Vec<FrameReport>,
}

/// Writes a JSON summary of a loading pass.
///
/// `frames` only covers frames with at least one person; `failed` names the
/// frames that returned an error.
pub fn write_loading_report<P: AsRef<Path>>(
    output_path: P,
    frames: &[FrameReport],
    total_frames: usize,
    failed: &[String],
) -> Result<()> {
    use std::time::SystemTime;

    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let report = LoadingReport {
        timestamp: timestamp.to_string(),
        total_frames,
        frames_with_people: frames.len(),
        failed_frames: failed.to_vec(),
        frames: frames.to_vec(),
    };
    object_to_json(output_path, &report)
}
