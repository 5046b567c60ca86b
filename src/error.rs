//! Error types for frame loading and camera fitting.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image error on {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("unsupported image {}: {reason}", path.display())]
    InvalidImage { path: PathBuf, reason: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("unknown camera type: {0}")]
    UnknownCameraType(String),

    #[error("unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("invalid keypoints: {0}")]
    InvalidKeypoints(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("batch size mismatch: expected {expected}, got {actual}")]
    BatchMismatch { expected: usize, actual: usize },

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("calibration missing: {0}")]
    MissingCalibration(String),

    #[error("insufficient data: need {required} samples, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("optimization failed: {0}")]
    Optimization(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Error::Image {
            path: path.into(),
            source,
        }
    }
}
