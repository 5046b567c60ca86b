pub mod camera;
pub mod cluster;
pub mod data_loader;
pub mod error;
pub mod io;
pub mod joints;
pub mod keypoints;
pub mod optimization;
pub mod projection;
pub mod visualization;

pub use camera::{CameraBatch, CameraConfig, CameraModel, PerspectiveCamera, create_camera};
pub use data_loader::{DatasetConfig, FrameData, OpenPoseDataset, create_dataset};
pub use error::{Error, Result};
pub use keypoints::{KeypointOptions, Keypoints, read_keypoints};
pub use projection::{Projection, Scan, ScanOptions};
