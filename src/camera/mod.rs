pub mod config;
pub mod generic;
pub mod perspective;

pub use config::*;
pub use generic::CameraModel;
pub use perspective::{CameraBatch, FOCAL_LENGTH, PerspectiveCamera};
