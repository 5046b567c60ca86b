use super::generic::{CameraModel, rodrigues};
use crate::error::{Error, Result};
use nalgebra as na;
use num_dual::{DualSVec64, jacobian};

/// Focal length used when none is given, in pixels.
pub const FOCAL_LENGTH: f64 = 5000.0;

/// Pinhole camera with optimizable extrinsics and fixed intrinsics.
///
/// `rotation` and `translation` are the free parameters during fitting;
/// focal lengths and the principal point stay constant.
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera<T: na::RealField> {
    pub rotation: na::Matrix3<T>,
    pub translation: na::Vector3<T>,
    pub focal_length_x: T,
    pub focal_length_y: T,
    pub center: na::Vector2<T>,
}

impl<T: na::RealField> Default for PerspectiveCamera<T> {
    fn default() -> Self {
        let f = T::from_f64(FOCAL_LENGTH).unwrap();
        PerspectiveCamera::new(f.clone(), f, na::Vector2::zeros())
    }
}

impl<T: na::RealField> PerspectiveCamera<T> {
    pub fn new(focal_length_x: T, focal_length_y: T, center: na::Vector2<T>) -> PerspectiveCamera<T> {
        PerspectiveCamera {
            rotation: na::Matrix3::identity(),
            translation: na::Vector3::zeros(),
            focal_length_x,
            focal_length_y,
            center,
        }
    }

    pub fn with_extrinsics(mut self, rotation: na::Matrix3<T>, translation: na::Vector3<T>) -> Self {
        self.rotation = rotation;
        self.translation = translation;
        self
    }

    /// Replaces the extrinsics from an axis-angle rotation and a translation.
    pub fn with_pose_params(self, rvec: &na::Vector3<T>, tvec: &na::Vector3<T>) -> Self {
        let rotation = rodrigues(rvec);
        self.with_extrinsics(rotation, tvec.clone())
    }

    /// `[[fx, 0], [0, fy]]`
    pub fn camera_mat(&self) -> na::Matrix2<T> {
        na::Matrix2::new(
            self.focal_length_x.clone(),
            T::zero(),
            T::zero(),
            self.focal_length_y.clone(),
        )
    }

    /// Homogeneous `[R | t]` with a `[0, 0, 0, 1]` bottom row.
    pub fn camera_transform(&self) -> na::Matrix4<T> {
        let mut transform = na::Matrix4::identity();
        transform
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&self.rotation);
        transform
            .fixed_view_mut::<3, 1>(0, 3)
            .copy_from(&self.translation);
        transform
    }

    fn project_one_impl(&self, pt: &na::Vector3<T>) -> na::Vector2<T> {
        let camera_mat = self.camera_mat();
        let camera_transform = self.camera_transform();

        let point_h = pt.clone().push(T::one());
        let projected = camera_transform * point_h;

        let z = projected[2].clone();
        let img_point = na::Vector2::new(projected[0].clone() / z.clone(), projected[1].clone() / z);
        camera_mat * img_point + self.center.clone()
    }
}

impl PerspectiveCamera<f64> {
    pub fn cast<U: na::RealField>(&self) -> PerspectiveCamera<U> {
        PerspectiveCamera {
            rotation: self.rotation.cast(),
            translation: self.translation.cast(),
            focal_length_x: na::convert(self.focal_length_x),
            focal_length_y: na::convert(self.focal_length_y),
            center: self.center.cast(),
        }
    }

    /// Axis-angle rotation and translation of the current extrinsics.
    ///
    /// A rotation that is not orthonormal is replaced by its closest rotation.
    pub fn pose_params(&self) -> (na::Vector3<f64>, na::Vector3<f64>) {
        let rotation = na::Rotation3::from_matrix(&self.rotation);
        (rotation.scaled_axis(), self.translation)
    }

    /// Derivative of the projected pixel w.r.t. `[rvec, tvec]`.
    pub fn pose_jacobian(&self, pt: &na::Vector3<f64>) -> (na::Vector2<f64>, na::SMatrix<f64, 2, 6>) {
        let (rvec, tvec) = self.pose_params();
        let x0 = na::SVector::<f64, 6>::new(rvec.x, rvec.y, rvec.z, tvec.x, tvec.y, tvec.z);
        let camera = self.cast::<DualSVec64<6>>();
        let pt = pt.cast::<DualSVec64<6>>();
        let (value, jac) = jacobian(
            |x: na::SVector<DualSVec64<6>, 6>| {
                let rvec = x.fixed_rows::<3>(0).into_owned();
                let tvec = x.fixed_rows::<3>(3).into_owned();
                camera.clone().with_pose_params(&rvec, &tvec).project_one(&pt)
            },
            x0,
        );
        (value, jac)
    }
}

impl<T: na::RealField> CameraModel<T> for PerspectiveCamera<T> {
    fn project_one(&self, pt: &na::Vector3<T>) -> na::Vector2<T> {
        self.project_one_impl(pt)
    }
}

/// One camera per batch element.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraBatch<T: na::RealField> {
    pub cameras: Vec<PerspectiveCamera<T>>,
}

impl<T: na::RealField> CameraBatch<T> {
    pub fn new(cameras: Vec<PerspectiveCamera<T>>) -> CameraBatch<T> {
        CameraBatch { cameras }
    }

    pub fn batch_size(&self) -> usize {
        self.cameras.len()
    }

    /// Projects the `i`-th point set with the `i`-th camera.
    pub fn project(&self, points: &[Vec<na::Vector3<T>>]) -> Result<Vec<Vec<na::Vector2<T>>>> {
        if points.len() != self.cameras.len() {
            return Err(Error::BatchMismatch {
                expected: self.cameras.len(),
                actual: points.len(),
            });
        }
        Ok(self
            .cameras
            .iter()
            .zip(points)
            .map(|(camera, p3ds)| camera.project(p3ds))
            .collect())
    }
}
