use crate::camera::{CameraModel, PerspectiveCamera};
use nalgebra as na;
use tiny_solver::factors::Factor;

/// Weighted pixel error of one 3D joint against its 2D keypoint.
///
/// Parameter blocks are `[rvec, tvec]`; the camera intrinsics stay fixed.
#[derive(Debug, Clone)]
pub struct KeypointReprojectionFactor {
    pub camera: PerspectiveCamera<f64>,
    pub p3d: na::Vector3<f64>,
    pub p2d: na::Vector2<f64>,
    /// Joint weight times keypoint confidence.
    pub weight: f64,
}

impl KeypointReprojectionFactor {
    pub fn new(
        camera: &PerspectiveCamera<f64>,
        p3d: &na::Vector3<f64>,
        p2d: &na::Vector2<f64>,
        weight: f64,
    ) -> KeypointReprojectionFactor {
        KeypointReprojectionFactor {
            camera: camera.clone(),
            p3d: *p3d,
            p2d: *p2d,
            weight,
        }
    }

    fn residual_generic<T: na::RealField>(&self, rvec: &na::DVector<T>, tvec: &na::DVector<T>) -> na::DVector<T> {
        debug_assert_eq!(rvec.len(), 3, "rvec must have 3 params");
        debug_assert_eq!(tvec.len(), 3, "tvec must have 3 params");
        let rvec = na::Vector3::new(rvec[0].clone(), rvec[1].clone(), rvec[2].clone());
        let tvec = na::Vector3::new(tvec[0].clone(), tvec[1].clone(), tvec[2].clone());
        let camera = self.camera.cast::<T>().with_pose_params(&rvec, &tvec);
        let p2d_p = camera.project_one(&self.p3d.cast());

        let sqrt_w = T::from_f64(self.weight.sqrt()).unwrap();
        na::dvector![
            (p2d_p[0].clone() - T::from_f64(self.p2d.x).unwrap()) * sqrt_w.clone(),
            (p2d_p[1].clone() - T::from_f64(self.p2d.y).unwrap()) * sqrt_w
        ]
    }
}

impl<T: na::RealField> Factor<T> for KeypointReprojectionFactor {
    fn residual_func(&self, params: &[na::DVector<T>]) -> na::DVector<T> {
        debug_assert_eq!(params.len(), 2, "expected [rvec, tvec] parameter blocks");
        self.residual_generic(&params[0], &params[1])
    }
}
