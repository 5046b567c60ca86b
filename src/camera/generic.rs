use nalgebra as na;
use rayon::prelude::*;

/// A camera that maps camera- or world-frame points to pixels.
///
/// Implementations must be generic-friendly: the same code path is used with
/// `f64` and with dual numbers when derivatives are needed.
pub trait CameraModel<T: na::RealField + Clone>
where
    Self: Sync,
{
    fn project_one(&self, pt: &na::Vector3<T>) -> na::Vector2<T>;

    /// Projects every point. No visibility or image-bound filtering is applied.
    fn project(&self, p3d: &[na::Vector3<T>]) -> Vec<na::Vector2<T>> {
        p3d.par_iter().map(|pt| self.project_one(pt)).collect()
    }
}

/// Rotation matrix from an axis-angle vector.
///
/// Near zero the first-order expansion is used so that derivatives stay
/// finite and non-zero when evaluated with dual numbers.
pub fn rodrigues<T: na::RealField>(rvec: &na::Vector3<T>) -> na::Matrix3<T> {
    let theta2 = rvec.dot(rvec);
    let skew = rvec.cross_matrix();
    if theta2 < T::from_f64(1e-12).unwrap() {
        return na::Matrix3::identity() + skew;
    }
    let theta = theta2.clone().sqrt();
    let k = skew / theta.clone();
    let k2 = &k * &k;
    na::Matrix3::identity() + k * theta.clone().sin() + k2 * (T::one() - theta.cos())
}
