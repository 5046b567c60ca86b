use nalgebra as na;
use prox_fit_data::camera::{CameraModel, PerspectiveCamera};
use prox_fit_data::error::Error;
use prox_fit_data::optimization::{FitOptions, KeypointReprojectionFactor, fit_camera_pose};
use tiny_solver::factors::Factor;

fn intrinsics() -> PerspectiveCamera<f64> {
    PerspectiveCamera::new(500.0, 500.0, na::Vector2::new(320.0, 240.0))
}

/// Corners and face centres of a 0.6 m cube around the origin.
fn joints() -> Vec<na::Vector3<f64>> {
    let mut pts = Vec::new();
    for x in [-0.3, 0.3] {
        for y in [-0.3, 0.3] {
            for z in [-0.3, 0.3] {
                pts.push(na::Vector3::new(x, y, z));
            }
        }
    }
    pts.push(na::Vector3::new(0.0, 0.0, 0.3));
    pts.push(na::Vector3::new(0.0, 0.3, 0.0));
    pts.push(na::Vector3::new(0.3, 0.0, 0.0));
    pts.push(na::Vector3::new(-0.3, 0.0, 0.0));
    pts
}

fn observe(camera: &PerspectiveCamera<f64>, pts: &[na::Vector3<f64>]) -> na::DMatrix<f32> {
    let p2ds = camera.project(pts);
    na::DMatrix::from_fn(pts.len(), 3, |r, c| match c {
        0 => p2ds[r].x as f32,
        1 => p2ds[r].y as f32,
        _ => 1.0,
    })
}

#[test]
fn test_factor_residual() {
    let rvec = na::Vector3::new(0.05, -0.02, 0.01);
    let tvec = na::Vector3::new(0.1, -0.2, 3.0);
    let camera = intrinsics().with_pose_params(&rvec, &tvec);
    let p3d = na::Vector3::new(0.2, 0.1, -0.1);
    let p2d = camera.project_one(&p3d);

    let factor = KeypointReprojectionFactor::new(&intrinsics(), &p3d, &p2d, 4.0);
    let params = vec![
        na::DVector::from_column_slice(rvec.as_slice()),
        na::DVector::from_column_slice(tvec.as_slice()),
    ];
    let residual = factor.residual_func(&params);
    assert_eq!(residual.len(), 2);
    assert!(residual.norm() < 1e-9);

    // shifting the camera 1 cm sideways moves the projection f / z px, scaled by sqrt(w)
    let mut shifted = params.clone();
    shifted[1][0] += 0.01;
    let residual = factor.residual_func(&shifted);
    let expected = 2.0 * 500.0 * 0.01 / (3.0 - 0.1);
    assert!((residual[0] - expected).abs() < 0.05, "{}", residual[0]);
}

#[test]
fn test_fit_recovers_pose() {
    let rvec = na::Vector3::new(0.05, -0.02, 0.01);
    let tvec = na::Vector3::new(0.1, -0.2, 3.0);
    let truth = intrinsics().with_pose_params(&rvec, &tvec);
    let pts = joints();
    let keypoints = observe(&truth, &pts);

    let init = intrinsics().with_extrinsics(na::Matrix3::identity(), na::Vector3::new(0.0, 0.0, 2.5));
    let fitted = fit_camera_pose(&init, &pts, &keypoints, None, &FitOptions::default()).unwrap();

    let (r, t) = fitted.pose_params();
    assert!((r - rvec).norm() < 1e-3, "rvec {:?}", r);
    assert!((t - tvec).norm() < 1e-3, "tvec {:?}", t);
    assert_eq!(fitted.focal_length_x, 500.0);
}

#[test]
fn test_fit_translation_only() {
    let tvec = na::Vector3::new(-0.1, 0.05, 4.0);
    let truth = intrinsics().with_extrinsics(na::Matrix3::identity(), tvec);
    let pts = joints();
    let keypoints = observe(&truth, &pts);

    let init = intrinsics().with_extrinsics(na::Matrix3::identity(), na::Vector3::new(0.0, 0.0, 3.0));
    let options = FitOptions {
        fix_rotation: true,
        ..Default::default()
    };
    let fitted = fit_camera_pose(&init, &pts, &keypoints, None, &options).unwrap();
    assert!((fitted.rotation - na::Matrix3::identity()).norm() < 1e-9);
    assert!((fitted.translation - tvec).norm() < 1e-3, "{:?}", fitted.translation);
}

#[test]
fn test_zero_weight_rows_are_skipped() {
    let truth = intrinsics().with_extrinsics(na::Matrix3::identity(), na::Vector3::new(0.0, 0.0, 3.0));
    let pts = joints();
    let mut keypoints = observe(&truth, &pts);
    // a wild outlier with no confidence must not pull the fit
    keypoints[(0, 0)] = 10_000.0;
    keypoints[(0, 2)] = 0.0;

    let mut weights = na::DVector::from_element(pts.len(), 1.0f32);
    keypoints[(1, 1)] = -10_000.0;
    weights[1] = 0.0;

    let init = intrinsics().with_extrinsics(na::Matrix3::identity(), na::Vector3::new(0.0, 0.0, 2.5));
    let fitted = fit_camera_pose(&init, &pts, &keypoints, Some(&weights), &FitOptions::default()).unwrap();
    assert!((fitted.translation - na::Vector3::new(0.0, 0.0, 3.0)).norm() < 1e-3);
}

#[test]
fn test_insufficient_keypoints() {
    let camera = intrinsics();
    let pts = joints();
    let mut keypoints = observe(&camera.clone().with_extrinsics(na::Matrix3::identity(), na::Vector3::new(0.0, 0.0, 3.0)), &pts);
    for r in 2..pts.len() {
        keypoints[(r, 2)] = 0.0;
    }
    let err = fit_camera_pose(&camera, &pts, &keypoints, None, &FitOptions::default()).unwrap_err();
    assert!(matches!(err, Error::InsufficientData { required: 3, available: 2 }));

    let two_cols = na::DMatrix::<f32>::zeros(pts.len(), 2);
    let err = fit_camera_pose(&camera, &pts, &two_cols, None, &FitOptions::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidKeypoints(_)));
}
