use prox_fit_data::error::Error;
use prox_fit_data::joints::{
    ModelType, OpenPoseFormat, joint_weights, model_to_openpose, num_joints,
};

#[test]
fn test_num_joints() {
    assert_eq!(num_joints(false), 25);
    assert_eq!(num_joints(true), 65);
}

#[test]
fn test_smplx_mapping() {
    let body = model_to_openpose(ModelType::Smplx, false, false, false, OpenPoseFormat::Coco25);
    assert_eq!(body.len(), 25);
    // OpenPose nose is the first extra SMPL-X vertex joint, neck is joint 12
    assert_eq!(body[0], 55);
    assert_eq!(body[1], 12);

    let full = model_to_openpose(ModelType::Smplx, true, true, false, OpenPoseFormat::Coco25);
    assert_eq!(full.len(), 25 + 42 + 51);
    assert_eq!(full[25], 20);
    assert_eq!(full[46], 21);
    assert_eq!(full[67], 76);
    assert_eq!(*full.last().unwrap(), 126);

    let contour = model_to_openpose(ModelType::Smplx, true, true, true, OpenPoseFormat::Coco25);
    assert_eq!(contour.len(), 25 + 42 + 51 + 17);
    assert_eq!(*contour.last().unwrap(), 143);
}

#[test]
fn test_smpl_and_smplh_mapping() {
    let smpl = model_to_openpose(ModelType::Smpl, true, true, false, OpenPoseFormat::Coco25);
    assert_eq!(smpl.len(), 25);
    assert_eq!(smpl[0], 24);

    let smplh = model_to_openpose(ModelType::Smplh, true, true, false, OpenPoseFormat::Coco25);
    assert_eq!(smplh.len(), 25 + 42);
    assert_eq!(smplh[0], 52);
}

#[test]
fn test_joint_weights_ignore() {
    let w = joint_weights(false, false, false, Some(&[1, 9, 12])).unwrap();
    assert_eq!(w.len(), 25);
    assert_eq!(w[1], 0.0);
    assert_eq!(w[9], 0.0);
    assert_eq!(w[12], 0.0);
    assert_eq!(w.sum(), 22.0);
}

#[test]
fn test_joint_weights_minus_one_disables_ignore() {
    let w = joint_weights(false, false, false, Some(&[1, -1])).unwrap();
    assert_eq!(w.sum(), 25.0);
}

#[test]
fn test_joint_weights_lengths() {
    assert_eq!(joint_weights(true, false, false, None).unwrap().len(), 67);
    assert_eq!(joint_weights(false, true, false, None).unwrap().len(), 76);
    // contour weights are counted from the flag alone
    assert_eq!(joint_weights(false, false, true, None).unwrap().len(), 42);
}

#[test]
fn test_joint_weights_out_of_range() {
    let err = joint_weights(false, false, false, Some(&[30])).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn test_parse_enums() {
    assert_eq!("smplh".parse::<ModelType>().unwrap(), ModelType::Smplh);
    assert_eq!("COCO25".parse::<OpenPoseFormat>().unwrap(), OpenPoseFormat::Coco25);
    assert!("coco19".parse::<OpenPoseFormat>().is_err());
    assert_eq!(ModelType::Smplx.to_string(), "smplx");
}
