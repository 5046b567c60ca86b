use std::path::PathBuf;

use image::Rgb32FImage;
use nalgebra as na;
use prox_fit_data::data_loader::{DatasetConfig, FrameData};
use prox_fit_data::io::{FrameReport, object_from_json, object_to_json, write_loading_report};
use prox_fit_data::joints::ModelType;
use tempfile::TempDir;

#[test]
fn test_partial_config_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"data_folder": "/data/prox/s001", "use_hands": true, "model_type": "smplh", "joints_to_ign": [1, 9, 12]}"#,
    )
    .unwrap();

    let config: DatasetConfig = object_from_json(&path).unwrap();
    assert_eq!(config.data_folder, PathBuf::from("/data/prox/s001"));
    assert!(config.use_hands);
    assert_eq!(config.model_type, ModelType::Smplh);
    assert_eq!(config.joints_to_ign, Some(vec![1, 9, 12]));
    assert_eq!(config.img_folder, PathBuf::from("images"));
    assert_eq!(config.depth_folder, PathBuf::from("Depth"));
    assert_eq!(config.start, 1);
    assert_eq!(config.min_samples, 100);
    assert!(!config.read_depth);
}

#[test]
fn test_config_roundtrip_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    let config = DatasetConfig {
        frame_ids: Some(vec![3, 7]),
        drop_noise: true,
        ..Default::default()
    };
    object_to_json(&path, &config).unwrap();
    let loaded: DatasetConfig = object_from_json(&path).unwrap();
    assert_eq!(loaded.frame_ids, Some(vec![3, 7]));
    assert!(loaded.drop_noise);

    let missing = object_from_json::<DatasetConfig, _>(temp_dir.path().join("nope.json"));
    assert!(missing.is_err());
}

#[test]
fn test_loading_report() {
    let frame = FrameData {
        fn_stem: "s001_frame_00001".to_string(),
        img_path: PathBuf::from("images/s001_frame_00001.jpg"),
        keypoints: vec![na::DMatrix::zeros(25, 3), na::DMatrix::zeros(25, 3)],
        img: Rgb32FImage::new(2, 2),
        init_trans: Some(na::Vector3::new(0.1, 0.2, 2.0)),
        depth_im: None,
        mask: None,
        scan: None,
        gender_gt: vec![],
        gender_pd: vec!["female".to_string()],
    };
    let report = FrameReport::from(&frame);
    assert_eq!(report.num_people, 2);
    assert_eq!(report.num_keypoints, 25);
    assert_eq!(report.scan_points, 0);

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("frames.json");
    write_loading_report(&path, &[report], 3, &["images/broken.jpg".to_string()]).unwrap();

    let written: serde_json::Value = object_from_json(&path).unwrap();
    assert_eq!(written["total_frames"], 3);
    assert_eq!(written["frames_with_people"], 1);
    assert_eq!(written["failed_frames"][0], "images/broken.jpg");
    assert_eq!(written["frames"][0]["name"], "s001_frame_00001");
    assert_eq!(written["frames"][0]["gender_pd"][0], "female");
    assert_eq!(written["frames"][0]["init_trans"][2], 2.0);
}
