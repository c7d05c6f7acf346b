use super::*;

#[test]
fn test_layout_cells() {
  assert_eq!(Layout::new(0).unwrap().cells(), 1);
  assert_eq!(Layout::new(5).unwrap().cells(), 32);
  assert_eq!(Layout::new(10).unwrap().cells(), 1024);
  assert!(Layout::new(11).is_err());
}

#[test]
fn test_layout_from_cells() {
  assert_eq!(Layout::from_cells(16).unwrap().exponent(), 4);
  assert!(Layout::from_cells(12).is_err());
  assert!(Layout::from_cells(2048).is_err());
}

#[test]
fn test_volume_config_cells_per_axis() {
  let config = VolumeConfig::new(0.1, Layout::new(3).unwrap(), Layout::new(2).unwrap());
  assert_eq!(config.cells_per_axis(), 32);
  assert!(config.validate().is_ok());
}

#[test]
fn test_volume_config_rejects_oversized_layout() {
  let config = VolumeConfig::new(0.1, Layout::new(6).unwrap(), Layout::new(5).unwrap());
  assert!(matches!(config.validate(), Err(TsdfError::InvalidConfig(_))));
}

#[test]
fn test_volume_config_rejects_bad_voxel_size() {
  let mut config = VolumeConfig::default();
  config.voxel_size = 0.0;
  assert!(config.validate().is_err());

  config.voxel_size = f64::NAN;
  assert!(config.validate().is_err());
}

#[test]
fn test_volume_config_rejects_bad_truncation() {
  let config = VolumeConfig::default().with_max_truncation(-1.0);
  assert!(config.validate().is_err());
}

#[test]
fn test_volume_config_from_toml() {
  let config: VolumeConfig = from_toml_str(
    r#"
      voxel_size = 0.02
      partition_layout = 4
      space_layout = 5
      max_truncation = 0.08
      origin = [1.0, 2.0, 3.0]
    "#,
  )
  .unwrap();

  assert_eq!(config.voxel_size, 0.02);
  assert_eq!(config.partition_layout.cells(), 16);
  assert_eq!(config.space_layout.cells(), 32);
  assert_eq!(config.max_truncation, 0.08);
  assert_eq!(config.origin, [1.0, 2.0, 3.0]);
  assert!(config.validate().is_ok());
}

#[test]
fn test_toml_layout_out_of_range() {
  let result: Result<VolumeConfig> =
    from_toml_str("voxel_size = 0.1\npartition_layout = 200\nspace_layout = 100");
  assert!(matches!(result, Err(TsdfError::Toml(_))));

  let result: Result<VolumeConfig> =
    from_toml_str("voxel_size = 0.1\npartition_layout = 6\nspace_layout = 5");
  assert!(matches!(result.unwrap().validate(), Err(TsdfError::InvalidConfig(_))));
}

#[test]
fn test_validate_large_exponents_without_overflow() {
  let config = VolumeConfig::new(0.1, Layout(200), Layout(100));
  assert!(matches!(config.validate(), Err(TsdfError::InvalidConfig(_))));
}

#[test]
fn test_toml_defaults_fill_missing_fields() {
  let config: RayCastConfig = from_toml_str("max_distance = 4.5").unwrap();
  assert_eq!(config.max_distance, 4.5);
  assert_eq!(config.step_factor, 1.0);
  assert!(config.normals);
}

#[test]
fn test_toml_parse_error() {
  let result: Result<VolumeConfig> = from_toml_str("voxel_size = \"big\"");
  assert!(matches!(result, Err(TsdfError::Toml(_))));
}

#[test]
fn test_toml_file() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("camera.toml");
  std::fs::write(&path, "cols = 4\nrows = 3\nfx = 2.0\nfy = 2.0\ncx = 1.5\ncy = 1.0\n").unwrap();

  let config: ProjectiveConfig = from_toml_file(&path).unwrap();
  assert_eq!(config.cols, 4);
  assert_eq!(config.rows, 3);
  assert!(config.max_range.is_none());
  assert!(config.validate().is_ok());
}

#[test]
fn test_sensor_config_validation() {
  assert!(PolarConfig::default().validate().is_ok());
  assert!(PolarConfig::new(0, 0.1, 0.0, 0.1).validate().is_err());
  assert!(PolarConfig::new(10, 0.1, 0.0, 0.0).validate().is_err());

  assert!(ProjectiveConfig::default().validate().is_ok());
  assert!(ProjectiveConfig::new(0, 10, 1.0, 1.0, 0.0, 0.0).validate().is_err());
}

#[test]
fn test_raycast_config_builder() {
  let config = RayCastConfig::new()
    .with_step_factor(0.5)
    .with_max_distance(3.0)
    .with_normals(false)
    .with_rgb(true);

  assert_eq!(config.step_factor, 0.5);
  assert_eq!(config.max_distance, 3.0);
  assert!(!config.normals);
  assert!(config.rgb);
  assert!(config.validate().is_ok());
}
