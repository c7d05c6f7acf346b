use glam::{DMat4, DQuat, DVec3};

use super::*;
use crate::partition::PartitionState;
use crate::sensor::Sensor;
use crate::test_utils::*;

const CAMERA: DVec3 = DVec3::new(0.425, 0.425, -0.3);
const WALL: f64 = 0.5;

// =========================================================================
// Projective frames
// =========================================================================

#[test]
fn test_push_wall_allocates_around_surface() {
  let mut volume = small_volume();
  let camera = camera_facing_wall(CAMERA, WALL);

  let stats = volume.push(&camera);
  assert!(stats.selected > 0);
  assert!(stats.allocated > 0);
  assert!(stats.fused_cells > 0);
  assert_eq!(stats.allocated, volume.allocated_partitions());

  // In front of the wall positive, behind it negative
  let front = volume.tsd_at(DVec3::new(0.425, 0.425, 0.425)).unwrap();
  let back = volume.tsd_at(DVec3::new(0.425, 0.425, 0.575)).unwrap();
  assert!((front - 0.375).abs() < 1e-3, "front {front}");
  assert!((back + 0.375).abs() < 1e-3, "back {back}");
}

#[test]
fn test_push_far_wall_only_carves() {
  let mut volume = small_volume();
  let camera = camera_facing_wall(CAMERA, 5.0);

  let stats = volume.push(&camera);
  assert_eq!(stats.allocated, 0);
  assert_eq!(stats.fused_cells, 0);
  assert!(stats.carved > 0);
  assert_eq!(volume.allocated_partitions(), 0);
  assert_eq!(
    volume.partition_state(DVec3::new(0.425, 0.425, 0.425)),
    Some(PartitionState::Carved)
  );
}

#[test]
fn test_carved_partition_allocates_as_free_space() {
  let mut volume = small_volume();
  volume.push(&camera_facing_wall(CAMERA, 5.0));
  volume.push(&camera_facing_wall(CAMERA, WALL));

  // Carved once, so cells start with the free-space weight before fusion
  let p = DVec3::new(0.425, 0.425, 0.425);
  let idx = volume.coord_to_index(p).unwrap();
  let [x, y, z] = idx.cell;
  let cell = volume.partitions()[idx.partition].cell(x, y, z).unwrap();
  assert_eq!(cell.weight, 2.0);
  assert!((cell.tsd.unwrap() - (1.0 + 0.375) / 2.0).abs() < 1e-3);
}

#[test]
fn test_push_without_measurements_touches_nothing() {
  let mut volume = small_volume();
  let mut camera = small_camera();
  camera.set_pose(DMat4::from_translation(CAMERA)).unwrap();

  let stats = volume.push(&camera);
  assert!(stats.selected > 0);
  assert_eq!(stats.allocated + stats.carved + stats.fused_cells, 0);
  assert!(volume
    .partitions()
    .iter()
    .all(|p| p.state() == PartitionState::Empty));
}

#[test]
fn test_push_camera_facing_away_selects_nothing() {
  let mut volume = small_volume();
  let mut camera = small_camera();
  let pose = DMat4::from_rotation_translation(
    DQuat::from_rotation_y(std::f64::consts::PI),
    DVec3::new(0.4, 0.4, -5.0),
  );
  camera.set_pose(pose).unwrap();
  camera.set_depth_map(&vec![0.5; camera.ray_count()], None);

  let stats = volume.push(&camera);
  assert_eq!(stats.selected, 0);
  assert_eq!(volume.allocated_partitions(), 0);
}

#[test]
fn test_push_fuses_color() {
  let mut volume = small_volume();
  let mut camera = camera_facing_wall(CAMERA, WALL);
  let depth = vec![WALL - CAMERA.z; camera.ray_count()];
  let rgb = vec![[200, 100, 50]; camera.ray_count()];
  camera.set_depth_map(&depth, Some(&rgb));

  volume.push(&camera);
  let color = volume
    .interpolate_trilinear_rgb(DVec3::new(0.425, 0.425, 0.475))
    .unwrap();
  assert_eq!(color, [200, 100, 50]);
}

#[test]
fn test_weights_saturate_over_many_frames() {
  let mut volume = small_volume();
  let camera = camera_facing_wall(CAMERA, WALL);
  for _ in 0..40 {
    volume.push(&camera);
  }

  let idx = volume.coord_to_index(DVec3::new(0.425, 0.425, 0.475)).unwrap();
  let [x, y, z] = idx.cell;
  let cell = volume.partitions()[idx.partition].cell(x, y, z).unwrap();
  assert_eq!(cell.weight, crate::constants::MAX_WEIGHT);
}

// =========================================================================
// Polar frames
// =========================================================================

#[test]
fn test_push_polar_sphere() {
  let mut volume = small_volume();
  let center = DVec3::splat(0.425);
  let scanner = polar_in_sphere(center, 0.3);

  let stats = volume.push(&scanner);
  assert!(stats.allocated > 0);

  // Cell exactly on the sphere
  let on_surface = volume.tsd_at(center + DVec3::new(0.3, 0.0, 0.0)).unwrap();
  assert!(on_surface.abs() < 1e-6);

  // One truncation radius inside the sphere
  let inside = volume.tsd_at(center + DVec3::new(0.1, 0.0, 0.0)).unwrap();
  assert!((inside - 1.0).abs() < 1e-6);
}

// =========================================================================
// push vs push_tree
// =========================================================================

#[test]
fn test_visible_partitions_matches_stats() {
  let mut volume = small_volume();
  let camera = camera_facing_wall(CAMERA, WALL);
  let visible = volume.visible_partitions(&camera);
  assert!(!visible.is_empty());
  assert_eq!(volume.push(&camera).selected, visible.len());
}

fn assert_same_volume(a: &Volume, b: &Volume) {
  assert_eq!(a.partitions().len(), b.partitions().len());
  for (pa, pb) in a.partitions().iter().zip(b.partitions()) {
    assert_eq!(pa.storage(), pb.storage());
  }
}

#[test]
fn test_push_tree_matches_push() {
  let mut flat = small_volume();
  let mut tree = small_volume();

  let tilted = {
    let mut camera = small_camera();
    let pose = DMat4::from_rotation_translation(
      DQuat::from_rotation_x(0.3) * DQuat::from_rotation_y(-0.2),
      DVec3::new(0.3, 0.5, -0.4),
    );
    camera.set_pose(pose).unwrap();
    camera.set_depth_map(&vec![0.9; camera.ray_count()], None);
    camera
  };
  let frames = [
    camera_facing_wall(CAMERA, WALL),
    tilted,
    camera_facing_wall(CAMERA, 5.0),
  ];

  for camera in &frames {
    let a = flat.push(camera);
    let b = tree.push_tree(camera);
    assert_eq!(a.selected, b.selected);
    assert_eq!(a.allocated, b.allocated);
    assert_eq!(a.carved, b.carved);
    assert_eq!(a.fused_cells, b.fused_cells);
  }
  assert_same_volume(&flat, &tree);

  let scanner = polar_in_sphere(DVec3::splat(0.4), 0.25);
  flat.push(&scanner);
  tree.push_tree(&scanner);
  assert_same_volume(&flat, &tree);
}
