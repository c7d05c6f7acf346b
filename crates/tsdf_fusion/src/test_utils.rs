//! Test utilities: small volumes, synthetic scenes and sensor fixtures.

use glam::{DMat4, DVec3};

use crate::config::{Layout, PolarConfig, ProjectiveConfig, VolumeConfig};
use crate::sensor::{PolarSensor, ProjectiveSensor, Sensor};
use crate::space::Volume;

/// Voxel edge of the fixture volumes.
pub const VOXEL: f64 = 0.05;

/// Cells per axis of [`small_volume`].
pub const CELLS: usize = 16;

// =============================================================================
// Volumes
// =============================================================================

/// 16³ cells of 5 cm in 4³ partitions, spanning `[0, 0.8]` on every axis.
/// Truncation radius 0.2.
pub fn small_volume() -> Volume {
  let config = VolumeConfig::new(VOXEL, Layout::new(2).unwrap(), Layout::new(2).unwrap());
  Volume::new(config).unwrap()
}

/// Write a signed distance field into every cell and refresh borders.
pub fn fill_field<F: Fn(DVec3) -> f64>(volume: &mut Volume, sdf: F) {
  let cells = volume.x_dimension();
  for x in 0..cells {
    for y in 0..cells {
      for z in 0..cells {
        let center = volume.cell_center([x, y, z]);
        volume.add_tsd_at([x, y, z], sdf(center), None);
      }
    }
  }
  volume.propagate_borders();
}

/// Plane `z = height`, positive below it.
pub fn plane_z(height: f64) -> impl Fn(DVec3) -> f64 {
  move |p: DVec3| height - p.z
}

/// Axis-aligned box, positive outside.
pub fn box_sdf(min: DVec3, max: DVec3) -> impl Fn(DVec3) -> f64 {
  move |p: DVec3| {
    let center = (min + max) * 0.5;
    let half = (max - min) * 0.5;
    let q = (p - center).abs() - half;
    q.max(DVec3::ZERO).length() + q.max_element().min(0.0)
  }
}

// =============================================================================
// Sensors
// =============================================================================

/// 15 × 15 pinhole camera with the principal point on pixel (7, 7).
pub fn small_camera() -> ProjectiveSensor {
  ProjectiveSensor::new(ProjectiveConfig::new(15, 15, 20.0, 20.0, 7.0, 7.0)).unwrap()
}

/// Camera at `position` looking down +z onto a wall at `z = wall`.
pub fn camera_facing_wall(position: DVec3, wall: f64) -> ProjectiveSensor {
  let mut camera = small_camera();
  camera
    .set_pose(DMat4::from_translation(position))
    .unwrap();
  let depth = vec![wall - position.z; camera.ray_count()];
  camera.set_depth_map(&depth, None);
  camera
}

/// Coarse full-sphere scanner: 72 beams and 36 planes at 5 degrees.
pub fn coarse_polar() -> PolarSensor {
  let deg = std::f64::consts::PI / 180.0;
  PolarSensor::new(PolarConfig::new(72, 5.0 * deg, -180.0 * deg, 5.0 * deg)).unwrap()
}

/// Scanner at `position` inside a sphere of the given radius.
pub fn polar_in_sphere(position: DVec3, radius: f64) -> PolarSensor {
  let mut scanner = coarse_polar();
  scanner
    .set_pose(DMat4::from_translation(position))
    .unwrap();
  let distances = vec![radius; scanner.ray_count()];
  scanner.set_measurements(&distances, None);
  scanner
}
