//! Sensor models feeding the volume.
//!
//! A sensor has a fixed ray layout in its own frame and, per frame, a pose plus
//! one measured distance, a validity flag and optionally a color per ray.
//!
//! ```text
//!   world point ──inverse pose──► sensor frame ──project──► ray index
//!                                                             │
//!                                 measured distance ◄─────────┘
//! ```
//!
//! Rays are indexed row-major: `index = row * cols + col` with `(rows, cols)`
//! from [`Sensor::dimensions`].

pub mod polar;
pub mod projective;

pub use polar::PolarSensor;
pub use projective::ProjectiveSensor;

use glam::{DMat4, DVec3};

use crate::cell::Rgb;
use crate::error::{Result, TsdfError};

/// Determinants below this are treated as singular.
const SINGULAR_EPSILON: f64 = 1e-12;

// =============================================================================
// SensorFrame - per-frame state shared by all sensor models
// =============================================================================

/// Pose and measurements of the current frame.
#[derive(Clone, Debug)]
pub struct SensorFrame {
  pose: DMat4,
  inverse_pose: DMat4,
  distances: Vec<f64>,
  mask: Vec<bool>,
  rgb: Option<Vec<Rgb>>,
  max_range: Option<f64>,
}

impl SensorFrame {
  /// Frame at the identity pose with no valid measurement.
  pub fn new(ray_count: usize, max_range: Option<f64>) -> Self {
    Self {
      pose: DMat4::IDENTITY,
      inverse_pose: DMat4::IDENTITY,
      distances: vec![0.0; ray_count],
      mask: vec![false; ray_count],
      rgb: None,
      max_range,
    }
  }

  #[inline]
  pub fn pose(&self) -> &DMat4 {
    &self.pose
  }

  #[inline]
  pub fn inverse_pose(&self) -> &DMat4 {
    &self.inverse_pose
  }

  /// Replace the pose. Fails without changing anything if the matrix cannot
  /// be inverted.
  pub fn set_pose(&mut self, pose: DMat4) -> Result<()> {
    let determinant = pose.determinant();
    if !determinant.is_finite() || determinant.abs() < SINGULAR_EPSILON {
      return Err(TsdfError::SingularPose { determinant });
    }
    self.pose = pose;
    self.inverse_pose = pose.inverse();
    Ok(())
  }

  #[inline]
  pub fn max_range(&self) -> Option<f64> {
    self.max_range
  }

  #[inline]
  pub fn ray_count(&self) -> usize {
    self.distances.len()
  }

  #[inline]
  pub fn distance(&self, index: usize) -> f64 {
    self.distances[index]
  }

  /// Measurement usable for fusion: flagged, positive, finite, in range.
  #[inline]
  pub fn valid(&self, index: usize) -> bool {
    let d = self.distances[index];
    self.mask[index]
      && d.is_finite()
      && d > 0.0
      && self.max_range.map_or(true, |max| d <= max)
  }

  #[inline]
  pub fn rgb(&self, index: usize) -> Option<Rgb> {
    self.rgb.as_ref().map(|rgb| rgb[index])
  }

  /// Replace all measurements.
  ///
  /// Without a mask every ray is flagged. Size mismatches skip the frame.
  pub fn set_measurements(&mut self, distances: &[f64], mask: Option<&[bool]>) {
    if distances.len() != self.distances.len() {
      tracing::warn!(
        expected = self.distances.len(),
        got = distances.len(),
        "distance array size mismatch, skipping frame"
      );
      return;
    }
    if let Some(mask) = mask {
      if mask.len() != self.mask.len() {
        tracing::warn!(
          expected = self.mask.len(),
          got = mask.len(),
          "mask size mismatch, skipping frame"
        );
        return;
      }
      self.mask.copy_from_slice(mask);
    } else {
      self.mask.fill(true);
    }
    self.distances.copy_from_slice(distances);
  }

  /// Replace per-ray colors. Size mismatches drop the colors.
  pub fn set_rgb(&mut self, rgb: Option<&[Rgb]>) {
    self.rgb = match rgb {
      Some(rgb) if rgb.len() == self.distances.len() => Some(rgb.to_vec()),
      Some(rgb) => {
        tracing::warn!(
          expected = self.distances.len(),
          got = rgb.len(),
          "color array size mismatch, dropping colors"
        );
        None
      }
      None => None,
    };
  }

  /// Mutable measurement arrays for sensors that remap raw scans.
  pub(crate) fn buffers_mut(&mut self) -> (&mut [f64], &mut [bool]) {
    (&mut self.distances, &mut self.mask)
  }
}

// =============================================================================
// Sensor trait
// =============================================================================

/// Range sensor with a fixed ray layout.
///
/// Implementors provide the layout; pose handling, measurement access and
/// back projection come with the trait.
pub trait Sensor: Send + Sync {
  /// Current frame state.
  fn frame(&self) -> &SensorFrame;

  /// Mutable frame state.
  fn frame_mut(&mut self) -> &mut SensorFrame;

  /// Ray grid as `(rows, cols)`.
  fn dimensions(&self) -> (usize, usize);

  /// Unit direction of a ray in the sensor frame.
  fn ray_direction(&self, index: usize) -> DVec3;

  /// Nearest ray for a point given in the sensor frame, `None` if the point is
  /// outside the sensor's field of view.
  fn project(&self, local: DVec3) -> Option<usize>;

  /// Whether a sphere given in the sensor frame may contain observed points.
  fn is_visible(&self, center: DVec3, radius: f64) -> bool {
    self.frame().max_range().map_or(true, |max| center.length() - radius <= max)
  }

  #[inline]
  fn ray_count(&self) -> usize {
    let (rows, cols) = self.dimensions();
    rows * cols
  }

  #[inline]
  fn pose(&self) -> &DMat4 {
    self.frame().pose()
  }

  fn set_pose(&mut self, pose: DMat4) -> Result<()> {
    self.frame_mut().set_pose(pose)
  }

  /// Sensor origin in world coordinates.
  #[inline]
  fn position(&self) -> DVec3 {
    self.pose().w_axis.truncate()
  }

  /// Transform a world point into the sensor frame.
  #[inline]
  fn to_local(&self, world: DVec3) -> DVec3 {
    self.frame().inverse_pose().transform_point3(world)
  }

  /// Ray direction rotated into world coordinates.
  #[inline]
  fn world_ray_direction(&self, index: usize) -> DVec3 {
    self.pose().transform_vector3(self.ray_direction(index)).normalize()
  }

  #[inline]
  fn measured_distance(&self, index: usize) -> f64 {
    self.frame().distance(index)
  }

  #[inline]
  fn valid(&self, index: usize) -> bool {
    self.frame().valid(index)
  }

  #[inline]
  fn rgb(&self, index: usize) -> Option<Rgb> {
    self.frame().rgb(index)
  }

  fn set_measurements(&mut self, distances: &[f64], mask: Option<&[bool]>) {
    self.frame_mut().set_measurements(distances, mask);
  }

  /// Map world points to the rays that would have observed them.
  fn back_project(&self, points: &[DVec3]) -> Vec<Option<usize>> {
    points
      .iter()
      .map(|&p| self.project(self.to_local(p)))
      .collect()
  }
}
