//! Spherical scanner: `beams` elevation steps times `planes` azimuth steps.
//!
//! A beam sweeps `theta` from `theta_min` in `theta_res` steps; the scan plane
//! is rotated about the z axis by `phi` over half a turn. Negative `theta`
//! covers the other half, so the layout spans the full sphere.
//!
//! ```text
//!   theta = theta_min + beam * theta_res
//!   phi   = plane / planes * pi - pi
//!   dir   = (cos(phi) sin(theta), sin(phi) sin(theta), cos(theta))
//! ```

use std::f64::consts::PI;

use glam::DVec3;

use super::{Sensor, SensorFrame};
use crate::config::PolarConfig;
use crate::error::Result;

/// Tolerance absorbing float error in `pi / phi_res`.
const PLANE_EPSILON: f64 = 1e-9;

/// Rotating scanner with a spherical ray layout.
#[derive(Clone, Debug)]
pub struct PolarSensor {
  config: PolarConfig,
  planes: usize,
  frame: SensorFrame,

  /// Index into the last raw scan for every ray.
  source: Vec<Option<usize>>,
}

impl PolarSensor {
  pub fn new(config: PolarConfig) -> Result<Self> {
    config.validate()?;
    if config.theta_min >= PI {
      tracing::warn!(theta_min = config.theta_min, "minimal beam angle should be below pi");
    }

    let planes = ((PI / config.phi_res + PLANE_EPSILON).floor() as usize).max(1);
    let count = config.beams * planes;
    Ok(Self {
      frame: SensorFrame::new(count, config.max_range),
      source: vec![None; count],
      planes,
      config,
    })
  }

  #[inline]
  pub fn config(&self) -> &PolarConfig {
    &self.config
  }

  #[inline]
  pub fn beams(&self) -> usize {
    self.config.beams
  }

  #[inline]
  pub fn planes(&self) -> usize {
    self.planes
  }

  #[inline]
  pub fn ray_index(&self, beam: usize, plane: usize) -> usize {
    beam * self.planes + plane
  }

  /// Position of the ray's measurement in the scan last passed to
  /// [`PolarSensor::set_distance_map`].
  #[inline]
  pub fn source_index(&self, ray: usize) -> Option<usize> {
    self.source.get(ray).copied().flatten()
  }

  /// Bin a raw scan into the ray layout.
  ///
  /// `phi` holds one rotation angle per scan column in `[0, pi)`, `distances`
  /// holds `beams` values per column. Each column lands in the plane nearest
  /// below its angle; rays no column maps to are left without measurement.
  /// Columns with an angle outside `[0, pi)`, NaN included, are skipped.
  pub fn set_distance_map(&mut self, phi: &[f64], distances: &[f64]) {
    let beams = self.config.beams;
    if beams * phi.len() != distances.len() {
      tracing::warn!(
        columns = phi.len(),
        beams,
        got = distances.len(),
        "scan size mismatch, skipping frame"
      );
      return;
    }

    let planes = self.planes;
    let phi_res = self.config.phi_res;
    // Azimuth the scanner advances between consecutive beams
    let skew = if self.config.sweep_correction && !phi.is_empty() {
      (PI / phi.len() as f64 / beams as f64) * 270.0 / 360.0
    } else {
      0.0
    };

    self.source.fill(None);
    let (ranges, mask) = self.frame.buffers_mut();
    ranges.fill(0.0);
    mask.fill(false);

    let mut rejected = 0usize;
    for (c, &angle) in phi.iter().enumerate() {
      if !(0.0..PI).contains(&angle) {
        rejected += 1;
        continue;
      }
      let plane = (angle / phi_res).floor();
      for beam in 0..beams {
        let shifted = plane + (skew / phi_res * beam as f64).floor();
        if shifted >= planes as f64 {
          continue;
        }
        let ray = beam * planes + shifted as usize;
        let src = c * beams + beam;
        ranges[ray] = distances[src];
        mask[ray] = true;
        self.source[ray] = Some(src);
      }
    }
    if rejected > 0 {
      tracing::warn!(rejected, "scan columns with rotation angle outside [0, pi) skipped");
    }
  }
}

impl Sensor for PolarSensor {
  #[inline]
  fn frame(&self) -> &SensorFrame {
    &self.frame
  }

  #[inline]
  fn frame_mut(&mut self) -> &mut SensorFrame {
    &mut self.frame
  }

  #[inline]
  fn dimensions(&self) -> (usize, usize) {
    (self.config.beams, self.planes)
  }

  fn ray_direction(&self, index: usize) -> DVec3 {
    let beam = index / self.planes;
    let plane = index % self.planes;
    let theta = self.config.theta_min + beam as f64 * self.config.theta_res;
    let phi = plane as f64 / self.planes as f64 * PI - PI;
    let (sin_theta, cos_theta) = theta.sin_cos();
    DVec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta)
  }

  fn project(&self, local: DVec3) -> Option<usize> {
    let r = local.length();
    if !(r > 0.0) {
      return None;
    }

    let mut theta = (local.z / r).clamp(-1.0, 1.0).acos();
    let mut phi = if local.y > 0.0 {
      // Upper half is reached with negative theta
      theta = -theta;
      local.y.atan2(local.x) - PI
    } else {
      local.y.atan2(local.x)
    };
    if phi > 0.0 {
      phi = -PI;
    }

    let mut plane = ((phi + PI) / PI * self.planes as f64).round() as usize;
    if plane >= self.planes {
      // phi = 0 is phi = -pi seen with mirrored theta
      plane = 0;
      theta = -theta;
    }

    let beam = ((theta - self.config.theta_min) / self.config.theta_res).round();
    if beam < 0.0 || beam >= self.config.beams as f64 {
      return None;
    }
    Some(self.ray_index(beam as usize, plane))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn deg(v: f64) -> f64 {
    v * PI / 180.0
  }

  fn make_sensor() -> PolarSensor {
    PolarSensor::new(PolarConfig::new(10, deg(10.0), deg(-45.0), deg(10.0))).unwrap()
  }

  #[test]
  fn test_layout() {
    let s = make_sensor();
    assert_eq!(s.planes(), 18);
    assert_eq!(s.dimensions(), (10, 18));
    assert_eq!(s.ray_count(), 180);
  }

  #[test]
  fn test_plane_count_tolerates_rounding() {
    let s = PolarSensor::new(PolarConfig::new(4, deg(1.0), 0.0, PI / 3.0)).unwrap();
    assert_eq!(s.planes(), 3);
  }

  #[test]
  fn test_ray_directions_are_unit() {
    let s = make_sensor();
    for i in 0..s.ray_count() {
      assert!((s.ray_direction(i).length() - 1.0).abs() < 1e-12);
    }
  }

  #[test]
  fn test_project_inverts_ray_direction() {
    let s = make_sensor();
    for i in 0..s.ray_count() {
      let p = s.ray_direction(i) * 3.0;
      assert_eq!(s.project(p), Some(i), "ray {i}");
    }
  }

  #[test]
  fn test_project_outside_beam_range() {
    let s = make_sensor();
    // Straight down is far outside [-45, 45] degrees
    assert_eq!(s.project(DVec3::new(0.0, 0.0, -1.0)), None);
    assert_eq!(s.project(DVec3::ZERO), None);
  }

  #[test]
  fn test_set_distance_map_bins_columns() {
    let mut s = make_sensor();
    let phi = [deg(0.0), deg(25.0)];
    let distances: Vec<f64> = (0..20).map(|i| 1.0 + i as f64).collect();
    s.set_distance_map(&phi, &distances);

    let r = s.ray_index(3, 0);
    assert!(s.valid(r));
    assert_eq!(s.measured_distance(r), 4.0);
    assert_eq!(s.source_index(r), Some(3));

    let r = s.ray_index(7, 2);
    assert_eq!(s.measured_distance(r), 18.0);
    assert_eq!(s.source_index(r), Some(17));

    let unmapped = s.ray_index(0, 1);
    assert!(!s.valid(unmapped));
    assert_eq!(s.source_index(unmapped), None);
  }

  #[test]
  fn test_set_distance_map_size_mismatch_keeps_map() {
    let mut s = make_sensor();
    s.set_distance_map(&[0.0], &[2.0; 10]);
    let r = s.ray_index(5, 0);
    assert!(s.valid(r));

    s.set_distance_map(&[0.0, 0.1], &[1.0; 7]);
    assert!(s.valid(r));
    assert_eq!(s.measured_distance(r), 2.0);
  }

  #[test]
  fn test_sweep_correction_skews_late_beams() {
    let config = PolarConfig::new(10, deg(10.0), deg(-45.0), deg(1.0)).with_sweep_correction(true);
    let mut s = PolarSensor::new(config).unwrap();
    // One column: each beam lands 13.5 degrees after the previous one
    s.set_distance_map(&[0.0], &[1.0; 10]);
    assert_eq!(s.source_index(s.ray_index(0, 0)), Some(0));
    assert_eq!(s.source_index(s.ray_index(1, 0)), None);
    assert_eq!(s.source_index(s.ray_index(1, 13)), Some(1));
    assert_eq!(s.source_index(s.ray_index(9, 121)), Some(9));
  }

  #[test]
  fn test_set_distance_map_skips_bad_angles() {
    let config = PolarConfig::new(10, 0.17, -0.78, 0.017).with_sweep_correction(true);
    let mut s = PolarSensor::new(config).unwrap();
    s.set_distance_map(&[f64::INFINITY], &[1.0; 10]);
    assert!((0..s.ray_count()).all(|r| !s.valid(r)));

    // Good columns still land next to rejected ones
    let phi = [f64::NAN, PI, 1e300, 0.0];
    s.set_distance_map(&phi, &[1.0; 40]);
    let mapped: Vec<usize> = (0..s.ray_count()).filter(|&r| s.valid(r)).collect();
    assert!(!mapped.is_empty());
    assert!(mapped
      .iter()
      .all(|&r| s.source_index(r).map_or(false, |src| src / 10 == 3)));
  }
}
