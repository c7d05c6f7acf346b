//! Surface extraction by marching sensor rays through a volume.
//!
//! ```text
//!   sensor ──► box entry ──► step voxel * step_factor ──► tsd changes + → -
//!                                                          │
//!                              zero crossing by linear interpolation
//!                              normal by central differences
//! ```
//!
//! A ray yields nothing when it leaves the bounding box or exceeds
//! `max_distance` without a crossing, runs into a partition that was never
//! observed, or meets a back face (tsd changing from negative to positive).
//! Carved partitions and unseen cells are marched through.

use glam::DVec3;
use rayon::prelude::*;

use crate::cell::Rgb;
use crate::config::RayCastConfig;
use crate::error::{InterpolateError, Result};
use crate::partition::PartitionState;
use crate::sensor::Sensor;
use crate::space::Volume;

/// Surface sample found along one ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
  pub point: DVec3,
  pub normal: DVec3,
  pub rgb: Rgb,
  pub ray: usize,
}

/// Surface samples of one cast, as parallel arrays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CastOutput {
  pub points: Vec<DVec3>,
  pub normals: Vec<DVec3>,
  pub rgb: Vec<Rgb>,
  /// Index of the ray each sample came from.
  pub rays: Vec<usize>,
}

impl CastOutput {
  /// Number of rays that hit a surface.
  #[inline]
  pub fn count(&self) -> usize {
    self.points.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  /// Iterate samples as [`Hit`]s.
  pub fn hits(&self) -> impl Iterator<Item = Hit> + '_ {
    (0..self.count()).map(move |i| Hit {
      point: self.points[i],
      normal: self.normals[i],
      rgb: self.rgb[i],
      ray: self.rays[i],
    })
  }
}

impl FromIterator<Hit> for CastOutput {
  fn from_iter<I: IntoIterator<Item = Hit>>(iter: I) -> Self {
    let mut output = CastOutput::default();
    for hit in iter {
      output.points.push(hit.point);
      output.normals.push(hit.normal);
      output.rgb.push(hit.rgb);
      output.rays.push(hit.ray);
    }
    output
  }
}

/// Ray marcher over a shared volume.
#[derive(Clone, Debug, Default)]
pub struct RayCaster {
  config: RayCastConfig,
}

impl RayCaster {
  pub fn new(config: RayCastConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self { config })
  }

  #[inline]
  pub fn config(&self) -> &RayCastConfig {
    &self.config
  }

  /// Cast every `subsampling`-th row and column of the sensor.
  #[tracing::instrument(skip_all, name = "raycast::cast_view")]
  pub fn cast_view<S: Sensor + ?Sized>(&self, volume: &Volume, sensor: &S, subsampling: usize) -> CastOutput {
    let step = subsampling.max(1);
    let (rows, cols) = sensor.dimensions();
    let rays: Vec<usize> = (0..rows)
      .step_by(step)
      .flat_map(|row| (0..cols).step_by(step).map(move |col| row * cols + col))
      .collect();

    let hits: Vec<Hit> = rays
      .par_iter()
      .filter_map(|&ray| self.cast_sensor_ray(volume, sensor, ray))
      .collect();

    tracing::debug!(rays = rays.len(), hits = hits.len(), "cast view");
    hits.into_iter().collect()
  }

  /// Cast the rays whose mask entry is set and clear the entries of rays
  /// that found no surface.
  ///
  /// A mask of the wrong length is left unchanged and nothing is cast.
  #[tracing::instrument(skip_all, name = "raycast::cast_view_masked")]
  pub fn cast_view_masked<S: Sensor + ?Sized>(
    &self,
    volume: &Volume,
    sensor: &S,
    mask: &mut [bool],
  ) -> CastOutput {
    if mask.len() != sensor.ray_count() {
      tracing::warn!(
        expected = sensor.ray_count(),
        got = mask.len(),
        "ray mask size mismatch, skipping cast"
      );
      return CastOutput::default();
    }

    let hits: Vec<Hit> = mask
      .par_iter_mut()
      .enumerate()
      .filter_map(|(ray, active)| {
        if !*active {
          return None;
        }
        let hit = self.cast_sensor_ray(volume, sensor, ray);
        *active = hit.is_some();
        hit
      })
      .collect();

    tracing::debug!(hits = hits.len(), "cast masked view");
    hits.into_iter().collect()
  }

  fn cast_sensor_ray<S: Sensor + ?Sized>(&self, volume: &Volume, sensor: &S, ray: usize) -> Option<Hit> {
    let point = self.march(volume, sensor.position(), sensor.world_ray_direction(ray))?;

    let normal = if self.config.normals {
      volume.interpolate_normal(point).ok()?
    } else {
      DVec3::ZERO
    };
    let rgb = if self.config.rgb {
      volume.interpolate_trilinear_rgb(point).unwrap_or([0; 3])
    } else {
      [0; 3]
    };

    Some(Hit {
      point,
      normal,
      rgb,
      ray,
    })
  }

  /// First front-facing zero crossing along `origin + t * dir`, `dir` of
  /// unit length.
  ///
  /// Only partitions that were never observed stop the march. Carved
  /// partitions hold no cells but count as free space and are passed
  /// through, as are unseen cells inside allocated partitions.
  pub fn march(&self, volume: &Volume, origin: DVec3, dir: DVec3) -> Option<DVec3> {
    let (enter, exit) = volume.bounds().ray_interval(origin, dir)?;
    let step = volume.voxel_size() * self.config.step_factor;
    let end = exit.min(self.config.max_distance);
    let mut t = enter.max(0.0);

    // Last defined sample as (t, tsd)
    let mut previous: Option<(f64, f32)> = None;
    while t <= end {
      let p = origin + dir * t;
      match volume.interpolate_trilinear(p) {
        Ok(tsd) => {
          if let Some((t_prev, tsd_prev)) = previous {
            if tsd_prev > 0.0 && tsd <= 0.0 {
              let blend = tsd_prev as f64 / (tsd_prev - tsd) as f64;
              return Some(origin + dir * (t_prev + (t - t_prev) * blend));
            }
            if tsd_prev < 0.0 && tsd > 0.0 {
              return None;
            }
          }
          previous = Some((t, tsd));
        }
        Err(InterpolateError::EmptyPartition) => {
          if volume.partition_state(p) != Some(PartitionState::Carved) {
            return None;
          }
          previous = None;
        }
        // Unseen cells, or a sample rounding off the box edge
        Err(InterpolateError::IsNan) | Err(InterpolateError::InvalidIndex) => previous = None,
      }
      t += step;
    }
    None
  }
}

#[cfg(test)]
#[path = "raycast_test.rs"]
mod raycast_test;
