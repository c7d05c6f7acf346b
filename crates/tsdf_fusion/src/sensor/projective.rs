//! Pinhole camera with one ray per pixel.
//!
//! Rays run through pixel centers; ray `row * cols + col` points along
//! `((col - cx) / fx, (row - cy) / fy, 1)`. Measured distances are ranges along
//! the ray, not z-depth.

use glam::DVec3;

use super::{Sensor, SensorFrame};
use crate::cell::Rgb;
use crate::config::ProjectiveConfig;
use crate::error::Result;

/// Depth camera with a pinhole projection model.
#[derive(Clone, Debug)]
pub struct ProjectiveSensor {
  config: ProjectiveConfig,
  frame: SensorFrame,

  /// Unit ray per pixel, row-major.
  directions: Vec<DVec3>,

  /// Inward normals of the four side planes of the view pyramid.
  frustum: [DVec3; 4],
}

impl ProjectiveSensor {
  pub fn new(config: ProjectiveConfig) -> Result<Self> {
    config.validate()?;

    let mut directions = Vec::with_capacity(config.rows * config.cols);
    for row in 0..config.rows {
      for col in 0..config.cols {
        directions.push(pixel_ray(&config, col as f64, row as f64).normalize());
      }
    }

    Ok(Self {
      frame: SensorFrame::new(config.rows * config.cols, config.max_range),
      frustum: frustum_normals(&config),
      directions,
      config,
    })
  }

  #[inline]
  pub fn config(&self) -> &ProjectiveConfig {
    &self.config
  }

  /// Load a depth image.
  ///
  /// `depth` holds z-depth per pixel in row-major order and is converted to
  /// range along each ray. Non-positive or non-finite depth marks the pixel
  /// invalid. Size mismatches skip the frame.
  pub fn set_depth_map(&mut self, depth: &[f64], rgb: Option<&[Rgb]>) {
    if depth.len() != self.directions.len() {
      tracing::warn!(
        expected = self.directions.len(),
        got = depth.len(),
        "depth image size mismatch, skipping frame"
      );
      return;
    }

    let (ranges, mask) = self.frame.buffers_mut();
    for (i, (&d, dir)) in depth.iter().zip(&self.directions).enumerate() {
      let ok = d.is_finite() && d > 0.0;
      ranges[i] = if ok { d / dir.z } else { 0.0 };
      mask[i] = ok;
    }
    self.frame.set_rgb(rgb);
  }
}

/// Unnormalized ray through image position `(u, v)`.
#[inline]
fn pixel_ray(config: &ProjectiveConfig, u: f64, v: f64) -> DVec3 {
  DVec3::new((u - config.cx) / config.fx, (v - config.cy) / config.fy, 1.0)
}

/// Side planes through the outer pixel edges, normals facing the image center.
fn frustum_normals(config: &ProjectiveConfig) -> [DVec3; 4] {
  let right = config.cols as f64 - 0.5;
  let bottom = config.rows as f64 - 0.5;
  let corners = [
    pixel_ray(config, -0.5, -0.5),
    pixel_ray(config, right, -0.5),
    pixel_ray(config, right, bottom),
    pixel_ray(config, -0.5, bottom),
  ];
  let inside = corners.iter().copied().sum::<DVec3>();

  let mut normals = [DVec3::ZERO; 4];
  for (i, normal) in normals.iter_mut().enumerate() {
    let n = corners[i].cross(corners[(i + 1) % 4]).normalize();
    *normal = if n.dot(inside) < 0.0 { -n } else { n };
  }
  normals
}

impl Sensor for ProjectiveSensor {
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
    (self.config.rows, self.config.cols)
  }

  #[inline]
  fn ray_direction(&self, index: usize) -> DVec3 {
    self.directions[index]
  }

  fn project(&self, local: DVec3) -> Option<usize> {
    if !(local.z > 0.0) {
      return None;
    }
    let col = (self.config.fx * local.x / local.z + self.config.cx).round();
    let row = (self.config.fy * local.y / local.z + self.config.cy).round();
    if col < 0.0 || row < 0.0 || col >= self.config.cols as f64 || row >= self.config.rows as f64 {
      return None;
    }
    Some(row as usize * self.config.cols + col as usize)
  }

  fn is_visible(&self, center: DVec3, radius: f64) -> bool {
    if let Some(max) = self.frame.max_range() {
      if center.length() - radius > max {
        return false;
      }
    }
    self.frustum.iter().all(|n| n.dot(center) >= -radius)
  }
}
