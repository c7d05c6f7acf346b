//! Configuration for volumes, sensors and ray casting.
//!
//! All config structs deserialize from TOML, so a reconstruction setup can be
//! described in a file:
//!
//! ```toml
//! voxel_size = 0.02
//! partition_layout = 4   # 16 cells per partition edge
//! space_layout = 5       # 32 partitions per axis
//! max_truncation = 0.08
//! origin = [0.0, 0.0, 0.0]
//! ```

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::MAX_LAYOUT_EXPONENT;
use crate::error::{Result, TsdfError};

/// Parse any config struct from a TOML string.
pub fn from_toml_str<T: DeserializeOwned>(source: &str) -> Result<T> {
  Ok(toml::from_str(source)?)
}

/// Parse any config struct from a TOML file.
pub fn from_toml_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
  let source = std::fs::read_to_string(path)?;
  from_toml_str(&source)
}

// =============================================================================
// Layout
// =============================================================================

/// Power-of-two cell count along one axis, stored as its exponent.
///
/// `Layout(0)` = 1 cell, `Layout(10)` = 1024 cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Layout(u8);

impl TryFrom<u8> for Layout {
  type Error = TsdfError;

  fn try_from(exponent: u8) -> Result<Self> {
    Self::new(exponent)
  }
}

impl From<Layout> for u8 {
  fn from(layout: Layout) -> u8 {
    layout.0
  }
}

impl Layout {
  /// Create a layout from its exponent.
  pub fn new(exponent: u8) -> Result<Self> {
    if exponent > MAX_LAYOUT_EXPONENT {
      return Err(TsdfError::InvalidConfig(format!(
        "layout exponent {} exceeds {}",
        exponent, MAX_LAYOUT_EXPONENT
      )));
    }
    Ok(Self(exponent))
  }

  /// Create a layout from a power-of-two cell count.
  pub fn from_cells(cells: usize) -> Result<Self> {
    if !cells.is_power_of_two() {
      return Err(TsdfError::InvalidConfig(format!(
        "cell count {} is not a power of two",
        cells
      )));
    }
    Self::new(cells.trailing_zeros() as u8)
  }

  #[inline]
  pub fn exponent(&self) -> u8 {
    self.0
  }

  /// Number of cells along the axis.
  #[inline]
  pub fn cells(&self) -> usize {
    1usize << self.0
  }
}

// =============================================================================
// VolumeConfig
// =============================================================================

/// Configuration of a TSDF volume.
///
/// The volume has `partition_layout.cells() * space_layout.cells()` cells per
/// axis, at most 1024.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
  /// Edge length of one cell in world units.
  pub voxel_size: f64,

  /// Cells per partition edge.
  pub partition_layout: Layout,

  /// Partitions per volume edge.
  pub space_layout: Layout,

  /// Truncation radius in world units.
  pub max_truncation: f64,

  /// World position of the volume's minimum corner.
  pub origin: [f64; 3],
}

impl VolumeConfig {
  pub fn new(voxel_size: f64, partition_layout: Layout, space_layout: Layout) -> Self {
    Self {
      voxel_size,
      partition_layout,
      space_layout,
      max_truncation: 4.0 * voxel_size,
      origin: [0.0; 3],
    }
  }

  pub fn with_max_truncation(mut self, max_truncation: f64) -> Self {
    self.max_truncation = max_truncation;
    self
  }

  pub fn with_origin(mut self, origin: [f64; 3]) -> Self {
    self.origin = origin;
    self
  }

  /// Cells per volume edge.
  #[inline]
  pub fn cells_per_axis(&self) -> usize {
    self.partition_layout.cells() * self.space_layout.cells()
  }

  /// Check value ranges.
  pub fn validate(&self) -> Result<()> {
    if !(self.voxel_size > 0.0 && self.voxel_size.is_finite()) {
      return Err(TsdfError::InvalidConfig(format!(
        "voxel size must be positive, got {}",
        self.voxel_size
      )));
    }
    if !(self.max_truncation > 0.0 && self.max_truncation.is_finite()) {
      return Err(TsdfError::InvalidConfig(format!(
        "truncation radius must be positive, got {}",
        self.max_truncation
      )));
    }
    let total = self.partition_layout.exponent() as u32 + self.space_layout.exponent() as u32;
    if total > MAX_LAYOUT_EXPONENT as u32 {
      return Err(TsdfError::InvalidConfig(format!(
        "volume resolution 2^{} exceeds 1024 cells per axis",
        total
      )));
    }
    Ok(())
  }
}

impl Default for VolumeConfig {
  fn default() -> Self {
    Self::new(0.01, Layout(4), Layout(4))
  }
}

// =============================================================================
// Sensor configs
// =============================================================================

/// Spherical scanner layout: `beams` elevation rows times `planes` azimuth
/// columns covering half a turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolarConfig {
  /// Number of beams per scan plane.
  pub beams: usize,

  /// Angular resolution between beams in radians.
  pub theta_res: f64,

  /// Angle of the first beam in radians, must be below pi.
  pub theta_min: f64,

  /// Angular resolution between scan planes in radians.
  pub phi_res: f64,

  /// Maximum usable range, unlimited when `None`.
  pub max_range: Option<f64>,

  /// Skew later beams of a plane, for scanners that fire beams sequentially
  /// while rotating.
  pub sweep_correction: bool,
}

impl PolarConfig {
  pub fn new(beams: usize, theta_res: f64, theta_min: f64, phi_res: f64) -> Self {
    Self {
      beams,
      theta_res,
      theta_min,
      phi_res,
      max_range: None,
      sweep_correction: false,
    }
  }

  pub fn with_max_range(mut self, max_range: f64) -> Self {
    self.max_range = Some(max_range);
    self
  }

  pub fn with_sweep_correction(mut self, enabled: bool) -> Self {
    self.sweep_correction = enabled;
    self
  }

  pub fn validate(&self) -> Result<()> {
    if self.beams == 0 {
      return Err(TsdfError::InvalidConfig("polar sensor needs at least one beam".into()));
    }
    if !(self.theta_res > 0.0) || !(self.phi_res > 0.0) {
      return Err(TsdfError::InvalidConfig(
        "polar angular resolutions must be positive".into(),
      ));
    }
    if self.phi_res > std::f64::consts::PI {
      return Err(TsdfError::InvalidConfig(
        "polar plane resolution must not exceed pi".into(),
      ));
    }
    Ok(())
  }
}

impl Default for PolarConfig {
  fn default() -> Self {
    let deg = std::f64::consts::PI / 180.0;
    Self::new(1081, 0.25 * deg, -135.0 * deg, 1.0 * deg)
  }
}

/// Pinhole camera layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectiveConfig {
  pub cols: usize,
  pub rows: usize,
  pub fx: f64,
  pub fy: f64,
  pub cx: f64,
  pub cy: f64,

  /// Maximum usable range, unlimited when `None`.
  pub max_range: Option<f64>,
}

impl ProjectiveConfig {
  pub fn new(cols: usize, rows: usize, fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
    Self {
      cols,
      rows,
      fx,
      fy,
      cx,
      cy,
      max_range: None,
    }
  }

  pub fn with_max_range(mut self, max_range: f64) -> Self {
    self.max_range = Some(max_range);
    self
  }

  pub fn validate(&self) -> Result<()> {
    if self.cols == 0 || self.rows == 0 {
      return Err(TsdfError::InvalidConfig(
        "projective sensor needs a non-empty image".into(),
      ));
    }
    if !(self.fx > 0.0) || !(self.fy > 0.0) {
      return Err(TsdfError::InvalidConfig("focal lengths must be positive".into()));
    }
    Ok(())
  }
}

impl Default for ProjectiveConfig {
  fn default() -> Self {
    // Kinect-class depth camera
    Self::new(640, 480, 525.0, 525.0, 319.5, 239.5)
  }
}

// =============================================================================
// RayCastConfig
// =============================================================================

/// Configuration of surface extraction by ray marching.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RayCastConfig {
  /// March step as a multiple of the voxel size.
  pub step_factor: f64,

  /// Maximum march distance from the sensor.
  pub max_distance: f64,

  /// Sample surface normals at hits.
  pub normals: bool,

  /// Sample surface color at hits.
  pub rgb: bool,
}

impl RayCastConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_step_factor(mut self, step_factor: f64) -> Self {
    self.step_factor = step_factor;
    self
  }

  pub fn with_max_distance(mut self, max_distance: f64) -> Self {
    self.max_distance = max_distance;
    self
  }

  pub fn with_normals(mut self, normals: bool) -> Self {
    self.normals = normals;
    self
  }

  pub fn with_rgb(mut self, rgb: bool) -> Self {
    self.rgb = rgb;
    self
  }

  pub fn validate(&self) -> Result<()> {
    if !(self.step_factor > 0.0) {
      return Err(TsdfError::InvalidConfig("step factor must be positive".into()));
    }
    if !(self.max_distance > 0.0) {
      return Err(TsdfError::InvalidConfig("max distance must be positive".into()));
    }
    Ok(())
  }
}

impl Default for RayCastConfig {
  fn default() -> Self {
    Self {
      step_factor: 1.0,
      max_distance: 10.0,
      normals: true,
      rgb: false,
    }
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
