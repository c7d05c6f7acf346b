//! Volume - partitioned TSDF grid with fusion, sampling and persistence.
//!
//! # Module Structure
//!
//! - [`fusion`]: `push` / `push_tree` frame integration and `PushStats`
//! - [`borders`]: copying neighbor slices into partition border cells
//! - [`tree`]: `SpaceNode` culling hierarchy
//! - [`io`]: binary serialization
//!
//! # Coordinates
//!
//! ```text
//!   global cell g on an axis ── g / n ──► partition index on that axis
//!                             └ g % n ──► local cell within the partition
//!
//!   cell center(g) = origin + (g + 0.5) * voxel_size
//! ```
//!
//! The bounding box spans the first to the last cell center on every axis, the
//! region where trilinear interpolation is defined.

pub mod borders;
pub mod fusion;
pub mod io;
pub mod tree;

pub use fusion::PushStats;
pub use tree::SpaceNode;

use glam::DVec3;

use crate::bounds::DAabb3;
use crate::cell::Rgb;
use crate::config::VolumeConfig;
use crate::error::{InterpolateError, Result, TsdfError};
use crate::partition::{CellLut, Partition, PartitionState};
use crate::sensor::Sensor;

/// Grid positions this close to a cell center, in cells, count as on it.
const GRID_SNAP: f64 = 1e-9;

/// Location of a world coordinate in the partition grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellIndex {
  /// Index into [`Volume::partitions`].
  pub partition: usize,
  /// Local coordinates of the base cell inside the partition.
  pub cell: [usize; 3],
  /// Position between the base cell and its `+1` neighbors, in `[0, 1]`.
  pub fraction: DVec3,
}

/// Partitioned truncated signed distance volume.
#[derive(Clone, Debug)]
pub struct Volume {
  config: VolumeConfig,
  cells_per_axis: usize,
  partitions_per_axis: usize,
  cells_per_partition: usize,
  origin: DVec3,
  bounds: DAabb3,
  partitions: Vec<Partition>,
  tree: SpaceNode,

  /// Interior cell coordinates shared by all partitions.
  cell_lut: CellLut,

  /// Global cell index on an axis to (partition index, local index).
  axis_lut: Vec<(usize, usize)>,
}

impl Volume {
  /// Create a volume with every partition unallocated.
  pub fn new(config: VolumeConfig) -> Result<Self> {
    config.validate()?;

    let n = config.partition_layout.cells();
    let per_axis = config.space_layout.cells();
    let cells = n * per_axis;
    let voxel = config.voxel_size;
    let origin = DVec3::from_array(config.origin);

    let mut partitions = Vec::with_capacity(per_axis.pow(3));
    for px in 0..per_axis {
      for py in 0..per_axis {
        for pz in 0..per_axis {
          partitions.push(Partition::new([px * n, py * n, pz * n], n, voxel, origin));
        }
      }
    }
    let tree = SpaceNode::build(&partitions, per_axis);
    let axis_lut = (0..cells).map(|g| (g / n, g % n)).collect();
    let bounds = DAabb3::new(
      origin + DVec3::splat(0.5 * voxel),
      origin + DVec3::splat((cells as f64 - 0.5) * voxel),
    );

    tracing::debug!(
      cells_per_axis = cells,
      partitions = partitions.len(),
      voxel_size = voxel,
      "created volume"
    );

    Ok(Self {
      cells_per_axis: cells,
      partitions_per_axis: per_axis,
      cells_per_partition: n,
      origin,
      bounds,
      partitions,
      tree,
      cell_lut: CellLut::new(n),
      axis_lut,
      config,
    })
  }

  /// Drop every partition's cells and pending weight.
  pub fn reset(&mut self) {
    self.partitions.iter_mut().for_each(Partition::reset);
  }

  // ===========================================================================
  // Dimensions
  // ===========================================================================

  #[inline]
  pub fn config(&self) -> &VolumeConfig {
    &self.config
  }

  #[inline]
  pub fn x_dimension(&self) -> usize {
    self.cells_per_axis
  }

  #[inline]
  pub fn y_dimension(&self) -> usize {
    self.cells_per_axis
  }

  #[inline]
  pub fn z_dimension(&self) -> usize {
    self.cells_per_axis
  }

  #[inline]
  pub fn partitions_per_axis(&self) -> usize {
    self.partitions_per_axis
  }

  /// Interior cells per partition edge.
  #[inline]
  pub fn cells_per_partition(&self) -> usize {
    self.cells_per_partition
  }

  #[inline]
  pub fn voxel_size(&self) -> f64 {
    self.config.voxel_size
  }

  /// World-space edge length of a partition.
  #[inline]
  pub fn partition_size(&self) -> f64 {
    self.cells_per_partition as f64 * self.config.voxel_size
  }

  #[inline]
  pub fn origin(&self) -> DVec3 {
    self.origin
  }

  #[inline]
  pub fn bounds(&self) -> &DAabb3 {
    &self.bounds
  }

  #[inline]
  pub fn min_coord(&self) -> DVec3 {
    self.bounds.min
  }

  #[inline]
  pub fn max_coord(&self) -> DVec3 {
    self.bounds.max
  }

  #[inline]
  pub fn centroid(&self) -> DVec3 {
    self.bounds.center()
  }

  #[inline]
  pub fn max_truncation(&self) -> f64 {
    self.config.max_truncation
  }

  /// Change the truncation radius used by subsequent fusion.
  pub fn set_max_truncation(&mut self, max_truncation: f64) -> Result<()> {
    if !(max_truncation > 0.0) {
      return Err(TsdfError::InvalidConfig(
        "truncation radius must be positive".into(),
      ));
    }
    if max_truncation < 2.0 * self.config.voxel_size {
      tracing::warn!(
        max_truncation,
        voxel_size = self.config.voxel_size,
        "truncation radius below two voxels, surfaces may break up"
      );
    }
    self.config.max_truncation = max_truncation;
    Ok(())
  }

  // ===========================================================================
  // Partitions
  // ===========================================================================

  #[inline]
  pub fn partitions(&self) -> &[Partition] {
    &self.partitions
  }

  #[inline]
  pub fn partition(&self, index: usize) -> Option<&Partition> {
    self.partitions.get(index)
  }

  #[inline]
  pub fn tree(&self) -> &SpaceNode {
    &self.tree
  }

  #[inline]
  pub fn cell_lut(&self) -> &CellLut {
    &self.cell_lut
  }

  /// Linear index of the partition at grid position `(px, py, pz)`.
  #[inline]
  pub fn partition_index(&self, px: usize, py: usize, pz: usize) -> usize {
    (px * self.partitions_per_axis + py) * self.partitions_per_axis + pz
  }

  pub(crate) fn partitions_mut(&mut self) -> &mut [Partition] {
    &mut self.partitions
  }

  /// Number of partitions holding cell storage.
  pub fn allocated_partitions(&self) -> usize {
    self.partitions.iter().filter(|p| p.is_initialized()).count()
  }

  // ===========================================================================
  // Sampling
  // ===========================================================================

  /// Locate a world coordinate in the partition grid.
  pub fn coord_to_index(&self, coord: DVec3) -> std::result::Result<CellIndex, InterpolateError> {
    if !coord.is_finite() || !self.bounds.contains_point(coord) {
      return Err(InterpolateError::InvalidIndex);
    }

    let grid = (coord - self.origin) / self.config.voxel_size - 0.5;
    let last = self.cells_per_axis - 1;
    let mut partition = [0usize; 3];
    let mut cell = [0usize; 3];
    let mut fraction = [0.0f64; 3];
    for axis in 0..3 {
      let mut g = grid[axis];
      if (g - g.round()).abs() < GRID_SNAP {
        g = g.round();
      }
      let base = (g.floor().max(0.0) as usize).min(last);
      let (p, local) = self.axis_lut[base];
      partition[axis] = p;
      cell[axis] = local;
      fraction[axis] = (g - base as f64).clamp(0.0, 1.0);
    }

    Ok(CellIndex {
      partition: self.partition_index(partition[0], partition[1], partition[2]),
      cell,
      fraction: DVec3::from_array(fraction),
    })
  }

  /// Trilinearly interpolated tsd at a world coordinate.
  pub fn interpolate_trilinear(&self, coord: DVec3) -> std::result::Result<f32, InterpolateError> {
    let idx = self.coord_to_index(coord)?;
    let [x, y, z] = idx.cell;
    let f = idx.fraction;
    self.partitions[idx.partition].interpolate_trilinear(x, y, z, f.x, f.y, f.z)
  }

  /// Trilinearly interpolated color at a world coordinate.
  pub fn interpolate_trilinear_rgb(&self, coord: DVec3) -> std::result::Result<Rgb, InterpolateError> {
    let idx = self.coord_to_index(coord)?;
    let [x, y, z] = idx.cell;
    let f = idx.fraction;
    self.partitions[idx.partition].interpolate_trilinear_rgb(x, y, z, f.x, f.y, f.z)
  }

  /// Surface normal from central differences one voxel to either side.
  ///
  /// Fails like [`Volume::interpolate_trilinear`] if any of the six samples
  /// fails; a vanishing gradient reports `IsNan`.
  pub fn interpolate_normal(&self, coord: DVec3) -> std::result::Result<DVec3, InterpolateError> {
    let h = self.config.voxel_size;
    let mut gradient = DVec3::ZERO;
    for (axis, step) in [DVec3::X, DVec3::Y, DVec3::Z].into_iter().enumerate() {
      let plus = self.interpolate_trilinear(coord + step * h)?;
      let minus = self.interpolate_trilinear(coord - step * h)?;
      gradient[axis] = (plus - minus) as f64;
    }
    gradient.try_normalize().ok_or(InterpolateError::IsNan)
  }

  /// Value of the cell nearest to a world coordinate, without blending.
  pub fn tsd_at(&self, coord: DVec3) -> std::result::Result<f32, InterpolateError> {
    let idx = self.coord_to_index(coord)?;
    let p = &self.partitions[idx.partition];
    if !p.is_initialized() {
      return Err(InterpolateError::EmptyPartition);
    }
    let near = idx.fraction.round();
    let [x, y, z] = idx.cell;
    p.cell(x + near.x as usize, y + near.y as usize, z + near.z as usize)
      .and_then(|cell| cell.tsd)
      .ok_or(InterpolateError::IsNan)
  }

  /// Whether the partition containing `coord` holds cell storage.
  pub fn is_partition_initialized(&self, coord: DVec3) -> bool {
    self
      .coord_to_index(coord)
      .map_or(false, |idx| self.partitions[idx.partition].is_initialized())
  }

  /// State of the partition containing `coord`, `None` outside the volume.
  pub fn partition_state(&self, coord: DVec3) -> Option<PartitionState> {
    self
      .coord_to_index(coord)
      .ok()
      .map(|idx| self.partitions[idx.partition].state())
  }

  /// Whether the sensor sits inside the bounding box.
  pub fn is_inside<S: Sensor + ?Sized>(&self, sensor: &S) -> bool {
    self.bounds.contains_point(sensor.position())
  }

  // ===========================================================================
  // Direct writes
  // ===========================================================================

  /// Fuse a signed distance into the cell at global cell coordinates.
  ///
  /// Returns `false` if the cell is outside the volume or the observation is
  /// rejected. Border copies in neighboring partitions are refreshed by the
  /// next [`Volume::propagate_borders`].
  pub fn add_tsd_at(&mut self, cell: [usize; 3], sdf: f64, rgb: Option<Rgb>) -> bool {
    if cell.iter().any(|&c| c >= self.cells_per_axis) {
      return false;
    }
    let (px, lx) = self.axis_lut[cell[0]];
    let (py, ly) = self.axis_lut[cell[1]];
    let (pz, lz) = self.axis_lut[cell[2]];
    let index = self.partition_index(px, py, pz);
    let trunc = self.config.max_truncation;
    self.partitions[index].add_tsd_rgb(lx, ly, lz, sdf, trunc, rgb)
  }

  /// World-space center of a global cell.
  #[inline]
  pub fn cell_center(&self, cell: [usize; 3]) -> DVec3 {
    self.origin
      + (DVec3::new(cell[0] as f64, cell[1] as f64, cell[2] as f64) + 0.5) * self.config.voxel_size
  }
}
