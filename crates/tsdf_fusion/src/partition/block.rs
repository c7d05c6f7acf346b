//! Partition - cuboid block of TSDF cells inside a volume.

use glam::DVec3;

use super::{trilinear_weights, PartitionState};
use crate::bounds::{BoundingSphere, Cullable};
use crate::cell::{CellStorage, Rgb, TsdCell};
use crate::constants::{coord_to_index, stride, CORNER_OFFSETS};
use crate::error::InterpolateError;

/// Cuboid block of `(n + 1)³` cells, `n³` of them interior.
///
/// Local coordinates run from `0` to `n` on each axis; index `n` is the
/// border slice mirrored from the neighbor partition.
#[derive(Clone, Debug)]
pub struct Partition {
  /// Position of local cell (0, 0, 0) in global cell coordinates.
  offset: [usize; 3],

  cells_per_edge: usize,

  cell_size: f64,

  /// World-space minimum corner of local cell (0, 0, 0).
  world_min: DVec3,

  /// Sphere around all cell centers, border slice included.
  sphere: BoundingSphere,

  storage: CellStorage,
}

impl Partition {
  /// Create an unallocated partition.
  pub fn new(offset: [usize; 3], cells_per_edge: usize, cell_size: f64, origin: DVec3) -> Self {
    let world_min = origin
      + DVec3::new(offset[0] as f64, offset[1] as f64, offset[2] as f64) * cell_size;
    let first_center = world_min + DVec3::splat(0.5 * cell_size);
    let sphere = BoundingSphere::around_cube(first_center, cells_per_edge as f64 * cell_size);

    Self {
      offset,
      cells_per_edge,
      cell_size,
      world_min,
      sphere,
      storage: CellStorage::new(),
    }
  }

  #[inline]
  pub fn offset(&self) -> [usize; 3] {
    self.offset
  }

  #[inline]
  pub fn cells_per_edge(&self) -> usize {
    self.cells_per_edge
  }

  #[inline]
  pub fn cell_size(&self) -> f64 {
    self.cell_size
  }

  /// World-space edge length.
  #[inline]
  pub fn edge_length(&self) -> f64 {
    self.cells_per_edge as f64 * self.cell_size
  }

  /// Number of stored cells, border slices included.
  #[inline]
  pub fn cell_count(&self) -> usize {
    stride(self.cells_per_edge).pow(3)
  }

  /// World-space center of a local cell.
  #[inline]
  pub fn cell_center(&self, local: [usize; 3]) -> DVec3 {
    self.world_min
      + (DVec3::new(local[0] as f64, local[1] as f64, local[2] as f64) + 0.5) * self.cell_size
  }

  /// Allocate cell storage. Does nothing if already allocated.
  ///
  /// Cells start as free space when emptiness was accumulated before, as
  /// unseen otherwise.
  pub fn init(&mut self) {
    let count = self.cell_count();
    self.storage.ensure_allocated(count);
  }

  #[inline]
  pub fn is_initialized(&self) -> bool {
    self.storage.is_allocated()
  }

  /// Unallocated and never carved.
  #[inline]
  pub fn is_empty(&self) -> bool {
    !self.storage.is_allocated() && self.storage.pending_weight() == 0.0
  }

  /// Unallocated, but free space has been carved through it.
  #[inline]
  pub fn is_carved(&self) -> bool {
    !self.storage.is_allocated() && self.storage.pending_weight() > 0.0
  }

  pub fn state(&self) -> PartitionState {
    if self.is_initialized() {
      PartitionState::Allocated
    } else if self.is_carved() {
      PartitionState::Carved
    } else {
      PartitionState::Empty
    }
  }

  #[inline]
  pub fn storage(&self) -> &CellStorage {
    &self.storage
  }

  pub(crate) fn storage_mut(&mut self) -> &mut CellStorage {
    &mut self.storage
  }

  pub(crate) fn set_storage(&mut self, storage: CellStorage) {
    self.storage = storage;
  }

  /// Drop all cells and pending weight.
  pub fn reset(&mut self) {
    self.storage = CellStorage::new();
  }

  /// Cell at local coordinates, `None` if unallocated or out of range.
  pub fn cell(&self, x: usize, y: usize, z: usize) -> Option<&TsdCell> {
    let n = self.cells_per_edge;
    if x > n || y > n || z > n {
      return None;
    }
    self.storage.cells().map(|cells| &cells[coord_to_index(x, y, z, n)])
  }

  /// Mutable cell access, allocating on first use.
  pub(crate) fn cell_mut(&mut self, x: usize, y: usize, z: usize) -> &mut TsdCell {
    let n = self.cells_per_edge;
    let count = self.cell_count();
    &mut self.storage.ensure_allocated(count)[coord_to_index(x, y, z, n)]
  }

  /// Fuse a signed distance into one cell.
  ///
  /// Returns `false` without touching (or allocating) anything if the
  /// observation lies more than `2 * max_truncation` behind the surface.
  pub fn add_tsd(&mut self, x: usize, y: usize, z: usize, sdf: f64, max_truncation: f64) -> bool {
    self.add_tsd_rgb(x, y, z, sdf, max_truncation, None)
  }

  /// Fuse a signed distance and an optional color into one cell.
  pub fn add_tsd_rgb(
    &mut self,
    x: usize,
    y: usize,
    z: usize,
    sdf: f64,
    max_truncation: f64,
    rgb: Option<Rgb>,
  ) -> bool {
    if sdf < -2.0 * max_truncation {
      return false;
    }
    self.cell_mut(x, y, z).fuse(sdf, max_truncation, rgb)
  }

  /// Mark the whole partition as traversed free space.
  pub fn increase_emptiness(&mut self) {
    self.storage.increase_emptiness();
  }

  /// Trilinear interpolation between cell `(x, y, z)` and its `+1` neighbors.
  ///
  /// `x`, `y`, `z` must be below `cells_per_edge`; fractions are in `[0, 1)`.
  pub fn interpolate_trilinear(
    &self,
    x: usize,
    y: usize,
    z: usize,
    dx: f64,
    dy: f64,
    dz: f64,
  ) -> Result<f32, InterpolateError> {
    let cells = self.storage.cells().ok_or(InterpolateError::EmptyPartition)?;
    let n = self.cells_per_edge;
    let weights = trilinear_weights(dx, dy, dz);

    let mut tsd = 0.0;
    for (corner, &w) in CORNER_OFFSETS.iter().zip(weights.iter()) {
      if w == 0.0 {
        continue;
      }
      let cell = &cells[coord_to_index(x + corner[0], y + corner[1], z + corner[2], n)];
      let value = cell.tsd.ok_or(InterpolateError::IsNan)?;
      tsd += value as f64 * w;
    }
    Ok(tsd as f32)
  }

  /// Trilinear interpolation of cell colors, same contract as
  /// [`Partition::interpolate_trilinear`].
  pub fn interpolate_trilinear_rgb(
    &self,
    x: usize,
    y: usize,
    z: usize,
    dx: f64,
    dy: f64,
    dz: f64,
  ) -> Result<Rgb, InterpolateError> {
    let cells = self.storage.cells().ok_or(InterpolateError::EmptyPartition)?;
    let n = self.cells_per_edge;
    let weights = trilinear_weights(dx, dy, dz);

    let mut rgb = [0.0f64; 3];
    for (corner, &w) in CORNER_OFFSETS.iter().zip(weights.iter()) {
      if w == 0.0 {
        continue;
      }
      let cell = &cells[coord_to_index(x + corner[0], y + corner[1], z + corner[2], n)];
      if !cell.is_seen() {
        return Err(InterpolateError::IsNan);
      }
      for (acc, &c) in rgb.iter_mut().zip(cell.rgb.iter()) {
        *acc += c as f64 * w;
      }
    }
    Ok(rgb.map(|c| c.round().clamp(0.0, 255.0) as u8))
  }
}

impl Cullable for Partition {
  #[inline]
  fn centroid(&self) -> DVec3 {
    self.sphere.center
  }

  #[inline]
  fn circumradius(&self) -> f64 {
    self.sphere.radius
  }
}

#[cfg(test)]
#[path = "block_test.rs"]
mod block_test;
