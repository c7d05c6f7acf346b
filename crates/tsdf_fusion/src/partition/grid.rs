//! GridPartition - rectangular block of TSDF cells for planar (2D) maps.
//!
//! Shares the cell fusion rules and lazy allocation of [`super::Partition`];
//! cells are laid out row-major, `index = y * (n + 1) + x`.
//!
//! This is a standalone block: [`crate::space::Volume`] only holds 3D
//! partitions, so callers building a planar map own the grid of blocks,
//! compute per-cell distances themselves and fill the `x = n` / `y = n`
//! border cells from their neighbors before interpolating across blocks.

use glam::DVec3;

use super::PartitionState;
use crate::bounds::Cullable;
use crate::cell::{CellStorage, TsdCell};
use crate::constants::stride;
use crate::error::InterpolateError;

/// Rectangular block of `(n + 1)²` cells in the `z = 0` plane.
#[derive(Clone, Debug)]
pub struct GridPartition {
  offset: [usize; 2],
  cells_per_edge: usize,
  cell_size: f64,
  centroid: DVec3,
  circumradius: f64,
  storage: CellStorage,
}

impl GridPartition {
  pub fn new(offset: [usize; 2], cells_per_edge: usize, cell_size: f64) -> Self {
    let edge = cells_per_edge as f64 * cell_size;
    let first = DVec3::new(
      (offset[0] as f64 + 0.5) * cell_size,
      (offset[1] as f64 + 0.5) * cell_size,
      0.0,
    );
    Self {
      offset,
      cells_per_edge,
      cell_size,
      centroid: first + DVec3::new(edge * 0.5, edge * 0.5, 0.0),
      circumradius: 2.0_f64.sqrt() * edge * 0.5,
      storage: CellStorage::new(),
    }
  }

  #[inline]
  pub fn offset(&self) -> [usize; 2] {
    self.offset
  }

  #[inline]
  pub fn cells_per_edge(&self) -> usize {
    self.cells_per_edge
  }

  #[inline]
  pub fn edge_length(&self) -> f64 {
    self.cells_per_edge as f64 * self.cell_size
  }

  #[inline]
  fn index(&self, x: usize, y: usize) -> usize {
    y * stride(self.cells_per_edge) + x
  }

  pub fn init(&mut self) {
    let count = stride(self.cells_per_edge).pow(2);
    self.storage.ensure_allocated(count);
  }

  #[inline]
  pub fn is_initialized(&self) -> bool {
    self.storage.is_allocated()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    !self.storage.is_allocated() && self.storage.pending_weight() == 0.0
  }

  #[inline]
  pub fn is_carved(&self) -> bool {
    !self.storage.is_allocated() && self.storage.pending_weight() > 0.0
  }

  pub fn state(&self) -> PartitionState {
    if self.storage.is_allocated() {
      PartitionState::Allocated
    } else if self.storage.pending_weight() > 0.0 {
      PartitionState::Carved
    } else {
      PartitionState::Empty
    }
  }

  pub fn cell(&self, x: usize, y: usize) -> Option<&TsdCell> {
    let n = self.cells_per_edge;
    if x > n || y > n {
      return None;
    }
    let idx = self.index(x, y);
    self.storage.cells().map(|cells| &cells[idx])
  }

  /// Fuse a signed distance into one cell, allocating on first use.
  pub fn add_tsd(&mut self, x: usize, y: usize, sdf: f64, max_truncation: f64) -> bool {
    if sdf < -2.0 * max_truncation {
      return false;
    }
    self.init();
    let idx = self.index(x, y);
    match self.storage.cells_mut() {
      Some(cells) => cells[idx].fuse(sdf, max_truncation, None),
      None => false,
    }
  }

  pub fn increase_emptiness(&mut self) {
    self.storage.increase_emptiness();
  }

  /// Bilinear interpolation between cell `(x, y)` and its `+1` neighbors.
  pub fn interpolate_bilinear(
    &self,
    x: usize,
    y: usize,
    dx: f64,
    dy: f64,
  ) -> Result<f32, InterpolateError> {
    let cells = self.storage.cells().ok_or(InterpolateError::EmptyPartition)?;
    let corners = [
      (0, 0, (1.0 - dx) * (1.0 - dy)),
      (1, 0, dx * (1.0 - dy)),
      (0, 1, (1.0 - dx) * dy),
      (1, 1, dx * dy),
    ];

    let mut tsd = 0.0;
    for &(ox, oy, w) in &corners {
      if w == 0.0 {
        continue;
      }
      let value = cells[self.index(x + ox, y + oy)]
        .tsd
        .ok_or(InterpolateError::IsNan)?;
      tsd += value as f64 * w;
    }
    Ok(tsd as f32)
  }
}

impl Cullable for GridPartition {
  #[inline]
  fn centroid(&self) -> DVec3 {
    self.centroid
  }

  #[inline]
  fn circumradius(&self) -> f64 {
    self.circumradius
  }
}
