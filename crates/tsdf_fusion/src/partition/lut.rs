//! CellLut - partition-local coordinates of every interior cell.
//!
//! Identical for all partitions of a volume, so the volume builds it once and
//! lends it to each partition during fusion.

/// Interior cell coordinates of a partition, in storage scan order.
#[derive(Clone, Debug, PartialEq)]
pub struct CellLut {
  cells_per_edge: usize,
  coords: Vec<[usize; 3]>,
}

impl CellLut {
  /// Build the table for partitions with `cells_per_edge` interior cells.
  pub fn new(cells_per_edge: usize) -> Self {
    let mut coords = Vec::with_capacity(cells_per_edge.pow(3));
    for x in 0..cells_per_edge {
      for y in 0..cells_per_edge {
        for z in 0..cells_per_edge {
          coords.push([x, y, z]);
        }
      }
    }
    Self {
      cells_per_edge,
      coords,
    }
  }

  #[inline]
  pub fn cells_per_edge(&self) -> usize {
    self.cells_per_edge
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.coords.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.coords.is_empty()
  }

  #[inline]
  pub fn iter(&self) -> impl Iterator<Item = &[usize; 3]> {
    self.coords.iter()
  }
}
