//! Partitions - fixed-size, lazily allocated blocks of TSDF cells.
//!
//! A partition is the unit of allocation and culling. It is created as a
//! placeholder that only knows its geometry; cell storage appears on the first
//! fused observation.
//!
//! # Module Structure
//!
//! - [`block`]: `Partition` - cuboid block used by the 3D volume
//! - [`grid`]: `GridPartition` - rectangular block for planar maps, used on
//!   its own (no planar volume owns it)
//! - [`lut`]: `CellLut` - partition-local cell coordinates shared by all
//!   partitions of one layout

pub mod block;
pub mod grid;
pub mod lut;

pub use block::Partition;
pub use grid::GridPartition;
pub use lut::CellLut;

/// Allocation state of a partition, as seen from the outside.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionState {
  /// Never observed.
  Empty,
  /// Unallocated, but free space was carved through it.
  Carved,
  /// Cell storage exists.
  Allocated,
}

/// Blend weights of the 4 or 8 corners around a fractional position, in
/// `CORNER_OFFSETS` order.
#[inline]
pub(crate) fn trilinear_weights(dx: f64, dy: f64, dz: f64) -> [f64; 8] {
  let wx = [1.0 - dx, dx];
  let wy = [1.0 - dy, dy];
  let wz = [1.0 - dz, dz];
  let mut weights = [0.0; 8];
  for (i, w) in weights.iter_mut().enumerate() {
    *w = wx[i & 1] * wy[(i >> 1) & 1] * wz[(i >> 2) & 1];
  }
  weights
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_trilinear_weights_sum_to_one() {
    let w = trilinear_weights(0.3, 0.7, 0.1);
    let sum: f64 = w.iter().sum();
    assert!((sum - 1.0).abs() < 1e-12);
  }

  #[test]
  fn test_trilinear_weights_at_base_corner() {
    let w = trilinear_weights(0.0, 0.0, 0.0);
    assert_eq!(w[0], 1.0);
    assert!(w[1..].iter().all(|&v| v == 0.0));
  }

  #[test]
  fn test_trilinear_weights_at_far_corner() {
    let w = trilinear_weights(1.0, 1.0, 1.0);
    assert_eq!(w[7], 1.0);
    assert!(w[..7].iter().all(|&v| v == 0.0));
  }
}
