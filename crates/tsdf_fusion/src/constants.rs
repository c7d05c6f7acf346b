//! Fusion constants and partition cell layout.
//!
//! # Partition Cell Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     PARTITION CELL LAYOUT (n = 4)                       │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Local index:   0     1     2     3  │  4                               │
//! │                 │                 │  │  │                               │
//! │                 └── n interior ───┘  │  └─ border slice: copy of the    │
//! │                     cells, written   │     neighbor partition's first   │
//! │                     by fusion        │     slice (propagate_borders)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every partition stores `(n + 1)` cells per axis so trilinear interpolation
//! at its last interior cell never has to reach into a neighbor.
//!
//! # Memory Layout
//!
//! ```text
//! index = (x * (n + 1) + y) * (n + 1) + z
//! ```
//!
//! X is the major axis, Z the minor axis (stride 1).
//!
//! # Corner Order
//!
//! ```text
//! Corner indices (binary: ZYX):
//!   0 = (0,0,0)    4 = (0,0,1)
//!   1 = (1,0,0)    5 = (1,0,1)
//!   2 = (0,1,0)    6 = (0,1,1)
//!   3 = (1,1,0)    7 = (1,1,1)
//! ```

/// Weight increment of a single fused observation. Also the upper cap of a
/// normalized signed distance.
pub const TSD_INC: f32 = 1.0;

/// Saturation weight of a cell.
pub const MAX_WEIGHT: f32 = 32.0;

/// Weight increment applied by free-space carving.
pub const EMPTINESS_INC: f32 = 1.0;

/// Largest layout exponent: 2^10 = 1024 cells per axis.
pub const MAX_LAYOUT_EXPONENT: u8 = 10;

/// Number of cells per axis in an edge-inclusive block of `n` interior cells.
#[inline(always)]
pub const fn stride(cells_per_edge: usize) -> usize {
  cells_per_edge + 1
}

/// Convert local 3D cell coordinates to a linear index within an
/// edge-inclusive block.
#[inline(always)]
pub const fn coord_to_index(x: usize, y: usize, z: usize, cells_per_edge: usize) -> usize {
  let s = stride(cells_per_edge);
  (x * s + y) * s + z
}

/// Convert a linear index within an edge-inclusive block to local coordinates.
#[inline(always)]
pub const fn index_to_coord(idx: usize, cells_per_edge: usize) -> (usize, usize, usize) {
  let s = stride(cells_per_edge);
  let z = idx % s;
  let y = (idx / s) % s;
  let x = idx / (s * s);
  (x, y, z)
}

/// Corner offsets of a cell cube relative to its base cell, as `[x, y, z]`.
pub const CORNER_OFFSETS: [[usize; 3]; 8] = [
  [0, 0, 0],
  [1, 0, 0],
  [0, 1, 0],
  [1, 1, 0],
  [0, 0, 1],
  [1, 0, 1],
  [0, 1, 1],
  [1, 1, 1],
];

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
