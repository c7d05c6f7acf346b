//! TSDF cell and the lazily allocated cell storage of a partition.

use crate::constants::{EMPTINESS_INC, MAX_WEIGHT, TSD_INC};

/// RGB color of a cell.
pub type Rgb = [u8; 3];

/// A single TSDF cell.
///
/// `tsd` is `None` until the cell receives its first observation. Once set it
/// holds the signed distance normalized by the truncation radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TsdCell {
  /// Normalized truncated signed distance, `None` while unseen.
  pub tsd: Option<f32>,

  /// Accumulated confidence in `[0, MAX_WEIGHT]`.
  pub weight: f32,

  /// Running average color.
  pub rgb: Rgb,
}

impl TsdCell {
  /// Cell that has never been observed.
  pub const UNSEEN: Self = Self {
    tsd: None,
    weight: 0.0,
    rgb: [0; 3],
  };

  /// Free-space cell carrying the given confidence.
  pub fn free(weight: f32) -> Self {
    Self {
      tsd: Some(1.0),
      weight,
      rgb: [0; 3],
    }
  }

  /// True once the cell holds a defined distance.
  #[inline]
  pub fn is_seen(&self) -> bool {
    self.tsd.is_some()
  }

  /// Fuse one observed signed distance into the cell.
  ///
  /// Observations further than `2 * max_truncation` behind the surface are
  /// rejected so a thin object seen from both sides keeps its surface.
  /// Returns `true` if the cell changed.
  #[inline]
  pub fn fuse(&mut self, sdf: f64, max_truncation: f64, rgb: Option<Rgb>) -> bool {
    if sdf < -2.0 * max_truncation {
      return false;
    }
    let tsdf = (sdf / max_truncation).min(TSD_INC as f64) as f32;
    self.accumulate(tsdf, TSD_INC, rgb);
    true
  }

  /// Nudge the cell toward free space.
  #[inline]
  pub fn carve(&mut self) {
    self.accumulate(1.0, EMPTINESS_INC, None);
  }

  /// Weighted running average with saturating weight.
  #[inline]
  fn accumulate(&mut self, value: f32, increment: f32, rgb: Option<Rgb>) {
    match self.tsd {
      None => {
        self.tsd = Some(value);
        self.weight = increment.min(MAX_WEIGHT);
        if let Some(color) = rgb {
          self.rgb = color;
        }
      }
      Some(tsd) => {
        self.weight = (self.weight + increment).min(MAX_WEIGHT);
        let prior = self.weight - increment;
        self.tsd = Some((tsd * prior + value) / self.weight);
        if let Some(color) = rgb {
          for (channel, &c) in self.rgb.iter_mut().zip(color.iter()) {
            let blended = (*channel as f32 * prior + c as f32) / self.weight;
            *channel = blended.round().clamp(0.0, 255.0) as u8;
          }
        }
      }
    }
  }
}

impl Default for TsdCell {
  fn default() -> Self {
    Self::UNSEEN
  }
}

/// Allocation state of a partition's cells.
///
/// A partition starts `Unallocated`. Free-space carving before the first
/// allocation only accumulates `pending_weight`, which seeds every cell once
/// the storage is allocated.
#[derive(Clone, Debug, PartialEq)]
pub enum CellStorage {
  Unallocated { pending_weight: f32 },
  Allocated { cells: Box<[TsdCell]> },
}

impl CellStorage {
  /// Fresh, never touched storage.
  pub fn new() -> Self {
    CellStorage::Unallocated {
      pending_weight: 0.0,
    }
  }

  /// Allocate `len` cells if not yet allocated. Allocation happens once.
  pub fn ensure_allocated(&mut self, len: usize) -> &mut [TsdCell] {
    if let CellStorage::Unallocated { pending_weight } = *self {
      let seed = if pending_weight > 0.0 {
        TsdCell::free(pending_weight)
      } else {
        TsdCell::UNSEEN
      };
      *self = CellStorage::Allocated {
        cells: vec![seed; len].into_boxed_slice(),
      };
    }
    match self {
      CellStorage::Allocated { cells } => cells,
      CellStorage::Unallocated { .. } => unreachable!("storage allocated above"),
    }
  }

  /// Carve every cell, or accumulate pending weight while unallocated.
  pub fn increase_emptiness(&mut self) {
    match self {
      CellStorage::Allocated { cells } => cells.iter_mut().for_each(TsdCell::carve),
      CellStorage::Unallocated { pending_weight } => {
        *pending_weight = (*pending_weight + EMPTINESS_INC).min(MAX_WEIGHT);
      }
    }
  }

  /// Allocated cells, if any.
  #[inline]
  pub fn cells(&self) -> Option<&[TsdCell]> {
    match self {
      CellStorage::Allocated { cells } => Some(cells),
      CellStorage::Unallocated { .. } => None,
    }
  }

  /// Mutable allocated cells, if any.
  #[inline]
  pub fn cells_mut(&mut self) -> Option<&mut [TsdCell]> {
    match self {
      CellStorage::Allocated { cells } => Some(cells),
      CellStorage::Unallocated { .. } => None,
    }
  }

  /// Weight accumulated while unallocated (zero once allocated).
  #[inline]
  pub fn pending_weight(&self) -> f32 {
    match self {
      CellStorage::Unallocated { pending_weight } => *pending_weight,
      CellStorage::Allocated { .. } => 0.0,
    }
  }

  #[inline]
  pub fn is_allocated(&self) -> bool {
    matches!(self, CellStorage::Allocated { .. })
  }
}

impl Default for CellStorage {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
#[path = "cell_test.rs"]
mod cell_test;
