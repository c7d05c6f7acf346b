//! Border propagation between neighboring partitions.
//!
//! ```text
//!   partition P            neighbor +X
//!   ┌───┬───┬───┬───╥───┐  ┌───┬───┬──
//!   │ 0 │ 1 │ 2 │ 3 ║ 4 │◄─┤ 0 │ 1 │ ...
//!   └───┴───┴───┴───╨───┘  └───┴───┴──
//!                     ▲
//!                     └─ border slice of P, copied from the neighbor's slice 0
//! ```
//!
//! Cells with several coordinates at `n` (edges, the corner) come from the
//! diagonal neighbors. Runs in two phases: every partition gathers its border
//! values from shared references in parallel, then all partitions apply their
//! batch in parallel.

use rayon::prelude::*;

use super::Volume;
use crate::cell::TsdCell;
use crate::constants::coord_to_index;
use crate::partition::{Partition, PartitionState};

impl Volume {
  /// Refresh every allocated partition's border cells from its neighbors.
  ///
  /// A carved neighbor contributes free cells carrying its pending weight.
  /// A never-observed neighbor leaves the border untouched, as does the
  /// outer face of the volume.
  pub fn propagate_borders(&mut self) {
    let volume = &*self;
    let updates: Vec<Vec<(usize, TsdCell)>> = (0..volume.partitions().len())
      .into_par_iter()
      .map(|i| volume.gather_border(i))
      .collect();

    self
      .partitions_mut()
      .par_iter_mut()
      .zip(updates.into_par_iter())
      .for_each(|(partition, batch)| apply_border(partition, batch));
  }

  fn gather_border(&self, index: usize) -> Vec<(usize, TsdCell)> {
    let partition = &self.partitions()[index];
    if !partition.is_initialized() {
      return Vec::new();
    }

    let n = self.cells_per_partition();
    let per_axis = self.partitions_per_axis();
    let offset = partition.offset();
    let grid = [offset[0] / n, offset[1] / n, offset[2] / n];

    let mut batch = Vec::new();
    for lx in 0..=n {
      for ly in 0..=n {
        for lz in 0..=n {
          let local = [lx, ly, lz];
          if local.iter().all(|&c| c < n) {
            continue;
          }

          let mut neighbor = [0usize; 3];
          let mut source = [0usize; 3];
          let mut inside = true;
          for axis in 0..3 {
            let step = (local[axis] == n) as usize;
            neighbor[axis] = grid[axis] + step;
            source[axis] = if step == 1 { 0 } else { local[axis] };
            inside &= neighbor[axis] < per_axis;
          }
          if !inside {
            continue;
          }

          let other = &self.partitions()[self.partition_index(neighbor[0], neighbor[1], neighbor[2])];
          let value = match other.state() {
            PartitionState::Allocated => other.cell(source[0], source[1], source[2]).copied(),
            PartitionState::Carved => Some(TsdCell::free(other.storage().pending_weight())),
            PartitionState::Empty => None,
          };
          if let Some(cell) = value {
            batch.push((coord_to_index(lx, ly, lz, n), cell));
          }
        }
      }
    }
    batch
  }
}

fn apply_border(partition: &mut Partition, batch: Vec<(usize, TsdCell)>) {
  if batch.is_empty() {
    return;
  }
  if let Some(cells) = partition.storage_mut().cells_mut() {
    for (index, cell) in batch {
      cells[index] = cell;
    }
  }
}
