//! Frame integration.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              PUSH PIPELINE                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. Cull (read-only)                                                    │
//! │     partition sphere, radius + 2 * trunc ──► sensor.is_visible          │
//! │     push: every partition     push_tree: SpaceNode walk                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  2. Fuse (rayon, one worker per partition)                              │
//! │     cell center ──► sensor frame ──► nearest ray ──► sdf                │
//! │     allocated            → add_tsd_rgb per observed cell                │
//! │     unallocated, in band → allocate, then add_tsd_rgb                   │
//! │     unallocated, free    → increase_emptiness                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  3. propagate_borders                                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rayon::prelude::*;
use web_time::Instant;

use super::Volume;
use crate::bounds::Cullable;
use crate::cell::Rgb;
use crate::partition::{CellLut, Partition};
use crate::sensor::Sensor;

/// Summary of one integrated frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PushStats {
  /// Partitions that passed culling.
  pub selected: usize,
  /// Partitions that received cell storage during this frame.
  pub allocated: usize,
  /// Unallocated partitions marked as free space.
  pub carved: usize,
  /// Cell updates applied.
  pub fused_cells: usize,
  /// Wall time of the whole push.
  pub elapsed_us: u64,
}

/// What fusion did to one partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
  Untouched,
  Carved,
  Fused { allocated: bool, cells: usize },
}

impl Volume {
  /// Integrate the sensor's current frame, testing every partition.
  #[tracing::instrument(skip_all, name = "volume::push")]
  pub fn push<S: Sensor + ?Sized>(&mut self, sensor: &S) -> PushStats {
    let start = Instant::now();
    let padding = 2.0 * self.max_truncation();
    let selected: Vec<bool> = self
      .partitions()
      .par_iter()
      .map(|p| is_visible(sensor, p, padding))
      .collect();
    self.fuse_selected(sensor, &selected, start)
  }

  /// Integrate the sensor's current frame, culling through the space tree.
  ///
  /// Selects the same partitions as [`Volume::push`].
  #[tracing::instrument(skip_all, name = "volume::push_tree")]
  pub fn push_tree<S: Sensor + ?Sized>(&mut self, sensor: &S) -> PushStats {
    let start = Instant::now();
    let padding = 2.0 * self.max_truncation();
    let mut visible = Vec::new();
    self.tree().collect_visible(
      self.partitions(),
      &|c: &dyn Cullable| is_visible(sensor, c, padding),
      &mut visible,
    );

    let mut selected = vec![false; self.partitions().len()];
    for index in visible {
      selected[index] = true;
    }
    self.fuse_selected(sensor, &selected, start)
  }

  /// Partitions `push` would select for the sensor's current pose.
  pub fn visible_partitions<S: Sensor + ?Sized>(&self, sensor: &S) -> Vec<usize> {
    let padding = 2.0 * self.max_truncation();
    (0..self.partitions().len())
      .filter(|&i| is_visible(sensor, &self.partitions()[i], padding))
      .collect()
  }

  fn fuse_selected<S: Sensor + ?Sized>(
    &mut self,
    sensor: &S,
    selected: &[bool],
    start: Instant,
  ) -> PushStats {
    let trunc = self.max_truncation();
    let lut = &self.cell_lut;
    let outcomes: Vec<Outcome> = self
      .partitions
      .par_iter_mut()
      .zip(selected.par_iter())
      .filter(|(_, chosen)| **chosen)
      .map(|(partition, _)| fuse_partition(partition, lut, sensor, trunc))
      .collect();

    self.propagate_borders();

    let mut stats = PushStats {
      selected: outcomes.len(),
      ..PushStats::default()
    };
    for outcome in outcomes {
      match outcome {
        Outcome::Untouched => {}
        Outcome::Carved => stats.carved += 1,
        Outcome::Fused { allocated, cells } => {
          stats.allocated += allocated as usize;
          stats.fused_cells += cells;
        }
      }
    }
    stats.elapsed_us = start.elapsed().as_micros() as u64;

    tracing::debug!(
      selected = stats.selected,
      allocated = stats.allocated,
      carved = stats.carved,
      fused_cells = stats.fused_cells,
      elapsed_us = stats.elapsed_us,
      "pushed frame"
    );
    stats
  }
}

/// Culling test shared by `push` and `push_tree`.
#[inline]
fn is_visible<S: Sensor + ?Sized>(sensor: &S, bounds: &dyn Cullable, padding: f64) -> bool {
  sensor.is_visible(sensor.to_local(bounds.centroid()), bounds.circumradius() + padding)
}

/// Signed distance of one interior cell along its nearest ray.
struct Observation {
  local: [usize; 3],
  sdf: f64,
  rgb: Option<Rgb>,
}

fn fuse_partition<S: Sensor + ?Sized>(
  partition: &mut Partition,
  lut: &CellLut,
  sensor: &S,
  trunc: f64,
) -> Outcome {
  let mut observations = Vec::new();
  let mut in_band = false;
  let mut all_free = true;

  for &local in lut.iter() {
    let point = sensor.to_local(partition.cell_center(local));
    let Some(ray) = sensor.project(point) else {
      continue;
    };
    if !sensor.valid(ray) {
      continue;
    }
    let sdf = sensor.measured_distance(ray) - point.length();
    in_band |= sdf >= -2.0 * trunc && sdf <= trunc;
    all_free &= sdf > trunc;
    observations.push(Observation {
      local,
      sdf,
      rgb: sensor.rgb(ray),
    });
  }

  let was_allocated = partition.is_initialized();
  if !was_allocated {
    if observations.is_empty() {
      return Outcome::Untouched;
    }
    if !in_band {
      if all_free {
        partition.increase_emptiness();
        return Outcome::Carved;
      }
      return Outcome::Untouched;
    }
    partition.init();
  }

  let cells = observations
    .iter()
    .filter(|o| {
      let [x, y, z] = o.local;
      partition.add_tsd_rgb(x, y, z, o.sdf, trunc, o.rgb)
    })
    .count();

  Outcome::Fused {
    allocated: !was_allocated,
    cells,
  }
}

#[cfg(test)]
#[path = "fusion_test.rs"]
mod fusion_test;
