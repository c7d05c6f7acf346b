use super::*;

const TRUNC: f64 = 0.1;

#[test]
fn test_fresh_cell_zero_sdf() {
  let mut cell = TsdCell::UNSEEN;
  assert!(cell.fuse(0.0, TRUNC, None));
  assert_eq!(cell.tsd, Some(0.0));
  assert_eq!(cell.weight, TSD_INC);
}

#[test]
fn test_two_observations_average() {
  let (sdf1, sdf2) = (0.03, -0.05);
  let mut cell = TsdCell::UNSEEN;
  cell.fuse(sdf1, TRUNC, None);
  cell.fuse(sdf2, TRUNC, None);

  let t1 = (sdf1 / TRUNC) as f32;
  let t2 = (sdf2 / TRUNC) as f32;
  let w = 2.0 * TSD_INC;
  let expected = (t1 * (w - TSD_INC) + t2) / w;

  assert_eq!(cell.weight, w);
  assert!((cell.tsd.unwrap() - expected).abs() < 1e-6);
}

#[test]
fn test_sdf_capped_at_increment() {
  let mut cell = TsdCell::UNSEEN;
  cell.fuse(10.0 * TRUNC, TRUNC, None);
  assert_eq!(cell.tsd, Some(TSD_INC));
}

#[test]
fn test_rejection_boundary() {
  // Exactly at -2 * trunc: applied
  let mut cell = TsdCell::UNSEEN;
  assert!(cell.fuse(-2.0 * TRUNC, TRUNC, None));
  assert_eq!(cell.weight, TSD_INC);
  assert!((cell.tsd.unwrap() + 2.0).abs() < 1e-6);

  // Just below: rejected, cell untouched
  let before = cell;
  assert!(!cell.fuse(-2.0 * TRUNC - 1e-9, TRUNC, None));
  assert_eq!(cell, before);
}

#[test]
fn test_weight_monotonic_and_bounded() {
  let mut cell = TsdCell::UNSEEN;
  let mut last = cell.weight;
  for i in 0..100 {
    if i % 3 == 0 {
      cell.carve();
    } else {
      cell.fuse(((i % 7) as f64 - 3.0) * 0.02, TRUNC, None);
    }
    assert!(cell.weight >= last, "weight decreased at step {}", i);
    assert!(cell.weight <= MAX_WEIGHT);
    last = cell.weight;
  }
  assert_eq!(cell.weight, MAX_WEIGHT);
}

#[test]
fn test_carve_unseen_cell_becomes_free() {
  let mut cell = TsdCell::UNSEEN;
  cell.carve();
  assert_eq!(cell.tsd, Some(1.0));
  assert_eq!(cell.weight, EMPTINESS_INC);
}

#[test]
fn test_carve_pulls_toward_free_space() {
  let mut cell = TsdCell::UNSEEN;
  cell.fuse(0.0, TRUNC, None);
  cell.carve();
  assert_eq!(cell.weight, 2.0);
  assert!((cell.tsd.unwrap() - 0.5).abs() < 1e-6);
}

#[test]
fn test_rgb_first_observation_and_blend() {
  let mut cell = TsdCell::UNSEEN;
  cell.fuse(0.0, TRUNC, Some([200, 100, 0]));
  assert_eq!(cell.rgb, [200, 100, 0]);

  cell.fuse(0.0, TRUNC, Some([0, 100, 200]));
  assert_eq!(cell.rgb, [100, 100, 100]);
}

#[test]
fn test_storage_lazy_allocation() {
  let mut storage = CellStorage::new();
  assert!(!storage.is_allocated());
  assert!(storage.cells().is_none());

  let cells = storage.ensure_allocated(27);
  assert_eq!(cells.len(), 27);
  assert!(cells.iter().all(|c| *c == TsdCell::UNSEEN));
  assert!(storage.is_allocated());
}

#[test]
fn test_storage_pending_weight_seeds_cells() {
  let mut storage = CellStorage::new();
  storage.increase_emptiness();
  storage.increase_emptiness();
  assert_eq!(storage.pending_weight(), 2.0);
  assert!(!storage.is_allocated());

  let cells = storage.ensure_allocated(8);
  assert!(cells.iter().all(|c| c.tsd == Some(1.0) && c.weight == 2.0));
  assert_eq!(storage.pending_weight(), 0.0);
}

#[test]
fn test_storage_pending_weight_saturates() {
  let mut storage = CellStorage::new();
  for _ in 0..100 {
    storage.increase_emptiness();
  }
  assert_eq!(storage.pending_weight(), MAX_WEIGHT);
}

#[test]
fn test_storage_allocates_once() {
  let mut storage = CellStorage::new();
  storage.ensure_allocated(8)[3].fuse(0.0, TRUNC, None);
  // Second call must keep existing contents
  let cells = storage.ensure_allocated(8);
  assert_eq!(cells[3].tsd, Some(0.0));
}
