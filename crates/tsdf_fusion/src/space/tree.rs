//! SpaceNode - bounding-sphere hierarchy over the partition grid.
//!
//! Built by halving the partition grid into octants until single partitions
//! remain. Every internal sphere encloses the spheres of its children, so a
//! subtree whose sphere fails a culling test holds no visible partition.

use crate::bounds::{BoundingSphere, Cullable};
use crate::partition::Partition;

/// Relative inflation of internal spheres. Octant spheres touch their
/// parent's sphere, and float error must not let a child poke out.
const SPHERE_SLACK: f64 = 1e-9;

/// Node of the culling hierarchy.
#[derive(Clone, Debug, PartialEq)]
pub enum SpaceNode {
  Internal {
    sphere: BoundingSphere,
    children: Vec<SpaceNode>,
  },
  Leaf {
    partition: usize,
  },
}

impl SpaceNode {
  /// Build the hierarchy for a cubic grid of `per_axis³` partitions indexed
  /// `(px * per_axis + py) * per_axis + pz`. `per_axis` must be a power of two.
  pub fn build(partitions: &[Partition], per_axis: usize) -> Self {
    Self::build_region(partitions, per_axis, [0, 0, 0], per_axis)
  }

  fn build_region(partitions: &[Partition], per_axis: usize, min: [usize; 3], size: usize) -> Self {
    let index = (min[0] * per_axis + min[1]) * per_axis + min[2];
    if size <= 1 {
      return SpaceNode::Leaf { partition: index };
    }

    let half = size / 2;
    let children = (0..8u8)
      .map(|octant| {
        let child = [
          min[0] + (octant & 1) as usize * half,
          min[1] + ((octant >> 1) & 1) as usize * half,
          min[2] + ((octant >> 2) & 1) as usize * half,
        ];
        Self::build_region(partitions, per_axis, child, half)
      })
      .collect();

    let first = &partitions[index];
    let mut sphere =
      BoundingSphere::around_cube(first.cell_center([0, 0, 0]), size as f64 * first.edge_length());
    sphere.radius *= 1.0 + SPHERE_SLACK;

    SpaceNode::Internal { sphere, children }
  }

  /// Push the index of every partition that passes `visible`, skipping
  /// subtrees whose sphere fails it.
  pub fn collect_visible<F>(&self, partitions: &[Partition], visible: &F, out: &mut Vec<usize>)
  where
    F: Fn(&dyn Cullable) -> bool,
  {
    match self {
      SpaceNode::Leaf { partition } => {
        if visible(&partitions[*partition]) {
          out.push(*partition);
        }
      }
      SpaceNode::Internal { sphere, children } => {
        if visible(sphere) {
          for child in children {
            child.collect_visible(partitions, visible, out);
          }
        }
      }
    }
  }

  /// Number of leaves below this node.
  pub fn leaf_count(&self) -> usize {
    match self {
      SpaceNode::Leaf { .. } => 1,
      SpaceNode::Internal { children, .. } => children.iter().map(SpaceNode::leaf_count).sum(),
    }
  }

  pub fn depth(&self) -> usize {
    match self {
      SpaceNode::Leaf { .. } => 0,
      SpaceNode::Internal { children, .. } => {
        1 + children.iter().map(SpaceNode::depth).max().unwrap_or(0)
      }
    }
  }
}
