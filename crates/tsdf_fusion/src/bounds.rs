//! Axis-aligned bounding box and bounding sphere used for culling and
//! ray clipping.

use glam::DVec3;

/// Double-precision axis-aligned bounding box.
///
/// Defines the region of a volume in which trilinear interpolation is defined.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DAabb3 {
  /// Minimum corner (inclusive).
  pub min: DVec3,
  /// Maximum corner (inclusive).
  pub max: DVec3,
}

impl DAabb3 {
  /// Create a new AABB from min and max corners.
  ///
  /// # Panics
  /// Debug-asserts that min <= max on all axes.
  pub fn new(min: DVec3, max: DVec3) -> Self {
    debug_assert!(
      min.x <= max.x && min.y <= max.y && min.z <= max.z,
      "AABB min must be <= max on all axes"
    );
    Self { min, max }
  }

  /// Check if this AABB contains a point.
  #[inline]
  pub fn contains_point(&self, point: DVec3) -> bool {
    point.x >= self.min.x
      && point.x <= self.max.x
      && point.y >= self.min.y
      && point.y <= self.max.y
      && point.z >= self.min.z
      && point.z <= self.max.z
  }

  /// Get the size of the AABB (max - min).
  #[inline]
  pub fn size(&self) -> DVec3 {
    self.max - self.min
  }

  /// Get the center of the AABB.
  #[inline]
  pub fn center(&self) -> DVec3 {
    (self.min + self.max) * 0.5
  }

  /// Clip a ray against the box (slab method).
  ///
  /// Returns the parametric interval `(t_enter, t_exit)` along `dir`, or
  /// `None` if the ray misses the box or the box lies entirely behind the
  /// origin. `t_enter` is negative when the origin is inside.
  pub fn ray_interval(&self, origin: DVec3, dir: DVec3) -> Option<(f64, f64)> {
    let mut t_enter = f64::NEG_INFINITY;
    let mut t_exit = f64::INFINITY;

    for axis in 0..3 {
      let o = origin[axis];
      let d = dir[axis];
      if d.abs() < 1e-12 {
        if o < self.min[axis] || o > self.max[axis] {
          return None;
        }
        continue;
      }
      let inv = 1.0 / d;
      let mut t0 = (self.min[axis] - o) * inv;
      let mut t1 = (self.max[axis] - o) * inv;
      if t0 > t1 {
        std::mem::swap(&mut t0, &mut t1);
      }
      t_enter = t_enter.max(t0);
      t_exit = t_exit.min(t1);
    }

    if t_enter > t_exit || t_exit < 0.0 {
      None
    } else {
      Some((t_enter, t_exit))
    }
  }
}

/// Anything with a bounding sphere that can be tested against a sensor.
///
/// Shared by leaf partitions and inner tree nodes so culling treats both the
/// same way.
pub trait Cullable {
  /// World-space center of the bounding sphere.
  fn centroid(&self) -> DVec3;

  /// Radius of the bounding sphere.
  fn circumradius(&self) -> f64;
}

/// Plain bounding sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
  pub center: DVec3,
  pub radius: f64,
}

impl BoundingSphere {
  pub fn new(center: DVec3, radius: f64) -> Self {
    Self { center, radius }
  }

  /// Sphere circumscribing the cube with the given min corner and edge.
  pub fn around_cube(min: DVec3, edge: f64) -> Self {
    Self {
      center: min + DVec3::splat(edge * 0.5),
      radius: 3.0_f64.sqrt() * edge * 0.5,
    }
  }
}

impl Cullable for BoundingSphere {
  #[inline]
  fn centroid(&self) -> DVec3 {
    self.center
  }

  #[inline]
  fn circumradius(&self) -> f64 {
    self.radius
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_new() {
    let aabb = DAabb3::new(DVec3::new(-1.0, -2.0, -3.0), DVec3::new(1.0, 2.0, 3.0));
    assert_eq!(aabb.min, DVec3::new(-1.0, -2.0, -3.0));
    assert_eq!(aabb.max, DVec3::new(1.0, 2.0, 3.0));
  }

  #[test]
  fn test_contains_point() {
    let aabb = DAabb3::new(DVec3::ZERO, DVec3::splat(10.0));

    // Inside
    assert!(aabb.contains_point(DVec3::splat(5.0)));

    // On boundary
    assert!(aabb.contains_point(DVec3::ZERO));
    assert!(aabb.contains_point(DVec3::splat(10.0)));

    // Outside
    assert!(!aabb.contains_point(DVec3::splat(-1.0)));
    assert!(!aabb.contains_point(DVec3::splat(11.0)));
  }

  #[test]
  fn test_size_and_center() {
    let aabb = DAabb3::new(DVec3::new(-1.0, -2.0, -3.0), DVec3::new(1.0, 2.0, 3.0));
    assert_eq!(aabb.size(), DVec3::new(2.0, 4.0, 6.0));
    assert_eq!(aabb.center(), DVec3::ZERO);
  }

  #[test]
  fn test_ray_interval_from_inside() {
    let aabb = DAabb3::new(DVec3::ZERO, DVec3::splat(10.0));
    let (t0, t1) = aabb
      .ray_interval(DVec3::splat(5.0), DVec3::X)
      .expect("ray from inside must hit");
    assert!(t0 < 0.0);
    assert!((t1 - 5.0).abs() < 1e-12);
  }

  #[test]
  fn test_ray_interval_from_outside() {
    let aabb = DAabb3::new(DVec3::ZERO, DVec3::splat(10.0));
    let (t0, t1) = aabb
      .ray_interval(DVec3::new(-5.0, 5.0, 5.0), DVec3::X)
      .expect("ray toward box must hit");
    assert!((t0 - 5.0).abs() < 1e-12);
    assert!((t1 - 15.0).abs() < 1e-12);
  }

  #[test]
  fn test_ray_interval_miss() {
    let aabb = DAabb3::new(DVec3::ZERO, DVec3::splat(10.0));
    // Parallel and outside
    assert!(aabb.ray_interval(DVec3::new(-1.0, 20.0, 5.0), DVec3::X).is_none());
    // Pointing away
    assert!(aabb.ray_interval(DVec3::new(-5.0, 5.0, 5.0), -DVec3::X).is_none());
  }

  #[test]
  fn test_sphere_around_cube() {
    let sphere = BoundingSphere::around_cube(DVec3::ZERO, 2.0);
    assert_eq!(sphere.centroid(), DVec3::splat(1.0));
    assert!((sphere.circumradius() - 3.0_f64.sqrt()).abs() < 1e-12);
  }
}
