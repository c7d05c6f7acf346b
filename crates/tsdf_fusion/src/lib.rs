//! tsdf_fusion - Partitioned truncated signed distance volumes for range
//! sensors
//!
//! This crate fuses range measurements from posed sensors into a regular
//! grid of truncated signed distances and extracts surfaces back out of it
//! by ray casting. The grid is split into cubic partitions whose storage is
//! allocated lazily, so space that was only ever seen as empty costs a
//! single weight.
//!
//! # Features
//!
//! - **Lazy partitions**: cells are allocated on the first observation near
//!   a surface; free-space observations only carve
//! - **Sensor models**: rotating polar scanners and pinhole depth cameras
//!   behind one [`Sensor`] trait
//! - **Frustum culling**: flat or hierarchical ([`SpaceNode`]) selection of
//!   the partitions a frame can update
//! - **Ray casting**: surface points, normals and colors per sensor ray
//! - **Persistence**: compact little-endian volume files
//!
//! # Example
//!
//! ```ignore
//! use tsdf_fusion::{Layout, ProjectiveConfig, ProjectiveSensor, RayCaster, Sensor, Volume, VolumeConfig};
//!
//! let config = VolumeConfig::new(0.01, Layout::new(4)?, Layout::new(5)?);
//! let mut volume = Volume::new(config)?;
//!
//! let mut camera = ProjectiveSensor::new(ProjectiveConfig::new(640, 480, 525.0, 525.0, 319.5, 239.5))?;
//! camera.set_pose(pose)?;
//! camera.set_depth_map(&depth, Some(&colors));
//! let stats = volume.push(&camera);
//!
//! let caster = RayCaster::default();
//! let surface = caster.cast_view(&volume, &camera, 1);
//! println!("{} partitions updated, {} surface points", stats.selected, surface.count());
//! ```

pub mod bounds;
pub mod cell;
pub mod config;
pub mod constants;
pub mod error;

// Re-export commonly used items
pub use bounds::{BoundingSphere, Cullable, DAabb3};
pub use cell::{CellStorage, Rgb, TsdCell};
pub use config::{Layout, PolarConfig, ProjectiveConfig, RayCastConfig, VolumeConfig};
pub use error::{InterpolateError, Result, TsdfError};

// Cell blocks and their lookup tables
pub mod partition;
pub use partition::{CellLut, GridPartition, Partition, PartitionState};

// Sensor models
pub mod sensor;
pub use sensor::{PolarSensor, ProjectiveSensor, Sensor, SensorFrame};

// The fused volume: indexing, fusion, borders, persistence
pub mod space;
pub use space::{CellIndex, PushStats, SpaceNode, Volume};

// Surface extraction
pub mod raycast;
pub use raycast::{CastOutput, Hit, RayCaster};

#[cfg(test)]
mod test_utils;
