//! Binary volume format.
//!
//! ```text
//! Header (52 bytes, little endian):
//!   0..4    magic "TSDV"
//!   4..6    version (u16)
//!   6       partition layout exponent (u8)
//!   7       space layout exponent (u8)
//!   8..12   cells per axis (u32)
//!   12..20  voxel size (f64)
//!   20..28  truncation radius (f64)
//!   28..52  origin x, y, z (f64)
//!
//! Per partition, in index order:
//!   state (u8)   0 = unallocated, followed by pending weight (f32)
//!                1 = allocated, followed by (n + 1)³ cells:
//!                    tsd (f32, NaN while unseen), weight (f32), rgb (3 × u8)
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::Volume;
use crate::cell::{CellStorage, TsdCell};
use crate::config::{Layout, VolumeConfig};
use crate::error::{Result, TsdfError};

/// Magic bytes of a volume file.
pub const VOLUME_MAGIC: [u8; 4] = *b"TSDV";

/// Current format version.
pub const FORMAT_VERSION: u16 = 1;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 52;

const STATE_UNALLOCATED: u8 = 0;
const STATE_ALLOCATED: u8 = 1;

/// Bytes per serialized cell.
const CELL_SIZE: usize = 11;

/// Fixed-size file header.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeHeader {
  pub magic: [u8; 4],
  pub version: u16,
  pub partition_exponent: u8,
  pub space_exponent: u8,
  pub cells_per_axis: u32,
  pub voxel_size: f64,
  pub max_truncation: f64,
  pub origin: [f64; 3],
}

impl VolumeHeader {
  /// Header describing a volume.
  pub fn for_volume(volume: &Volume) -> Self {
    let config = volume.config();
    Self {
      magic: VOLUME_MAGIC,
      version: FORMAT_VERSION,
      partition_exponent: config.partition_layout.exponent(),
      space_exponent: config.space_layout.exponent(),
      cells_per_axis: volume.x_dimension() as u32,
      voxel_size: config.voxel_size,
      max_truncation: config.max_truncation,
      origin: config.origin,
    }
  }

  pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
    let mut bytes = [0u8; HEADER_SIZE];
    bytes[0..4].copy_from_slice(&self.magic);
    bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
    bytes[6] = self.partition_exponent;
    bytes[7] = self.space_exponent;
    bytes[8..12].copy_from_slice(&self.cells_per_axis.to_le_bytes());
    bytes[12..20].copy_from_slice(&self.voxel_size.to_le_bytes());
    bytes[20..28].copy_from_slice(&self.max_truncation.to_le_bytes());
    for (axis, value) in self.origin.iter().enumerate() {
      let at = 28 + axis * 8;
      bytes[at..at + 8].copy_from_slice(&value.to_le_bytes());
    }
    bytes
  }

  pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
    let mut magic = [0u8; 4];
    magic.copy_from_slice(&bytes[0..4]);
    let mut origin = [0.0; 3];
    for (axis, value) in origin.iter_mut().enumerate() {
      *value = read_f64(&bytes[28 + axis * 8..]);
    }

    Self {
      magic,
      version: u16::from_le_bytes([bytes[4], bytes[5]]),
      partition_exponent: bytes[6],
      space_exponent: bytes[7],
      cells_per_axis: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
      voxel_size: read_f64(&bytes[12..]),
      max_truncation: read_f64(&bytes[20..]),
      origin,
    }
  }

  /// Rebuild the volume configuration, checking magic, version and layout.
  pub fn to_config(&self) -> Result<VolumeConfig> {
    if self.magic != VOLUME_MAGIC {
      return Err(TsdfError::InvalidFormat {
        message: "bad magic bytes",
      });
    }
    if self.version != FORMAT_VERSION {
      return Err(TsdfError::InvalidFormat {
        message: "unsupported format version",
      });
    }

    let config = VolumeConfig::new(
      self.voxel_size,
      Layout::new(self.partition_exponent)?,
      Layout::new(self.space_exponent)?,
    )
    .with_max_truncation(self.max_truncation)
    .with_origin(self.origin);

    if config.cells_per_axis() != self.cells_per_axis as usize {
      return Err(TsdfError::LayoutMismatch {
        expected: config.cells_per_axis(),
        got: self.cells_per_axis as usize,
      });
    }
    Ok(config)
  }
}

#[inline]
fn read_f64(bytes: &[u8]) -> f64 {
  let mut raw = [0u8; 8];
  raw.copy_from_slice(&bytes[..8]);
  f64::from_le_bytes(raw)
}

#[inline]
fn read_f32(bytes: &[u8]) -> f32 {
  f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

impl Volume {
  /// Write the volume to a byte stream.
  #[tracing::instrument(skip_all, name = "volume::serialize")]
  pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
    writer.write_all(&VolumeHeader::for_volume(self).to_bytes())?;

    let mut buffer = Vec::new();
    for partition in self.partitions() {
      buffer.clear();
      match partition.storage() {
        CellStorage::Unallocated { pending_weight } => {
          buffer.push(STATE_UNALLOCATED);
          buffer.extend_from_slice(&pending_weight.to_le_bytes());
        }
        CellStorage::Allocated { cells } => {
          buffer.reserve(1 + cells.len() * CELL_SIZE);
          buffer.push(STATE_ALLOCATED);
          for cell in cells.iter() {
            buffer.extend_from_slice(&cell.tsd.unwrap_or(f32::NAN).to_le_bytes());
            buffer.extend_from_slice(&cell.weight.to_le_bytes());
            buffer.extend_from_slice(&cell.rgb);
          }
        }
      }
      writer.write_all(&buffer)?;
    }

    tracing::debug!(
      partitions = self.partitions().len(),
      allocated = self.allocated_partitions(),
      "serialized volume"
    );
    Ok(())
  }

  /// Read a volume written by [`Volume::serialize`].
  #[tracing::instrument(skip_all, name = "volume::load")]
  pub fn load<R: Read>(reader: &mut R) -> Result<Self> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;
    let config = VolumeHeader::from_bytes(&header).to_config()?;
    let mut volume = Volume::new(config)?;

    let cell_count = volume.partitions()[0].cell_count();
    let mut payload = vec![0u8; cell_count * CELL_SIZE];
    for partition in volume.partitions_mut() {
      let mut state = [0u8; 1];
      reader.read_exact(&mut state)?;
      let storage = match state[0] {
        STATE_UNALLOCATED => {
          let mut weight = [0u8; 4];
          reader.read_exact(&mut weight)?;
          CellStorage::Unallocated {
            pending_weight: f32::from_le_bytes(weight),
          }
        }
        STATE_ALLOCATED => {
          reader.read_exact(&mut payload)?;
          let cells = payload
            .chunks_exact(CELL_SIZE)
            .map(|raw| {
              let tsd = read_f32(&raw[0..4]);
              TsdCell {
                tsd: (!tsd.is_nan()).then_some(tsd),
                weight: read_f32(&raw[4..8]),
                rgb: [raw[8], raw[9], raw[10]],
              }
            })
            .collect();
          CellStorage::Allocated { cells }
        }
        _ => {
          return Err(TsdfError::InvalidFormat {
            message: "unknown partition state",
          })
        }
      };
      partition.set_storage(storage);
    }

    tracing::debug!(
      partitions = volume.partitions().len(),
      allocated = volume.allocated_partitions(),
      "loaded volume"
    );
    Ok(volume)
  }

  /// Serialize into a file, replacing it if present.
  pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    self.serialize(&mut writer)?;
    writer.flush()?;
    Ok(())
  }

  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let mut reader = BufReader::new(File::open(path)?);
    Self::load(&mut reader)
  }
}

#[cfg(test)]
#[path = "io_test.rs"]
mod io_test;
