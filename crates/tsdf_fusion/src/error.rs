//! Error types for volume construction, persistence and sampling.

use thiserror::Error;

/// Errors returned by fallible volume and sensor operations.
#[derive(Debug, Error)]
pub enum TsdfError {
  /// A configuration value is out of its valid range.
  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  /// A pose matrix could not be inverted.
  #[error("pose matrix is singular (determinant {determinant})")]
  SingularPose { determinant: f64 },

  /// I/O failure while saving or loading a volume.
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  /// TOML configuration could not be parsed.
  #[error("failed to parse configuration: {0}")]
  Toml(#[from] toml::de::Error),

  /// Persisted data does not follow the volume file format.
  #[error("invalid file format: {message}")]
  InvalidFormat { message: &'static str },

  /// Persisted data describes a different layout than expected.
  #[error("layout mismatch: expected {expected} cells, got {got}")]
  LayoutMismatch { expected: usize, got: usize },
}

/// Result type alias for fallible crate operations.
pub type Result<T> = std::result::Result<T, TsdfError>;

/// Outcome of a failed interpolation query.
///
/// A successful query is `Ok(value)`; each variant here is a distinct status
/// the caller must handle explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum InterpolateError {
  /// Coordinate lies outside the volume's bounding box.
  #[error("coordinate outside volume bounds")]
  InvalidIndex,

  /// Owning partition has no allocated cells.
  #[error("partition is not initialized")]
  EmptyPartition,

  /// A contributing cell has never been observed.
  #[error("interpolation touched an unseen cell")]
  IsNan,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_display() {
    let err = TsdfError::InvalidConfig("voxel size must be positive".into());
    assert_eq!(
      err.to_string(),
      "invalid configuration: voxel size must be positive"
    );

    let err = TsdfError::LayoutMismatch {
      expected: 32,
      got: 64,
    };
    assert!(err.to_string().contains("32"));
    assert!(err.to_string().contains("64"));
  }

  #[test]
  fn test_io_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
    let err: TsdfError = io.into();
    assert!(matches!(err, TsdfError::Io(_)));
  }

  #[test]
  fn test_interpolate_statuses_are_distinct() {
    assert_ne!(InterpolateError::InvalidIndex, InterpolateError::EmptyPartition);
    assert_ne!(InterpolateError::EmptyPartition, InterpolateError::IsNan);
    assert_ne!(InterpolateError::IsNan, InterpolateError::InvalidIndex);
  }
}
