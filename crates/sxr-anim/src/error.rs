use thiserror::Error;

/// Error types for pose, skeleton and animation operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnimError {
    /// Bone, animation or entry index outside the valid range
    #[error("Index out of range: {index} (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Invalid configuration value passed by the caller
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    /// A pose was applied to a skeleton other than the one it belongs to
    #[error("Pose belongs to skeleton {pose_skeleton}, not skeleton {skeleton}")]
    SkeletonMismatch { pose_skeleton: u64, skeleton: u64 },

    /// Two poses or skeletons disagree on the number of bones
    #[error("Bone count mismatch: expected {expected}, got {actual}")]
    BoneCountMismatch { expected: usize, actual: usize },

    /// A parent index does not precede its child
    #[error("Invalid hierarchy: bone {bone} has parent {parent}")]
    InvalidHierarchy { bone: usize, parent: i32 },

    /// Internal error: an invariant of the library itself was violated
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnimError {
    pub(crate) fn illegal(msg: impl Into<String>) -> Self {
        Self::IllegalArgument(msg.into())
    }
}

/// Result type using AnimError
pub type Result<T> = std::result::Result<T, AnimError>;
