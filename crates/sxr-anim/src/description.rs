//! Serializable skeleton description
//!
//! The interchange form used to import skeletons built elsewhere (asset
//! converters, native rigs) and to export them again. Matrices are row-major.

use crate::skeleton::BoneOptions;

/// Row-major identity, the default local transform of a described bone
pub const IDENTITY_ROW_MAJOR: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0, //
];

#[cfg(feature = "serde-support")]
fn identity() -> [f32; 16] {
    IDENTITY_ROW_MAJOR
}

/// One bone: name, parent index (-1 for roots), options and bind transform
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct BoneDescription {
    pub name: String,
    pub parent: i32,
    #[cfg_attr(feature = "serde-support", serde(default))]
    pub options: BoneOptions,
    #[cfg_attr(feature = "serde-support", serde(default = "identity"))]
    pub local: [f32; 16],
}

impl BoneDescription {
    /// Bone with identity bind transform and no options
    pub fn new(name: impl Into<String>, parent: i32) -> Self {
        Self {
            name: name.into(),
            parent,
            options: BoneOptions::empty(),
            local: IDENTITY_ROW_MAJOR,
        }
    }
}

/// Bones in storage order, parents before children
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct SkeletonDescription {
    pub bones: Vec<BoneDescription>,
}
