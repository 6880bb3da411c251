//! Skeletal animation core
//!
//! This crate provides the pose and skeleton model of the SXR scene graph and
//! the animations built on top of it:
//! - Per-bone local/world pose storage with hierarchy synchronization
//! - Skeletons with bone options, bind pose, scene-node binding and merging
//! - Keyframed skeleton clips
//! - Retargeting between differently shaped skeletons through bone maps
//! - Pose crossfades and an animation queue with repeat modes
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sxr_anim::{Animation, PoseMapper, Skeleton};
//! use glam::Quat;
//!
//! let names = || vec!["hip".to_string(), "spine".to_string(), "head".to_string()];
//! let source = Arc::new(Skeleton::new(names(), &[-1, 0, 1])?);
//! let target = Arc::new(Skeleton::new(names(), &[-1, 0, 1])?);
//!
//! source.update_pose(|pose| pose.set_local_rotation(1, Quat::from_rotation_y(0.5)))?;
//!
//! let mut mapper = PoseMapper::new(Some(source), Arc::clone(&target), 1.0)?;
//! mapper.animate(0.0)?;
//! assert_eq!(target.pose().local_rotation(1)?, Quat::from_rotation_y(0.5));
//! # Ok::<(), sxr_anim::AnimError>(())
//! ```

pub mod animator;
pub mod clip;
pub mod description;
pub mod error;
pub mod interpolation;
pub mod interpolator;
pub mod mapper;
pub mod pose;
pub mod queue;
pub mod scene;
pub mod skeleton;

// Re-export common types
pub use animator::{Animation, Animator};
pub use clip::{BoneChannel, SkeletonAnimation};
pub use description::{BoneDescription, SkeletonDescription};
pub use error::{AnimError, Result};
pub use interpolation::{Interpolation, Keyframe, Lerp, Track};
pub use interpolator::{BlendInput, PoseInterpolator};
pub use mapper::{BoneMap, PoseMapper, derive_bone_map, format_bone_map, parse_bone_map};
pub use pose::{Bounds, Pose};
pub use queue::{AnimationQueue, PoseBlender, QueueListener, RepeatMode};
pub use scene::SceneNode;
pub use skeleton::{BoneOptions, PoseSpace, Skeleton, SkeletonId};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
