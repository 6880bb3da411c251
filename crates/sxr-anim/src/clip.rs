//! Keyframed skeleton animation clips

use std::sync::Arc;

use glam::{Quat, Vec3};

use crate::animator::Animation;
use crate::error::{AnimError, Result};
use crate::interpolation::Track;
use crate::pose::Pose;
use crate::skeleton::{BoneOptions, PoseSpace, Skeleton};

/// Rotation, position and scale tracks of one bone
///
/// Empty tracks leave the matching component of the bone untouched.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct BoneChannel {
    pub rotation: Track<Quat>,
    pub position: Track<Vec3>,
    pub scale: Track<Vec3>,
}

impl BoneChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rotation(mut self, track: Track<Quat>) -> Self {
        self.rotation = track;
        self
    }

    pub fn with_position(mut self, track: Track<Vec3>) -> Self {
        self.position = track;
        self
    }

    pub fn with_scale(mut self, track: Track<Vec3>) -> Self {
        self.scale = track;
        self
    }

    /// Time of the last keyframe on any track
    pub fn end_time(&self) -> f32 {
        self.rotation
            .end_time()
            .max(self.position.end_time())
            .max(self.scale.end_time())
    }

    fn apply(&self, pose: &mut Pose, index: usize, time: f32) -> Result<()> {
        if let Some(q) = self.rotation.sample(time) {
            pose.set_local_rotation(index, q)?;
        }
        if let Some(p) = self.position.sample(time) {
            pose.set_local_position(index, p)?;
        }
        if let Some(s) = self.scale.sample(time) {
            pose.set_local_scale(index, s)?;
        }
        Ok(())
    }
}

/// Animation clip driving the current pose of one skeleton
///
/// Bones with a channel are flagged [`BoneOptions::ANIMATED`]. Locked bones
/// keep their transforms because the result goes through
/// [`Skeleton::apply_pose`].
#[derive(Debug)]
pub struct SkeletonAnimation {
    name: String,
    skeleton: Arc<Skeleton>,
    channels: Vec<(usize, BoneChannel)>,
    duration: f32,
}

impl SkeletonAnimation {
    pub fn new(name: impl Into<String>, skeleton: Arc<Skeleton>, duration: f32) -> Result<Self> {
        if !(duration > 0.0) {
            return Err(AnimError::illegal(format!(
                "animation duration must be positive, got {duration}"
            )));
        }
        Ok(Self {
            name: name.into(),
            skeleton,
            channels: Vec::new(),
            duration,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    /// Add a channel for the named bone
    ///
    /// Returns `false` and ignores the channel when the skeleton has no such
    /// bone.
    pub fn add_channel(&mut self, bone_name: &str, channel: BoneChannel) -> Result<bool> {
        let Some(index) = self.skeleton.bone_index(bone_name) else {
            log::debug!(
                "Animation '{}': skipping channel for unknown bone '{bone_name}'",
                self.name
            );
            return Ok(false);
        };
        self.add_channel_at(index, channel)?;
        Ok(true)
    }

    /// Add a channel for the bone at `index`, replacing an existing one
    pub fn add_channel_at(&mut self, index: usize, channel: BoneChannel) -> Result<()> {
        self.skeleton
            .insert_bone_options(index, BoneOptions::ANIMATED)?;
        if let Some(slot) = self.channels.iter_mut().find(|(i, _)| *i == index) {
            slot.1 = channel;
        } else {
            self.channels.push((index, channel));
        }
        Ok(())
    }

    pub fn channel(&self, index: usize) -> Option<&BoneChannel> {
        self.channels
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, c)| c)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Pose of the skeleton at `time`, starting from its current pose
    pub fn compute_pose(&self, time: f32) -> Result<Pose> {
        let mut pose = self.skeleton.pose();
        for (index, channel) in &self.channels {
            channel.apply(&mut pose, *index, time)?;
        }
        pose.sync();
        Ok(pose)
    }
}

impl Animation for SkeletonAnimation {
    fn duration(&self) -> f32 {
        self.duration
    }

    fn animate(&mut self, time: f32) -> Result<()> {
        let pose = self.compute_pose(time)?;
        self.skeleton.apply_pose(&pose, PoseSpace::SkeletonRoot)?;
        self.skeleton.pose_to_bones()
    }

    fn driven_skeleton(&self) -> Option<Arc<Skeleton>> {
        Some(Arc::clone(&self.skeleton))
    }
}
