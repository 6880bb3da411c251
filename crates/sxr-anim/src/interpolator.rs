//! Crossfade of a skeleton's current pose from an input pose

use std::sync::Arc;

use crate::animator::Animation;
use crate::error::{AnimError, Result};
use crate::interpolation::Lerp;
use crate::pose::Pose;
use crate::skeleton::Skeleton;

/// Where the blend starts from
#[derive(Debug, Clone)]
pub enum BlendInput {
    /// A fixed pose, usually a snapshot taken when the blend begins
    Pose(Pose),
    /// The current pose of another skeleton, read every frame
    Skeleton(Arc<Skeleton>),
}

impl BlendInput {
    fn pose(&self) -> Pose {
        match self {
            Self::Pose(pose) => pose.clone(),
            Self::Skeleton(skeleton) => skeleton.pose(),
        }
    }

    fn num_bones(&self) -> usize {
        match self {
            Self::Pose(pose) => pose.num_bones(),
            Self::Skeleton(skeleton) => skeleton.num_bones(),
        }
    }
}

/// Blends the target's current pose from an input pose over `duration`
///
/// At normalized time `t` every bone gets the input rotation slerped towards
/// the current rotation and the input position lerped towards the current
/// position. Scale is taken from the input unchanged. `t = 0` reproduces the
/// input, `t = 1` leaves the current pose as it is.
#[derive(Debug)]
pub struct PoseInterpolator {
    target: Arc<Skeleton>,
    input: BlendInput,
    duration: f32,
}

impl PoseInterpolator {
    pub fn new(target: Arc<Skeleton>, input: BlendInput, duration: f32) -> Result<Self> {
        if !(duration > 0.0) {
            return Err(AnimError::illegal(format!(
                "blend duration must be positive, got {duration}"
            )));
        }
        let expected = target.num_bones();
        let actual = input.num_bones();
        if actual != expected {
            return Err(AnimError::BoneCountMismatch { expected, actual });
        }
        Ok(Self {
            target,
            input,
            duration,
        })
    }

    /// Blend from a snapshot of the target's own current pose
    pub fn from_current(target: Arc<Skeleton>, duration: f32) -> Result<Self> {
        let snapshot = target.pose();
        Self::new(target, BlendInput::Pose(snapshot), duration)
    }

    pub fn target(&self) -> &Arc<Skeleton> {
        &self.target
    }

    pub fn input(&self) -> &BlendInput {
        &self.input
    }

    /// Blend at normalized time `t`, clamped to `0..=1`
    pub fn blend(&self, t: f32) -> Result<()> {
        let t = t.clamp(0.0, 1.0);
        let input = self.input.pose();
        let count = self.target.num_bones();
        if input.num_bones() != count {
            return Err(AnimError::BoneCountMismatch {
                expected: count,
                actual: input.num_bones(),
            });
        }

        self.target.update_pose(|pose| {
            for k in 0..pose.num_bones() {
                let rotation = Lerp::lerp(&input.local_rotation(k)?, &pose.local_rotation(k)?, t);
                let position = Lerp::lerp(&input.local_position(k)?, &pose.local_position(k)?, t);
                pose.set_local_transform(k, input.local_scale(k)?, rotation, position)?;
            }
            Ok(())
        })?;
        self.target.pose_to_bones()
    }
}

impl Animation for PoseInterpolator {
    fn duration(&self) -> f32 {
        self.duration
    }

    fn animate(&mut self, time: f32) -> Result<()> {
        self.blend(time / self.duration)
    }

    fn driven_skeleton(&self) -> Option<Arc<Skeleton>> {
        Some(Arc::clone(&self.target))
    }
}
