//! Crossfades between clips, standalone and driven by the queue

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use glam::{Quat, Vec3};
use sxr_anim::{
    Animation, AnimationQueue, Animator, BlendInput, BoneChannel, Keyframe, PoseBlender,
    PoseInterpolator, RepeatMode, Skeleton, SkeletonAnimation, Track,
};

use crate::{init_logging, three_bone_offset};

/// Clip holding the spine at a fixed rotation
fn hold_spine(name: &str, skeleton: &Arc<Skeleton>, rotation: Quat) -> Animator {
    let mut clip = SkeletonAnimation::new(name, Arc::clone(skeleton), 1.0).unwrap();
    let channel =
        BoneChannel::new().with_rotation(Track::new(vec![Keyframe::new(0.0, rotation)]));
    clip.add_channel("spine", channel).unwrap();
    Animator::new(name).with_animation(clip)
}

#[test]
fn test_interpolator_boundaries() {
    let target = three_bone_offset();
    let mut input = target.new_pose();
    for i in 0..3 {
        input
            .set_local_rotation(i, Quat::from_rotation_z(0.1 * i as f32))
            .unwrap();
        input
            .set_local_position(i, Vec3::new(i as f32, 0.0, 0.0))
            .unwrap();
    }
    let current = target.pose();
    let mut blend =
        PoseInterpolator::new(Arc::clone(&target), BlendInput::Pose(input.clone()), 0.3).unwrap();

    blend.animate(0.0).unwrap();
    let start = target.pose();
    for i in 0..3 {
        assert_eq!(start.local_rotation(i).unwrap(), input.local_rotation(i).unwrap());
        assert_eq!(start.local_position(i).unwrap(), input.local_position(i).unwrap());
    }

    // Restore the clip output, as the incoming clip would every frame
    target.set_pose(&current).unwrap();
    blend.animate(0.3).unwrap();
    let end = target.pose();
    for i in 0..3 {
        assert_eq!(end.local_rotation(i).unwrap(), current.local_rotation(i).unwrap());
        assert_eq!(end.local_position(i).unwrap(), current.local_position(i).unwrap());
    }
}

#[test]
fn test_queue_crossfades_clips() {
    let skeleton = three_bone_offset();
    let from = Quat::from_rotation_y(FRAC_PI_2);
    let to = Quat::from_rotation_x(FRAC_PI_2);

    let mut queue = AnimationQueue::new();
    queue.add(hold_spine("idle", &skeleton, from));
    queue.add(hold_spine("wave", &skeleton, to));
    queue.set_listener(Box::new(PoseBlender::new()));
    queue.set_blend_factor(0.5).unwrap();
    queue.start_all(RepeatMode::Once);

    queue.animate(0.75).unwrap();
    assert_eq!(skeleton.pose().local_rotation(1).unwrap(), from);
    assert!(queue.is_blending(1));
    assert!(queue.get(1).unwrap().is_running());

    queue.animate(0.125).unwrap();
    let spine = skeleton.pose().local_rotation(1).unwrap();
    assert!(spine.abs_diff_eq(from.slerp(to, 0.25), 1e-5), "{spine:?}");

    queue.animate(0.125).unwrap();
    assert_eq!(queue.current().unwrap().name(), "wave");
    let spine = skeleton.pose().local_rotation(1).unwrap();
    assert!(spine.abs_diff_eq(from.slerp(to, 0.5), 1e-5), "{spine:?}");

    queue.animate(0.25).unwrap();
    assert!(!queue.is_blending(1));
    assert_eq!(skeleton.pose().local_rotation(1).unwrap(), to);

    queue.animate(0.5).unwrap();
    assert!(!queue.is_running());
}

#[test]
fn test_repeated_wrap_crossfades_into_first_clip() {
    init_logging();
    let skeleton = three_bone_offset();
    let idle = Quat::from_rotation_y(FRAC_PI_2);
    let wave = Quat::from_rotation_x(FRAC_PI_2);

    let mut queue = AnimationQueue::new();
    queue.add(hold_spine("idle", &skeleton, idle));
    queue.add(hold_spine("wave", &skeleton, wave));
    queue.set_listener(Box::new(PoseBlender::new()));
    queue.set_blend_factor(0.5).unwrap();
    queue.start_all(RepeatMode::Repeated);

    queue.animate(1.0).unwrap();
    assert_eq!(queue.current().unwrap().name(), "wave");

    // wave has 0.25s left, idle wraps around and starts early
    queue.animate(0.75).unwrap();
    assert_eq!(skeleton.pose().local_rotation(1).unwrap(), wave);
    assert!(queue.is_blending(0));
    assert!(queue.get(0).unwrap().is_running());

    queue.animate(0.125).unwrap();
    let spine = skeleton.pose().local_rotation(1).unwrap();
    assert!(spine.abs_diff_eq(wave.slerp(idle, 0.25), 1e-5), "{spine:?}");

    queue.animate(0.125).unwrap();
    assert_eq!(queue.current().unwrap().name(), "idle");
    let spine = skeleton.pose().local_rotation(1).unwrap();
    assert!(spine.abs_diff_eq(wave.slerp(idle, 0.5), 1e-5), "{spine:?}");

    queue.animate(0.25).unwrap();
    assert!(!queue.is_blending(0));
    assert_eq!(skeleton.pose().local_rotation(1).unwrap(), idle);
}

#[test]
fn test_pingpong_backward_crossfades_into_previous_clip() {
    init_logging();
    let skeleton = three_bone_offset();
    let idle = Quat::from_rotation_y(FRAC_PI_2);
    let wave = Quat::from_rotation_x(FRAC_PI_2);

    let mut queue = AnimationQueue::new();
    queue.add(hold_spine("idle", &skeleton, idle));
    queue.add(hold_spine("wave", &skeleton, wave));
    queue.set_listener(Box::new(PoseBlender::new()));
    queue.set_blend_factor(0.5).unwrap();
    queue.start_all(RepeatMode::PingPong);

    // Forward blend idle -> wave runs out as wave reaches its last 0.5s
    queue.animate(0.75).unwrap();
    queue.animate(0.25).unwrap();
    queue.animate(0.25).unwrap();
    assert_eq!(queue.current().unwrap().name(), "wave");
    assert!(!queue.is_blending(1));

    // Turning around: idle starts early, playing backwards
    assert!(queue.is_blending(0));
    assert!(queue.get(0).unwrap().is_reversed());
    assert_eq!(skeleton.pose().local_rotation(1).unwrap(), wave);

    queue.animate(0.125).unwrap();
    let spine = skeleton.pose().local_rotation(1).unwrap();
    assert!(spine.abs_diff_eq(wave.slerp(idle, 0.25), 1e-5), "{spine:?}");

    queue.animate(0.375).unwrap();
    assert_eq!(queue.current().unwrap().name(), "idle");
    assert!(!queue.is_blending(0));
    assert_eq!(skeleton.pose().local_rotation(1).unwrap(), idle);
}

#[test]
fn test_blender_without_skeleton_skips_blend() {
    struct Silent;
    impl Animation for Silent {
        fn duration(&self) -> f32 {
            1.0
        }
        fn animate(&mut self, _time: f32) -> sxr_anim::Result<()> {
            Ok(())
        }
    }

    let mut queue = AnimationQueue::new();
    queue.add(Animator::new("a").with_animation(Silent));
    queue.add(Animator::new("b").with_animation(Silent));
    queue.set_listener(Box::new(PoseBlender::new()));
    queue.set_blend_factor(0.5).unwrap();
    queue.start_all(RepeatMode::Once);

    queue.animate(0.75).unwrap();
    assert!(queue.get(1).unwrap().is_running());
    assert!(!queue.is_blending(1));
}
