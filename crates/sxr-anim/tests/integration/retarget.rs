//! Retargeting clips between skeletons

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use glam::{Quat, Vec3};
use sxr_anim::{
    Animation, Animator, BoneChannel, BoneOptions, Keyframe, PoseMapper, SceneNode, Skeleton,
    SkeletonAnimation, Track,
};

use crate::{init_logging, names, three_bone, three_bone_offset};

fn spine_quarter_turn(skeleton: Arc<Skeleton>) -> SkeletonAnimation {
    let mut clip = SkeletonAnimation::new("turn", skeleton, 1.0).unwrap();
    let channel = BoneChannel::new().with_rotation(Track::new(vec![
        Keyframe::new(0.0, Quat::IDENTITY),
        Keyframe::new(1.0, Quat::from_rotation_y(FRAC_PI_2)),
    ]));
    assert!(clip.add_channel("spine", channel).unwrap());
    clip
}

#[test]
fn test_simple_retarget_halfway() {
    let source = three_bone();
    let target = three_bone_offset();

    let mut clip = spine_quarter_turn(Arc::clone(&source));
    let mut mapper = PoseMapper::new(Some(Arc::clone(&source)), Arc::clone(&target), 1.0).unwrap();
    assert_eq!(mapper.make_bone_map().unwrap(), 3);

    clip.animate(0.5).unwrap();
    mapper.map_local_to_target().unwrap();

    let pose = target.pose();
    let spine = pose.local_rotation(1).unwrap();
    let expected = Quat::from_rotation_y(FRAC_PI_2 / 2.0);
    assert!(spine.abs_diff_eq(expected, 1e-6), "{spine:?}");
    assert_eq!(pose.local_rotation(0).unwrap(), Quat::IDENTITY);
    assert_eq!(pose.local_rotation(2).unwrap(), Quat::IDENTITY);

    // Bone offsets of the target survive, the root follows the source root
    assert!((pose.local_position(2).unwrap() - Vec3::new(0.0, 0.5, 0.05)).length() < 1e-6);
    assert_eq!(pose.local_position(0).unwrap(), Vec3::ZERO);
}

#[test]
fn test_animator_drives_clip_then_mapper() {
    let source = three_bone();
    let target = three_bone_offset();
    let root = SceneNode::new("hip");
    let spine = SceneNode::new("spine");
    root.add_child(Arc::clone(&spine));
    target.attach_bones(&root);

    let clip = spine_quarter_turn(Arc::clone(&source));
    let mapper = PoseMapper::new(Some(Arc::clone(&source)), Arc::clone(&target), 1.0).unwrap();
    let mut animator = Animator::new("walk").with_animation(clip).with_animation(mapper);
    assert!(Arc::ptr_eq(&animator.driven_skeleton().unwrap(), &source));

    animator.start();
    animator.animate(0.5).unwrap();

    let expected = Quat::from_rotation_y(FRAC_PI_2 / 2.0);
    assert!(target.pose().local_rotation(1).unwrap().abs_diff_eq(expected, 1e-6));
    assert_eq!(spine.local_matrix(), target.pose().local_matrix(1).unwrap());
    assert!(target.bone_options(1).unwrap().contains(BoneOptions::ANIMATED));
}

#[test]
fn test_identity_retarget_is_exact() {
    let source = Arc::new(
        Skeleton::new(
            names(&["root", "pelvis", "spine", "neck", "head", "arm_l", "arm_r"]),
            &[-1, 0, 1, 2, 3, 2, 2],
        )
        .unwrap(),
    );
    source
        .update_pose(|pose| {
            for i in 0..pose.num_bones() {
                let f = i as f32 + 1.0;
                let q = Quat::from_axis_angle(Vec3::new(f, 1.0, -0.5 * f).normalize(), 0.37 * f);
                pose.set_local_rotation(i, q)?;
                pose.set_local_position(i, Vec3::new(0.0, 0.1 * f, 0.0))?;
            }
            Ok(())
        })
        .unwrap();

    let target = Arc::new(Skeleton::from_description(&source.description()).unwrap());
    let mut mapper = PoseMapper::new(Some(Arc::clone(&source)), Arc::clone(&target), 1.0).unwrap();
    mapper.map_local_to_target().unwrap();

    let (src, dst) = (source.pose(), target.pose());
    for i in 0..src.num_bones() {
        assert_eq!(dst.local_rotation(i).unwrap(), src.local_rotation(i).unwrap());
    }
}

#[test]
fn test_text_map_between_rigs() {
    init_logging();
    let source = Arc::new(
        Skeleton::new(names(&["Hips", "Spine1", "Spine2", "Head"]), &[-1, 0, 1, 2]).unwrap(),
    );
    let target = three_bone();
    source
        .update_pose(|pose| {
            pose.set_local_rotation(2, Quat::from_rotation_x(0.6))?;
            pose.set_local_rotation(3, Quat::from_rotation_z(0.2))?;
            pose.set_local_position(0, Vec3::new(0.0, 100.0, 0.0))
        })
        .unwrap();

    let mut mapper = PoseMapper::new(Some(source), Arc::clone(&target), 1.0).unwrap();
    mapper.set_scale(0.01).unwrap();
    let mapped = mapper
        .set_bone_map_text("Hips hip\nSpine2 spine\nHead head\nSpine1\n")
        .unwrap();
    assert_eq!(mapped, 3);
    mapper.animate(0.0).unwrap();

    let pose = target.pose();
    assert_eq!(pose.local_rotation(1).unwrap(), Quat::from_rotation_x(0.6));
    assert_eq!(pose.local_rotation(2).unwrap(), Quat::from_rotation_z(0.2));
    assert!((pose.local_position(0).unwrap() - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-5);
}
