//! Pose synchronization, scene-node round trips and skeleton merging

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use pretty_assertions::assert_eq;
use sxr_anim::{BoneOptions, PoseSpace, SceneNode, Skeleton};
use test_case::test_case;

use crate::{assert_mat_eq, names};

fn skeleton_from_parents(parents: &[i32]) -> Skeleton {
    let bone_names = (0..parents.len()).map(|i| format!("bone{i}")).collect();
    Skeleton::new(bone_names, parents).unwrap()
}

/// Deterministic, non-trivial local transform for bone `i`
fn wobble(i: usize) -> (Vec3, Quat, Vec3) {
    let f = i as f32;
    (
        Vec3::new(1.0 + 0.1 * f, 1.0, 1.0 - 0.05 * f),
        Quat::from_euler(glam::EulerRot::XYZ, 0.3 * f, -0.2 * f, 0.1),
        Vec3::new(0.1 * f, 0.5, -0.25 * f),
    )
}

#[test_case(&[-1] ; "single bone")]
#[test_case(&[-1, 0, 1, 2, 3] ; "chain")]
#[test_case(&[-1, 0, 0, 0, 1, 2, 3] ; "fan")]
#[test_case(&[-1, 0, 1, 1, 0, 4, -1, 6] ; "two roots")]
fn test_sync_invariant(parents: &[i32]) {
    let skel = skeleton_from_parents(parents);
    let mut pose = skel.new_pose();
    for i in 0..parents.len() {
        let (s, r, t) = wobble(i);
        pose.set_local_transform(i, s, r, t).unwrap();
    }
    pose.sync();

    for (i, &p) in parents.iter().enumerate() {
        let world = pose.world_matrix(i).unwrap();
        let local = pose.local_matrix(i).unwrap();
        if p >= 0 {
            let parent_world = pose.world_matrix(p as usize).unwrap();
            assert_mat_eq(world, parent_world * local);
        } else {
            assert_mat_eq(world, local);
        }
    }
}

#[test]
fn test_sync_after_world_write() {
    let skel = skeleton_from_parents(&[-1, 0, 1]);
    let mut pose = skel.new_pose();
    pose.set_local_position(0, Vec3::new(0.0, 1.0, 0.0)).unwrap();
    pose.set_local_rotation(1, Quat::from_rotation_y(0.7)).unwrap();
    pose.sync();

    let target = Mat4::from_rotation_translation(Quat::from_rotation_z(0.3), Vec3::new(2.0, 0.0, 1.0));
    pose.set_world_matrix(2, target).unwrap();
    pose.sync();

    assert_mat_eq(pose.world_matrix(2).unwrap(), target);
    let parent_world = pose.world_matrix(1).unwrap();
    assert_mat_eq(parent_world * pose.local_matrix(2).unwrap(), target);
}

#[test]
fn test_pose_to_bones_and_back() {
    let skel = skeleton_from_parents(&[-1, 0, 1, 1]);
    let root = SceneNode::new("bone0");
    let b1 = SceneNode::new("bone1");
    root.add_child(Arc::clone(&b1));
    b1.add_child(SceneNode::new("bone2"));
    b1.add_child(SceneNode::new("bone3"));
    assert_eq!(skel.attach_bones(&root), 4);

    let mut pose = skel.new_pose();
    for i in 0..4 {
        let (s, r, t) = wobble(i);
        pose.set_local_transform(i, s, r, t).unwrap();
    }
    skel.set_pose(&pose).unwrap();
    let original: Vec<Mat4> = (0..4).map(|i| skel.pose().local_matrix(i).unwrap()).collect();

    skel.pose_to_bones().unwrap();
    skel.set_pose(&skel.new_pose()).unwrap();
    skel.pose_from_bones().unwrap();

    for (i, m) in original.iter().enumerate() {
        assert_mat_eq(skel.pose().local_matrix(i).unwrap(), *m);
    }
}

#[test_case(&["a", "b", "c"], &[-1, 0, 1], &["c", "d", "e"], &[-1, 0, 1] ; "shared leaf")]
#[test_case(&["a", "b"], &[-1, 0], &["x", "y", "z"], &[-1, 0, 0] ; "disjoint")]
#[test_case(&["a"], &[-1], &["p", "q", "a", "r"], &[-1, 0, 1, 2] ; "shared deep bone")]
#[test_case(&["a", "b", "c"], &[-1, 0, 0], &["c", "b", "a"], &[-1, 0, 1] ; "all shared")]
fn test_merge_keeps_parents_first(
    base_names: &[&str],
    base_parents: &[i32],
    extra_names: &[&str],
    extra_parents: &[i32],
) {
    let base = Skeleton::new(names(base_names), base_parents).unwrap();
    let extra = Skeleton::new(names(extra_names), extra_parents).unwrap();
    let added = base.merge(&extra).unwrap();

    let expected_added = extra_names.iter().filter(|n| !base_names.contains(n)).count();
    assert_eq!(added, expected_added);
    assert_eq!(base.num_bones(), base_names.len() + expected_added);

    for (i, &p) in base.parents().iter().enumerate() {
        assert!(p < i as i32, "bone {i} has parent {p}");
    }
    for name in extra_names {
        assert!(base.bone_index(name).is_some());
    }
    // The current pose follows the new bone count
    assert_eq!(base.pose().num_bones(), base.num_bones());
}

#[test]
fn test_merge_keeps_attached_parent() {
    let base = Skeleton::new(names(&["a"]), &[-1]).unwrap();
    let extra = Skeleton::new(names(&["p", "q", "a", "r"]), &[-1, 0, 1, 2]).unwrap();
    base.merge(&extra).unwrap();
    assert_eq!(base.bone_names(), names(&["a", "p", "q", "r"]));
    // r was a child of a, which exists in the base
    assert_eq!(base.parent(3).unwrap(), Some(0));
    assert_eq!(base.parent(2).unwrap(), Some(1));
}

#[test]
fn test_locked_bone_immunity() {
    let skel = skeleton_from_parents(&[-1, 0, 1, 2]);
    let mut start = skel.new_pose();
    start.set_local_rotation(2, Quat::from_rotation_x(0.25)).unwrap();
    skel.set_pose(&start).unwrap();
    skel.insert_bone_options(2, BoneOptions::LOCKED).unwrap();

    for space in [PoseSpace::RotationOnly, PoseSpace::SkeletonRoot] {
        let mut incoming = skel.new_pose();
        for i in 0..4 {
            let (s, r, t) = wobble(i + 1);
            incoming.set_local_transform(i, s, r, t).unwrap();
        }
        skel.apply_pose(&incoming, space).unwrap();

        let current = skel.pose();
        assert_eq!(current.local_rotation(2).unwrap(), Quat::from_rotation_x(0.25));
        for i in [0, 1, 3] {
            assert_eq!(
                current.local_rotation(i).unwrap(),
                incoming.local_rotation(i).unwrap()
            );
        }
    }
}

#[test]
fn test_skin_matrices_follow_pose() {
    let skel = skeleton_from_parents(&[-1, 0]);
    let mut bind = skel.new_pose();
    bind.set_local_position(1, Vec3::new(0.0, 1.0, 0.0)).unwrap();
    skel.set_bind_pose(&bind).unwrap();

    let mut pose = bind.clone();
    pose.set_local_position(0, Vec3::new(3.0, 0.0, 0.0)).unwrap();
    skel.set_pose(&pose).unwrap();

    let skin = skel.skin_matrices().unwrap();
    assert_eq!(skin.len(), 2);
    for m in skin {
        assert_mat_eq(m, Mat4::from_translation(Vec3::new(3.0, 0.0, 0.0)));
    }
}

#[test]
fn test_bound_covers_world_positions() {
    let skel = skeleton_from_parents(&[-1, 0, 0]);
    let mut pose = skel.new_pose();
    pose.set_local_position(0, Vec3::new(1.0, 1.0, 1.0)).unwrap();
    pose.set_local_position(1, Vec3::new(-2.0, 0.0, 0.0)).unwrap();
    pose.set_local_position(2, Vec3::new(0.0, 0.0, 3.0)).unwrap();
    pose.sync();

    let bound = pose.bound();
    assert_eq!(bound.min, Vec3::new(-1.0, 1.0, 1.0));
    assert_eq!(bound.max, Vec3::new(1.0, 1.0, 4.0));
}
