//! Integration tests for the animation core

mod blending;
mod hierarchy;
mod retarget;
mod sequencing;

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use sxr_anim::{BoneDescription, Skeleton, SkeletonDescription};

pub const EPSILON: f32 = 1e-5;

/// Route library logs through the test harness; `RUST_LOG=debug` shows them
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

/// hip -> spine -> head with identity bind pose
pub fn three_bone() -> Arc<Skeleton> {
    Arc::new(Skeleton::new(names(&["hip", "spine", "head"]), &[-1, 0, 1]).unwrap())
}

/// Same bone names as [`three_bone`] with offset and rotated bind transforms
pub fn three_bone_offset() -> Arc<Skeleton> {
    let mut hip = BoneDescription::new("hip", -1);
    hip.local = row_major(Mat4::from_translation(Vec3::new(0.0, 0.9, 0.0)));
    let mut spine = BoneDescription::new("spine", 0);
    spine.local = row_major(Mat4::from_rotation_translation(
        Quat::from_rotation_x(0.2),
        Vec3::new(0.0, 0.3, 0.0),
    ));
    let mut head = BoneDescription::new("head", 1);
    head.local = row_major(Mat4::from_rotation_translation(
        Quat::from_rotation_z(-0.4),
        Vec3::new(0.0, 0.5, 0.05),
    ));
    let desc = SkeletonDescription {
        bones: vec![hip, spine, head],
    };
    Arc::new(Skeleton::from_description(&desc).unwrap())
}

pub fn row_major(m: Mat4) -> [f32; 16] {
    m.transpose().to_cols_array()
}

pub fn assert_mat_eq(a: Mat4, b: Mat4) {
    let (a, b) = (a.to_cols_array(), b.to_cols_array());
    for (x, y) in a.iter().zip(&b) {
        assert!((x - y).abs() < EPSILON, "{a:?} != {b:?}");
    }
}
