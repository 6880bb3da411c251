//! Per-bone transform storage for one skeleton
//!
//! A [`Pose`] holds a local and a world transform for every bone of the
//! skeleton that created it. Local transforms are relative to the parent bone,
//! world transforms are relative to the skeleton root. Writes mark bones stale
//! and [`Pose::sync`] brings the two sides back in agreement, walking bones in
//! index order so parents are always resolved before their children.
//!
//! Local rotation, position and scale are kept decomposed next to the composed
//! matrix. Reading back a component that was written through a component
//! setter returns exactly the written value.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};

use crate::error::{AnimError, Result};
use crate::skeleton::SkeletonId;

/// Which side of a bone transform needs recomputing on the next sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stale {
    None,
    /// Local transform was written, world must be recomposed
    World,
    /// World transform was written, local must be derived from the parent
    Local,
}

/// Transform snapshot of a single bone
#[derive(Debug, Clone, Copy, PartialEq)]
struct BonePose {
    rotation: Quat,
    position: Vec3,
    scale: Vec3,
    local: Mat4,
    world: Mat4,
    stale: Stale,
}

impl BonePose {
    const IDENTITY: Self = Self {
        rotation: Quat::IDENTITY,
        position: Vec3::ZERO,
        scale: Vec3::ONE,
        local: Mat4::IDENTITY,
        world: Mat4::IDENTITY,
        stale: Stale::None,
    };

    fn set_local(&mut self, m: Mat4) {
        let (scale, rotation, position) = m.to_scale_rotation_translation();
        self.scale = scale;
        self.rotation = rotation;
        self.position = position;
        self.local = m;
        self.stale = Stale::World;
    }

    fn recompose(&mut self) {
        self.local = Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position);
        self.stale = Stale::World;
    }
}

/// Axis-aligned box enclosing the world positions of all bones
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    /// Edge lengths of the box
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Local and world transforms for every bone of one skeleton
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    skeleton: SkeletonId,
    parents: Arc<[i32]>,
    bones: Vec<BonePose>,
}

impl Pose {
    /// Create an identity pose for the skeleton with the given id and parent table
    pub(crate) fn new(skeleton: SkeletonId, parents: Arc<[i32]>) -> Self {
        let bones = vec![BonePose::IDENTITY; parents.len()];
        Self {
            skeleton,
            parents,
            bones,
        }
    }

    /// Identity of the skeleton this pose belongs to
    pub fn skeleton_id(&self) -> SkeletonId {
        self.skeleton
    }

    /// Number of bones in the pose
    pub fn num_bones(&self) -> usize {
        self.bones.len()
    }

    /// Parent index of a bone, `None` for roots
    pub fn parent(&self, index: usize) -> Result<Option<usize>> {
        self.check_index(index)?;
        let parent = self.parents[index];
        Ok((parent >= 0).then_some(parent as usize))
    }

    pub(crate) fn parents(&self) -> &Arc<[i32]> {
        &self.parents
    }

    /// Same bones under a longer parent table, new bones start at identity
    pub(crate) fn extended(&self, parents: Arc<[i32]>) -> Self {
        let mut bones = self.bones.clone();
        bones.resize(parents.len(), BonePose::IDENTITY);
        Self {
            skeleton: self.skeleton,
            parents,
            bones,
        }
    }

    /// Copy the local transform of one bone from another pose
    pub(crate) fn copy_local_from(
        &mut self,
        index: usize,
        src: &Self,
        src_index: usize,
    ) -> Result<()> {
        let from = *src.bone(src_index)?;
        let bone = self.bone_mut(index)?;
        bone.scale = from.scale;
        bone.rotation = from.rotation;
        bone.position = from.position;
        bone.local = from.local;
        bone.stale = Stale::World;
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.bones.len() {
            Ok(())
        } else {
            Err(AnimError::IndexOutOfRange {
                index,
                len: self.bones.len(),
            })
        }
    }

    fn bone(&self, index: usize) -> Result<&BonePose> {
        self.check_index(index)?;
        Ok(&self.bones[index])
    }

    fn bone_mut(&mut self, index: usize) -> Result<&mut BonePose> {
        self.check_index(index)?;
        Ok(&mut self.bones[index])
    }

    /// Parent-relative transform of a bone
    pub fn local_matrix(&self, index: usize) -> Result<Mat4> {
        Ok(self.bone(index)?.local)
    }

    /// Replace the parent-relative transform of a bone
    pub fn set_local_matrix(&mut self, index: usize, m: Mat4) -> Result<()> {
        self.bone_mut(index)?.set_local(m);
        Ok(())
    }

    /// Local rotation of a bone
    pub fn local_rotation(&self, index: usize) -> Result<Quat> {
        Ok(self.bone(index)?.rotation)
    }

    pub fn set_local_rotation(&mut self, index: usize, rotation: Quat) -> Result<()> {
        let bone = self.bone_mut(index)?;
        bone.rotation = rotation;
        bone.recompose();
        Ok(())
    }

    /// Local position of a bone
    pub fn local_position(&self, index: usize) -> Result<Vec3> {
        Ok(self.bone(index)?.position)
    }

    pub fn set_local_position(&mut self, index: usize, position: Vec3) -> Result<()> {
        let bone = self.bone_mut(index)?;
        bone.position = position;
        bone.recompose();
        Ok(())
    }

    /// Local scale of a bone
    pub fn local_scale(&self, index: usize) -> Result<Vec3> {
        Ok(self.bone(index)?.scale)
    }

    pub fn set_local_scale(&mut self, index: usize, scale: Vec3) -> Result<()> {
        let bone = self.bone_mut(index)?;
        bone.scale = scale;
        bone.recompose();
        Ok(())
    }

    /// Set scale, rotation and position of a bone in one step
    pub fn set_local_transform(
        &mut self,
        index: usize,
        scale: Vec3,
        rotation: Quat,
        position: Vec3,
    ) -> Result<()> {
        let bone = self.bone_mut(index)?;
        bone.scale = scale;
        bone.rotation = rotation;
        bone.position = position;
        bone.recompose();
        Ok(())
    }

    /// Skeleton-root-relative transform of a bone
    ///
    /// Reflects the last [`sync`](Self::sync); writes made since then are not
    /// visible here until the pose is synced again.
    pub fn world_matrix(&self, index: usize) -> Result<Mat4> {
        Ok(self.bone(index)?.world)
    }

    /// Replace the skeleton-root-relative transform of a bone
    ///
    /// The local transform is derived from the parent on the next sync.
    pub fn set_world_matrix(&mut self, index: usize, m: Mat4) -> Result<()> {
        let bone = self.bone_mut(index)?;
        bone.world = m;
        bone.stale = Stale::Local;
        Ok(())
    }

    pub fn world_position(&self, index: usize) -> Result<Vec3> {
        Ok(self.bone(index)?.world.w_axis.truncate())
    }

    pub fn world_rotation(&self, index: usize) -> Result<Quat> {
        let (_, rotation, _) = self.bone(index)?.world.to_scale_rotation_translation();
        Ok(rotation)
    }

    /// Whether any bone was written since the last sync
    pub fn needs_sync(&self) -> bool {
        self.bones.iter().any(|b| b.stale != Stale::None)
    }

    /// Recompute stale transforms top-down and clear change flags
    ///
    /// Bones whose world matrix was written get `local = parent_world⁻¹ · world`,
    /// every other bone gets `world = parent_world · local`, so changes to a
    /// parent always reach its descendants.
    pub fn sync(&mut self) {
        for i in 0..self.bones.len() {
            let parent = self.parents[i];
            let parent_world = if parent >= 0 {
                self.bones[parent as usize].world
            } else {
                Mat4::IDENTITY
            };

            let bone = &mut self.bones[i];
            if bone.stale == Stale::Local {
                let local = parent_world.inverse() * bone.world;
                bone.set_local(local);
            } else {
                bone.world = parent_world * bone.local;
            }
            bone.stale = Stale::None;
        }
    }

    /// Bounding box over the world positions of all bones
    pub fn bound(&self) -> Bounds {
        let mut iter = self.bones.iter().map(|b| b.world.w_axis.truncate());
        let Some(first) = iter.next() else {
            return Bounds {
                min: Vec3::ZERO,
                max: Vec3::ZERO,
            };
        };

        iter.fold(
            Bounds {
                min: first,
                max: first,
            },
            |acc, p| Bounds {
                min: acc.min.min(p),
                max: acc.max.max(p),
            },
        )
    }

    /// Copy every bone transform from another pose with the same bone count
    pub fn copy_from(&mut self, other: &Self) -> Result<()> {
        if other.num_bones() != self.num_bones() {
            return Err(AnimError::BoneCountMismatch {
                expected: self.num_bones(),
                actual: other.num_bones(),
            });
        }
        self.bones.copy_from_slice(&other.bones);
        Ok(())
    }

    /// Reset every local rotation to identity
    pub fn clear_rotations(&mut self) {
        for bone in &mut self.bones {
            bone.rotation = Quat::IDENTITY;
            bone.recompose();
        }
    }

    /// All local matrices, row-major, 16 floats per bone
    pub fn local_matrices(&self) -> Vec<f32> {
        Self::flatten(self.bones.iter().map(|b| b.local))
    }

    /// All world matrices, row-major, 16 floats per bone
    pub fn world_matrices(&self) -> Vec<f32> {
        Self::flatten(self.bones.iter().map(|b| b.world))
    }

    fn flatten(matrices: impl Iterator<Item = Mat4>) -> Vec<f32> {
        let mut data = Vec::new();
        for m in matrices {
            data.extend_from_slice(&m.transpose().to_cols_array());
        }
        data
    }

    /// Replace all local matrices from a row-major buffer, 16 floats per bone
    pub fn set_local_matrices(&mut self, data: &[f32]) -> Result<()> {
        let expected = self.bones.len() * 16;
        if data.len() != expected {
            return Err(AnimError::illegal(format!(
                "expected {expected} floats for {} bones, got {}",
                self.bones.len(),
                data.len()
            )));
        }

        for (bone, chunk) in self.bones.iter_mut().zip(data.chunks_exact(16)) {
            bone.set_local(Mat4::from_cols_slice(chunk).transpose());
        }
        Ok(())
    }

    /// Invert every world matrix in place
    pub fn inverse(&mut self) {
        for bone in &mut self.bones {
            bone.world = bone.world.inverse();
        }
    }

    /// Post-multiply every world matrix by the matching world matrix of `other`
    pub fn combine(&mut self, other: &Self) -> Result<()> {
        if other.num_bones() != self.num_bones() {
            return Err(AnimError::BoneCountMismatch {
                expected: self.num_bones(),
                actual: other.num_bones(),
            });
        }
        for (bone, rhs) in self.bones.iter_mut().zip(&other.bones) {
            bone.world *= rhs.world;
        }
        Ok(())
    }
}
