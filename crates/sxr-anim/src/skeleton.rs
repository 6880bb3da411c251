//! Bone hierarchy owning the current pose
//!
//! A [`Skeleton`] stores per-bone metadata (names, parent indices, option
//! bits), the bind pose and a single mutable current pose. Skeletons are
//! shared between animations, retargeters and the loading code as
//! `Arc<Skeleton>`; all mutable state sits behind one lock per skeleton and
//! every public operation holds it for the duration of the call only.
//!
//! Parent indices always precede their children. This is checked when a
//! skeleton is built and preserved by [`Skeleton::merge`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use glam::Mat4;
use parking_lot::Mutex;

use crate::description::{BoneDescription, SkeletonDescription};
use crate::error::{AnimError, Result};
use crate::pose::Pose;
use crate::scene::SceneNode;

static NEXT_SKELETON_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a skeleton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SkeletonId(u64);

impl SkeletonId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SKELETON_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SkeletonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags::bitflags! {
    /// Per-bone options controlling who drives a bone
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
    pub struct BoneOptions: u32 {
        /// Bone is driven by animation
        const ANIMATED = 0x1;
        /// Bone is driven by physics
        const PHYSICS = 0x2;
        /// Bone ignores incoming pose updates
        const LOCKED = 0x4;
    }
}

/// How [`Skeleton::apply_pose`] merges an incoming pose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum PoseSpace {
    /// Copy local rotations of every bone and the root bone's position
    RotationOnly,
    /// Copy full local transforms of every bone
    SkeletonRoot,
}

#[derive(Debug)]
struct SkeletonState {
    names: Vec<String>,
    parents: Arc<[i32]>,
    options: Vec<BoneOptions>,
    nodes: Vec<Option<Arc<SceneNode>>>,
    pose: Pose,
    bind_pose: Pose,
}

impl SkeletonState {
    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.names.len() {
            Ok(())
        } else {
            Err(AnimError::IndexOutOfRange {
                index,
                len: self.names.len(),
            })
        }
    }

    fn is_locked(&self, index: usize) -> bool {
        self.options[index].contains(BoneOptions::LOCKED)
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// Check that every parent index is -1 or refers to an earlier bone
pub fn validate_hierarchy(parents: &[i32]) -> Result<()> {
    for (bone, &parent) in parents.iter().enumerate() {
        if parent < -1 || (parent >= 0 && parent as usize >= bone) {
            return Err(AnimError::InvalidHierarchy { bone, parent });
        }
    }
    Ok(())
}

fn validate_names(names: &[String]) -> Result<()> {
    let mut seen = HashMap::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        if let Some(first) = seen.insert(name.as_str(), i) {
            return Err(AnimError::illegal(format!(
                "bone name '{name}' used by bones {first} and {i}"
            )));
        }
    }
    Ok(())
}

/// Hierarchy of named bones with a current and a bind pose
#[derive(Debug)]
pub struct Skeleton {
    id: SkeletonId,
    enabled: AtomicBool,
    state: Mutex<SkeletonState>,
}

impl Skeleton {
    /// Create a skeleton from bone names and parent indices
    ///
    /// Both poses start at identity. Fails if the arrays differ in length,
    /// are empty, contain duplicate names, or a parent does not precede its
    /// child.
    pub fn new(names: Vec<String>, parents: &[i32]) -> Result<Self> {
        if names.len() != parents.len() {
            return Err(AnimError::BoneCountMismatch {
                expected: parents.len(),
                actual: names.len(),
            });
        }
        if parents.is_empty() {
            return Err(AnimError::illegal("skeleton needs at least one bone"));
        }
        validate_hierarchy(parents)?;
        validate_names(&names)?;

        let id = SkeletonId::next();
        let parents: Arc<[i32]> = Arc::from(parents);
        let count = parents.len();
        log::trace!("Creating skeleton {id} with {count} bones");

        Ok(Self {
            id,
            enabled: AtomicBool::new(true),
            state: Mutex::new(SkeletonState {
                names,
                options: vec![BoneOptions::empty(); count],
                nodes: vec![None; count],
                pose: Pose::new(id, Arc::clone(&parents)),
                bind_pose: Pose::new(id, Arc::clone(&parents)),
                parents,
            }),
        })
    }

    /// Build a skeleton from a serialized description
    ///
    /// Local matrices become both the bind pose and the current pose.
    pub fn from_description(desc: &SkeletonDescription) -> Result<Self> {
        let names = desc.bones.iter().map(|b| b.name.clone()).collect();
        let parents: Vec<i32> = desc.bones.iter().map(|b| b.parent).collect();
        let skeleton = Self::new(names, &parents)?;

        let mut data = Vec::with_capacity(desc.bones.len() * 16);
        for bone in &desc.bones {
            data.extend_from_slice(&bone.local);
        }

        {
            let mut state = skeleton.state.lock();
            for (i, bone) in desc.bones.iter().enumerate() {
                state.options[i] = bone.options;
            }
            state.bind_pose.set_local_matrices(&data)?;
            state.bind_pose.sync();
            let bind = state.bind_pose.clone();
            state.pose.copy_from(&bind)?;
        }
        Ok(skeleton)
    }

    /// Export names, parents, options and bind-pose local matrices
    pub fn description(&self) -> SkeletonDescription {
        let state = self.state.lock();
        let matrices = state.bind_pose.local_matrices();
        let bones = state
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut local = [0.0; 16];
                local.copy_from_slice(&matrices[i * 16..(i + 1) * 16]);
                BoneDescription {
                    name: name.clone(),
                    parent: state.parents[i],
                    options: state.options[i],
                    local,
                }
            })
            .collect();
        SkeletonDescription { bones }
    }

    pub fn id(&self) -> SkeletonId {
        self.id
    }

    pub fn num_bones(&self) -> usize {
        self.state.lock().names.len()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    /// Disabled skeletons are skipped by retargeting
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    pub fn bone_name(&self, index: usize) -> Result<String> {
        let state = self.state.lock();
        state.check_index(index)?;
        Ok(state.names[index].clone())
    }

    pub fn bone_names(&self) -> Vec<String> {
        self.state.lock().names.clone()
    }

    /// Rename a bone; the new name must not be used by another bone
    pub fn set_bone_name(&self, index: usize, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        let mut state = self.state.lock();
        state.check_index(index)?;
        if let Some(other) = state.find(&name).filter(|&other| other != index) {
            return Err(AnimError::illegal(format!(
                "bone name '{name}' already used by bone {other}"
            )));
        }
        state.names[index] = name;
        Ok(())
    }

    /// Parent of a bone, `None` for roots
    pub fn parent(&self, index: usize) -> Result<Option<usize>> {
        let state = self.state.lock();
        state.check_index(index)?;
        let parent = state.parents[index];
        Ok((parent >= 0).then_some(parent as usize))
    }

    /// Parent table, -1 marking roots
    pub fn parents(&self) -> Arc<[i32]> {
        Arc::clone(&self.state.lock().parents)
    }

    /// Index of the bone with the given name
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        let index = self.state.lock().find(name);
        if index.is_none() {
            log::debug!("Skeleton {}: no bone named '{name}'", self.id);
        }
        index
    }

    /// Index of the bone attached to the given scene node
    pub fn bone_index_of_node(&self, node: &Arc<SceneNode>) -> Option<usize> {
        let index = self
            .state
            .lock()
            .nodes
            .iter()
            .position(|n| n.as_ref().is_some_and(|n| Arc::ptr_eq(n, node)));
        if index.is_none() {
            log::debug!("Skeleton {}: node '{}' is not a bone", self.id, node.name());
        }
        index
    }

    pub fn bone_options(&self, index: usize) -> Result<BoneOptions> {
        let state = self.state.lock();
        state.check_index(index)?;
        Ok(state.options[index])
    }

    pub fn set_bone_options(&self, index: usize, options: BoneOptions) -> Result<()> {
        let mut state = self.state.lock();
        state.check_index(index)?;
        state.options[index] = options;
        Ok(())
    }

    /// Add option bits to a bone, keeping the ones already set
    pub fn insert_bone_options(&self, index: usize, options: BoneOptions) -> Result<()> {
        let mut state = self.state.lock();
        state.check_index(index)?;
        state.options[index].insert(options);
        Ok(())
    }

    pub fn is_locked(&self, index: usize) -> Result<bool> {
        let state = self.state.lock();
        state.check_index(index)?;
        Ok(state.is_locked(index))
    }

    /// Identity pose bound to this skeleton
    pub fn new_pose(&self) -> Pose {
        let state = self.state.lock();
        Pose::new(self.id, Arc::clone(&state.parents))
    }

    /// Snapshot of the current pose
    pub fn pose(&self) -> Pose {
        self.state.lock().pose.clone()
    }

    /// Snapshot of the bind pose
    pub fn bind_pose(&self) -> Pose {
        self.state.lock().bind_pose.clone()
    }

    fn check_pose(&self, state: &SkeletonState, pose: &Pose) -> Result<()> {
        if pose.skeleton_id() != self.id {
            return Err(AnimError::SkeletonMismatch {
                pose_skeleton: pose.skeleton_id().get(),
                skeleton: self.id.get(),
            });
        }
        if pose.num_bones() != state.names.len() {
            return Err(AnimError::BoneCountMismatch {
                expected: state.names.len(),
                actual: pose.num_bones(),
            });
        }
        Ok(())
    }

    /// Replace the bind pose
    pub fn set_bind_pose(&self, pose: &Pose) -> Result<()> {
        let mut state = self.state.lock();
        self.check_pose(&state, pose)?;
        let mut synced = pose.clone();
        synced.sync();
        state.bind_pose.copy_from(&synced)
    }

    /// Replace the current pose wholesale
    ///
    /// The pose must have been created by this skeleton and match its
    /// current bone count.
    pub fn set_pose(&self, pose: &Pose) -> Result<()> {
        let mut state = self.state.lock();
        self.check_pose(&state, pose)?;
        let mut synced = pose.clone();
        synced.sync();
        state.pose.copy_from(&synced)
    }

    /// Merge a pose into the current pose, skipping locked bones
    pub fn apply_pose(&self, pose: &Pose, space: PoseSpace) -> Result<()> {
        let mut state = self.state.lock();
        let count = state.names.len();
        if pose.num_bones() != count {
            return Err(AnimError::BoneCountMismatch {
                expected: count,
                actual: pose.num_bones(),
            });
        }

        for i in 0..count {
            if state.is_locked(i) {
                continue;
            }
            match space {
                PoseSpace::RotationOnly => {
                    state.pose.set_local_rotation(i, pose.local_rotation(i)?)?;
                }
                PoseSpace::SkeletonRoot => {
                    state.pose.set_local_transform(
                        i,
                        pose.local_scale(i)?,
                        pose.local_rotation(i)?,
                        pose.local_position(i)?,
                    )?;
                }
            }
        }

        if space == PoseSpace::RotationOnly && !state.is_locked(0) {
            state.pose.set_local_position(0, pose.local_position(0)?)?;
        }
        state.pose.sync();
        Ok(())
    }

    /// Edit the current pose in place under the skeleton lock, then sync it
    ///
    /// The lock is not reentrant: `f` must not call back into this skeleton,
    /// or it deadlocks. Take what it needs (names, indices) beforehand.
    pub fn update_pose<R>(&self, f: impl FnOnce(&mut Pose) -> Result<R>) -> Result<R> {
        let mut state = self.state.lock();
        let result = f(&mut state.pose);
        state.pose.sync();
        result
    }

    /// Skinning matrices `world · bind_world⁻¹` of the current pose, one per bone
    pub fn skin_matrices(&self) -> Result<Vec<Mat4>> {
        let (mut skin, mut inverse_bind) = {
            let state = self.state.lock();
            (state.pose.clone(), state.bind_pose.clone())
        };
        inverse_bind.inverse();
        skin.combine(&inverse_bind)?;
        (0..skin.num_bones()).map(|i| skin.world_matrix(i)).collect()
    }

    /// Attach the scene node driven by a bone
    pub fn set_bone_node(&self, index: usize, node: Option<Arc<SceneNode>>) -> Result<()> {
        let mut state = self.state.lock();
        state.check_index(index)?;
        state.nodes[index] = node;
        Ok(())
    }

    pub fn bone_node(&self, index: usize) -> Result<Option<Arc<SceneNode>>> {
        let state = self.state.lock();
        state.check_index(index)?;
        Ok(state.nodes[index].clone())
    }

    /// Attach scene nodes to bones by name, searching the hierarchy under `root`
    ///
    /// Returns the number of bones that found a node.
    pub fn attach_bones(&self, root: &Arc<SceneNode>) -> usize {
        let mut state = self.state.lock();
        let mut attached = 0;
        for i in 0..state.names.len() {
            let node = root.find_by_name(&state.names[i]);
            if node.is_some() {
                attached += 1;
            } else {
                log::debug!(
                    "Skeleton {}: no scene node for bone '{}'",
                    self.id,
                    state.names[i]
                );
            }
            state.nodes[i] = node;
        }
        attached
    }

    /// Read local transforms of attached scene nodes into the current pose
    ///
    /// Locked bones and bones without a node keep their transforms.
    pub fn pose_from_bones(&self) -> Result<()> {
        let mut state = self.state.lock();
        for i in 0..state.names.len() {
            if state.is_locked(i) {
                continue;
            }
            if let Some(node) = state.nodes[i].clone() {
                state.pose.set_local_matrix(i, node.local_matrix())?;
            }
        }
        state.pose.sync();
        Ok(())
    }

    /// Write local transforms of the current pose out to attached scene nodes
    pub fn pose_to_bones(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.pose.needs_sync() {
            state.pose.sync();
        }
        for (i, node) in state.nodes.iter().enumerate() {
            if let Some(node) = node {
                node.set_local_matrix(state.pose.local_matrix(i)?);
            }
        }
        Ok(())
    }

    /// Append the bones of `other` that this skeleton does not have yet
    ///
    /// New bones keep their parent when a bone of that name exists in the
    /// combined skeleton and hang off bone 0 otherwise. Their transforms are
    /// taken from `other`'s current and bind poses, and their scene nodes and
    /// options come along. Returns the number of bones added.
    pub fn merge(&self, other: &Self) -> Result<usize> {
        if other.id == self.id {
            return Ok(0);
        }

        // Snapshot the other skeleton first so the two locks are never held together
        let (other_names, other_parents, other_options, other_nodes, other_pose, other_bind) = {
            let o = other.state.lock();
            (
                o.names.clone(),
                Arc::clone(&o.parents),
                o.options.clone(),
                o.nodes.clone(),
                o.pose.clone(),
                o.bind_pose.clone(),
            )
        };

        let mut state = self.state.lock();
        let old_count = state.names.len();
        let mut lookup: HashMap<String, usize> = state
            .names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();

        let mut names = state.names.clone();
        let mut parents = state.parents.to_vec();
        let mut options = state.options.clone();
        let mut nodes = state.nodes.clone();
        let mut added = Vec::new();

        for (j, name) in other_names.iter().enumerate() {
            if lookup.contains_key(name) {
                continue;
            }
            let parent = other_parents[j];
            let mapped_parent = if parent >= 0 {
                lookup.get(&other_names[parent as usize]).copied()
            } else {
                None
            };
            let mapped_parent = mapped_parent.unwrap_or_else(|| {
                log::debug!("Merging bone '{name}': parent not found, attaching to root");
                0
            });

            let index = names.len();
            lookup.insert(name.clone(), index);
            names.push(name.clone());
            parents.push(mapped_parent as i32);
            options.push(other_options[j]);
            nodes.push(other_nodes[j].clone());
            added.push((index, j));
        }

        if added.is_empty() {
            return Ok(0);
        }

        validate_hierarchy(&parents).map_err(|e| AnimError::Internal(format!("merge: {e}")))?;

        let parents: Arc<[i32]> = Arc::from(parents);
        let mut pose = state.pose.extended(Arc::clone(&parents));
        let mut bind_pose = state.bind_pose.extended(Arc::clone(&parents));
        for &(index, j) in &added {
            pose.copy_local_from(index, &other_pose, j)?;
            bind_pose.copy_local_from(index, &other_bind, j)?;
        }
        pose.sync();
        bind_pose.sync();

        state.names = names;
        state.parents = parents;
        state.options = options;
        state.nodes = nodes;
        state.pose = pose;
        state.bind_pose = bind_pose;

        log::debug!(
            "Merged {} bones into skeleton {} ({} -> {})",
            added.len(),
            self.id,
            old_count,
            state.names.len()
        );
        Ok(added.len())
    }
}
