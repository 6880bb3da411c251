//! Retargeting between skeletons of different shape
//!
//! A [`PoseMapper`] copies the local rotations of a source skeleton onto a
//! target skeleton through a bone map. The map has one entry per source bone
//! holding the matching target bone, or `None` when the source bone has no
//! counterpart. Overall translation is carried once, at the root: the source
//! root's world position, multiplied by a uniform scale, becomes the target
//! root's local position.
//!
//! Bone maps can be set directly, parsed from text or derived from bone
//! names. The text format has one `source target` pair per line, separated by
//! whitespace. Blank lines and lines starting with `#` are ignored.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::animator::Animation;
use crate::error::{AnimError, Result};
use crate::skeleton::{BoneOptions, PoseSpace, Skeleton};

/// Target bone for each source bone
pub type BoneMap = Vec<Option<usize>>;

fn name_lookup(names: &[String]) -> HashMap<&str, usize> {
    names
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect()
}

/// Map every source bone to the target bone with the same name
pub fn derive_bone_map(source: &Skeleton, target: &Skeleton) -> BoneMap {
    let target_names = target.bone_names();
    let lookup = name_lookup(&target_names);
    source
        .bone_names()
        .iter()
        .map(|name| lookup.get(name.as_str()).copied())
        .collect()
}

/// Parse a text bone map against a source and a target skeleton
///
/// Malformed lines and names missing from either skeleton are logged and
/// skipped.
pub fn parse_bone_map(text: &str, source: &Skeleton, target: &Skeleton) -> BoneMap {
    let source_names = source.bone_names();
    let target_names = target.bone_names();
    let source_lookup = name_lookup(&source_names);
    let target_lookup = name_lookup(&target_names);
    let mut map = vec![None; source_names.len()];

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let (Some(from), Some(to), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            log::warn!(
                "Bone map line {}: expected 'source target', got '{line}'",
                line_no + 1
            );
            continue;
        };

        let Some(&src) = source_lookup.get(from) else {
            log::debug!("Bone map line {}: no source bone '{from}'", line_no + 1);
            continue;
        };
        let Some(&dst) = target_lookup.get(to) else {
            log::debug!("Bone map line {}: no target bone '{to}'", line_no + 1);
            continue;
        };
        map[src] = Some(dst);
    }
    map
}

/// Write a bone map in the text format, one line per mapped source bone
pub fn format_bone_map(
    map: &[Option<usize>],
    source: &Skeleton,
    target: &Skeleton,
) -> Result<String> {
    let source_names = source.bone_names();
    let target_names = target.bone_names();
    if map.len() != source_names.len() {
        return Err(AnimError::BoneCountMismatch {
            expected: source_names.len(),
            actual: map.len(),
        });
    }

    let mut text = String::new();
    for (src, dst) in map.iter().enumerate() {
        let Some(dst) = *dst else { continue };
        let target_name = target_names.get(dst).ok_or(AnimError::IndexOutOfRange {
            index: dst,
            len: target_names.len(),
        })?;
        let _ = writeln!(text, "{} {}", source_names[src], target_name);
    }
    Ok(text)
}

/// Animation retargeting a source skeleton's rotations onto a target skeleton
#[derive(Debug)]
pub struct PoseMapper {
    source: Option<Arc<Skeleton>>,
    target: Arc<Skeleton>,
    bone_map: Option<BoneMap>,
    scale: f32,
    duration: f32,
}

impl PoseMapper {
    /// Mapper without a bone map; one is derived from names on first use
    pub fn new(
        source: Option<Arc<Skeleton>>,
        target: Arc<Skeleton>,
        duration: f32,
    ) -> Result<Self> {
        if !(duration > 0.0) {
            return Err(AnimError::illegal(format!(
                "mapper duration must be positive, got {duration}"
            )));
        }
        Ok(Self {
            source,
            target,
            bone_map: None,
            scale: 1.0,
            duration,
        })
    }

    pub fn source(&self) -> Option<&Arc<Skeleton>> {
        self.source.as_ref()
    }

    /// Replace the source skeleton; the bone map is cleared
    pub fn set_source(&mut self, source: Option<Arc<Skeleton>>) {
        self.source = source;
        self.bone_map = None;
    }

    pub fn target(&self) -> &Arc<Skeleton> {
        &self.target
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Uniform factor applied to the root translation
    pub fn set_scale(&mut self, scale: f32) -> Result<()> {
        if !(scale > 0.0) {
            return Err(AnimError::illegal(format!(
                "scale factor must be positive, got {scale}"
            )));
        }
        self.scale = scale;
        Ok(())
    }

    pub fn bone_map(&self) -> Option<&[Option<usize>]> {
        self.bone_map.as_deref()
    }

    fn require_source(&self) -> Result<&Arc<Skeleton>> {
        self.source
            .as_ref()
            .ok_or_else(|| AnimError::illegal("pose mapper has no source skeleton"))
    }

    /// Install an explicit bone map sized to the source skeleton
    ///
    /// Mapped target bones are flagged [`BoneOptions::ANIMATED`].
    pub fn set_bone_map(&mut self, map: BoneMap) -> Result<()> {
        let source = self.require_source()?;
        let expected = source.num_bones();
        if map.len() != expected {
            return Err(AnimError::BoneCountMismatch {
                expected,
                actual: map.len(),
            });
        }
        let len = self.target.num_bones();
        for &dst in map.iter().flatten() {
            if dst >= len {
                return Err(AnimError::IndexOutOfRange { index: dst, len });
            }
        }
        for &dst in map.iter().flatten() {
            self.target.insert_bone_options(dst, BoneOptions::ANIMATED)?;
        }
        self.bone_map = Some(map);
        Ok(())
    }

    /// Parse and install a text bone map, returning the number of mapped bones
    pub fn set_bone_map_text(&mut self, text: &str) -> Result<usize> {
        let source = self.require_source()?;
        let map = parse_bone_map(text, source, &self.target);
        let mapped = map.iter().flatten().count();
        self.set_bone_map(map)?;
        Ok(mapped)
    }

    /// Derive and install a bone map by matching names
    ///
    /// Returns the number of source bones that found a target bone.
    pub fn make_bone_map(&mut self) -> Result<usize> {
        let source = self.require_source()?;
        let map = derive_bone_map(source, &self.target);
        let mapped = map.iter().flatten().count();
        log::debug!(
            "Derived bone map {} -> {}: {mapped} of {} bones matched",
            source.id(),
            self.target.id(),
            map.len()
        );
        self.set_bone_map(map)?;
        Ok(mapped)
    }

    /// Active bone map in the text format, empty when none is set
    pub fn bone_map_text(&self) -> Result<String> {
        match (&self.source, &self.bone_map) {
            (Some(source), Some(map)) => format_bone_map(map, source, &self.target),
            _ => Ok(String::new()),
        }
    }

    /// Copy the source's current local rotations onto the target
    ///
    /// Unmapped target bones end up with identity rotation. Locked target
    /// bones are left alone. The result is pushed to the target's scene
    /// nodes.
    pub fn map_local_to_target(&mut self) -> Result<()> {
        let Some(source) = self.source.clone() else {
            return Ok(());
        };
        if self.bone_map.is_none() {
            self.make_bone_map()?;
        }
        let map = self
            .bone_map
            .as_ref()
            .ok_or_else(|| AnimError::Internal("bone map missing after derivation".into()))?;

        let src_pose = source.pose();
        if map.len() != src_pose.num_bones() {
            return Err(AnimError::BoneCountMismatch {
                expected: map.len(),
                actual: src_pose.num_bones(),
            });
        }

        let mut dest = self.target.pose();
        dest.clear_rotations();
        for (src, dst) in map.iter().enumerate() {
            if let Some(dst) = *dst {
                dest.set_local_rotation(dst, src_pose.local_rotation(src)?)?;
            }
        }
        dest.set_local_position(0, src_pose.world_position(0)? * self.scale)?;

        self.target.apply_pose(&dest, PoseSpace::RotationOnly)?;
        self.target.pose_to_bones()
    }
}

impl Animation for PoseMapper {
    fn duration(&self) -> f32 {
        self.duration
    }

    fn animate(&mut self, _time: f32) -> Result<()> {
        let Some(source) = &self.source else {
            return Ok(());
        };
        if !source.is_enabled() || !self.target.is_enabled() {
            return Ok(());
        }
        self.map_local_to_target()
    }

    fn driven_skeleton(&self) -> Option<Arc<Skeleton>> {
        Some(Arc::clone(&self.target))
    }
}
