//! Keyframe tracks and interpolation primitives

use glam::{Quat, Vec3};

/// Values that can be blended between two keyframes
pub trait Lerp: Copy {
    /// Blend from `self` at `t = 0` to `other` at `t = 1`
    ///
    /// Endpoints are returned exactly.
    fn lerp(&self, other: &Self, t: f32) -> Self;
}

impl Lerp for Vec3 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        if t <= 0.0 {
            *self
        } else if t >= 1.0 {
            *other
        } else {
            Self::lerp(*self, *other, t)
        }
    }
}

impl Lerp for Quat {
    /// Spherical interpolation along the shorter arc
    fn lerp(&self, other: &Self, t: f32) -> Self {
        if t <= 0.0 {
            *self
        } else if t >= 1.0 {
            *other
        } else {
            self.slerp(*other, t)
        }
    }
}

/// How values between two keyframes are computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum Interpolation {
    /// Hold the earlier keyframe's value
    Step,
    /// Linear blend (spherical for rotations)
    #[default]
    Linear,
}

/// A value at a point in time (seconds)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Keyframe<T> {
    pub time: f32,
    pub value: T,
}

impl<T> Keyframe<T> {
    pub fn new(time: f32, value: T) -> Self {
        Self { time, value }
    }
}

/// Find the index of the keyframe at or before the given time
///
/// Returns None if there are no keyframes. Times before the first key map to
/// index 0, times after the last key map to the last index.
pub fn find_key_index<T>(keys: &[Keyframe<T>], time: f32) -> Option<usize> {
    if keys.is_empty() {
        return None;
    }

    let last_index = keys.len() - 1;
    if time >= keys[last_index].time {
        return Some(last_index);
    }

    // Largest index whose time is <= the requested time
    Some(keys.partition_point(|k| k.time <= time).saturating_sub(1))
}

/// Keyframes of one animated property, sorted by time
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Track<T> {
    pub interpolation: Interpolation,
    pub keys: Vec<Keyframe<T>>,
}

impl<T> Default for Track<T> {
    fn default() -> Self {
        Self {
            interpolation: Interpolation::Linear,
            keys: Vec::new(),
        }
    }
}

impl<T: Lerp> Track<T> {
    /// Linear track from keyframes; keys are sorted by time
    pub fn new(mut keys: Vec<Keyframe<T>>) -> Self {
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self {
            interpolation: Interpolation::Linear,
            keys,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Time of the last keyframe
    pub fn end_time(&self) -> f32 {
        self.keys.last().map_or(0.0, |k| k.time)
    }

    /// Value at the given time, `None` for an empty track
    pub fn sample(&self, time: f32) -> Option<T> {
        let index = find_key_index(&self.keys, time)?;
        let current = &self.keys[index];

        if index + 1 >= self.keys.len() || time <= current.time {
            return Some(current.value);
        }

        let next = &self.keys[index + 1];
        match self.interpolation {
            Interpolation::Step => Some(current.value),
            Interpolation::Linear => {
                let span = next.time - current.time;
                let t = if span > 0.0 {
                    ((time - current.time) / span).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                Some(current.value.lerp(&next.value, t))
            }
        }
    }
}
