//! Animation abstraction and the named animator that plays a group of them

use std::fmt;
use std::sync::Arc;

use crate::error::{AnimError, Result};
use crate::skeleton::Skeleton;

/// Something that can be evaluated at a point in time
///
/// `time` is in seconds, within `0..=duration()`. Implementations write their
/// result into whatever they drive (a skeleton pose, a retarget target...).
pub trait Animation: Send {
    /// Length of the animation in seconds
    fn duration(&self) -> f32;

    /// Evaluate the animation at `time`
    fn animate(&mut self, time: f32) -> Result<()>;

    /// Skeleton whose current pose this animation writes, if any
    fn driven_skeleton(&self) -> Option<Arc<Skeleton>> {
        None
    }
}

/// Named, ordered list of animations played together
///
/// All animations share one clock. Each animation sees the animator time
/// clamped to its own duration, mirrored when the animator runs in reverse.
pub struct Animator {
    name: String,
    animations: Vec<Box<dyn Animation>>,
    running: bool,
    finished: bool,
    reverse: bool,
    elapsed: f32,
}

impl fmt::Debug for Animator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animator")
            .field("name", &self.name)
            .field("animations", &self.animations.len())
            .field("running", &self.running)
            .field("finished", &self.finished)
            .field("reverse", &self.reverse)
            .field("elapsed", &self.elapsed)
            .finish()
    }
}

impl Animator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            animations: Vec::new(),
            running: false,
            finished: false,
            reverse: false,
            elapsed: 0.0,
        }
    }

    pub fn with_animation(mut self, animation: impl Animation + 'static) -> Self {
        self.animations.push(Box::new(animation));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_animation(&mut self, animation: Box<dyn Animation>) {
        self.animations.push(animation);
    }

    /// Remove and return the animation at `index`
    pub fn remove_animation(&mut self, index: usize) -> Result<Box<dyn Animation>> {
        if index >= self.animations.len() {
            return Err(AnimError::IndexOutOfRange {
                index,
                len: self.animations.len(),
            });
        }
        Ok(self.animations.remove(index))
    }

    pub fn animation(&self, index: usize) -> Option<&dyn Animation> {
        self.animations.get(index).map(AsRef::as_ref)
    }

    pub fn animation_count(&self) -> usize {
        self.animations.len()
    }

    /// First skeleton driven by any of the animations
    pub fn driven_skeleton(&self) -> Option<Arc<Skeleton>> {
        self.animations.iter().find_map(|a| a.driven_skeleton())
    }

    /// Duration of the longest animation
    pub fn duration(&self) -> f32 {
        self.animations
            .iter()
            .map(|a| a.duration())
            .fold(0.0, f32::max)
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Time left before the animator finishes
    pub fn remaining(&self) -> f32 {
        (self.duration() - self.elapsed).max(0.0)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_reversed(&self) -> bool {
        self.reverse
    }

    /// Play from the end towards the start
    pub fn set_reverse(&mut self, reverse: bool) {
        self.reverse = reverse;
    }

    /// Start playing from the beginning
    pub fn start(&mut self) {
        log::trace!("Starting animator '{}'", self.name);
        self.elapsed = 0.0;
        self.finished = false;
        self.running = true;
    }

    /// Stop playing, keeping the current time
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Rewind to the beginning without starting
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.finished = false;
        self.running = false;
    }

    /// Evaluate every animation at an absolute animator time
    pub fn animate_at(&mut self, time: f32) -> Result<()> {
        let duration = self.duration();
        let time = time.clamp(0.0, duration);
        let local = if self.reverse { duration - time } else { time };

        for animation in &mut self.animations {
            let t = local.min(animation.duration());
            animation.animate(t)?;
        }
        Ok(())
    }

    /// Advance by `delta` seconds and evaluate
    ///
    /// Returns `true` on the frame the animator reaches its end; it stops
    /// itself at that point. Stopped animators ignore the call.
    pub fn animate(&mut self, delta: f32) -> Result<bool> {
        if !self.running {
            return Ok(false);
        }

        let duration = self.duration();
        self.elapsed = (self.elapsed + delta).min(duration);
        self.animate_at(self.elapsed)?;

        if self.elapsed >= duration {
            self.running = false;
            self.finished = true;
            log::trace!("Animator '{}' finished", self.name);
            return Ok(true);
        }
        Ok(false)
    }
}
