//! Sequencing of animators with repeat modes and crossfades
//!
//! An [`AnimationQueue`] plays its animators one after another. What comes
//! after the last one depends on the [`RepeatMode`]. With a non-zero blend
//! factor, the next animator starts early once the current one has that many
//! seconds left, and the queue's [`QueueListener`] may supply a blend
//! animation for the overlap. The queue owns that blend, advances it on its
//! own clock and drops it when its window ends or its animator is stopped.
//!
//! Listener callbacks about an animator finishing always run before the queue
//! starts the next animator or changes its entry list.

use std::fmt;
use std::sync::Arc;

use crate::animator::{Animation, Animator};
use crate::error::{AnimError, Result};
use crate::interpolator::PoseInterpolator;
use crate::skeleton::Skeleton;

/// What the queue does after the last animator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum RepeatMode {
    /// Play every animator once, then stop
    #[default]
    Once,
    /// Start over from the first animator
    Repeated,
    /// Walk back through the animators, playing them in reverse, and turn
    /// around again at the first one
    PingPong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// Receives queue events and supplies blend animations
///
/// Every method has an empty default.
pub trait QueueListener: Send {
    fn animation_started(&mut self, _animator: &Animator) {}

    fn animation_finished(&mut self, _animator: &Animator) {}

    /// Blend played over `duration` seconds while `incoming` takes over
    /// from `outgoing`
    fn create_blend(
        &mut self,
        _outgoing: &Animator,
        _incoming: &Animator,
        _duration: f32,
    ) -> Result<Option<Box<dyn Animation>>> {
        Ok(None)
    }

    /// The blend created for `incoming` has been dropped
    fn remove_blend(&mut self, _incoming: &Animator) {}
}

struct Blend {
    animation: Box<dyn Animation>,
    elapsed: f32,
}

struct QueueEntry {
    animator: Animator,
    blend: Option<Blend>,
}

/// Ordered animators played in sequence
pub struct AnimationQueue {
    entries: Vec<QueueEntry>,
    listener: Option<Box<dyn QueueListener>>,
    repeat_mode: RepeatMode,
    blend_factor: f32,
    direction: Direction,
    current: Option<usize>,
    incoming: Option<usize>,
}

impl fmt::Debug for AnimationQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.entries.iter().map(|e| e.animator.name()).collect();
        f.debug_struct("AnimationQueue")
            .field("entries", &names)
            .field("repeat_mode", &self.repeat_mode)
            .field("blend_factor", &self.blend_factor)
            .field("direction", &self.direction)
            .field("current", &self.current)
            .field("incoming", &self.incoming)
            .finish()
    }
}

impl Default for AnimationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationQueue {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            listener: None,
            repeat_mode: RepeatMode::Once,
            blend_factor: 0.0,
            direction: Direction::Forward,
            current: None,
            incoming: None,
        }
    }

    pub fn set_listener(&mut self, listener: Box<dyn QueueListener>) {
        self.listener = Some(listener);
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat_mode = mode;
    }

    pub fn blend_factor(&self) -> f32 {
        self.blend_factor
    }

    /// Seconds of overlap between consecutive animators, 0 disables blending
    pub fn set_blend_factor(&mut self, factor: f32) -> Result<()> {
        if !(factor >= 0.0) || !factor.is_finite() {
            return Err(AnimError::illegal(format!(
                "blend factor must be a non-negative number of seconds, got {factor}"
            )));
        }
        self.blend_factor = factor;
        Ok(())
    }

    pub fn add(&mut self, animator: Animator) {
        self.entries.push(QueueEntry {
            animator,
            blend: None,
        });
    }

    /// Stop and take out the animator with the given name
    pub fn remove(&mut self, name: &str) -> Option<Animator> {
        let index = self.find(name)?;
        self.stop_entry(index);
        let entry = self.entries.remove(index);

        let shift = |slot: Option<usize>| match slot {
            Some(i) if i > index => Some(i - 1),
            other => other,
        };
        self.current = shift(self.current);
        self.incoming = shift(self.incoming);
        Some(entry.animator)
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        let index = self.entries.iter().position(|e| e.animator.name() == name);
        if index.is_none() {
            log::debug!("Animation queue: no animator named '{name}'");
        }
        index
    }

    pub fn get(&self, index: usize) -> Option<&Animator> {
        self.entries.get(index).map(|e| &e.animator)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Animator> {
        self.entries.get_mut(index).map(|e| &mut e.animator)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Animator currently in charge of the sequence
    pub fn current(&self) -> Option<&Animator> {
        self.current.map(|i| &self.entries[i].animator)
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    /// Whether the animator at `index` has a live blend
    pub fn is_blending(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(|e| e.blend.is_some())
    }

    /// Play the whole queue from the first animator
    pub fn start_all(&mut self, mode: RepeatMode) {
        self.repeat_mode = mode;
        self.stop_all();
        if !self.entries.is_empty() {
            self.direction = Direction::Forward;
            self.launch(0, false);
            self.current = Some(0);
        }
    }

    /// Play from the named animator; unknown names are ignored
    pub fn start(&mut self, name: &str) {
        if let Some(index) = self.find(name) {
            self.start_index(index);
        }
    }

    /// Play from the animator at `index`
    pub fn start_at(&mut self, index: usize) -> Result<()> {
        if index >= self.entries.len() {
            return Err(AnimError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        self.start_index(index);
        Ok(())
    }

    fn start_index(&mut self, index: usize) {
        self.stop_all();
        self.direction = Direction::Forward;
        self.launch(index, false);
        self.current = Some(index);
    }

    /// Stop the named animator and drop its blend
    ///
    /// If it was in charge of the sequence, an animator that already started
    /// early takes over; otherwise the queue stops.
    pub fn stop(&mut self, name: &str) {
        if let Some(index) = self.find(name) {
            self.stop_entry(index);
        }
    }

    pub fn stop_all(&mut self) {
        for index in 0..self.entries.len() {
            self.stop_entry(index);
        }
        self.current = None;
        self.incoming = None;
    }

    fn stop_entry(&mut self, index: usize) {
        let entry = &mut self.entries[index];
        entry.animator.stop();
        if entry.blend.take().is_some()
            && let Some(listener) = self.listener.as_mut()
        {
            listener.remove_blend(&entry.animator);
        }

        if self.incoming == Some(index) {
            self.incoming = None;
        }
        if self.current == Some(index) {
            self.current = self.incoming.take();
        }
    }

    fn launch(&mut self, index: usize, reverse: bool) {
        let animator = &mut self.entries[index].animator;
        animator.set_reverse(reverse);
        animator.start();
        log::debug!(
            "Animation queue: starting '{}'{}",
            animator.name(),
            if reverse { " in reverse" } else { "" }
        );
        if let Some(listener) = self.listener.as_mut() {
            listener.animation_started(&self.entries[index].animator);
        }
    }

    /// Entry after `from` and the direction it plays in
    fn next_index(&self, from: usize) -> Option<(usize, Direction)> {
        let len = self.entries.len();
        let has_next = from + 1 < len;
        let has_prev = from > 0;
        match self.repeat_mode {
            RepeatMode::Once => has_next.then_some((from + 1, Direction::Forward)),
            RepeatMode::Repeated => Some(((from + 1) % len, Direction::Forward)),
            RepeatMode::PingPong => Some(match self.direction {
                Direction::Forward if has_next => (from + 1, Direction::Forward),
                Direction::Forward if has_prev => (from - 1, Direction::Backward),
                Direction::Forward => (from, Direction::Backward),
                Direction::Backward if has_prev => (from - 1, Direction::Backward),
                Direction::Backward if has_next => (from + 1, Direction::Forward),
                Direction::Backward => (from, Direction::Forward),
            }),
        }
    }

    /// Hand the sequence to the entry after `from`
    fn advance(&mut self, from: usize) {
        match self.next_index(from) {
            Some((next, direction)) => {
                self.direction = direction;
                self.launch(next, direction == Direction::Backward);
                self.current = Some(next);
            }
            None => {
                log::debug!("Animation queue: sequence complete");
                self.current = None;
            }
        }
    }

    /// Advance every running animator and blend by `delta` seconds
    pub fn animate(&mut self, delta: f32) -> Result<()> {
        let Some(current) = self.current else {
            return Ok(());
        };

        // Outgoing before incoming: the incoming animator writes last, so a
        // blend fades towards its output whatever the entry order
        let mut order: Vec<usize> = (0..self.entries.len())
            .filter(|&i| Some(i) != self.current && Some(i) != self.incoming)
            .collect();
        order.push(current);
        order.extend(self.incoming.filter(|&i| i != current));

        let mut finished = Vec::new();
        for index in order {
            if self.entries[index].animator.animate(delta)? {
                finished.push(index);
            }
        }
        finished.sort_unstable();

        for entry in &mut self.entries {
            let Some(blend) = entry.blend.as_mut() else {
                continue;
            };
            blend.elapsed += delta;
            let duration = blend.animation.duration();
            blend.animation.animate(blend.elapsed.min(duration))?;
            if blend.elapsed >= duration {
                entry.blend = None;
                if let Some(listener) = self.listener.as_mut() {
                    listener.remove_blend(&entry.animator);
                }
            }
        }

        if let Some(listener) = self.listener.as_mut() {
            for &index in &finished {
                listener.animation_finished(&self.entries[index].animator);
            }
        }

        if finished.contains(&current) {
            match self.incoming.take() {
                Some(next) if self.entries[next].animator.is_running() => {
                    self.current = Some(next);
                }
                // The early starter played out during the overlap
                Some(next) => self.advance(next),
                None => self.advance(current),
            }
        }

        self.start_blend()
    }

    fn start_blend(&mut self) -> Result<()> {
        if !(self.blend_factor > 0.0) || self.incoming.is_some() {
            return Ok(());
        }
        let Some(current) = self.current else {
            return Ok(());
        };
        let outgoing = &self.entries[current].animator;
        if !outgoing.is_running() || outgoing.remaining() > self.blend_factor {
            return Ok(());
        }
        let Some((next, direction)) = self.next_index(current) else {
            return Ok(());
        };
        if next == current {
            return Ok(());
        }
        let entry = &self.entries[next];
        if entry.blend.is_some() || entry.animator.is_running() {
            return Ok(());
        }

        self.direction = direction;
        self.launch(next, direction == Direction::Backward);
        self.incoming = Some(next);

        let blend = match self.listener.as_mut() {
            Some(listener) => listener.create_blend(
                &self.entries[current].animator,
                &self.entries[next].animator,
                self.blend_factor,
            )?,
            None => None,
        };
        if let Some(animation) = blend {
            log::trace!(
                "Animation queue: blending '{}' into '{}' over {}s",
                self.entries[current].animator.name(),
                self.entries[next].animator.name(),
                self.blend_factor
            );
            self.entries[next].blend = Some(Blend {
                animation,
                elapsed: 0.0,
            });
        }
        Ok(())
    }
}

/// Listener that crossfades skeleton poses between consecutive animators
///
/// The blend starts from a snapshot of the skeleton's pose taken when the
/// incoming animator starts, and fades into whatever the incoming animator
/// produces. Without an explicit target, the skeleton driven by the incoming
/// (or else the outgoing) animator is used.
#[derive(Debug, Default)]
pub struct PoseBlender {
    target: Option<Arc<Skeleton>>,
}

impl PoseBlender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(target: Arc<Skeleton>) -> Self {
        Self {
            target: Some(target),
        }
    }
}

impl QueueListener for PoseBlender {
    fn create_blend(
        &mut self,
        outgoing: &Animator,
        incoming: &Animator,
        duration: f32,
    ) -> Result<Option<Box<dyn Animation>>> {
        let target = self
            .target
            .clone()
            .or_else(|| incoming.driven_skeleton())
            .or_else(|| outgoing.driven_skeleton());
        let Some(target) = target else {
            log::debug!(
                "No skeleton to blend '{}' into '{}'",
                outgoing.name(),
                incoming.name()
            );
            return Ok(None);
        };
        let blend = PoseInterpolator::from_current(target, duration)?;
        Ok(Some(Box::new(blend)))
    }
}
