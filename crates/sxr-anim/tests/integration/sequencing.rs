//! Queue ordering across repeat modes

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use sxr_anim::{AnimError, Animation, AnimationQueue, Animator, QueueListener, RepeatMode};
use test_case::test_case;

type Log = Arc<Mutex<Vec<String>>>;

/// Logs "<name>@<time>" on every evaluation
struct Traced {
    name: &'static str,
    duration: f32,
    log: Log,
}

impl Animation for Traced {
    fn duration(&self) -> f32 {
        self.duration
    }

    fn animate(&mut self, time: f32) -> sxr_anim::Result<()> {
        self.log.lock().push(format!("{}@{time}", self.name));
        Ok(())
    }
}

struct Starts(Log);

impl QueueListener for Starts {
    fn animation_started(&mut self, animator: &Animator) {
        let dir = if animator.is_reversed() { "<" } else { ">" };
        self.0.lock().push(format!("{dir}{}", animator.name()));
    }
}

fn queue(names: &[&'static str], log: &Log) -> AnimationQueue {
    let mut queue = AnimationQueue::new();
    for &name in names {
        queue.add(Animator::new(name).with_animation(Traced {
            name,
            duration: 1.0,
            log: Arc::clone(log),
        }));
    }
    queue
}

#[test]
fn test_pingpong_plays_first_entry_backwards() {
    let log = Log::default();
    let mut q = queue(&["A", "B"], &log);
    q.start_all(RepeatMode::PingPong);

    q.animate(1.0).unwrap();
    q.animate(1.0).unwrap();
    assert_eq!(q.current().unwrap().name(), "A");
    assert!(q.current().unwrap().is_reversed());
    assert_eq!(q.len(), 2);

    q.animate(0.5).unwrap();
    q.animate(0.5).unwrap();
    assert_eq!(
        *log.lock(),
        vec!["A@1", "B@1", "A@0.5", "A@0"]
    );
}

#[test_case(RepeatMode::Once, &[">A", ">B", ">C"] ; "once")]
#[test_case(RepeatMode::Repeated, &[">A", ">B", ">C", ">A", ">B", ">C", ">A"] ; "repeated")]
#[test_case(RepeatMode::PingPong, &[">A", ">B", ">C", "<B", "<A", ">B", ">C"] ; "pingpong")]
fn test_start_order(mode: RepeatMode, expected: &[&str]) {
    let log = Log::default();
    let starts = Log::default();
    let mut q = queue(&["A", "B", "C"], &log);
    q.set_listener(Box::new(Starts(Arc::clone(&starts))));
    q.start_all(mode);
    for _ in 0..6 {
        q.animate(1.0).unwrap();
    }
    assert_eq!(*starts.lock(), expected);
}

#[test]
fn test_lookup_and_start_errors() {
    let log = Log::default();
    let mut q = queue(&["A", "B"], &log);
    assert_eq!(q.find("B"), Some(1));
    assert_eq!(q.find("Z"), None);
    assert_eq!(q.get(0).unwrap().name(), "A");
    assert!(q.get(2).is_none());

    q.start("Z");
    assert!(!q.is_running());
    assert!(matches!(q.start_at(7), Err(AnimError::IndexOutOfRange { index: 7, len: 2 })));

    q.start("B");
    q.animate(0.25).unwrap();
    q.stop("B");
    assert!(!q.is_running());
    assert_eq!(*log.lock(), vec!["B@0.25"]);
}
