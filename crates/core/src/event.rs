use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use crate::view::Activity;

/// A user interaction, anchored to the activity snapshot that was on screen
/// when it happened. Timestamps are milliseconds; for a swipe, `t` is the
/// start of the gesture.
#[derive(Debug, Clone)]
pub struct Event {
    pub activity: Rc<Activity>,
    pub t: i64,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum EventKind {
    Tap { x: i32, y: i32 },
    LongTap { x: i32, y: i32 },
    DoubleTap { x: i32, y: i32 },
    Swipe { x: i32, y: i32, dx: i32, dy: i32, t0: i64, t1: i64 },
    Key { name: String, code: i32 },
}

impl EventKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            EventKind::Tap { .. } => "tap",
            EventKind::LongTap { .. } => "long-tap",
            EventKind::DoubleTap { .. } => "double-tap",
            EventKind::Swipe { .. } => "swipe",
            EventKind::Key { .. } => "key",
        }
    }

    /// The screen coordinate of a positional event.
    pub fn position(&self) -> Option<(i32, i32)> {
        match *self {
            EventKind::Tap { x, y } |
            EventKind::LongTap { x, y } |
            EventKind::DoubleTap { x, y } |
            EventKind::Swipe { x, y, .. } => Some((x, y)),
            EventKind::Key { .. } => None,
        }
    }
}

impl Event {
    pub fn new(activity: Rc<Activity>, t: i64, kind: EventKind) -> Event {
        Event { activity, t, kind }
    }

    /// The same interaction, bound to a different activity snapshot.
    pub fn rebind(&self, activity: Rc<Activity>) -> Event {
        Event {
            activity,
            t: self.t,
            kind: self.kind.clone(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            EventKind::Tap { x, y } |
            EventKind::LongTap { x, y } |
            EventKind::DoubleTap { x, y } => {
                write!(f, "{}({}, {}) t={}", self.kind.type_name(), x, y, self.t)
            },
            EventKind::Swipe { x, y, dx, dy, t0, t1 } => {
                write!(f, "swipe({}, {}, {}, {}) t={}..{}", x, y, dx, dy, t0, t1)
            },
            EventKind::Key { name, code } => {
                write!(f, "key({}/{}) t={}", name, code, self.t)
            },
        }
    }
}

/// The ordered events of a session, consumed from the front during replay.
#[derive(Debug, Default)]
pub struct EventSeq {
    events: VecDeque<Event>,
}

impl EventSeq {
    pub fn new() -> EventSeq {
        EventSeq::default()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn front(&self) -> Option<&Event> {
        self.events.front()
    }

    /// The first *n* events, fewer when the sequence is shorter.
    pub fn top_n(&self, n: usize) -> Vec<&Event> {
        self.events.iter().take(n).collect()
    }

    /// Discards the first *n* events.
    pub fn pop_n(&mut self, n: usize) {
        for _ in 0..n {
            if self.events.pop_front().is_none() {
                break;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}
