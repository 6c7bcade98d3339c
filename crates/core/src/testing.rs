//! Shared test doubles and fixture builders.

use std::collections::VecDeque;
use std::rc::Rc;
use crate::device::{Device, DeviceInfo, InputKind, LogcatOpts, LogLines, Selector, Widget};
use crate::errors::Result;
use crate::event::{Event, EventKind};
use crate::geom::Rectangle;
use crate::rect;
use crate::view::{attach, Activity, View, ViewKind};

/// Scripted device double: raw inputs always succeed and are logged; view
/// inputs and selections pop preloaded results; logcat drains a preloaded
/// trace.
#[derive(Default)]
pub struct MockDevice {
    pub info: DeviceInfo,
    pub view_codes: VecDeque<i32>,
    pub selections: VecDeque<(i32, Vec<Widget>)>,
    pub trace: Vec<Result<String>>,
    pub calls: Vec<String>,
}

impl MockDevice {
    pub fn new() -> MockDevice {
        MockDevice::default()
    }
}

impl Device for MockDevice {
    fn fetch_info(&mut self) -> Result<DeviceInfo> {
        Ok(self.info.clone())
    }

    fn tap(&mut self, x: i32, y: i32) -> Result<i32> {
        self.calls.push(format!("tap {} {}", x, y));
        Ok(0)
    }

    fn long_tap(&mut self, x: i32, y: i32) -> Result<i32> {
        self.calls.push(format!("long-tap {} {}", x, y));
        Ok(0)
    }

    fn double_tap(&mut self, x: i32, y: i32) -> Result<i32> {
        self.calls.push(format!("double-tap {} {}", x, y));
        Ok(0)
    }

    fn swipe(&mut self, x: i32, y: i32, dx: i32, dy: i32) -> Result<i32> {
        self.calls.push(format!("swipe {} {} {} {}", x, y, dx, dy));
        Ok(0)
    }

    fn key(&mut self, name: &str) -> Result<i32> {
        self.calls.push(format!("key {}", name));
        Ok(0)
    }

    fn view_input(&mut self, kind: InputKind, sel: &Selector) -> Result<i32> {
        self.calls.push(format!("view {} {}", kind, sel));
        Ok(self.view_codes.pop_front().unwrap_or(0))
    }

    fn select(&mut self, sel: &Selector, n: usize) -> Result<(i32, Vec<Widget>)> {
        self.calls.push(format!("select {} n={}", sel, n));
        Ok(self.selections.pop_front().unwrap_or((0, Vec::new())))
    }

    fn logcat(&mut self, _opts: &LogcatOpts) -> Result<LogLines> {
        Ok(Box::new(std::mem::take(&mut self.trace).into_iter()))
    }
}

pub fn live_widget(bounds: Rectangle) -> Widget {
    Widget {
        class: "android.widget.Button".to_string(),
        package: "com.x".to_string(),
        res_id: String::new(),
        text: String::new(),
        desc: String::new(),
        bounds,
    }
}

/// An activity whose decor holds one labelled button, plus an event of the
/// given kind bound to it.
pub fn event_on_button(t: i64, kind: EventKind, bounds: Rectangle, text: &str) -> Event {
    let activity = Rc::new(Activity::new("com.x", ".Main", &DeviceInfo::default()));
    let button = View::new(ViewKind::Other, "android.widget.Button", "com.x");
    button.borrow_mut().rect = bounds;
    button.borrow_mut().text = text.to_string();
    attach(&activity.decor, &button);
    Event::new(activity, t, kind)
}

pub fn tap_on_button(t: i64, x: i32, y: i32, text: &str) -> Event {
    event_on_button(t, EventKind::Tap { x, y }, rect![x - 5, y - 5, x + 5, y + 5], text)
}
