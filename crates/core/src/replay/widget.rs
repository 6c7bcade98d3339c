use crate::device::{check_status, view_input_retry, Device, DeviceInfo, InputKind};
use crate::errors::{Error, Result};
use crate::event::{Event, EventKind, EventSeq};
use super::{recorded_center, recorded_view_at, selector_from, Strategy};

/// Finds the widget under each recorded positional event on the recorded
/// tree and drives the live counterpart by selector instead of coordinate.
pub struct Widget {
    replay: DeviceInfo,
}

impl Widget {
    pub fn new(replay: &DeviceInfo) -> Widget {
        Widget {
            replay: replay.clone(),
        }
    }

    fn view_gesture(&self, device: &mut dyn Device, event: &Event, kind: InputKind, x: i32, y: i32) -> Result<()> {
        let view = recorded_view_at(event, x, y)?;
        view_input_retry(device, kind, &selector_from(&view))
    }

    fn view_swipe(&self, device: &mut dyn Device, event: &Event, x: i32, y: i32, dx: i32, dy: i32) -> Result<()> {
        let view = recorded_view_at(event, x, y)?;
        let mut sel = selector_from(&view);
        let center = recorded_center(&view);
        let width = self.replay.width as i32;
        let height = self.replay.height as i32;
        // Keep the gesture's end point on screen.
        sel.dx = Some(dx.max(-center.x).min(width - 1 - center.x));
        sel.dy = Some(dy.max(-center.y).min(height - 1 - center.y));
        view_input_retry(device, InputKind::Swipe, &sel)
    }
}

impl Strategy for Widget {
    fn dispatch(&mut self, device: &mut dyn Device, seq: &mut EventSeq) -> Result<()> {
        let event = seq.pop()
            .ok_or(Error::CannotReachHere("dispatch on an empty sequence"))?;
        match event.kind {
            EventKind::Tap { x, y } => self.view_gesture(device, &event, InputKind::Tap, x, y),
            EventKind::LongTap { x, y } => self.view_gesture(device, &event, InputKind::LongTap, x, y),
            EventKind::DoubleTap { x, y } => self.view_gesture(device, &event, InputKind::DoubleTap, x, y),
            EventKind::Swipe { x, y, dx, dy, .. } => self.view_swipe(device, &event, x, y, dx, dy),
            EventKind::Key { ref name, .. } => check_status(device.key(name)?),
        }
    }
}
