use log::warn;
use crate::device::{check_status, select_retry, Device, Selector, Widget};
use crate::errors::{Error, Result};
use crate::event::{Event, EventKind, EventSeq};
use super::{recorded_view_at, selector_from, Strategy};

/// Queries the live device for the recorded widget and, when the interface
/// has moved on without us, peeks ahead up to `lookahead` events for the
/// first one whose widget is already on screen.
pub struct Responsive {
    lookahead: usize,
}

impl Responsive {
    pub fn new(lookahead: usize) -> Responsive {
        Responsive { lookahead }
    }

    fn selector_for(&self, event: &Event, x: i32, y: i32) -> Result<Option<Selector>> {
        let view = recorded_view_at(event, x, y)?;
        let sel = selector_from(&view);
        if sel.is_usable() {
            Ok(Some(sel))
        } else {
            Ok(None)
        }
    }

    fn fire(&self, device: &mut dyn Device, kind: &EventKind, widget: &Widget) -> Result<()> {
        let center = widget.bounds.center();
        match kind {
            EventKind::Tap { .. } => check_status(device.tap(center.x, center.y)?),
            EventKind::LongTap { .. } => check_status(device.long_tap(center.x, center.y)?),
            EventKind::DoubleTap { .. } => check_status(device.double_tap(center.x, center.y)?),
            _ => Err(Error::CannotReachHere("only point gestures fire on matched widgets")),
        }
    }

    fn dispatch_positional(&mut self, device: &mut dyn Device, seq: &mut EventSeq, event: &Event, x: i32, y: i32) -> Result<()> {
        match self.selector_for(event, x, y)? {
            Some(sel) => {
                let widgets = select_retry(device, &sel, 1)?;
                if let Some(widget) = widgets.first() {
                    let widget = widget.clone();
                    seq.pop();
                    return self.fire(device, &event.kind, &widget);
                }
            },
            None => warn!("no usable identifiers on the recorded view at ({}, {})", x, y),
        }

        // The interface may have moved on: jump to the first upcoming event
        // whose widget is already on screen, discarding the stale prefix.
        let window: Vec<Event> = seq.top_n(self.lookahead + 1).into_iter().cloned().collect();
        for (index, candidate) in window.iter().enumerate().skip(1) {
            // Only tap-like events can fire on a matched widget.
            if matches!(candidate.kind, EventKind::Swipe { .. } | EventKind::Key { .. }) {
                continue;
            }
            let (cx, cy) = match candidate.kind.position() {
                Some(position) => position,
                None => continue,
            };
            let sel = match self.selector_for(candidate, cx, cy)? {
                Some(sel) => sel,
                None => continue,
            };
            let widgets = select_retry(device, &sel, 1)?;
            if let Some(widget) = widgets.first() {
                let widget = widget.clone();
                seq.pop_n(index + 1);
                warn!("skipped {} stale event{}", index, if index == 1 { "" } else { "s" });
                return self.fire(device, &candidate.kind, &widget);
            }
        }

        Err(Error::NotImplemented("ui segmentation, segment matching and event synthesis"))
    }
}

impl Strategy for Responsive {
    fn dispatch(&mut self, device: &mut dyn Device, seq: &mut EventSeq) -> Result<()> {
        let front = seq.front().cloned()
            .ok_or(Error::CannotReachHere("dispatch on an empty sequence"))?;
        match front.kind {
            EventKind::Key { ref name, .. } => {
                let status = device.key(name)?;
                seq.pop();
                check_status(status)
            },
            EventKind::Swipe { .. } => Err(Error::NotImplemented("swipe replay in responsive mode")),
            EventKind::Tap { x, y } |
            EventKind::LongTap { x, y } |
            EventKind::DoubleTap { x, y } => self.dispatch_positional(device, seq, &front, x, y),
        }
    }
}
