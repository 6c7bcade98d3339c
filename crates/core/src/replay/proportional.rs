use crate::device::{check_status, Device, DeviceInfo};
use crate::errors::{Error, Result};
use crate::event::{EventKind, EventSeq};
use super::Strategy;

/// Scales recorded coordinates by the ratio of the replay extents to the
/// recording extents. Key events pass through unscaled.
pub struct Proportional {
    record: DeviceInfo,
    replay: DeviceInfo,
}

impl Proportional {
    pub fn new(record: &DeviceInfo, replay: &DeviceInfo) -> Proportional {
        Proportional {
            record: record.clone(),
            replay: replay.clone(),
        }
    }

    fn scale_x(&self, x: i32) -> i32 {
        (x as i64 * self.replay.width as i64 / self.record.width as i64) as i32
    }

    fn scale_y(&self, y: i32) -> i32 {
        (y as i64 * self.replay.height as i64 / self.record.height as i64) as i32
    }
}

impl Strategy for Proportional {
    fn dispatch(&mut self, device: &mut dyn Device, seq: &mut EventSeq) -> Result<()> {
        let event = seq.pop()
            .ok_or(Error::CannotReachHere("dispatch on an empty sequence"))?;
        match &event.kind {
            EventKind::Tap { x, y } => {
                check_status(device.tap(self.scale_x(*x), self.scale_y(*y))?)
            },
            EventKind::LongTap { x, y } => {
                check_status(device.long_tap(self.scale_x(*x), self.scale_y(*y))?)
            },
            EventKind::DoubleTap { x, y } => {
                check_status(device.double_tap(self.scale_x(*x), self.scale_y(*y))?)
            },
            EventKind::Swipe { x, y, dx, dy, .. } => {
                check_status(device.swipe(self.scale_x(*x), self.scale_y(*y),
                                          self.scale_x(*dx), self.scale_y(*dy))?)
            },
            EventKind::Key { name, .. } => check_status(device.key(name)?),
        }
    }
}
