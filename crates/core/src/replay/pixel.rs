use log::warn;
use crate::device::{check_status, Device, DeviceInfo};
use crate::errors::{Error, Result};
use crate::event::{EventKind, EventSeq};
use super::Strategy;

/// Replays recorded coordinates verbatim. Only faithful when the replay
/// device shares the recording device's geometry.
pub struct Pixel;

impl Pixel {
    pub fn new(record: &DeviceInfo, replay: &DeviceInfo) -> Pixel {
        if record.width != replay.width
            || record.height != replay.height
            || record.dpi != replay.dpi {
            warn!("replay device {} differs from recording device {}, coordinates may land off target",
                  replay, record);
        }
        Pixel
    }
}

impl Strategy for Pixel {
    fn dispatch(&mut self, device: &mut dyn Device, seq: &mut EventSeq) -> Result<()> {
        let event = seq.pop()
            .ok_or(Error::CannotReachHere("dispatch on an empty sequence"))?;
        match &event.kind {
            EventKind::Tap { x, y } => check_status(device.tap(*x, *y)?),
            EventKind::LongTap { x, y } => check_status(device.long_tap(*x, *y)?),
            EventKind::DoubleTap { x, y } => check_status(device.double_tap(*x, *y)?),
            EventKind::Swipe { x, y, dx, dy, .. } => check_status(device.swipe(*x, *y, *dx, *dy)?),
            EventKind::Key { name, .. } => check_status(device.key(name)?),
        }
    }
}
