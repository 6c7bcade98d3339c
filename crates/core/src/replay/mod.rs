//! Replays a recorded event sequence against a live device.
//!
//! The scheduler peeks the front event for timing and logging, then hands
//! the sequence to a strategy, which consumes at least that event. The
//! responsive strategy may consume a longer prefix when it skips over
//! interactions whose widgets are no longer on screen.

pub mod pixel;
pub mod proportional;
pub mod widget;
pub mod responsive;

use std::thread;
use std::time::Duration;
use log::info;
use crate::device::{Device, DeviceInfo, Selector};
use crate::errors::{Error, Result};
use crate::event::{Event, EventSeq};
use crate::pack::Packer;
use crate::settings::{ReplaySettings, StrategyKind};
use crate::view::{drawing_rect, find_view_by_xy, ViewRef};

pub use self::pixel::Pixel;
pub use self::proportional::Proportional;
pub use self::widget::Widget;
pub use self::responsive::Responsive;

pub trait Strategy {
    /// Performs the front event of *seq* on the device, consuming it (and
    /// possibly more) from the sequence.
    fn dispatch(&mut self, device: &mut dyn Device, seq: &mut EventSeq) -> Result<()>;
}

pub fn strategy_for(kind: StrategyKind, record: &DeviceInfo, replay: &DeviceInfo, lookahead: usize) -> Box<dyn Strategy> {
    match kind {
        StrategyKind::Px => Box::new(Pixel::new(record, replay)),
        StrategyKind::Pt => Box::new(Proportional::new(record, replay)),
        StrategyKind::Widget => Box::new(Widget::new(replay)),
        StrategyKind::Responsive => Box::new(Responsive::new(lookahead)),
    }
}

/// Unpacks the sequence recorded in *packer* and drives it against *device*
/// with the configured strategy.
pub fn replay_archive(packer: &mut Packer, device: &mut dyn Device, settings: &ReplaySettings) -> Result<()> {
    let record = packer.device().clone();
    let replay = device.fetch_info()?;
    let mut strategy = strategy_for(settings.strategy, &record, &replay, settings.lookahead);
    let mut seq = packer.unpack_all()?;
    Replayer::new(settings.time_sensitive).run(&mut seq, device, strategy.as_mut())
}

pub struct Replayer {
    time_sensitive: bool,
}

impl Replayer {
    pub fn new(time_sensitive: bool) -> Replayer {
        Replayer { time_sensitive }
    }

    /// Drives *seq* to exhaustion, honoring the recorded inter-event delays
    /// when time sensitivity is on. The first fatal error stops the replay;
    /// the remaining events are discarded with the sequence.
    pub fn run(&mut self, seq: &mut EventSeq, device: &mut dyn Device, strategy: &mut dyn Strategy) -> Result<()> {
        let mut prev_t: Option<i64> = None;
        loop {
            let (line, t) = match seq.front() {
                Some(event) => (event.to_string(), event.t),
                None => break,
            };
            if self.time_sensitive {
                if let Some(prev) = prev_t {
                    let delay = t - prev;
                    if delay > 0 {
                        thread::sleep(Duration::from_millis(delay as u64));
                    }
                }
            }
            info!("{}", line);
            strategy.dispatch(device, seq)?;
            prev_t = Some(t);
        }
        Ok(())
    }
}

/// The innermost visible view under a recorded positional event. Every
/// recorded coordinate hits at least the decor of its own snapshot, so a
/// miss is an invariant violation.
pub(crate) fn recorded_view_at(event: &Event, x: i32, y: i32) -> Result<ViewRef> {
    find_view_by_xy(&event.activity.decor, x, y, true, false)
        .ok_or(Error::CannotReachHere("a recorded event must hit a view on its own snapshot"))
}

/// Selector predicates drawn from a recorded view: resource entry, text and
/// description, when present.
pub(crate) fn selector_from(view: &ViewRef) -> Selector {
    let v = view.borrow();
    let mut sel = Selector::default();
    if !v.res_entry.is_empty() {
        sel.res_id_contains = Some(v.res_entry.clone());
    }
    if !v.text.is_empty() {
        sel.text_contains = Some(v.text.clone());
    }
    if !v.desc.is_empty() {
        sel.desc_contains = Some(v.desc.clone());
    }
    sel
}

/// Center of the recorded view's drawing rectangle.
pub(crate) fn recorded_center(view: &ViewRef) -> crate::geom::Point {
    drawing_rect(view).center()
}
