//! Incremental parser for the line-oriented trace an instrumented app emits.
//!
//! The parser is a three-state machine: it waits for an activity header,
//! rebuilds the captured view hierarchy line by line, then binds the next
//! interaction event to that snapshot and hands it to the packer.

use std::rc::Rc;
use std::str::FromStr;
use lazy_static::lazy_static;
use log::debug;
use regex::{Captures, Regex};
use crate::device::DeviceInfo;
use crate::errors::{Error, Result};
use crate::event::{Event, EventKind};
use crate::helpers::decode_b64;
use crate::pack::Packer;
use crate::pt;
use crate::view::{self, Activity, ViewFlags, ViewKind, ViewRef, View, Visibility};

lazy_static! {
    static ref ACTIVITY_BEGIN: Regex = Regex::new(
        r"^(?P<pkg>\S+) ACTIVITY_BEGIN (?P<name>\S+)$").unwrap();
    static ref ACTIVITY_END: Regex = Regex::new(
        r"^(?P<pkg>\S+) ACTIVITY_END (?P<name>\S+)$").unwrap();
    static ref POSITION_EVENT: Regex = Regex::new(
        r"^(?P<pkg>\S+) (?P<kind>TAP|LONG_TAP|DOUBLE_TAP) (?P<t>\d+) (?P<x>-?\d+) (?P<y>-?\d+)$").unwrap();
    static ref SWIPE_EVENT: Regex = Regex::new(
        r"^(?P<pkg>\S+) SWIPE (?P<t0>\d+) (?P<x>-?\d+) (?P<y>-?\d+) (?P<dx>-?\d+) (?P<dy>-?\d+) (?P<t1>\d+)$").unwrap();
    static ref KEY_EVENT: Regex = Regex::new(
        r"^(?P<pkg>\S+) KEY (?P<t>\d+) (?P<code>\d+) (?P<name>\S+)$").unwrap();
    static ref EVENT_SHAPE: Regex = Regex::new(
        r"^(?P<pkg>\S+) (?P<kind>[A-Z_]+)( .*)?$").unwrap();
    static ref VIEW_LINE: Regex = Regex::new(concat!(
        r"^(?P<pad> *)(?P<cls>[^{ ]+)\{(?P<hash>[0-9a-fA-F]+) ",
        r"(?P<flags>\S{9}) (?P<pflags>\S{8}) ",
        r"(?P<l>-?\d+),(?P<t>-?\d+)-(?P<r>-?\d+),(?P<b>-?\d+)",
        r"(?: #(?P<rid>[0-9a-fA-F]+) (?P<rpkg>[^:\s]+):(?P<rtype>[^/\s]+)/(?P<rentry>[^\s}]+))?",
        r".*? dx-tx=(?P<tx>-?\d+(?:\.\d+)?) dx-ty=(?P<ty>-?\d+(?:\.\d+)?) dx-tz=(?P<tz>-?\d+(?:\.\d+)?)",
        r" dx-sx=(?P<sx>-?\d+(?:\.\d+)?) dx-sy=(?P<sy>-?\d+(?:\.\d+)?)",
        r#" dx-desc="(?P<desc>[^"]*)" dx-text="(?P<text>[^"]*)""#,
        r"(?: dx-pgr-curr=(?P<pgr>\d+))?(?: dx-tab-curr=(?P<tab>\d+))?\}$")).unwrap();
}

const CRASH_MARKER: &str = "--------- beginning of ";

// Positions within the nine-character flag group of a view line.
const TRACE_FLAGS: [(usize, ViewFlags); 8] = [
    (1, ViewFlags::FOCUSABLE),
    (2, ViewFlags::ENABLED),
    (3, ViewFlags::DRAWABLE),
    (4, ViewFlags::H_SCROLLABLE),
    (5, ViewFlags::V_SCROLLABLE),
    (6, ViewFlags::CLICKABLE),
    (7, ViewFlags::LONG_CLICKABLE),
    (8, ViewFlags::CONTEXT_CLICKABLE),
];

fn illegal<S: Into<String>>(message: S) -> Error {
    Error::IllegalState(message.into())
}

fn num<T: FromStr>(field: &str) -> Result<T> {
    field.parse().map_err(|_| illegal(format!("invalid number in trace line: {:?}", field)))
}

// Lengths and offsets may carry a fractional part in the trace.
fn px(field: &str) -> Result<i32> {
    field.parse::<f32>()
         .map(|v| v.round() as i32)
         .map_err(|_| illegal(format!("invalid length in trace line: {:?}", field)))
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum State {
    AwaitActivity,
    InActivity,
    AwaitEvent,
}

pub struct TraceParser {
    device: DeviceInfo,
    decode: bool,
    state: State,
    activity: Option<Rc<Activity>>,
    decor_seen: bool,
    last: Option<(ViewRef, usize)>,
}

impl TraceParser {
    pub fn new(device: DeviceInfo, decode: bool) -> TraceParser {
        TraceParser {
            device,
            decode,
            state: State::AwaitActivity,
            activity: None,
            decor_seen: false,
            last: None,
        }
    }

    /// Consumes one trace line, possibly appending a finished event to
    /// *packer*.
    pub fn feed(&mut self, line: &str, packer: &mut Packer) -> Result<()> {
        if let Some(buffer) = line.strip_prefix(CRASH_MARKER) {
            if buffer.starts_with("crash") {
                return Err(illegal("the recorded app crashed"));
            }
            return Ok(());
        }
        match self.state {
            State::AwaitActivity => self.feed_await_activity(line),
            State::InActivity => self.feed_in_activity(line),
            State::AwaitEvent => self.feed_await_event(line, packer),
        }
    }

    fn feed_await_activity(&mut self, line: &str) -> Result<()> {
        if let Some(caps) = ACTIVITY_BEGIN.captures(line) {
            self.activity = Some(Rc::new(Activity::new(&caps["pkg"], &caps["name"], &self.device)));
            self.decor_seen = false;
            self.last = None;
            self.state = State::InActivity;
            return Ok(());
        }
        if POSITION_EVENT.is_match(line) || SWIPE_EVENT.is_match(line) || KEY_EVENT.is_match(line) {
            return Err(illegal(format!("event before activity: {:?}", line)));
        }
        if ACTIVITY_END.is_match(line) {
            return Err(illegal(format!("activity end without begin: {:?}", line)));
        }
        debug!("skipping line outside an activity window: {:?}", line);
        Ok(())
    }

    fn feed_in_activity(&mut self, line: &str) -> Result<()> {
        let activity = self.activity.clone()
            .ok_or(Error::CannotReachHere("no activity under construction"))?;

        if !self.decor_seen {
            if line.trim_start().starts_with("DecorView") {
                self.decor_seen = true;
                self.last = Some((Rc::clone(&activity.decor), 0));
                return Ok(());
            }
            return Err(illegal(format!("expected the decor view line: {:?}", line)));
        }

        if let Some(caps) = ACTIVITY_END.captures(line) {
            if &caps["pkg"] != activity.app || &caps["name"] != activity.name {
                return Err(illegal(format!("activity end mismatch: got {} {}, expected {} {}",
                                           &caps["pkg"], &caps["name"], activity.app, activity.name)));
            }
            self.last = None;
            self.state = State::AwaitEvent;
            return Ok(());
        }

        let caps = VIEW_LINE.captures(line)
            .ok_or_else(|| illegal(format!("unrecognized view line: {:?}", line)))?;
        self.push_view(&caps, &activity)
    }

    fn push_view(&mut self, caps: &Captures, activity: &Rc<Activity>) -> Result<()> {
        let depth = caps["pad"].len();
        let (last, last_depth) = self.last.clone()
            .ok_or(Error::CannotReachHere("no previous view in the activity window"))?;
        let delta = depth as i64 - last_depth as i64;
        if delta > 1 {
            return Err(illegal(format!("view depth jumped from {} to {}", last_depth, depth)));
        }

        // Climb 0 levels for a child, 1 for a sibling, 1 + |delta| above that.
        let mut parent = last;
        for _ in 0..(1 - delta) {
            let up = parent.borrow().parent()
                .ok_or_else(|| illegal(format!("view depth underflow at depth {}", depth)))?;
            parent = up;
        }

        let kind = if let Some(item) = caps.name("pgr") {
            ViewKind::Pager { curr_item: num(item.as_str())? }
        } else if let Some(tab) = caps.name("tab") {
            ViewKind::TabHost { curr_tab: num(tab.as_str())? }
        } else {
            ViewKind::Other
        };

        let group: Vec<char> = caps["flags"].chars().collect();
        let own_visibility = Visibility::from_letter(group[0])
            .ok_or_else(|| illegal(format!("unknown visibility letter: {:?}", group[0])))?;
        let mut flags = ViewFlags::empty();
        for (index, flag) in TRACE_FLAGS {
            if group[index] != '.' {
                flags |= flag;
            }
        }
        let pgroup: Vec<char> = caps["pflags"].chars().collect();
        if pgroup[1] != '.' {
            flags |= ViewFlags::FOCUSED;
        }
        if pgroup[2] != '.' {
            flags |= ViewFlags::SELECTED;
        }

        let view = View::new(kind, &caps["cls"], &activity.app);
        {
            let p = parent.borrow();
            let mut v = view.borrow_mut();
            let origin = p.rect.min;
            v.rect = crate::geom::Rectangle::new(
                origin + pt!(px(&caps["l"])?, px(&caps["t"])?),
                origin + pt!(px(&caps["r"])?, px(&caps["b"])?));
            v.translation = (p.translation.0 + px(&caps["tx"])?,
                             p.translation.1 + px(&caps["ty"])?,
                             p.translation.2 + px(&caps["tz"])?);
            v.scroll = p.scroll + pt!(px(&caps["sx"])?, px(&caps["sy"])?);
            v.visibility = Visibility::compose(p.visibility, own_visibility);
            v.flags = flags;
            if let (Some(rpkg), Some(rtype), Some(rentry)) =
                (caps.name("rpkg"), caps.name("rtype"), caps.name("rentry")) {
                v.res_pkg = rpkg.as_str().to_string();
                v.res_type = rtype.as_str().to_string();
                v.res_entry = rentry.as_str().to_string();
            }
            v.desc = self.field(&caps["desc"])?;
            v.text = self.field(&caps["text"])?;
        }
        view::attach(&parent, &view);
        self.last = Some((view, depth));
        Ok(())
    }

    fn field(&self, raw: &str) -> Result<String> {
        if self.decode {
            decode_b64(raw)
        } else {
            Ok(raw.to_string())
        }
    }

    fn feed_await_event(&mut self, line: &str, packer: &mut Packer) -> Result<()> {
        if let Some(caps) = POSITION_EVENT.captures(line) {
            let x = num(&caps["x"])?;
            let y = num(&caps["y"])?;
            let kind = match &caps["kind"] {
                "TAP" => EventKind::Tap { x, y },
                "LONG_TAP" => EventKind::LongTap { x, y },
                _ => EventKind::DoubleTap { x, y },
            };
            return self.emit(num(&caps["t"])?, kind, packer);
        }
        if let Some(caps) = SWIPE_EVENT.captures(line) {
            let t0 = num(&caps["t0"])?;
            let kind = EventKind::Swipe {
                x: num(&caps["x"])?,
                y: num(&caps["y"])?,
                dx: num(&caps["dx"])?,
                dy: num(&caps["dy"])?,
                t0,
                t1: num(&caps["t1"])?,
            };
            return self.emit(t0, kind, packer);
        }
        if let Some(caps) = KEY_EVENT.captures(line) {
            let kind = EventKind::Key {
                name: caps["name"].to_string(),
                code: num(&caps["code"])?,
            };
            return self.emit(num(&caps["t"])?, kind, packer);
        }
        if ACTIVITY_BEGIN.is_match(line) || ACTIVITY_END.is_match(line) {
            return Err(illegal(format!("expected an event, got an activity marker: {:?}", line)));
        }
        if let Some(caps) = EVENT_SHAPE.captures(line) {
            return Err(illegal(format!("unknown event type: {}", &caps["kind"])));
        }
        debug!("skipping line while awaiting an event: {:?}", line);
        Ok(())
    }

    fn emit(&mut self, t: i64, kind: EventKind, packer: &mut Packer) -> Result<()> {
        let activity = self.activity.take()
            .ok_or(Error::CannotReachHere("no activity for the pending event"))?;
        packer.append(Event::new(activity, t, kind));
        self.state = State::AwaitActivity;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::rect;
    use crate::view::find_view_by_xy;

    fn feed_all(parser: &mut TraceParser, packer: &mut Packer, lines: &[&str]) -> Result<()> {
        for line in lines {
            parser.feed(line, packer)?;
        }
        Ok(())
    }

    fn harness() -> (TraceParser, Packer) {
        let device = DeviceInfo::default();
        (TraceParser::new(device.clone(), false), Packer::new(device))
    }

    const PLAIN_TAIL: &str = r#"dx-tx=0 dx-ty=0 dx-tz=0 dx-sx=0 dx-sy=0 dx-desc="" dx-text="""#;

    #[test]
    fn depth_transitions_and_event_binding() {
        let (mut parser, mut packer) = harness();
        let root = format!(r#" android.widget.LinearLayout{{1a2b3c V.ED..... ........ 0,0-100,100 {}}}"#, PLAIN_TAIL);
        let a = format!(r#"  android.view.View{{2b3c4d V.ED..C.. ........ 10,10-90,90 #7f0900a1 com.x:id/panel_a {}}}"#, PLAIN_TAIL);
        let b = r#"   android.widget.Button{3c4d5e V.ED..C.. .F...... 10,10-30,30 dx-tx=0 dx-ty=0 dx-tz=0 dx-sx=0 dx-sy=0 dx-desc="" dx-text="Sign in"}"#.to_string();
        let c = format!(r#"  android.view.View{{4d5e6f V.ED..... ........ 10,50-90,80 {}}}"#, PLAIN_TAIL);
        let lines = [
            "com.x ACTIVITY_BEGIN .Main",
            "DecorView@5e6f7a[MainActivity]",
            root.as_str(),
            a.as_str(),
            b.as_str(),
            c.as_str(),
            "com.x ACTIVITY_END .Main",
            "com.x TAP 1000 25 25",
        ];
        feed_all(&mut parser, &mut packer, &lines).unwrap();

        assert_eq!(packer.pool_len(), 5);
        assert_eq!(packer.packs().len(), 1);
        let pack = &packer.packs()[0];
        assert_eq!(pack.t, 1000);
        assert_eq!(pack.kind, EventKind::Tap { x: 25, y: 25 });
        assert_eq!(pack.activity.app, "com.x");
        assert_eq!(pack.activity.name, ".Main");

        // Decor, then the container, then A with child B, then sibling C.
        let mut stream = Vec::new();
        pack.activity.tree.visit(&mut |value, count| stream.push((value, count)));
        assert_eq!(stream, vec![(0, 1), (1, 2), (2, 1), (3, 0), (4, 0)]);

        let views = packer.pool_views();
        assert_eq!(views[0].borrow().rect, rect![0, 0, 1080, 1920]);
        assert_eq!(views[2].borrow().res_id(), "com.x:id/panel_a");
        assert_eq!(views[3].borrow().rect, rect![20, 20, 40, 40]);
        assert_eq!(views[3].borrow().text, "Sign in");
        assert!(views[3].borrow().flags.contains(ViewFlags::FOCUSED));
    }

    #[test]
    fn geometry_accumulates_translation_and_scroll() {
        let (mut parser, mut packer) = harness();
        let list = r#" android.widget.ScrollView{1a2b3c V.ED.V... ........ 0,100-200,600 dx-tx=0 dx-ty=0 dx-tz=0 dx-sx=0 dx-sy=40 dx-desc="" dx-text=""}"#;
        let row = r#"  android.widget.TextView{2b3c4d V.ED..... ........ 0,0-200,50 dx-tx=5 dx-ty=0 dx-tz=0 dx-sx=0 dx-sy=0 dx-desc="" dx-text=""}"#;
        let lines = [
            "com.x ACTIVITY_BEGIN .List",
            "DecorView@5e6f7a[ListActivity]",
            list,
            row,
            "com.x ACTIVITY_END .List",
            "com.x TAP 10 50 80",
        ];
        feed_all(&mut parser, &mut packer, &lines).unwrap();

        let views = packer.pool_views();
        let list = &views[1];
        let row = &views[2];
        assert_eq!(list.borrow().scroll, pt!(0, 40));
        assert_eq!(row.borrow().rect, rect![0, 100, 200, 150]);
        assert_eq!(row.borrow().translation, (5, 0, 0));
        // The row is both translated and scrolled out from under the cursor.
        let event = packer.unpack(&packer.packs()[0].clone()).unwrap();
        let hit = find_view_by_xy(&event.activity.decor, 50, 80, true, false).unwrap();
        assert_eq!(hit.borrow().class, "android.widget.TextView");
    }

    #[test]
    fn visibility_composes_down_the_tree() {
        let (mut parser, mut packer) = harness();
        let hidden = r#" android.widget.FrameLayout{1a2b3c G.ED..... ........ 0,0-100,100 dx-tx=0 dx-ty=0 dx-tz=0 dx-sx=0 dx-sy=0 dx-desc="" dx-text=""}"#;
        let child = r#"  android.view.View{2b3c4d V.ED..... ........ 0,0-100,100 dx-tx=0 dx-ty=0 dx-tz=0 dx-sx=0 dx-sy=0 dx-desc="" dx-text=""}"#;
        let lines = [
            "com.x ACTIVITY_BEGIN .Main",
            "DecorView@5e6f7a[MainActivity]",
            hidden,
            child,
            "com.x ACTIVITY_END .Main",
            "com.x TAP 10 1 1",
        ];
        feed_all(&mut parser, &mut packer, &lines).unwrap();
        let views = packer.pool_views();
        assert_eq!(views[1].borrow().visibility, Visibility::Gone);
        assert_eq!(views[2].borrow().visibility, Visibility::Gone);
    }

    #[test]
    fn base64_fields_are_decoded_on_request() {
        let device = DeviceInfo::default();
        let mut parser = TraceParser::new(device.clone(), true);
        let mut packer = Packer::new(device);
        let label = r#" android.widget.TextView{1a2b3c V.ED..... ........ 0,0-100,100 dx-tx=0 dx-ty=0 dx-tz=0 dx-sx=0 dx-sy=0 dx-desc="aGVsbG8=" dx-text="d29ybGQ="}"#;
        let lines = [
            "com.x ACTIVITY_BEGIN .Main",
            "DecorView@5e6f7a[MainActivity]",
            label,
            "com.x ACTIVITY_END .Main",
            "com.x TAP 10 1 1",
        ];
        feed_all(&mut parser, &mut packer, &lines).unwrap();
        let views = packer.pool_views();
        assert_eq!(views[1].borrow().desc, "hello");
        assert_eq!(views[1].borrow().text, "world");
    }

    #[test]
    fn depth_jumps_are_fatal() {
        let (mut parser, mut packer) = harness();
        let too_deep = format!(r#"  android.view.View{{1a2b3c V.ED..... ........ 0,0-10,10 {}}}"#, PLAIN_TAIL);
        let lines = [
            "com.x ACTIVITY_BEGIN .Main",
            "DecorView@5e6f7a[MainActivity]",
            too_deep.as_str(),
        ];
        let err = feed_all(&mut parser, &mut packer, &lines).unwrap_err();
        assert!(matches!(err, Error::IllegalState(_)));
    }

    #[test]
    fn activity_end_must_match() {
        let (mut parser, mut packer) = harness();
        let lines = [
            "com.x ACTIVITY_BEGIN .Main",
            "DecorView@5e6f7a[MainActivity]",
            "com.x ACTIVITY_END .Other",
        ];
        let err = feed_all(&mut parser, &mut packer, &lines).unwrap_err();
        assert!(matches!(err, Error::IllegalState(_)));
    }

    #[test]
    fn event_before_activity_is_fatal() {
        let (mut parser, mut packer) = harness();
        let err = parser.feed("com.x TAP 1000 25 25", &mut packer).unwrap_err();
        assert!(matches!(err, Error::IllegalState(_)));
    }

    #[test]
    fn missing_decor_is_fatal() {
        let (mut parser, mut packer) = harness();
        parser.feed("com.x ACTIVITY_BEGIN .Main", &mut packer).unwrap();
        let view = format!(r#" android.view.View{{1a2b3c V.ED..... ........ 0,0-10,10 {}}}"#, PLAIN_TAIL);
        let err = parser.feed(&view, &mut packer).unwrap_err();
        assert!(matches!(err, Error::IllegalState(_)));
    }

    #[test]
    fn unknown_event_types_are_fatal() {
        let (mut parser, mut packer) = harness();
        let lines = [
            "com.x ACTIVITY_BEGIN .Main",
            "DecorView@5e6f7a[MainActivity]",
            "com.x ACTIVITY_END .Main",
        ];
        feed_all(&mut parser, &mut packer, &lines).unwrap();
        let err = parser.feed("com.x FLING 1000 2 3", &mut packer).unwrap_err();
        assert!(matches!(err, Error::IllegalState(_)));
    }

    #[test]
    fn crash_marker_aborts_the_recording() {
        let (mut parser, mut packer) = harness();
        parser.feed("--------- beginning of main", &mut packer).unwrap();
        let err = parser.feed("--------- beginning of crash", &mut packer).unwrap_err();
        assert!(matches!(err, Error::IllegalState(_)));
    }

    #[test]
    fn pager_views_restrict_hit_testing() {
        let (mut parser, mut packer) = harness();
        let pager = r#" androidx.viewpager.widget.ViewPager{1a2b3c V.ED..... ........ 0,0-100,100 dx-tx=0 dx-ty=0 dx-tz=0 dx-sx=0 dx-sy=0 dx-desc="" dx-text="" dx-pgr-curr=1}"#;
        let p0 = format!(r#"  android.view.View{{2b3c4d V.ED..... ........ 0,0-100,100 {}}}"#, PLAIN_TAIL);
        let p1 = r#"  android.view.View{3c4d5e V.ED..... ........ 0,0-100,100 dx-tx=0 dx-ty=0 dx-tz=0 dx-sx=0 dx-sy=0 dx-desc="page one" dx-text=""}"#;
        let lines = [
            "com.x ACTIVITY_BEGIN .Pages",
            "DecorView@5e6f7a[PagesActivity]",
            pager,
            p0.as_str(),
            p1,
            "com.x ACTIVITY_END .Pages",
            "com.x TAP 10 50 50",
        ];
        feed_all(&mut parser, &mut packer, &lines).unwrap();
        let event = packer.unpack(&packer.packs()[0].clone()).unwrap();
        let hit = find_view_by_xy(&event.activity.decor, 50, 50, true, false).unwrap();
        assert_eq!(hit.borrow().desc, "page one");
    }
}
