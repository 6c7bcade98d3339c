//! View-pool packer and the DXPK archive codec.
//!
//! Appending an event dismantles its activity's view tree into a pool of
//! structurally distinct views and an index tree that mirrors the original
//! topology. The archive is a line-oriented UTF-8 rendition of the device
//! snapshot, the pool and the event sequence; a dump/load round trip is
//! bit-exact modulo the trailing newline.

use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;
use fxhash::{FxBuildHasher, FxHashMap};
use indexmap::IndexMap;
use crate::device::DeviceInfo;
use crate::errors::{Error, Result};
use crate::event::{Event, EventKind, EventSeq};
use crate::geom::{Point, Rectangle};
use crate::helpers::{decode_b64, encode_b64};
use crate::ktree::KTree;
use crate::pt;
use crate::view::{self, Activity, KindTag, View, ViewFlags, ViewKind, ViewRef, Visibility};

// Canonical 11-character flags field: visibility, then one letter per flag.
const FLAG_LETTERS: [(char, ViewFlags); 10] = [
    ('F', ViewFlags::FOCUSABLE),
    ('f', ViewFlags::FOCUSED),
    ('E', ViewFlags::ENABLED),
    ('S', ViewFlags::SELECTED),
    ('D', ViewFlags::DRAWABLE),
    ('H', ViewFlags::H_SCROLLABLE),
    ('V', ViewFlags::V_SCROLLABLE),
    ('C', ViewFlags::CLICKABLE),
    ('L', ViewFlags::LONG_CLICKABLE),
    ('X', ViewFlags::CONTEXT_CLICKABLE),
];

fn malformed<S: Into<String>>(message: S) -> Error {
    Error::IllegalState(message.into())
}

pub fn encode_flags(visibility: Visibility, flags: ViewFlags) -> String {
    let mut out = String::with_capacity(11);
    out.push(visibility.letter());
    for (letter, flag) in FLAG_LETTERS {
        out.push(if flags.contains(flag) { letter } else { '.' });
    }
    out
}

pub fn decode_flags(field: &str) -> Result<(Visibility, ViewFlags)> {
    let chars: Vec<char> = field.chars().collect();
    if chars.len() != 11 {
        return Err(malformed(format!("flags field must be 11 characters: {:?}", field)));
    }
    let visibility = Visibility::from_letter(chars[0])
        .ok_or_else(|| malformed(format!("unknown visibility letter: {:?}", chars[0])))?;
    let mut flags = ViewFlags::empty();
    for (index, (_, flag)) in FLAG_LETTERS.iter().enumerate() {
        if chars[index + 1] != '.' {
            flags |= *flag;
        }
    }
    Ok((visibility, flags))
}

/// The attributes two views are compared on when deduplicating the pool.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct ViewKey {
    class: String,
    rect: Rectangle,
    translation: (i32, i32, i32),
    scroll: Point,
    res_id: String,
    desc: String,
    text: String,
    visibility: Visibility,
    flags: ViewFlags,
}

impl ViewKey {
    fn of(view: &View) -> ViewKey {
        ViewKey {
            class: view.class.clone(),
            rect: view.rect,
            translation: view.translation,
            scroll: view.scroll,
            res_id: view.res_id(),
            desc: view.desc.clone(),
            text: view.text.clone(),
            visibility: view.visibility,
            flags: view.flags,
        }
    }
}

/// Free list of recycled view instances, bucketed by kind. A size-only
/// optimization: recycled instances are reset before reuse, so cached
/// identity is never observable.
#[derive(Debug, Default)]
struct ViewCache {
    buckets: FxHashMap<KindTag, Vec<ViewRef>>,
}

impl ViewCache {
    fn put(&mut self, view: ViewRef) {
        let tag = view.borrow().kind.tag();
        self.buckets.entry(tag).or_default().push(view);
    }

    fn take(&mut self, kind: ViewKind, class: &str, package: &str) -> ViewRef {
        match self.buckets.get_mut(&kind.tag()).and_then(Vec::pop) {
            Some(view) => {
                view.borrow_mut().reset(kind, class, package);
                view
            },
            None => View::new(kind, class, package),
        }
    }
}

/// The shape of one activity inside an archive: the app and activity that
/// produced it, and the index tree over the view pool. The activity name is
/// kept for the recording session only; the wire format drops it.
#[derive(Debug, Clone)]
pub struct ActivityPack {
    pub app: String,
    pub name: String,
    pub tree: KTree,
}

#[derive(Debug, Clone)]
pub struct EventPack {
    pub t: i64,
    pub kind: EventKind,
    pub activity: ActivityPack,
}

pub struct Packer {
    device: DeviceInfo,
    app: Option<String>,
    pool: IndexMap<ViewKey, ViewRef, FxBuildHasher>,
    seq: Vec<EventPack>,
    cache: ViewCache,
}

impl Packer {
    pub fn new(device: DeviceInfo) -> Packer {
        Packer {
            device,
            app: None,
            pool: IndexMap::with_hasher(FxBuildHasher::default()),
            seq: Vec::new(),
            cache: ViewCache::default(),
        }
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn app(&self) -> Option<&str> {
        self.app.as_deref()
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    pub fn pool_views(&self) -> Vec<ViewRef> {
        self.pool.values().map(Rc::clone).collect()
    }

    pub fn packs(&self) -> &[EventPack] {
        &self.seq
    }

    /// Packs *event*: dismantles its activity's view tree into the pool and
    /// stores the event payload with the resulting index tree.
    pub fn append(&mut self, event: Event) {
        if self.app.is_none() {
            self.app = Some(event.activity.app.clone());
        }
        let tree = self.pack_view(&Rc::clone(&event.activity.decor));
        self.seq.push(EventPack {
            t: event.t,
            kind: event.kind,
            activity: ActivityPack {
                app: event.activity.app.clone(),
                name: event.activity.name.clone(),
                tree,
            },
        });
    }

    fn pack_view(&mut self, node: &ViewRef) -> KTree {
        let children: Vec<ViewRef> = node.borrow().children().to_vec();
        view::detach(node);
        let key = ViewKey::of(&node.borrow());
        let index = match self.pool.get_index_of(&key) {
            Some(index) => {
                // Redundant instance, recycle it.
                self.cache.put(Rc::clone(node));
                index
            },
            None => {
                self.pool.insert(key, Rc::clone(node));
                self.pool.len() - 1
            },
        };
        let mut tree = KTree::new(index);
        for child in &children {
            tree.add_child_tree(self.pack_view(child));
        }
        tree
    }

    /// Rebuilds a live event from a pack: copies the pooled views back into
    /// a fresh tree, installs it into a new activity and rebinds the event.
    pub fn unpack(&mut self, pack: &EventPack) -> Result<Event> {
        let decor = self.unpack_view(&pack.activity.tree)?;
        if decor.borrow().kind.tag() != KindTag::Decor {
            return Err(malformed("expected a decor view at the root of a packed activity"));
        }
        let activity = Rc::new(Activity::with_decor(&pack.activity.app, &pack.activity.name, decor));
        Ok(Event::new(activity, pack.t, pack.kind.clone()))
    }

    fn unpack_view(&mut self, tree: &KTree) -> Result<ViewRef> {
        let entry = self.pool.get_index(tree.value())
                        .map(|(_, v)| Rc::clone(v))
                        .ok_or_else(|| malformed(format!("view pool index {} out of range", tree.value())))?;
        let copy = {
            let source = entry.borrow();
            let copy = self.cache.take(source.kind, &source.class, &source.package);
            copy.borrow_mut().assign_from(&source);
            copy
        };
        for child in tree.children() {
            let child = self.unpack_view(child)?;
            view::attach(&copy, &child);
        }
        Ok(copy)
    }

    /// Unpacks the whole sequence, in recording order.
    pub fn unpack_all(&mut self) -> Result<EventSeq> {
        let packs = self.seq.clone();
        let mut seq = EventSeq::new();
        for pack in &packs {
            seq.push(self.unpack(pack)?);
        }
        Ok(seq)
    }

    pub fn dump(&self) -> String {
        let mut out = String::new();
        let d = &self.device;
        out.push_str(&format!("{};{};{};{};{};{};{};{};{}\n",
                              d.brand, d.model, d.abi, d.board,
                              d.width, d.height, d.dpi, d.sdk_level, d.release_version));
        out.push_str(self.app.as_deref().unwrap_or(""));
        out.push('\n');
        out.push_str(&format!("{}\n", self.pool.len()));
        for entry in self.pool.values() {
            dump_view(&entry.borrow(), &mut out);
        }
        out.push_str(&format!("{}\n", self.seq.len()));
        for pack in &self.seq {
            dump_event(pack, &mut out);
        }
        out
    }

    /// Writes the archive in one shot after assembling the whole buffer.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.dump())?;
        Ok(())
    }

    pub fn load(text: &str) -> Result<Packer> {
        let mut lines = text.lines();
        let device = parse_device_line(next_line(&mut lines)?)?;
        let app = next_line(&mut lines)?.to_string();
        let mut packer = Packer::new(device);
        packer.app = if app.is_empty() { None } else { Some(app.clone()) };

        let pool_len: usize = parse_num(next_line(&mut lines)?, "pool size")?;
        for _ in 0..pool_len {
            let entry = parse_view_line(next_line(&mut lines)?, &app)?;
            let key = ViewKey::of(&entry.borrow());
            if packer.pool.insert(key, entry).is_some() {
                return Err(malformed("duplicate view pool entry"));
            }
        }

        let seq_len: usize = parse_num(next_line(&mut lines)?, "sequence size")?;
        for _ in 0..seq_len {
            let (tree, kind, t) = parse_event_line(next_line(&mut lines)?)?;
            packer.seq.push(EventPack {
                t,
                kind,
                activity: ActivityPack {
                    app: app.clone(),
                    name: String::new(),
                    tree,
                },
            });
        }

        for extra in lines {
            if !extra.trim().is_empty() {
                return Err(malformed("trailing data after the event sequence"));
            }
        }
        Ok(packer)
    }

    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Packer> {
        let text = fs::read_to_string(path)?;
        Packer::load(&text)
    }
}

fn next_line<'a, I>(lines: &mut I) -> Result<&'a str> where I: Iterator<Item = &'a str> {
    lines.next().ok_or_else(|| malformed("truncated archive"))
}

fn parse_num<T: FromStr>(field: &str, what: &str) -> Result<T> {
    field.parse().map_err(|_| malformed(format!("invalid {}: {:?}", what, field)))
}

fn parse_device_line(line: &str) -> Result<DeviceInfo> {
    let fields: Vec<&str> = line.split(';').collect();
    if fields.len() != 9 {
        return Err(malformed(format!("device line must have 9 fields: {:?}", line)));
    }
    Ok(DeviceInfo {
        brand: fields[0].to_string(),
        model: fields[1].to_string(),
        abi: fields[2].to_string(),
        board: fields[3].to_string(),
        width: parse_num(fields[4], "device width")?,
        height: parse_num(fields[5], "device height")?,
        dpi: parse_num(fields[6], "device dpi")?,
        sdk_level: parse_num(fields[7], "device SDK level")?,
        release_version: fields[8].to_string(),
    })
}

fn dump_view(view: &View, out: &mut String) {
    out.push_str(&format!("{};{};{};{};{};{};{};{};{};{};{};{};{};{};{};{};{};{};{}",
                          view.kind.tag().letter(), view.class,
                          view.res_pkg, view.res_type, view.res_entry,
                          view.rect.min.x, view.rect.min.y, view.rect.max.x, view.rect.max.y,
                          view.translation.0, view.translation.1, view.translation.2,
                          view.scroll.x, view.scroll.y,
                          encode_b64(&view.desc), encode_b64(&view.text),
                          view.bg_class, view.bg_color.as_deref().unwrap_or("."),
                          encode_flags(view.visibility, view.flags)));
    match view.kind {
        ViewKind::Pager { curr_item } => out.push_str(&format!(";{}", curr_item)),
        ViewKind::TabHost { curr_tab } => out.push_str(&format!(";{}", curr_tab)),
        _ => (),
    }
    out.push('\n');
}

fn parse_view_line(line: &str, app: &str) -> Result<ViewRef> {
    let fields: Vec<&str> = line.split(';').collect();
    if fields.len() < 19 {
        return Err(malformed(format!("truncated view line: {:?}", line)));
    }
    let mut letters = fields[0].chars();
    let tag = letters.next()
                     .filter(|_| letters.next().is_none())
                     .and_then(KindTag::from_letter)
                     .ok_or_else(|| malformed(format!("unknown view kind: {:?}", fields[0])))?;
    let expected = match tag {
        KindTag::Pager | KindTag::TabHost => 20,
        _ => 19,
    };
    if fields.len() != expected {
        return Err(malformed(format!("view line must have {} fields: {:?}", expected, line)));
    }
    let kind = match tag {
        KindTag::Decor => ViewKind::Decor,
        KindTag::Pager => ViewKind::Pager { curr_item: parse_num(fields[19], "pager item")? },
        KindTag::TabHost => ViewKind::TabHost { curr_tab: parse_num(fields[19], "tab index")? },
        KindTag::Other => ViewKind::Other,
    };
    let (visibility, flags) = decode_flags(fields[18])?;

    let view = View::new(kind, fields[1], app);
    {
        let mut v = view.borrow_mut();
        v.res_pkg = fields[2].to_string();
        v.res_type = fields[3].to_string();
        v.res_entry = fields[4].to_string();
        v.rect = Rectangle::new(pt!(parse_num(fields[5], "left")?, parse_num(fields[6], "top")?),
                                pt!(parse_num(fields[7], "right")?, parse_num(fields[8], "bottom")?));
        v.translation = (parse_num(fields[9], "tx")?,
                         parse_num(fields[10], "ty")?,
                         parse_num(fields[11], "tz")?);
        v.scroll = pt!(parse_num(fields[12], "sx")?, parse_num(fields[13], "sy")?);
        v.desc = decode_b64(fields[14])?;
        v.text = decode_b64(fields[15])?;
        v.bg_class = fields[16].to_string();
        v.bg_color = if fields[17] == "." { None } else { Some(fields[17].to_string()) };
        v.visibility = visibility;
        v.flags = flags;
    }
    Ok(view)
}

fn dump_event(pack: &EventPack, out: &mut String) {
    pack.activity.tree.visit(&mut |value, count| {
        out.push_str(&format!("{},{};", value, count));
    });
    out.push_str(pack.kind.type_name());
    match &pack.kind {
        EventKind::Tap { x, y } |
        EventKind::LongTap { x, y } |
        EventKind::DoubleTap { x, y } => {
            out.push_str(&format!(";{};{};{}", x, y, pack.t));
        },
        EventKind::Swipe { x, y, dx, dy, t0, t1 } => {
            out.push_str(&format!(";{};{};{};{};{};{}", x, y, dx, dy, t0, t1));
        },
        EventKind::Key { name, code } => {
            out.push_str(&format!(";{};{};{}", name, code, pack.t));
        },
    }
    out.push('\n');
}

fn tree_token(token: &str) -> Option<(usize, usize)> {
    let (value, count) = token.split_once(',')?;
    Some((value.parse().ok()?, count.parse().ok()?))
}

// The index tree is streamed as `value,childCount;` tokens in visit order.
// Reading keeps a descent stack of open nodes and unwinds it as their child
// counters run out; the tree is complete when the stack empties.
fn read_tree<'a, I>(tokens: &mut I) -> Result<KTree> where I: Iterator<Item = &'a str> {
    let mut stack: Vec<(KTree, usize)> = Vec::new();
    loop {
        let token = tokens.next().ok_or_else(|| malformed("truncated event line"))?;
        let (value, count) = tree_token(token)
            .ok_or_else(|| malformed(format!("expected an index tree token: {:?}", token)))?;
        let node = KTree::new(value);
        if count > 0 {
            stack.push((node, count));
            continue;
        }
        let mut done = node;
        loop {
            match stack.pop() {
                None => return Ok(done),
                Some((mut parent, remaining)) => {
                    parent.add_child_tree(done);
                    if remaining == 1 {
                        done = parent;
                    } else {
                        stack.push((parent, remaining - 1));
                        break;
                    }
                },
            }
        }
    }
}

fn parse_event_line(line: &str) -> Result<(KTree, EventKind, i64)> {
    let mut tokens = line.split(';');
    let tree = read_tree(&mut tokens)?;
    let mut next = |what: &str| {
        tokens.next().ok_or_else(|| malformed(format!("truncated event line, missing {}", what)))
    };
    let type_name = next("event type")?;
    let (kind, t) = match type_name {
        "tap" | "long-tap" | "double-tap" => {
            let x = parse_num(next("x")?, "x")?;
            let y = parse_num(next("y")?, "y")?;
            let t = parse_num(next("t")?, "t")?;
            let kind = match type_name {
                "tap" => EventKind::Tap { x, y },
                "long-tap" => EventKind::LongTap { x, y },
                _ => EventKind::DoubleTap { x, y },
            };
            (kind, t)
        },
        "swipe" => {
            let x = parse_num(next("x")?, "x")?;
            let y = parse_num(next("y")?, "y")?;
            let dx = parse_num(next("dx")?, "dx")?;
            let dy = parse_num(next("dy")?, "dy")?;
            let t0 = parse_num(next("t0")?, "t0")?;
            let t1 = parse_num(next("t1")?, "t1")?;
            (EventKind::Swipe { x, y, dx, dy, t0, t1 }, t0)
        },
        "key" => {
            let name = next("key name")?.to_string();
            let code = parse_num(next("key code")?, "key code")?;
            let t = parse_num(next("t")?, "t")?;
            (EventKind::Key { name, code }, t)
        },
        _ => return Err(malformed(format!("unknown event type: {:?}", type_name))),
    };
    if tokens.next().is_some() {
        return Err(malformed(format!("trailing data in event line: {:?}", line)));
    }
    Ok((tree, kind, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect;
    use crate::view::{attach, tree_eq};

    fn s1_device() -> DeviceInfo {
        DeviceInfo {
            board: "sdm845".to_string(),
            brand: "OnePlus".to_string(),
            model: "OP6T".to_string(),
            abi: "arm64-v8a".to_string(),
            width: 1080,
            height: 2280,
            dpi: 420,
            sdk_level: 28,
            release_version: "9".to_string(),
        }
    }

    fn tap_event(device: &DeviceInfo, name: &str, t: i64, x: i32, y: i32) -> Event {
        let activity = Rc::new(Activity::new("com.x", name, device));
        Event::new(activity, t, EventKind::Tap { x, y })
    }

    fn child(parent: &ViewRef, class: &str, rect: Rectangle, text: &str) -> ViewRef {
        let view = View::new(ViewKind::Other, class, "com.x");
        view.borrow_mut().rect = rect;
        view.borrow_mut().text = text.to_string();
        attach(parent, &view);
        view
    }

    #[test]
    fn one_view_one_tap_archive() {
        let device = s1_device();
        let mut packer = Packer::new(device.clone());
        packer.append(tap_event(&device, ".Main", 1000, 540, 1140));

        let expected = "\
OnePlus;OP6T;arm64-v8a;sdm845;1080;2280;420;28;9
com.x
1
d;com.android.internal.policy.DecorView;;;;0;0;1080;2280;0;0;0;0;0;;;;.;V..E.D.....
1
0,0;tap;540;1140;1000
";
        assert_eq!(packer.dump(), expected);

        let loaded = Packer::load(expected).unwrap();
        assert_eq!(loaded.dump(), expected);
        assert_eq!(loaded.device(), &device);
        assert_eq!(loaded.app(), Some("com.x"));
        assert_eq!(loaded.pool_len(), 1);
        assert_eq!(loaded.packs().len(), 1);
    }

    #[test]
    fn pool_dedups_structurally_equal_views() {
        let device = s1_device();
        let mut packer = Packer::new(device.clone());
        packer.append(tap_event(&device, ".Main", 1000, 10, 10));
        packer.append(tap_event(&device, ".Main", 2000, 20, 20));
        assert_eq!(packer.pool_len(), 1);
        assert_eq!(packer.packs().len(), 2);
        let mut stream = Vec::new();
        packer.packs()[1].activity.tree.visit(&mut |value, count| stream.push((value, count)));
        assert_eq!(stream, vec![(0, 0)]);
    }

    #[test]
    fn unpack_restores_the_tree_and_rebinds_the_event() {
        let device = s1_device();
        let build = |name: &str| {
            let activity = Rc::new(Activity::new("com.x", name, &device));
            let root = child(&activity.decor, "android.widget.FrameLayout", rect![0, 0, 1080, 2280], "");
            let button = child(&root, "android.widget.Button", rect![100, 200, 300, 260], "Sign in");
            button.borrow_mut().res_entry = "sign_in".to_string();
            button.borrow_mut().res_type = "id".to_string();
            button.borrow_mut().res_pkg = "com.x".to_string();
            child(&root, "android.widget.TextView", rect![100, 300, 300, 360], "Welcome");
            activity
        };

        let mut packer = Packer::new(device.clone());
        packer.append(Event::new(build(".Main"), 1000, EventKind::Tap { x: 150, y: 220 }));
        assert_eq!(packer.pool_len(), 4);

        let pack = packer.packs()[0].clone();
        let event = packer.unpack(&pack).unwrap();
        assert_eq!(event.t, 1000);
        assert_eq!(event.kind, EventKind::Tap { x: 150, y: 220 });
        assert_eq!(event.activity.app, "com.x");
        assert_eq!(event.activity.name, ".Main");

        let reference = build(".Main");
        assert!(tree_eq(&event.activity.decor, &reference.decor));
    }

    #[test]
    fn unpacked_events_are_independent() {
        let device = s1_device();
        let mut packer = Packer::new(device.clone());
        packer.append(tap_event(&device, ".Main", 1000, 10, 10));
        packer.append(tap_event(&device, ".Main", 2000, 20, 20));
        let seq = packer.unpack_all().unwrap();
        assert_eq!(seq.len(), 2);
        let events = seq.top_n(2);
        assert!(!Rc::ptr_eq(&events[0].activity, &events[1].activity));
        assert!(!Rc::ptr_eq(&events[0].activity.decor, &events[1].activity.decor));
    }

    #[test]
    fn flags_field_round_trip() {
        let all = ViewFlags::all();
        let field = encode_flags(Visibility::Gone, all);
        assert_eq!(field, "GFfESDHVCLX");
        assert_eq!(decode_flags(&field).unwrap(), (Visibility::Gone, all));
        assert_eq!(decode_flags("V..E.D.....").unwrap(),
                   (Visibility::Visible, ViewFlags::ENABLED | ViewFlags::DRAWABLE));
        assert!(decode_flags("Z..E.D.....").is_err());
        assert!(decode_flags("V..E.D....").is_err());
    }

    #[test]
    fn pager_extra_field_round_trip() {
        let device = s1_device();
        let activity = Rc::new(Activity::new("com.x", ".Pages", &device));
        let pager = View::new(ViewKind::Pager { curr_item: 2 },
                              "androidx.viewpager.widget.ViewPager", "com.x");
        pager.borrow_mut().rect = rect![0, 0, 1080, 2280];
        attach(&activity.decor, &pager);
        let mut packer = Packer::new(device);
        packer.append(Event::new(activity, 50, EventKind::Tap { x: 5, y: 5 }));

        let dumped = packer.dump();
        assert!(dumped.contains("p;androidx.viewpager.widget.ViewPager"));
        assert!(dumped.lines().any(|line| line.ends_with(";2")));
        let loaded = Packer::load(&dumped).unwrap();
        assert_eq!(loaded.dump(), dumped);
    }

    #[test]
    fn load_rejects_malformed_archives() {
        let device = s1_device();
        let mut packer = Packer::new(device.clone());
        packer.append(tap_event(&device, ".Main", 1000, 540, 1140));
        let good = packer.dump();

        // Unknown kind letter.
        let bad = good.replace("d;com.android", "z;com.android");
        assert!(matches!(Packer::load(&bad), Err(Error::IllegalState(_))));

        // Unknown event type.
        let bad = good.replace(";tap;", ";fling;");
        assert!(matches!(Packer::load(&bad), Err(Error::IllegalState(_))));

        // Truncated event line.
        let bad = good.replace("0,0;tap;540;1140;1000", "0,0;tap;540");
        assert!(matches!(Packer::load(&bad), Err(Error::IllegalState(_))));

        // Sequence size promises more than the archive holds.
        let bad = good.replace("\n1\n0,0;tap", "\n2\n0,0;tap");
        assert!(matches!(Packer::load(&bad), Err(Error::IllegalState(_))));

        // Section order matters: the pool size line can't be skipped.
        let bad = good.replacen("com.x\n1\n", "com.x\n", 1);
        assert!(matches!(Packer::load(&bad), Err(Error::IllegalState(_))));
    }

    #[test]
    fn unpack_rejects_non_decor_roots() {
        let device = s1_device();
        let activity = Rc::new(Activity::new("com.x", ".Main", &device));
        let inner = child(&activity.decor, "android.widget.FrameLayout", rect![0, 0, 10, 10], "");
        let mut packer = Packer::new(device);
        // Pack an event whose tree is rooted at a plain container.
        let tree = packer.pack_view(&inner);
        let pack = EventPack {
            t: 1,
            kind: EventKind::Tap { x: 1, y: 1 },
            activity: ActivityPack { app: "com.x".to_string(), name: String::new(), tree },
        };
        assert!(matches!(packer.unpack(&pack), Err(Error::IllegalState(_))));
    }
}
