//! In-memory model of one activity's view hierarchy.
//!
//! Children own their subtrees; the parent link is a non-owning back
//! reference. Geometry is stored absolute: a view's layout rectangle,
//! translation and scroll are the accumulated values from the root down, so
//! the drawing rectangle of a view is its layout rectangle shifted by its own
//! translation minus its parent's scroll.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use bitflags::bitflags;
use crate::device::DeviceInfo;
use crate::geom::{Point, Rectangle};
use crate::pt;

pub const DECOR_CLASS: &str = "com.android.internal.policy.DecorView";

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Visibility {
    Visible,
    Invisible,
    Gone,
}

impl Visibility {
    /// Effective visibility of a child under *parent*: a gone ancestor hides
    /// the subtree, an invisible ancestor dims visible descendants.
    pub fn compose(parent: Visibility, own: Visibility) -> Visibility {
        match parent {
            Visibility::Gone => Visibility::Gone,
            Visibility::Invisible if own == Visibility::Visible => Visibility::Invisible,
            _ => own,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Visibility::Visible => 'V',
            Visibility::Invisible => 'I',
            Visibility::Gone => 'G',
        }
    }

    pub fn from_letter(letter: char) -> Option<Visibility> {
        match letter {
            'V' => Some(Visibility::Visible),
            'I' => Some(Visibility::Invisible),
            'G' => Some(Visibility::Gone),
            _ => None,
        }
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
    pub struct ViewFlags: u16 {
        const FOCUSABLE         = 1 << 0;
        const FOCUSED           = 1 << 1;
        const ENABLED           = 1 << 2;
        const SELECTED          = 1 << 3;
        const DRAWABLE          = 1 << 4;
        const H_SCROLLABLE      = 1 << 5;
        const V_SCROLLABLE      = 1 << 6;
        const CLICKABLE         = 1 << 7;
        const LONG_CLICKABLE    = 1 << 8;
        const CONTEXT_CLICKABLE = 1 << 9;
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ViewKind {
    Decor,
    Pager { curr_item: usize },
    TabHost { curr_tab: usize },
    Other,
}

impl ViewKind {
    pub fn tag(self) -> KindTag {
        match self {
            ViewKind::Decor => KindTag::Decor,
            ViewKind::Pager { .. } => KindTag::Pager,
            ViewKind::TabHost { .. } => KindTag::TabHost,
            ViewKind::Other => KindTag::Other,
        }
    }
}

/// The kind stripped of its state, used as the pack-cache bucket key and the
/// kind byte of the archive format.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum KindTag {
    Decor,
    Pager,
    TabHost,
    Other,
}

impl KindTag {
    pub fn letter(self) -> char {
        match self {
            KindTag::Decor => 'd',
            KindTag::Pager => 'p',
            KindTag::TabHost => 't',
            KindTag::Other => '.',
        }
    }

    pub fn from_letter(letter: char) -> Option<KindTag> {
        match letter {
            'd' => Some(KindTag::Decor),
            'p' => Some(KindTag::Pager),
            't' => Some(KindTag::TabHost),
            '.' => Some(KindTag::Other),
            _ => None,
        }
    }
}

pub type ViewRef = Rc<RefCell<View>>;

#[derive(Debug)]
pub struct View {
    pub kind: ViewKind,
    pub class: String,
    pub package: String,
    pub visibility: Visibility,
    pub flags: ViewFlags,
    /// Absolute layout rectangle, in device pixels.
    pub rect: Rectangle,
    /// Accumulated translation (tx, ty, tz).
    pub translation: (i32, i32, i32),
    /// Accumulated scroll offsets.
    pub scroll: Point,
    pub res_pkg: String,
    pub res_type: String,
    pub res_entry: String,
    pub desc: String,
    pub text: String,
    pub bg_class: String,
    pub bg_color: Option<String>,
    parent: Weak<RefCell<View>>,
    children: Vec<ViewRef>,
}

impl View {
    pub fn new(kind: ViewKind, class: &str, package: &str) -> ViewRef {
        Rc::new(RefCell::new(View {
            kind,
            class: class.to_string(),
            package: package.to_string(),
            visibility: Visibility::Visible,
            flags: ViewFlags::ENABLED | ViewFlags::DRAWABLE,
            rect: Rectangle::default(),
            translation: (0, 0, 0),
            scroll: Point::default(),
            res_pkg: String::new(),
            res_type: String::new(),
            res_entry: String::new(),
            desc: String::new(),
            text: String::new(),
            bg_class: String::new(),
            bg_color: None,
            parent: Weak::new(),
            children: Vec::new(),
        }))
    }

    /// The root container of an activity, sized to the device extents.
    pub fn new_decor(package: &str, width: u32, height: u32) -> ViewRef {
        let decor = View::new(ViewKind::Decor, DECOR_CLASS, package);
        decor.borrow_mut().rect = Rectangle::new(pt!(0, 0), pt!(width as i32, height as i32));
        decor
    }

    pub fn children(&self) -> &[ViewRef] {
        &self.children
    }

    pub fn parent(&self) -> Option<ViewRef> {
        self.parent.upgrade()
    }

    /// `pkg:type/entry`, or empty when the view carries no resource identity.
    pub fn res_id(&self) -> String {
        if self.res_entry.is_empty() {
            String::new()
        } else {
            format!("{}:{}/{}", self.res_pkg, self.res_type, self.res_entry)
        }
    }

    /// Restores the blank state of a freshly allocated view, so that recycled
    /// instances are indistinguishable from new ones.
    pub(crate) fn reset(&mut self, kind: ViewKind, class: &str, package: &str) {
        self.kind = kind;
        self.class.clear();
        self.class.push_str(class);
        self.package.clear();
        self.package.push_str(package);
        self.visibility = Visibility::Visible;
        self.flags = ViewFlags::ENABLED | ViewFlags::DRAWABLE;
        self.rect = Rectangle::default();
        self.translation = (0, 0, 0);
        self.scroll = Point::default();
        self.res_pkg.clear();
        self.res_type.clear();
        self.res_entry.clear();
        self.desc.clear();
        self.text.clear();
        self.bg_class.clear();
        self.bg_color = None;
        self.parent = Weak::new();
        self.children.clear();
    }

    /// Copies every value field of *other*, leaving the tree links alone.
    pub(crate) fn assign_from(&mut self, other: &View) {
        self.kind = other.kind;
        self.class = other.class.clone();
        self.package = other.package.clone();
        self.visibility = other.visibility;
        self.flags = other.flags;
        self.rect = other.rect;
        self.translation = other.translation;
        self.scroll = other.scroll;
        self.res_pkg = other.res_pkg.clone();
        self.res_type = other.res_type.clone();
        self.res_entry = other.res_entry.clone();
        self.desc = other.desc.clone();
        self.text = other.text.clone();
        self.bg_class = other.bg_class.clone();
        self.bg_color = other.bg_color.clone();
    }
}

/// Makes *child* the last child of *parent*, detaching it from any previous
/// parent first: a view is the child of at most one parent.
pub fn attach(parent: &ViewRef, child: &ViewRef) {
    detach(child);
    child.borrow_mut().parent = Rc::downgrade(parent);
    parent.borrow_mut().children.push(Rc::clone(child));
}

/// Severs the edge between *child* and its parent, if any.
pub fn detach(child: &ViewRef) {
    let parent = child.borrow().parent.upgrade();
    if let Some(parent) = parent {
        parent.borrow_mut().children.retain(|c| !Rc::ptr_eq(c, child));
    }
    child.borrow_mut().parent = Weak::new();
}

/// The rectangle a view occupies on screen: its layout rectangle shifted by
/// its own translation, minus the scroll of its parent.
pub fn drawing_rect(view: &ViewRef) -> Rectangle {
    let v = view.borrow();
    let scroll = v.parent()
                  .map(|parent| parent.borrow().scroll)
                  .unwrap_or_default();
    let (tx, ty, _) = v.translation;
    v.rect + pt!(tx, ty) - scroll
}

/// All views whose drawing rectangle contains `(x, y)`, innermost first:
/// children are visited before the view itself, so position 0 is the deepest
/// hit. A pager is only descended through its current item.
pub fn find_views_by_xy(root: &ViewRef, x: i32, y: i32, visible_only: bool, enabled_only: bool) -> Vec<ViewRef> {
    let mut hits = Vec::new();
    collect_views_by_xy(root, x, y, visible_only, enabled_only, &mut hits);
    hits
}

fn collect_views_by_xy(view: &ViewRef, x: i32, y: i32, visible_only: bool, enabled_only: bool, hits: &mut Vec<ViewRef>) {
    {
        let v = view.borrow();
        match v.kind {
            ViewKind::Pager { curr_item } => {
                if let Some(child) = v.children.get(curr_item) {
                    collect_views_by_xy(child, x, y, visible_only, enabled_only, hits);
                }
            },
            _ => {
                for child in &v.children {
                    collect_views_by_xy(child, x, y, visible_only, enabled_only, hits);
                }
            },
        }
    }

    let hit = {
        let v = view.borrow();
        drawing_rect(view).includes(pt!(x, y)) &&
        (!visible_only || v.visibility == Visibility::Visible) &&
        (!enabled_only || v.flags.contains(ViewFlags::ENABLED))
    };

    if hit {
        hits.push(Rc::clone(view));
    }
}

/// The innermost view at `(x, y)`, if any.
pub fn find_view_by_xy(root: &ViewRef, x: i32, y: i32, visible_only: bool, enabled_only: bool) -> Option<ViewRef> {
    find_views_by_xy(root, x, y, visible_only, enabled_only).into_iter().next()
}

/// All views whose displayed text contains *needle*, ignoring case, in
/// document order. Mirrors the device-side selector semantics on a
/// recorded tree.
pub fn find_views_by_text(root: &ViewRef, needle: &str) -> Vec<ViewRef> {
    find_views_by(root, &|v| contains_ignore_case(&v.text, needle))
}

/// All views whose description contains *needle*, ignoring case.
pub fn find_views_by_desc(root: &ViewRef, needle: &str) -> Vec<ViewRef> {
    find_views_by(root, &|v| contains_ignore_case(&v.desc, needle))
}

/// All views whose combined resource id contains *needle*, ignoring case.
pub fn find_views_by_res_id(root: &ViewRef, needle: &str) -> Vec<ViewRef> {
    find_views_by(root, &|v| contains_ignore_case(&v.res_id(), needle))
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn find_views_by(root: &ViewRef, accepts: &dyn Fn(&View) -> bool) -> Vec<ViewRef> {
    let mut found = Vec::new();
    collect_views_by(root, accepts, &mut found);
    found
}

fn collect_views_by(view: &ViewRef, accepts: &dyn Fn(&View) -> bool, found: &mut Vec<ViewRef>) {
    if accepts(&view.borrow()) {
        found.push(Rc::clone(view));
    }
    for child in view.borrow().children() {
        collect_views_by(child, accepts, found);
    }
}

/// Nearest ancestor that scrolls horizontally.
pub fn find_h_scrollable_parent(view: &ViewRef) -> Option<ViewRef> {
    find_scrollable_parent(view, ViewFlags::H_SCROLLABLE)
}

/// Nearest ancestor that scrolls vertically.
pub fn find_v_scrollable_parent(view: &ViewRef) -> Option<ViewRef> {
    find_scrollable_parent(view, ViewFlags::V_SCROLLABLE)
}

fn find_scrollable_parent(view: &ViewRef, flag: ViewFlags) -> Option<ViewRef> {
    let mut cursor = view.borrow().parent();
    while let Some(parent) = cursor {
        if parent.borrow().flags.contains(flag) {
            return Some(parent);
        }
        cursor = parent.borrow().parent();
    }
    None
}

/// Structural comparison of two trees: value fields and topology, ignoring
/// node identity.
pub fn tree_eq(a: &ViewRef, b: &ViewRef) -> bool {
    let (va, vb) = (a.borrow(), b.borrow());
    if va.kind != vb.kind
        || va.class != vb.class
        || va.visibility != vb.visibility
        || va.flags != vb.flags
        || va.rect != vb.rect
        || va.translation != vb.translation
        || va.scroll != vb.scroll
        || va.res_id() != vb.res_id()
        || va.desc != vb.desc
        || va.text != vb.text
        || va.children.len() != vb.children.len() {
        return false;
    }
    va.children.iter().zip(vb.children.iter()).all(|(ca, cb)| tree_eq(ca, cb))
}

/// The view tree captured at one event, together with the app and activity
/// that produced it.
#[derive(Debug)]
pub struct Activity {
    pub app: String,
    pub name: String,
    pub decor: ViewRef,
}

impl Activity {
    pub fn new(app: &str, name: &str, device: &DeviceInfo) -> Activity {
        Activity {
            app: app.to_string(),
            name: name.to_string(),
            decor: View::new_decor(app, device.width, device.height),
        }
    }

    pub fn with_decor(app: &str, name: &str, decor: ViewRef) -> Activity {
        Activity {
            app: app.to_string(),
            name: name.to_string(),
            decor,
        }
    }
}
