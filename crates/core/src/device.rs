use std::fmt;
use log::debug;
use serde::{Serialize, Deserialize};
use crate::errors::{Error, Result};
use crate::geom::Rectangle;

/// Snapshot of the device a session records on or replays against.
/// Immutable for the lifetime of a session.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DeviceInfo {
    pub board: String,
    pub brand: String,
    pub model: String,
    pub abi: String,
    pub width: u32,
    pub height: u32,
    pub dpi: u16,
    pub sdk_level: u8,
    pub release_version: String,
}

impl DeviceInfo {
    pub fn density(&self) -> f32 {
        self.dpi as f32 / 160.0
    }
}

impl Default for DeviceInfo {
    fn default() -> Self {
        DeviceInfo {
            board: "generic".to_string(),
            brand: "generic".to_string(),
            model: "generic".to_string(),
            abi: "arm64-v8a".to_string(),
            width: 1080,
            height: 1920,
            dpi: 420,
            sdk_level: 28,
            release_version: "9".to_string(),
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} ({}x{}, {} dpi, SDK {})",
               self.brand, self.model, self.width, self.height, self.dpi, self.sdk_level)
    }
}

/// Gesture kinds understood by the view-level input command.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum InputKind {
    Tap,
    LongTap,
    DoubleTap,
    Swipe,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InputKind::Tap => write!(f, "tap"),
            InputKind::LongTap => write!(f, "longtap"),
            InputKind::DoubleTap => write!(f, "doubletap"),
            InputKind::Swipe => write!(f, "swipe"),
        }
    }
}

/// Predicates handed to the device when looking up live widgets.
/// String predicates are contains-ignore-case on the device side.
#[derive(Debug, Default, Clone)]
pub struct Selector {
    pub cls: Option<String>,
    pub pkg: Option<String>,
    pub res_id_contains: Option<String>,
    pub text_contains: Option<String>,
    pub desc_contains: Option<String>,
    pub clickable: Option<bool>,
    pub long_clickable: Option<bool>,
    pub scrollable: Option<bool>,
    pub checkable: Option<bool>,
    pub checked: Option<bool>,
    pub focusable: Option<bool>,
    pub focused: Option<bool>,
    pub selected: Option<bool>,
    pub dx: Option<i32>,
    pub dy: Option<i32>,
}

impl Selector {
    /// A selector with no identifying predicate can't find anything on its own.
    pub fn is_usable(&self) -> bool {
        self.res_id_contains.is_some() || self.text_contains.is_some() || self.desc_contains.is_some()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(res_id) = &self.res_id_contains {
            parts.push(format!("res-id~{:?}", res_id));
        }
        if let Some(text) = &self.text_contains {
            parts.push(format!("text~{:?}", text));
        }
        if let Some(desc) = &self.desc_contains {
            parts.push(format!("desc~{:?}", desc));
        }
        if let Some(cls) = &self.cls {
            parts.push(format!("cls={}", cls));
        }
        if let (Some(dx), Some(dy)) = (self.dx, self.dy) {
            parts.push(format!("d=({}, {})", dx, dy));
        }
        if parts.is_empty() {
            write!(f, "selector()")
        } else {
            write!(f, "selector({})", parts.join(", "))
        }
    }
}

/// One widget as enumerated by the device's select command.
#[derive(Debug, Clone)]
pub struct Widget {
    pub class: String,
    pub package: String,
    pub res_id: String,
    pub text: String,
    pub desc: String,
    pub bounds: Rectangle,
}

#[derive(Debug, Default, Clone)]
pub struct LogcatOpts {
    pub tag: String,
    pub clear: bool,
    pub silent: bool,
    pub prio: Option<char>,
    pub formats: Vec<String>,
}

pub type LogLines = Box<dyn Iterator<Item = Result<String>>>;

pub const STATUS_OK: i32 = 0;
// Raw status codes of the on-device input helper.
pub const STATUS_NO_SUCH_VIEW: i32 = 5;
pub const STATUS_VIEW_ROOT_NULL: i32 = 6;
pub const STATUS_SELECT_ROOT_NULL: i32 = 2;

const ROOT_NULL_ATTEMPTS: usize = 3;

/// What the core needs from the device bridge. Raw input commands return the
/// helper's status code; the wrappers below apply the retry policy.
pub trait Device {
    fn fetch_info(&mut self) -> Result<DeviceInfo>;
    fn tap(&mut self, x: i32, y: i32) -> Result<i32>;
    fn long_tap(&mut self, x: i32, y: i32) -> Result<i32>;
    fn double_tap(&mut self, x: i32, y: i32) -> Result<i32>;
    fn swipe(&mut self, x: i32, y: i32, dx: i32, dy: i32) -> Result<i32>;
    fn key(&mut self, name: &str) -> Result<i32>;
    fn view_input(&mut self, kind: InputKind, sel: &Selector) -> Result<i32>;
    fn select(&mut self, sel: &Selector, n: usize) -> Result<(i32, Vec<Widget>)>;
    fn logcat(&mut self, opts: &LogcatOpts) -> Result<LogLines>;
}

/// Maps the status of a raw coordinate or key input to a result.
pub fn check_status(status: i32) -> Result<()> {
    if status == STATUS_OK {
        Ok(())
    } else {
        Err(Error::DeviceCommand(status))
    }
}

/// Fires a view-level input, retrying the transient *root null* condition
/// up to three times.
pub fn view_input_retry(device: &mut dyn Device, kind: InputKind, sel: &Selector) -> Result<()> {
    let mut status = STATUS_VIEW_ROOT_NULL;
    for attempt in 0..ROOT_NULL_ATTEMPTS {
        status = device.view_input(kind, sel)?;
        match status {
            STATUS_OK => return Ok(()),
            STATUS_VIEW_ROOT_NULL => {
                debug!("view root not ready, attempt {}", attempt + 1);
                continue;
            },
            STATUS_NO_SUCH_VIEW => return Err(Error::NoSuchView(sel.to_string())),
            _ => return Err(Error::DeviceCommand(status)),
        }
    }
    Err(Error::DeviceCommand(status))
}

/// Enumerates live widgets matching *sel*, retrying the transient
/// *root null* condition up to three times.
pub fn select_retry(device: &mut dyn Device, sel: &Selector, n: usize) -> Result<Vec<Widget>> {
    let mut status = STATUS_SELECT_ROOT_NULL;
    for attempt in 0..ROOT_NULL_ATTEMPTS {
        let (code, widgets) = device.select(sel, n)?;
        status = code;
        match status {
            STATUS_OK => return Ok(widgets),
            STATUS_SELECT_ROOT_NULL => {
                debug!("widget root not ready, attempt {}", attempt + 1);
                continue;
            },
            _ => return Err(Error::DeviceCommand(status)),
        }
    }
    Err(Error::DeviceCommand(status))
}
