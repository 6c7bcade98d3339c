use std::fmt;
use serde::{Serialize, Deserialize};
use crate::device::DeviceInfo;

pub const SETTINGS_PATH: &str = "Encore.toml";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    pub device: DeviceInfo,
    pub record: RecordSettings,
    pub replay: ReplaySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RecordSettings {
    /// Base64-decode the desc/text fields of the trace while parsing.
    pub decode: bool,
}

impl Default for RecordSettings {
    fn default() -> Self {
        RecordSettings {
            decode: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ReplaySettings {
    pub strategy: StrategyKind,
    pub time_sensitive: bool,
    pub lookahead: usize,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        ReplaySettings {
            strategy: StrategyKind::Responsive,
            time_sensitive: true,
            lookahead: 3,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    Px,
    Pt,
    Widget,
    Responsive,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StrategyKind::Px => write!(f, "px"),
            StrategyKind::Pt => write!(f, "pt"),
            StrategyKind::Widget => write!(f, "widget"),
            StrategyKind::Responsive => write!(f, "responsive"),
        }
    }
}
