use std::io;
use thiserror::Error;

/// Failure taxonomy of the record/replay engine.
///
/// Recording retries the transient *root null* conditions silently (see the
/// device wrappers); everything else propagates to the driver, which logs it
/// and exits nonzero.
#[derive(Error, Debug)]
pub enum Error {
    /// An external process exited nonzero while we were reading from it.
    #[error("process exited with code {code}: {stderr}")]
    Process { code: i32, stderr: String },
    /// An input or select command returned a status not handled by retry.
    #[error("device command failed with status {0}")]
    DeviceCommand(i32),
    /// A selector matched no widget on the live device.
    #[error("no view matches {0}")]
    NoSuchView(String),
    /// Parser or codec state violation.
    #[error("illegal state: {0}")]
    IllegalState(String),
    /// Documented extension point that is not implemented.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    /// Invariant-breaking branch.
    #[error("cannot reach here: {0}")]
    CannotReachHere(&'static str),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("malformed base64 field: {0}")]
    Base64(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, Error>;
