// We want a few things here:
// 1. A way to create a new error with a backtrace
// 2. A way to centralize setting a breakpoint to trap any error in the system fairly soon
//    after it's created (or at least when it's propagated from a library we use back to us)
// 3. Same but for logging / emitting error messages into the tracing/logging system
// 4. A coarse kind tag, because the scan engine's callers react differently to
//    "restart this step under a fresh snapshot" than to "fail the query".

use std::borrow::Cow;
use backtrace_error::DynBacktraceError;
use tracing::error;

#[cfg(test)]
use test_log::test;

/// Coarse classification of scan-engine failures. Most call sites only ever
/// look at `Restart` vs everything-else; the rest exist for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrapped foreign error or uncategorized internal failure.
    Other,
    /// Unsupported width or width/type combination; fatal to the step.
    Config,
    /// Survivor count disagreed with the expected row count in an
    /// ordinary session; surfaced to the query as a failure.
    Mismatch,
    /// Same disagreement in a maintenance session; the enclosing step
    /// re-runs itself from scratch and the user never sees it.
    Restart,
    /// A fixed-size formatting buffer was too small for a value that is
    /// documented to fit. A defect signal, not a user-facing condition.
    BufferOverflow,
    /// Unrecognized output-shape tag at result delivery; indicates a
    /// protocol mismatch between the command builder and the engine.
    BadOutputShape,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    #[allow(dead_code)]
    inner: DynBacktraceError,
}

pub type Result<T> = std::result::Result<T, Error>;

struct SimpleErr(Cow<'static, str>);
impl std::fmt::Debug for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for SimpleErr {}

impl<E: std::error::Error + Send + Sync + 'static> From<E> for Error {
    fn from(err: E) -> Error {
        Error::new(ErrorKind::Other, err)
    }
}

impl Error {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(kind: ErrorKind, err: E) -> Error {
        error!(target: "riptide", "{:?}: {:?}", kind, err);
        let inner = DynBacktraceError::from(err);
        Error { kind, inner }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

fn kind_err(kind: ErrorKind, msg: impl Into<Cow<'static, str>>) -> Error {
    Error::new(kind, SimpleErr(msg.into()))
}

pub fn err(msg: impl Into<Cow<'static, str>>) -> Error {
    kind_err(ErrorKind::Other, msg)
}

pub fn config_err(msg: impl Into<Cow<'static, str>>) -> Error {
    kind_err(ErrorKind::Config, msg)
}

pub fn mismatch_err(msg: impl Into<Cow<'static, str>>) -> Error {
    kind_err(ErrorKind::Mismatch, msg)
}

pub fn restart_err(msg: impl Into<Cow<'static, str>>) -> Error {
    kind_err(ErrorKind::Restart, msg)
}

pub fn overflow_err(msg: impl Into<Cow<'static, str>>) -> Error {
    kind_err(ErrorKind::BufferOverflow, msg)
}

pub fn bad_shape_err(msg: impl Into<Cow<'static, str>>) -> Error {
    kind_err(ErrorKind::BadOutputShape, msg)
}

#[test]
fn test_error() {
    let e = err("test error");
    assert_eq!(e.kind(), ErrorKind::Other);
    let e = restart_err("test restart");
    assert_eq!(e.kind(), ErrorKind::Restart);
}
