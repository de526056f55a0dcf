//! Error types and the host↔JS exception bridge.
//!
//! Every boundary crossing funnels failures through [`HostError`]. Engine
//! failures become [`EngineError`]s that keep the original JS error value
//! rooted, so a host error that started its life in JS can be re-thrown into
//! JS *as the same object* (identity, not a reconstruction).

use std::fmt::Write as _;
use std::rc::Rc;

use boa_engine::{Context, JsError, JsNativeError, JsValue};
use thiserror::Error;

use crate::handle::Root;

/// Result type used throughout the bridge.
pub type HostResult<T> = Result<T, HostError>;

/// An error raised on the host side of the bridge.
///
/// The conversion kinds mirror the errors the underlying native container
/// would raise, so proxy operations fail the way the plain host type fails.
#[derive(Debug, Clone, Error)]
pub enum HostError {
    #[error("TypeError: {0}")]
    Type(String),
    #[error("ValueError: {0}")]
    Value(String),
    #[error("IndexError: {0}")]
    Index(String),
    #[error("KeyError: {0}")]
    Key(String),
    #[error("OverflowError: {0}")]
    Overflow(String),
    #[error("RuntimeError: {0}")]
    Runtime(String),
    /// A failure reported by the JavaScript engine (compile error, runtime
    /// exception, out of memory).
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl HostError {
    /// Kind tag used as the message prefix when this error surfaces into JS.
    pub fn kind(&self) -> &'static str {
        match self {
            HostError::Type(_) => "TypeError",
            HostError::Value(_) => "ValueError",
            HostError::Index(_) => "IndexError",
            HostError::Key(_) => "KeyError",
            HostError::Overflow(_) => "OverflowError",
            HostError::Runtime(_) => "RuntimeError",
            HostError::Engine(_) => "EngineError",
        }
    }

    /// The bare message, without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            HostError::Type(m)
            | HostError::Value(m)
            | HostError::Index(m)
            | HostError::Key(m)
            | HostError::Overflow(m)
            | HostError::Runtime(m) => m,
            HostError::Engine(e) => &e.message,
        }
    }

    /// The original JS error value, when this error crossed over from JS.
    pub fn js_error(&self) -> Option<&Root<JsValue>> {
        match self {
            HostError::Engine(e) => e.js_error.as_ref(),
            _ => None,
        }
    }
}

/// The host-side exception class for failures coming out of the JS engine.
///
/// Carries the engine's formatted message (including the JS stack when the
/// engine provides one) and the original error value for lossless
/// round-tripping.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EngineError {
    pub(crate) message: String,
    pub(crate) js_error: Option<Root<JsValue>>,
}

impl EngineError {
    /// Build an engine error from a plain message, with no JS original.
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        EngineError {
            message: message.into(),
            js_error: None,
        }
    }

    /// The engine's formatted message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The original JS error value, if any.
    pub fn js_error(&self) -> Option<&Root<JsValue>> {
        self.js_error.as_ref()
    }
}

/// Convert a pending engine failure into a host error.
///
/// The message is the engine's own formatting of the thrown value; when the
/// thrown value is an `Error` object carrying a `stack` property, the stack
/// is appended so REPL users see where the throw happened.
pub(crate) fn engine_error(err: JsError, context: &mut Context) -> HostError {
    let mut message = err.to_string();

    let js_value = err.to_opaque(context);
    if let Some(obj) = js_value.as_object() {
        if let Ok(stack) = obj.get(boa_engine::js_string!("stack"), context) {
            if let Some(stack) = stack.as_string() {
                let stack = stack.to_std_string_escaped();
                if !stack.is_empty() {
                    let _ = write!(message, "\nStack trace:\n{stack}");
                }
            }
        }
    }

    HostError::Engine(EngineError {
        message,
        js_error: Some(Root::new(&js_value)),
    })
}

/// Convert a host error into a JS error value to be thrown into the engine.
///
/// If the host error still holds the original JS error it came from, that
/// exact value is re-emitted. Otherwise a fresh engine error is built whose
/// message carries the host error kind, the message, a best-effort host
/// backtrace, and the stack of any currently pending JS error.
pub(crate) fn throw_into_js(err: &HostError) -> JsError {
    if let Some(original) = err.js_error() {
        return JsError::from_opaque(original.to_inner());
    }

    let mut message = format!("{}: {}", err.kind(), err.message());
    let trace = host_backtrace();
    if !trace.is_empty() {
        let _ = write!(message, "\nHost traceback (most recent call last):\n{trace}");
    }

    JsNativeError::error().with_message(message).into()
}

/// Exception value → JS error, for host exception *values* flowing through
/// the classifier (rule: exception instance → JS error).
pub(crate) fn exception_value_to_js(err: &HostError, context: &mut Context) -> JsValue {
    throw_into_js(err).to_opaque(context)
}

const TRACE_LIMIT: usize = 1000;
const REPEAT_CUTOFF: usize = 3;

/// Format the current host backtrace: one `File "...", line N, in name` row
/// per resolved frame, with runs of identical frames collapsed by a repeat
/// counter once they exceed [`REPEAT_CUTOFF`], bounded at [`TRACE_LIMIT`]
/// frames.
fn host_backtrace() -> String {
    let bt = backtrace::Backtrace::new();
    let mut out = String::new();
    let mut last: Option<(String, u32)> = None;
    let mut repeats = 0usize;
    let mut depth = 0usize;

    let mut flush_repeats = |out: &mut String, repeats: usize| {
        if repeats > REPEAT_CUTOFF {
            let n = repeats - REPEAT_CUTOFF;
            let _ = writeln!(
                out,
                "[Previous frame repeated {n} more time{}]",
                if n == 1 { "" } else { "s" }
            );
        }
    };

    'frames: for frame in bt.frames() {
        for symbol in frame.symbols() {
            if depth >= TRACE_LIMIT {
                break 'frames;
            }
            let name = symbol
                .name()
                .map(|n| n.to_string())
                .unwrap_or_else(|| "<unknown>".into());
            // The bridge's own error plumbing is noise in a user-facing trace.
            if name.contains("host_backtrace") || name.contains("backtrace::") {
                continue;
            }
            let file = symbol
                .filename()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<unknown>".into());
            let line = symbol.lineno().unwrap_or(0);

            let key = (file.clone(), line);
            if last.as_ref() == Some(&key) {
                repeats += 1;
                if repeats > REPEAT_CUTOFF {
                    continue;
                }
            } else {
                flush_repeats(&mut out, repeats);
                repeats = 1;
                last = Some(key);
            }

            let _ = writeln!(out, "  File \"{file}\", line {line}, in {name}");
            depth += 1;
        }
    }
    flush_repeats(&mut out, repeats);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_prefixes() {
        assert_eq!(HostError::Type("x".into()).kind(), "TypeError");
        assert_eq!(HostError::Overflow("x".into()).kind(), "OverflowError");
        assert_eq!(
            HostError::Key("missing".into()).to_string(),
            "KeyError: missing"
        );
    }

    #[test]
    fn engine_error_without_original() {
        let err = HostError::Engine(EngineError::msg("SyntaxError: unexpected token"));
        assert!(err.js_error().is_none());
        assert_eq!(err.message(), "SyntaxError: unexpected token");
    }
}
