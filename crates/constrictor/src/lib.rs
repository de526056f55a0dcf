//! Embed the [Boa] JavaScript engine inside a dynamic host runtime.
//!
//! `constrictor` exposes a single [`Runtime`] that compiles and runs
//! JavaScript and returns results as reference-counted host values
//! ([`HostValue`]). The interesting part is the bidirectional value bridge
//! underneath:
//!
//! * **Primitives copy.** Booleans, numbers, bigints, strings, dates and
//!   byte buffers convert by value in both directions, with overflow
//!   checking for plain integers and an opt-in big-integer subtype for
//!   lossless bigint round-trips.
//! * **Compound values proxy.** A host dict passed into JS becomes a JS
//!   object whose property accesses read and write the original dict; a JS
//!   array returned to the host becomes a list facade over the rooted JS
//!   array. Mutation always lands in the original container.
//! * **Async bridges.** JS promises become host futures resolved on the
//!   runtime's event loop; host futures cross into JS as promises. JS
//!   timers are loop timers. [`Channel`] posts work onto the loop from
//!   other threads.
//!
//! ```no_run
//! use constrictor::Runtime;
//!
//! let mut rt = Runtime::new()?;
//! let value = rt.eval("40 + 2")?;
//! assert_eq!(value.as_int(), Some(42));
//! # Ok::<(), constrictor::HostError>(())
//! ```
//!
//! [Boa]: https://github.com/boa-dev/boa

mod binding;
mod context;
mod convert;
mod error;
mod event;
mod handle;
mod host;
mod jsproxy;
mod proxy;
mod runtime;
mod sys;

pub use context::Cx;
pub use convert::{classify_host, HostPath};
pub use error::{EngineError, HostError, HostResult};
pub use event::{Channel, ExceptionHandler, HostFuture, SendError, TimerId};
pub use handle::Root;
pub use host::{
    DictKey, FormatCode, HostBytes, HostDict, HostFn, HostIter, HostList, HostObject, HostStr,
    HostValue,
};
pub use jsproxy::{
    ItemKind, JsArrayIterProxy, JsArrayProxy, JsFunctionProxy, JsMethodProxy,
    JsObjectItemsProxy, JsObjectIterProxy, JsObjectKeysProxy, JsObjectProxy,
    JsObjectValuesProxy, JsStringProxy, Visited,
};
pub use proxy::ProxyFamily;
pub use runtime::{EvalOptions, Runtime, RuntimeStats};

/// The sentinel host value that crosses to JS `null`.
pub const NULL: HostValue = HostValue::Null;

/// Commonly used types, for glob import.
pub mod prelude {
    pub use crate::{
        Cx, DictKey, EvalOptions, HostError, HostFn, HostResult, HostValue, Runtime, NULL,
    };
}
