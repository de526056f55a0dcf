//! Host string proxy: a host string backed by a rooted JS string.

use once_cell::unsync::OnceCell;

use boa_engine::JsString;

use crate::handle::Root;
use crate::sys;

/// A host string whose storage is a rooted engine string.
///
/// Host-side reads go through a UTF-8 projection decoded once and cached;
/// the latin-1/BMP case decodes directly, surrogate pairs join into scalar
/// values, and unpaired surrogates degrade to a lossy rendering.
#[derive(Clone)]
pub struct JsStringProxy {
    root: Root<JsString>,
    projection: OnceCell<String>,
}

impl JsStringProxy {
    pub(crate) fn new(value: &JsString) -> Self {
        JsStringProxy {
            root: Root::new(value),
            projection: OnceCell::new(),
        }
    }

    /// The rooted engine string.
    pub(crate) fn js_string(&self) -> JsString {
        self.root.to_inner()
    }

    /// The cached UTF-8 projection.
    pub fn as_str(&self) -> &str {
        self.projection
            .get_or_init(|| sys::decode_js_string(self.root.inner()))
    }

    /// Number of UTF-16 code units in the underlying JS string.
    pub fn js_len(&self) -> usize {
        self.root.inner().len()
    }

    /// Re-proxy the same engine string (the `copy` method of the design:
    /// the clone shares the rooted storage).
    pub fn copied(&self) -> JsStringProxy {
        JsStringProxy::new(self.root.inner())
    }

    /// Whether two proxies share the same character storage.
    pub fn shares_storage(&self, other: &JsStringProxy) -> bool {
        sys::js_string_addr(self.root.inner()) == sys::js_string_addr(other.root.inner())
    }
}

impl PartialEq for JsStringProxy {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for JsStringProxy {}

impl std::fmt::Debug for JsStringProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JsStringProxy({:?})", self.as_str())
    }
}
