//! Thread-local bridge state.
//!
//! Native trap functions are plain fn pointers with no captures, so the
//! runtime's registries and tables live in per-thread state reached through
//! these accessors. Exactly one runtime may exist per thread.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use boa_engine::{JsObject, JsString, JsSymbol};
use rustc_hash::FxHashMap;

use crate::event::LoopShared;
use crate::sys::{self, Helpers};

pub(crate) struct BridgeState {
    pub(crate) initialized: Cell<bool>,
    /// Set once shutdown begins; slot finalizers become no-ops.
    pub(crate) finalizing: Cell<bool>,
    /// `mutedErrors`: silence uncaught errors and unhandled rejections.
    pub(crate) muted: Cell<bool>,
    helpers: RefCell<Option<Helpers>>,
    slot_symbol: RefCell<Option<JsSymbol>>,
    pub(crate) strings: RefCell<StringTable>,
    /// Live wrapped host callables exposed to JS.
    fn_ledger: Cell<usize>,
    /// Live host→JS proxies.
    proxy_ledger: Cell<usize>,
    loop_shared: RefCell<Option<Rc<LoopShared>>>,
    proxy_handlers: RefCell<Option<crate::proxy::ProxyHandlers>>,
    /// Rejected promises awaiting an unhandled-rejection report.
    pub(crate) rejections: RefCell<Vec<JsObject>>,
}

impl BridgeState {
    fn new() -> Self {
        BridgeState {
            initialized: Cell::new(false),
            finalizing: Cell::new(false),
            muted: Cell::new(false),
            helpers: RefCell::new(None),
            slot_symbol: RefCell::new(None),
            strings: RefCell::new(StringTable::new()),
            fn_ledger: Cell::new(0),
            proxy_ledger: Cell::new(0),
            loop_shared: RefCell::new(None),
            proxy_handlers: RefCell::new(None),
            rejections: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn helpers(&self) -> Helpers {
        self.helpers
            .borrow()
            .clone()
            .expect("bridge state accessed before runtime init")
    }

    pub(crate) fn set_helpers(&self, helpers: Helpers) {
        *self.helpers.borrow_mut() = Some(helpers);
    }

    /// The private symbol bridge proxies answer with their slot target.
    pub(crate) fn slot_symbol(&self) -> JsSymbol {
        self.slot_symbol
            .borrow_mut()
            .get_or_insert_with(|| sys::new_symbol("constrictor.slot"))
            .clone()
    }

    pub(crate) fn loop_shared(&self) -> Rc<LoopShared> {
        self.loop_shared
            .borrow()
            .clone()
            .expect("bridge state accessed before runtime init")
    }

    pub(crate) fn set_loop_shared(&self, shared: Rc<LoopShared>) {
        *self.loop_shared.borrow_mut() = Some(shared);
    }

    pub(crate) fn proxy_handlers(&self) -> crate::proxy::ProxyHandlers {
        self.proxy_handlers
            .borrow()
            .clone()
            .expect("bridge state accessed before runtime init")
    }

    pub(crate) fn set_proxy_handlers(&self, handlers: crate::proxy::ProxyHandlers) {
        *self.proxy_handlers.borrow_mut() = Some(handlers);
    }

    pub(crate) fn proxy_created(&self) {
        self.proxy_ledger.set(self.proxy_ledger.get() + 1);
    }

    pub(crate) fn proxy_finalized(&self) {
        if self.finalizing.get() {
            return;
        }
        self.proxy_ledger.set(self.proxy_ledger.get().saturating_sub(1));
    }

    pub(crate) fn live_proxies(&self) -> usize {
        self.proxy_ledger.get()
    }

    pub(crate) fn fn_created(&self) {
        self.fn_ledger.set(self.fn_ledger.get() + 1);
    }

    pub(crate) fn fn_finalized(&self) {
        if self.finalizing.get() {
            return;
        }
        self.fn_ledger.set(self.fn_ledger.get().saturating_sub(1));
    }

    pub(crate) fn live_functions(&self) -> usize {
        self.fn_ledger.get()
    }

    /// Tear down everything rooted through the state, in shutdown order.
    pub(crate) fn teardown(&self) {
        self.finalizing.set(true);
        self.rejections.borrow_mut().clear();
        self.strings.borrow_mut().clear();
        *self.proxy_handlers.borrow_mut() = None;
        *self.helpers.borrow_mut() = None;
        *self.slot_symbol.borrow_mut() = None;
        *self.loop_shared.borrow_mut() = None;
        self.initialized.set(false);
    }
}

thread_local! {
    static STATE: BridgeState = BridgeState::new();
}

pub(crate) fn with<R>(f: impl FnOnce(&BridgeState) -> R) -> R {
    STATE.with(f)
}

/// Two-way table pairing host strings with the engine strings made from
/// them.
///
/// Forward entries make repeat conversions of one host string share the
/// same engine storage; reverse entries let bridge-created engine strings
/// convert back to the original host string. Entries hold both sides alive
/// (the external-string-finalizer contract) until shutdown clears them.
pub(crate) struct StringTable {
    by_host: FxHashMap<usize, JsString>,
    by_js: FxHashMap<usize, Rc<str>>,
}

impl StringTable {
    fn new() -> Self {
        StringTable {
            by_host: FxHashMap::default(),
            by_js: FxHashMap::default(),
        }
    }

    fn host_key(s: &Rc<str>) -> usize {
        s.as_ptr() as usize
    }

    pub(crate) fn record(&mut self, host: &Rc<str>, js: &JsString) {
        self.by_host.insert(Self::host_key(host), js.clone());
        self.by_js.insert(sys::js_string_addr(js), Rc::clone(host));
    }

    /// The engine string previously made from this host string, if any.
    pub(crate) fn js_for(&self, host: &Rc<str>) -> Option<JsString> {
        self.by_host.get(&Self::host_key(host)).cloned()
    }

    /// The host string this engine string was made from, if it came from
    /// the bridge.
    pub(crate) fn host_for(&self, js: &JsString) -> Option<Rc<str>> {
        self.by_js.get(&sys::js_string_addr(js)).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_host.len()
    }

    pub(crate) fn clear(&mut self) {
        self.by_host.clear();
        self.by_js.clear();
    }
}
