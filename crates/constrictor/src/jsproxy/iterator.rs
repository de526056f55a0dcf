//! Iterator types for the array and object proxies.

use std::cell::Cell;

use crate::context::Cx;
use crate::error::HostResult;
use crate::host::{DictKey, HostValue};
use crate::jsproxy::{JsArrayProxy, JsObjectProxy};

/// What an object-proxy iterator yields per step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKind {
    Keys,
    Values,
    Items,
}

/// Iterator over an array proxy, with direction.
#[derive(Clone)]
pub struct JsArrayIterProxy {
    proxy: JsArrayProxy,
    index: Cell<usize>,
    reversed: bool,
}

impl JsArrayIterProxy {
    pub(crate) fn new(proxy: JsArrayProxy, reversed: bool) -> Self {
        JsArrayIterProxy {
            proxy,
            index: Cell::new(0),
            reversed,
        }
    }

    pub(crate) fn new_at(proxy: JsArrayProxy, reversed: bool, index: usize) -> Self {
        JsArrayIterProxy {
            proxy,
            index: Cell::new(index),
            reversed,
        }
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Yield the next element, or `None` when exhausted. The underlying JS
    /// array is re-read each step, so growth and shrinkage during
    /// iteration behave like host list iteration does.
    pub fn next(&self, cx: &mut Cx<'_>) -> HostResult<Option<HostValue>> {
        if self.reversed {
            let i = self.index.get();
            if i == 0 {
                return Ok(None);
            }
            let value = self.proxy.get(cx, (i - 1) as i64)?;
            self.index.set(i - 1);
            Ok(Some(value))
        } else {
            let i = self.index.get();
            if i >= self.proxy.len(cx)? {
                return Ok(None);
            }
            let value = self.proxy.get(cx, i as i64)?;
            self.index.set(i + 1);
            Ok(Some(value))
        }
    }
}

/// Iterator over an object proxy, configured by item kind.
///
/// The key list snapshots at creation, so mutation mid-iteration cannot
/// skip or repeat surviving keys.
#[derive(Clone)]
pub struct JsObjectIterProxy {
    proxy: JsObjectProxy,
    keys: Vec<String>,
    index: Cell<usize>,
    kind: ItemKind,
}

impl JsObjectIterProxy {
    pub(crate) fn new(
        cx: &mut Cx<'_>,
        proxy: JsObjectProxy,
        kind: ItemKind,
    ) -> HostResult<Self> {
        let keys = proxy.key_names(cx)?;
        Ok(JsObjectIterProxy {
            proxy,
            keys,
            index: Cell::new(0),
            kind,
        })
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn next(&self, cx: &mut Cx<'_>) -> HostResult<Option<HostValue>> {
        loop {
            let i = self.index.get();
            let Some(name) = self.keys.get(i) else {
                return Ok(None);
            };
            self.index.set(i + 1);
            let key = DictKey::from_property(name);
            match self.kind {
                ItemKind::Keys => return Ok(Some(HostValue::string(name.clone()))),
                ItemKind::Values => match self.proxy.get(cx, &key)? {
                    Some(value) => return Ok(Some(value)),
                    // The property vanished mid-iteration; skip it.
                    None => continue,
                },
                ItemKind::Items => match self.proxy.get(cx, &key)? {
                    Some(value) => {
                        return Ok(Some(HostValue::list([
                            HostValue::string(name.clone()),
                            value,
                        ])))
                    }
                    None => continue,
                },
            }
        }
    }
}
