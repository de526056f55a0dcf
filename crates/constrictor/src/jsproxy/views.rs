//! Keys, values and items views over an object proxy.
//!
//! Each view holds a back-reference to the proxy and reads through it, so a
//! view stays live: mutate the object and the view sees the change.

use crate::context::Cx;
use crate::error::HostResult;
use crate::host::{DictKey, HostValue};
use crate::jsproxy::{eq_values, ItemKind, JsObjectIterProxy, JsObjectProxy, Visited};

/// Keys view. Supports set-style intersection, like host dict key views.
#[derive(Clone)]
pub struct JsObjectKeysProxy {
    proxy: JsObjectProxy,
}

impl JsObjectKeysProxy {
    pub(crate) fn new(proxy: JsObjectProxy) -> Self {
        JsObjectKeysProxy { proxy }
    }

    pub fn len(&self, cx: &mut Cx<'_>) -> HostResult<usize> {
        Ok(self.proxy.key_names(cx)?.len())
    }

    pub fn is_empty(&self, cx: &mut Cx<'_>) -> HostResult<bool> {
        Ok(self.len(cx)? == 0)
    }

    pub fn contains(&self, cx: &mut Cx<'_>, key: &DictKey) -> HostResult<bool> {
        self.proxy.contains(cx, key)
    }

    pub fn iter(&self, cx: &mut Cx<'_>) -> HostResult<JsObjectIterProxy> {
        self.proxy.iter(cx, ItemKind::Keys)
    }

    pub fn to_list(&self, cx: &mut Cx<'_>) -> HostResult<Vec<HostValue>> {
        Ok(self
            .proxy
            .key_names(cx)?
            .into_iter()
            .map(HostValue::string)
            .collect())
    }

    /// Set intersection with any iterable of keys.
    pub fn intersection(
        &self,
        cx: &mut Cx<'_>,
        other: impl IntoIterator<Item = HostValue>,
    ) -> HostResult<Vec<HostValue>> {
        let mut out = Vec::new();
        for candidate in other {
            let Some(name) = candidate.as_str().map(str::to_owned) else {
                continue;
            };
            let key = DictKey::from_property(&name);
            if self.proxy.contains(cx, &key)?
                && !out.iter().any(|v: &HostValue| v.as_str() == Some(&name))
            {
                out.push(candidate);
            }
        }
        Ok(out)
    }
}

/// Values view.
#[derive(Clone)]
pub struct JsObjectValuesProxy {
    proxy: JsObjectProxy,
}

impl JsObjectValuesProxy {
    pub(crate) fn new(proxy: JsObjectProxy) -> Self {
        JsObjectValuesProxy { proxy }
    }

    pub fn len(&self, cx: &mut Cx<'_>) -> HostResult<usize> {
        Ok(self.proxy.key_names(cx)?.len())
    }

    pub fn is_empty(&self, cx: &mut Cx<'_>) -> HostResult<bool> {
        Ok(self.len(cx)? == 0)
    }

    pub fn contains(&self, cx: &mut Cx<'_>, value: &HostValue) -> HostResult<bool> {
        for name in self.proxy.key_names(cx)? {
            if let Some(mine) = self.proxy.get(cx, &DictKey::from_property(&name))? {
                if eq_values(cx, &mine, value, &mut Visited::new())? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    pub fn iter(&self, cx: &mut Cx<'_>) -> HostResult<JsObjectIterProxy> {
        self.proxy.iter(cx, ItemKind::Values)
    }

    pub fn to_list(&self, cx: &mut Cx<'_>) -> HostResult<Vec<HostValue>> {
        let mut out = Vec::new();
        for name in self.proxy.key_names(cx)? {
            if let Some(value) = self.proxy.get(cx, &DictKey::from_property(&name))? {
                out.push(value);
            }
        }
        Ok(out)
    }
}

/// Items view: yields `[key, value]` pairs.
#[derive(Clone)]
pub struct JsObjectItemsProxy {
    proxy: JsObjectProxy,
}

impl JsObjectItemsProxy {
    pub(crate) fn new(proxy: JsObjectProxy) -> Self {
        JsObjectItemsProxy { proxy }
    }

    pub fn len(&self, cx: &mut Cx<'_>) -> HostResult<usize> {
        Ok(self.proxy.key_names(cx)?.len())
    }

    pub fn is_empty(&self, cx: &mut Cx<'_>) -> HostResult<bool> {
        Ok(self.len(cx)? == 0)
    }

    pub fn iter(&self, cx: &mut Cx<'_>) -> HostResult<JsObjectIterProxy> {
        self.proxy.iter(cx, ItemKind::Items)
    }

    /// The mapping accessor back to the underlying proxy.
    pub fn mapping(&self) -> &JsObjectProxy {
        &self.proxy
    }

    pub fn to_list(&self, cx: &mut Cx<'_>) -> HostResult<Vec<HostValue>> {
        let mut out = Vec::new();
        for name in self.proxy.key_names(cx)? {
            let key = DictKey::from_property(&name);
            if let Some(value) = self.proxy.get(cx, &key)? {
                out.push(HostValue::list([HostValue::string(name), value]));
            }
        }
        Ok(out)
    }
}
