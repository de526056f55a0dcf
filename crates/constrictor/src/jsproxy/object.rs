//! Host object proxy: a dict facade over a rooted JS object.

use crate::context::Cx;
use crate::convert;
use crate::error::{engine_error, HostError, HostResult};
use crate::handle::Root;
use crate::host::{DictKey, HostValue};
use crate::jsproxy::views::{JsObjectItemsProxy, JsObjectKeysProxy, JsObjectValuesProxy};
use crate::jsproxy::{eq_values, repr_value, GuardId, ItemKind, JsObjectIterProxy, Visited};
use crate::runtime::state;
use crate::sys::{self, JsObject, JsValue};

/// A host mapping forwarding to a rooted JS object.
///
/// The dict method set (`get`, `setdefault`, `pop`, `clear`, `copy`,
/// `update`, `keys`, `values`, `items`) is served host-side; everything
/// else reads and writes the JS object's properties.
#[derive(Clone)]
pub struct JsObjectProxy {
    object: Root<JsObject>,
}

impl JsObjectProxy {
    pub(crate) fn new(object: &JsObject) -> Self {
        JsObjectProxy {
            object: Root::new(object),
        }
    }

    pub(crate) fn object(&self) -> &Root<JsObject> {
        &self.object
    }

    fn key_of(key: &DictKey) -> boa_engine::property::PropertyKey {
        match key {
            DictKey::Int(i) if *i >= 0 && *i <= u32::MAX as i64 => {
                boa_engine::property::PropertyKey::from(*i as u32)
            }
            other => sys::js_string_key(&other.to_string()),
        }
    }

    /// Number of own properties, hidden ones included.
    pub fn len(&self, cx: &mut Cx<'_>) -> HostResult<usize> {
        sys::own_key_count(self.object.inner(), cx.cx()).map_err(|e| engine_error(e, cx.cx()))
    }

    pub fn is_empty(&self, cx: &mut Cx<'_>) -> HostResult<bool> {
        Ok(self.len(cx)? == 0)
    }

    /// Property value for `key`, or `None` when absent.
    pub fn get(&self, cx: &mut Cx<'_>, key: &DictKey) -> HostResult<Option<HostValue>> {
        let value = self
            .object
            .inner()
            .get(Self::key_of(key), cx.cx())
            .map_err(|e| engine_error(e, cx.cx()))?;
        if value.is_undefined() {
            return Ok(None);
        }
        convert::to_host(cx.cx(), &value).map(Some)
    }

    /// Subscript access: a missing key is a key error, like the host dict.
    pub fn get_item(&self, cx: &mut Cx<'_>, key: &DictKey) -> HostResult<HostValue> {
        self.get(cx, key)?
            .ok_or_else(|| HostError::Key(key.to_string()))
    }

    pub fn set(&self, cx: &mut Cx<'_>, key: &DictKey, value: &HostValue) -> HostResult<()> {
        let js = convert::to_js(cx.cx(), value)?;
        self.object
            .inner()
            .set(Self::key_of(key), js, false, cx.cx())
            .map_err(|e| engine_error(e, cx.cx()))?;
        Ok(())
    }

    /// Delete `key`; answers whether a property was removed.
    pub fn delete(&self, cx: &mut Cx<'_>, key: &DictKey) -> HostResult<bool> {
        let existed = self.contains(cx, key)?;
        if existed {
            sys::delete_key(self.object.inner(), Self::key_of(key), cx.cx())
                .map_err(|e| engine_error(e, cx.cx()))?;
        }
        Ok(existed)
    }

    /// Membership: a present-but-undefined property counts as absent.
    pub fn contains(&self, cx: &mut Cx<'_>, key: &DictKey) -> HostResult<bool> {
        let value = self
            .object
            .inner()
            .get(Self::key_of(key), cx.cx())
            .map_err(|e| engine_error(e, cx.cx()))?;
        Ok(!value.is_undefined())
    }

    /// Own string property names, in definition order.
    pub fn key_names(&self, cx: &mut Cx<'_>) -> HostResult<Vec<String>> {
        sys::own_string_keys(self.object.inner(), cx.cx()).map_err(|e| engine_error(e, cx.cx()))
    }

    // --- dict method set ---------------------------------------------------

    /// `get(key, default=None)`.
    pub fn get_or(
        &self,
        cx: &mut Cx<'_>,
        key: &DictKey,
        default: HostValue,
    ) -> HostResult<HostValue> {
        Ok(self.get(cx, key)?.unwrap_or(default))
    }

    /// `setdefault(key, default=None)`.
    pub fn setdefault(
        &self,
        cx: &mut Cx<'_>,
        key: &DictKey,
        default: HostValue,
    ) -> HostResult<HostValue> {
        if let Some(existing) = self.get(cx, key)? {
            return Ok(existing);
        }
        self.set(cx, key, &default)?;
        Ok(default)
    }

    /// `pop(key)` / `pop(key, default)`.
    pub fn pop(
        &self,
        cx: &mut Cx<'_>,
        key: &DictKey,
        default: Option<HostValue>,
    ) -> HostResult<HostValue> {
        match self.get(cx, key)? {
            Some(value) => {
                self.delete(cx, key)?;
                Ok(value)
            }
            None => default.ok_or_else(|| HostError::Key(key.to_string())),
        }
    }

    /// Remove every own property.
    pub fn clear(&self, cx: &mut Cx<'_>) -> HostResult<()> {
        for name in self.key_names(cx)? {
            sys::delete_key(
                self.object.inner(),
                sys::js_string_key(&name),
                cx.cx(),
            )
            .map_err(|e| engine_error(e, cx.cx()))?;
        }
        Ok(())
    }

    /// Shallow copy: a fresh JS object with the same own properties,
    /// proxied.
    pub fn copy(&self, cx: &mut Cx<'_>) -> HostResult<JsObjectProxy> {
        let fresh = sys::plain_object(cx.cx());
        let helpers = state::with(|s| s.helpers());
        helpers
            .call(
                cx.cx(),
                "assign",
                &[
                    JsValue::from(fresh.clone()),
                    JsValue::from(self.object.to_inner()),
                ],
            )
            .map_err(|e| engine_error(e, cx.cx()))?;
        Ok(JsObjectProxy::new(&fresh))
    }

    /// `update(other)`: merge the other mapping's entries into this object
    /// through the engine's `Object.assign`.
    pub fn update(&self, cx: &mut Cx<'_>, other: &HostValue) -> HostResult<()> {
        let other_js = convert::to_js(cx.cx(), other)?;
        if other_js.as_object().is_none() {
            return Err(HostError::Type(format!(
                "cannot update a mapping from {}",
                other.type_name()
            )));
        }
        let helpers = state::with(|s| s.helpers());
        helpers
            .call(
                cx.cx(),
                "assign",
                &[JsValue::from(self.object.to_inner()), other_js],
            )
            .map_err(|e| engine_error(e, cx.cx()))?;
        Ok(())
    }

    /// Dict-merge (`|`): a fresh object holding both operands' entries.
    pub fn merged(&self, cx: &mut Cx<'_>, other: &HostValue) -> HostResult<JsObjectProxy> {
        let out = self.copy(cx)?;
        out.update(cx, other)?;
        Ok(out)
    }

    /// In-place dict-merge (`|=`).
    pub fn merge_in_place(&self, cx: &mut Cx<'_>, other: &HostValue) -> HostResult<()> {
        self.update(cx, other)
    }

    pub fn keys(&self) -> JsObjectKeysProxy {
        JsObjectKeysProxy::new(self.clone())
    }

    pub fn values(&self) -> JsObjectValuesProxy {
        JsObjectValuesProxy::new(self.clone())
    }

    pub fn items(&self) -> JsObjectItemsProxy {
        JsObjectItemsProxy::new(self.clone())
    }

    /// Iterate by item kind; key iteration is the default (`for k in d`).
    pub fn iter(&self, cx: &mut Cx<'_>, kind: ItemKind) -> HostResult<JsObjectIterProxy> {
        JsObjectIterProxy::new(cx, self.clone(), kind)
    }

    // --- comparison and display --------------------------------------------

    /// Deep equality against any host value, guarded against cycles by a
    /// visited set of container pairs. A revisited pair is a cycle and
    /// counts as equal so the surrounding comparison can settle.
    pub fn eq_value(
        &self,
        cx: &mut Cx<'_>,
        other: &HostValue,
        visited: &mut Visited,
    ) -> HostResult<bool> {
        let other_entries: Vec<(DictKey, HostValue)> = match other {
            HostValue::ObjectProxy(p) => {
                if self.ptr_eq(p) {
                    return Ok(true);
                }
                if visited.insert(self.guard_id(), p.guard_id()) {
                    return Ok(true);
                }
                let mut entries = Vec::new();
                for name in p.key_names(cx)? {
                    let key = DictKey::from_property(&name);
                    if let Some(v) = p.get(cx, &key)? {
                        entries.push((key, v));
                    }
                }
                entries
            }
            HostValue::Dict(d) => {
                if visited.insert(self.guard_id(), GuardId::Host(d.addr())) {
                    return Ok(true);
                }
                d.entries()
            }
            _ => return Ok(false),
        };

        if self.key_names(cx)?.len() != other_entries.len() {
            return Ok(false);
        }
        for (key, other_value) in other_entries {
            let Some(mine) = self.get(cx, &key)? else {
                return Ok(false);
            };
            if !eq_values(cx, &mine, &other_value, visited)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Mapping-style repr with `{...}` at recursion points.
    pub fn repr(&self, cx: &mut Cx<'_>) -> HostResult<String> {
        self.repr_guarded(cx, &mut Vec::new())
    }

    pub(crate) fn repr_guarded(
        &self,
        cx: &mut Cx<'_>,
        seen: &mut Vec<GuardId>,
    ) -> HostResult<String> {
        let id = self.guard_id();
        if seen.contains(&id) {
            return Ok("{...}".into());
        }
        seen.push(id);
        let mut parts = Vec::new();
        for name in self.key_names(cx)? {
            let key = DictKey::from_property(&name);
            if let Some(value) = self.get(cx, &key)? {
                parts.push(format!("{name:?}: {}", repr_value(cx, &value, seen)?));
            }
        }
        seen.pop();
        Ok(format!("{{{}}}", parts.join(", ")))
    }

    pub(crate) fn guard_id(&self) -> GuardId {
        GuardId::Js(self.object.to_inner())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        sys::object_ptr_eq(self.object.inner(), other.object.inner())
    }
}

impl std::fmt::Debug for JsObjectProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsObjectProxy")
    }
}
