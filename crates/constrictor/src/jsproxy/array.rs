//! Host array proxy: a list facade over a rooted JS array.

use crate::context::Cx;
use crate::convert;
use crate::error::{engine_error, HostError, HostResult};
use crate::handle::Root;
use crate::host::HostValue;
use crate::jsproxy::{eq_values, repr_value, GuardId, JsArrayIterProxy, Visited};
use crate::sys::{self, JsObject, JsValue};

/// A host sequence forwarding to a rooted JS array.
#[derive(Clone)]
pub struct JsArrayProxy {
    array: Root<JsObject>,
}

impl JsArrayProxy {
    pub(crate) fn new(array: &JsObject) -> Self {
        JsArrayProxy {
            array: Root::new(array),
        }
    }

    pub(crate) fn array(&self) -> &Root<JsObject> {
        &self.array
    }

    pub fn len(&self, cx: &mut Cx<'_>) -> HostResult<usize> {
        let length = self
            .array
            .inner()
            .get(sys::js_string_key("length"), cx.cx())
            .map_err(|e| engine_error(e, cx.cx()))?;
        Ok(length.as_number().unwrap_or(0.0) as usize)
    }

    pub fn is_empty(&self, cx: &mut Cx<'_>) -> HostResult<bool> {
        Ok(self.len(cx)? == 0)
    }

    /// Resolve a possibly-negative host index against the current length.
    fn resolve_index(&self, cx: &mut Cx<'_>, index: i64) -> HostResult<usize> {
        let len = self.len(cx)? as i64;
        let resolved = if index < 0 { len + index } else { index };
        if resolved < 0 || resolved >= len {
            return Err(HostError::Index("list index out of range".into()));
        }
        Ok(resolved as usize)
    }

    pub fn get(&self, cx: &mut Cx<'_>, index: i64) -> HostResult<HostValue> {
        let index = self.resolve_index(cx, index)?;
        let value = sys::get_index(self.array.inner(), index as u64, cx.cx())
            .map_err(|e| engine_error(e, cx.cx()))?;
        convert::to_host(cx.cx(), &value)
    }

    pub fn set(&self, cx: &mut Cx<'_>, index: i64, value: &HostValue) -> HostResult<()> {
        let index = self.resolve_index(cx, index)?;
        let js = convert::to_js(cx.cx(), value)?;
        sys::set_index(self.array.inner(), index as u64, js, cx.cx())
            .map_err(|e| engine_error(e, cx.cx()))?;
        Ok(())
    }

    /// Delete by index: the element is removed and the array closes up
    /// (list semantics on the host side).
    pub fn delete(&self, cx: &mut Cx<'_>, index: i64) -> HostResult<()> {
        let index = self.resolve_index(cx, index)? as i64;
        self.splice_out(cx, index)
    }

    fn splice_out(&self, cx: &mut Cx<'_>, index: i64) -> HostResult<()> {
        let splice = self
            .array
            .inner()
            .get(sys::js_string_key("splice"), cx.cx())
            .map_err(|e| engine_error(e, cx.cx()))?;
        let splice = splice
            .as_callable()
            .cloned()
            .ok_or_else(|| HostError::Type("array has no splice".into()))?;
        splice
            .call(
                &JsValue::from(self.array.to_inner()),
                &[JsValue::from(index as i32), JsValue::from(1)],
                cx.cx(),
            )
            .map_err(|e| engine_error(e, cx.cx()))?;
        Ok(())
    }

    pub fn to_vec(&self, cx: &mut Cx<'_>) -> HostResult<Vec<HostValue>> {
        let len = self.len(cx)?;
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let value = sys::get_index(self.array.inner(), i as u64, cx.cx())
                .map_err(|e| engine_error(e, cx.cx()))?;
            out.push(convert::to_host(cx.cx(), &value)?);
        }
        Ok(out)
    }

    /// Forward iterator.
    pub fn iter(&self, cx: &mut Cx<'_>) -> HostResult<JsArrayIterProxy> {
        let _ = cx;
        Ok(JsArrayIterProxy::new(self.clone(), false))
    }

    /// Reversed iterator.
    pub fn iter_reversed(&self, cx: &mut Cx<'_>) -> HostResult<JsArrayIterProxy> {
        let len = self.len(cx)?;
        Ok(JsArrayIterProxy::new_at(self.clone(), true, len))
    }

    // --- list method set ----------------------------------------------------

    pub fn append(&self, cx: &mut Cx<'_>, value: &HostValue) -> HostResult<()> {
        let len = self.len(cx)?;
        let js = convert::to_js(cx.cx(), value)?;
        sys::set_index(self.array.inner(), len as u64, js, cx.cx())
            .map_err(|e| engine_error(e, cx.cx()))?;
        Ok(())
    }

    pub fn insert(&self, cx: &mut Cx<'_>, index: i64, value: &HostValue) -> HostResult<()> {
        let len = self.len(cx)? as i64;
        let index = index.clamp(-len, len);
        let index = if index < 0 { len + index } else { index };
        let splice = self
            .array
            .inner()
            .get(sys::js_string_key("splice"), cx.cx())
            .map_err(|e| engine_error(e, cx.cx()))?;
        let splice = splice
            .as_callable()
            .cloned()
            .ok_or_else(|| HostError::Type("array has no splice".into()))?;
        let js = convert::to_js(cx.cx(), value)?;
        splice
            .call(
                &JsValue::from(self.array.to_inner()),
                &[JsValue::from(index as i32), JsValue::from(0), js],
                cx.cx(),
            )
            .map_err(|e| engine_error(e, cx.cx()))?;
        Ok(())
    }

    pub fn extend(
        &self,
        cx: &mut Cx<'_>,
        values: impl IntoIterator<Item = HostValue>,
    ) -> HostResult<()> {
        for value in values {
            self.append(cx, &value)?;
        }
        Ok(())
    }

    /// Remove and return the element at `index` (default last).
    pub fn pop(&self, cx: &mut Cx<'_>, index: Option<i64>) -> HostResult<HostValue> {
        let index = index.unwrap_or(-1);
        let value = self.get(cx, index)?;
        let resolved = self.resolve_index(cx, index)? as i64;
        self.splice_out(cx, resolved)?;
        Ok(value)
    }

    /// Remove the first element equal to `value`.
    pub fn remove(&self, cx: &mut Cx<'_>, value: &HostValue) -> HostResult<()> {
        let index = self.position(cx, value)?;
        match index {
            Some(i) => self.splice_out(cx, i as i64),
            None => Err(HostError::Value("list.remove(x): x not in list".into())),
        }
    }

    /// Index of the first element equal to `value`.
    pub fn index_of(&self, cx: &mut Cx<'_>, value: &HostValue) -> HostResult<usize> {
        self.position(cx, value)?
            .ok_or_else(|| HostError::Value("value is not in list".into()))
    }

    fn position(&self, cx: &mut Cx<'_>, value: &HostValue) -> HostResult<Option<usize>> {
        for (i, item) in self.to_vec(cx)?.iter().enumerate() {
            if eq_values(cx, item, value, &mut Visited::new())? {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    pub fn count(&self, cx: &mut Cx<'_>, value: &HostValue) -> HostResult<usize> {
        let mut n = 0;
        for item in self.to_vec(cx)? {
            if eq_values(cx, &item, value, &mut Visited::new())? {
                n += 1;
            }
        }
        Ok(n)
    }

    pub fn reverse(&self, cx: &mut Cx<'_>) -> HostResult<()> {
        self.call_method(cx, "reverse", &[])?;
        Ok(())
    }

    /// In-place sort with an optional host comparator.
    pub fn sort_by(&self, cx: &mut Cx<'_>, comparator: Option<&HostValue>) -> HostResult<()> {
        match comparator {
            None => {
                self.call_method(cx, "sort", &[])?;
            }
            Some(cmp) => {
                let cmp_js = convert::to_js(cx.cx(), cmp)?;
                self.call_method(cx, "sort", &[cmp_js])?;
            }
        }
        Ok(())
    }

    pub fn clear(&self, cx: &mut Cx<'_>) -> HostResult<()> {
        self.array
            .inner()
            .set(
                sys::js_string_key("length"),
                JsValue::from(0),
                false,
                cx.cx(),
            )
            .map_err(|e| engine_error(e, cx.cx()))?;
        Ok(())
    }

    /// Shallow copy into a fresh host list.
    pub fn copy(&self, cx: &mut Cx<'_>) -> HostResult<HostValue> {
        Ok(HostValue::list(self.to_vec(cx)?))
    }

    fn call_method(
        &self,
        cx: &mut Cx<'_>,
        name: &str,
        args: &[JsValue],
    ) -> HostResult<JsValue> {
        let method = self
            .array
            .inner()
            .get(sys::js_string_key(name), cx.cx())
            .map_err(|e| engine_error(e, cx.cx()))?;
        let method = method
            .as_callable()
            .cloned()
            .ok_or_else(|| HostError::Type(format!("array has no method {name}")))?;
        method
            .call(&JsValue::from(self.array.to_inner()), args, cx.cx())
            .map_err(|e| engine_error(e, cx.cx()))
    }

    // --- comparison and display --------------------------------------------

    /// Element-wise equality with cycle protection.
    pub fn eq_value(
        &self,
        cx: &mut Cx<'_>,
        other: &HostValue,
        visited: &mut Visited,
    ) -> HostResult<bool> {
        let other_items: Vec<HostValue> = match other {
            HostValue::ArrayProxy(p) => {
                if self.ptr_eq(p) {
                    return Ok(true);
                }
                if visited.insert(self.guard_id(), p.guard_id()) {
                    return Ok(true);
                }
                p.to_vec(cx)?
            }
            HostValue::List(l) => {
                if visited.insert(self.guard_id(), GuardId::Host(l.addr())) {
                    return Ok(true);
                }
                l.to_vec()
            }
            _ => return Ok(false),
        };
        let mine = self.to_vec(cx)?;
        if mine.len() != other_items.len() {
            return Ok(false);
        }
        for (a, b) in mine.iter().zip(other_items.iter()) {
            if !eq_values(cx, a, b, visited)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// List-style repr with `[...]` at recursion points.
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
            return Ok("[...]".into());
        }
        seen.push(id);
        let mut parts = Vec::new();
        for item in self.to_vec(cx)? {
            parts.push(repr_value(cx, &item, seen)?);
        }
        seen.pop();
        Ok(format!("[{}]", parts.join(", ")))
    }

    pub(crate) fn guard_id(&self) -> GuardId {
        GuardId::Js(self.array.to_inner())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        sys::object_ptr_eq(self.array.inner(), other.array.inner())
    }
}

impl std::fmt::Debug for JsArrayProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsArrayProxy")
    }
}
