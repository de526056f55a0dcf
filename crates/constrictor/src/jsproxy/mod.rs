//! JS→host proxy types: host values that forward to a rooted JS value.
//!
//! Each proxy embeds a persistent [`Root`](crate::handle::Root) next to its
//! host-side facade and forwards container operations to the JS object it
//! roots. Equality is defined within a proxy type (deep, cycle-safe) and
//! not across types.

mod array;
mod function;
mod iterator;
mod object;
mod string;
mod views;

pub use array::JsArrayProxy;
pub use function::{JsFunctionProxy, JsMethodProxy};
pub use iterator::{ItemKind, JsArrayIterProxy, JsObjectIterProxy};
pub use object::JsObjectProxy;
pub use string::JsStringProxy;
pub use views::{JsObjectItemsProxy, JsObjectKeysProxy, JsObjectValuesProxy};

use crate::context::Cx;
use crate::error::HostResult;
use crate::host::HostValue;
use crate::sys::{self, JsObject};

/// Identity of a container visited during repr or comparison; cycles are
/// detected by revisiting one.
#[derive(Clone)]
pub(crate) enum GuardId {
    Js(JsObject),
    Host(usize),
}

impl PartialEq for GuardId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (GuardId::Js(a), GuardId::Js(b)) => sys::object_ptr_eq(a, b),
            (GuardId::Host(a), GuardId::Host(b)) => a == b,
            _ => false,
        }
    }
}

/// A visited set of comparison pairs, for cycle-safe deep equality.
#[derive(Default)]
pub struct Visited {
    pairs: Vec<(GuardId, GuardId)>,
}

impl Visited {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the pair; answers whether it was already present.
    pub(crate) fn insert(&mut self, a: GuardId, b: GuardId) -> bool {
        if self.pairs.iter().any(|(x, y)| *x == a && *y == b) {
            return true;
        }
        self.pairs.push((a, b));
        false
    }
}

/// Render a host value the way the proxy `repr` formatters need it, with a
/// cycle guard threaded through.
pub(crate) fn repr_value(
    cx: &mut Cx<'_>,
    value: &HostValue,
    seen: &mut Vec<GuardId>,
) -> HostResult<String> {
    match value {
        HostValue::None => Ok("None".into()),
        HostValue::Null => Ok("null".into()),
        HostValue::Bool(true) => Ok("True".into()),
        HostValue::Bool(false) => Ok("False".into()),
        HostValue::Int(i) => Ok(i.to_string()),
        HostValue::BigInt(b) => Ok(b.to_string()),
        HostValue::Float(f) => Ok(format!("{f:?}")),
        HostValue::Str(s) => Ok(format!("{:?}", s.as_str())),
        HostValue::ObjectProxy(p) => p.repr_guarded(cx, seen),
        HostValue::ArrayProxy(p) => p.repr_guarded(cx, seen),
        HostValue::List(l) => {
            let id = GuardId::Host(l.addr());
            if seen.contains(&id) {
                return Ok("[...]".into());
            }
            seen.push(id);
            let mut parts = Vec::with_capacity(l.len());
            for item in l.to_vec() {
                parts.push(repr_value(cx, &item, seen)?);
            }
            seen.pop();
            Ok(format!("[{}]", parts.join(", ")))
        }
        HostValue::Dict(d) => {
            let id = GuardId::Host(d.addr());
            if seen.contains(&id) {
                return Ok("{...}".into());
            }
            seen.push(id);
            let mut parts = Vec::with_capacity(d.len());
            for (k, v) in d.entries() {
                parts.push(format!("{:?}: {}", k.to_string(), repr_value(cx, &v, seen)?));
            }
            seen.pop();
            Ok(format!("{{{}}}", parts.join(", ")))
        }
        other => Ok(format!("<{}>", other.type_name())),
    }
}

/// Deep equality between two host values, with a visited set of container
/// pairs to survive cycles.
pub(crate) fn eq_values(
    cx: &mut Cx<'_>,
    a: &HostValue,
    b: &HostValue,
    visited: &mut Visited,
) -> HostResult<bool> {
    match (a, b) {
        (HostValue::ObjectProxy(x), _) => x.eq_value(cx, b, visited),
        (_, HostValue::ObjectProxy(y)) => y.eq_value(cx, a, visited),
        (HostValue::ArrayProxy(x), _) => x.eq_value(cx, b, visited),
        (_, HostValue::ArrayProxy(y)) => y.eq_value(cx, a, visited),
        _ => Ok(a == b),
    }
}
