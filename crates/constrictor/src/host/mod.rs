//! The dynamic host value model.
//!
//! [`HostValue`] is the reference-counted, dynamically typed value the
//! bridge trades in: cloning a compound value clones the *reference*, and
//! dropping the last clone releases the storage. Compound values
//! (dicts, lists, buffers) are shared by any code holding a clone, which is
//! what lets a JS proxy mutate the same container the host sees.

mod bytes;
mod func;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use num_bigint::BigInt;

pub use bytes::{FormatCode, HostBytes};
pub use func::HostFn;

use crate::error::HostError;
use crate::event::HostFuture;
use crate::jsproxy::{JsArrayProxy, JsFunctionProxy, JsMethodProxy, JsObjectProxy, JsStringProxy};

/// A value in the host runtime.
#[derive(Clone)]
pub enum HostValue {
    /// The host's "no value" value; crosses to JS `undefined`.
    None,
    /// The sentinel that crosses to JS `null`.
    Null,
    Bool(bool),
    /// A plain integer. Values above 53-bit magnitude refuse to cross to JS
    /// as numbers; use [`HostValue::BigInt`] to opt in to bigint crossing.
    Int(i64),
    /// The big-integer subtype: always crosses to a JS bigint, never loses
    /// precision.
    BigInt(Rc<BigInt>),
    Float(f64),
    Str(HostStr),
    Bytes(HostBytes),
    List(HostList),
    Dict(HostDict),
    Func(HostFn),
    /// An arbitrary host object: a named bag of attributes. Crosses to JS
    /// through the generic object proxy.
    Object(HostObject),
    DateTime(DateTime<Utc>),
    /// An exception instance travelling as a value.
    Exception(Rc<HostError>),
    /// An awaitable; crosses to JS as a Promise.
    Future(HostFuture),
    /// A host iterator; crosses to JS as an iterable proxy.
    Iter(HostIter),
    /// JS object rooted behind a dict facade.
    ObjectProxy(JsObjectProxy),
    /// JS array rooted behind a list facade.
    ArrayProxy(JsArrayProxy),
    FunctionProxy(JsFunctionProxy),
    MethodProxy(JsMethodProxy),
}

impl HostValue {
    pub fn string(s: impl Into<String>) -> Self {
        HostValue::Str(HostStr::owned(s))
    }

    pub fn list(items: impl IntoIterator<Item = HostValue>) -> Self {
        HostValue::List(HostList::from_iter(items))
    }

    pub fn dict(entries: impl IntoIterator<Item = (DictKey, HostValue)>) -> Self {
        HostValue::Dict(HostDict::from_iter(entries))
    }

    pub fn bigint(v: impl Into<BigInt>) -> Self {
        HostValue::BigInt(Rc::new(v.into()))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, HostValue::None)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            HostValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            HostValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&HostList> {
        match self {
            HostValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&HostDict> {
        match self {
            HostValue::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Human-readable type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::None => "none",
            HostValue::Null => "null",
            HostValue::Bool(_) => "bool",
            HostValue::Int(_) => "int",
            HostValue::BigInt(_) => "bigint",
            HostValue::Float(_) => "float",
            HostValue::Str(_) => "str",
            HostValue::Bytes(_) => "bytes",
            HostValue::List(_) => "list",
            HostValue::Dict(_) => "dict",
            HostValue::Func(_) => "function",
            HostValue::Object(_) => "object",
            HostValue::DateTime(_) => "datetime",
            HostValue::Exception(_) => "exception",
            HostValue::Future(_) => "future",
            HostValue::Iter(_) => "iterator",
            HostValue::ObjectProxy(_) => "JsObjectProxy",
            HostValue::ArrayProxy(_) => "JsArrayProxy",
            HostValue::FunctionProxy(_) => "JsFunctionProxy",
            HostValue::MethodProxy(_) => "JsMethodProxy",
        }
    }
}

/// Structural equality for pure host values; reference identity for proxies,
/// callables, futures and iterators. Deep comparison that needs to read JS
/// state lives on the proxy types themselves (`eq_value`).
impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        use HostValue::*;
        match (self, other) {
            (None, None) | (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (BigInt(a), BigInt(b)) => a == b,
            (Int(a), BigInt(b)) | (BigInt(b), Int(a)) => num_bigint::BigInt::from(*a) == **b,
            (Float(a), Float(b)) => a == b,
            (Int(a), Float(b)) | (Float(b), Int(a)) => *a as f64 == *b,
            (Str(a), Str(b)) => a.as_str() == b.as_str(),
            (Bytes(a), Bytes(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Dict(a), Dict(b)) => a == b,
            (Func(a), Func(b)) => a == b,
            (Object(a), Object(b)) => a.ptr_eq(b),
            (DateTime(a), DateTime(b)) => a == b,
            (Exception(a), Exception(b)) => Rc::ptr_eq(a, b),
            (Future(a), Future(b)) => a.ptr_eq(b),
            (Iter(a), Iter(b)) => a.ptr_eq(b),
            (ObjectProxy(a), ObjectProxy(b)) => a.ptr_eq(b),
            (ArrayProxy(a), ArrayProxy(b)) => a.ptr_eq(b),
            (FunctionProxy(a), FunctionProxy(b)) => a.ptr_eq(b),
            (MethodProxy(a), MethodProxy(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::None => f.write_str("None"),
            HostValue::Null => f.write_str("Null"),
            HostValue::Bool(b) => write!(f, "{b:?}"),
            HostValue::Int(i) => write!(f, "{i}"),
            HostValue::BigInt(b) => write!(f, "{b}n"),
            HostValue::Float(x) => write!(f, "{x:?}"),
            HostValue::Str(s) => write!(f, "{:?}", s.as_str()),
            HostValue::Bytes(b) => write!(f, "<bytes len={}>", b.len()),
            HostValue::List(l) => {
                let items = l.items.borrow();
                f.debug_list().entries(items.iter()).finish()
            }
            HostValue::Dict(d) => {
                let map = d.map.borrow();
                f.debug_map().entries(map.iter()).finish()
            }
            other => write!(f, "<{}>", other.type_name()),
        }
    }
}

impl From<bool> for HostValue {
    fn from(v: bool) -> Self {
        HostValue::Bool(v)
    }
}

impl From<i64> for HostValue {
    fn from(v: i64) -> Self {
        HostValue::Int(v)
    }
}

impl From<i32> for HostValue {
    fn from(v: i32) -> Self {
        HostValue::Int(v as i64)
    }
}

impl From<f64> for HostValue {
    fn from(v: f64) -> Self {
        HostValue::Float(v)
    }
}

impl From<&str> for HostValue {
    fn from(v: &str) -> Self {
        HostValue::string(v)
    }
}

impl From<String> for HostValue {
    fn from(v: String) -> Self {
        HostValue::string(v)
    }
}

/// A host string: either owned UTF-8 storage or a proxy rooting a JS string.
///
/// Both shapes answer the same string API, so a proxy participates in host
/// string usage transparently.
#[derive(Clone)]
pub enum HostStr {
    Owned(Rc<str>),
    Proxy(JsStringProxy),
}

impl HostStr {
    pub fn owned(s: impl Into<String>) -> Self {
        HostStr::Owned(Rc::from(s.into().into_boxed_str()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            HostStr::Owned(s) => s,
            HostStr::Proxy(p) => p.as_str(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self, HostStr::Proxy(_))
    }
}

impl fmt::Debug for HostStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl PartialEq for HostStr {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for HostStr {}

/// A key in a host dict. Property ids coming from JS are coerced to either
/// an integer (for index-like ids) or a string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DictKey {
    Int(i64),
    Str(Rc<str>),
}

impl DictKey {
    /// Coerce a JS property name to a key: canonical integer strings become
    /// integer keys, everything else stays a string.
    pub fn from_property(name: &str) -> Self {
        if let Ok(i) = name.parse::<i64>() {
            if i.to_string() == name {
                return DictKey::Int(i);
            }
        }
        DictKey::Str(Rc::from(name))
    }
}

impl fmt::Display for DictKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DictKey::Int(i) => write!(f, "{i}"),
            DictKey::Str(s) => f.write_str(s),
        }
    }
}

// Canonicalizing here keeps "3" and 3 the same key, so a dict can never
// present duplicate property names to JS.
impl From<&str> for DictKey {
    fn from(s: &str) -> Self {
        DictKey::from_property(s)
    }
}

impl From<i64> for DictKey {
    fn from(i: i64) -> Self {
        DictKey::Int(i)
    }
}

/// A shared, insertion-ordered host mapping.
#[derive(Clone, Default)]
pub struct HostDict {
    map: Rc<RefCell<IndexMap<DictKey, HostValue>>>,
}

impl HostDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_iter(entries: impl IntoIterator<Item = (DictKey, HostValue)>) -> Self {
        HostDict {
            map: Rc::new(RefCell::new(entries.into_iter().collect())),
        }
    }

    pub fn len(&self) -> usize {
        self.map.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.borrow().is_empty()
    }

    pub fn get(&self, key: &DictKey) -> Option<HostValue> {
        self.map.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: DictKey, value: HostValue) {
        self.map.borrow_mut().insert(key, value);
    }

    /// Remove a key, preserving the order of the remaining entries.
    pub fn remove(&self, key: &DictKey) -> Option<HostValue> {
        self.map.borrow_mut().shift_remove(key)
    }

    pub fn contains(&self, key: &DictKey) -> bool {
        self.map.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<DictKey> {
        self.map.borrow().keys().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(DictKey, HostValue)> {
        self.map
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.map, &other.map)
    }

    /// Stable identity of the shared storage, for cycle guards.
    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.map) as *const u8 as usize
    }
}

impl PartialEq for HostDict {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let (a, b) = (self.map.borrow(), other.map.borrow());
        a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
    }
}

/// A shared host sequence.
#[derive(Clone, Default)]
pub struct HostList {
    items: Rc<RefCell<Vec<HostValue>>>,
}

impl HostList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_iter(items: impl IntoIterator<Item = HostValue>) -> Self {
        HostList {
            items: Rc::new(RefCell::new(items.into_iter().collect())),
        }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<HostValue> {
        self.items.borrow().get(index).cloned()
    }

    pub fn set(&self, index: usize, value: HostValue) {
        self.items.borrow_mut()[index] = value;
    }

    pub fn push(&self, value: HostValue) {
        self.items.borrow_mut().push(value);
    }

    /// Write at `index`, padding with `None` values when the index is past
    /// the current end (the sparse-write semantics of the list proxy).
    pub fn set_padded(&self, index: usize, value: HostValue) {
        let mut items = self.items.borrow_mut();
        if index >= items.len() {
            items.resize(index + 1, HostValue::None);
        }
        items[index] = value;
    }

    pub fn to_vec(&self) -> Vec<HostValue> {
        self.items.borrow().clone()
    }

    pub fn replace(&self, new_items: Vec<HostValue>) {
        *self.items.borrow_mut() = new_items;
    }

    /// Run `f` with mutable access to the underlying storage.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Vec<HostValue>) -> R) -> R {
        f(&mut self.items.borrow_mut())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.items, &other.items)
    }

    /// Stable identity of the shared storage, for cycle guards.
    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.items) as *const u8 as usize
    }
}

impl PartialEq for HostList {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.items.borrow() == *other.items.borrow()
    }
}

/// An arbitrary host object: a class name plus a shared attribute mapping.
///
/// The generic object handler forwards JS property access to these
/// attributes.
#[derive(Clone)]
pub struct HostObject {
    class_name: Rc<str>,
    attrs: HostDict,
}

impl HostObject {
    pub fn new(class_name: impl Into<String>) -> Self {
        HostObject {
            class_name: Rc::from(class_name.into().into_boxed_str()),
            attrs: HostDict::new(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn attrs(&self) -> &HostDict {
        &self.attrs
    }

    pub fn get_attr(&self, name: &str) -> Option<HostValue> {
        self.attrs.get(&DictKey::from(name))
    }

    pub fn set_attr(&self, name: &str, value: HostValue) {
        self.attrs.insert(DictKey::from(name), value);
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.attrs.ptr_eq(&other.attrs)
    }
}

/// A shared host iterator. Exhaustion is the host's stop-iteration signal,
/// surfaced to JS as `{done: true}` by the iterable proxy.
#[derive(Clone)]
pub struct HostIter {
    inner: Rc<RefCell<Box<dyn Iterator<Item = HostValue>>>>,
}

impl HostIter {
    pub fn new(iter: impl Iterator<Item = HostValue> + 'static) -> Self {
        HostIter {
            inner: Rc::new(RefCell::new(Box::new(iter))),
        }
    }

    pub fn next(&self) -> Option<HostValue> {
        self.inner.borrow_mut().next()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dict_keys_coerce_like_property_ids() {
        assert_eq!(DictKey::from_property("3"), DictKey::Int(3));
        assert_eq!(DictKey::from_property("-7"), DictKey::Int(-7));
        // Non-canonical numeric strings stay strings, like JS property ids.
        assert_eq!(DictKey::from_property("03"), DictKey::Str(Rc::from("03")));
        assert_eq!(DictKey::from_property("x"), DictKey::Str(Rc::from("x")));
    }

    #[test]
    fn dict_preserves_insertion_order() {
        let d = HostDict::new();
        d.insert("b".into(), HostValue::Int(1));
        d.insert("a".into(), HostValue::Int(2));
        d.insert("c".into(), HostValue::Int(3));
        let keys: Vec<String> = d.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["b", "a", "c"]);
        d.remove(&"a".into());
        let keys: Vec<String> = d.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["b", "c"]);
    }

    #[test]
    fn list_padded_writes() {
        let l = HostList::new();
        l.set_padded(2, HostValue::Int(9));
        assert_eq!(l.len(), 3);
        assert_eq!(l.get(0), Some(HostValue::None));
        assert_eq!(l.get(2), Some(HostValue::Int(9)));
    }

    #[test]
    fn clones_share_storage() {
        let l = HostList::from_iter([HostValue::Int(1)]);
        let l2 = l.clone();
        l2.push(HostValue::Int(2));
        assert_eq!(l.len(), 2);

        let d = HostDict::new();
        let d2 = d.clone();
        d2.insert("k".into(), HostValue::Bool(true));
        assert!(d.contains(&"k".into()));
    }

    #[test]
    fn mixed_numeric_equality() {
        assert_eq!(HostValue::Int(3), HostValue::Float(3.0));
        assert_eq!(HostValue::Int(3), HostValue::bigint(3));
        assert_ne!(HostValue::Int(3), HostValue::Float(3.5));
    }
}
