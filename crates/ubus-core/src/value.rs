//! Dynamic host values
//!
//! Lists and dicts are reference-counted and mutable, the way a scripting
//! host shares containers, so a program can make a list that contains
//! itself. Dict keys are arbitrary host values; only string keys survive
//! marshaling.

use serde_json::Value;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

/// A value as the host scripting environment sees it
#[derive(Clone)]
pub enum HostValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(HostList),
    Dict(HostDict),
}

impl HostValue {
    pub fn list(items: impl IntoIterator<Item = HostValue>) -> Self {
        Self::List(HostList::from_vec(items.into_iter().collect()))
    }

    pub fn dict<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<HostValue>,
        V: Into<HostValue>,
    {
        let dict = HostDict::new();
        for (key, value) in pairs {
            dict.insert(key, value);
        }
        Self::Dict(dict)
    }

    /// Host-facing type name, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&HostDict> {
        match self {
            Self::Dict(dict) => Some(dict),
            _ => None,
        }
    }
}

/// Shared, mutable list
#[derive(Clone, Default)]
pub struct HostList(Rc<RefCell<Vec<HostValue>>>);

impl HostList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(items: Vec<HostValue>) -> Self {
        Self(Rc::new(RefCell::new(items)))
    }

    pub fn push(&self, value: impl Into<HostValue>) {
        self.0.borrow_mut().push(value.into());
    }

    pub fn get(&self, index: usize) -> Option<HostValue> {
        self.0.borrow().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn items(&self) -> Ref<'_, Vec<HostValue>> {
        self.0.borrow()
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

/// Shared, mutable mapping with host-value keys, kept in insertion order
#[derive(Clone, Default)]
pub struct HostDict(Rc<RefCell<Vec<(HostValue, HostValue)>>>);

impl HostDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value stored under `key`
    pub fn insert(&self, key: impl Into<HostValue>, value: impl Into<HostValue>) {
        let key = key.into();
        let value = value.into();
        let mut entries = self.0.borrow_mut();
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &HostValue) -> Option<HostValue> {
        self.0
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn get_str(&self, key: &str) -> Option<HostValue> {
        self.get(&HostValue::from(key))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn items(&self) -> Ref<'_, Vec<(HostValue, HostValue)>> {
        self.0.borrow()
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

// Structural equality. Comparing two cyclic values does not terminate.

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for HostList {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.items() == *other.items()
    }
}

impl PartialEq for HostDict {
    /// Order-insensitive
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        self.len() == other.len()
            && self
                .items()
                .iter()
                .all(|(key, value)| other.get(key).as_ref() == Some(value))
    }
}

thread_local! {
    static FORMATTING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Format a container, printing `placeholder` when it is already being
/// formatted further up the stack.
fn fmt_container(
    id: usize,
    placeholder: &str,
    f: &mut fmt::Formatter<'_>,
    body: impl FnOnce(&mut fmt::Formatter<'_>) -> fmt::Result,
) -> fmt::Result {
    if FORMATTING.with(|stack| stack.borrow().contains(&id)) {
        return f.write_str(placeholder);
    }
    FORMATTING.with(|stack| stack.borrow_mut().push(id));
    let result = body(f);
    FORMATTING.with(|stack| stack.borrow_mut().pop());
    result
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "bytes({})", b.len()),
            Self::List(list) => list.fmt(f),
            Self::Dict(dict) => dict.fmt(f),
        }
    }
}

impl fmt::Debug for HostList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_container(self.identity(), "[...]", f, |f| {
            f.debug_list().entries(self.items().iter()).finish()
        })
    }
}

impl fmt::Debug for HostDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_container(self.identity(), "{...}", f, |f| {
            f.debug_map()
                .entries(self.items().iter().map(|(k, v)| (k, v)))
                .finish()
        })
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for HostValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for HostValue {
    fn from(i: i32) -> Self {
        Self::Int(i.into())
    }
}

impl From<f64> for HostValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<HostList> for HostValue {
    fn from(list: HostList) -> Self {
        Self::List(list)
    }
}

impl From<HostDict> for HostValue {
    fn from(dict: HostDict) -> Self {
        Self::Dict(dict)
    }
}

/// Decoding side of the JSON facility: every JSON document has a host form.
impl From<Value> for HostValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::None,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::Str(s),
            Value::Array(items) => Self::list(items.into_iter().map(HostValue::from)),
            Value::Object(map) => {
                let dict = HostDict::new();
                for (key, value) in map {
                    dict.insert(key, HostValue::from(value));
                }
                Self::Dict(dict)
            }
        }
    }
}
