//! State value model
//!
//! [`Value`] is the live, in-memory shape of a store's state. Containers are
//! reference-counted and interior-mutable, so the same node can be reachable
//! from several parents and may even contain itself. Identity is pointer
//! identity, exactly what the serializer needs to detect revisits.
//!
//! [`SerializedValue`] is the display-safe result of serialization: an owned,
//! acyclic tree of primitives, arrays, string-keyed objects and function
//! references.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// Shared object node (insertion-ordered string keys).
pub type ObjectRef = Rc<RefCell<IndexMap<String, Value>>>;
/// Shared array node.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
/// Shared map node; keys may be any value.
pub type MapRef = Rc<RefCell<Vec<(Value, Value)>>>;
/// Shared set node, in insertion order.
pub type SetRef = Rc<RefCell<Vec<Value>>>;
/// Shared date node.
pub type DateRef = Rc<DateTime<Utc>>;

#[derive(Debug)]
struct FunctionInfo {
    name: String,
    source: String,
    arity: usize,
}

/// An opaque reference to a callable living in the inspected state.
///
/// Functions are never serialized; snapshots keep the reference itself and
/// only turn it into text at display time.
#[derive(Clone)]
pub struct FunctionRef(Rc<FunctionInfo>);

impl FunctionRef {
    pub fn new(name: impl Into<String>, source: impl Into<String>, arity: usize) -> Self {
        Self(Rc::new(FunctionInfo {
            name: name.into(),
            source: source.into(),
            arity,
        }))
    }

    /// Declared name; empty for anonymous functions.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Name for display, `anonymous` when none was declared.
    pub fn display_name(&self) -> &str {
        if self.0.name.is_empty() {
            "anonymous"
        } else {
            &self.0.name
        }
    }

    pub fn source(&self) -> &str {
        &self.0.source
    }

    pub fn arity(&self) -> usize {
        self.0.arity
    }

    pub fn ptr_eq(&self, other: &FunctionRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for FunctionRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionRef({})", self.display_name())
    }
}

/// A live state value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Function(FunctionRef),
    Date(DateRef),
    Array(ArrayRef),
    Object(ObjectRef),
    Map(MapRef),
    Set(SetRef),
}

impl Value {
    /// Create an object from key/value pairs, preserving their order.
    pub fn object<K, I>(entries: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Value::Object(Rc::new(RefCell::new(map)))
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
        Value::Map(Rc::new(RefCell::new(entries.into_iter().collect())))
    }

    /// Create a set. Members are kept in the given order; the caller is
    /// responsible for uniqueness.
    pub fn set(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Set(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn date(at: DateTime<Utc>) -> Value {
        Value::Date(Rc::new(at))
    }

    pub fn function(name: impl Into<String>, source: impl Into<String>, arity: usize) -> Value {
        Value::Function(FunctionRef::new(name, source, arity))
    }

    /// Insert `value` under `key` when `self` is an object.
    ///
    /// Returns `false` (and does nothing) for any other variant.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> bool {
        match self {
            Value::Object(obj) => {
                obj.borrow_mut().insert(key.into(), value);
                true
            }
            _ => false,
        }
    }

    /// Append `value` when `self` is an array or a set.
    pub fn push(&self, value: Value) -> bool {
        match self {
            Value::Array(items) | Value::Set(items) => {
                items.borrow_mut().push(value);
                true
            }
            _ => false,
        }
    }

    /// Look up an object key.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(obj) => obj.borrow().get(key).cloned(),
            _ => None,
        }
    }

    /// Pointer identity of reference variants; `None` for primitives and
    /// functions.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Date(d) => Some(Rc::as_ptr(d) as *const () as usize),
            Value::Array(a) => Some(Rc::as_ptr(a) as *const () as usize),
            Value::Object(o) => Some(Rc::as_ptr(o) as *const () as usize),
            Value::Map(m) => Some(Rc::as_ptr(m) as *const () as usize),
            Value::Set(s) => Some(Rc::as_ptr(s) as *const () as usize),
            _ => None,
        }
    }

    /// Same-value comparison: identity for references, value equality for
    /// primitives (`NaN` is the same as `NaN`).
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => match (self.identity(), other.identity()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
        }
    }

    /// Build a value tree from parsed JSON. Every container is a fresh node.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::array(items.iter().map(Value::from_json)),
            serde_json::Value::Object(entries) => {
                Value::object(entries.iter().map(|(k, v)| (k.clone(), Value::from_json(v))))
            }
        }
    }
}

impl fmt::Debug for Value {
    // Shallow on purpose: containers may be cyclic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Function(func) => write!(f, "{func:?}"),
            Value::Date(d) => write!(f, "Date({})", d.to_rfc3339()),
            Value::Array(a) => write!(f, "Array(len = {})", a.borrow().len()),
            Value::Object(o) => write!(f, "Object(keys = {:?})", o.borrow().keys().collect::<Vec<_>>()),
            Value::Map(m) => write!(f, "Map(len = {})", m.borrow().len()),
            Value::Set(s) => write!(f, "Set(len = {})", s.borrow().len()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<FunctionRef> for Value {
    fn from(func: FunctionRef) -> Self {
        Value::Function(func)
    }
}

/// A display-safe, acyclic snapshot of a [`Value`].
#[derive(Clone, Debug, PartialEq)]
pub enum SerializedValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<SerializedValue>),
    Object(IndexMap<String, SerializedValue>),
    Function(FunctionRef),
}

impl SerializedValue {
    /// Look up an object key.
    pub fn get(&self, key: &str) -> Option<&SerializedValue> {
        match self {
            SerializedValue::Object(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Look up an array element.
    pub fn at(&self, index: usize) -> Option<&SerializedValue> {
        match self {
            SerializedValue::Array(items) => items.get(index),
            _ => None,
        }
    }

    /// A keyed (non-array, non-null) object.
    pub fn is_object(&self) -> bool {
        matches!(self, SerializedValue::Object(_))
    }

    /// An array or an object.
    pub fn is_container(&self) -> bool {
        matches!(self, SerializedValue::Object(_) | SerializedValue::Array(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SerializedValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Number of direct children; zero for leaves.
    pub fn len(&self) -> usize {
        match self {
            SerializedValue::Array(items) => items.len(),
            SerializedValue::Object(entries) => entries.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct children as `(key, value)` pairs. Array keys are indices.
    pub fn children(&self) -> Vec<(String, &SerializedValue)> {
        match self {
            SerializedValue::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            SerializedValue::Object(entries) => {
                entries.iter().map(|(k, v)| (k.clone(), v)).collect()
            }
            _ => Vec::new(),
        }
    }

    /// JSON form. Functions are dropped from objects and become `null` inside
    /// arrays and at the top level.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            SerializedValue::Null | SerializedValue::Function(_) => serde_json::Value::Null,
            SerializedValue::Bool(b) => serde_json::Value::Bool(*b),
            SerializedValue::Number(n) => number_to_json(*n),
            SerializedValue::String(s) => serde_json::Value::String(s.clone()),
            SerializedValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(SerializedValue::to_json).collect())
            }
            SerializedValue::Object(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .filter(|(_, v)| !matches!(v, SerializedValue::Function(_)))
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    pub fn from_json(json: &serde_json::Value) -> SerializedValue {
        match json {
            serde_json::Value::Null => SerializedValue::Null,
            serde_json::Value::Bool(b) => SerializedValue::Bool(*b),
            serde_json::Value::Number(n) => SerializedValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => SerializedValue::String(s.clone()),
            serde_json::Value::Array(items) => {
                SerializedValue::Array(items.iter().map(SerializedValue::from_json).collect())
            }
            serde_json::Value::Object(entries) => SerializedValue::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), SerializedValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Rebuild a live value from this snapshot, as handed back to a store
    /// during time travel. Every container becomes a fresh node.
    pub fn to_value(&self) -> Value {
        match self {
            SerializedValue::Null => Value::Null,
            SerializedValue::Bool(b) => Value::Bool(*b),
            SerializedValue::Number(n) => Value::Number(*n),
            SerializedValue::String(s) => Value::String(s.clone()),
            SerializedValue::Function(func) => Value::Function(func.clone()),
            SerializedValue::Array(items) => Value::array(items.iter().map(SerializedValue::to_value)),
            SerializedValue::Object(entries) => {
                Value::object(entries.iter().map(|(k, v)| (k.clone(), v.to_value())))
            }
        }
    }
}

impl Serialize for SerializedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<&str> for SerializedValue {
    fn from(s: &str) -> Self {
        SerializedValue::String(s.to_string())
    }
}

impl From<String> for SerializedValue {
    fn from(s: String) -> Self {
        SerializedValue::String(s)
    }
}

impl From<f64> for SerializedValue {
    fn from(n: f64) -> Self {
        SerializedValue::Number(n)
    }
}

impl From<i32> for SerializedValue {
    fn from(n: i32) -> Self {
        SerializedValue::Number(n as f64)
    }
}

impl From<bool> for SerializedValue {
    fn from(b: bool) -> Self {
        SerializedValue::Bool(b)
    }
}

/// Largest integer an `f64` represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// JSON number for an `f64`: integral values print without a fraction,
/// non-finite values become `null`.
pub(crate) fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}
