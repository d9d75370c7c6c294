//! Cache Value Module
//!
//! Defines the dynamic data tree stored in the cache, and the `Handle`
//! element that marks a live, non-data resource inside such a tree.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};

use crate::cache::MAX_VALUE_DEPTH;
use crate::error::{CacheError, Result};

// == Handle ==
/// A live resource embedded in a value tree: a pending future, an open
/// connection, a callback. Clones share the resource.
#[derive(Clone)]
pub struct Handle {
    label: Arc<str>,
    resource: Arc<dyn Any + Send + Sync>,
}

impl Handle {
    /// Wraps `resource` under a human-readable label.
    pub fn new<T>(label: impl Into<Arc<str>>, resource: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            label: label.into(),
            resource: Arc::new(resource),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Borrows the wrapped resource if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.resource.downcast_ref::<T>()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.resource) as *const (),
            Arc::as_ptr(&other.resource) as *const (),
        )
    }
}

// == Value ==
/// A cached payload.
///
/// Every variant except `Handle` is plain data, and `Clone` on plain data is
/// a full deep copy: no container is shared between two clones.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Handle(Handle),
}

impl Value {
    // == Data Check ==
    /// Verifies the tree holds plain data only, nested at most
    /// `MAX_VALUE_DEPTH` containers deep.
    ///
    /// # Errors
    /// - `CacheError::UnclonableValue` naming the path of the first handle
    ///   found, e.g. `$.object.array[4]`
    /// - `CacheError::NestingTooDeep` naming the first container past the limit
    pub fn ensure_data(&self) -> Result<()> {
        let mut path = String::from("$");
        self.check_at(&mut path, 0)
    }

    fn check_at(&self, path: &mut String, depth: usize) -> Result<()> {
        let depth = match self {
            Value::Array(_) | Value::Map(_) if depth >= MAX_VALUE_DEPTH => {
                return Err(CacheError::NestingTooDeep {
                    path: path.clone(),
                    limit: MAX_VALUE_DEPTH,
                });
            }
            Value::Array(_) | Value::Map(_) => depth + 1,
            _ => depth,
        };

        match self {
            Value::Handle(handle) => Err(CacheError::UnclonableValue {
                path: path.clone(),
                label: handle.label().to_string(),
            }),
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    let mark = path.len();
                    path.push_str(&format!("[{}]", index));
                    item.check_at(path, depth)?;
                    path.truncate(mark);
                }
                Ok(())
            }
            Value::Map(fields) => {
                for (key, item) in fields {
                    let mark = path.len();
                    path.push('.');
                    path.push_str(key);
                    item.check_at(path, depth)?;
                    path.truncate(mark);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Returns true if the tree holds plain data only.
    pub fn is_data(&self) -> bool {
        self.ensure_data().is_ok()
    }

    /// Converts parsed JSON without widening integers to floats.
    ///
    /// # Errors
    /// `CacheError::Deserialization` if an integer falls outside `i64`.
    pub fn from_json_exact(json: serde_json::Value) -> Result<Value> {
        match json {
            serde_json::Value::Number(n) if n.is_u64() && n.as_i64().is_none() => Err(
                CacheError::Deserialization(format!("integer {} does not fit in i64", n)),
            ),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Value::from_json_exact)
                .collect::<Result<Vec<Value>>>()
                .map(Value::Array),
            serde_json::Value::Object(fields) => fields
                .into_iter()
                .map(|(key, item)| Value::from_json_exact(item).map(|value| (key, value)))
                .collect::<Result<BTreeMap<String, Value>>>()
                .map(Value::Map),
            other => Ok(Value::from(other)),
        }
    }

    // == Accessors ==
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the number as f64; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Looks up a field of a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|fields| fields.get(key))
    }

    /// Looks up a field of a map value for mutation.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self {
            Value::Map(fields) => fields.get_mut(key),
            _ => None,
        }
    }
}

// == Serialization ==
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(n) if n.is_finite() => serializer.serialize_f64(*n),
            Value::Float(n) => Err(S::Error::custom(format!(
                "non-finite number {} has no textual form",
                n
            ))),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, item) in fields {
                    map.serialize_entry(key, item)?;
                }
                map.end()
            }
            Value::Handle(handle) => Err(S::Error::custom(format!(
                "handle `{}` is not data",
                handle.label()
            ))),
        }
    }
}

// == Conversions ==
/// Converts parsed JSON into a cache value.
///
/// Numbers that fit `i64` become `Int`. Every other number, including
/// integers above `i64::MAX`, becomes `Float` and may lose precision; use
/// `Value::from_json_exact` to reject those instead.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(key, item)| (key, Value::from(item)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
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

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Value::Map(fields)
    }
}

impl From<Handle> for Value {
    fn from(handle: Handle) -> Self {
        Value::Handle(handle)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested() -> Value {
        Value::from(json!({
            "number": 1,
            "string": "text",
            "array": [1, 2, 3, [4, 5], {"number": 1}]
        }))
    }

    #[test]
    fn test_from_json_keeps_integers_and_floats_apart() {
        assert_eq!(Value::from(json!(123)), Value::Int(123));
        assert_eq!(Value::from(json!(1.5)), Value::Float(1.5));
        assert_eq!(Value::from(json!(null)), Value::Null);
    }

    fn nested_arrays(levels: usize) -> Value {
        (0..levels).fold(Value::Int(1), |inner, _| Value::Array(vec![inner]))
    }

    #[test]
    fn test_large_integers_widen_to_float() {
        assert_eq!(
            Value::from(json!(u64::MAX)),
            Value::Float(18_446_744_073_709_551_615u64 as f64)
        );
        assert_eq!(Value::from(json!(i64::MIN)), Value::Int(i64::MIN));
    }

    #[test]
    fn test_from_json_exact_rejects_large_integers() {
        let result = Value::from_json_exact(json!({"ids": [1, u64::MAX]}));
        assert!(matches!(result, Err(CacheError::Deserialization(_))));

        let value = Value::from_json_exact(json!({"ids": [1, i64::MAX], "f": 0.5})).unwrap();
        assert_eq!(value, Value::from(json!({"ids": [1, i64::MAX], "f": 0.5})));
    }

    #[test]
    fn test_nesting_limit() {
        assert!(nested_arrays(MAX_VALUE_DEPTH).ensure_data().is_ok());

        let err = nested_arrays(MAX_VALUE_DEPTH + 1).ensure_data().unwrap_err();
        assert_eq!(
            err,
            CacheError::NestingTooDeep {
                path: format!("${}", "[0]".repeat(MAX_VALUE_DEPTH)),
                limit: MAX_VALUE_DEPTH,
            }
        );
    }

    #[test]
    fn test_plain_data_passes_check() {
        assert!(nested().ensure_data().is_ok());
        assert!(Value::Null.is_data());
    }

    #[test]
    fn test_handle_is_reported_with_path() {
        let mut value = nested();
        value
            .get_mut("array")
            .and_then(Value::as_array_mut)
            .unwrap()
            .push(Value::from(Handle::new("pending fetch", ())));

        let err = value.ensure_data().unwrap_err();
        assert_eq!(
            err,
            CacheError::UnclonableValue {
                path: "$.array[5]".to_string(),
                label: "pending fetch".to_string(),
            }
        );
    }

    #[test]
    fn test_clone_is_deep() {
        let original = nested();
        let mut copy = original.clone();
        copy.get_mut("array").and_then(Value::as_array_mut).unwrap()[3] = Value::Int(4);

        assert_eq!(
            original.get("array").and_then(Value::as_array).unwrap()[3],
            Value::from(json!([4, 5]))
        );
    }

    #[test]
    fn test_handle_equality_is_identity() {
        let a = Handle::new("conn", 7u32);
        let b = Handle::new("conn", 7u32);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.downcast_ref::<u32>(), Some(&7));
    }

    #[test]
    fn test_serialize_matches_json() {
        let text = serde_json::to_string(&nested()).unwrap();
        let back: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(Value::from(back), nested());
    }

    #[test]
    fn test_serialize_rejects_handle_and_nan() {
        let handle = Value::from(vec![Value::from(Handle::new("timer", ()))]);
        assert!(serde_json::to_string(&handle).is_err());
        assert!(serde_json::to_string(&Value::Float(f64::NAN)).is_err());
    }

    #[test]
    fn test_deserialize_from_text() {
        let value: Value = serde_json::from_str(r#"{"a":[true,"x",2.5]}"#).unwrap();
        assert_eq!(
            value.get("a").and_then(Value::as_array).unwrap()[2],
            Value::Float(2.5)
        );
    }
}
