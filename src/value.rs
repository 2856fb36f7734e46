// JValue: the document tree a mapping is evaluated against
// Containers are Rc-wrapped so resolved subtrees share storage with the source

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Number;

/// A JSON value with O(1) clone semantics.
///
/// Arrays, objects and strings are wrapped in `Rc`, so handing a resolved
/// subtree to the output never deep-copies it. Objects keep insertion order.
/// Numbers keep their parsed representation: integers beyond 2^53 and floats
/// such as `1.0` come back out exactly as they went in.
#[derive(Clone, Debug)]
pub enum JValue {
    Null,
    Bool(bool),
    Number(Number),
    String(Rc<str>),
    Array(Rc<Vec<JValue>>),
    Object(Rc<IndexMap<String, JValue>>),
}

impl JValue {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            JValue::Null => "null",
            JValue::Bool(_) => "boolean",
            JValue::Number(_) => "number",
            JValue::String(_) => "string",
            JValue::Array(_) => "array",
            JValue::Object(_) => "object",
        }
    }

    pub fn string(s: impl Into<Rc<str>>) -> Self {
        JValue::String(s.into())
    }

    pub fn array(v: Vec<JValue>) -> Self {
        JValue::Array(Rc::new(v))
    }

    pub fn object(m: IndexMap<String, JValue>) -> Self {
        JValue::Object(Rc::new(m))
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            JValue::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array(&self) -> Option<&Vec<JValue>> {
        match self {
            JValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    #[inline]
    pub fn as_object(&self) -> Option<&IndexMap<String, JValue>> {
        match self {
            JValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Index into an object by key. Returns explicit nulls as `Some(&Null)`.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&JValue> {
        match self {
            JValue::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Field access as the mapper sees it: a missing key, an explicit null
    /// and a non-object receiver all read as absent.
    #[inline]
    pub fn field(&self, name: &str) -> Option<&JValue> {
        match self.get(name) {
            Some(JValue::Null) | None => None,
            Some(v) => Some(v),
        }
    }
}

// ── From impls ───────────────────────────────────────────────────────────────

impl From<bool> for JValue {
    fn from(b: bool) -> Self {
        JValue::Bool(b)
    }
}

impl From<i64> for JValue {
    fn from(n: i64) -> Self {
        JValue::Number(n.into())
    }
}

impl From<u64> for JValue {
    fn from(n: u64) -> Self {
        JValue::Number(n.into())
    }
}

/// NaN and infinities have no JSON form and become `Null`.
impl From<f64> for JValue {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(JValue::Null, JValue::Number)
    }
}

impl From<&str> for JValue {
    fn from(s: &str) -> Self {
        JValue::String(s.into())
    }
}

impl From<String> for JValue {
    fn from(s: String) -> Self {
        JValue::String(s.into())
    }
}

impl From<Vec<JValue>> for JValue {
    fn from(v: Vec<JValue>) -> Self {
        JValue::array(v)
    }
}

impl From<IndexMap<String, JValue>> for JValue {
    fn from(m: IndexMap<String, JValue>) -> Self {
        JValue::object(m)
    }
}

impl<T: Into<JValue>> From<Option<T>> for JValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(JValue::Null, Into::into)
    }
}

impl From<serde_json::Value> for JValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => JValue::Null,
            serde_json::Value::Bool(b) => JValue::Bool(b),
            serde_json::Value::Number(n) => JValue::Number(n),
            serde_json::Value::String(s) => JValue::String(s.into()),
            serde_json::Value::Array(arr) => {
                JValue::array(arr.into_iter().map(JValue::from).collect())
            }
            serde_json::Value::Object(map) => {
                JValue::object(map.into_iter().map(|(k, v)| (k, JValue::from(v))).collect())
            }
        }
    }
}

// ── PartialEq ────────────────────────────────────────────────────────────────

impl PartialEq for JValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JValue::Null, JValue::Null) => true,
            (JValue::Bool(a), JValue::Bool(b)) => a == b,
            // 1 and 1.0 are different documents
            (JValue::Number(a), JValue::Number(b)) => a == b,
            (JValue::String(a), JValue::String(b)) => a == b,
            (JValue::Array(a), JValue::Array(b)) => Rc::ptr_eq(a, b) || a == b,
            (JValue::Object(a), JValue::Object(b)) => Rc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

/// Compact JSON.
impl fmt::Display for JValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

// ── Serde ────────────────────────────────────────────────────────────────────

impl Serialize for JValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            JValue::Null => serializer.serialize_none(),
            JValue::Bool(b) => serializer.serialize_bool(*b),
            JValue::Number(n) => n.serialize(serializer),
            JValue::String(s) => serializer.serialize_str(s),
            JValue::Array(arr) => {
                let mut seq = serializer.serialize_seq(Some(arr.len()))?;
                for v in arr.iter() {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            JValue::Object(map) => {
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map.iter() {
                    m.serialize_entry(k, v)?;
                }
                m.end()
            }
        }
    }
}

// Single pass from text to JValue, no intermediate serde_json::Value
impl<'de> serde::Deserialize<'de> for JValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(JValueVisitor)
    }
}

struct JValueVisitor;

impl<'de> Visitor<'de> for JValueVisitor {
    type Value = JValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "any valid JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<JValue, E> {
        Ok(JValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<JValue, E> {
        Ok(JValue::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<JValue, E> {
        Ok(JValue::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<JValue, E> {
        Number::from_f64(v)
            .map(JValue::Number)
            .ok_or_else(|| E::custom(format!("{} is not a JSON number", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<JValue, E> {
        Ok(JValue::string(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<JValue, E> {
        Ok(JValue::String(v.into()))
    }

    fn visit_none<E: de::Error>(self) -> Result<JValue, E> {
        Ok(JValue::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<JValue, E> {
        Ok(JValue::Null)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<JValue, A::Error> {
        let mut vec = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(elem) = seq.next_element()? {
            vec.push(elem);
        }
        Ok(JValue::array(vec))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<JValue, A::Error> {
        let mut m = IndexMap::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((k, v)) = map.next_entry()? {
            m.insert(k, v);
        }
        Ok(JValue::object(m))
    }
}

impl JValue {
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_string_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json_str(s: &str) -> Result<JValue, serde_json::Error> {
        serde_json::from_str(s)
    }
}

// ── jvalue! macro ────────────────────────────────────────────────────────────

/// Build a `JValue` literal, like `serde_json::json!`.
///
/// Leaves go through `JValue::from`, so integers need a suffix
/// (`1i64`) to pick the integer conversion.
#[macro_export]
macro_rules! jvalue {
    (null) => {
        $crate::value::JValue::Null
    };

    (true) => {
        $crate::value::JValue::Bool(true)
    };

    (false) => {
        $crate::value::JValue::Bool(false)
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::value::JValue::Array(std::rc::Rc::new(vec![ $( $crate::jvalue!($elem) ),* ]))
    };

    ({ $($key:tt : $val:tt),* $(,)? }) => {
        {
            let mut map = $crate::indexmap::IndexMap::new();
            $(
                map.insert(($key).to_string(), $crate::jvalue!($val));
            )*
            $crate::value::JValue::Object(std::rc::Rc::new(map))
        }
    };

    ($other:expr) => {
        $crate::value::JValue::from($other)
    };
}
