//
// activity/value.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::apon::{ParameterValue, Parameters};

// =====================================================================
/// A value produced by an action or an item.
///
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ResultValue>),
    Map(ResultValueMap),
}

impl ResultValue {
    pub fn is_null(&self) -> bool {
        return *self == ResultValue::Null;
    }

    pub fn as_str(&self) -> Option<&str> {
        return match self {
            ResultValue::Text(s) => Some(s.as_str()),
            _ => None,
        };
    }

    pub fn as_map(&self) -> Option<&ResultValueMap> {
        return match self {
            ResultValue::Map(m) => Some(m),
            _ => None,
        };
    }

    pub fn as_map_mut(&mut self) -> Option<&mut ResultValueMap> {
        return match self {
            ResultValue::Map(m) => Some(m),
            _ => None,
        };
    }

    // -----------------------------------------------------------------
    /// The value in APON form.
    ///
    pub fn to_parameter_value(&self) -> ParameterValue {
        return match self {
            ResultValue::Null => ParameterValue::Null,
            ResultValue::Bool(b) => ParameterValue::Bool(*b),
            ResultValue::Int(i) => ParameterValue::Int(*i),
            ResultValue::Float(f) => ParameterValue::Float(*f),
            ResultValue::Text(s) => ParameterValue::from(s.as_str()),
            ResultValue::List(list) => ParameterValue::Array(
                    list.iter().map(|v| v.to_parameter_value()).collect()),
            ResultValue::Map(map) => ParameterValue::Params(map.to_parameters()),
        };
    }
}

impl Default for ResultValue {
    fn default() -> ResultValue {
        return ResultValue::Null;
    }
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        return match self {
            ResultValue::Null => f.write_str("null"),
            ResultValue::Bool(b) => write!(f, "{}", b),
            ResultValue::Int(i) => write!(f, "{}", i),
            ResultValue::Float(v) => write!(f, "{}", v),
            ResultValue::Text(s) => f.write_str(s),
            ResultValue::List(list) => {
                f.write_str("[")?;
                for (i, v) in list.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                f.write_str("]")
            },
            ResultValue::Map(map) => write!(f, "{}", map),
        };
    }
}

impl From<&str> for ResultValue {
    fn from(s: &str) -> ResultValue {
        return ResultValue::Text(String::from(s));
    }
}

impl From<String> for ResultValue {
    fn from(s: String) -> ResultValue {
        return ResultValue::Text(s);
    }
}

impl From<i64> for ResultValue {
    fn from(i: i64) -> ResultValue {
        return ResultValue::Int(i);
    }
}

impl From<f64> for ResultValue {
    fn from(v: f64) -> ResultValue {
        return ResultValue::Float(v);
    }
}

impl From<bool> for ResultValue {
    fn from(b: bool) -> ResultValue {
        return ResultValue::Bool(b);
    }
}

impl From<ResultValueMap> for ResultValue {
    fn from(m: ResultValueMap) -> ResultValue {
        return ResultValue::Map(m);
    }
}

impl From<Vec<ResultValue>> for ResultValue {
    fn from(list: Vec<ResultValue>) -> ResultValue {
        return ResultValue::List(list);
    }
}

impl From<&ParameterValue> for ResultValue {
    fn from(v: &ParameterValue) -> ResultValue {
        return match v {
            ParameterValue::Null => ResultValue::Null,
            ParameterValue::Bool(b) => ResultValue::Bool(*b),
            ParameterValue::Int(i) => ResultValue::Int(*i),
            ParameterValue::Float(f) => ResultValue::Float(*f),
            ParameterValue::Str(s) | ParameterValue::Text(s) => ResultValue::Text(s.clone()),
            ParameterValue::Params(p) => {
                let mut map = ResultValueMap::new();
                for (name, value) in p.iter() {
                    map.put(name, ResultValue::from(value));
                }
                ResultValue::Map(map)
            },
            ParameterValue::Array(a) => ResultValue::List(a.iter().map(ResultValue::from).collect()),
        };
    }
}

impl Serialize for ResultValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        return match self {
            ResultValue::Null => serializer.serialize_unit(),
            ResultValue::Bool(b) => serializer.serialize_bool(*b),
            ResultValue::Int(i) => serializer.serialize_i64(*i),
            ResultValue::Float(v) => serializer.serialize_f64(*v),
            ResultValue::Text(s) => serializer.serialize_str(s),
            ResultValue::List(list) => {
                let mut seq = serializer.serialize_seq(Some(list.len()))?;
                for v in list.iter() {
                    seq.serialize_element(v)?;
                }
                seq.end()
            },
            ResultValue::Map(map) => map.serialize(serializer),
        };
    }
}

// =====================================================================
/// Ordered map of named values; putting an existing name replaces
/// its value in place.
///
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultValueMap {
    entries: Vec<(String, ResultValue)>,
}

impl ResultValueMap {
    pub fn new() -> ResultValueMap {
        return ResultValueMap::default();
    }

    pub fn put<V: Into<ResultValue>>(&mut self, name: &str, value: V) {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((String::from(name), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ResultValue> {
        return self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v);
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ResultValue> {
        return self.entries.iter_mut().find(|(n, _)| n == name).map(|(_, v)| v);
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        return self.get(name).and_then(|v| v.as_str());
    }

    pub fn contains(&self, name: &str) -> bool {
        return self.get(name).is_some();
    }

    pub fn remove(&mut self, name: &str) -> Option<ResultValue> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        return Some(self.entries.remove(pos).1);
    }

    /// Puts every entry of 'other'; its values win.
    ///
    pub fn merge(&mut self, other: ResultValueMap) {
        for (name, value) in other.entries.into_iter() {
            self.put(&name, value);
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        return self.entries.iter().map(|(n, _)| n.as_str());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResultValue)> {
        return self.entries.iter().map(|(n, v)| (n.as_str(), v));
    }

    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    pub fn to_parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        for (name, value) in self.entries.iter() {
            params.put(name, value.to_parameter_value());
        }
        return params;
    }
}

impl IntoIterator for ResultValueMap {
    type Item = (String, ResultValue);
    type IntoIter = std::vec::IntoIter<(String, ResultValue)>;

    fn into_iter(self) -> Self::IntoIter {
        return self.entries.into_iter();
    }
}

impl fmt::Display for ResultValueMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        f.write_str("}")
    }
}

impl Serialize for ResultValueMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in self.entries.iter() {
            map.serialize_entry(name, value)?;
        }
        return map.end();
    }
}
