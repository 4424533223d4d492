//
// apon/parameters.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Number, Value};

use crate::apon::reader::AponReader;
use crate::apon::writer::AponWriter;
use crate::error::AponError;

// =====================================================================
/// A value in a Parameters tree.
///
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Multi-line text, written as a ( |... ) block.
    Text(String),
    Params(Parameters),
    Array(Vec<ParameterValue>),
}

impl ParameterValue {
    pub fn as_str(&self) -> Option<&str> {
        return match self {
            ParameterValue::Str(s) | ParameterValue::Text(s) => Some(s.as_str()),
            _ => None,
        };
    }

    /// JSON form, used to deserialize typed configuration.
    ///
    pub fn to_json(&self) -> Value {
        return match self {
            ParameterValue::Null => Value::Null,
            ParameterValue::Bool(b) => Value::Bool(*b),
            ParameterValue::Int(i) => Value::Number(Number::from(*i)),
            ParameterValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            ParameterValue::Str(s) | ParameterValue::Text(s) => Value::String(s.clone()),
            ParameterValue::Params(p) => p.to_json(),
            ParameterValue::Array(a) => Value::Array(a.iter().map(|v| v.to_json()).collect()),
        };
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        return match self {
            ParameterValue::Null => f.write_str("null"),
            ParameterValue::Bool(b) => write!(f, "{}", b),
            ParameterValue::Int(i) => write!(f, "{}", i),
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::Str(s) | ParameterValue::Text(s) => f.write_str(s),
            ParameterValue::Params(p) => write!(f, "{}", p),
            ParameterValue::Array(a) => {
                f.write_str("[")?;
                for (i, v) in a.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                f.write_str("]")
            },
        };
    }
}

impl From<&str> for ParameterValue {
    fn from(s: &str) -> ParameterValue {
        if s.contains('\n') {
            return ParameterValue::Text(String::from(s));
        }
        return ParameterValue::Str(String::from(s));
    }
}

impl From<String> for ParameterValue {
    fn from(s: String) -> ParameterValue {
        if s.contains('\n') {
            return ParameterValue::Text(s);
        }
        return ParameterValue::Str(s);
    }
}

impl From<Parameters> for ParameterValue {
    fn from(p: Parameters) -> ParameterValue {
        return ParameterValue::Params(p);
    }
}

// =====================================================================
/// Ordered name/value tree: the in-memory form of APON.
///
/// ```
/// use aspectran::apon::Parameters;
/// let params: Parameters = "name: aspectran\nsettings: {\n  debug: true\n}".parse().unwrap();
/// assert_eq!(params.get_str("name"), Some("aspectran"));
/// assert_eq!(params.get_params("settings").unwrap().get_bool("debug"), Some(true));
/// ```
///
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameters {
    entries: Vec<(String, ParameterValue)>,
}

impl Parameters {
    pub fn new() -> Parameters {
        return Parameters::default();
    }

    // -----------------------------------------------------------------
    /// Sets 'name'; an existing entry keeps its position.
    ///
    pub fn put<V: Into<ParameterValue>>(&mut self, name: &str, value: V) {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((String::from(name), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        return self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v);
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ParameterValue> {
        return self.entries.iter_mut().find(|(n, _)| n == name).map(|(_, v)| v);
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        return self.get(name).and_then(|v| v.as_str());
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        return match self.get(name) {
            Some(ParameterValue::Bool(b)) => Some(*b),
            Some(ParameterValue::Str(s)) => s.parse().ok(),
            _ => None,
        };
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        return match self.get(name) {
            Some(ParameterValue::Int(i)) => Some(*i),
            Some(ParameterValue::Str(s)) => s.parse().ok(),
            _ => None,
        };
    }

    pub fn get_params(&self, name: &str) -> Option<&Parameters> {
        return match self.get(name) {
            Some(ParameterValue::Params(p)) => Some(p),
            _ => None,
        };
    }

    pub fn remove(&mut self, name: &str) -> Option<ParameterValue> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        return Some(self.entries.remove(pos).1);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        return self.entries.iter().map(|(n, _)| n.as_str());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        return self.entries.iter().map(|(n, v)| (n.as_str(), v));
    }

    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (name, value) in self.entries.iter() {
            map.insert(name.clone(), value.to_json());
        }
        return Value::Object(map);
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let writer = AponWriter::new();
        return writer.write(self, f);
    }
}

impl FromStr for Parameters {
    type Err = AponError;

    fn from_str(s: &str) -> Result<Parameters, AponError> {
        return AponReader::parse(s);
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_put_keeps_position() {
        let mut params = Parameters::new();
        params.put("a", "1");
        params.put("b", "2");
        params.put("a", "3");
        let names: Vec<&str> = params.names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(params.get_str("a"), Some("3"));
        assert_eq!(params.remove("a"), Some(ParameterValue::Str(String::from("3"))));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_to_json() {
        let mut inner = Parameters::new();
        inner.put("x", ParameterValue::Int(1));
        let mut params = Parameters::new();
        params.put("name", "n");
        params.put("inner", inner);
        params.put("list", ParameterValue::Array(vec![ParameterValue::Bool(true), ParameterValue::Null]));
        assert_eq!(params.to_json().to_string(),
                r#"{"inner":{"x":1},"list":[true,null],"name":"n"}"#);
    }

    #[test]
    fn test_multiline_is_text() {
        assert_eq!(ParameterValue::from("a\nb"), ParameterValue::Text(String::from("a\nb")));
        assert_eq!(ParameterValue::from("ab"), ParameterValue::Str(String::from("ab")));
    }
}
