//
// bean/class.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::activity::{ResponseAdapter, ResultValue, ResultValueMap};
use crate::error::BoxError;

/// Class name of the builtin PropertiesBean.
///
pub const PROPERTIES_BEAN_CLASS: &str = "aspectran.bean.PropertiesBean";

// =====================================================================
/// What a bean method receives.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    pub translet_name: Option<String>,
    pub arguments: ResultValueMap,
    pub properties: ResultValueMap,
}

impl Invocation {
    pub fn new() -> Invocation {
        return Invocation::default();
    }

    pub fn argument(&self, name: &str) -> Option<&ResultValue> {
        return self.arguments.get(name);
    }
}

// =====================================================================
/// An object created from a bean rule.
///
/// Properties are set once, right after construction; afterwards the
/// bean is shared and only invoked.
///
pub trait Bean: fmt::Debug + Send + Sync {
    fn invoke(&self, method: &str, invocation: &Invocation) -> Result<ResultValue, BoxError>;

    fn property(&self, _name: &str) -> Option<ResultValue> {
        return None;
    }

    fn set_property(&mut self, name: &str, value: ResultValue) -> Result<(), BoxError>;

    /// The bean as a value, for `#{id}` references.
    ///
    fn as_value(&self) -> ResultValue {
        return ResultValue::Null;
    }

    fn as_template_engine(&self) -> Option<&dyn TemplateEngine> {
        return None;
    }

    fn as_view_dispatcher(&self) -> Option<&dyn ViewDispatcher> {
        return None;
    }
}

/// A bean that renders templates for `<template engine="id">`.
///
pub trait TemplateEngine {
    fn process(&self, template_name: Option<&str>, content: Option<&str>,
            model: &ResultValueMap, out: &mut dyn fmt::Write) -> Result<(), BoxError>;
}

/// A bean that renders views for `<dispatch>`.
///
pub trait ViewDispatcher {
    fn dispatch(&self, view_name: &str, model: &ResultValueMap,
            response: &mut dyn ResponseAdapter) -> Result<(), BoxError>;
}

// =====================================================================
/// Constructor of a bean class.
///
pub type BeanConstructor = Arc<dyn Fn() -> Box<dyn Bean> + Send + Sync>;

/// Bean classes known to a context, by class name.
///
/// ```
/// use aspectran::bean::{BeanClassRegistry, PropertiesBean, PROPERTIES_BEAN_CLASS};
/// let mut classes = BeanClassRegistry::new();
/// classes.register("sample.Hello", || Box::new(PropertiesBean::new()));
/// assert!(classes.contains("sample.Hello"));
/// assert!(! classes.contains(PROPERTIES_BEAN_CLASS));
/// assert!(BeanClassRegistry::with_builtins().contains(PROPERTIES_BEAN_CLASS));
/// ```
///
#[derive(Clone, Default)]
pub struct BeanClassRegistry {
    classes: BTreeMap<String, BeanConstructor>,
}

impl fmt::Debug for BeanClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.classes.keys()).finish()
    }
}

impl BeanClassRegistry {
    pub fn new() -> BeanClassRegistry {
        return BeanClassRegistry::default();
    }

    /// A registry holding the builtin classes.
    ///
    pub fn with_builtins() -> BeanClassRegistry {
        let mut classes = BeanClassRegistry::new();
        classes.register(PROPERTIES_BEAN_CLASS, || Box::new(PropertiesBean::new()));
        return classes;
    }

    pub fn register<F>(&mut self, class_name: &str, constructor: F)
            where F: Fn() -> Box<dyn Bean> + Send + Sync + 'static {
        self.classes.insert(String::from(class_name), Arc::new(constructor));
    }

    pub fn contains(&self, class_name: &str) -> bool {
        return self.classes.contains_key(class_name);
    }

    /// Registered class names in ascending order.
    ///
    pub fn class_names(&self) -> Vec<String> {
        return self.classes.keys().cloned().collect();
    }

    pub fn instantiate(&self, class_name: &str) -> Option<Box<dyn Bean>> {
        return self.classes.get(class_name).map(|c| c());
    }
}

// =====================================================================
/// A bean holding nothing but its properties.
///
/// Method "get" returns the property named by the argument "name";
/// method "getAll" returns every property.
///
#[derive(Debug, Clone, Default)]
pub struct PropertiesBean {
    properties: ResultValueMap,
}

impl PropertiesBean {
    pub fn new() -> PropertiesBean {
        return PropertiesBean::default();
    }
}

impl Bean for PropertiesBean {
    fn invoke(&self, method: &str, invocation: &Invocation) -> Result<ResultValue, BoxError> {
        return match method {
            "get" => {
                let name = invocation.argument("name")
                        .and_then(|v| v.as_str())
                        .ok_or("Method 'get' requires the argument 'name'")?;
                Ok(self.properties.get(name).cloned().unwrap_or_default())
            },
            "getAll" => Ok(ResultValue::Map(self.properties.clone())),
            _ => Err(format!("No method '{}' in {}", method, PROPERTIES_BEAN_CLASS).into()),
        };
    }

    fn property(&self, name: &str) -> Option<ResultValue> {
        return self.properties.get(name).cloned();
    }

    fn set_property(&mut self, name: &str, value: ResultValue) -> Result<(), BoxError> {
        self.properties.put(name, value);
        return Ok(());
    }

    fn as_value(&self) -> ResultValue {
        return ResultValue::Map(self.properties.clone());
    }
}

// =====================================================================
/// The product of a factory method.
///
#[derive(Debug, Clone, PartialEq)]
pub struct ValueBean {
    value: ResultValue,
}

impl ValueBean {
    pub fn new(value: ResultValue) -> ValueBean {
        return ValueBean { value };
    }
}

impl Bean for ValueBean {
    fn invoke(&self, method: &str, _invocation: &Invocation) -> Result<ResultValue, BoxError> {
        return match method {
            "getValue" => Ok(self.value.clone()),
            _ => Err(format!("No method '{}' in a factory product", method).into()),
        };
    }

    fn property(&self, name: &str) -> Option<ResultValue> {
        return self.value.as_map().and_then(|m| m.get(name)).cloned();
    }

    fn set_property(&mut self, name: &str, value: ResultValue) -> Result<(), BoxError> {
        return match self.value.as_map_mut() {
            Some(map) => {
                map.put(name, value);
                Ok(())
            },
            None => Err(format!("Cannot set property '{}' of a {} value", name, self.value).into()),
        };
    }

    fn as_value(&self) -> ResultValue {
        return self.value.clone();
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_class_names() {
        let mut classes = BeanClassRegistry::with_builtins();
        classes.register("sample.B", || Box::new(PropertiesBean::new()));
        classes.register("sample.A", || Box::new(PropertiesBean::new()));
        assert_eq!(classes.class_names(),
                vec!["aspectran.bean.PropertiesBean", "sample.A", "sample.B"]);
        assert!(classes.instantiate("sample.A").is_some());
        assert!(classes.instantiate("sample.C").is_none());
    }

    #[test]
    fn test_properties_bean() {
        let mut bean = PropertiesBean::new();
        bean.set_property("greeting", ResultValue::from("hello")).unwrap();
        let mut invocation = Invocation::new();
        invocation.arguments.put("name", "greeting");
        let test_specs = [
            ( "get", Some("hello") ),
            ( "getAll", Some("{greeting=hello}") ),
            ( "nothing", None ),
        ];
        for (method, guess) in test_specs.iter() {
            let result = bean.invoke(method, &invocation).ok().map(|v| v.to_string());
            assert_eq!(result.as_deref(), *guess);
        }
        assert_eq!(bean.property("greeting"), Some(ResultValue::from("hello")));
    }

    #[test]
    fn test_value_bean() {
        let mut bean = ValueBean::new(ResultValue::from("x"));
        assert_eq!(bean.as_value(), ResultValue::from("x"));
        assert!(bean.set_property("a", ResultValue::Null).is_err());
        let mut map = ResultValueMap::new();
        map.put("a", 1i64);
        let bean = ValueBean::new(ResultValue::Map(map));
        assert_eq!(bean.property("a"), Some(ResultValue::Int(1)));
    }
}
