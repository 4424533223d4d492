//
// env/source.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::collections::HashMap;
use std::env;

// =====================================================================
/// Where startup properties such as `aspectran.profiles.active` come
/// from.
///
pub trait PropertySource {
    fn property(&self, name: &str) -> Option<String>;
}

impl PropertySource for HashMap<String, String> {
    fn property(&self, name: &str) -> Option<String> {
        return self.get(name).cloned();
    }
}

impl<S: PropertySource + ?Sized> PropertySource for &S {
    fn property(&self, name: &str) -> Option<String> {
        return (**self).property(name);
    }
}

// =====================================================================
/// Reads properties from environment variables.  A property name maps
/// to an upper-cased variable with '.' replaced by '_', so
/// `aspectran.profiles.active` is read from ASPECTRAN_PROFILES_ACTIVE.
///
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvVarPropertySource;

impl EnvVarPropertySource {
    pub fn variable_name(name: &str) -> String {
        return name.replace(['.', '-'], "_").to_uppercase();
    }
}

impl PropertySource for EnvVarPropertySource {
    fn property(&self, name: &str) -> Option<String> {
        return env::var(EnvVarPropertySource::variable_name(name)).ok();
    }
}

// =====================================================================
/// A source with nothing in it.
///
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPropertySource;

impl PropertySource for NoPropertySource {
    fn property(&self, _name: &str) -> Option<String> {
        return None;
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_variable_name() {
        let test_specs = [
            ( "aspectran.profiles.active", "ASPECTRAN_PROFILES_ACTIVE" ),
            ( "aspectran.profiles.default", "ASPECTRAN_PROFILES_DEFAULT" ),
            ( "base-path", "BASE_PATH" ),
        ];
        for (name, guess) in test_specs.iter() {
            assert_eq!(EnvVarPropertySource::variable_name(name), *guess);
        }
    }

    #[test]
    fn test_map_source() {
        let mut map: HashMap<String, String> = HashMap::new();
        map.insert(String::from("a"), String::from("1"));
        assert_eq!(map.property("a"), Some(String::from("1")));
        assert_eq!((&map).property("b"), None);
        assert_eq!(NoPropertySource.property("a"), None);
    }
}
