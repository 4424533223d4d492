//
// env/config.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;

use crate::apon::AponReader;
use crate::env::environment_profiles::{split_profiles, EnvironmentProfiles};
use crate::env::source::PropertySource;
use crate::error::{ConfigError, ProfilesError};

// =====================================================================
/// Settings for building an activity context.
///
/// Read from JSON or from APON:
///
/// ```
/// use aspectran::env::ContextConfig;
/// let config = ContextConfig::from_apon("\
/// configFile: config/app.xml
/// validating: true
/// profiles: {
///   active: dev, local
/// }
/// ").unwrap();
/// assert_eq!(config.config_file.as_deref(), Some("config/app.xml"));
/// assert!(config.validating);
/// assert_eq!(config.profiles.active, vec!["dev", "local"]);
/// ```
///
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContextConfig {
    /// Directory that relative `file` references resolve against.
    pub base_path: Option<PathBuf>,
    pub config_file: Option<String>,
    pub validating: bool,
    pub tracking_location: bool,
    pub profiles: ProfilesConfig,
}

impl Default for ContextConfig {
    fn default() -> ContextConfig {
        return ContextConfig {
            base_path: None,
            config_file: None,
            validating: false,
            tracking_location: true,
            profiles: ProfilesConfig::default(),
        };
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProfilesConfig {
    #[serde(deserialize_with = "profile_list")]
    pub active: Vec<String>,
    #[serde(deserialize_with = "profile_list")]
    pub default: Vec<String>,
}

impl ContextConfig {

    pub fn from_json(text: &str) -> Result<ContextConfig, ConfigError> {
        return Ok(serde_json::from_str(text)?);
    }

    pub fn from_apon(text: &str) -> Result<ContextConfig, ConfigError> {
        let params = AponReader::parse(text)?;
        return Ok(serde_json::from_value(params.to_json())?);
    }

    // -----------------------------------------------------------------
    /// Loads 'path'; a `.json` file is JSON, anything else APON.
    ///
    pub fn load(path: &Path) -> Result<ContextConfig, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            name: path.display().to_string(),
            source: e,
        })?;
        let is_json = path.extension().map(|ext| ext == "json").unwrap_or(false);
        if is_json {
            return ContextConfig::from_json(&text);
        }
        return ContextConfig::from_apon(&text);
    }

    // -----------------------------------------------------------------
    /// Profiles from 'source', overridden by the ones configured here.
    ///
    pub fn environment_profiles<S: PropertySource + ?Sized>(&self, source: &S)
            -> Result<EnvironmentProfiles, ProfilesError> {
        let env = EnvironmentProfiles::from_source(source)?;
        if ! self.profiles.active.is_empty() {
            env.set_active_profiles(self.profiles.active.as_slice())?;
        }
        if ! self.profiles.default.is_empty() {
            env.set_default_profiles(self.profiles.default.as_slice())?;
        }
        return Ok(env);
    }

    /// Resolves 'name' against base_path.
    ///
    pub fn resolve_path(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        return match self.base_path {
            Some(ref base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        };
    }
}

// ---------------------------------------------------------------------
// A comma delimited string or a list of names.
//
fn profile_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
        where D: Deserializer<'de> {
    struct ProfileListVisitor;

    impl<'de> Visitor<'de> for ProfileListVisitor {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a comma delimited string or a list of profile names")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Vec<String>, E> {
            return Ok(split_profiles(v));
        }

        fn visit_unit<E: de::Error>(self) -> Result<Vec<String>, E> {
            return Ok(vec!{});
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<String>, A::Error> {
            let mut names: Vec<String> = vec!{};
            while let Some(name) = seq.next_element::<String>()? {
                names.extend(split_profiles(&name));
            }
            return Ok(names);
        }
    }

    return deserializer.deserialize_any(ProfileListVisitor);
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_json() {
        let config = ContextConfig::from_json(r#"{
            "basePath": "/srv/app",
            "configFile": "app.xml",
            "profiles": { "active": ["prod"], "default": "dev,local" }
        }"#).unwrap();
        assert_eq!(config.base_path, Some(PathBuf::from("/srv/app")));
        assert!(! config.validating);
        assert!(config.tracking_location);
        assert_eq!(config.profiles.active, vec!["prod"]);
        assert_eq!(config.profiles.default, vec!["dev", "local"]);
        assert_eq!(config.resolve_path("a/b.xml"), PathBuf::from("/srv/app/a/b.xml"));
        assert_eq!(config.resolve_path("/x.xml"), PathBuf::from("/x.xml"));
    }

    #[test]
    fn test_defaults() {
        let config = ContextConfig::from_json("{}").unwrap();
        assert_eq!(config, ContextConfig::default());
    }

    #[test]
    fn test_bad_value() {
        let err = ContextConfig::from_apon("validating: maybe").unwrap_err();
        assert!(err.to_string().starts_with("Invalid context configuration:"));
    }

    #[test]
    fn test_profiles_override_source() {
        let mut props = HashMap::new();
        props.insert(String::from("aspectran.profiles.active"), String::from("dev"));
        let config = ContextConfig::from_apon("profiles: {\n  active: prod\n}").unwrap();
        let env = config.environment_profiles(&props).unwrap();
        assert_eq!(env.active_profiles(), vec!["prod"]);

        let env = ContextConfig::default().environment_profiles(&props).unwrap();
        assert_eq!(env.active_profiles(), vec!["dev"]);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"validating": true}}"#).unwrap();
        let config = ContextConfig::load(file.path()).unwrap();
        assert!(config.validating);

        let mut file = tempfile::Builder::new().suffix(".apon").tempfile().unwrap();
        write!(file, "trackingLocation: false\n").unwrap();
        let config = ContextConfig::load(file.path()).unwrap();
        assert!(! config.tracking_location);
    }
}
