//
// env/environment_profiles.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::sync::{Mutex, MutexGuard};

use crate::env::profiles::Profiles;
use crate::env::source::PropertySource;
use crate::error::ProfilesError;

/// Property naming the active profiles (comma delimited).
pub const ACTIVE_PROFILES_PROPERTY_NAME: &str = "aspectran.profiles.active";

/// Property naming the profiles active when no profile is active.
pub const DEFAULT_PROFILES_PROPERTY_NAME: &str = "aspectran.profiles.default";

// =====================================================================
/// The active and default profile sets.
///
/// Default profiles count only while no profile is active.  Both sets
/// are guarded, so profiles may be switched from any thread.
///
/// ```
/// use std::collections::HashMap;
/// use aspectran::env::{EnvironmentProfiles, Profiles};
///
/// let mut props = HashMap::new();
/// props.insert(String::from("aspectran.profiles.default"), String::from("dev"));
/// let env = EnvironmentProfiles::from_source(&props).unwrap();
/// assert!(env.matches(&Profiles::of("dev").unwrap()));
///
/// env.set_active_profiles(&["prod"]).unwrap();
/// assert!(! env.matches(&Profiles::of("dev").unwrap()));
/// ```
///
#[derive(Debug, Default)]
pub struct EnvironmentProfiles {
    active_profiles: Mutex<Vec<String>>,
    default_profiles: Mutex<Vec<String>>,
}

impl EnvironmentProfiles {
    pub fn new() -> EnvironmentProfiles {
        return EnvironmentProfiles::default();
    }

    // -----------------------------------------------------------------
    /// Reads both sets from 'source'.
    ///
    pub fn from_source<S: PropertySource + ?Sized>(source: &S) -> Result<EnvironmentProfiles, ProfilesError> {
        let env = EnvironmentProfiles::new();
        if let Some(value) = source.property(ACTIVE_PROFILES_PROPERTY_NAME) {
            let profiles = split_profiles(&value);
            if ! profiles.is_empty() {
                env.set_active_profiles(profiles.as_slice())?;
                tracing::info!("Activating profiles [{}]", profiles.join(", "));
            }
        }
        if let Some(value) = source.property(DEFAULT_PROFILES_PROPERTY_NAME) {
            let profiles = split_profiles(&value);
            if ! profiles.is_empty() {
                env.set_default_profiles(profiles.as_slice())?;
                tracing::info!("Default profiles [{}]", profiles.join(", "));
            }
        }
        return Ok(env);
    }

    pub fn active_profiles(&self) -> Vec<String> {
        return lock(&self.active_profiles).clone();
    }

    pub fn default_profiles(&self) -> Vec<String> {
        return lock(&self.default_profiles).clone();
    }

    // -----------------------------------------------------------------
    /// Replaces the active set; an empty slice clears it.
    ///
    pub fn set_active_profiles<S: AsRef<str>>(&self, profiles: &[S]) -> Result<(), ProfilesError> {
        return replace(&self.active_profiles, profiles);
    }

    pub fn set_default_profiles<S: AsRef<str>>(&self, profiles: &[S]) -> Result<(), ProfilesError> {
        return replace(&self.default_profiles, profiles);
    }

    // -----------------------------------------------------------------
    /// Whether 'profile' is active, or, with no active profile, is a
    /// default profile.
    ///
    pub fn is_profile_active(&self, profile: &str) -> bool {
        let active = lock(&self.active_profiles);
        if active.iter().any(|p| p == profile) {
            return true;
        }
        if ! active.is_empty() {
            return false;
        }
        drop(active);
        return lock(&self.default_profiles).iter().any(|p| p == profile);
    }

    pub fn matches(&self, profiles: &Profiles) -> bool {
        return profiles.matches(|p| self.is_profile_active(p));
    }

    // -----------------------------------------------------------------
    /// Whether any of 'profiles' is active; a leading '!' negates one
    /// name.  An empty list is accepted.
    ///
    pub fn accepts_profiles<S: AsRef<str>>(&self, profiles: &[S]) -> Result<bool, ProfilesError> {
        if profiles.is_empty() {
            return Ok(true);
        }
        for profile in profiles.iter() {
            let profile = profile.as_ref();
            match profile.strip_prefix('!') {
                Some(name) => {
                    validate_profile(name)?;
                    if ! self.is_profile_active(name) {
                        return Ok(true);
                    }
                },
                None => {
                    validate_profile(profile)?;
                    if self.is_profile_active(profile) {
                        return Ok(true);
                    }
                },
            }
        }
        return Ok(false);
    }
}

// ---------------------------------------------------------------------
//
fn lock(set: &Mutex<Vec<String>>) -> MutexGuard<'_, Vec<String>> {
    return set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
}

fn replace<S: AsRef<str>>(set: &Mutex<Vec<String>>, profiles: &[S]) -> Result<(), ProfilesError> {
    let mut names: Vec<String> = vec!{};
    for profile in profiles.iter() {
        let profile = profile.as_ref();
        validate_profile(profile)?;
        if ! names.iter().any(|n| n == profile) {
            names.push(String::from(profile));
        }
    }
    *lock(set) = names;
    return Ok(());
}

fn validate_profile(profile: &str) -> Result<(), ProfilesError> {
    if profile.trim().is_empty() {
        return Err(ProfilesError::InvalidProfile {
            profile: String::from(profile),
            reason: "must contain text",
        });
    }
    if profile.starts_with('!') {
        return Err(ProfilesError::InvalidProfile {
            profile: String::from(profile),
            reason: "must not begin with ! operator",
        });
    }
    return Ok(());
}

/// Splits a comma delimited list, dropping blank names.
///
pub fn split_profiles(value: &str) -> Vec<String> {
    return value.split(',')
            .map(|s| s.trim())
            .filter(|s| ! s.is_empty())
            .map(String::from)
            .collect();
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn source(active: Option<&str>, default: Option<&str>) -> HashMap<String, String> {
        let mut map = HashMap::new();
        if let Some(v) = active {
            map.insert(String::from(ACTIVE_PROFILES_PROPERTY_NAME), String::from(v));
        }
        if let Some(v) = default {
            map.insert(String::from(DEFAULT_PROFILES_PROPERTY_NAME), String::from(v));
        }
        return map;
    }

    #[test]
    fn test_profile_expressions_against_prod() {
        let env = EnvironmentProfiles::from_source(&source(Some("prod"), None)).unwrap();
        let test_specs = [
            ( "prod & !test", true ),
            ( "dev | test", false ),
            ( "(dev | test) & !prod", false ),
            ( "prod", true ),
        ];
        for (expr, guess) in test_specs.iter() {
            assert_eq!(env.matches(&Profiles::of(expr).unwrap()), *guess, "{}", expr);
        }
    }

    #[test]
    fn test_default_profiles_only_without_active() {
        let env = EnvironmentProfiles::from_source(&source(None, Some("dev, local"))).unwrap();
        assert_eq!(env.default_profiles(), vec!["dev", "local"]);
        assert!(env.is_profile_active("local"));

        env.set_active_profiles(&["prod"]).unwrap();
        assert!(! env.is_profile_active("local"));
        assert!(env.is_profile_active("prod"));

        env.set_active_profiles::<&str>(&[]).unwrap();
        assert!(env.is_profile_active("dev"));
    }

    #[test]
    fn test_accepts_profiles() {
        let env = EnvironmentProfiles::from_source(&source(Some("a,b"), None)).unwrap();
        assert_eq!(env.active_profiles(), vec!["a", "b"]);
        let test_specs: [(&[&str], bool); 5] = [
            ( &[], true ),
            ( &["a"], true ),
            ( &["c"], false ),
            ( &["!c"], true ),
            ( &["!a", "c"], false ),
        ];
        for (profiles, guess) in test_specs.iter() {
            assert_eq!(env.accepts_profiles(*profiles).unwrap(), *guess, "{:?}", profiles);
        }
    }

    #[test]
    fn test_invalid_profile() {
        let env = EnvironmentProfiles::new();
        let err = env.set_active_profiles(&["!x"]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid profile [!x]: must not begin with ! operator");
        let err = env.set_default_profiles(&[" "]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid profile [ ]: must contain text");
    }
}
