//
// env/mod.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

//!
//! Environment: profile expressions, the active/default profile sets,
//! startup property sources and the context configuration.
//!

mod config;
mod environment_profiles;
mod profiles;
mod source;

pub use self::config::{ContextConfig, ProfilesConfig};
pub use self::environment_profiles::{
    split_profiles, EnvironmentProfiles,
    ACTIVE_PROFILES_PROPERTY_NAME, DEFAULT_PROFILES_PROPERTY_NAME,
};
pub use self::profiles::Profiles;
pub use self::source::{EnvVarPropertySource, NoPropertySource, PropertySource};
