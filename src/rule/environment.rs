//
// rule/environment.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use crate::env::{EnvironmentProfiles, Profiles};
use crate::rule::description::DescriptionRule;
use crate::rule::item::ItemRuleMap;

// =====================================================================
/// Properties that apply when 'profile' is active; referenced by
/// `%{name}` tokens.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvironmentRule {
    profile: Option<Profiles>,
    description: Option<DescriptionRule>,
    properties: Option<ItemRuleMap>,
}

impl EnvironmentRule {
    pub fn new(profile: Option<Profiles>) -> EnvironmentRule {
        return EnvironmentRule {
            profile,
            description: None,
            properties: None,
        };
    }

    pub fn profile(&self) -> Option<&Profiles> {
        return self.profile.as_ref();
    }

    pub fn description(&self) -> Option<&DescriptionRule> {
        return self.description.as_ref();
    }

    pub fn set_description(&mut self, description: Option<DescriptionRule>) {
        self.description = description;
    }

    pub fn properties(&self) -> Option<&ItemRuleMap> {
        return self.properties.as_ref();
    }

    pub fn set_properties(&mut self, properties: Option<ItemRuleMap>) {
        self.properties = properties;
    }

    /// Whether the rule applies under 'env'.
    ///
    pub fn is_active(&self, env: &EnvironmentProfiles) -> bool {
        return match self.profile {
            Some(ref p) => env.matches(p),
            None => true,
        };
    }
}
