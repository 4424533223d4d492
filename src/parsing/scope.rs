//
// parsing/scope.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::sync::Arc;

use crate::parsing::settings::DefaultSettings;
use crate::rule::DescriptionRule;

// =====================================================================
/// Per-document state of a parse: the default settings in effect and
/// the document description.
///
/// An imported document parses under a replica.  The replica shares
/// the settings of its origin until it changes them; the change is
/// then made on a private copy, so settings never leak back out of an
/// import.
///
/// ```
/// use aspectran::parsing::RuleParsingScope;
/// let mut outer = RuleParsingScope::new();
/// outer.touch_default_settings().set_translet_name_prefix("/a/");
/// let mut inner = outer.replicate();
/// inner.touch_default_settings().set_translet_name_prefix("/b/");
/// assert_eq!(outer.default_settings().unwrap().translet_name_prefix(), Some("/a/"));
/// assert_eq!(inner.default_settings().unwrap().translet_name_prefix(), Some("/b/"));
/// ```
///
#[derive(Debug, Clone, Default)]
pub struct RuleParsingScope {
    default_settings: Option<Arc<DefaultSettings>>,
    description: Option<DescriptionRule>,
}

impl RuleParsingScope {
    pub fn new() -> RuleParsingScope {
        return RuleParsingScope::default();
    }

    pub fn default_settings(&self) -> Option<&DefaultSettings> {
        return self.default_settings.as_deref();
    }

    pub(crate) fn shared_default_settings(&self) -> Option<Arc<DefaultSettings>> {
        return self.default_settings.clone();
    }

    // -----------------------------------------------------------------
    /// Settings to be modified; copied first if shared with another
    /// scope.
    ///
    pub fn touch_default_settings(&mut self) -> &mut DefaultSettings {
        let settings = self.default_settings.get_or_insert_with(|| Arc::new(DefaultSettings::new()));
        return Arc::make_mut(settings);
    }

    pub fn description(&self) -> Option<&DescriptionRule> {
        return self.description.as_ref();
    }

    pub fn set_description(&mut self, description: Option<DescriptionRule>) {
        self.description = description;
    }

    // -----------------------------------------------------------------
    /// A scope for an imported document.  It starts with the settings
    /// of this scope and no description.
    ///
    pub fn replicate(&self) -> RuleParsingScope {
        return RuleParsingScope {
            default_settings: self.default_settings.clone(),
            description: None,
        };
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;
    use crate::rule::DefaultSettingType;

    #[test]
    fn test_replica_shares_until_touched() {
        let mut outer = RuleParsingScope::new();
        outer.touch_default_settings().apply(&[
            (DefaultSettingType::TransletNamePattern, String::from("/a/*.do")),
        ]);
        let inner = outer.replicate();
        let shared = match (outer.shared_default_settings(), inner.shared_default_settings()) {
            (Some(a), Some(b)) => Arc::ptr_eq(&a, &b),
            _ => false,
        };
        assert!(shared);
    }

    #[test]
    fn test_replica_is_independent() {
        let mut outer = RuleParsingScope::new();
        outer.set_description(Some(DescriptionRule::new(Some("outer"), None)));
        let mut inner = outer.replicate();
        assert!(inner.description().is_none());
        inner.touch_default_settings().set_translet_name_suffix(".json");
        assert!(outer.default_settings().is_none());
        assert_eq!(inner.default_settings().unwrap().translet_name_suffix(), Some(".json"));
        assert_eq!(outer.description().unwrap().content(), Some("outer"));
    }
}
