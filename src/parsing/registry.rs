//
// parsing/registry.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::collections::HashMap;

use tracing::trace;

use crate::error::IllegalRuleError;
use crate::parsing::settings::DefaultSettings;
use crate::rule::{AspectRule, ScheduleRule, TemplateRule};

// =====================================================================
/// Aspect rules in declaration order.
///
#[derive(Debug, Default)]
pub struct AspectRuleRegistry {
    rules: Vec<AspectRule>,
}

impl AspectRuleRegistry {
    pub fn new() -> AspectRuleRegistry {
        return AspectRuleRegistry::default();
    }

    // -----------------------------------------------------------------
    /// Adds 'aspect_rule'.  An aspect without id gets a generated one;
    /// a duplicate id is an error.
    ///
    pub fn add_aspect_rule(&mut self, mut aspect_rule: AspectRule) -> Result<(), IllegalRuleError> {
        if aspect_rule.id.is_empty() {
            aspect_rule.id = format!("aspect#{}", self.rules.len());
        }
        if self.contains(&aspect_rule.id) {
            return Err(illegal_rule!("Duplicate aspect id '{}'", aspect_rule.id));
        }
        for advice in aspect_rule.advice_rules.iter_mut() {
            advice.aspect_id = aspect_rule.id.clone();
        }
        trace!("add AspectRule {}", aspect_rule);
        self.rules.push(aspect_rule);
        return Ok(());
    }

    pub fn contains(&self, id: &str) -> bool {
        return self.rules.iter().any(|r| r.id == id);
    }

    pub fn aspect_rule(&self, id: &str) -> Option<&AspectRule> {
        return self.rules.iter().find(|r| r.id == id);
    }

    pub fn aspect_rules(&self) -> &[AspectRule] {
        return &self.rules;
    }

    // -----------------------------------------------------------------
    /// Enabled aspects by ascending order; equal orders keep
    /// declaration order.
    ///
    pub fn ordered_aspect_rules(&self) -> Vec<&AspectRule> {
        let mut rules: Vec<&AspectRule> = self.rules.iter().filter(|r| ! r.disabled).collect();
        rules.sort_by_key(|r| r.order());
        return rules;
    }

    pub fn len(&self) -> usize {
        return self.rules.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.rules.is_empty();
    }
}

// =====================================================================
/// Schedule rules by id.
///
#[derive(Debug, Default)]
pub struct ScheduleRuleRegistry {
    rules: Vec<ScheduleRule>,
}

impl ScheduleRuleRegistry {
    pub fn new() -> ScheduleRuleRegistry {
        return ScheduleRuleRegistry::default();
    }

    // -----------------------------------------------------------------
    /// Adds 'schedule_rule'; the scheduler bean defaults to the
    /// `defaultSchedulerBean` setting.
    ///
    pub fn add_schedule_rule(&mut self, mut schedule_rule: ScheduleRule,
            settings: Option<&DefaultSettings>) -> Result<(), IllegalRuleError> {
        if schedule_rule.id.is_empty() {
            return Err(illegal_rule!("The 'schedule' element requires an 'id' attribute"));
        }
        if self.rules.iter().any(|r| r.id == schedule_rule.id) {
            return Err(illegal_rule!("Duplicate schedule id '{}'", schedule_rule.id));
        }
        if schedule_rule.scheduler_bean_id.is_none() {
            schedule_rule.scheduler_bean_id = settings
                    .and_then(|s| s.default_scheduler_bean())
                    .map(String::from);
        }
        trace!("add ScheduleRule {}", schedule_rule);
        self.rules.push(schedule_rule);
        return Ok(());
    }

    pub fn schedule_rule(&self, id: &str) -> Option<&ScheduleRule> {
        return self.rules.iter().find(|r| r.id == id);
    }

    pub fn schedule_rules(&self) -> &[ScheduleRule] {
        return &self.rules;
    }
}

// =====================================================================
/// Named templates.
///
#[derive(Debug, Default)]
pub struct TemplateRuleRegistry {
    rules: HashMap<String, TemplateRule>,
    order: Vec<String>,
}

impl TemplateRuleRegistry {
    pub fn new() -> TemplateRuleRegistry {
        return TemplateRuleRegistry::default();
    }

    // -----------------------------------------------------------------
    /// Adds 'template_rule'; the engine defaults to the
    /// `defaultTemplateEngineBean` setting.
    ///
    pub fn add_template_rule(&mut self, mut template_rule: TemplateRule,
            settings: Option<&DefaultSettings>) -> Result<(), IllegalRuleError> {
        let id = match template_rule.id {
            Some(ref id) => id.clone(),
            None => return Err(illegal_rule!("The 'template' element requires an 'id' attribute")),
        };
        if self.rules.contains_key(&id) {
            return Err(illegal_rule!("Duplicate template id '{}'", id));
        }
        apply_default_engine(&mut template_rule, settings);
        trace!("add TemplateRule {}", template_rule);
        self.order.push(id.clone());
        self.rules.insert(id, template_rule);
        return Ok(());
    }

    pub fn template_rule(&self, id: &str) -> Option<&TemplateRule> {
        return self.rules.get(id);
    }

    pub fn template_rules(&self) -> Vec<&TemplateRule> {
        return self.order.iter().filter_map(|id| self.rules.get(id)).collect();
    }

    pub fn len(&self) -> usize {
        return self.rules.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.rules.is_empty();
    }
}

/// A template without engine uses the `defaultTemplateEngineBean`.
///
pub fn apply_default_engine(template_rule: &mut TemplateRule, settings: Option<&DefaultSettings>) {
    if template_rule.engine.is_none() {
        template_rule.engine = settings
                .and_then(|s| s.default_template_engine_bean())
                .map(String::from);
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;
    use crate::rule::{AspectAdviceType, DefaultSettingType};

    #[test]
    fn test_aspect_ids() {
        let mut registry = AspectRuleRegistry::new();
        let mut rule = AspectRule::new("");
        rule.touch_advice_rule(AspectAdviceType::Before);
        registry.add_aspect_rule(rule).unwrap();
        registry.add_aspect_rule(AspectRule::new("log")).unwrap();
        let err = registry.add_aspect_rule(AspectRule::new("log")).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate aspect id 'log'");

        let first = &registry.aspect_rules()[0];
        assert_eq!(first.id, "aspect#0");
        assert_eq!(first.advice_rules[0].aspect_id, "aspect#0");
    }

    #[test]
    fn test_aspect_order() {
        let mut registry = AspectRuleRegistry::new();
        let test_specs = [ ("a", None, false), ("b", Some(1), false), ("c", Some(0), false), ("d", Some(0), true) ];
        for (id, order, disabled) in test_specs.iter() {
            let mut rule = AspectRule::new(id);
            rule.order = *order;
            rule.disabled = *disabled;
            registry.add_aspect_rule(rule).unwrap();
        }
        let ids: Vec<&str> = registry.ordered_aspect_rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_schedule_default_scheduler() {
        let mut ds = DefaultSettings::new();
        ds.apply(&[(DefaultSettingType::DefaultSchedulerBean, String::from("scheduler"))]);
        let mut registry = ScheduleRuleRegistry::new();
        registry.add_schedule_rule(ScheduleRule::new("s1"), Some(&ds)).unwrap();
        assert_eq!(registry.schedule_rule("s1").unwrap().scheduler_bean_id.as_deref(), Some("scheduler"));
        assert!(registry.add_schedule_rule(ScheduleRule::new("s1"), None).is_err());
    }

    #[test]
    fn test_template_default_engine() {
        let mut ds = DefaultSettings::new();
        ds.apply(&[(DefaultSettingType::DefaultTemplateEngineBean, String::from("freemarker"))]);
        let mut registry = TemplateRuleRegistry::new();
        let mut rule = TemplateRule::inline("hello");
        rule.id = Some(String::from("t1"));
        registry.add_template_rule(rule, Some(&ds)).unwrap();
        assert_eq!(registry.template_rule("t1").unwrap().engine.as_deref(), Some("freemarker"));
        assert!(registry.add_template_rule(TemplateRule::inline("x"), None).is_err());
    }
}
