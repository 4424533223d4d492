//
// parsing/bean_registry.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::bean::BeanClassRegistry;
use crate::error::IllegalRuleError;
use crate::rule::BeanRule;

// =====================================================================
/// Bean rules by id and by class name.
///
/// A later rule with the same id or class replaces the earlier one,
/// unless the earlier one is marked important.
///
#[derive(Debug, Default)]
pub struct BeanRuleRegistry {
    rules: Vec<BeanRule>,
    id_based: HashMap<String, usize>,
    type_based: HashMap<String, Vec<usize>>,
    important_ids: HashSet<String>,
    important_types: HashSet<String>,
}

impl BeanRuleRegistry {
    pub fn new() -> BeanRuleRegistry {
        return BeanRuleRegistry::default();
    }

    // -----------------------------------------------------------------
    /// Adds 'bean_rule'.  A scanning rule is expanded into one rule per
    /// matching class of 'classes'.
    ///
    pub fn add_bean_rule(&mut self, bean_rule: BeanRule, classes: &BeanClassRegistry)
            -> Result<(), IllegalRuleError> {
        if bean_rule.scan_pattern.is_some() {
            let names = classes.class_names();
            let names: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
            let scanned = bean_rule.scan(&names)?;
            if scanned.is_empty() {
                trace!("No bean class matches {}", bean_rule);
            }
            for rule in scanned.into_iter() {
                self.save(rule)?;
            }
            return Ok(());
        }
        if bean_rule.id.is_none() && bean_rule.class_name.is_none() {
            return Err(illegal_rule!("The 'bean' element requires an 'id' or a 'class' attribute"));
        }
        if ! bean_rule.is_factory_produced() {
            match bean_rule.class_name {
                Some(ref name) if classes.contains(name) => (),
                Some(ref name) => return Err(illegal_rule!(
                        "Could not add bean rule {}; Unable to load class: {}", bean_rule, name)),
                None => return Err(illegal_rule!(
                        "Could not add bean rule {}; no bean class is given", bean_rule)),
            }
        }
        return self.save(bean_rule);
    }

    fn save(&mut self, bean_rule: BeanRule) -> Result<(), IllegalRuleError> {
        if let Some(ref id) = bean_rule.id {
            if self.important_ids.contains(id) {
                return Err(illegal_rule!("Already exists the id based named bean; {}", bean_rule));
            }
        }
        if let Some(ref class) = bean_rule.class_name {
            if self.important_types.contains(class) && bean_rule.id.is_none() {
                return Err(illegal_rule!("Already exists the type based named bean; {}", bean_rule));
            }
        }
        trace!("add BeanRule {}", bean_rule);

        let index = self.rules.len();
        if let Some(ref id) = bean_rule.id {
            if bean_rule.important {
                self.important_ids.insert(id.clone());
            }
            self.id_based.insert(id.clone(), index);
        }
        if let Some(ref class) = bean_rule.class_name {
            if bean_rule.important {
                self.important_types.insert(class.clone());
            }
            self.type_based.entry(class.clone()).or_insert_with(|| vec!{}).push(index);
        }
        self.rules.push(bean_rule);
        return Ok(());
    }

    /// Ends the parse phase: importance only guards declarations.
    ///
    pub fn post_process(&mut self) {
        self.important_ids.clear();
        self.important_types.clear();
    }

    pub fn bean_rule(&self, id: &str) -> Option<&BeanRule> {
        return self.id_based.get(id).map(|&i| &self.rules[i]);
    }

    // -----------------------------------------------------------------
    /// Rules whose class is 'class_name', latest first.
    ///
    pub fn bean_rules_of_class(&self, class_name: &str) -> Vec<&BeanRule> {
        return match self.type_based.get(class_name) {
            Some(indexes) => indexes.iter().rev().map(|&i| &self.rules[i]).collect(),
            None => vec!{},
        };
    }

    pub fn contains_id(&self, id: &str) -> bool {
        return self.id_based.contains_key(id);
    }

    pub fn contains_class(&self, class_name: &str) -> bool {
        return self.type_based.contains_key(class_name);
    }

    // -----------------------------------------------------------------
    /// The rules in effect, in declaration order.  A rule replaced by a
    /// later one of the same id is left out.
    ///
    pub fn bean_rules(&self) -> Vec<&BeanRule> {
        return self.rules.iter().enumerate()
                .filter(|(i, rule)| match rule.id {
                    Some(ref id) => self.id_based.get(id) == Some(i),
                    None => true,
                })
                .map(|(_, rule)| rule)
                .collect();
    }

    pub fn len(&self) -> usize {
        return self.bean_rules().len();
    }

    pub fn is_empty(&self) -> bool {
        return self.rules.is_empty();
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;
    use crate::bean::PropertiesBean;

    fn classes() -> BeanClassRegistry {
        let mut classes = BeanClassRegistry::new();
        for name in ["app.dao.UserDao", "app.dao.ItemDao", "app.Config"].iter() {
            classes.register(name, || Box::new(PropertiesBean::new()));
        }
        return classes;
    }

    fn bean(id: Option<&str>, class: &str) -> BeanRule {
        return BeanRule {
            id: id.map(String::from),
            class_name: Some(String::from(class)),
            ..BeanRule::default()
        };
    }

    #[test]
    fn test_add_and_lookup() {
        let classes = classes();
        let mut registry = BeanRuleRegistry::new();
        registry.add_bean_rule(bean(Some("config"), "app.Config"), &classes).unwrap();
        registry.add_bean_rule(bean(None, "app.dao.UserDao"), &classes).unwrap();
        assert!(registry.contains_id("config"));
        assert!(registry.contains_class("app.Config"));
        assert!(registry.contains_class("app.dao.UserDao"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unknown_class() {
        let mut registry = BeanRuleRegistry::new();
        let err = registry.add_bean_rule(bean(Some("x"), "app.Missing"), &classes()).unwrap_err();
        assert!(err.to_string().contains("Unable to load class: app.Missing"));
    }

    #[test]
    fn test_scan() {
        let mut registry = BeanRuleRegistry::new();
        let rule = BeanRule {
            scan_pattern: Some(String::from("app.dao.*")),
            mask_pattern: Some(String::from("app.dao.*")),
            ..BeanRule::default()
        };
        registry.add_bean_rule(rule, &classes()).unwrap();
        assert!(registry.contains_id("UserDao"));
        assert!(registry.contains_id("ItemDao"));
        assert!(! registry.contains_id("Config"));
    }

    #[test]
    fn test_override() {
        let classes = classes();
        let mut registry = BeanRuleRegistry::new();
        registry.add_bean_rule(bean(Some("dao"), "app.dao.UserDao"), &classes).unwrap();
        registry.add_bean_rule(bean(Some("dao"), "app.dao.ItemDao"), &classes).unwrap();
        assert_eq!(registry.bean_rule("dao").unwrap().class_name.as_deref(), Some("app.dao.ItemDao"));
        assert_eq!(registry.len(), 1);

        let mut important = bean(Some("dao"), "app.dao.UserDao");
        important.important = true;
        registry.add_bean_rule(important, &classes).unwrap();
        let err = registry.add_bean_rule(bean(Some("dao"), "app.dao.ItemDao"), &classes).unwrap_err();
        assert!(err.to_string().starts_with("Already exists the id based named bean"));

        registry.post_process();
        registry.add_bean_rule(bean(Some("dao"), "app.dao.ItemDao"), &classes).unwrap();
    }

    #[test]
    fn test_factory_bean_needs_no_class() {
        let mut registry = BeanRuleRegistry::new();
        let rule = BeanRule {
            id: Some(String::from("made")),
            factory_bean_id: Some(String::from("config")),
            factory_method: Some(String::from("make")),
            ..BeanRule::default()
        };
        registry.add_bean_rule(rule, &classes()).unwrap();
        assert!(registry.contains_id("made"));
    }
}
