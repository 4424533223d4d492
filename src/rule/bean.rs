//
// rule/bean.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;

use crate::error::IllegalRuleError;
use crate::rule::description::DescriptionRule;
use crate::rule::item::ItemRuleMap;
use crate::rule::types::ScopeType;
use crate::wildcard::WildcardPattern;

const CLASS_NAME_SEPARATOR: char = '.';

// =====================================================================
/// `<bean>`: how to obtain one object of the context.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeanRule {
    pub id: Option<String>,
    pub class_name: Option<String>,
    pub scan_pattern: Option<String>,
    pub mask_pattern: Option<String>,
    pub scope: Option<ScopeType>,
    pub factory_bean_id: Option<String>,
    pub factory_method: Option<String>,
    pub init_method: Option<String>,
    pub destroy_method: Option<String>,
    pub lazy_init: bool,
    pub important: bool,
    pub arguments: Option<ItemRuleMap>,
    pub properties: Option<ItemRuleMap>,
    pub description: Option<DescriptionRule>,
}

impl BeanRule {
    pub fn scope(&self) -> ScopeType {
        return self.scope.unwrap_or(ScopeType::Singleton);
    }

    pub fn is_singleton(&self) -> bool {
        return self.scope() == ScopeType::Singleton;
    }

    pub fn is_factory_produced(&self) -> bool {
        return self.factory_bean_id.is_some();
    }

    // -----------------------------------------------------------------
    /// One rule per class of 'class_names' that the scan pattern
    /// matches.  The id is the id pattern with '*' replaced by the
    /// masked class name, or the masked class name itself.
    ///
    pub fn scan(&self, class_names: &[&str]) -> Result<Vec<BeanRule>, IllegalRuleError> {
        let scan = match self.scan_pattern {
            Some(ref s) => WildcardPattern::new(s, Some(CLASS_NAME_SEPARATOR))?,
            None => return Ok(vec!{}),
        };
        let mask = match self.mask_pattern {
            Some(ref m) => Some(WildcardPattern::new(m, Some(CLASS_NAME_SEPARATOR))?),
            None => None,
        };
        let mut rules: Vec<BeanRule> = vec!{};
        for class_name in class_names.iter().filter(|c| scan.matches(c)) {
            let masked = mask_name(mask.as_ref(), class_name);
            let id = match self.id {
                Some(ref pattern) if pattern.contains('*') => pattern.replacen('*', &masked, 1),
                Some(ref pattern) => format!("{}{}", pattern, masked),
                None => masked,
            };
            let mut rule = self.clone();
            rule.id = Some(id);
            rule.class_name = Some(String::from(*class_name));
            rule.scan_pattern = None;
            rule.mask_pattern = None;
            rules.push(rule);
        }
        return Ok(rules);
    }
}

// ---------------------------------------------------------------------
// The parts of 'name' the mask's wildcards matched; the name itself
// when the mask does not apply.
//
fn mask_name(mask: Option<&WildcardPattern>, name: &str) -> String {
    if let Some(mask) = mask {
        if let Some(parts) = mask.captures(name) {
            let parts: Vec<String> = parts.into_iter().filter(|p| ! p.is_empty()).collect();
            if ! parts.is_empty() {
                return parts.join(&CLASS_NAME_SEPARATOR.to_string());
            }
        }
    }
    return String::from(name);
}

impl fmt::Display for BeanRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("bean")?;
        if let Some(ref id) = self.id {
            write!(f, " id={}", id)?;
        }
        if let Some(ref class) = self.class_name {
            write!(f, " class={}", class)?;
        }
        if let Some(ref scan) = self.scan_pattern {
            write!(f, " scan={}", scan)?;
        }
        if let Some(ref factory) = self.factory_bean_id {
            write!(f, " factoryBean={}", factory)?;
        }
        write!(f, " scope={}", self.scope())
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_scan() {
        let classes = [ "app.dao.UserDao", "app.dao.ItemDao", "app.service.UserService" ];
        let test_specs = [
            ( None, "app.dao.*", None, vec!["app.dao.UserDao", "app.dao.ItemDao"] ),
            ( None, "app.dao.*", Some("app.dao.*"), vec!["UserDao", "ItemDao"] ),
            ( Some("dao.*"), "app.dao.*", Some("app.dao.*"), vec!["dao.UserDao", "dao.ItemDao"] ),
            ( Some("bean."), "app.**", Some("app.*.*"), vec!["bean.dao.UserDao", "bean.dao.ItemDao", "bean.service.UserService"] ),
        ];
        for (id, scan, mask, guess) in test_specs.iter() {
            let rule = BeanRule {
                id: id.map(String::from),
                scan_pattern: Some(String::from(*scan)),
                mask_pattern: mask.map(String::from),
                ..BeanRule::default()
            };
            let ids: Vec<String> = rule.scan(&classes).unwrap().into_iter()
                    .map(|r| r.id.unwrap_or_default())
                    .collect();
            assert_eq!(ids, *guess, "{}", scan);
        }
    }

    #[test]
    fn test_display() {
        let rule = BeanRule {
            id: Some(String::from("counter")),
            class_name: Some(String::from("app.Counter")),
            ..BeanRule::default()
        };
        assert_eq!(rule.to_string(), "bean id=counter class=app.Counter scope=singleton");
        assert!(rule.is_singleton());
    }
}
