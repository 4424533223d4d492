//
// rule/action.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;

use crate::rule::item::ItemRuleMap;
use crate::rule::token::CLASS_DIRECTIVE_PREFIX;
use crate::rule::types::MethodType;

// =====================================================================
/// Calls 'method' on a bean.  Without a bean the action runs on the
/// advice bean of the aspect it belongs to.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeanActionRule {
    pub action_id: Option<String>,
    pub bean_id: Option<String>,
    pub bean_class: Option<String>,
    pub method: String,
    pub hidden: bool,
    pub arguments: Option<ItemRuleMap>,
    pub properties: Option<ItemRuleMap>,
}

impl BeanActionRule {
    // -----------------------------------------------------------------
    /// 'bean' is a bean id, or "class:Name" for the bean of that class.
    ///
    pub fn new(action_id: Option<String>, bean: Option<&str>, method: &str) -> BeanActionRule {
        let (bean_id, bean_class) = split_bean_reference(bean);
        return BeanActionRule {
            action_id,
            bean_id,
            bean_class,
            method: String::from(method),
            ..BeanActionRule::default()
        };
    }
}

/// Separates "class:Name" from a plain bean id.
///
pub fn split_bean_reference(bean: Option<&str>) -> (Option<String>, Option<String>) {
    return match bean {
        Some(b) => match b.strip_prefix(CLASS_DIRECTIVE_PREFIX) {
            Some(class) => (None, Some(String::from(class.trim()))),
            None => (Some(String::from(b)), None),
        },
        None => (None, None),
    };
}

// =====================================================================
/// Produces its items as a map.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EchoActionRule {
    pub action_id: Option<String>,
    pub hidden: bool,
    pub items: Option<ItemRuleMap>,
}

// =====================================================================
/// Runs another translet and keeps its ProcessResult.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncludeActionRule {
    pub action_id: Option<String>,
    pub translet_name: String,
    pub method: Option<MethodType>,
    pub hidden: bool,
    pub parameters: Option<ItemRuleMap>,
    pub attributes: Option<ItemRuleMap>,
}

// =====================================================================
/// Sets response headers.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderActionRule {
    pub action_id: Option<String>,
    pub hidden: bool,
    pub headers: ItemRuleMap,
}

// =====================================================================
/// An executable step of an ActionList.
///
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRule {
    Bean(BeanActionRule),
    Echo(EchoActionRule),
    Include(IncludeActionRule),
    Header(HeaderActionRule),
}

impl ActionRule {
    pub fn action_id(&self) -> Option<&str> {
        return match self {
            ActionRule::Bean(r) => r.action_id.as_deref(),
            ActionRule::Echo(r) => r.action_id.as_deref(),
            ActionRule::Include(r) => r.action_id.as_deref(),
            ActionRule::Header(r) => r.action_id.as_deref(),
        };
    }

    pub fn is_hidden(&self) -> bool {
        return match self {
            ActionRule::Bean(r) => r.hidden,
            ActionRule::Echo(r) => r.hidden,
            ActionRule::Include(r) => r.hidden,
            ActionRule::Header(r) => r.hidden,
        };
    }

    pub fn action_type(&self) -> &'static str {
        return match self {
            ActionRule::Bean(_) => "action",
            ActionRule::Echo(_) => "echo",
            ActionRule::Include(_) => "include",
            ActionRule::Header(_) => "headers",
        };
    }
}

impl fmt::Display for ActionRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.action_type())?;
        if let Some(id) = self.action_id() {
            write!(f, " id={}", id)?;
        }
        match self {
            ActionRule::Bean(r) => {
                if let Some(ref bean) = r.bean_id {
                    write!(f, " bean={}", bean)?;
                }
                if let Some(ref class) = r.bean_class {
                    write!(f, " bean={}{}", CLASS_DIRECTIVE_PREFIX, class)?;
                }
                write!(f, " method={}", r.method)?;
            },
            ActionRule::Include(r) => {
                write!(f, " translet={}", r.translet_name)?;
            },
            _ => {},
        }
        return Ok(());
    }
}

// =====================================================================
/// An ordered group of actions; its results form one ContentResult.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionList {
    name: Option<String>,
    omittable: Option<bool>,
    hidden: Option<bool>,
    actions: Vec<ActionRule>,
}

impl ActionList {
    pub fn new(name: Option<String>, omittable: Option<bool>, hidden: Option<bool>) -> ActionList {
        return ActionList {
            name,
            omittable,
            hidden,
            actions: vec!{},
        };
    }

    pub fn name(&self) -> Option<&str> {
        return self.name.as_deref();
    }

    pub fn is_omittable(&self) -> bool {
        return self.omittable.unwrap_or(false);
    }

    pub fn is_hidden(&self) -> bool {
        return self.hidden.unwrap_or(false);
    }

    // -----------------------------------------------------------------
    /// Adds 'action'; a hidden list hides every action it holds.
    ///
    pub fn add_action(&mut self, mut action: ActionRule) {
        if self.is_hidden() {
            match action {
                ActionRule::Bean(ref mut r) => r.hidden = true,
                ActionRule::Echo(ref mut r) => r.hidden = true,
                ActionRule::Include(ref mut r) => r.hidden = true,
                ActionRule::Header(ref mut r) => r.hidden = true,
            }
        }
        self.actions.push(action);
    }

    pub fn actions(&self) -> &[ActionRule] {
        return &self.actions;
    }

    pub fn len(&self) -> usize {
        return self.actions.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.actions.is_empty();
    }

    /// Number of actions whose result is shown.
    ///
    pub fn visible_count(&self) -> usize {
        return self.actions.iter().filter(|a| ! a.is_hidden()).count();
    }
}

// =====================================================================
/// The content pipeline of a translet.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentList {
    name: Option<String>,
    omittable: Option<bool>,
    action_lists: Vec<ActionList>,
}

impl ContentList {
    pub fn new(name: Option<String>, omittable: Option<bool>) -> ContentList {
        return ContentList {
            name,
            omittable,
            action_lists: vec!{},
        };
    }

    pub fn name(&self) -> Option<&str> {
        return self.name.as_deref();
    }

    pub fn is_omittable(&self) -> bool {
        return self.omittable.unwrap_or(false);
    }

    pub fn add_action_list(&mut self, action_list: ActionList) {
        self.action_lists.push(action_list);
    }

    pub fn action_lists(&self) -> &[ActionList] {
        return &self.action_lists;
    }

    /// The last list, to which actions written directly under a
    /// translet are appended.
    ///
    pub fn last_action_list_mut(&mut self) -> Option<&mut ActionList> {
        return self.action_lists.last_mut();
    }

    pub fn len(&self) -> usize {
        return self.action_lists.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.action_lists.is_empty();
    }

    pub fn visible_count(&self) -> usize {
        return self.action_lists.iter().filter(|a| ! a.is_hidden()).count();
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bean_reference() {
        let test_specs = [
            ( Some("userDao"), (Some("userDao"), None) ),
            ( Some("class:app.UserDao"), (None, Some("app.UserDao")) ),
            ( None, (None, None) ),
        ];
        for (bean, (id, class)) in test_specs.iter() {
            let (i, c) = split_bean_reference(*bean);
            assert_eq!(i.as_deref(), *id);
            assert_eq!(c.as_deref(), *class);
        }
    }

    #[test]
    fn test_hidden_list() {
        let mut al = ActionList::new(Some(String::from("c1")), None, Some(true));
        al.add_action(ActionRule::Echo(EchoActionRule::default()));
        assert!(al.actions()[0].is_hidden());
        assert_eq!(al.visible_count(), 0);

        let mut cl = ContentList::new(None, None);
        cl.add_action_list(al);
        cl.add_action_list(ActionList::default());
        assert_eq!(cl.visible_count(), 1);
    }

    #[test]
    fn test_display() {
        let mut rule = BeanActionRule::new(Some(String::from("count")), Some("class:app.Counter"), "next");
        rule.hidden = true;
        let action = ActionRule::Bean(rule);
        assert_eq!(action.to_string(), "action id=count bean=class:app.Counter method=next");
        assert!(action.is_hidden());
    }
}
