//
// rule/translet.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::collections::HashMap;
use std::fmt;

use crate::error::IllegalRuleError;
use crate::rule::action::{ActionList, ActionRule, ContentList};
use crate::rule::description::DescriptionRule;
use crate::rule::exception::ExceptionRule;
use crate::rule::item::ItemRuleMap;
use crate::rule::response::ResponseRule;
use crate::rule::token::{tokenize, Token, TokenType};
use crate::rule::types::MethodType;
use crate::wildcard::WildcardPattern;

const TRANSLET_NAME_SEPARATOR: char = '/';

// =====================================================================
/// `<fileItem>`: an uploaded file the request may carry.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileItemRule {
    pub name: String,
    pub mandatory: bool,
    pub allowed_extensions: Vec<String>,
    pub denied_extensions: Vec<String>,
}

impl FileItemRule {
    pub fn is_allowed(&self, file_name: &str) -> bool {
        let ext = match file_name.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => String::new(),
        };
        if ! self.allowed_extensions.is_empty() {
            return self.allowed_extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext));
        }
        return ! self.denied_extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext));
    }
}

// =====================================================================
/// `<request>`: what a translet expects of the request.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestRule {
    pub method: Option<MethodType>,
    pub encoding: Option<String>,
    pub parameters: Option<ItemRuleMap>,
    pub attributes: Option<ItemRuleMap>,
    pub file_items: Vec<FileItemRule>,
}

// =====================================================================
/// `<translet>`: a named unit of request processing.
///
#[derive(Debug, Clone, Default)]
pub struct TransletRule {
    name: String,
    name_tokens: Option<Vec<Token>>,
    name_pattern: Option<WildcardPattern>,
    pub allowed_methods: Option<Vec<MethodType>>,
    pub scan_path: Option<String>,
    pub mask_pattern: Option<String>,
    pub description: Option<DescriptionRule>,
    pub request_rule: Option<RequestRule>,
    content_list: Option<ContentList>,
    explicit_content: bool,
    response_rules: Vec<ResponseRule>,
    pub response_rule: Option<ResponseRule>,
    pub exception_rule: Option<ExceptionRule>,
}

impl TransletRule {
    pub fn new(name: &str) -> TransletRule {
        return TransletRule {
            name: String::from(name),
            ..TransletRule::default()
        };
    }

    pub fn name(&self) -> &str {
        return self.name.as_str();
    }

    // -----------------------------------------------------------------
    /// Sets the final name.  A name with `${...}` tokens becomes a
    /// pattern whose tokens are path variables.
    ///
    pub fn set_name(&mut self, name: &str) -> Result<(), IllegalRuleError> {
        self.name = String::from(name);
        let tokens = tokenize(name, false);
        if tokens.iter().any(|t| ! t.is_text()) {
            let pattern: String = tokens.iter().map(|t| {
                match t.value() {
                    Some(v) if t.is_text() => v.replace('*', "\\*").replace('?', "\\?"),
                    _ => String::from("*"),
                }
            }).collect();
            self.name_pattern = Some(WildcardPattern::new(&pattern, Some(TRANSLET_NAME_SEPARATOR))?);
            self.name_tokens = Some(tokens);
        } else if name.contains('*') || name.contains('?') {
            self.name_pattern = Some(WildcardPattern::new(name, Some(TRANSLET_NAME_SEPARATOR))?);
            self.name_tokens = None;
        } else {
            self.name_pattern = None;
            self.name_tokens = None;
        }
        return Ok(());
    }

    pub fn name_pattern(&self) -> Option<&WildcardPattern> {
        return self.name_pattern.as_ref();
    }

    pub fn has_path_variables(&self) -> bool {
        return self.name_tokens.is_some();
    }

    // -----------------------------------------------------------------
    /// Values of the `${...}` tokens of the name for 'request_name'.
    ///
    pub fn path_variables(&self, request_name: &str) -> HashMap<String, String> {
        let mut vars: HashMap<String, String> = HashMap::new();
        if let (Some(tokens), Some(pattern)) = (&self.name_tokens, &self.name_pattern) {
            if let Some(values) = pattern.captures(request_name) {
                let names = tokens.iter().filter(|t| t.token_type() == TokenType::Parameter);
                for (token, value) in names.zip(values.into_iter()) {
                    let value = match (value.is_empty(), token.default_value()) {
                        (true, Some(d)) => String::from(d),
                        _ => value,
                    };
                    vars.insert(String::from(token.name()), value);
                }
            }
        }
        return vars;
    }

    pub fn allows(&self, method: MethodType) -> bool {
        return match self.allowed_methods {
            Some(ref methods) => methods.contains(&method),
            None => true,
        };
    }

    // -----------------------------------------------------------------
    //
    pub fn content_list(&self) -> Option<&ContentList> {
        return self.content_list.as_ref();
    }

    pub fn is_explicit_content(&self) -> bool {
        return self.explicit_content;
    }

    /// Sets the `<contents>` of the translet.
    ///
    pub fn set_content_list(&mut self, content_list: ContentList) {
        self.content_list = Some(content_list);
        self.explicit_content = true;
    }

    // -----------------------------------------------------------------
    /// Adds a `<content>` outside of `<contents>`.
    ///
    pub fn add_action_list(&mut self, action_list: ActionList) {
        self.explicit_content = true;
        self.content_list.get_or_insert_with(|| ContentList::new(None, None))
                .add_action_list(action_list);
    }

    // -----------------------------------------------------------------
    /// Adds an action written directly under the translet; such
    /// actions share one implicit ActionList.
    ///
    pub fn add_action(&mut self, action: ActionRule) {
        let content_list = self.content_list.get_or_insert_with(|| ContentList::new(None, None));
        if content_list.is_empty() {
            content_list.add_action_list(ActionList::default());
        }
        if let Some(list) = content_list.last_action_list_mut() {
            list.add_action(action);
        }
    }

    pub fn add_response_rule(&mut self, response_rule: ResponseRule) {
        self.response_rules.push(response_rule);
    }

    pub fn response_rules(&self) -> &[ResponseRule] {
        return &self.response_rules;
    }

    pub fn take_response_rules(&mut self) -> Vec<ResponseRule> {
        return std::mem::take(&mut self.response_rules);
    }

    /// Content type of the declared response, if it has one.
    ///
    pub fn content_type(&self) -> Option<&str> {
        return self.response_rule.as_ref().and_then(|r| r.content_type());
    }
}

impl fmt::Display for TransletRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "translet name={}", self.name)?;
        if let Some(ref methods) = self.allowed_methods {
            let names: Vec<&str> = methods.iter().map(|m| m.as_str()).collect();
            write!(f, " method={}", names.join(","))?;
        }
        if let Some(ref rr) = self.response_rule {
            write!(f, " {}", rr)?;
        }
        return Ok(());
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;
    use crate::rule::action::EchoActionRule;

    #[test]
    fn test_path_variables() {
        let mut rule = TransletRule::new("");
        rule.set_name("/user/${id}/item/${no:1}").unwrap();
        assert!(rule.has_path_variables());
        let pattern = rule.name_pattern().unwrap();
        assert!(pattern.matches("/user/10/item/3"));
        assert!(! pattern.matches("/user/10/x/3"));

        let vars = rule.path_variables("/user/10/item/3");
        assert_eq!(vars.get("id").map(|s| s.as_str()), Some("10"));
        assert_eq!(vars.get("no").map(|s| s.as_str()), Some("3"));
        let vars = rule.path_variables("/user/10/item/");
        assert_eq!(vars.get("no").map(|s| s.as_str()), Some("1"));
    }

    #[test]
    fn test_implicit_actions() {
        let mut rule = TransletRule::new("/hello");
        rule.add_action(ActionRule::Echo(EchoActionRule::default()));
        rule.add_action(ActionRule::Echo(EchoActionRule::default()));
        let cl = rule.content_list().unwrap();
        assert_eq!(cl.len(), 1);
        assert_eq!(cl.action_lists()[0].len(), 2);
        assert!(! rule.is_explicit_content());
        assert!(rule.name_pattern().is_none());
    }

    #[test]
    fn test_file_item() {
        let item = FileItemRule {
            name: String::from("photo"),
            allowed_extensions: vec![String::from("jpg"), String::from("png")],
            ..FileItemRule::default()
        };
        assert!(item.is_allowed("a.JPG"));
        assert!(! item.is_allowed("a.exe"));
        let item = FileItemRule {
            denied_extensions: vec![String::from("exe")],
            ..FileItemRule::default()
        };
        assert!(! item.is_allowed("setup.exe"));
        assert!(item.is_allowed("notes"));
    }
}
