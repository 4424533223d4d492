//
// rule/exception.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::sync::Arc;

use crate::response::Response;
use crate::rule::action::ActionRule;
use crate::rule::description::DescriptionRule;

// =====================================================================
/// `<thrown>`: what to do when one of 'exception_types' is raised.
/// No types means any error.
///
#[derive(Debug, Clone, Default)]
pub struct ExceptionThrownRule {
    pub exception_types: Vec<String>,
    pub action: Option<ActionRule>,
    responses: Vec<Arc<dyn Response>>,
}

impl ExceptionThrownRule {
    pub fn new(exception_types: Vec<String>) -> ExceptionThrownRule {
        return ExceptionThrownRule {
            exception_types,
            ..ExceptionThrownRule::default()
        };
    }

    pub fn applies_to(&self, kind: &str) -> bool {
        return self.exception_types.is_empty()
            || self.exception_types.iter().any(|t| t == kind || t == "*");
    }

    pub fn add_response(&mut self, response: Arc<dyn Response>) {
        self.responses.push(response);
    }

    pub fn responses(&self) -> &[Arc<dyn Response>] {
        return &self.responses;
    }

    // -----------------------------------------------------------------
    /// The response producing 'content_type'.
    ///
    pub fn response_for(&self, content_type: &str) -> Option<Arc<dyn Response>> {
        return self.responses.iter()
                .find(|r| r.content_type().map_or(false, |c| c.eq_ignore_ascii_case(content_type)))
                .cloned();
    }

    // -----------------------------------------------------------------
    /// The response marked default, else the first one.
    ///
    pub fn default_response(&self) -> Option<Arc<dyn Response>> {
        return self.responses.iter()
                .find(|r| r.is_default())
                .or_else(|| self.responses.first())
                .cloned();
    }
}

// =====================================================================
/// `<exception>` of a translet or an aspect.
///
#[derive(Debug, Clone, Default)]
pub struct ExceptionRule {
    pub description: Option<DescriptionRule>,
    thrown_rules: Vec<ExceptionThrownRule>,
}

impl ExceptionRule {
    pub fn new() -> ExceptionRule {
        return ExceptionRule::default();
    }

    pub fn put_exception_thrown_rule(&mut self, rule: ExceptionThrownRule) {
        self.thrown_rules.push(rule);
    }

    pub fn thrown_rules(&self) -> &[ExceptionThrownRule] {
        return &self.thrown_rules;
    }

    // -----------------------------------------------------------------
    /// First rule naming 'kind' explicitly, else the first catch-all.
    ///
    pub fn exception_thrown_rule(&self, kind: &str) -> Option<&ExceptionThrownRule> {
        return self.thrown_rules.iter()
                .find(|r| r.exception_types.iter().any(|t| t == kind))
                .or_else(|| self.thrown_rules.iter().find(|r| r.applies_to(kind)));
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_select_thrown_rule() {
        let mut rule = ExceptionRule::new();
        rule.put_exception_thrown_rule(ExceptionThrownRule::new(vec!{}));
        rule.put_exception_thrown_rule(ExceptionThrownRule::new(vec![String::from("BeanNotFound")]));

        let test_specs = [
            ( "BeanNotFound", Some(1) ),
            ( "ActionError", Some(0) ),
        ];
        for (kind, guess) in test_specs.iter() {
            let found = rule.exception_thrown_rule(kind);
            let index = found.map(|f| {
                rule.thrown_rules().iter().position(|r| std::ptr::eq(r, f)).unwrap_or(usize::MAX)
            });
            assert_eq!(index, *guess, "{}", kind);
        }

        let mut narrow = ExceptionRule::new();
        narrow.put_exception_thrown_rule(ExceptionThrownRule::new(vec![String::from("TooDeep")]));
        assert!(narrow.exception_thrown_rule("ActionError").is_none());
    }
}
