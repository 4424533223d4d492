//
// rule/aspect.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::fmt;

use regex::Regex;

use crate::error::IllegalRuleError;
use crate::rule::action::ActionRule;
use crate::rule::description::DescriptionRule;
use crate::rule::exception::ExceptionRule;
use crate::rule::token::CLASS_DIRECTIVE_PREFIX;
use crate::rule::types::{AspectAdviceType, JoinpointTargetType, MethodType, PointcutType};
use crate::wildcard::WildcardPattern;

const BEAN_CLASS_DELIMITER: char = '@';
const METHOD_NAME_DELIMITER: char = '^';

const TRANSLET_NAME_SEPARATOR: char = '/';
const ID_SEPARATOR: char = '.';

// =====================================================================
/// One pointcut target: "translet@bean^method", any part optional,
/// and the targets it excludes.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointcutPatternRule {
    pub translet_name: Option<String>,
    pub bean_id: Option<String>,
    pub class_name: Option<String>,
    pub method_name: Option<String>,
    pub excludes: Vec<PointcutPatternRule>,
}

impl PointcutPatternRule {

    // -----------------------------------------------------------------
    /// Parses "translet@bean^method"; "@class:Name" names a class.
    ///
    /// ```
    /// use aspectran::rule::PointcutPatternRule;
    /// let p = PointcutPatternRule::parse_pattern("/example/*@class:app.*Dao^get*");
    /// assert_eq!(p.translet_name.as_deref(), Some("/example/*"));
    /// assert_eq!(p.class_name.as_deref(), Some("app.*Dao"));
    /// assert_eq!(p.method_name.as_deref(), Some("get*"));
    /// assert_eq!(p.to_string(), "/example/*@class:app.*Dao^get*");
    /// ```
    ///
    pub fn parse_pattern(pattern: &str) -> PointcutPatternRule {
        let (translet, bean_method) = match pattern.find(BEAN_CLASS_DELIMITER) {
            Some(i) => (&pattern[..i], Some(&pattern[i + 1..])),
            None => (pattern, None),
        };
        // A method may follow the translet directly: "/a^run".
        let (translet, mut method) = match translet.find(METHOD_NAME_DELIMITER) {
            Some(i) if bean_method.is_none() => (&translet[..i], Some(&translet[i + 1..])),
            _ => (translet, None),
        };
        let mut bean: Option<&str> = None;
        if let Some(bm) = bean_method {
            match bm.find(METHOD_NAME_DELIMITER) {
                Some(i) => {
                    bean = Some(&bm[..i]);
                    method = Some(&bm[i + 1..]);
                },
                None => bean = Some(bm),
            }
        }

        let mut rule = PointcutPatternRule::default();
        rule.translet_name = non_empty(translet);
        if let Some(b) = bean {
            match b.strip_prefix(CLASS_DIRECTIVE_PREFIX) {
                Some(class) => rule.class_name = non_empty(class),
                None => rule.bean_id = non_empty(b),
            }
        }
        rule.method_name = method.and_then(non_empty);
        return rule;
    }

    pub fn new(translet: Option<&str>, bean: Option<&str>, method: Option<&str>) -> PointcutPatternRule {
        let mut rule = PointcutPatternRule::default();
        rule.translet_name = translet.and_then(non_empty);
        if let Some(b) = bean {
            match b.strip_prefix(CLASS_DIRECTIVE_PREFIX) {
                Some(class) => rule.class_name = non_empty(class),
                None => rule.bean_id = non_empty(b),
            }
        }
        rule.method_name = method.and_then(non_empty);
        return rule;
    }

    pub fn is_empty(&self) -> bool {
        return self.translet_name.is_none() && self.bean_id.is_none()
            && self.class_name.is_none() && self.method_name.is_none();
    }
}

impl fmt::Display for PointcutPatternRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref t) = self.translet_name {
            f.write_str(t)?;
        }
        if let Some(ref b) = self.bean_id {
            write!(f, "{}{}", BEAN_CLASS_DELIMITER, b)?;
        } else if let Some(ref c) = self.class_name {
            write!(f, "{}{}{}", BEAN_CLASS_DELIMITER, CLASS_DIRECTIVE_PREFIX, c)?;
        }
        if let Some(ref m) = self.method_name {
            write!(f, "{}{}", METHOD_NAME_DELIMITER, m)?;
        }
        return Ok(());
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    return Some(String::from(s));
}

// =====================================================================
//
#[derive(Debug, Clone)]
enum Matcher {
    Wildcard(WildcardPattern),
    Regexp(Regex),
}

impl Matcher {
    fn new(pointcut_type: PointcutType, pattern: &str, separator: Option<char>)
            -> Result<Matcher, IllegalRuleError> {
        return match pointcut_type {
            PointcutType::Wildcard => Ok(Matcher::Wildcard(WildcardPattern::new(pattern, separator)?)),
            PointcutType::Regexp => {
                let anchored = format!("^(?:{})$", pattern);
                let regex = Regex::new(&anchored)
                        .map_err(|e| illegal_rule!("Invalid pointcut pattern '{}': {}", pattern, e))?;
                Ok(Matcher::Regexp(regex))
            },
        };
    }

    fn matches(&self, s: &str) -> bool {
        return match self {
            Matcher::Wildcard(p) => p.matches(s),
            Matcher::Regexp(r) => r.is_match(s),
        };
    }
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    translet_name: Option<Matcher>,
    bean_id: Option<Matcher>,
    class_name: Option<Matcher>,
    method_name: Option<Matcher>,
    excludes: Vec<CompiledPattern>,
}

impl CompiledPattern {
    fn new(pointcut_type: PointcutType, rule: &PointcutPatternRule) -> Result<CompiledPattern, IllegalRuleError> {
        let compile = |p: &Option<String>, sep: Option<char>| -> Result<Option<Matcher>, IllegalRuleError> {
            return match p {
                Some(p) => Ok(Some(Matcher::new(pointcut_type, p, sep)?)),
                None => Ok(None),
            };
        };
        let mut excludes: Vec<CompiledPattern> = vec!{};
        for ex in rule.excludes.iter() {
            excludes.push(CompiledPattern::new(pointcut_type, ex)?);
        }
        return Ok(CompiledPattern {
            translet_name: compile(&rule.translet_name, Some(TRANSLET_NAME_SEPARATOR))?,
            bean_id: compile(&rule.bean_id, Some(ID_SEPARATOR))?,
            class_name: compile(&rule.class_name, Some(ID_SEPARATOR))?,
            method_name: compile(&rule.method_name, None)?,
            excludes,
        });
    }

    // A pattern part with no value to compare fails the match.
    fn matches(&self, target: &JoinpointTarget) -> bool {
        let parts = [
            ( &self.translet_name, target.translet_name ),
            ( &self.bean_id, target.bean_id ),
            ( &self.class_name, target.class_name ),
            ( &self.method_name, target.method_name ),
        ];
        for (matcher, value) in parts.iter() {
            if let Some(m) = matcher {
                match value {
                    Some(v) => if ! m.matches(v) {
                        return false;
                    },
                    None => return false,
                }
            }
        }
        return true;
    }
}

// =====================================================================
/// What a pointcut is matched against.
///
#[derive(Debug, Clone, Copy, Default)]
pub struct JoinpointTarget<'a> {
    pub translet_name: Option<&'a str>,
    pub bean_id: Option<&'a str>,
    pub class_name: Option<&'a str>,
    pub method_name: Option<&'a str>,
}

impl<'a> JoinpointTarget<'a> {
    pub fn translet(name: &'a str) -> JoinpointTarget<'a> {
        return JoinpointTarget {
            translet_name: Some(name),
            ..JoinpointTarget::default()
        };
    }
}

// =====================================================================
/// Compiled set of pointcut patterns.
///
#[derive(Debug, Clone)]
pub struct PointcutRule {
    pointcut_type: PointcutType,
    pattern_rules: Vec<PointcutPatternRule>,
    compiled: Vec<CompiledPattern>,
}

impl PartialEq for PointcutRule {
    fn eq(&self, other: &PointcutRule) -> bool {
        return self.pointcut_type == other.pointcut_type
            && self.pattern_rules == other.pattern_rules;
    }
}

impl PointcutRule {
    pub fn new(pointcut_type: Option<PointcutType>) -> PointcutRule {
        return PointcutRule {
            pointcut_type: pointcut_type.unwrap_or(PointcutType::Wildcard),
            pattern_rules: vec!{},
            compiled: vec!{},
        };
    }

    pub fn pointcut_type(&self) -> PointcutType {
        return self.pointcut_type;
    }

    pub fn add_pattern_rule(&mut self, rule: PointcutPatternRule) -> Result<(), IllegalRuleError> {
        let compiled = CompiledPattern::new(self.pointcut_type, &rule)?;
        self.compiled.push(compiled);
        self.pattern_rules.push(rule);
        return Ok(());
    }

    // -----------------------------------------------------------------
    /// Adds the patterns of a pointcut body: one per line, "-"
    /// marks a pattern excluded from every "+" (or unmarked) one.
    ///
    pub fn add_pattern_text(&mut self, text: &str) -> Result<(), IllegalRuleError> {
        let mut plus: Vec<PointcutPatternRule> = vec!{};
        let mut minus: Vec<PointcutPatternRule> = vec!{};
        for line in text.lines().map(|l| l.trim()).filter(|l| ! l.is_empty() && ! l.starts_with('#')) {
            if let Some(p) = line.strip_prefix('-') {
                minus.push(PointcutPatternRule::parse_pattern(p.trim_start_matches(':').trim()));
            } else {
                let p = line.strip_prefix('+').unwrap_or(line);
                plus.push(PointcutPatternRule::parse_pattern(p.trim_start_matches(':').trim()));
            }
        }
        for mut rule in plus.into_iter() {
            rule.excludes.extend(minus.iter().cloned());
            self.add_pattern_rule(rule)?;
        }
        return Ok(());
    }

    pub fn pattern_rules(&self) -> &[PointcutPatternRule] {
        return &self.pattern_rules;
    }

    pub fn is_empty(&self) -> bool {
        return self.pattern_rules.is_empty();
    }

    // -----------------------------------------------------------------
    /// True when one pattern matches 'target' and none of its
    /// excludes does.
    ///
    pub fn matches(&self, target: &JoinpointTarget) -> bool {
        for pattern in self.compiled.iter() {
            if pattern.matches(target) {
                return ! pattern.excludes.iter().any(|ex| ex.matches(target));
            }
        }
        return false;
    }
}

// =====================================================================
/// Where an aspect applies.
///
#[derive(Debug, Clone, PartialEq)]
pub struct JoinpointRule {
    pub target: JoinpointTargetType,
    pub methods: Option<Vec<MethodType>>,
    pub pointcut: Option<PointcutRule>,
}

impl Default for JoinpointRule {
    fn default() -> JoinpointRule {
        return JoinpointRule {
            target: JoinpointTargetType::Translet,
            methods: None,
            pointcut: None,
        };
    }
}

impl JoinpointRule {
    /// Whether a request with 'method' is in scope.  An aspect without
    /// a pointcut applies everywhere.
    ///
    pub fn matches(&self, method: Option<MethodType>, target: &JoinpointTarget) -> bool {
        if let (Some(methods), Some(m)) = (&self.methods, method) {
            if ! methods.contains(&m) {
                return false;
            }
        }
        return match self.pointcut {
            Some(ref p) => p.matches(target),
            None => true,
        };
    }
}

// =====================================================================
/// An action an aspect runs at one advice point.
///
#[derive(Debug, Clone, PartialEq)]
pub struct AspectAdviceRule {
    pub aspect_id: String,
    pub advice_type: AspectAdviceType,
    pub action: Option<ActionRule>,
}

impl AspectAdviceRule {
    pub fn new(aspect_id: &str, advice_type: AspectAdviceType) -> AspectAdviceRule {
        return AspectAdviceRule {
            aspect_id: String::from(aspect_id),
            advice_type,
            action: None,
        };
    }
}

impl fmt::Display for AspectAdviceRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} advice of aspect {}", self.advice_type, self.aspect_id)?;
        if let Some(ref action) = self.action {
            write!(f, " ({})", action)?;
        }
        return Ok(());
    }
}

// =====================================================================
/// `<aspect>`: advice applied at the join points its pointcut selects.
///
#[derive(Debug, Clone, Default)]
pub struct AspectRule {
    pub id: String,
    pub order: Option<i32>,
    pub isolated: bool,
    pub disabled: bool,
    pub advice_bean_id: Option<String>,
    pub advice_bean_class: Option<String>,
    pub description: Option<DescriptionRule>,
    pub joinpoint: JoinpointRule,
    pub advice_rules: Vec<AspectAdviceRule>,
    pub exception_rule: Option<ExceptionRule>,
}

impl AspectRule {
    pub fn new(id: &str) -> AspectRule {
        return AspectRule {
            id: String::from(id),
            ..AspectRule::default()
        };
    }

    /// Sorting key; aspects without an order come last.
    ///
    pub fn order(&self) -> i32 {
        return self.order.unwrap_or(i32::MAX);
    }

    // -----------------------------------------------------------------
    /// Advice rules run at 'advice_type'; around advice runs both
    /// before and after.
    ///
    pub fn advice_rules_for(&self, advice_type: AspectAdviceType) -> Vec<&AspectAdviceRule> {
        return self.advice_rules.iter().filter(|r| {
            r.advice_type == advice_type || (r.advice_type == AspectAdviceType::Around
                && (advice_type == AspectAdviceType::Before || advice_type == AspectAdviceType::After))
        }).collect();
    }

    pub fn touch_advice_rule(&mut self, advice_type: AspectAdviceType) -> &mut AspectAdviceRule {
        let pos = match self.advice_rules.iter().position(|r| r.advice_type == advice_type) {
            Some(pos) => pos,
            None => {
                self.advice_rules.push(AspectAdviceRule::new(&self.id, advice_type));
                self.advice_rules.len() - 1
            },
        };
        return &mut self.advice_rules[pos];
    }
}

impl fmt::Display for AspectRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "aspect {} (target={}", self.id, self.joinpoint.target)?;
        if let Some(ref p) = self.joinpoint.pointcut {
            let patterns: Vec<String> = p.pattern_rules().iter().map(|r| r.to_string()).collect();
            write!(f, ", pointcut=[{}]", patterns.join(", "))?;
        }
        return f.write_str(")");
    }
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_pattern() {
        let test_specs = [
            ( "/example/*", (Some("/example/*"), None, None, None) ),
            ( "@userDao^get*", (None, Some("userDao"), None, Some("get*")) ),
            ( "/a@class:app.Dao", (Some("/a"), None, Some("app.Dao"), None) ),
            ( "/a^run", (Some("/a"), None, None, Some("run")) ),
            ( "@^run", (None, None, None, Some("run")) ),
        ];
        for (s, (t, b, c, m)) in test_specs.iter() {
            let p = PointcutPatternRule::parse_pattern(s);
            assert_eq!(p.translet_name.as_deref(), *t, "{}", s);
            assert_eq!(p.bean_id.as_deref(), *b, "{}", s);
            assert_eq!(p.class_name.as_deref(), *c, "{}", s);
            assert_eq!(p.method_name.as_deref(), *m, "{}", s);
        }
    }

    #[test]
    fn test_pointcut_matches() {
        let mut pointcut = PointcutRule::new(None);
        pointcut.add_pattern_text("+: /example/*\n-: /example/secret\n/admin/**").unwrap();

        let test_specs = [
            ( "/example/hello", true ),
            ( "/example/secret", false ),
            ( "/example/a/b", false ),
            ( "/admin/a/b", true ),
            ( "/other", false ),
        ];
        for (name, guess) in test_specs.iter() {
            assert_eq!(pointcut.matches(&JoinpointTarget::translet(name)), *guess, "{}", name);
        }
    }

    #[test]
    fn test_bean_method_pointcut() {
        let mut pointcut = PointcutRule::new(None);
        pointcut.add_pattern_rule(PointcutPatternRule::new(None, Some("*Dao"), Some("get*"))).unwrap();
        let target = JoinpointTarget {
            translet_name: Some("/x"),
            bean_id: Some("userDao"),
            class_name: None,
            method_name: Some("getUser"),
        };
        assert!(pointcut.matches(&target));
        assert!(! pointcut.matches(&JoinpointTarget::translet("/x")));
    }

    #[test]
    fn test_regexp_pointcut() {
        let mut pointcut = PointcutRule::new(Some(PointcutType::Regexp));
        pointcut.add_pattern_text("/example/.*").unwrap();
        assert!(pointcut.matches(&JoinpointTarget::translet("/example/a/b")));
        assert!(! pointcut.matches(&JoinpointTarget::translet("/x/example/a")));
        assert!(pointcut.add_pattern_text("(").is_err());
    }

    #[test]
    fn test_joinpoint_methods() {
        let joinpoint = JoinpointRule {
            target: JoinpointTargetType::Translet,
            methods: Some(vec![MethodType::Post]),
            pointcut: None,
        };
        let target = JoinpointTarget::translet("/a");
        assert!(joinpoint.matches(Some(MethodType::Post), &target));
        assert!(! joinpoint.matches(Some(MethodType::Get), &target));
        assert!(joinpoint.matches(None, &target));
    }

    #[test]
    fn test_around_advice() {
        let mut aspect = AspectRule::new("a1");
        aspect.touch_advice_rule(AspectAdviceType::Around);
        aspect.touch_advice_rule(AspectAdviceType::Finally);
        assert_eq!(aspect.advice_rules_for(AspectAdviceType::Before).len(), 1);
        assert_eq!(aspect.advice_rules_for(AspectAdviceType::After).len(), 1);
        assert_eq!(aspect.advice_rules_for(AspectAdviceType::Finally).len(), 1);
        assert_eq!(aspect.advice_rules_for(AspectAdviceType::ExceptionRaised).len(), 0);
        assert_eq!(aspect.order(), i32::MAX);
    }
}
