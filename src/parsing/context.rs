//
// parsing/context.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use tracing::warn;

use crate::bean::BeanClassRegistry;
use crate::env::EnvironmentProfiles;
use crate::error::IllegalRuleError;
use crate::nodelet::NodeTracker;
use crate::parsing::bean_registry::BeanRuleRegistry;
use crate::parsing::inspector::{BeanReference, BeanReferenceInspector};
use crate::parsing::registry::{
    apply_default_engine, AspectRuleRegistry, ScheduleRuleRegistry, TemplateRuleRegistry,
};
use crate::parsing::scope::RuleParsingScope;
use crate::parsing::settings::DefaultSettings;
use crate::parsing::translet_registry::{apply_translet_name_pattern, TransletRuleRegistry};
use crate::rule::{
    tokenize, ActionRule, AspectRule, BeanActionRule, BeanRule, DefaultSettingType,
    DescriptionRule, EnvironmentRule, ItemRule, ItemRuleMap, ScheduleRule, TemplateRule,
    Token, TokenType, TransletRule, CLASS_DIRECTIVE_PREFIX,
};
use crate::wildcard::has_wildcards;

// =====================================================================
/// The registries filled by a full parse.
///
#[derive(Debug, Default)]
pub struct RuleRegistries {
    pub aspect: AspectRuleRegistry,
    pub bean: BeanRuleRegistry,
    pub schedule: ScheduleRuleRegistry,
    pub template: TemplateRuleRegistry,
    pub translet: TransletRuleRegistry,
}

/// Rules as declared, collected by a shallow parse.
///
#[derive(Debug, Default)]
pub struct RuleSet {
    pub aspect_rules: Vec<AspectRule>,
    pub bean_rules: Vec<BeanRule>,
    pub schedule_rules: Vec<ScheduleRule>,
    pub template_rules: Vec<TemplateRule>,
    pub translet_rules: Vec<TransletRule>,
}

/// What release() hands over.
///
#[derive(Debug, Default)]
pub struct ParsedRules {
    pub description: Option<DescriptionRule>,
    pub default_settings: Option<Arc<DefaultSettings>>,
    pub environment_rules: Vec<EnvironmentRule>,
    pub registries: Option<RuleRegistries>,
    pub rule_set: RuleSet,
}

// =====================================================================
/// State of a configuration parse.
///
/// Accumulates the rules of a document and of the documents it
/// imports, resolves bean classes where it can and reserves the other
/// bean references for inspection once all rules are known.
///
/// A shallow context only collects rules: every resolution is a
/// no-op, which suits tools that list the configuration.
///
pub struct RuleParsingContext {
    shallow: bool,
    environment: Option<Arc<EnvironmentProfiles>>,
    classes: Arc<BeanClassRegistry>,
    base_path: Option<PathBuf>,

    settings: Vec<(DefaultSettingType, String)>,
    environment_rules: Vec<EnvironmentRule>,
    type_aliases: Vec<(String, String)>,
    scope: RuleParsingScope,
    registries: RuleRegistries,
    rule_set: RuleSet,
    inspector: BeanReferenceInspector,
    pointcut_beans: Vec<(String, BeanReference)>,
    tracker: Option<Rc<RefCell<NodeTracker>>>,
}

impl fmt::Debug for RuleParsingContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RuleParsingContext")
            .field("shallow", &self.shallow)
            .field("base_path", &self.base_path)
            .field("settings", &self.settings)
            .finish()
    }
}

impl RuleParsingContext {

    pub fn new(environment: Arc<EnvironmentProfiles>, classes: Arc<BeanClassRegistry>,
            base_path: Option<PathBuf>) -> RuleParsingContext {
        return RuleParsingContext::create(false, Some(environment), classes, base_path);
    }

    // -----------------------------------------------------------------
    /// A context that collects rules without resolving anything.
    ///
    pub fn shallow(base_path: Option<PathBuf>) -> RuleParsingContext {
        return RuleParsingContext::create(true, None, Arc::new(BeanClassRegistry::new()), base_path);
    }

    fn create(shallow: bool, environment: Option<Arc<EnvironmentProfiles>>,
            classes: Arc<BeanClassRegistry>, base_path: Option<PathBuf>) -> RuleParsingContext {
        return RuleParsingContext {
            shallow,
            environment,
            classes,
            base_path,
            settings: vec!{},
            environment_rules: vec!{},
            type_aliases: vec!{},
            scope: RuleParsingScope::new(),
            registries: RuleRegistries::default(),
            rule_set: RuleSet::default(),
            inspector: BeanReferenceInspector::new(),
            pointcut_beans: vec!{},
            tracker: None,
        };
    }

    pub fn is_shallow(&self) -> bool {
        return self.shallow;
    }

    // -----------------------------------------------------------------
    /// Starts a parse with empty registries.
    ///
    pub fn prepare(&mut self) {
        self.settings.clear();
        self.environment_rules.clear();
        self.type_aliases.clear();
        self.scope = RuleParsingScope::new();
        self.registries = RuleRegistries::default();
        self.rule_set = RuleSet::default();
        self.inspector = BeanReferenceInspector::new();
        self.pointcut_beans.clear();
    }

    // -----------------------------------------------------------------
    /// Ends the parse and hands the collected rules over.  The context
    /// is empty afterwards.
    ///
    pub fn release(&mut self) -> ParsedRules {
        let mut registries = std::mem::take(&mut self.registries);
        registries.bean.post_process();
        let scope = std::mem::take(&mut self.scope);
        let parsed = ParsedRules {
            description: scope.description().cloned(),
            default_settings: scope.shared_default_settings(),
            environment_rules: std::mem::take(&mut self.environment_rules),
            registries: if self.shallow { None } else { Some(registries) },
            rule_set: std::mem::take(&mut self.rule_set),
        };
        self.prepare();
        return parsed;
    }

    pub fn environment(&self) -> Option<&EnvironmentProfiles> {
        return self.environment.as_deref();
    }

    pub fn base_path(&self) -> Option<&Path> {
        return self.base_path.as_deref();
    }

    pub fn class_registry(&self) -> &BeanClassRegistry {
        return &self.classes;
    }

    /// Shares the parser's position so reservations can tell where
    /// they were made.
    ///
    pub fn set_node_tracker(&mut self, tracker: Option<Rc<RefCell<NodeTracker>>>) {
        self.tracker = tracker;
    }

    pub fn node_tracker(&self) -> Option<Rc<RefCell<NodeTracker>>> {
        return self.tracker.clone();
    }

    fn location(&self) -> Option<String> {
        return self.tracker.as_ref().map(|t| t.borrow().to_string());
    }

    // -----------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------

    pub fn put_setting(&mut self, name: &str, value: &str) -> Result<(), IllegalRuleError> {
        if name.is_empty() {
            return Err(illegal_rule!("Default setting name must not be null or empty"));
        }
        let setting_type = DefaultSettingType::resolve(name)
                .ok_or_else(|| illegal_rule!("No such default setting name as '{}'", name))?;
        match self.settings.iter_mut().find(|(t, _)| *t == setting_type) {
            Some(entry) => entry.1 = String::from(value),
            None => self.settings.push((setting_type, String::from(value))),
        }
        return Ok(());
    }

    pub fn setting(&self, setting_type: DefaultSettingType) -> Option<&str> {
        return self.settings.iter()
                .find(|(t, _)| *t == setting_type)
                .map(|(_, v)| v.as_str());
    }

    /// Applies the settings declared so far to the current scope.
    ///
    pub fn apply_settings(&mut self) {
        let settings = self.settings.clone();
        self.scope.touch_default_settings().apply(&settings);
    }

    pub fn default_settings(&self) -> Option<&DefaultSettings> {
        return self.scope.default_settings();
    }

    pub fn is_pointcut_pattern_verifiable(&self) -> bool {
        return self.scope.default_settings().map_or(false, |ds| ds.is_pointcut_pattern_verifiable());
    }

    // -----------------------------------------------------------------
    /// Prefix and suffix of the current scope applied to a translet
    /// name referenced by an include or a forward.
    ///
    pub fn apply_translet_name_pattern(&self, name: &str) -> String {
        return apply_translet_name_pattern(name, self.scope.default_settings(), true);
    }

    // -----------------------------------------------------------------
    // Scope
    // -----------------------------------------------------------------

    pub fn scope(&self) -> &RuleParsingScope {
        return &self.scope;
    }

    pub fn scope_mut(&mut self) -> &mut RuleParsingScope {
        return &mut self.scope;
    }

    // -----------------------------------------------------------------
    /// Switches to a replica of the current scope for an imported
    /// document; returns the scope to restore afterwards.
    ///
    pub fn backup_rule_parsing_scope(&mut self) -> RuleParsingScope {
        let replica = self.scope.replicate();
        return std::mem::replace(&mut self.scope, replica);
    }

    pub fn restore_rule_parsing_scope(&mut self, scope: RuleParsingScope) {
        self.scope = scope;
    }

    // -----------------------------------------------------------------
    // Environment and type aliases
    // -----------------------------------------------------------------

    pub fn add_environment_rule(&mut self, environment_rule: EnvironmentRule) {
        self.environment_rules.push(environment_rule);
    }

    pub fn environment_rules(&self) -> &[EnvironmentRule] {
        return &self.environment_rules;
    }

    pub fn add_type_alias(&mut self, alias: &str, type_name: &str) {
        match self.type_aliases.iter_mut().find(|(a, _)| a == alias) {
            Some(entry) => entry.1 = String::from(type_name),
            None => self.type_aliases.push((String::from(alias), String::from(type_name))),
        }
    }

    pub fn aliased_type(&self, alias: &str) -> Option<&str> {
        return self.type_aliases.iter()
                .find(|(a, _)| a == alias)
                .map(|(_, t)| t.as_str());
    }

    /// The type 'alias' stands for, or 'alias' itself.
    ///
    pub fn resolve_alias_type(&self, alias: &str) -> String {
        return String::from(self.aliased_type(alias).unwrap_or(alias));
    }

    // -----------------------------------------------------------------
    // Bean class resolution
    // -----------------------------------------------------------------

    fn check_class(&self, class_name: &str, referer: &dyn fmt::Display) -> Result<(), IllegalRuleError> {
        if self.classes.contains(class_name) {
            return Ok(());
        }
        return Err(illegal_rule!("Unable to load class: {} on {}", class_name, referer));
    }

    // -----------------------------------------------------------------
    // A "class:Name" reference must name a known class; either way the
    // reference is reserved for inspection.
    //
    fn resolve_reference(&mut self, bean_id_or_class: &str, referer: &dyn fmt::Display)
            -> Result<(), IllegalRuleError> {
        let reference = BeanReference::parse(bean_id_or_class);
        if let BeanReference::Class(ref class_name) = reference {
            self.check_class(class_name, referer)?;
        }
        self.reserve_bean_reference(reference, referer);
        return Ok(());
    }

    pub fn reserve_bean_reference(&mut self, reference: BeanReference, referer: &dyn fmt::Display) {
        if self.shallow {
            return;
        }
        let location = self.location();
        self.inspector.reserve(reference, referer, location);
    }

    /// The class of 'bean_rule' must be known, unless a factory bean
    /// makes it.
    ///
    pub fn resolve_bean_class(&self, bean_rule: &BeanRule) -> Result<(), IllegalRuleError> {
        if self.shallow || bean_rule.is_factory_produced() || bean_rule.scan_pattern.is_some() {
            return Ok(());
        }
        return match bean_rule.class_name {
            Some(ref class_name) => self.check_class(class_name, bean_rule),
            None => Ok(()),
        };
    }

    pub fn resolve_factory_bean_class(&mut self, bean_rule: &BeanRule) -> Result<(), IllegalRuleError> {
        if self.shallow {
            return Ok(());
        }
        return match bean_rule.factory_bean_id {
            Some(ref factory) => self.resolve_reference(factory, bean_rule),
            None => Ok(()),
        };
    }

    pub fn resolve_advice_bean_class(&mut self, aspect_rule: &AspectRule) -> Result<(), IllegalRuleError> {
        if self.shallow {
            return Ok(());
        }
        if let Some(ref bean_id) = aspect_rule.advice_bean_id {
            self.resolve_reference(bean_id, aspect_rule)?;
        }
        if let Some(ref class_name) = aspect_rule.advice_bean_class {
            let reference = format!("{}{}", CLASS_DIRECTIVE_PREFIX, class_name);
            self.resolve_reference(&reference, aspect_rule)?;
        }
        return Ok(());
    }

    pub fn resolve_action_bean_class(&mut self, action_rule: &BeanActionRule) -> Result<(), IllegalRuleError> {
        if self.shallow {
            return Ok(());
        }
        let referer = ActionRule::Bean(action_rule.clone());
        if let Some(ref bean_id) = action_rule.bean_id {
            self.resolve_reference(bean_id, &referer)?;
        }
        if let Some(ref class_name) = action_rule.bean_class {
            let reference = format!("{}{}", CLASS_DIRECTIVE_PREFIX, class_name);
            self.resolve_reference(&reference, &referer)?;
        }
        for items in [&action_rule.arguments, &action_rule.properties].iter() {
            if let Some(irm) = items {
                self.resolve_item_rule_map(irm)?;
            }
        }
        return Ok(());
    }

    pub fn resolve_item_rule_map(&mut self, irm: &ItemRuleMap) -> Result<(), IllegalRuleError> {
        for item in irm.iter() {
            self.resolve_item_bean_class(item)?;
        }
        for candidate in irm.candidates().iter() {
            for item in candidate.iter() {
                self.resolve_item_bean_class(item)?;
            }
        }
        return Ok(());
    }

    /// Bean references in the values of 'item_rule'.
    ///
    pub fn resolve_item_bean_class(&mut self, item_rule: &ItemRule) -> Result<(), IllegalRuleError> {
        if self.shallow {
            return Ok(());
        }
        let referer = format!("item {}", item_rule.name());
        let tokens: Vec<Token> = item_rule.all_tokens().into_iter().cloned().collect();
        return self.resolve_tokens(&tokens, &referer);
    }

    pub fn resolve_tokens(&mut self, tokens: &[Token], referer: &dyn fmt::Display)
            -> Result<(), IllegalRuleError> {
        if self.shallow {
            return Ok(());
        }
        for token in tokens.iter().filter(|t| t.token_type() == TokenType::Bean) {
            if let Some(class_name) = token.class_name() {
                self.check_class(class_name, referer)?;
                self.reserve_bean_reference(BeanReference::Class(String::from(class_name)), referer);
            } else if let Some(bean_id) = token.bean_id() {
                self.reserve_bean_reference(BeanReference::Id(String::from(bean_id)), referer);
            }
        }
        return Ok(());
    }

    pub fn resolve_schedule_bean_class(&mut self, schedule_rule: &ScheduleRule) -> Result<(), IllegalRuleError> {
        if self.shallow {
            return Ok(());
        }
        return match schedule_rule.scheduler_bean_id {
            Some(ref bean_id) => self.resolve_reference(bean_id, schedule_rule),
            None => Ok(()),
        };
    }

    // -----------------------------------------------------------------
    /// The engine bean of 'template_rule', or the bean tokens of a
    /// builtin template's text.
    ///
    pub fn resolve_template_bean_class(&mut self, template_rule: &TemplateRule) -> Result<(), IllegalRuleError> {
        if self.shallow {
            return Ok(());
        }
        if ! template_rule.is_builtin() {
            if let Some(ref engine) = template_rule.engine {
                return self.resolve_reference(engine, template_rule);
            }
        }
        if let Some(content) = template_rule.content() {
            let tokens = tokenize(content, false);
            return self.resolve_tokens(&tokens, template_rule);
        }
        return Ok(());
    }

    /// A template rule with the scope's default engine applied.
    ///
    pub fn prepare_template_rule(&self, template_rule: &mut TemplateRule) {
        apply_default_engine(template_rule, self.scope.default_settings());
    }

    // -----------------------------------------------------------------
    // Rules
    // -----------------------------------------------------------------

    pub fn add_aspect_rule(&mut self, aspect_rule: AspectRule) -> Result<(), IllegalRuleError> {
        if self.shallow {
            self.rule_set.aspect_rules.push(aspect_rule);
            return Ok(());
        }
        if self.is_pointcut_pattern_verifiable() {
            self.collect_pointcut_beans(&aspect_rule);
        }
        return self.registries.aspect.add_aspect_rule(aspect_rule);
    }

    fn collect_pointcut_beans(&mut self, aspect_rule: &AspectRule) {
        let pointcut = match aspect_rule.joinpoint.pointcut {
            Some(ref p) => p,
            None => return,
        };
        for pattern in pointcut.pattern_rules().iter() {
            if let Some(ref id) = pattern.bean_id {
                if ! has_wildcards(id) {
                    self.pointcut_beans.push((aspect_rule.id.clone(), BeanReference::Id(id.clone())));
                }
            }
            if let Some(ref class) = pattern.class_name {
                if ! has_wildcards(class) {
                    self.pointcut_beans.push((aspect_rule.id.clone(), BeanReference::Class(class.clone())));
                }
            }
        }
    }

    pub fn add_bean_rule(&mut self, bean_rule: BeanRule) -> Result<(), IllegalRuleError> {
        if self.shallow {
            self.rule_set.bean_rules.push(bean_rule);
            return Ok(());
        }
        return self.registries.bean.add_bean_rule(bean_rule, &self.classes);
    }

    pub fn add_schedule_rule(&mut self, schedule_rule: ScheduleRule) -> Result<(), IllegalRuleError> {
        if self.shallow {
            self.rule_set.schedule_rules.push(schedule_rule);
            return Ok(());
        }
        let settings = self.scope.shared_default_settings();
        return self.registries.schedule.add_schedule_rule(schedule_rule, settings.as_deref());
    }

    pub fn add_template_rule(&mut self, template_rule: TemplateRule) -> Result<(), IllegalRuleError> {
        if self.shallow {
            self.rule_set.template_rules.push(template_rule);
            return Ok(());
        }
        let settings = self.scope.shared_default_settings();
        return self.registries.template.add_template_rule(template_rule, settings.as_deref());
    }

    pub fn add_translet_rule(&mut self, translet_rule: TransletRule) -> Result<(), IllegalRuleError> {
        if self.shallow {
            self.rule_set.translet_rules.push(translet_rule);
            return Ok(());
        }
        let settings = self.scope.shared_default_settings();
        return self.registries.translet.add_translet_rule(translet_rule, settings.as_deref(),
                self.base_path.as_deref());
    }

    pub fn registries(&self) -> &RuleRegistries {
        return &self.registries;
    }

    pub fn rule_set(&self) -> &RuleSet {
        return &self.rule_set;
    }

    // -----------------------------------------------------------------
    /// Checks the reserved bean references against the bean rules.
    ///
    pub fn inspect_bean_references(&mut self) -> Result<(), IllegalRuleError> {
        if self.shallow {
            return Ok(());
        }
        return self.inspector.inspect(&self.registries.bean);
    }

    // -----------------------------------------------------------------
    /// Warns about pointcut patterns naming beans that do not exist.
    ///
    pub fn verify_pointcut_patterns(&self) -> usize {
        let mut unknown = 0;
        for (aspect_id, reference) in self.pointcut_beans.iter() {
            let found = match reference {
                BeanReference::Id(id) => self.registries.bean.contains_id(id),
                BeanReference::Class(class) => self.registries.bean.contains_class(class),
            };
            if ! found {
                warn!("No bean found for the pointcut pattern of aspect '{}': {}", aspect_id, reference);
                unknown += 1;
            }
        }
        return unknown;
    }

    // -----------------------------------------------------------------
    // Profiling
    // -----------------------------------------------------------------

    fn accepts(&self, profile: Option<&crate::env::Profiles>) -> Option<bool> {
        let profile = profile?;
        let env = self.environment.as_ref()?;
        return Some(env.matches(profile));
    }

    // -----------------------------------------------------------------
    /// Combines a description with the one already in place.  A
    /// description for a profile that is not active is kept as a
    /// candidate.
    ///
    pub fn profiling_description(&self, new_dr: DescriptionRule, old_dr: Option<DescriptionRule>)
            -> DescriptionRule {
        return match self.accepts(new_dr.profile()) {
            Some(false) => match old_dr {
                Some(mut old) => {
                    old.add_candidate(new_dr);
                    old
                },
                None => {
                    let mut dr = DescriptionRule::default();
                    dr.add_candidate(new_dr);
                    dr
                },
            },
            _ => merge_description_rule(new_dr, old_dr),
        };
    }

    // -----------------------------------------------------------------
    /// Combines an item map with the one already in place, the new
    /// items winning.  A map for a profile that is not active is kept
    /// as a candidate.
    ///
    pub fn profiling_item_rule_map(&self, new_irm: ItemRuleMap, old_irm: Option<ItemRuleMap>)
            -> ItemRuleMap {
        return match self.accepts(new_irm.profile()) {
            Some(false) => match old_irm {
                Some(mut old) => {
                    old.add_candidate(new_irm);
                    old
                },
                None => {
                    let mut irm = ItemRuleMap::new();
                    irm.add_candidate(new_irm);
                    irm
                },
            },
            _ => merge_item_rule_map(new_irm, old_irm),
        };
    }
}

// ---------------------------------------------------------------------
//
fn merge_description_rule(mut new_dr: DescriptionRule, old_dr: Option<DescriptionRule>) -> DescriptionRule {
    let mut old_dr = match old_dr {
        Some(old) => old,
        None => {
            new_dr.format();
            return new_dr;
        },
    };
    let mut dr = DescriptionRule::default();
    let formatted = match new_dr.content() {
        Some(content) => {
            let styled = crate::rule::styling(content, new_dr.style());
            Some(match old_dr.formatted_content() {
                Some(old) => format!("{}{}", old, styled),
                None => styled,
            })
        },
        None => old_dr.formatted_content().map(String::from),
    };
    dr.set_formatted_content(formatted);
    old_dr.set_formatted_content(None);
    let candidates = old_dr.take_candidates();
    if candidates.is_empty() {
        dr.add_candidate(old_dr);
    } else {
        dr.set_candidates(candidates);
    }
    dr.add_candidate(new_dr);
    return dr;
}

fn merge_item_rule_map(new_irm: ItemRuleMap, old_irm: Option<ItemRuleMap>) -> ItemRuleMap {
    let mut old_irm = match old_irm {
        Some(old) => old,
        None => return new_irm,
    };
    let mut irm = ItemRuleMap::new();
    irm.put_all(&old_irm);
    irm.put_all(&new_irm);
    let candidates = old_irm.take_candidates();
    if candidates.is_empty() {
        irm.set_candidates(vec![old_irm.fragment()]);
    } else {
        irm.set_candidates(candidates);
    }
    irm.push_candidate(new_irm.fragment());
    return irm;
}

// =====================================================================
//
#[cfg(test)]
mod test {
    use super::*;
    use crate::bean::PropertiesBean;
    use crate::env::Profiles;

    fn context(active: &[&str]) -> RuleParsingContext {
        let env = EnvironmentProfiles::new();
        if ! active.is_empty() {
            env.set_active_profiles(active).unwrap();
        }
        let mut classes = BeanClassRegistry::new();
        classes.register("app.Dao", || Box::new(PropertiesBean::new()));
        let mut ctx = RuleParsingContext::new(Arc::new(env), Arc::new(classes), None);
        ctx.prepare();
        return ctx;
    }

    fn items(profile: Option<&str>, entries: &[(&str, &str)]) -> ItemRuleMap {
        let mut irm = ItemRuleMap::new();
        irm.set_profile(profile.map(|p| Profiles::of(p).unwrap()));
        for (name, value) in entries.iter() {
            irm.put(ItemRule::single(name, value));
        }
        return irm;
    }

    fn value_of(irm: &ItemRuleMap, name: &str) -> Option<String> {
        return irm.get(name)
                .and_then(|ir| ir.all_tokens().first().and_then(|t| t.value().map(String::from)));
    }

    #[test]
    fn test_put_setting() {
        let mut ctx = context(&[]);
        let test_specs = [
            ( "transletNamePrefix", Ok(()) ),
            ( "unknown", Err("No such default setting name as 'unknown'") ),
            ( "", Err("Default setting name must not be null or empty") ),
        ];
        for (name, guess) in test_specs.iter() {
            let result = ctx.put_setting(name, "/app/").map_err(|e| e.to_string());
            assert_eq!(result, guess.map_err(String::from), "{}", name);
        }
        ctx.apply_settings();
        assert_eq!(ctx.default_settings().unwrap().translet_name_prefix(), Some("/app/"));
        assert_eq!(ctx.setting(DefaultSettingType::TransletNamePrefix), Some("/app/"));
    }

    #[test]
    fn test_scope_backup_restore() {
        let mut ctx = context(&[]);
        ctx.put_setting("transletNamePrefix", "/outer/").unwrap();
        ctx.apply_settings();

        let saved = ctx.backup_rule_parsing_scope();
        ctx.scope_mut().touch_default_settings().set_translet_name_prefix("/inner/");
        assert_eq!(ctx.apply_translet_name_pattern("x"), "/inner/x");
        ctx.restore_rule_parsing_scope(saved);

        assert_eq!(ctx.default_settings().unwrap().translet_name_prefix(), Some("/outer/"));
        assert_eq!(ctx.apply_translet_name_pattern("x"), "/outer/x");
        assert_eq!(ctx.apply_translet_name_pattern("/x"), "/x");
    }

    #[test]
    fn test_type_alias() {
        let mut ctx = context(&[]);
        ctx.add_type_alias("dao", "app.Dao");
        assert_eq!(ctx.resolve_alias_type("dao"), "app.Dao");
        assert_eq!(ctx.resolve_alias_type("app.Other"), "app.Other");
    }

    #[test]
    fn test_bean_references() {
        let mut ctx = context(&[]);
        let action = BeanActionRule::new(None, Some("dao"), "list");
        ctx.resolve_action_bean_class(&action).unwrap();
        let err = ctx.resolve_action_bean_class(&BeanActionRule::new(None, Some("class:app.None"), "x"))
                .unwrap_err();
        assert!(err.to_string().starts_with("Unable to load class: app.None on "));

        assert!(ctx.inspect_bean_references().is_err());
        ctx.add_bean_rule(BeanRule {
            id: Some(String::from("dao")),
            class_name: Some(String::from("app.Dao")),
            ..BeanRule::default()
        }).unwrap();
        let action = BeanActionRule::new(None, Some("dao"), "list");
        ctx.resolve_action_bean_class(&action).unwrap();
        assert!(ctx.inspect_bean_references().is_ok());
    }

    #[test]
    fn test_token_references() {
        let mut ctx = context(&[]);
        let mut item = ItemRule::new("dao", crate::rule::ItemType::Single);
        item.set_value("#{dao^name} and #{class:app.Dao}");
        ctx.resolve_item_bean_class(&item).unwrap();
        let err = ctx.inspect_bean_references().unwrap_err();
        assert_eq!(err.to_string(), "Unable to resolve reference to bean dao, class:app.Dao");
    }

    #[test]
    fn test_forward_reference() {
        let mut ctx = context(&[]);
        let mut schedule = ScheduleRule::new("s1");
        schedule.scheduler_bean_id = Some(String::from("scheduler"));
        ctx.resolve_schedule_bean_class(&schedule).unwrap();
        ctx.add_bean_rule(BeanRule {
            id: Some(String::from("scheduler")),
            class_name: Some(String::from("app.Dao")),
            ..BeanRule::default()
        }).unwrap();
        assert!(ctx.inspect_bean_references().is_ok());
    }

    #[test]
    fn test_shallow() {
        let mut ctx = RuleParsingContext::shallow(None);
        ctx.prepare();
        ctx.resolve_action_bean_class(&BeanActionRule::new(None, Some("class:app.None"), "x")).unwrap();
        ctx.add_bean_rule(BeanRule {
            id: Some(String::from("x")),
            class_name: Some(String::from("app.None")),
            ..BeanRule::default()
        }).unwrap();
        ctx.add_translet_rule(TransletRule::new("/a")).unwrap();
        assert!(ctx.inspect_bean_references().is_ok());
        let parsed = ctx.release();
        assert!(parsed.registries.is_none());
        assert_eq!(parsed.rule_set.bean_rules.len(), 1);
        assert_eq!(parsed.rule_set.translet_rules.len(), 1);
    }

    #[test]
    fn test_profiling_items_accepted() {
        let ctx = context(&["prod"]);
        let old = items(None, &[("url", "dev"), ("user", "sa")]);
        let new = items(Some("prod"), &[("url", "prod")]);
        let irm = ctx.profiling_item_rule_map(new, Some(old));
        assert_eq!(value_of(&irm, "url").as_deref(), Some("prod"));
        assert_eq!(value_of(&irm, "user").as_deref(), Some("sa"));
        assert_eq!(irm.candidates().len(), 2);
    }

    #[test]
    fn test_profiling_items_deferred() {
        let ctx = context(&["dev"]);
        let old = items(None, &[("url", "dev")]);
        let new = items(Some("prod"), &[("url", "prod")]);
        let irm = ctx.profiling_item_rule_map(new, Some(old));
        assert_eq!(value_of(&irm, "url").as_deref(), Some("dev"));
        assert_eq!(irm.candidates().len(), 2);

        let env = EnvironmentProfiles::new();
        env.set_active_profiles(&["prod"]).unwrap();
        assert_eq!(value_of(&irm.effective(&env), "url").as_deref(), Some("prod"));

        let irm = ctx.profiling_item_rule_map(items(Some("prod"), &[("a", "1")]), None);
        assert!(irm.is_empty());
        assert_eq!(irm.candidates().len(), 1);
    }

    #[test]
    fn test_profiling_description() {
        let ctx = context(&["dev"]);
        let first = DescriptionRule::new(Some("base. "), None);
        let dr = ctx.profiling_description(first, None);
        assert_eq!(dr.formatted_content(), Some("base. "));

        let mut dev = DescriptionRule::new(Some("dev."), None);
        dev.set_profile(Some(Profiles::of("dev").unwrap()));
        let dr = ctx.profiling_description(dev, Some(dr));
        assert_eq!(dr.formatted_content(), Some("base. dev."));
        assert_eq!(dr.candidates().len(), 2);

        let mut prod = DescriptionRule::new(Some("prod."), None);
        prod.set_profile(Some(Profiles::of("prod").unwrap()));
        let dr = ctx.profiling_description(prod, Some(dr));
        assert_eq!(dr.formatted_content(), Some("base. dev."));
        assert_eq!(dr.candidates().len(), 3);

        let env = EnvironmentProfiles::new();
        env.set_active_profiles(&["prod"]).unwrap();
        assert_eq!(dr.effective(&env).as_deref(), Some("base. prod."));
    }
}
